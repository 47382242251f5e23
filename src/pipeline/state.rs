//! Turn state machine and shared chat state.
//!
//! [`TurnState`] drives the orchestrator's state machine.  The host reads it
//! via [`SharedState`] to decide whether input is accepted.
//!
//! [`ChatState`] is the single source of truth for the conversation: the
//! message history, the pending input, the current turn phase and the
//! provider configuration.
//!
//! [`SharedState`] is a type alias for `Arc<Mutex<ChatState>>`.  Cheap to
//! clone and safe to share across tasks.

use std::sync::{Arc, Mutex};

use crate::config::ProviderConfig;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Avatar,
}

/// One entry of the chat history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn avatar(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Avatar,
        }
    }
}

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// Phases of one conversational turn.
///
/// ```text
/// Idle ──submit──▶ Sending ──reply, no voice──▶ Idle
///                          ──reply, voice────▶ Speaking ──playback started / failed──▶ Idle
///                          ──provider error──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Waiting for the user.
    #[default]
    Idle,

    /// The provider request is in flight.
    Sending,

    /// The reply is being synthesised and handed to the audio output.
    Speaking,
}

impl TurnState {
    /// Returns `true` while a turn is in progress and new input is refused.
    ///
    /// ```
    /// use avatar_chat::pipeline::TurnState;
    ///
    /// assert!(!TurnState::Idle.is_busy());
    /// assert!(TurnState::Sending.is_busy());
    /// assert!(TurnState::Speaking.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(self, TurnState::Idle)
    }
}

// ---------------------------------------------------------------------------
// ChatState
// ---------------------------------------------------------------------------

/// Shared conversation state.
pub struct ChatState {
    /// Chat history, oldest first.  Append-only between resets.
    pub messages: Vec<Message>,

    /// Text typed but not yet sent.
    pub input: String,

    /// Current phase of the turn state machine.
    pub turn: TurnState,

    /// Provider settings.  Snapshotted at the start of each turn.
    pub config: ProviderConfig,

    /// Incremented on every history reset.  Turns remember the value they
    /// started with.
    pub generation: u64,
}

impl ChatState {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            turn: TurnState::Idle,
            config,
            generation: 0,
        }
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new(ProviderConfig::default())
    }
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`ChatState`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedState = Arc<Mutex<ChatState>>;

pub fn new_shared_state(config: ProviderConfig) -> SharedState {
    Arc::new(Mutex::new(ChatState::new(config)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
