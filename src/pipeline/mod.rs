//! Conversational turn pipeline.
//!
//! This module wires user input → provider → chat history → speech and
//! exposes the shared state the host reads.
//!
//! # Architecture
//!
//! ```text
//! host input (set_input + submit)
//!        │
//!        ▼
//! ChatOrchestrator::submit()  ← async, one turn at a time
//!        │
//!        ├─ ChatBackend::dispatch          → Sending
//!        ├─ append avatar message
//!        └─ SpeechSynthesizer::speak       → Speaking
//!                 │
//!                 └─ SpeakingState (watch) ───▶ ExpressionAnimator, every frame
//!
//! Notification (mpsc, unbounded) ───▶ host
//! SharedState (Arc<Mutex<ChatState>>) ←── read by the host
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use avatar_chat::audio::SilentOutput;
//! use avatar_chat::config::AppConfig;
//! use avatar_chat::pipeline::{notification_channel, ChatOrchestrator};
//! use avatar_chat::provider::ProviderGateway;
//! use avatar_chat::tts::{SpeechClient, SpeechSynthesizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let gateway = ProviderGateway::from_config(&config.endpoints);
//!     let speech = SpeechSynthesizer::new(
//!         Arc::new(SpeechClient::from_config(&config.endpoints, &config.speech)),
//!         Arc::new(SilentOutput),
//!         config.speech.output_format.clone(),
//!     );
//!
//!     let (notices_tx, mut notices_rx) = notification_channel();
//!     let orchestrator = ChatOrchestrator::new(
//!         Arc::new(gateway),
//!         Arc::new(speech),
//!         config.provider.clone(),
//!         config.chat.clone(),
//!         notices_tx,
//!     );
//!
//!     orchestrator.set_input("Hello");
//!     orchestrator.submit().await;
//!     while let Ok(notice) = notices_rx.try_recv() {
//!         eprintln!("{notice}");
//!     }
//! }
//! ```

pub mod notify;
pub mod orchestrator;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use notify::{
    notification_channel, NoticeLevel, Notification, NotificationReceiver, NotificationSender,
    Stage,
};
pub use orchestrator::{ChatOrchestrator, TurnOutcome};
pub use state::{new_shared_state, ChatState, Message, Sender, SharedState, TurnState};
