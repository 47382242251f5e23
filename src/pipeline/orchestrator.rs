//! Chat orchestrator: drives one turn through provider → history → speech.
//!
//! [`ChatOrchestrator`] owns the [`SharedState`] and reports every rejected
//! or failed turn as a [`Notification`].
//!
//! # Turn flow
//!
//! ```text
//! submit()
//!   ├─ busy / no API key / empty input  → notification, nothing changes
//!   └─ append user message, clear input                  [Sending]
//!        └─ ChatBackend::dispatch(snapshot of config)
//!              ├─ Err → notification naming the provider  [Idle]
//!              └─ Ok  → append avatar message
//!                    ├─ no voice configured                 [Idle]
//!                    └─ SpeechSynthesizer::speak          [Speaking]
//!                          └─ Err → speech notification     [Idle]
//! ```
//!
//! Nothing here holds the state lock across an `.await`, so `reset` and
//! config edits stay responsive while a turn is in flight.

use std::sync::{Arc, MutexGuard};

use crate::config::{ChatConfig, ConfigPatch, ProviderConfig};
use crate::provider::{ChatBackend, ProviderError};
use crate::tts::{AudioHandle, SpeakingState, SpeechError, SpeechSynthesizer};

use super::notify::{Notification, NotificationSender, Stage};
use super::state::{new_shared_state, ChatState, Message, SharedState, TurnState};

// ---------------------------------------------------------------------------
// TurnOutcome
// ---------------------------------------------------------------------------

/// What a call to [`ChatOrchestrator::submit`] did.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The turn was refused before anything changed.
    Rejected,

    /// The provider failed; no reply was appended.
    Failed(ProviderError),

    /// The reply belonged to history that has since been reset and was
    /// dropped.
    Discarded,

    /// The reply was appended.  `speech` is `None` when no voice is
    /// configured, otherwise the result of speaking it.
    Replied {
        reply: String,
        speech: Option<Result<AudioHandle, SpeechError>>,
    },
}

// ---------------------------------------------------------------------------
// ChatOrchestrator
// ---------------------------------------------------------------------------

/// Ties the provider gateway, the speech synthesizer and the chat history
/// together.
pub struct ChatOrchestrator {
    state: SharedState,
    backend: Arc<dyn ChatBackend>,
    speech: Arc<SpeechSynthesizer>,
    chat: ChatConfig,
    notices: NotificationSender,
}

impl ChatOrchestrator {
    /// Create a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `backend`: provider gateway (or a test double).
    /// * `speech`: synthesizer whose speaking flag drives the avatar.
    /// * `config`: initial provider settings.
    /// * `chat`: conversation behaviour.
    /// * `notices`: where user-visible notifications go.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        speech: Arc<SpeechSynthesizer>,
        config: ProviderConfig,
        chat: ChatConfig,
        notices: NotificationSender,
    ) -> Self {
        Self {
            state: new_shared_state(config),
            backend,
            speech,
            chat,
            notices,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, notification: Notification) {
        if notification.is_error() {
            log::warn!("{notification}");
        } else {
            log::info!("{notification}");
        }
        let _ = self.notices.send(notification);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Handle to the shared state for hosts that render it directly.
    pub fn shared_state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    /// Snapshot of the chat history.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn turn(&self) -> TurnState {
        self.lock().turn
    }

    /// `true` while a provider request is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().turn == TurnState::Sending
    }

    /// Reader of the speaking flag the avatar animates from.
    pub fn speaking_state(&self) -> SpeakingState {
        self.speech.speaking_state()
    }

    pub fn config(&self) -> ProviderConfig {
        self.lock().config.clone()
    }

    /// Apply a settings edit.  Turns already in flight keep the settings they
    /// started with.
    pub fn update_config(&self, patch: ConfigPatch) {
        let mut st = self.lock();
        st.config.apply(patch);
        log::debug!("provider config updated: provider={}", st.config.provider);
    }

    // -----------------------------------------------------------------------
    // Turn handling
    // -----------------------------------------------------------------------

    /// Send the pending input as one turn.
    pub async fn submit(&self) -> TurnOutcome {
        // ── 1. Preconditions and snapshot ────────────────────────────────
        let (message, config, generation) = {
            let mut st = self.lock();

            if st.turn.is_busy() {
                drop(st);
                self.notify(Notification::info(
                    Stage::Input,
                    "please wait for the current reply",
                ));
                return TurnOutcome::Rejected;
            }
            if !st.config.has_api_key() {
                let provider = st.config.provider;
                drop(st);
                self.notify(Notification::error(
                    Stage::Provider(provider),
                    "API key is not set",
                ));
                return TurnOutcome::Rejected;
            }
            if st.input.trim().is_empty() {
                drop(st);
                self.notify(Notification::error(Stage::Input, "message is empty"));
                return TurnOutcome::Rejected;
            }

            let message = std::mem::take(&mut st.input);
            st.messages.push(Message::user(message.clone()));
            st.turn = TurnState::Sending;
            (message, st.config.clone(), st.generation)
        };

        log::debug!("turn started with {}", config.provider);

        // ── 2. Provider ──────────────────────────────────────────────────
        let reply = match self.backend.dispatch(&message, &config).await {
            Ok(reply) => reply,
            Err(e) => {
                self.lock().turn = TurnState::Idle;
                self.notify(Notification::error(
                    Stage::Provider(e.provider()),
                    format!("failed to get a reply: {e}"),
                ));
                return TurnOutcome::Failed(e);
            }
        };

        // ── 3. History ───────────────────────────────────────────────────
        let voice = config.voice();
        {
            let mut st = self.lock();
            if self.chat.discard_stale_replies && st.generation != generation {
                st.turn = TurnState::Idle;
                log::info!("dropping reply to a message sent before the last reset");
                return TurnOutcome::Discarded;
            }
            st.messages.push(Message::avatar(reply.clone()));
            st.turn = if voice.is_some() {
                TurnState::Speaking
            } else {
                TurnState::Idle
            };
        }

        // ── 4. Speech ────────────────────────────────────────────────────
        let speech = match voice {
            None => None,
            Some(voice) => {
                let result = self.speech.speak(&reply, &voice).await;
                self.lock().turn = TurnState::Idle;
                if let Err(e) = &result {
                    self.notify(Notification::error(Stage::Speech, e.to_string()));
                }
                Some(result)
            }
        };

        TurnOutcome::Replied { reply, speech }
    }

    /// Clear the chat history.  A turn in flight is not cancelled.
    pub fn reset(&self) {
        {
            let mut st = self.lock();
            st.messages.clear();
            st.generation += 1;
        }
        self.notify(Notification::info(Stage::History, "chat history cleared"));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ManualOutput;
    use crate::config::{Provider, VoiceConfig};
    use crate::pipeline::notify::{notification_channel, NoticeLevel, NotificationReceiver};
    use crate::pipeline::state::Sender;
    use crate::tts::SpeechBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::{oneshot, Notify};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Replies with a fixed string and counts calls.
    struct FixedReply {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedReply {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.into(),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChatBackend for FixedReply {
        async fn dispatch(&self, _m: &str, _c: &ProviderConfig) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    /// Always fails with HTTP 500 from the configured provider.
    struct Failing;

    #[async_trait]
    impl ChatBackend for Failing {
        async fn dispatch(&self, _m: &str, c: &ProviderConfig) -> Result<String, ProviderError> {
            Err(ProviderError::Status {
                provider: c.provider,
                status: 500,
            })
        }
    }

    /// Holds the reply until the test releases it.
    struct Gated {
        started: Notify,
        reply: Mutex<Option<oneshot::Receiver<String>>>,
        seen: Mutex<Vec<ProviderConfig>>,
    }

    impl Gated {
        fn new() -> (Arc<Self>, oneshot::Sender<String>) {
            let (tx, rx) = oneshot::channel();
            let gated = Arc::new(Self {
                started: Notify::new(),
                reply: Mutex::new(Some(rx)),
                seen: Mutex::new(Vec::new()),
            });
            (gated, tx)
        }
    }

    #[async_trait]
    impl ChatBackend for Gated {
        async fn dispatch(&self, _m: &str, c: &ProviderConfig) -> Result<String, ProviderError> {
            self.seen.lock().unwrap().push(c.clone());
            let rx = self.reply.lock().unwrap().take().expect("dispatched twice");
            self.started.notify_one();
            rx.await.map_err(|_| ProviderError::Timeout {
                provider: c.provider,
            })
        }
    }

    /// PCM silence, or a 401 when `fail` is set.
    struct Speech {
        fail: bool,
    }

    #[async_trait]
    impl SpeechBackend for Speech {
        async fn synthesize(&self, _t: &str, _v: &VoiceConfig) -> Result<Vec<u8>, SpeechError> {
            if self.fail {
                Err(SpeechError::Status(401))
            } else {
                Ok(vec![0u8; 3_200])
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn openai_config() -> ProviderConfig {
        ProviderConfig {
            provider: Provider::OpenAi,
            api_key: "k".into(),
            model: "gpt-4o-mini".into(),
            ..ProviderConfig::default()
        }
    }

    fn with_voice(mut config: ProviderConfig) -> ProviderConfig {
        config.voice_api_key = Some("xi".into());
        config.voice_id = Some("voice".into());
        config
    }

    struct Harness {
        orc: Arc<ChatOrchestrator>,
        output: ManualOutput,
        notices: NotificationReceiver,
    }

    fn harness(
        backend: Arc<dyn ChatBackend>,
        config: ProviderConfig,
        chat: ChatConfig,
        speech_fails: bool,
    ) -> Harness {
        let output = ManualOutput::new();
        let synth = Arc::new(SpeechSynthesizer::new(
            Arc::new(Speech { fail: speech_fails }),
            Arc::new(output.clone()),
            "pcm_16000",
        ));
        let (tx, notices) = notification_channel();
        let orc = Arc::new(ChatOrchestrator::new(backend, synth, config, chat, tx));
        Harness {
            orc,
            output,
            notices,
        }
    }

    fn drain(rx: &mut NotificationReceiver) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn successful_turn_without_voice() {
        let backend = FixedReply::new("Hi there.");
        let mut h = harness(backend.clone(), openai_config(), ChatConfig::default(), false);

        h.orc.set_input("Hello");
        let outcome = h.orc.submit().await;

        assert!(matches!(
            outcome,
            TurnOutcome::Replied { ref reply, speech: None } if reply == "Hi there."
        ));
        assert_eq!(
            h.orc.messages(),
            vec![Message::user("Hello"), Message::avatar("Hi there.")]
        );
        assert!(h.orc.input().is_empty());
        assert!(!h.orc.is_loading());
        assert_eq!(h.orc.turn(), TurnState::Idle);
        assert_eq!(h.output.play_count(), 0);
        assert!(drain(&mut h.notices).is_empty());
    }

    #[tokio::test]
    async fn provider_failure_names_the_provider() {
        let mut h = harness(Arc::new(Failing), openai_config(), ChatConfig::default(), false);

        h.orc.set_input("Hello");
        let outcome = h.orc.submit().await;

        assert!(matches!(outcome, TurnOutcome::Failed(ref e) if e.provider() == Provider::OpenAi));
        assert_eq!(h.orc.messages(), vec![Message::user("Hello")]);
        assert!(!h.orc.is_loading());

        let notices = drain(&mut h.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].stage, Stage::Provider(Provider::OpenAi));
        assert!(notices[0].to_string().contains("openai"));
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected_without_dispatch() {
        let backend = FixedReply::new("unused");
        let config = ProviderConfig {
            api_key: String::new(),
            ..openai_config()
        };
        let mut h = harness(backend.clone(), config, ChatConfig::default(), false);

        h.orc.set_input("Hello");
        assert!(matches!(h.orc.submit().await, TurnOutcome::Rejected));

        assert_eq!(backend.calls(), 0);
        assert!(h.orc.messages().is_empty());
        assert_eq!(h.orc.input(), "Hello");

        let notices = drain(&mut h.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].stage, Stage::Provider(Provider::OpenAi));
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_dispatch() {
        let backend = FixedReply::new("unused");
        let mut h = harness(backend.clone(), openai_config(), ChatConfig::default(), false);

        h.orc.set_input("   ");
        assert!(matches!(h.orc.submit().await, TurnOutcome::Rejected));

        assert_eq!(backend.calls(), 0);
        assert!(h.orc.messages().is_empty());
        let notices = drain(&mut h.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].stage, Stage::Input);
    }

    #[tokio::test]
    async fn reset_clears_history_and_notifies_once() {
        let backend = FixedReply::new("ok");
        let mut h = harness(backend, openai_config(), ChatConfig::default(), false);

        h.orc.set_input("one");
        h.orc.submit().await;
        h.orc
            .shared_state()
            .lock()
            .unwrap()
            .messages
            .push(Message::user("two"));
        assert_eq!(h.orc.messages().len(), 3);

        h.orc.reset();

        assert!(h.orc.messages().is_empty());
        let notices = drain(&mut h.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert_eq!(notices[0].stage, Stage::History);
    }

    #[tokio::test]
    async fn reply_after_reset_is_appended_by_default() {
        let (backend, release) = Gated::new();
        let h = harness(backend.clone(), openai_config(), ChatConfig::default(), false);

        h.orc.set_input("Hello");
        let task = tokio::spawn({
            let orc = Arc::clone(&h.orc);
            async move { orc.submit().await }
        });

        backend.started.notified().await;
        assert!(h.orc.is_loading());

        h.orc.reset();
        release.send("late reply".into()).unwrap();
        let outcome = task.await.unwrap();

        assert!(matches!(outcome, TurnOutcome::Replied { .. }));
        assert_eq!(h.orc.messages(), vec![Message::avatar("late reply")]);
        assert!(!h.orc.is_loading());
    }

    #[tokio::test]
    async fn reply_after_reset_can_be_discarded() {
        let (backend, release) = Gated::new();
        let chat = ChatConfig {
            discard_stale_replies: true,
        };
        let h = harness(backend.clone(), with_voice(openai_config()), chat, false);

        h.orc.set_input("Hello");
        let task = tokio::spawn({
            let orc = Arc::clone(&h.orc);
            async move { orc.submit().await }
        });

        backend.started.notified().await;
        h.orc.reset();
        release.send("late reply".into()).unwrap();

        assert!(matches!(task.await.unwrap(), TurnOutcome::Discarded));
        assert!(h.orc.messages().is_empty());
        assert_eq!(h.output.play_count(), 0);
        assert_eq!(h.orc.turn(), TurnState::Idle);
    }

    #[tokio::test]
    async fn busy_turn_rejects_new_input() {
        let (backend, release) = Gated::new();
        let mut h = harness(backend.clone(), openai_config(), ChatConfig::default(), false);

        h.orc.set_input("first");
        let task = tokio::spawn({
            let orc = Arc::clone(&h.orc);
            async move { orc.submit().await }
        });
        backend.started.notified().await;

        h.orc.set_input("second");
        assert!(matches!(h.orc.submit().await, TurnOutcome::Rejected));
        assert_eq!(h.orc.input(), "second");

        let notices = drain(&mut h.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);

        release.send("done".into()).unwrap();
        task.await.unwrap();
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn config_edits_do_not_affect_turn_in_flight() {
        let (backend, release) = Gated::new();
        let h = harness(backend.clone(), openai_config(), ChatConfig::default(), false);

        h.orc.set_input("Hello");
        let task = tokio::spawn({
            let orc = Arc::clone(&h.orc);
            async move { orc.submit().await }
        });
        backend.started.notified().await;

        h.orc.update_config(ConfigPatch {
            model: Some("gpt-4o".into()),
            ..ConfigPatch::default()
        });
        release.send("ok".into()).unwrap();
        task.await.unwrap();

        assert_eq!(backend.seen.lock().unwrap()[0].model, "gpt-4o-mini");
        assert_eq!(h.orc.config().model, "gpt-4o");
    }

    #[tokio::test]
    async fn voiced_reply_drives_speaking_state() {
        let backend = FixedReply::new("Hi there.");
        let h = harness(backend, with_voice(openai_config()), ChatConfig::default(), false);
        let speaking = h.orc.speaking_state();
        assert!(!speaking.is_speaking());

        h.orc.set_input("Hello");
        let outcome = h.orc.submit().await;

        assert!(matches!(
            outcome,
            TurnOutcome::Replied { speech: Some(Ok(_)), .. }
        ));
        assert!(speaking.is_speaking());
        assert_eq!(h.orc.turn(), TurnState::Idle);

        h.output.finish(0);
        assert!(!speaking.is_speaking());
    }

    #[tokio::test]
    async fn speech_failure_keeps_reply() {
        let backend = FixedReply::new("Hi there.");
        let mut h = harness(backend, with_voice(openai_config()), ChatConfig::default(), true);

        h.orc.set_input("Hello");
        let outcome = h.orc.submit().await;

        assert!(matches!(
            outcome,
            TurnOutcome::Replied { speech: Some(Err(_)), .. }
        ));
        let messages = h.orc.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Avatar);
        assert!(!h.orc.speaking_state().is_speaking());
        assert_eq!(h.orc.turn(), TurnState::Idle);

        let notices = drain(&mut h.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].stage, Stage::Speech);
        assert!(notices[0].to_string().starts_with("[speech generation]"));
    }

    #[tokio::test]
    async fn playback_failure_is_reported_as_speech() {
        let backend = FixedReply::new("Hi there.");
        let mut h = harness(backend, with_voice(openai_config()), ChatConfig::default(), false);
        h.output.fail_next("no device");

        h.orc.set_input("Hello");
        let outcome = h.orc.submit().await;

        match outcome {
            TurnOutcome::Replied {
                speech: Some(Err(e)),
                ..
            } => assert!(e.is_playback()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.orc.messages().len(), 2);
        assert!(!h.orc.speaking_state().is_speaking());
        assert_eq!(drain(&mut h.notices).len(), 1);
    }
}
