//! Text-to-speech: reply text → synthesised audio → playback + speaking flag.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     SpeechSynthesizer                      │
//! │                                                            │
//! │  speak(text, voice)                                        │
//! │     │                                                      │
//! │     ├─ SpeechBackend::synthesize   (SpeechClient / HTTP)   │
//! │     ├─ AudioClip::decode + ClipStore::register             │
//! │     ├─ stop previous utterance  → Paused → speaking=false  │
//! │     └─ AudioOutput::play        → Started → speaking=true  │
//! │                                   Ended   → speaking=false │
//! │                                             release clip   │
//! └──────────────────────────────┬─────────────────────────────┘
//!                                │ watch
//!                                ▼
//!                  SpeakingState (read per frame)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use avatar_chat::audio::SilentOutput;
//! use avatar_chat::config::{AppConfig, VoiceConfig};
//! use avatar_chat::tts::{SpeechClient, SpeechSynthesizer};
//!
//! # #[tokio::main] async fn main() {
//! let config = AppConfig::default();
//! let client = SpeechClient::from_config(&config.endpoints, &config.speech);
//! let synth = SpeechSynthesizer::new(
//!     Arc::new(client),
//!     Arc::new(SilentOutput),
//!     config.speech.output_format.clone(),
//! );
//!
//! let voice = VoiceConfig { api_key: "xi-...".into(), voice_id: "voice".into() };
//! synth.speak("Hello!", &voice).await.unwrap();
//! assert!(synth.speaking_state().is_speaking());
//! # }
//! ```

pub mod client;
pub mod speaking;
pub mod synthesizer;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{SpeechBackend, SpeechClient, SpeechError};
pub use speaking::SpeakingState;
pub use synthesizer::{AudioHandle, SpeechSynthesizer};
