//! Audio side of speech output: decoded clips → output device → lifecycle events.
//!
//! # Pipeline
//!
//! ```text
//! speech payload → AudioClip::decode → ClipStore::register
//!               → AudioOutput::play → Started … Ended | Paused
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use avatar_chat::audio::{AudioClip, AudioOutput, LifecycleListener, PlaybackEvent, SilentOutput};
//!
//! struct Print;
//! impl LifecycleListener for Print {
//!     fn on_event(&self, event: PlaybackEvent) {
//!         println!("{event:?}");
//!     }
//! }
//!
//! # #[tokio::main] async fn main() {
//! let clip = AudioClip::decode(&vec![0u8; 32_000], "pcm_16000").unwrap();
//! let _playback = SilentOutput.play(Arc::new(clip), Arc::new(Print)).await.unwrap();
//! # }
//! ```

pub mod clip;
pub mod output;
#[cfg(feature = "playback")]
pub mod playback;
pub mod resample;

pub use clip::{pcm_sample_rate, AudioClip, ClipId, ClipStore};
pub use output::{
    AudioOutput, Lifecycle, LifecycleListener, Playback, PlaybackError, PlaybackEvent,
    SilentOutput,
};
#[cfg(feature = "playback")]
pub use playback::CpalOutput;
pub use resample::{mono_to_interleaved, resample};

// test-only re-export so the tts and pipeline tests can drive playback by hand.
#[cfg(test)]
pub use output::ManualOutput;
