//! Turns reply text into audible speech and owns the speaking flag.
//!
//! One utterance plays at a time.  Starting a new one stops the previous
//! clip first (which reports `Paused`) and releases its registered audio, so
//! the speaking flag sees exactly one `false` for the old clip before the new
//! clip's `Started`.  Events carry the id of the utterance they belong to;
//! anything arriving for a superseded utterance is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::audio::{
    AudioClip, AudioOutput, ClipId, ClipStore, Lifecycle, LifecycleListener, Playback,
    PlaybackEvent,
};
use crate::config::VoiceConfig;
use crate::tts::client::{SpeechBackend, SpeechError};
use crate::tts::speaking::{SpeakingState, SpeakingWriter};

/// Describes an utterance that has started playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioHandle {
    /// Monotonic utterance number, starting at 1.
    pub utterance: u64,
    /// Registered clip backing the utterance.
    pub clip: ClipId,
    /// Length of the decoded audio.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// Lifecycle tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Current {
    utterance: u64,
    clip: ClipId,
}

/// Applies playback events to the speaking flag.  Holds the only writer.
struct Tracker {
    writer: SpeakingWriter,
    clips: ClipStore,
    current: Mutex<Option<Current>>,
}

impl Tracker {
    fn current(&self) -> MutexGuard<'_, Option<Current>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, utterance: u64, event: PlaybackEvent) {
        let mut current = self.current();
        let Some(active) = (*current).filter(|c| c.utterance == utterance) else {
            log::debug!("ignoring {event:?} from superseded utterance {utterance}");
            return;
        };

        match event {
            PlaybackEvent::Started => {
                self.writer.set(true);
            }
            PlaybackEvent::Paused => {
                self.writer.set(false);
            }
            PlaybackEvent::Ended => {
                self.writer.set(false);
                self.clips.release(active.clip);
                *current = None;
            }
        }
    }

    fn begin(&self, utterance: u64, clip: ClipId) {
        *self.current() = Some(Current { utterance, clip });
    }

    /// Forget the active utterance (if any) and release its clip.
    fn retire_current(&self) {
        if let Some(previous) = self.current().take() {
            self.clips.release(previous.clip);
        }
    }
}

/// Lifecycle listener bound to one utterance.
struct UtteranceSink {
    utterance: u64,
    tracker: Arc<Tracker>,
}

impl LifecycleListener for UtteranceSink {
    fn on_event(&self, event: PlaybackEvent) {
        self.tracker.handle(self.utterance, event);
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer
// ---------------------------------------------------------------------------

/// Synthesises reply text and plays it through an [`AudioOutput`].
pub struct SpeechSynthesizer {
    backend: Arc<dyn SpeechBackend>,
    output: Arc<dyn AudioOutput>,
    output_format: String,
    clips: ClipStore,
    tracker: Arc<Tracker>,
    next_utterance: AtomicU64,
    /// The playing clip.  Held while a new clip starts, so two `speak`
    /// calls cannot both end up playing.
    playing: AsyncMutex<Option<Box<dyn Playback>>>,
}

impl SpeechSynthesizer {
    /// `output_format` must match what `backend` returns (e.g. `pcm_16000`).
    pub fn new(
        backend: Arc<dyn SpeechBackend>,
        output: Arc<dyn AudioOutput>,
        output_format: impl Into<String>,
    ) -> Self {
        let clips = ClipStore::new();
        let (writer, _initial) = SpeakingWriter::new();
        let tracker = Arc::new(Tracker {
            writer,
            clips: clips.clone(),
            current: Mutex::new(None),
        });

        Self {
            backend,
            output,
            output_format: output_format.into(),
            clips,
            tracker,
            next_utterance: AtomicU64::new(0),
            playing: AsyncMutex::new(None),
        }
    }

    /// A new reader of the speaking flag.
    pub fn speaking_state(&self) -> SpeakingState {
        self.tracker.writer.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking_state().is_speaking()
    }

    /// Registry of clips that are still playable.
    pub fn clips(&self) -> &ClipStore {
        &self.clips
    }

    /// Synthesise `text` with `voice` and start playing it.
    ///
    /// Returns once playback has started.  Generation errors leave the
    /// current utterance untouched; playback errors happen after it has been
    /// stopped, so the speaking flag is `false` afterwards.
    pub async fn speak(&self, text: &str, voice: &VoiceConfig) -> Result<AudioHandle, SpeechError> {
        let payload = self.backend.synthesize(text, voice).await?;
        let clip = AudioClip::decode(&payload, &self.output_format)?;
        let duration = clip.duration();

        let mut playing = self.playing.lock().await;
        if let Some(mut previous) = playing.take() {
            previous.stop();
        }
        self.tracker.retire_current();

        let (clip_id, clip) = self.clips.register(clip);
        let utterance = self.next_utterance.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.begin(utterance, clip_id);

        let sink: Lifecycle = Arc::new(UtteranceSink {
            utterance,
            tracker: Arc::clone(&self.tracker),
        });

        match self.output.play(clip, Arc::clone(&sink)).await {
            Ok(playback) => {
                *playing = Some(playback);
                log::info!("speaking utterance {utterance} ({:.1}s)", duration.as_secs_f32());
                Ok(AudioHandle {
                    utterance,
                    clip: clip_id,
                    duration,
                })
            }
            Err(e) => {
                sink.on_event(PlaybackEvent::Paused);
                self.tracker.retire_current();
                log::warn!("could not play utterance {utterance}: {e}");
                Err(e.into())
            }
        }
    }

    /// Stop the current utterance, if any.
    pub async fn stop(&self) {
        let mut playing = self.playing.lock().await;
        if let Some(mut previous) = playing.take() {
            previous.stop();
        }
        self.tracker.retire_current();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
