//! Audio output abstraction and playback lifecycle events.
//!
//! An [`AudioOutput`] starts playing a clip and reports what happens to it
//! through a [`LifecycleListener`]: [`PlaybackEvent::Started`] once sound is
//! flowing, then exactly one of [`PlaybackEvent::Ended`] (ran to completion)
//! or [`PlaybackEvent::Paused`] (stopped early).  The returned [`Playback`]
//! handle lets the owner stop the clip.
//!
//! Implementations:
//! * [`SilentOutput`]: no device; "plays" on a timer so listeners still see
//!   a realistic Started → Ended timeline.
//! * `CpalOutput` (feature `playback`): speaker output.
//! * [`ManualOutput`] (tests only): the test fires lifecycle events itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::audio::clip::AudioClip;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors that prevent a synthesised clip from being played locally.
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    /// The payload held no audio samples.
    #[error("audio payload is empty")]
    EmptyClip,

    /// The payload encoding cannot be decoded locally.
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// The output device could not be opened or started.
    #[error("audio output failed: {0}")]
    Device(String),
}

// ---------------------------------------------------------------------------
// Lifecycle events
// ---------------------------------------------------------------------------

/// Playback lifecycle of a single clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Sound has started.
    Started,
    /// The clip played to the end.
    Ended,
    /// The clip was stopped before the end (or failed after starting).
    Paused,
}

/// Receives the lifecycle events of one clip.  Called from whichever thread
/// drives the output; implementations must not block.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: PlaybackEvent);
}

/// Shared listener handle passed to [`AudioOutput::play`].
pub type Lifecycle = Arc<dyn LifecycleListener>;

// ---------------------------------------------------------------------------
// AudioOutput / Playback traits
// ---------------------------------------------------------------------------

/// A clip that is currently playing.
pub trait Playback: Send {
    /// Stop the clip.  If it has not ended yet, [`PlaybackEvent::Paused`] is
    /// delivered before this returns; later events from the clip are dropped.
    fn stop(&mut self);
}

/// Something that can play clips.
///
/// `play` must deliver [`PlaybackEvent::Started`] (possibly from another
/// thread) before or at the moment it resolves to `Ok`.  On `Err` no event
/// needs to have been delivered.  Waiting for a device to open happens by
/// awaiting, never by blocking the calling thread, so the frame loop keeps
/// running on a single-threaded runtime.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(
        &self,
        clip: Arc<AudioClip>,
        lifecycle: Lifecycle,
    ) -> Result<Box<dyn Playback>, PlaybackError>;
}

// Compile-time assertion: Box<dyn AudioOutput> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioOutput>) {}
};

// ---------------------------------------------------------------------------
// SilentOutput
// ---------------------------------------------------------------------------

/// Output used when no sound device is available.
///
/// Emits `Started` immediately and `Ended` after the clip's duration on a
/// tokio timer.  Must be called from inside a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentOutput;

struct SilentPlayback {
    stop_tx: Option<oneshot::Sender<()>>,
    done: Arc<AtomicBool>,
    lifecycle: Lifecycle,
}

#[async_trait]
impl AudioOutput for SilentOutput {
    async fn play(
        &self,
        clip: Arc<AudioClip>,
        lifecycle: Lifecycle,
    ) -> Result<Box<dyn Playback>, PlaybackError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| PlaybackError::Device("silent output needs a tokio runtime".into()))?;

        let done = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let duration = clip.duration();

        lifecycle.on_event(PlaybackEvent::Started);

        let task_done = Arc::clone(&done);
        let task_lifecycle = Arc::clone(&lifecycle);
        runtime.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    if !task_done.swap(true, Ordering::SeqCst) {
                        task_lifecycle.on_event(PlaybackEvent::Ended);
                    }
                }
                Ok(()) = stop_rx => {}
            }
        });

        Ok(Box::new(SilentPlayback {
            stop_tx: Some(stop_tx),
            done,
            lifecycle,
        }))
    }
}

impl Playback for SilentPlayback {
    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if !self.done.swap(true, Ordering::SeqCst) {
            self.lifecycle.on_event(PlaybackEvent::Paused);
        }
    }
}

// ---------------------------------------------------------------------------
// ManualOutput (tests)
// ---------------------------------------------------------------------------

/// Test output whose clips only end when the test says so.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct ManualOutput {
    inner: Arc<std::sync::Mutex<ManualInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct ManualInner {
    plays: Vec<ManualPlay>,
    fail_next: Option<String>,
}

#[cfg(test)]
#[derive(Clone)]
struct ManualPlay {
    lifecycle: Lifecycle,
    done: Arc<AtomicBool>,
}

#[cfg(test)]
struct ManualPlayback {
    done: Arc<AtomicBool>,
    lifecycle: Lifecycle,
}

#[cfg(test)]
impl ManualOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `play` call fail with a device error.
    pub fn fail_next(&self, reason: &str) {
        self.inner.lock().unwrap().fail_next = Some(reason.to_string());
    }

    /// Number of clips that started playing.
    pub fn play_count(&self) -> usize {
        self.inner.lock().unwrap().plays.len()
    }

    /// `true` once clip `index` has ended or been stopped.
    pub fn is_done(&self, index: usize) -> bool {
        self.inner.lock().unwrap().plays[index].done.load(Ordering::SeqCst)
    }

    /// Let clip `index` run to completion.
    pub fn finish(&self, index: usize) {
        self.complete(index, PlaybackEvent::Ended);
    }

    /// Pause clip `index` from the device side.
    pub fn pause(&self, index: usize) {
        self.complete(index, PlaybackEvent::Paused);
    }

    fn complete(&self, index: usize, event: PlaybackEvent) {
        let play = self.inner.lock().unwrap().plays[index].clone();
        if !play.done.swap(true, Ordering::SeqCst) {
            play.lifecycle.on_event(event);
        }
    }
}

#[cfg(test)]
#[async_trait]
impl AudioOutput for ManualOutput {
    async fn play(
        &self,
        clip: Arc<AudioClip>,
        lifecycle: Lifecycle,
    ) -> Result<Box<dyn Playback>, PlaybackError> {
        if let Some(reason) = self.inner.lock().unwrap().fail_next.take() {
            return Err(PlaybackError::Device(reason));
        }

        let done = Arc::new(AtomicBool::new(false));
        lifecycle.on_event(PlaybackEvent::Started);
        self.inner.lock().unwrap().plays.push(ManualPlay {
            lifecycle: Arc::clone(&lifecycle),
            done: Arc::clone(&done),
        });

        Ok(Box::new(ManualPlayback { done, lifecycle }))
    }
}

#[cfg(test)]
impl Playback for ManualPlayback {
    fn stop(&mut self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            self.lifecycle.on_event(PlaybackEvent::Paused);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every event it receives.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<PlaybackEvent>>);

    impl LifecycleListener for Recorder {
        fn on_event(&self, event: PlaybackEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn events(&self) -> Vec<PlaybackEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    /// 10 ms of silence at 16 kHz.
    fn short_clip() -> Arc<AudioClip> {
        Arc::new(AudioClip::new(vec![0.0; 160], 16_000))
    }

    #[tokio::test]
    async fn silent_output_starts_then_ends() {
        let recorder = Arc::new(Recorder::default());
        let _playback = SilentOutput
            .play(short_clip(), recorder.clone())
            .await
            .unwrap();

        assert_eq!(recorder.events(), vec![PlaybackEvent::Started]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            recorder.events(),
            vec![PlaybackEvent::Started, PlaybackEvent::Ended]
        );
    }

    #[tokio::test]
    async fn silent_output_stop_pauses_and_suppresses_end() {
        let recorder = Arc::new(Recorder::default());
        let long = Arc::new(AudioClip::new(vec![0.0; 16_000], 16_000));
        let mut playback = SilentOutput.play(long, recorder.clone()).await.unwrap();

        playback.stop();
        playback.stop();

        assert_eq!(
            recorder.events(),
            vec![PlaybackEvent::Started, PlaybackEvent::Paused]
        );
    }

    #[tokio::test]
    async fn stop_after_end_emits_nothing_more() {
        let recorder = Arc::new(Recorder::default());
        let mut playback = SilentOutput
            .play(short_clip(), recorder.clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        playback.stop();

        assert_eq!(
            recorder.events(),
            vec![PlaybackEvent::Started, PlaybackEvent::Ended]
        );
    }

    #[tokio::test]
    async fn manual_output_fail_next_only_fails_once() {
        let output = ManualOutput::new();
        output.fail_next("no device");

        let recorder = Arc::new(Recorder::default());
        assert!(output.play(short_clip(), recorder.clone()).await.is_err());
        assert!(output.play(short_clip(), recorder.clone()).await.is_ok());
        assert_eq!(output.play_count(), 1);
        assert_eq!(recorder.events(), vec![PlaybackEvent::Started]);
    }
}
