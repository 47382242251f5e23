//! Speaker output via `cpal`.
//!
//! `cpal::Stream` is not `Send` on every platform, so each clip gets a
//! dedicated `speech-playback` thread that opens the default output device,
//! plays the clip and reports lifecycle events.  `play` awaits a oneshot
//! from that thread until it has either started the stream or failed to, so
//! the runtime keeps polling other tasks while the device opens.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::oneshot;

use crate::audio::clip::AudioClip;
use crate::audio::output::{AudioOutput, Lifecycle, Playback, PlaybackError, PlaybackEvent};
use crate::audio::resample::{mono_to_interleaved, resample};

/// How long `play` waits for the playback thread to open the device.
const START_TIMEOUT: Duration = Duration::from_secs(3);
/// Poll interval of the playback thread.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// CpalOutput
// ---------------------------------------------------------------------------

/// Plays clips on the system default output device.
#[derive(Debug, Clone)]
pub struct CpalOutput {
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved channels reported by the device.
    channels: u16,
}

impl CpalOutput {
    /// Probe the default output device.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Device`] when there is no output device or it
    /// cannot report a default stream configuration.
    pub fn new() -> Result<Self, PlaybackError> {
        let (device, config) = default_device()?;
        let name = device.name().unwrap_or_else(|_| "<unknown>".into());
        log::info!(
            "audio output: {name} ({} Hz, {} ch)",
            config.sample_rate.0,
            config.channels
        );

        Ok(Self {
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

fn default_device() -> Result<(cpal::Device, cpal::StreamConfig), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::Device("no default output device".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::Device(format!("failed to query output config: {e}")))?;
    Ok((device, supported.into()))
}

struct CpalPlayback {
    stopped: Arc<AtomicBool>,
    lifecycle: Lifecycle,
}

impl Playback for CpalPlayback {
    fn stop(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.lifecycle.on_event(PlaybackEvent::Paused);
        }
    }
}

type ReadySender = oneshot::Sender<Result<(), PlaybackError>>;

#[async_trait]
impl AudioOutput for CpalOutput {
    async fn play(
        &self,
        clip: Arc<AudioClip>,
        lifecycle: Lifecycle,
    ) -> Result<Box<dyn Playback>, PlaybackError> {
        // Set by `stop` or by the thread once the clip has ended, whichever
        // comes first; the loser emits nothing.
        let stopped = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), PlaybackError>>();

        let thread_stopped = Arc::clone(&stopped);
        let thread_lifecycle = Arc::clone(&lifecycle);
        std::thread::Builder::new()
            .name("speech-playback".into())
            .spawn(move || run_clip(&clip, &thread_stopped, &thread_lifecycle, ready_tx))
            .map_err(|e| PlaybackError::Device(format!("failed to spawn playback thread: {e}")))?;

        match tokio::time::timeout(START_TIMEOUT, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(Box::new(CpalPlayback { stopped, lifecycle })),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(PlaybackError::Device(
                "playback thread exited before starting".into(),
            )),
            Err(_) => {
                // Keep a late-starting thread from playing anything.
                stopped.store(true, Ordering::SeqCst);
                Err(PlaybackError::Device("output stream did not start".into()))
            }
        }
    }
}

/// Body of the playback thread.
fn run_clip(
    clip: &AudioClip,
    stopped: &AtomicBool,
    lifecycle: &Lifecycle,
    ready_tx: ReadySender,
) {
    let (device, config) = match default_device() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let frames = resample(clip.samples(), clip.sample_rate(), config.sample_rate.0);
    let data = Arc::new(mono_to_interleaved(&frames, config.channels));
    let position = Arc::new(AtomicUsize::new(0));

    let cb_data = Arc::clone(&data);
    let cb_position = Arc::clone(&position);
    let stream = device.build_output_stream(
        &config,
        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let start = cb_position.load(Ordering::Relaxed);
            for (i, sample) in out.iter_mut().enumerate() {
                *sample = cb_data.get(start + i).copied().unwrap_or(0.0);
            }
            cb_position.store(start + out.len(), Ordering::Relaxed);
        },
        |err: cpal::StreamError| {
            log::error!("cpal output stream error: {err}");
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(PlaybackError::Device(format!(
                "failed to build output stream: {e}"
            ))));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(PlaybackError::Device(format!(
            "failed to start output stream: {e}"
        ))));
        return;
    }

    if stopped.load(Ordering::SeqCst) {
        return;
    }
    lifecycle.on_event(PlaybackEvent::Started);
    let _ = ready_tx.send(Ok(()));

    loop {
        std::thread::sleep(POLL_INTERVAL);
        if stopped.load(Ordering::SeqCst) {
            break;
        }
        if position.load(Ordering::Relaxed) >= data.len() {
            if !stopped.swap(true, Ordering::SeqCst) {
                lifecycle.on_event(PlaybackEvent::Ended);
            }
            break;
        }
    }

    drop(stream);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
