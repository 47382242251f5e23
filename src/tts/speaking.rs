//! The process-wide "avatar is speaking" flag.
//!
//! Backed by a `tokio::sync::watch` channel.  [`SpeakingState`] is the
//! read side: cheap to clone, never blocks, and always reports the latest
//! value, which is exactly what a per-frame reader needs.
//!
//! The write side, [`SpeakingWriter`], is crate-private and not `Clone`.  The
//! only instance lives inside the speech synthesizer's lifecycle handler, so
//! playback start/end/pause events are the sole way the flag can change.

use tokio::sync::watch;

// ---------------------------------------------------------------------------
// SpeakingState
// ---------------------------------------------------------------------------

/// Read-only view of the speaking flag.
#[derive(Debug, Clone)]
pub struct SpeakingState {
    rx: watch::Receiver<bool>,
}

impl SpeakingState {
    /// Current value.  Never blocks.
    pub fn is_speaking(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next change and return the new value, or `None` once the
    /// synthesizer has been dropped.
    pub async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

// ---------------------------------------------------------------------------
// SpeakingWriter
// ---------------------------------------------------------------------------

/// The single writer of the speaking flag.
#[derive(Debug)]
pub(crate) struct SpeakingWriter {
    tx: watch::Sender<bool>,
}

impl SpeakingWriter {
    /// Create the writer together with a first reader.  The flag starts `false`.
    pub(crate) fn new() -> (Self, SpeakingState) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, SpeakingState { rx })
    }

    /// Set the flag; readers are only woken when the value actually changes.
    pub(crate) fn set(&self, speaking: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == speaking {
                false
            } else {
                *current = speaking;
                true
            }
        });
        if changed {
            log::debug!("speaking state -> {speaking}");
        }
        changed
    }

    pub(crate) fn subscribe(&self) -> SpeakingState {
        SpeakingState {
            rx: self.tx.subscribe(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
