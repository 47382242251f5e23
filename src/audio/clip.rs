//! Playable clips and the registry that owns them.
//!
//! A synthesised utterance arrives as raw bytes.  [`AudioClip::decode`]
//! turns it into `f32` samples, and [`ClipStore`] keeps every clip that is
//! still playable.  A clip stays in the store until it is released, so the
//! synthesizer must release each utterance once it is superseded or
//! finished; [`ClipStore::live_count`] makes that observable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::audio::output::PlaybackError;

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// Mono `f32` PCM samples in `[-1.0, 1.0]` plus their sample rate.
#[derive(Debug, Clone)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    /// Wrap already-decoded samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a payload delivered in `output_format` (e.g. `"pcm_16000"`).
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::UnsupportedFormat`]: not a `pcm_<rate>` format.
    /// - [`PlaybackError::EmptyClip`]: the payload holds no whole sample.
    pub fn decode(bytes: &[u8], output_format: &str) -> Result<Self, PlaybackError> {
        let rate = pcm_sample_rate(output_format)
            .ok_or_else(|| PlaybackError::UnsupportedFormat(output_format.to_string()))?;
        Self::from_pcm16_le(bytes, rate)
    }

    /// Decode signed 16-bit little-endian mono PCM.  A trailing odd byte is
    /// ignored.
    pub fn from_pcm16_le(bytes: &[u8], sample_rate: u32) -> Result<Self, PlaybackError> {
        let samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
            .collect();

        if samples.is_empty() {
            return Err(PlaybackError::EmptyClip);
        }

        Ok(Self::new(samples, sample_rate))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Wall-clock length of the clip.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Sample rate encoded in a `pcm_<rate>` output format name.
///
/// ```
/// use avatar_chat::audio::pcm_sample_rate;
///
/// assert_eq!(pcm_sample_rate("pcm_16000"), Some(16_000));
/// assert_eq!(pcm_sample_rate("mp3_44100_128"), None);
/// ```
pub fn pcm_sample_rate(output_format: &str) -> Option<u32> {
    output_format
        .strip_prefix("pcm_")
        .and_then(|rate| rate.parse::<u32>().ok())
        .filter(|&rate| rate > 0)
}

// ---------------------------------------------------------------------------
// ClipStore
// ---------------------------------------------------------------------------

/// Identifier of a clip registered in a [`ClipStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(u64);

#[derive(Default)]
struct StoreInner {
    next_id: u64,
    clips: HashMap<ClipId, Arc<AudioClip>>,
}

/// Registry of playable clips.  Cheap to clone; clones share the registry.
#[derive(Clone, Default)]
pub struct ClipStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `clip` playable and return its id.
    pub fn register(&self, clip: AudioClip) -> (ClipId, Arc<AudioClip>) {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = ClipId(inner.next_id);
        let clip = Arc::new(clip);
        inner.clips.insert(id, Arc::clone(&clip));
        (id, clip)
    }

    pub fn get(&self, id: ClipId) -> Option<Arc<AudioClip>> {
        self.lock().clips.get(&id).cloned()
    }

    /// Release a clip.  Returns `false` if it was already released.
    pub fn release(&self, id: ClipId) -> bool {
        let released = self.lock().clips.remove(&id).is_some();
        if released {
            log::debug!("released audio clip {id:?}");
        }
        released
    }

    /// Number of clips that have not been released yet.
    pub fn live_count(&self) -> usize {
        self.lock().clips.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pcm16_little_endian() {
        // 0x4000 = 16384 → 0.5, 0xC000 = -16384 → -0.5
        let bytes = [0x00, 0x40, 0x00, 0xC0];
        let clip = AudioClip::from_pcm16_le(&bytes, 16_000).unwrap();
        assert_eq!(clip.samples().len(), 2);
        assert!((clip.samples()[0] - 0.5).abs() < 1e-6);
        assert!((clip.samples()[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn trailing_odd_byte_is_ignored() {
        let clip = AudioClip::from_pcm16_le(&[0, 0, 0, 0, 7], 16_000).unwrap();
        assert_eq!(clip.samples().len(), 2);
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            AudioClip::from_pcm16_le(&[1], 16_000),
            Err(PlaybackError::EmptyClip)
        ));
    }

    #[test]
    fn non_pcm_format_is_unsupported() {
        let err = AudioClip::decode(&[0, 0], "mp3_44100_128").unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedFormat(f) if f == "mp3_44100_128"));
    }

    #[test]
    fn duration_follows_sample_rate() {
        // 1 s at 16 kHz = 32 000 bytes
        let clip = AudioClip::decode(&vec![0u8; 32_000], "pcm_16000").unwrap();
        assert_eq!(clip.duration(), Duration::from_secs(1));
    }

    #[test]
    fn pcm_rate_rejects_garbage() {
        assert_eq!(pcm_sample_rate("pcm_"), None);
        assert_eq!(pcm_sample_rate("pcm_0"), None);
        assert_eq!(pcm_sample_rate("pcm_22050"), Some(22_050));
    }

    #[test]
    fn store_register_and_release() {
        let store = ClipStore::new();
        let (a, _) = store.register(AudioClip::new(vec![0.0; 4], 16_000));
        let (b, _) = store.register(AudioClip::new(vec![0.0; 4], 16_000));
        assert_ne!(a, b);
        assert_eq!(store.live_count(), 2);

        assert!(store.release(a));
        assert!(!store.release(a), "second release is a no-op");
        assert!(store.get(a).is_none());
        assert!(store.get(b).is_some());
        assert_eq!(store.live_count(), 1);
    }

    #[test]
    fn clones_share_the_registry() {
        let store = ClipStore::new();
        let other = store.clone();
        let (id, _) = store.register(AudioClip::new(vec![0.0], 16_000));
        assert!(other.release(id));
        assert_eq!(store.live_count(), 0);
    }
}
