//! Sample-rate conversion and channel fan-out for speaker output.
//!
//! Synthesised speech arrives as mono PCM at the rate named by the output
//! format (16 kHz by default).  Output devices usually want 44.1/48 kHz and
//! two or more channels, so before playback:
//!
//! 1. [`resample`]: linear interpolation from the clip rate to the device rate.
//! 2. [`mono_to_interleaved`]: copy each mono sample into every channel.

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample `samples` from `source_rate` Hz to `target_rate` Hz using linear
/// interpolation.
///
/// * Equal rates return the input unchanged.
/// * Empty input or a zero rate returns an empty vector.
///
/// # Example
///
/// ```rust
/// use avatar_chat::audio::resample;
///
/// // 16 kHz → 48 kHz triples the length
/// let lo = vec![0.5_f32; 160];
/// let hi = resample(&lo, 16_000, 48_000);
/// assert_eq!(hi.len(), 480);
/// ```
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate {
        return samples.to_vec();
    }

    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }

    let ratio = target_rate as f64 / source_rate as f64;
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos as usize;
        let frac = (src_pos - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ---------------------------------------------------------------------------
// mono_to_interleaved
// ---------------------------------------------------------------------------

/// Duplicate every mono sample into `channels` interleaved slots.
///
/// ```rust
/// use avatar_chat::audio::mono_to_interleaved;
///
/// assert_eq!(mono_to_interleaved(&[0.1, 0.2], 2), vec![0.1, 0.1, 0.2, 0.2]);
/// ```
pub fn mono_to_interleaved(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => samples
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(n as usize))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample(&input, 16_000, 16_000), input);
    }

    #[test]
    fn empty_input() {
        assert!(resample(&[], 16_000, 48_000).is_empty());
    }

    #[test]
    fn zero_rate_yields_nothing() {
        assert!(resample(&[0.5; 10], 0, 48_000).is_empty());
    }

    #[test]
    fn upsample_16k_to_44100_length() {
        // 1 second @ 16 kHz → ~44 100 samples
        let out = resample(&vec![0.0_f32; 16_000], 16_000, 44_100);
        assert!(out.len().abs_diff(44_100) <= 1, "got {}", out.len());
    }

    #[test]
    fn downsample_48k_to_16k_length() {
        let out = resample(&vec![0.5_f32; 480], 48_000, 16_000);
        assert_eq!(out.len(), 160);
    }

    #[test]
    fn constant_signal_keeps_amplitude() {
        let out = resample(&vec![0.5_f32; 160], 16_000, 48_000);
        for &s in &out {
            assert!((s - 0.5).abs() < 1e-5, "amplitude drift: {s}");
        }
    }

    #[test]
    fn interleave_three_channels() {
        let out = mono_to_interleaved(&[1.0, -1.0], 3);
        assert_eq!(out, vec![1.0, 1.0, 1.0, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn interleave_zero_channels() {
        assert!(mono_to_interleaved(&[1.0], 0).is_empty());
    }
}
