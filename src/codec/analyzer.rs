//! Forward analysis of a whole clip
//!
//! One FFT over the full sample sequence (no windowing, no framing: the
//! reconstruction needs the exact spectrum of the clip, not an average).
//!
//! # Significant bins
//!
//! A bin is significant when its magnitude exceeds 1% of the peak magnitude.
//! For a real signal `|F[k]| == |F[N-k]|`, so only the non-redundant half
//! `0..=N/2` is ranked; negative-frequency bins come back as conjugate images
//! during reconstruction. This is what makes "K components" mean K distinct
//! frequencies rather than K/2 frequencies plus their mirrors.
//!
//! ```text
//! bin:       0   1   2  ...  N/2  ...  N-2  N-1
//!            DC  <- ranked half ->|<- images ->
//! ```

use crate::clip::AudioClip;
use crate::error::{CodecError, Stage};
use rustfft::{num_complex::Complex, FftPlanner};

/// Fraction of the peak magnitude below which bins are treated as noise
pub const NOISE_FLOOR_RATIO: f64 = 0.01;

/// Full complex spectrum of one clip. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    bins: Vec<Complex<f64>>,
}

impl Spectrum {
    pub fn bins(&self) -> &[Complex<f64>] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Bin with no distinct mirror partner, present only for even lengths
    pub fn nyquist_bin(&self) -> Option<usize> {
        nyquist_bin(self.bins.len())
    }
}

pub(crate) fn nyquist_bin(n: usize) -> Option<usize> {
    if n > 0 && n % 2 == 0 {
        Some(n / 2)
    } else {
        None
    }
}

/// Result of one analysis pass
#[derive(Debug, Clone)]
pub struct Analysis {
    pub spectrum: Spectrum,
    /// `|bin[k]|` for every bin
    pub magnitude: Vec<f64>,
    /// Significant bins in ascending index order, all within `0..=N/2`
    pub significant: Vec<usize>,
    pub peak: f64,
    pub threshold: f64,
    pub sample_rate: u32,
}

impl Analysis {
    /// Number of bins (equals the clip length)
    pub fn len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }

    pub fn is_silent(&self) -> bool {
        self.peak == 0.0
    }

    /// Signed frequency of a bin in Hz (`fftfreq` convention).
    ///
    /// Diagnostics only. Selection and reconstruction work on bin indices.
    pub fn bin_frequency(&self, k: usize) -> f64 {
        bin_frequency(k, self.len(), self.sample_rate)
    }

    /// Fraction of total spectral energy held by `selected` plus the
    /// conjugate images reconstruction would add. 0.0 for a silent clip.
    pub fn energy_capture(&self, selected: &[usize]) -> f64 {
        let total: f64 = self.magnitude.iter().map(|m| m * m).sum();
        if total == 0.0 {
            return 0.0;
        }
        let n = self.len();
        let nyquist = self.spectrum.nyquist_bin();
        let mut mask = vec![false; n];
        for &k in selected.iter().filter(|&&k| k < n) {
            mask[k] = true;
            if k != 0 && Some(k) != nyquist {
                mask[n - k] = true;
            }
        }
        let captured: f64 = self
            .magnitude
            .iter()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(m, _)| m * m)
            .sum();
        (captured / total).min(1.0)
    }
}

pub(crate) fn bin_frequency(k: usize, n: usize, sample_rate: u32) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let signed = if k < (n + 1) / 2 {
        k as f64
    } else {
        k as f64 - n as f64
    };
    signed * sample_rate as f64 / n as f64
}

/// Forward-transform `clip` and find its significant bins
pub fn analyze(clip: &AudioClip) -> Result<Analysis, CodecError> {
    clip.validate()?;

    let n = clip.len();
    let mut buffer: Vec<Complex<f64>> = Vec::new();
    buffer.try_reserve_exact(n).map_err(|e| {
        CodecError::compute(
            Stage::Analyze,
            format!("cannot allocate spectrum of {} bins: {}", n, e),
        )
    })?;
    buffer.extend(clip.samples.iter().map(|&s| Complex::new(s, 0.0)));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let magnitude: Vec<f64> = buffer.iter().map(|c| c.norm()).collect();
    if let Some(k) = magnitude.iter().position(|m| !m.is_finite()) {
        return Err(CodecError::compute(
            Stage::Analyze,
            format!("bin {} magnitude overflowed", k),
        ));
    }

    let peak = magnitude.iter().cloned().fold(0.0f64, f64::max);
    let threshold = peak * NOISE_FLOOR_RATIO;

    // With peak == 0 nothing is strictly above the threshold: silent clips
    // legitimately have no significant bins.
    let significant: Vec<usize> = (0..=n / 2)
        .filter(|&k| magnitude[k] > threshold)
        .collect();

    log::debug!(
        "Analyzed {} samples @ {}Hz: peak={:.3} threshold={:.3} significant={}",
        n,
        clip.sample_rate,
        peak,
        threshold,
        significant.len()
    );

    Ok(Analysis {
        spectrum: Spectrum { bins: buffer },
        magnitude,
        significant,
        peak,
        threshold,
        sample_rate: clip.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // EDUCATIONAL BACKGROUND: Bins and Frequencies
    // ==========================================================================
    //
    // A clip of N samples at rate R yields N bins spaced R/N Hz apart. A tone
    // of f Hz lands exactly on bin f*N/R when that is an integer, with
    // magnitude amplitude*N/2, and an identical-magnitude image at N-k.
    // ==========================================================================

    fn tone_clip(freq: f64, amp: f64, n: usize, rate: u32) -> AudioClip {
        AudioClip::from_tones(&[(freq, amp)], n as f64 / rate as f64, rate)
    }

    #[test]
    fn test_single_tone_lands_on_one_bin() {
        // 64 samples @ 64Hz -> 1Hz bins; 8Hz tone -> bin 8
        let clip = tone_clip(8.0, 1.0, 64, 64);
        let analysis = analyze(&clip).unwrap();

        assert_eq!(analysis.len(), 64);
        assert_eq!(analysis.significant, vec![8]);
        assert!((analysis.magnitude[8] - 32.0).abs() < 1e-9);
        assert!((analysis.magnitude[56] - 32.0).abs() < 1e-9);
        assert!((analysis.peak - 32.0).abs() < 1e-9);
        assert!((analysis.threshold - 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_significant_set_excludes_mirror_half() {
        let clip = AudioClip::from_tones(&[(3.0, 1.0), (10.0, 0.5)], 1.0, 32);
        let analysis = analyze(&clip).unwrap();
        assert_eq!(analysis.significant, vec![3, 10]);
        assert!(analysis.significant.iter().all(|&k| k <= 16));
    }

    #[test]
    fn test_noise_floor_drops_quiet_tone() {
        // Second tone at 0.5% of the first is below the 1% floor
        let clip = AudioClip::from_tones(&[(4.0, 1.0), (9.0, 0.005)], 1.0, 64);
        let analysis = analyze(&clip).unwrap();
        assert_eq!(analysis.significant, vec![4]);
    }

    #[test]
    fn test_silent_clip_has_no_significant_bins() {
        let clip = AudioClip::new(vec![0.0; 128], 8000);
        let analysis = analyze(&clip).unwrap();
        assert!(analysis.is_silent());
        assert_eq!(analysis.threshold, 0.0);
        assert!(analysis.significant.is_empty());
        assert_eq!(analysis.energy_capture(&[]), 0.0);
    }

    #[test]
    fn test_single_sample_clip() {
        let analysis = analyze(&AudioClip::new(vec![0.5], 8000)).unwrap();
        assert_eq!(analysis.significant, vec![0]);
        assert!(analysis.spectrum.nyquist_bin().is_none());
    }

    #[test]
    fn test_invalid_clip_rejected_before_transform() {
        let err = analyze(&AudioClip::new(vec![], 44100)).unwrap_err();
        assert!(err.is_invalid_input());
        let err = analyze(&AudioClip::new(vec![f64::NAN], 44100)).unwrap_err();
        assert!(err.is_invalid_input());
    }

    // ==========================================================================
    // FREQUENCY AXIS / ENERGY
    // ==========================================================================

    #[test]
    fn test_nyquist_bin_only_for_even_lengths() {
        assert_eq!(nyquist_bin(8), Some(4));
        assert_eq!(nyquist_bin(9), None);
        assert_eq!(nyquist_bin(0), None);
    }

    #[test]
    fn test_bin_frequency_matches_fftfreq() {
        // fftfreq(8, 1/8) = [0, 1, 2, 3, -4, -3, -2, -1]
        let expected = [0.0, 1.0, 2.0, 3.0, -4.0, -3.0, -2.0, -1.0];
        for (k, &f) in expected.iter().enumerate() {
            assert_eq!(bin_frequency(k, 8, 8), f, "bin {}", k);
        }
        // Odd length: fftfreq(5, 1/5) = [0, 1, 2, -2, -1]
        assert_eq!(bin_frequency(2, 5, 5), 2.0);
        assert_eq!(bin_frequency(3, 5, 5), -2.0);
    }

    #[test]
    fn test_energy_capture_counts_images() {
        let clip = AudioClip::from_tones(&[(3.0, 1.0), (10.0, 1.0)], 1.0, 32);
        let analysis = analyze(&clip).unwrap();

        let one = analysis.energy_capture(&[3]);
        let both = analysis.energy_capture(&[3, 10]);
        assert!((one - 0.5).abs() < 1e-9, "one tone of two equal tones: {}", one);
        assert!((both - 1.0).abs() < 1e-9);
    }
}
