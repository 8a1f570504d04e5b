//! Audio clip value types
//!
//! [`AudioClip`] is what ingestion hands the codec: mono, floating point,
//! already normalised by the decoder. [`ReconstructedClip`] is what the codec
//! hands back, one per disclosure level.

use crate::error::{CodecError, Stage};
use serde::Serialize;

/// Mono audio clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioClip {
    /// One sample per time index
    pub samples: Vec<f64>,
    /// Samples per second
    pub sample_rate: u32,
}

impl AudioClip {
    /// Wrap samples without checking them. Use [`validate`](Self::validate)
    /// before handing the clip to anything that transforms it.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Sum of sine tones, each `(frequency_hz, amplitude)`
    pub fn from_tones(tones: &[(f64, f64)], duration_secs: f64, sample_rate: u32) -> Self {
        let len = (duration_secs * sample_rate as f64).round().max(0.0) as usize;
        let rate = sample_rate as f64;
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / rate;
                tones
                    .iter()
                    .map(|&(freq, amp)| amp * (2.0 * std::f64::consts::PI * freq * t).sin())
                    .sum()
            })
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Check the mono/non-empty/finite invariants
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.samples.is_empty() {
            return Err(CodecError::invalid(Stage::Validate, "clip has no samples"));
        }
        if self.sample_rate == 0 {
            return Err(CodecError::invalid(
                Stage::Validate,
                "sample_rate must be positive, got 0",
            ));
        }
        if let Some((idx, value)) = self
            .samples
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite())
        {
            return Err(CodecError::invalid(
                Stage::Validate,
                format!("sample {} is not finite ({})", idx, value),
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Extract `[start_secs, end_secs)` as a new clip.
    ///
    /// An end past the clip is clamped to the clip end. `None` means "to the end".
    pub fn window(&self, start_secs: f64, end_secs: Option<f64>) -> Result<AudioClip, CodecError> {
        self.validate()?;

        let total = self.duration_secs();
        if !start_secs.is_finite() || start_secs < 0.0 {
            return Err(CodecError::invalid(
                Stage::Validate,
                format!("window start must be a non-negative time, got {}", start_secs),
            ));
        }
        if start_secs >= total {
            return Err(CodecError::invalid(
                Stage::Validate,
                format!(
                    "window start ({}s) is beyond clip duration ({:.2}s)",
                    start_secs, total
                ),
            ));
        }

        let rate = self.sample_rate as f64;
        let start = ((start_secs * rate) as usize).min(self.len());
        let end = match end_secs {
            None => self.len(),
            Some(end) if end > total => {
                log::warn!(
                    "window end ({}s) is beyond clip duration ({:.2}s), using end of clip",
                    end,
                    total
                );
                self.len()
            }
            Some(end) => ((end.max(0.0) * rate) as usize).min(self.len()),
        };

        if start >= end {
            return Err(CodecError::invalid(
                Stage::Validate,
                format!(
                    "no samples in window {}s to {}",
                    start_secs,
                    end_secs
                        .map(|e| format!("{}s", e))
                        .unwrap_or_else(|| "end".to_string())
                ),
            ));
        }

        Ok(AudioClip::new(self.samples[start..end].to_vec(), self.sample_rate))
    }
}

/// One disclosure level's rendition of a source clip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconstructedClip {
    /// Requested bin budget this clip was built for
    pub level: u32,
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

impl ReconstructedClip {
    /// Peak absolute amplitude (1.0 for any non-silent reconstruction)
    pub fn peak(&self) -> f64 {
        self.samples.iter().fold(0.0f64, |acc, &s| acc.max(s.abs()))
    }

    /// True when every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_clip(self) -> AudioClip {
        AudioClip::new(self.samples, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // VALIDATION TESTS
    // ==========================================================================
    //
    // The codec trusts ingestion for mono/normalised samples but still checks
    // the invariants it cannot work without: at least one sample, a positive
    // rate, and no NaN/inf that would poison the whole spectrum.
    // ==========================================================================

    #[test]
    fn test_validate_accepts_ordinary_clip() {
        let clip = AudioClip::new(vec![0.0, 0.5, -0.5], 8000);
        assert!(clip.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let clip = AudioClip::new(vec![], 44100);
        let err = clip.validate().unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.stage(), Stage::Validate);
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let clip = AudioClip::new(vec![0.1], 0);
        let err = clip.validate().unwrap_err();
        assert!(err.to_string().contains("sample_rate"));
    }

    #[test]
    fn test_validate_names_first_non_finite_sample() {
        let clip = AudioClip::new(vec![0.0, 1.0, f64::NAN, f64::INFINITY], 8000);
        let err = clip.validate().unwrap_err();
        assert!(err.to_string().contains("sample 2"), "got: {}", err);
    }

    // ==========================================================================
    // WINDOW EXTRACTION TESTS
    // ==========================================================================

    #[test]
    fn test_window_extracts_range() {
        let clip = AudioClip::new((0..100).map(|i| i as f64).collect(), 10);
        let w = clip.window(2.0, Some(5.0)).unwrap();
        assert_eq!(w.len(), 30);
        assert_eq!(w.samples[0], 20.0);
        assert_eq!(w.sample_rate, 10);
    }

    #[test]
    fn test_window_open_end_runs_to_clip_end() {
        let clip = AudioClip::new(vec![1.0; 100], 10);
        let w = clip.window(9.0, None).unwrap();
        assert_eq!(w.len(), 10);
    }

    #[test]
    fn test_window_clamps_end_past_clip() {
        let clip = AudioClip::new(vec![1.0; 100], 10);
        let w = clip.window(5.0, Some(60.0)).unwrap();
        assert_eq!(w.len(), 50);
    }

    #[test]
    fn test_window_start_beyond_clip_fails() {
        let clip = AudioClip::new(vec![1.0; 100], 10);
        assert!(clip.window(10.0, None).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_window_empty_range_fails() {
        let clip = AudioClip::new(vec![1.0; 100], 10);
        assert!(clip.window(5.0, Some(5.0)).is_err());
        assert!(clip.window(5.0, Some(2.0)).is_err());
    }

    // ==========================================================================
    // TONE SYNTHESIS / RECONSTRUCTED CLIP
    // ==========================================================================

    #[test]
    fn test_from_tones_length_and_amplitude() {
        let clip = AudioClip::from_tones(&[(100.0, 0.5)], 1.0, 8000);
        assert_eq!(clip.len(), 8000);
        let peak = clip.samples.iter().fold(0.0f64, |a, &s| a.max(s.abs()));
        assert!((peak - 0.5).abs() < 1e-3, "peak was {}", peak);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reconstructed_clip_helpers() {
        let silent = ReconstructedClip {
            level: 3,
            samples: vec![0.0; 4],
            sample_rate: 100,
        };
        assert!(silent.is_silent());
        assert_eq!(silent.peak(), 0.0);

        let loud = ReconstructedClip {
            level: 3,
            samples: vec![0.25, -1.0, 0.5],
            sample_rate: 100,
        };
        assert!(!loud.is_silent());
        assert_eq!(loud.peak(), 1.0);
        let clip = loud.into_clip();
        assert_eq!(clip.sample_rate, 100);
        assert_eq!(clip.len(), 3);
    }
}
