//! Progressive spectral disclosure codec
//!
//! Turns one clip into an ordered family of renditions, each rebuilt from
//! the K strongest frequency components of the original:
//!
//! ```text
//! AudioClip ──analyze──> Spectrum + significant bins      (once per call)
//!                             │
//!            ┌────────────────┼────────────────┐
//!        select(K1)       select(K2)   ...  select(Kn)    (per level,
//!            │                │                │           read-only)
//!       reconstruct      reconstruct      reconstruct
//!            ▼                ▼                ▼
//!      clip @ K1         clip @ K2        clip @ Kn
//! ```
//!
//! Every level reads the same immutable spectrum, so levels are independent
//! and may be computed in parallel. The whole call is a pure function: no
//! state survives between calls and nothing is written anywhere.
//!
//! # Modules
//!
//! - [`analyzer`]: forward FFT, magnitudes, noise-floor filtering
//! - [`selector`]: deterministic top-K ranking
//! - [`reconstruct`]: Hermitian sparse spectrum, inverse FFT, normalisation

pub mod analyzer;
pub mod reconstruct;
pub mod selector;

pub use analyzer::{analyze, Analysis, Spectrum, NOISE_FLOOR_RATIO};
pub use reconstruct::reconstruct;
pub use selector::select;

use crate::clip::{AudioClip, ReconstructedClip};
use crate::config::{DisclosureLevels, EncoderConfig};
use crate::error::CodecError;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-level bookkeeping, handy for logs and manifests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelStats {
    pub level: u32,
    /// Bins actually used (`min(level, significant)`)
    pub selected: usize,
    /// Size of the significant set the level competed over
    pub significant: usize,
    /// True when the level asked for at least as many bins as exist
    pub saturated: bool,
    /// Share of total spectral energy kept, 0.0..=1.0
    pub energy_capture: f64,
}

/// Output of one encode call
#[derive(Debug, Clone)]
pub struct Encoding {
    pub sample_rate: u32,
    pub significant_bins: usize,
    clips: BTreeMap<u32, ReconstructedClip>,
    stats: Vec<LevelStats>,
}

impl Encoding {
    pub fn get(&self, level: u32) -> Option<&ReconstructedClip> {
        self.clips.get(&level)
    }

    /// Levels in ascending order
    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.clips.keys().copied()
    }

    pub fn clips(&self) -> &BTreeMap<u32, ReconstructedClip> {
        &self.clips
    }

    pub fn stats(&self) -> &[LevelStats] {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn into_clips(self) -> BTreeMap<u32, ReconstructedClip> {
        self.clips
    }
}

/// Level encoder: one analysis pass, one reconstruction per level
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode `clip` at every configured level.
    ///
    /// Fails as a whole: either every level comes back or none does.
    pub fn encode(&self, clip: &AudioClip) -> Result<Encoding, CodecError> {
        let analysis = analyze(clip)?;
        self.encode_analysis(&analysis)
    }

    /// Encode from an analysis that was already computed
    pub fn encode_analysis(&self, analysis: &Analysis) -> Result<Encoding, CodecError> {
        let levels = self.config.levels.as_slice();
        let mut planner = FftPlanner::new();
        let ifft: Arc<dyn Fft<f64>> = planner.plan_fft_inverse(analysis.len());

        let build = |&level: &u32| encode_level(analysis, ifft.as_ref(), level);
        let results: Vec<(ReconstructedClip, LevelStats)> = if self.config.parallel {
            levels.par_iter().map(build).collect::<Result<_, _>>()?
        } else {
            levels.iter().map(build).collect::<Result<_, _>>()?
        };

        let mut clips = BTreeMap::new();
        let mut stats = Vec::with_capacity(results.len());
        for (clip, stat) in results {
            log::debug!(
                "Level {}: {} bins, {:.1}% energy{}",
                stat.level,
                stat.selected,
                stat.energy_capture * 100.0,
                if stat.saturated { " (saturated)" } else { "" }
            );
            clips.insert(clip.level, clip);
            stats.push(stat);
        }

        Ok(Encoding {
            sample_rate: analysis.sample_rate,
            significant_bins: analysis.significant.len(),
            clips,
            stats,
        })
    }
}

fn encode_level(
    analysis: &Analysis,
    ifft: &dyn Fft<f64>,
    level: u32,
) -> Result<(ReconstructedClip, LevelStats), CodecError> {
    let budget = usize::try_from(level).unwrap_or(usize::MAX);
    let selected = select(&analysis.magnitude, &analysis.significant, budget);
    let clip = reconstruct::reconstruct_with(
        ifft,
        &analysis.spectrum,
        &selected,
        level,
        analysis.sample_rate,
    )?;
    let stats = LevelStats {
        level,
        selected: selected.len(),
        significant: analysis.significant.len(),
        saturated: budget >= analysis.significant.len(),
        energy_capture: analysis.energy_capture(&selected),
    };
    Ok((clip, stats))
}

/// `Encode(clip, levels) -> level -> clip`
///
/// Validates `levels` and `clip` before any transform runs.
pub fn encode(
    clip: &AudioClip,
    levels: &[u32],
) -> Result<BTreeMap<u32, AudioClip>, CodecError> {
    let levels = DisclosureLevels::new(levels.to_vec())?;
    let encoder = Encoder::new(EncoderConfig::new(levels));
    let encoding = encoder.encode(clip)?;
    Ok(encoding
        .into_clips()
        .into_iter()
        .map(|(level, clip)| (level, clip.into_clip()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;

    fn two_tone() -> AudioClip {
        // 1Hz bins: tones on bins 5 and 12
        AudioClip::from_tones(&[(5.0, 0.7), (12.0, 0.3)], 1.0, 128)
    }

    fn encoder(levels: &[u32], parallel: bool) -> Encoder {
        Encoder::new(
            EncoderConfig::new(DisclosureLevels::new(levels.to_vec()).unwrap())
                .with_parallel(parallel),
        )
    }

    #[test]
    fn test_encode_returns_every_level() {
        let encoding = encoder(&[1, 2, 5], true).encode(&two_tone()).unwrap();
        assert_eq!(encoding.levels().collect::<Vec<_>>(), vec![1, 2, 5]);
        assert_eq!(encoding.significant_bins, 2);
        for clip in encoding.clips().values() {
            assert_eq!(clip.len(), 128);
            assert_eq!(clip.sample_rate, 128);
        }
    }

    #[test]
    fn test_stats_report_saturation() {
        let encoding = encoder(&[1, 2, 5], false).encode(&two_tone()).unwrap();
        let stats = encoding.stats();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].selected, 1);
        assert!(!stats[0].saturated);
        assert_eq!(stats[1].selected, 2);
        assert!(stats[1].saturated);
        assert_eq!(stats[2].selected, 2);
        assert!(stats[2].saturated);
        assert!((stats[2].energy_capture - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_matches_serial_exactly() {
        let clip = AudioClip::new((0..300).map(|i| ((i * 7919) % 97) as f64 / 97.0 - 0.5).collect(), 300);
        let serial = encoder(&[1, 3, 10, 40], false).encode(&clip).unwrap();
        let parallel = encoder(&[1, 3, 10, 40], true).encode(&clip).unwrap();
        assert_eq!(serial.clips(), parallel.clips());
        assert_eq!(serial.stats(), parallel.stats());
    }

    #[test]
    fn test_encode_fn_validates_levels() {
        let err = encode(&two_tone(), &[]).unwrap_err();
        assert_eq!(err.stage(), Stage::Configure);
        let err = encode(&two_tone(), &[2, 1]).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_encode_fn_rejects_invalid_clip_atomically() {
        let err = encode(&AudioClip::new(vec![], 44100), &[1, 2]).unwrap_err();
        assert_eq!(err.stage(), Stage::Validate);
        let err = encode(&AudioClip::new(vec![0.1, 0.2], 0), &[1]).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_encode_fn_maps_levels_to_clips() {
        let out = encode(&two_tone(), &[1, 2]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[&1].sample_rate, 128);
        assert_eq!(out[&2].len(), 128);
    }

    #[test]
    fn test_silent_clip_encodes_to_silence() {
        let clip = AudioClip::new(vec![0.0; 64], 8000);
        let encoding = encoder(&[1, 10], true).encode(&clip).unwrap();
        assert_eq!(encoding.significant_bins, 0);
        for clip in encoding.clips().values() {
            assert!(clip.is_silent());
        }
        assert!(encoding.stats().iter().all(|s| s.energy_capture == 0.0));
    }
}
