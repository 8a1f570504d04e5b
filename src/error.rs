//! Error types
//!
//! The codec itself can only fail in two ways: the input was rejected before
//! any transform ran, or the transform machinery could not complete. Both
//! carry the [`Stage`] that failed so callers can log and decide whether to
//! re-ingest the source.
//!
//! A fully silent reconstruction is *not* an error; it comes back as an
//! all-zero [`ReconstructedClip`](crate::ReconstructedClip).

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage at which a failure was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input clip validation at the encoder boundary
    Validate,
    /// Level list / config validation
    Configure,
    /// Forward transform and significance filtering
    Analyze,
    /// Sparse spectrum build and inverse transform
    Reconstruct,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validate => write!(f, "validate"),
            Stage::Configure => write!(f, "configure"),
            Stage::Analyze => write!(f, "analyze"),
            Stage::Reconstruct => write!(f, "reconstruct"),
        }
    }
}

/// Errors returned by the codec core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Caller supplied something the codec cannot work with. Never retried.
    #[error("invalid input at {stage} stage: {reason}")]
    InvalidInput { stage: Stage, reason: String },

    /// The transform could not complete. Deterministic, so retrying the
    /// same input reproduces it.
    #[error("compute failure at {stage} stage: {detail}")]
    Compute { stage: Stage, detail: String },
}

impl CodecError {
    pub fn invalid(stage: Stage, reason: impl Into<String>) -> Self {
        CodecError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    pub fn compute(stage: Stage, detail: impl Into<String>) -> Self {
        CodecError::Compute {
            stage,
            detail: detail.into(),
        }
    }

    /// Stage the failure was raised from
    pub fn stage(&self) -> Stage {
        match self {
            CodecError::InvalidInput { stage, .. } | CodecError::Compute { stage, .. } => *stage,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CodecError::InvalidInput { .. })
    }
}

/// Errors from decoding a source file into an [`AudioClip`](crate::AudioClip)
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported or unrecognised audio format: {0}")]
    Format(String),

    #[error("no default audio track in source")]
    NoTrack,

    #[error("source decoded to zero samples")]
    Empty,

    #[error(transparent)]
    Clip(#[from] CodecError),
}

/// Errors from persisting reconstructed clips
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("WAV write failed for {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("invalid song id {0:?}")]
    InvalidSongId(String),

    #[error("song id {song_id:?} claimed by both {} and {}", first.display(), second.display())]
    DuplicateSongId {
        song_id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Errors from loading an encoder configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Syntax errors and rejected level lists alike; `DisclosureLevels`
    /// validates during deserialisation.
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_names_stage_and_reason() {
        let err = CodecError::invalid(Stage::Validate, "clip has no samples");
        assert_eq!(
            err.to_string(),
            "invalid input at validate stage: clip has no samples"
        );
        assert_eq!(err.stage(), Stage::Validate);
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_compute_error_is_not_invalid_input() {
        let err = CodecError::compute(Stage::Reconstruct, "length overflow");
        assert!(!err.is_invalid_input());
        assert_eq!(err.stage(), Stage::Reconstruct);
        assert!(err.to_string().contains("reconstruct"));
    }

    #[test]
    fn test_stage_display_matches_serde_name() {
        for stage in [Stage::Validate, Stage::Configure, Stage::Analyze, Stage::Reconstruct] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_duplicate_song_id_names_both_files() {
        let err = StoreError::DuplicateSongId {
            song_id: "song".into(),
            first: PathBuf::from("in/song.mp3"),
            second: PathBuf::from("in/song.wav"),
        };
        let msg = err.to_string();
        assert!(msg.contains("in/song.mp3") && msg.contains("in/song.wav"));
    }
}
