//! Encoder configuration
//!
//! The disclosure levels are supplied by the caller and validated once, here.
//! Config files are plain JSON:
//!
//! ```json
//! { "levels": [500, 1000, 1500, 2000], "parallel": true }
//! ```

use crate::error::{CodecError, ConfigError, Stage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Level list used by the game when no config is supplied
pub const DEFAULT_LEVELS: [u32; 7] = [100, 500, 1000, 2000, 3500, 5000, 7500];

/// Validated, strictly ascending list of bin budgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct DisclosureLevels(Vec<u32>);

impl DisclosureLevels {
    /// Levels must be non-empty, positive, and strictly ascending (so unique)
    pub fn new(levels: Vec<u32>) -> Result<Self, CodecError> {
        if levels.is_empty() {
            return Err(CodecError::invalid(Stage::Configure, "level list is empty"));
        }
        if let Some(idx) = levels.iter().position(|&k| k == 0) {
            return Err(CodecError::invalid(
                Stage::Configure,
                format!("level at index {} is 0; levels must be positive", idx),
            ));
        }
        if let Some(idx) = levels.windows(2).position(|w| w[0] >= w[1]) {
            return Err(CodecError::invalid(
                Stage::Configure,
                format!(
                    "levels must be strictly ascending: {} at index {} is followed by {}",
                    levels[idx],
                    idx,
                    levels[idx + 1]
                ),
            ));
        }
        Ok(Self(levels))
    }

    /// Parse a comma separated list such as `"500,1000,2000"`
    pub fn parse_list(s: &str) -> Result<Self, CodecError> {
        let levels = s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<u32>().map_err(|_| {
                    CodecError::invalid(Stage::Configure, format!("level {:?} is not a positive integer", p))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(levels)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl Default for DisclosureLevels {
    fn default() -> Self {
        Self(DEFAULT_LEVELS.to_vec())
    }
}

impl TryFrom<Vec<u32>> for DisclosureLevels {
    type Error = CodecError;

    fn try_from(levels: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<DisclosureLevels> for Vec<u32> {
    fn from(levels: DisclosureLevels) -> Self {
        levels.0
    }
}

/// Everything the encoder needs besides the clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    #[serde(default)]
    pub levels: DisclosureLevels,

    /// Fan per-level reconstruction out across the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            levels: DisclosureLevels::default(),
            parallel: default_parallel(),
        }
    }
}

impl EncoderConfig {
    pub fn new(levels: DisclosureLevels) -> Self {
        Self {
            levels,
            ..Self::default()
        }
    }

    pub fn with_levels(mut self, levels: DisclosureLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::debug!(
            "Loaded encoder config from {}: levels={:?} parallel={}",
            path.display(),
            config.levels.as_slice(),
            config.parallel
        );
        Ok(config)
    }
}
