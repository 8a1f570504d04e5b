//! Encode manifests
//!
//! A JSON record of what an encode run produced: which levels, how many bins
//! each really used, and how much of the clip's energy survived. Written next
//! to the stored WAVs so a level that sounds wrong can be traced back.
//!
//! # Usage
//!
//! ```ignore
//! use layerfft::report::{self, EncodeReport};
//!
//! let report = EncodeReport::new("milan", &clip, &encoding);
//! report::write_json("milan.json", &[report])?;
//! ```

use crate::clip::AudioClip;
use crate::codec::{Encoding, LevelStats};
use chrono::Local;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Outcome of encoding one song
#[derive(Debug, Clone, Serialize)]
pub struct EncodeReport {
    pub generated: String,
    pub song_id: String,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub significant_bins: usize,
    pub levels: Vec<LevelStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EncodeReport {
    pub fn new(song_id: &str, clip: &AudioClip, encoding: &Encoding) -> Self {
        Self {
            generated: timestamp(),
            song_id: song_id.to_string(),
            sample_rate: clip.sample_rate,
            duration_secs: clip.duration_secs(),
            significant_bins: encoding.significant_bins,
            levels: encoding.stats().to_vec(),
            error: None,
        }
    }

    /// Record a song that could not be encoded
    pub fn failed(song_id: &str, error: impl ToString) -> Self {
        Self {
            generated: timestamp(),
            song_id: song_id.to_string(),
            sample_rate: 0,
            duration_secs: 0.0,
            significant_bins: 0,
            levels: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Counts over a batch of reports
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub encoded: usize,
    pub failed: usize,
    pub levels_written: usize,
    pub saturated_levels: usize,
}

impl Summary {
    pub fn from_reports(reports: &[EncodeReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };

        for r in reports {
            if r.is_ok() {
                summary.encoded += 1;
                summary.levels_written += r.levels.len();
                summary.saturated_levels += r.levels.iter().filter(|l| l.saturated).count();
            } else {
                summary.failed += 1;
            }
        }

        summary
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    generated: String,
    summary: Summary,
    songs: &'a [EncodeReport],
}

/// Write `reports` plus their summary as pretty JSON
pub fn write<W: Write>(writer: &mut W, reports: &[EncodeReport]) -> io::Result<()> {
    let manifest = Manifest {
        generated: timestamp(),
        summary: Summary::from_reports(reports),
        songs: reports,
    };
    serde_json::to_writer_pretty(&mut *writer, &manifest)?;
    writeln!(writer)
}

pub fn write_json<P: AsRef<Path>>(path: P, reports: &[EncodeReport]) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write(&mut file, reports)
}
