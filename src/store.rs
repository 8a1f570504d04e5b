//! Persistence of reconstructed levels
//!
//! The codec hands back clips and forgets them; whatever keeps them around
//! implements [`ClipStore`]. [`WavDirStore`] is the on-disk layout the game
//! serves from:
//!
//! ```text
//! <root>/<song_id>/reconstructed_audio_<level>.wav
//! ```

use crate::clip::ReconstructedClip;
use crate::codec::Encoding;
use crate::error::StoreError;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

const FILE_PREFIX: &str = "reconstructed_audio_";
const FILE_SUFFIX: &str = ".wav";

/// Joins the directory components of a nested file into one song id
const SONG_ID_SEPARATOR: &str = "__";

/// Sink for reconstructed clips
pub trait ClipStore {
    /// Persist one level of one song, returning where it went
    fn store(&self, song_id: &str, level: u32, clip: &ReconstructedClip)
        -> Result<PathBuf, StoreError>;

    /// Persist every level of an encoding
    fn store_all(&self, song_id: &str, encoding: &Encoding) -> Result<Vec<PathBuf>, StoreError> {
        encoding
            .clips()
            .iter()
            .map(|(&level, clip)| self.store(song_id, level, clip))
            .collect()
    }
}

/// One directory per song, one 16-bit mono WAV per level
#[derive(Debug, Clone)]
pub struct WavDirStore {
    root: PathBuf,
}

impl WavDirStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn song_dir(&self, song_id: &str) -> Result<PathBuf, StoreError> {
        validate_song_id(song_id)?;
        Ok(self.root.join(song_id))
    }

    pub fn level_path(&self, song_id: &str, level: u32) -> Result<PathBuf, StoreError> {
        Ok(self.song_dir(song_id)?.join(level_file_name(level)))
    }

    /// Levels already stored for `song_id`, ascending.
    ///
    /// A song with no directory simply has no levels.
    pub fn available_levels(&self, song_id: &str) -> Result<Vec<u32>, StoreError> {
        let dir = self.song_dir(song_id)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut levels = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
            if let Some(level) = entry.file_name().to_str().and_then(parse_level_file_name) {
                levels.push(level);
            }
        }
        levels.sort_unstable();
        Ok(levels)
    }
}

impl ClipStore for WavDirStore {
    fn store(
        &self,
        song_id: &str,
        level: u32,
        clip: &ReconstructedClip,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.song_dir(song_id)?;
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(level_file_name(level));
        write_wav(&path, clip)?;
        log::debug!("Stored level {} of {} at {}", level, song_id, path.display());
        Ok(path)
    }
}

/// Song id for `file` found while walking `root`.
///
/// The path relative to `root`, extension dropped, directories joined with
/// `__`: `root/a/song.wav` becomes `a__song`.
pub fn song_id_for(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file).with_extension("");
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        "song".to_string()
    } else {
        parts.join(SONG_ID_SEPARATOR)
    }
}

/// Give every file under `root` its own song id.
///
/// Fails on the first pair of files that would land in the same song
/// directory (`song.mp3` next to `song.wav`, or ids differing only in case).
pub fn assign_song_ids<I>(root: &Path, files: I) -> Result<Vec<(PathBuf, String)>, StoreError>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();
    let mut assigned = Vec::new();
    for file in files {
        let song_id = song_id_for(root, &file);
        match claimed.entry(song_id.to_lowercase()) {
            Entry::Occupied(first) => {
                return Err(StoreError::DuplicateSongId {
                    song_id,
                    first: first.get().clone(),
                    second: file,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(file.clone());
            }
        }
        assigned.push((file, song_id));
    }
    Ok(assigned)
}

fn level_file_name(level: u32) -> String {
    format!("{}{}{}", FILE_PREFIX, level, FILE_SUFFIX)
}

fn parse_level_file_name(name: &str) -> Option<u32> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// Song ids become directory names, so keep them to a single path segment
fn validate_song_id(song_id: &str) -> Result<(), StoreError> {
    let ok = !song_id.is_empty()
        && song_id != "."
        && song_id != ".."
        && !song_id.contains(['/', '\\', '\0']);
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidSongId(song_id.to_string()))
    }
}

fn write_wav(path: &Path, clip: &ReconstructedClip) -> Result<(), StoreError> {
    let wav_err = |source| StoreError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).map_err(wav_err)?;
    for &s in &clip.samples {
        writer.write_sample(to_pcm16(s)).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)
}

fn to_pcm16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f64).round() as i16
}
