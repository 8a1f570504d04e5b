//! Layerfft - progressive spectral disclosure for audio clips
//!
//! Layerfft rebuilds an audio clip from only its K strongest frequency
//! components, for a whole ladder of K values at once. Small K gives a thin,
//! recognisable-but-degraded rendition; large K approaches the original.
//! A "guess the song" round plays the ladder from the bottom up.
//!
//! # How It Works
//!
//! 1. **Analyze**: one FFT over the whole clip. Bins below 1% of the peak
//!    magnitude are treated as noise and never compete.
//! 2. **Select**: rank the remaining bins by magnitude (ties by index) and
//!    keep the top K.
//! 3. **Reconstruct**: place the kept bins and their conjugate images into a
//!    zero spectrum, inverse FFT, keep the real part, normalise to peak 1.0.
//!
//! # Quick Start
//!
//! ```no_run
//! use layerfft::{AudioClip, DisclosureLevels, Encoder, EncoderConfig};
//!
//! let clip = AudioClip::from_tones(&[(440.0, 0.7), (880.0, 0.3)], 2.0, 44100);
//! let levels = DisclosureLevels::new(vec![1, 2, 5]).unwrap();
//! let encoder = Encoder::new(EncoderConfig::new(levels));
//!
//! let encoding = encoder.encode(&clip).unwrap();
//! for stats in encoding.stats() {
//!     println!(
//!         "level {}: {} bins, {:.1}% energy",
//!         stats.level,
//!         stats.selected,
//!         stats.energy_capture * 100.0
//!     );
//! }
//! ```
//!
//! # Modules
//!
//! - [`codec`]: analysis, selection, reconstruction and the level encoder
//! - [`clip`]: clip value types
//! - [`config`]: validated level list and encoder settings
//! - [`ingest`]: decoding source files into clips
//! - [`store`]: writing reconstructed levels to disk
//! - [`report`]: JSON manifests of encode runs

pub mod clip;
pub mod codec;
pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod store;

pub use clip::{AudioClip, ReconstructedClip};
pub use codec::{encode, Encoder, Encoding, LevelStats};
pub use config::{DisclosureLevels, EncoderConfig, DEFAULT_LEVELS};
pub use error::{CodecError, ConfigError, IngestError, Stage, StoreError};
pub use store::{ClipStore, WavDirStore};
