//! Source decoding
//!
//! Turns an audio file (WAV, MP3, FLAC, OGG) into a mono [`AudioClip`].
//! This sits in front of the codec; the codec never touches files.
//!
//! Multi-channel sources are reduced to their **left channel** rather than a
//! channel average: averaging out-of-phase stereo content can cancel whole
//! frequency components, which would then never show up as significant bins.

use crate::clip::AudioClip;
use crate::error::IngestError;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Sample rate assumed when the container does not declare one
const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Decode a file from disk, using its extension as a probe hint
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<AudioClip, IngestError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    log::debug!("Decoding {} ({} bytes)", path.display(), data.len());
    decode_with_hint(data, hint)
}

/// Decode an in-memory file, letting symphonia detect the format
pub fn decode_bytes(data: &[u8]) -> Result<AudioClip, IngestError> {
    decode_with_hint(data.to_vec(), Hint::new())
}

fn decode_with_hint(data: Vec<u8>, hint: Hint) -> Result<AudioClip, IngestError> {
    let cursor = std::io::Cursor::new(data);
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();
    let decoder_opts = DecoderOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| IngestError::Format(e.to_string()))?;

    let mut format = probed.format;
    let track = format.default_track().ok_or(IngestError::NoTrack)?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| IngestError::Format(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => {
                log::warn!("Stopping decode early: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(IngestError::Format(e.to_string())),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            let channel_count = decoded.spec().channels.count().max(1);
            buf.copy_interleaved_ref(decoded);

            samples.extend(
                buf.samples()
                    .chunks(channel_count)
                    .map(|frame| frame[0] as f64),
            );
        }
    }

    if samples.is_empty() {
        return Err(IngestError::Empty);
    }

    let clip = AudioClip::new(samples, sample_rate);
    clip.validate()?;

    log::debug!(
        "Decoded {} samples @ {}Hz ({:.2}s)",
        clip.len(),
        clip.sample_rate,
        clip.duration_secs()
    );
    Ok(clip)
}
