//! Audio decoding using Symphonia

use super::memory::MemorySource;
use crate::error::{Result, TranscriptionError};
use crate::preprocessing::channel_mixer::ChannelMixMode;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer as DecodedBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

struct TrackDecoder {
    decoder: Box<dyn Decoder>,
    codec: String,
    channels: usize,
    sample_rate_hz: Option<u32>,
    interleaved: Vec<f32>,
}

/// Decode every audio track of a media file, averaging channels to mono
///
/// See [`decode_file_with`].
pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<MemorySource> {
    decode_file_with(path, ChannelMixMode::Average)
}

/// Decode every audio track of a media file into an in-memory source
///
/// Tracks keep their order in the container. Packets that fail to decode
/// are skipped with a warning.
///
/// # Arguments
///
/// * `path` - Path to the media file
/// * `mode` - How channels are mixed down to mono
///
/// # Errors
///
/// Returns `IoError` if the file cannot be opened and `DecodingError` if the
/// container is not recognized or holds no decodable audio track
pub fn decode_file_with<P: AsRef<Path>>(path: P, mode: ChannelMixMode) -> Result<MemorySource> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| TranscriptionError::DecodingError(format!("Unrecognized container: {}", e)))?;
    let mut format = detected.format;

    let mut tracks: BTreeMap<u32, TrackDecoder> = BTreeMap::new();
    for track in format.tracks() {
        if track.codec_params.codec == CODEC_TYPE_NULL {
            continue;
        }
        let decoder = match symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
        {
            Ok(decoder) => decoder,
            Err(e) => {
                log::warn!("Skipping track {}: {}", track.id, e);
                continue;
            }
        };
        let codec = symphonia::default::get_codecs()
            .get_codec(track.codec_params.codec)
            .map(|d| d.short_name.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        tracks.insert(
            track.id,
            TrackDecoder {
                decoder,
                codec,
                channels: track.codec_params.channels.map(|c| c.count()).unwrap_or(1),
                sample_rate_hz: track.codec_params.sample_rate,
                interleaved: Vec::new(),
            },
        );
    }
    if tracks.is_empty() {
        return Err(TranscriptionError::DecodingError(
            "No supported audio tracks found".to_string(),
        ));
    }

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(TranscriptionError::DecodingError(format!("Failed to read packet: {}", e)));
            }
        };
        let Some(track) = tracks.get_mut(&packet.track_id()) else {
            continue;
        };
        match track.decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                track.channels = spec.channels.count();
                track.sample_rate_hz = Some(spec.rate);
                let mut buffer = DecodedBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                track.interleaved.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => {
                return Err(TranscriptionError::DecodingError(format!("Decoder failure: {}", e)));
            }
        }
    }

    let mut source = MemorySource::new();
    for (id, track) in tracks {
        let Some(rate) = track.sample_rate_hz else {
            log::warn!("Skipping track {} without sample rate", id);
            continue;
        };
        source.push_interleaved(&track.interleaved, track.channels, rate, &track.codec, mode)?;
    }
    Ok(source)
}
