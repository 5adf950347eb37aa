//! WAV container wrapping for synthesized speech
//!
//! The speech-synthesis service returns raw little-endian 16-bit mono PCM
//! at 24 kHz. Before that is playable it has to be wrapped in a canonical
//! 44-byte RIFF/WAVE header followed by the `data` subchunk.

use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::info;

/// Sample rate the speech service synthesizes at.
pub const SAMPLE_RATE: u32 = 24_000;
/// Mono output.
pub const CHANNELS: u16 = 1;
/// 16-bit signed samples.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Size of the canonical header: RIFF chunk descriptor, `fmt ` subchunk and
/// the `data` subchunk header.
const HEADER_LEN: usize = 44;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("PCM byte stream has odd length {0}; 16-bit samples are 2 bytes each")]
    OddByteLength(usize),

    #[error("Failed to write WAV file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Wrap raw PCM samples in a WAV container.
///
/// Output is always exactly `44 + 2 * samples.len()` bytes.
pub fn wrap_pcm(samples: &[i16]) -> Vec<u8> {
    let data_len = samples.len() * 2;
    let mut out = Vec::with_capacity(HEADER_LEN + data_len);

    // RIFF chunk descriptor
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt subchunk: 16-byte PCM format block
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // format = 1 (PCM)
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    let byte_rate = SAMPLE_RATE * CHANNELS as u32 * (BITS_PER_SAMPLE as u32 / 8);
    out.extend_from_slice(&byte_rate.to_le_bytes());
    let block_align = CHANNELS * (BITS_PER_SAMPLE / 8);
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data subchunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }

    out
}

/// Wrap a raw little-endian PCM byte stream, as received from the service.
pub fn wrap_pcm_bytes(pcm: &[u8]) -> Result<Vec<u8>, WavError> {
    if pcm.len() % 2 != 0 {
        return Err(WavError::OddByteLength(pcm.len()));
    }
    let samples: Vec<i16> = pcm
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(wrap_pcm(&samples))
}

/// Write wrapped PCM to a `.wav` file.
pub fn write_wav(path: &Path, samples: &[i16]) -> Result<(), WavError> {
    let bytes = wrap_pcm(samples);
    fs::write(path, &bytes).map_err(|e| WavError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "Saved synthesized speech");
    Ok(())
}
