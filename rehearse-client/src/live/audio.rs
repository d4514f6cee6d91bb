//! PCM sample conversion for the live stream
//!
//! Outbound audio is mono 16-bit little-endian PCM at 16 kHz; inbound audio is
//! the same encoding at 24 kHz. Both travel base64-encoded.

use base64::{engine::general_purpose, Engine as _};

use crate::error::{ClientError, ClientResult};

pub const INPUT_SAMPLE_RATE: u32 = 16_000;
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";
pub const VIDEO_MIME_TYPE: &str = "image/jpeg";

/// Convert float samples in `[-1.0, 1.0]` to base64 PCM16 LE
///
/// Out-of-range samples are clamped.
pub fn encode_pcm16(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let s = sample.clamp(-1.0, 1.0);
        let value = if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0) as i16
        };
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 PCM16 LE into float samples
pub fn decode_pcm16(data: &str) -> ClientResult<Vec<f32>> {
    let bytes = general_purpose::STANDARD
        .decode(data)
        .map_err(|e| ClientError::Transport(format!("invalid base64 audio: {}", e)))?;
    if bytes.len() % 2 != 0 {
        return Err(ClientError::Transport(format!(
            "PCM16 payload has odd length {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect())
}

/// Base64 for one captured video frame
pub fn encode_frame(jpeg: &[u8]) -> String {
    general_purpose::STANDARD.encode(jpeg)
}

/// Playback length of `samples` mono samples at `sample_rate`
pub fn duration_of(samples: usize, sample_rate: u32) -> std::time::Duration {
    std::time::Duration::from_secs_f64(samples as f64 / f64::from(sample_rate))
}
