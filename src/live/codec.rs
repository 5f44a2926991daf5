//! Transport codec for media payloads: base64 text encoding on the wire and
//! little-endian 16-bit PCM conversion for decoded audio.

use base64::{engine::general_purpose, Engine as _};

/// Base64-encode raw bytes for the textual transport.
pub fn encode(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Decode base64 text back into bytes. Malformed input yields an empty
/// buffer rather than an error; the remote peer is trusted to be well-formed.
pub fn decode(text: &str) -> Vec<u8> {
    general_purpose::STANDARD.decode(text).unwrap_or_default()
}

/// Reinterpret raw bytes as consecutive little-endian i16 samples.
/// A trailing odd byte is ignored.
pub fn pcm16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}

/// Normalize little-endian 16-bit PCM into [-1, 1] floats, de-interleaved
/// across `channels`. Incomplete trailing frames are dropped.
pub fn pcm16_to_f32(bytes: &[u8], channels: usize) -> Vec<Vec<f32>> {
    let channels = channels.max(1);
    let samples = pcm16_samples(bytes);
    let frames = samples.len() / channels;
    let mut out = vec![Vec::with_capacity(frames); channels];
    for frame in 0..frames {
        for ch in 0..channels {
            out[ch].push(samples[frame * channels + ch] as f32 / 32768.0);
        }
    }
    out
}
