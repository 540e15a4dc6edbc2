//! PCM16-Kodierung fuer den Realtime-Kanal
//!
//! Ausgehend: `int16 = floor(sample * 32768)`, auf den i16-Bereich
//! begrenzt, little endian, danach base64. Eingehend umgekehrt mit
//! `sample = int16 / 32768`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AudioError, AudioResult};

/// Skalierung zwischen f32-Samples und i16
pub const SKALA: f32 = 32768.0;

/// Ein Sample nach i16, auf den i16-Bereich begrenzt
#[inline]
pub fn sample_zu_i16(s: f32) -> i16 {
    (s * SKALA).floor().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[inline]
pub fn i16_zu_sample(wert: i16) -> f32 {
    wert as f32 / SKALA
}

/// Float-Samples in PCM16 (little endian) umwandeln
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&sample_zu_i16(s).to_le_bytes());
    }
    bytes
}

/// PCM16 (little endian) in Float-Samples umwandeln
///
/// Eine ungerade Byte-Anzahl ist kein gueltiger PCM16-Puffer.
pub fn decode_pcm16(bytes: &[u8]) -> AudioResult<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::CodecFehler(format!(
            "PCM16-Puffer mit ungerader Laenge: {} Bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|paar| i16_zu_sample(i16::from_le_bytes([paar[0], paar[1]])))
        .collect())
}

/// Samples als base64-kodiertes PCM16
pub fn encode_base64(samples: &[f32]) -> String {
    STANDARD.encode(encode_pcm16(samples))
}

/// base64-kodiertes PCM16 in Samples
pub fn decode_base64(payload: &str) -> AudioResult<Vec<f32>> {
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| AudioError::CodecFehler(format!("base64: {e}")))?;
    decode_pcm16(&bytes)
}
