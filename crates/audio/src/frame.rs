//! Audio-Frames und das ausgehende Realtime-Paket

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AudioResult;
use crate::pcm;

/// Abtastrate des Mikrofon-Uplinks
pub const EINGANG_SAMPLE_RATE: u32 = 16_000;
/// Abtastrate des synthetisierten Audios
pub const AUSGANG_SAMPLE_RATE: u32 = 24_000;

/// Unveraenderlicher Puffer aus Samples
///
/// Die Samples sind bei mehreren Kanaelen interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Mikrofon-Frame (16 kHz Mono)
    pub fn ausgehend(samples: Vec<f32>) -> Self {
        Self::new(samples, EINGANG_SAMPLE_RATE, 1)
    }

    /// Empfangenes Modell-Audio (24 kHz Mono) aus base64-PCM16
    pub fn eingehend_aus_base64(payload: &str) -> AudioResult<Self> {
        Ok(Self::new(
            pcm::decode_base64(payload)?,
            AUSGANG_SAMPLE_RATE,
            1,
        ))
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub(crate) fn samples_arc(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Anzahl Sample-Frames (Samples pro Kanal)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Dauer in Sekunden
    pub fn dauer(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn ist_leer(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Ausgehendes Realtime-Paket: `{mimeType, data}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub mime_type: String,
    /// base64-kodiertes PCM16
    pub data: String,
}

impl RealtimeInput {
    /// Kodiert einen Mono-Frame als `audio/pcm;rate=<rate>`
    pub fn aus_frame(frame: &AudioFrame) -> Self {
        Self {
            mime_type: format!("audio/pcm;rate={}", frame.sample_rate()),
            data: pcm::encode_base64(frame.samples()),
        }
    }

    /// Groesse des dekodierten Inhalts in Bytes
    pub fn nutzdaten_bytes(&self) -> usize {
        // base64: 4 Zeichen je 3 Bytes, abzueglich Padding
        let padding = self.data.bytes().rev().take_while(|&b| b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }
}
