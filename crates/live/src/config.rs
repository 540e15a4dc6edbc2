//! Konfiguration der Live-Session und der Verbindungsaufbau-Parameter

use serde::{Deserialize, Serialize};

use leon_audio::{CaptureConfig, PlaybackConfig};

/// Standardmodell fuer native Audio-Sessions
pub const STANDARD_MODELL: &str = "gemini-2.5-flash-native-audio-preview-12-2025";

/// Feste Systemanweisung der Assistenz-Persona
pub const SYSTEM_ANWEISUNG: &str = "You are LEON, the high-performance AI Butler. \
Visual feed is for situational context only. \
Identity: My name is Leon and I was created by Muhammad Razi.";

/// Laufzeit-Konfiguration des Controllers
#[derive(Debug, Clone, PartialEq)]
pub struct LiveConfig {
    pub model: String,
    pub system_instruction: String,
    pub input_transcription: bool,
    pub output_transcription: bool,
    pub capture: CaptureConfig,
    pub playback: PlaybackConfig,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: STANDARD_MODELL.to_string(),
            system_instruction: SYSTEM_ANWEISUNG.to_string(),
            input_transcription: true,
            output_transcription: true,
            capture: CaptureConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl LiveConfig {
    /// Parameter fuer den Verbindungsaufbau einer neuen Session
    pub fn session_config(&self, video: bool) -> SessionConfig {
        SessionConfig {
            model: self.model.clone(),
            response_modality: Modality::Audio,
            input_transcription: self.input_transcription,
            output_transcription: self.output_transcription,
            system_instruction: self.system_instruction.clone(),
            video,
        }
    }
}

/// Ausgabemodalitaet des Modells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Audio,
}

/// Transportneutrale Parameter beim Oeffnen einer Session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub model: String,
    pub response_modality: Modality,
    pub input_transcription: bool,
    pub output_transcription: bool,
    pub system_instruction: String,
    /// Es werden zusaetzlich Kamerabilder gesendet
    pub video: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_session_config() {
        let config = LiveConfig::default().session_config(false);
        assert_eq!(config.model, STANDARD_MODELL);
        assert_eq!(config.response_modality, Modality::Audio);
        assert!(config.input_transcription && config.output_transcription);
        assert!(config.system_instruction.starts_with("You are LEON"));
        assert!(!config.video);
    }

    #[test]
    fn modalitaet_gross_geschrieben() {
        let json = serde_json::to_value(Modality::Audio).unwrap();
        assert_eq!(json, serde_json::json!("AUDIO"));
    }
}
