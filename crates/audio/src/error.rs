//! Fehlertypen fuer das Audio-Crate

use leon_core::LeonError;
use thiserror::Error;

/// Alle moeglichen Fehler der Audio-Schicht
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Codec-Fehler: {0}")]
    CodecFehler(String),

    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

pub type AudioResult<T> = Result<T, AudioError>;

impl AudioError {
    /// Gibt true zurueck wenn der Fehler ein fehlendes oder defektes Geraet meldet
    pub fn ist_geraetefehler(&self) -> bool {
        matches!(
            self,
            Self::GeraetNichtGefunden(_)
                | Self::KeinStandardEingabegeraet
                | Self::KeinStandardAusgabegeraet
                | Self::StreamFehler(_)
        )
    }
}

impl From<AudioError> for LeonError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::Konfiguration(msg) => LeonError::Konfiguration(msg),
            AudioError::CodecFehler(msg) => LeonError::Intern(format!("Codec: {msg}")),
            andere => LeonError::GeraetNichtVerfuegbar(andere.to_string()),
        }
    }
}
