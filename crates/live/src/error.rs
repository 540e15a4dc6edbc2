//! Fehlertypen fuer die Live-Session

use leon_audio::AudioError;
use leon_core::{Capability, LeonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiveError {
    /// Berechtigung ist `off`, es wurde nichts veraendert
    #[error("Zugriff verweigert: Berechtigung '{0}' ist deaktiviert")]
    ZugriffVerweigert(Capability),

    /// Verbindung konnte nicht aufgebaut werden oder ist abgebrochen
    #[error("Verbindung fehlgeschlagen: {0}")]
    VerbindungFehlgeschlagen(String),

    #[error("Geraet nicht verfuegbar: {0}")]
    GeraetNichtVerfuegbar(String),

    /// Die Geraete bieten keine Kamera an, es wurde nichts veraendert
    #[error("Video wird von den Mediengeraeten nicht unterstuetzt")]
    VideoNichtUnterstuetzt,

    #[error("Es laeuft bereits eine Live-Session")]
    SessionAktiv,

    #[error("Permission-Gate nicht erreichbar: {0}")]
    Gate(String),

    #[error("Audio-Fehler: {0}")]
    Audio(#[from] AudioError),
}

pub type LiveResult<T> = Result<T, LiveError>;

impl From<LeonError> for LiveError {
    fn from(e: LeonError) -> Self {
        match e {
            LeonError::ZugriffVerweigert(cap) => Self::ZugriffVerweigert(cap),
            LeonError::GeraetNichtVerfuegbar(msg) => Self::GeraetNichtVerfuegbar(msg),
            LeonError::Verbindung(msg) => Self::VerbindungFehlgeschlagen(msg),
            andere => Self::Gate(andere.to_string()),
        }
    }
}

impl From<LiveError> for LeonError {
    fn from(e: LiveError) -> Self {
        match e {
            LiveError::ZugriffVerweigert(cap) => LeonError::ZugriffVerweigert(cap),
            LiveError::VerbindungFehlgeschlagen(msg) => LeonError::Verbindung(msg),
            LiveError::GeraetNichtVerfuegbar(msg) => LeonError::GeraetNichtVerfuegbar(msg),
            LiveError::VideoNichtUnterstuetzt => {
                LeonError::GeraetNichtVerfuegbar(LiveError::VideoNichtUnterstuetzt.to_string())
            }
            LiveError::Audio(a) => a.into(),
            andere => LeonError::Intern(andere.to_string()),
        }
    }
}
