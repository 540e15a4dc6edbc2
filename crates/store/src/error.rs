//! Fehlertypen fuer das Store-Crate

use leon_core::{LeonError, TaskStatus};
use thiserror::Error;

/// Store-Fehlertypen
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Dokument '{0}' ist keine Liste")]
    KeineListe(String),

    #[error("Ungueltiger Schluessel: {0}")]
    UngueltigerSchluessel(String),

    #[error("Eintrag nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Unzulaessiger Statuswechsel: {von:?} -> {nach:?}")]
    UngueltigerUebergang { von: TaskStatus, nach: TaskStatus },

    #[error("Serialisierungsfehler: {0}")]
    Serialisierung(#[from] serde_json::Error),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for LeonError {
    fn from(e: StoreError) -> Self {
        LeonError::Speicher(e.to_string())
    }
}
