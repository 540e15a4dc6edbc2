//! Fehlertypen fuer Leon
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `From` konvertieren.

use thiserror::Error;

use crate::permissions::Capability;

/// Globaler Result-Alias fuer Leon
pub type Result<T> = std::result::Result<T, LeonError>;

/// Alle moeglichen Fehler im Leon-System
///
/// Keiner dieser Fehler wird intern wiederholt: sie beenden jeweils die
/// Operation, die sie ausgeloest hat.
#[derive(Debug, Error)]
pub enum LeonError {
    // --- Berechtigungen ---
    #[error("Zugriff verweigert: Berechtigung '{0}' ist deaktiviert")]
    ZugriffVerweigert(Capability),

    // --- Verbindung ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    // --- Geraete ---
    #[error("Geraet nicht verfuegbar: {0}")]
    GeraetNichtVerfuegbar(String),

    // --- Generierung ---
    #[error("Generierung fehlgeschlagen: {0}")]
    Generierung(String),

    // --- Speicher ---
    #[error("Speicherfehler: {0}")]
    Speicher(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl LeonError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler eine verweigerte Berechtigung ist
    pub fn ist_zugriff_verweigert(&self) -> bool {
        matches!(self, Self::ZugriffVerweigert(_))
    }
}
