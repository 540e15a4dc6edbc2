//! Fehlertypen fuer den Task-Orchestrator

use leon_core::{Capability, LeonError};
use leon_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// Berechtigung ist `off`, die Taskliste bleibt unveraendert
    #[error("Zugriff verweigert: Berechtigung '{0}' ist deaktiviert")]
    ZugriffVerweigert(Capability),

    /// Generierung fehlgeschlagen. Der Grund wird nur geloggt, der
    /// persistierte Task erhaelt lediglich den Status `failed`.
    #[error("Generierung fehlgeschlagen: {0}")]
    GenerierungFehlgeschlagen(String),

    #[error("Permission-Gate nicht erreichbar: {0}")]
    Gate(String),

    #[error("Speicherfehler: {0}")]
    Speicher(#[from] StoreError),
}

pub type TaskResult<T> = Result<T, TaskError>;

impl From<LeonError> for TaskError {
    fn from(e: LeonError) -> Self {
        match e {
            LeonError::ZugriffVerweigert(cap) => Self::ZugriffVerweigert(cap),
            LeonError::Generierung(msg) => Self::GenerierungFehlgeschlagen(msg),
            andere => Self::Gate(andere.to_string()),
        }
    }
}

impl From<TaskError> for LeonError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::ZugriffVerweigert(cap) => LeonError::ZugriffVerweigert(cap),
            TaskError::GenerierungFehlgeschlagen(msg) => LeonError::Generierung(msg),
            TaskError::Speicher(s) => s.into(),
            TaskError::Gate(msg) => LeonError::Intern(msg),
        }
    }
}
