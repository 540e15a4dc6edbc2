//! Gemeinsame Identifikations- und Zustandstypen fuer Leon
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! Session-, Task-, Asset- und Benutzer-IDs zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_typ {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Erstellt eine neue zufaellige ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Gibt die innere UUID zurueck
            pub fn inner(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }
    };
}

id_typ!(
    /// Eindeutige Benutzer-ID (fuer benutzerbezogene Dokumente)
    UserId,
    "user"
);
id_typ!(
    /// Eindeutige ID einer Live-Session
    SessionId,
    "session"
);
id_typ!(
    /// Eindeutige ID eines Hintergrund-Tasks
    TaskId,
    "task"
);
id_typ!(
    /// Eindeutige ID eines Eintrags in der Asset-Bibliothek
    AssetId,
    "asset"
);

/// Art einer Hintergrund-Generierung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Image,
    Video,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Lebenszyklus eines Hintergrund-Tasks
///
/// Erlaubte Uebergaenge: `Processing -> Completed` und `Processing -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Gibt true zurueck wenn der Task abgeschlossen ist (erfolgreich oder nicht)
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Prueft ob ein Uebergang von `self` nach `ziel` zulaessig ist
    pub fn uebergang_erlaubt(&self, ziel: TaskStatus) -> bool {
        matches!(
            (self, ziel),
            (Self::Processing, Self::Completed) | (Self::Processing, Self::Failed)
        )
    }
}

/// Zustand einer Live-Session
///
/// ```text
/// Idle --start()--> Connecting --open--> Active --stop()|close--> Closed
/// Connecting|Active --error--> Failed
/// Active --Barge-in--> Interrupted --> Active
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    /// Kurzzeitig waehrend des Playback-Flush nach einem Barge-in
    Interrupted,
    Closed,
    Failed,
}

impl SessionState {
    /// Terminale Zustaende erfordern einen neuen `start()`
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    /// Gibt true zurueck solange eine Verbindung besteht oder aufgebaut wird
    pub fn ist_belegt(&self) -> bool {
        matches!(self, Self::Connecting | Self::Active | Self::Interrupted)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Interrupted => "interrupted",
            Self::Closed => "closed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
