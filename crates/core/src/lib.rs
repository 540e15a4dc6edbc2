//! leon-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Leon-Crates gemeinsam genutzt werden: IDs, Berechtigungsmodell,
//! Event-Bus und der zentrale Fehler-Enum.

pub mod error;
pub mod event;
pub mod permissions;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{LeonError, Result};
pub use event::{BroadcastBus, EngineEvent, EventBus, TranscriptQuelle};
pub use permissions::{Capability, PermissionGate, PermissionStatus, PermissionsState};
pub use types::{AssetId, SessionId, SessionState, TaskId, TaskKind, TaskStatus, UserId};
