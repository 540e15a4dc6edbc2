//! leon-tasks – Hintergrund-Generierung von Bildern und Videos
//!
//! Der [`TaskOrchestrator`] startet Generierungs-Jobs ueber einen
//! austauschbaren [`GenerationProvider`] und meldet Ergebnisse nur ueber
//! die persistierte Taskliste. [`TaskWatcher`] liest diese Liste im Takt.

pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod watcher;

pub use error::{TaskError, TaskResult};
pub use orchestrator::{benoetigte_berechtigung, OrchestratorConfig, TaskOrchestrator};
pub use provider::{
    GenerationProvider, ImageRequest, InlineData, OperationHandle, OperationStatus, VideoConfig,
    VideoRequest, STANDARD_BILDMODELL, STANDARD_VIDEOMODELL,
};
pub use watcher::{
    aenderungen_ermitteln, TaskAenderung, TaskSnapshot, TaskWatcher, STANDARD_WATCH_INTERVALL,
};
