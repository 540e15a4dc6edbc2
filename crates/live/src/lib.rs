//! leon-live – Echtzeit-Sprachsession mit dem Inferenzdienst
//!
//! Verdrahtet Mikrofon-Capture, Transport und Playback-Scheduler zu einer
//! Duplex-Session und setzt das Start/Stop-, Interrupt- und Close-Protokoll
//! um. Das Wire-Format des Anbieters steckt hinter [`LiveTransport`].

pub mod config;
pub mod error;
pub mod media;
pub mod session;
pub mod transport;

#[cfg(test)]
mod tests;

pub use config::{LiveConfig, Modality, SessionConfig, STANDARD_MODELL, SYSTEM_ANWEISUNG};
pub use error::{LiveError, LiveResult};
pub use media::{CpalMediaDevices, MediaDevices, MediaHandle};
pub use session::{LiveSessionController, SessionStatus};
pub use transport::{LiveConnection, LiveTransport, ServerMessage, TransportEvent};
