//! Transport-Schnittstelle zum Inferenzdienst
//!
//! Das konkrete Wire-Format des Anbieters liegt ausserhalb dieses Crates.
//! Ein Transport liefert nach `connect` eine [`LiveConnection`]: einen
//! unbegrenzten Sender fuer ausgehende Frames und einen Kanal mit genau
//! einem Konsumenten fuer eingehende [`TransportEvent`]s.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use leon_audio::RealtimeInput;

use crate::config::SessionConfig;
use crate::error::LiveResult;

/// Eingehende Nachricht des Dienstes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerMessage {
    /// base64-kodiertes PCM16 (24 kHz Mono), in Eingangsreihenfolge
    pub audio: Vec<String>,
    /// Barge-in: das Modell wurde unterbrochen
    pub interrupted: bool,
    pub input_transcription: Option<String>,
    pub output_transcription: Option<String>,
}

impl ServerMessage {
    pub fn audio(payload: impl Into<String>) -> Self {
        Self {
            audio: vec![payload.into()],
            ..Default::default()
        }
    }

    pub fn unterbrochen() -> Self {
        Self {
            interrupted: true,
            ..Default::default()
        }
    }
}

/// Ereignisse einer offenen Verbindung
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Open,
    Message(ServerMessage),
    Close,
    Error(String),
}

/// Offene Verbindung zum Dienst
pub struct LiveConnection {
    /// Ausgehende Frames (fire-and-forget, ohne Rueckstau)
    pub ausgehend: mpsc::UnboundedSender<RealtimeInput>,
    /// Eingehende Ereignisse
    pub ereignisse: mpsc::Receiver<TransportEvent>,
    /// Signal zum Schliessen der Verbindung
    pub schliessen: oneshot::Sender<()>,
}

#[async_trait]
pub trait LiveTransport: Send + Sync + 'static {
    /// Verbindung aufbauen. `Open` folgt asynchron ueber den Ereigniskanal.
    async fn connect(&self, config: SessionConfig) -> LiveResult<LiveConnection>;
}
