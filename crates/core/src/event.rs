//! Event-Bus fuer diskrete Engine-Ereignisse
//!
//! Live-Session und Task-Orchestrator melden Zustandswechsel ausschliesslich
//! ueber persistierten Zustand und diese Ereignisse. Der Bus ist ein
//! `tokio::sync::broadcast`-Kanal: langsame Abonnenten verpassen im
//! Zweifel Ereignisse (`Lagged`), der Sender blockiert nie.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::permissions::Capability;
use crate::types::{SessionId, SessionState, TaskId, TaskKind, TaskStatus};

/// Standard-Kapazitaet des Broadcast-Kanals
const STANDARD_KAPAZITAET: usize = 256;

/// Herkunft einer Transkription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptQuelle {
    /// Was der Benutzer gesagt hat
    Input,
    /// Was das Modell gesprochen hat
    Output,
}

/// Alle Ereignisse die ueber den Event-Bus fliessen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    // --- Live-Session ---
    /// Zustand einer Live-Session hat gewechselt
    SessionStateChanged {
        session_id: SessionId,
        state: SessionState,
    },
    /// Barge-in: saemtliches ausstehendes Playback wurde verworfen
    SessionInterrupted {
        session_id: SessionId,
        verworfen: usize,
    },
    /// Transkription aus der Live-Session
    Transcript {
        session_id: SessionId,
        quelle: TranscriptQuelle,
        text: String,
    },
    /// Ausgehender Audio-Frame wurde versendet (wird nicht persistiert)
    OutboundFrameSent { session_id: SessionId, bytes: usize },
    /// Eingehender Audio-Puffer wurde zum Abspielen eingeplant
    PlaybackScheduled {
        session_id: SessionId,
        start: f64,
        dauer: f64,
    },

    // --- Hintergrund-Tasks ---
    /// Neuer Hintergrund-Task angelegt
    TaskSubmitted { task_id: TaskId, kind: TaskKind },
    /// Hintergrund-Task hat einen terminalen Zustand erreicht
    TaskFinished { task_id: TaskId, status: TaskStatus },

    // --- Berechtigungen ---
    /// Eine Einmal-Freigabe wurde verbraucht
    GrantConsumed { capability: Capability },
}

impl EngineEvent {
    /// Gibt den Event-Namen als String zurueck (fuer Logs und Metriken)
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStateChanged { .. } => "session_state_changed",
            Self::SessionInterrupted { .. } => "session_interrupted",
            Self::Transcript { .. } => "transcript",
            Self::OutboundFrameSent { .. } => "outbound_frame_sent",
            Self::PlaybackScheduled { .. } => "playback_scheduled",
            Self::TaskSubmitted { .. } => "task_submitted",
            Self::TaskFinished { .. } => "task_finished",
            Self::GrantConsumed { .. } => "grant_consumed",
        }
    }
}

/// Trait fuer den Event-Bus
pub trait EventBus: Send + Sync + 'static {
    /// Sendet ein Ereignis an alle Abonnenten (ohne Abonnenten: verworfen)
    fn senden(&self, event: EngineEvent);

    /// Abonniert alle zukuenftigen Ereignisse
    fn abonnieren(&self) -> broadcast::Receiver<EngineEvent>;
}

/// Event-Bus auf Basis von `tokio::sync::broadcast`
#[derive(Debug, Clone)]
pub struct BroadcastBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastBus {
    /// Erstellt einen Bus mit Standard-Kapazitaet
    pub fn neu() -> Self {
        Self::mit_kapazitaet(STANDARD_KAPAZITAET)
    }

    /// Erstellt einen Bus mit gegebener Kapazitaet
    pub fn mit_kapazitaet(kapazitaet: usize) -> Self {
        let (tx, _) = broadcast::channel(kapazitaet.max(1));
        Self { tx }
    }

    /// Anzahl aktiver Abonnenten
    pub fn abonnenten(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::neu()
    }
}

impl EventBus for BroadcastBus {
    fn senden(&self, event: EngineEvent) {
        tracing::trace!(event = event.name(), "Engine-Event");
        // Fehler bedeutet nur: niemand hoert zu
        let _ = self.tx.send(event);
    }

    fn abonnieren(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}
