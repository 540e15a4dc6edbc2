//! Live-Session-Controller
//!
//! ```text
//! Idle --start()--> Connecting --Open--> Active --stop()|Close--> Closed
//! Connecting|Active --Error--> Failed
//! Active --interrupted--> Interrupted --> Active
//! ```
//!
//! Pro Controller laeuft hoechstens eine Session. Nach `start()` besitzt ein
//! eigener Task die Verbindung, die Geraete und die Playback-Zeitleiste und
//! baut beim Ende (Stop, Close oder Fehler) alles wieder ab.

use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use leon_audio::{AudioFrame, PlaybackScheduler, RealtimeInput, AUSGANG_SAMPLE_RATE};
use leon_core::permissions::erfordern;
use leon_core::{
    Capability, EngineEvent, EventBus, PermissionGate, SessionId, SessionState, TranscriptQuelle,
};

use crate::config::LiveConfig;
use crate::error::{LiveError, LiveResult};
use crate::media::{MediaDevices, MediaHandle};
use crate::transport::{LiveConnection, LiveTransport, ServerMessage, TransportEvent};

pub const STATUS_STANDBY: &str = "Standby";
pub const STATUS_VERBINDET: &str = "Verbindung wird aufgebaut";
pub const STATUS_AKTIV: &str = "Verbindung aktiv";
pub const STATUS_FEHLGESCHLAGEN: &str = "Verbindung fehlgeschlagen";

/// Anzeigbarer Zustand der Live-Session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub session_id: Option<SessionId>,
    /// Menschenlesbarer Status
    pub text: String,
    /// Letzte Fehlermeldung (Berechtigung, Geraet oder Verbindung)
    pub letzter_fehler: Option<String>,
}

#[derive(Default)]
struct StatusInfo {
    session_id: Option<SessionId>,
    fehlergrund: Option<String>,
    letzter_fehler: Option<String>,
}

/// Zwischen Controller und Session-Task geteilter Zustand
struct Geteilt {
    zustand: watch::Sender<SessionState>,
    info: SyncMutex<StatusInfo>,
    bus: Arc<dyn EventBus>,
}

impl Geteilt {
    fn zustand_setzen(&self, session_id: SessionId, state: SessionState) {
        self.zustand.send_replace(state);
        self.bus
            .senden(EngineEvent::SessionStateChanged { session_id, state });
        debug!(session_id = %session_id, state = %state, "Session-Zustand gewechselt");
    }

    fn fehler_merken(&self, fehler: &LiveError) {
        self.info.lock().letzter_fehler = Some(fehler.to_string());
    }
}

struct LaufendeSession {
    id: SessionId,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

pub struct LiveSessionController {
    config: LiveConfig,
    transport: Arc<dyn LiveTransport>,
    gate: Arc<dyn PermissionGate>,
    geraete: Arc<dyn MediaDevices>,
    geteilt: Arc<Geteilt>,
    laufend: Mutex<Option<LaufendeSession>>,
}

impl LiveSessionController {
    pub fn neu(
        config: LiveConfig,
        transport: Arc<dyn LiveTransport>,
        gate: Arc<dyn PermissionGate>,
        geraete: Arc<dyn MediaDevices>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let (zustand, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            transport,
            gate,
            geraete,
            geteilt: Arc::new(Geteilt {
                zustand,
                info: SyncMutex::new(StatusInfo::default()),
                bus,
            }),
            laufend: Mutex::new(None),
        }
    }

    /// Aktueller Session-Zustand
    pub fn zustand(&self) -> SessionState {
        *self.geteilt.zustand.borrow()
    }

    /// Zustandswechsel beobachten
    pub fn zustand_abonnieren(&self) -> watch::Receiver<SessionState> {
        self.geteilt.zustand.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.zustand();
        let info = self.geteilt.info.lock();
        let text = match state {
            SessionState::Idle | SessionState::Closed => STATUS_STANDBY.to_string(),
            SessionState::Connecting => STATUS_VERBINDET.to_string(),
            SessionState::Active | SessionState::Interrupted => STATUS_AKTIV.to_string(),
            SessionState::Failed => format!(
                "{STATUS_FEHLGESCHLAGEN}: {}",
                info.fehlergrund.as_deref().unwrap_or("unbekannt")
            ),
        };
        SessionStatus {
            state,
            session_id: info.session_id,
            text,
            letzter_fehler: info.letzter_fehler.clone(),
        }
    }

    /// Neue Session starten
    ///
    /// Prueft `microphone` (und bei `wants_video` zusaetzlich `camera`).
    /// Bei verweigerter Berechtigung oder fehlender Kamera-Unterstuetzung
    /// der Geraete bleibt der Zustand unveraendert. Kehrt
    /// zurueck sobald die Verbindung angefordert ist; `Active` folgt mit dem
    /// `Open`-Ereignis des Transports.
    pub async fn start(&self, wants_video: bool) -> LiveResult<SessionId> {
        let mut laufend = self.laufend.lock().await;
        if self.zustand().ist_belegt() {
            return Err(LiveError::SessionAktiv);
        }
        if let Some(alt) = laufend.take() {
            // Vorherige Session hat sich selbst beendet
            let _ = alt.task.await;
        }

        let mut einmalig = Vec::new();
        if self.berechtigung_pruefen(Capability::Microphone).await? {
            einmalig.push(Capability::Microphone);
        }
        if wants_video && self.berechtigung_pruefen(Capability::Camera).await? {
            einmalig.push(Capability::Camera);
        }
        if wants_video && !self.geraete.kamera_verfuegbar() {
            let fehler = LiveError::VideoNichtUnterstuetzt;
            info!("Live-Session abgelehnt: {}", fehler);
            self.geteilt.fehler_merken(&fehler);
            return Err(fehler);
        }

        let id = SessionId::new();
        *self.geteilt.info.lock() = StatusInfo {
            session_id: Some(id),
            ..Default::default()
        };
        self.geteilt.zustand_setzen(id, SessionState::Connecting);
        info!(session_id = %id, video = wants_video, "Live-Session wird aufgebaut");

        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let scheduler = PlaybackScheduler::new(AUSGANG_SAMPLE_RATE);
        let mut handles: Vec<Box<dyn MediaHandle>> = Vec::new();

        if let Err(e) = self.geraete_oeffnen(wants_video, capture_tx, &scheduler, &mut handles) {
            geraete_stoppen(handles).await;
            self.fehlschlagen(id, &e);
            return Err(e);
        }

        let verbindung = match self
            .transport
            .connect(self.config.session_config(wants_video))
            .await
        {
            Ok(v) => v,
            Err(e) => {
                geraete_stoppen(handles).await;
                self.fehlschlagen(id, &e);
                return Err(e);
            }
        };

        let lauf = SessionLauf {
            id,
            geteilt: Arc::clone(&self.geteilt),
            gate: Arc::clone(&self.gate),
            scheduler,
            handles,
            einmalig,
            capture_rx,
            verbindung,
        };
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(lauf.ausfuehren(stop_rx));

        *laufend = Some(LaufendeSession {
            id,
            stop_tx: Some(stop_tx),
            task,
        });
        Ok(id)
    }

    /// Laufende Session beenden
    ///
    /// Schliesst die Verbindung, leert das Playback und verbraucht
    /// Einmal-Freigaben. Ohne laufende Session passiert nichts.
    pub async fn stop(&self) -> LiveResult<()> {
        let mut laufend = self.laufend.lock().await;
        let Some(mut session) = laufend.take() else {
            return Ok(());
        };

        info!(session_id = %session.id, "Live-Session wird beendet");
        if let Some(tx) = session.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = session.task.await {
            warn!(session_id = %session.id, "Session-Task abgebrochen: {}", e);
        }
        Ok(())
    }

    /// Gibt true zurueck wenn die Faehigkeit nur einmalig freigegeben ist
    async fn berechtigung_pruefen(&self, capability: Capability) -> LiveResult<bool> {
        match erfordern(self.gate.as_ref(), capability).await {
            Ok(status) => Ok(status.ist_einmalig()),
            Err(e) => {
                let fehler = LiveError::from(e);
                info!(capability = %capability, "Live-Session abgelehnt: {}", fehler);
                self.geteilt.fehler_merken(&fehler);
                Err(fehler)
            }
        }
    }

    fn geraete_oeffnen(
        &self,
        wants_video: bool,
        capture_tx: mpsc::UnboundedSender<RealtimeInput>,
        scheduler: &PlaybackScheduler,
        handles: &mut Vec<Box<dyn MediaHandle>>,
    ) -> LiveResult<()> {
        handles.push(self.geraete.lautsprecher_oeffnen(scheduler.clone())?);
        if wants_video {
            handles.push(self.geraete.kamera_oeffnen(capture_tx.clone())?);
        }
        handles.push(self.geraete.mikrofon_oeffnen(capture_tx)?);
        Ok(())
    }

    fn fehlschlagen(&self, id: SessionId, fehler: &LiveError) {
        warn!(session_id = %id, "Live-Session fehlgeschlagen: {}", fehler);
        {
            let mut info = self.geteilt.info.lock();
            info.fehlergrund = Some(fehler.to_string());
            info.letzter_fehler = Some(fehler.to_string());
        }
        self.geteilt.zustand_setzen(id, SessionState::Failed);
    }
}

// ---------------------------------------------------------------------------
// Session-Task
// ---------------------------------------------------------------------------

enum Ende {
    Gestoppt,
    Geschlossen,
    Fehler(String),
}

struct SessionLauf {
    id: SessionId,
    geteilt: Arc<Geteilt>,
    gate: Arc<dyn PermissionGate>,
    scheduler: PlaybackScheduler,
    handles: Vec<Box<dyn MediaHandle>>,
    /// Beim Schliessen zu verbrauchende Einmal-Freigaben
    einmalig: Vec<Capability>,
    capture_rx: mpsc::UnboundedReceiver<RealtimeInput>,
    verbindung: LiveConnection,
}

impl SessionLauf {
    async fn ausfuehren(mut self, mut stop_rx: oneshot::Receiver<()>) {
        let mut aktiv = false;

        let ende = loop {
            tokio::select! {
                _ = &mut stop_rx => break Ende::Gestoppt,
                ereignis = self.verbindung.ereignisse.recv() => match ereignis {
                    Some(TransportEvent::Open) => {
                        if !aktiv {
                            aktiv = true;
                            self.geteilt.zustand_setzen(self.id, SessionState::Active);
                            info!(session_id = %self.id, "Live-Session aktiv");
                        }
                    }
                    Some(TransportEvent::Message(nachricht)) => self.nachricht_verarbeiten(nachricht),
                    Some(TransportEvent::Close) | None => break Ende::Geschlossen,
                    Some(TransportEvent::Error(grund)) => break Ende::Fehler(grund),
                },
                Some(input) = self.capture_rx.recv() => {
                    // Vor `Open` aufgenommene Fenster werden verworfen
                    if aktiv {
                        self.senden(input);
                    }
                }
            }
        };

        self.abbauen(ende).await;
    }

    fn nachricht_verarbeiten(&self, nachricht: ServerMessage) {
        let bus = &self.geteilt.bus;

        if let Some(text) = nachricht.input_transcription {
            bus.senden(EngineEvent::Transcript {
                session_id: self.id,
                quelle: TranscriptQuelle::Input,
                text,
            });
        }
        if let Some(text) = nachricht.output_transcription {
            bus.senden(EngineEvent::Transcript {
                session_id: self.id,
                quelle: TranscriptQuelle::Output,
                text,
            });
        }

        for payload in &nachricht.audio {
            let geplant = AudioFrame::eingehend_aus_base64(payload)
                .and_then(|frame| self.scheduler.schedule(&frame));
            match geplant {
                Ok(geplant) => bus.senden(EngineEvent::PlaybackScheduled {
                    session_id: self.id,
                    start: geplant.start,
                    dauer: geplant.dauer,
                }),
                Err(e) => warn!(session_id = %self.id, "Eingehender Audio-Frame verworfen: {}", e),
            }
        }

        // Der Interrupt verwirft auch das Audio derselben Nachricht
        if nachricht.interrupted {
            self.geteilt
                .zustand_setzen(self.id, SessionState::Interrupted);
            let verworfen = self.scheduler.interrupt();
            bus.senden(EngineEvent::SessionInterrupted {
                session_id: self.id,
                verworfen,
            });
            debug!(session_id = %self.id, verworfen, "Barge-in: Playback geleert");
            self.geteilt.zustand_setzen(self.id, SessionState::Active);
        }
    }

    fn senden(&self, input: RealtimeInput) {
        let bytes = input.nutzdaten_bytes();
        if self.verbindung.ausgehend.send(input).is_err() {
            trace!(session_id = %self.id, "Ausgehender Kanal geschlossen, Frame verworfen");
            return;
        }
        self.geteilt.bus.senden(EngineEvent::OutboundFrameSent {
            session_id: self.id,
            bytes,
        });
    }

    async fn abbauen(self, ende: Ende) {
        let SessionLauf {
            id,
            geteilt,
            gate,
            scheduler,
            handles,
            einmalig,
            capture_rx,
            verbindung,
        } = self;

        let _ = verbindung.schliessen.send(());
        drop(verbindung.ausgehend);
        drop(capture_rx);
        geraete_stoppen(handles).await;
        let verworfen = scheduler.interrupt();
        debug!(session_id = %id, verworfen, "Playback beim Abbau geleert");

        match ende {
            Ende::Gestoppt | Ende::Geschlossen => {
                for capability in einmalig {
                    match gate.grant_consumed(capability).await {
                        Ok(()) => geteilt.bus.senden(EngineEvent::GrantConsumed { capability }),
                        Err(e) => warn!(capability = %capability, "Freigabe nicht verbraucht: {}", e),
                    }
                }
                geteilt.zustand_setzen(id, SessionState::Closed);
                info!(session_id = %id, "Live-Session geschlossen");
            }
            Ende::Fehler(grund) => {
                warn!(session_id = %id, "Live-Session fehlgeschlagen: {}", grund);
                {
                    let mut info = geteilt.info.lock();
                    info.fehlergrund = Some(grund.clone());
                    info.letzter_fehler =
                        Some(LiveError::VerbindungFehlgeschlagen(grund).to_string());
                }
                geteilt.zustand_setzen(id, SessionState::Failed);
            }
        }
    }
}

/// Geraete freigeben (blockierende Thread-Joins ausserhalb des Runtimes)
async fn geraete_stoppen(handles: Vec<Box<dyn MediaHandle>>) {
    if handles.is_empty() {
        return;
    }
    let ergebnis = tokio::task::spawn_blocking(move || {
        for handle in handles {
            handle.stoppen();
        }
    })
    .await;
    if let Err(e) = ergebnis {
        warn!("Geraete konnten nicht sauber gestoppt werden: {}", e);
    }
}
