//! Test-Doubles fuer Transport, Geraete und Permission-Gate

mod session_tests;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use leon_audio::{PlaybackScheduler, RealtimeInput};
use leon_core::{Capability, PermissionGate, PermissionStatus, PermissionsState};

use crate::config::SessionConfig;
use crate::error::{LiveError, LiveResult};
use crate::media::{MediaDevices, MediaHandle};
use crate::transport::{LiveConnection, LiveTransport, TransportEvent};

/// Gegenseite einer Mock-Verbindung (Sicht des "Dienstes")
pub(crate) struct Gegenstelle {
    pub ereignisse: mpsc::Sender<TransportEvent>,
    pub ausgehend: mpsc::UnboundedReceiver<RealtimeInput>,
    pub geschlossen: oneshot::Receiver<()>,
}

#[derive(Default)]
pub(crate) struct MockTransport {
    pub fehler: Option<String>,
    pub configs: Mutex<Vec<SessionConfig>>,
    gegenstelle: Mutex<Option<Gegenstelle>>,
}

impl MockTransport {
    pub fn fehlerhaft(grund: &str) -> Self {
        Self {
            fehler: Some(grund.to_string()),
            ..Default::default()
        }
    }

    pub fn gegenstelle(&self) -> Gegenstelle {
        self.gegenstelle
            .lock()
            .take()
            .expect("keine offene Verbindung")
    }
}

#[async_trait]
impl LiveTransport for MockTransport {
    async fn connect(&self, config: SessionConfig) -> LiveResult<LiveConnection> {
        self.configs.lock().push(config);
        if let Some(grund) = &self.fehler {
            return Err(LiveError::VerbindungFehlgeschlagen(grund.clone()));
        }

        let (ausgehend_tx, ausgehend_rx) = mpsc::unbounded_channel();
        let (ereignis_tx, ereignis_rx) = mpsc::channel(64);
        let (schliessen_tx, schliessen_rx) = oneshot::channel();
        *self.gegenstelle.lock() = Some(Gegenstelle {
            ereignisse: ereignis_tx,
            ausgehend: ausgehend_rx,
            geschlossen: schliessen_rx,
        });
        Ok(LiveConnection {
            ausgehend: ausgehend_tx,
            ereignisse: ereignis_rx,
            schliessen: schliessen_tx,
        })
    }
}

struct MockHandle {
    gestoppt: Arc<AtomicUsize>,
}

impl MediaHandle for MockHandle {
    fn stoppen(self: Box<Self>) {
        self.gestoppt.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct MockGeraete {
    pub ohne_kamera: bool,
    /// Geraete ohne jede Kamera-Unterstuetzung (wie der cpal-Host)
    pub ohne_video: bool,
    pub mikrofon: Mutex<Option<mpsc::UnboundedSender<RealtimeInput>>>,
    pub scheduler: Mutex<Option<PlaybackScheduler>>,
    pub gestoppt: Arc<AtomicUsize>,
}

impl MockGeraete {
    pub fn mikrofon(&self) -> mpsc::UnboundedSender<RealtimeInput> {
        self.mikrofon.lock().clone().expect("Mikrofon nicht geoeffnet")
    }

    pub fn scheduler(&self) -> PlaybackScheduler {
        self.scheduler.lock().clone().expect("Lautsprecher nicht geoeffnet")
    }

    pub fn gestoppt(&self) -> usize {
        self.gestoppt.load(Ordering::SeqCst)
    }

    fn handle(&self) -> Box<dyn MediaHandle> {
        Box::new(MockHandle {
            gestoppt: Arc::clone(&self.gestoppt),
        })
    }
}

impl MediaDevices for MockGeraete {
    fn kamera_verfuegbar(&self) -> bool {
        !self.ohne_video
    }

    fn mikrofon_oeffnen(
        &self,
        ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> LiveResult<Box<dyn MediaHandle>> {
        *self.mikrofon.lock() = Some(ziel);
        Ok(self.handle())
    }

    fn kamera_oeffnen(
        &self,
        _ziel: mpsc::UnboundedSender<RealtimeInput>,
    ) -> LiveResult<Box<dyn MediaHandle>> {
        if self.ohne_kamera {
            return Err(LiveError::GeraetNichtVerfuegbar("keine Kamera".to_string()));
        }
        Ok(self.handle())
    }

    fn lautsprecher_oeffnen(
        &self,
        scheduler: PlaybackScheduler,
    ) -> LiveResult<Box<dyn MediaHandle>> {
        *self.scheduler.lock() = Some(scheduler);
        Ok(self.handle())
    }
}

/// Gate mit festem Zustand, protokolliert Verbrauchsmeldungen
#[derive(Default)]
pub(crate) struct TestGate {
    pub state: Mutex<PermissionsState>,
    pub verbraucht: Mutex<Vec<Capability>>,
}

impl TestGate {
    pub fn mit(freigaben: &[(Capability, PermissionStatus)]) -> Self {
        let gate = Self::default();
        for (cap, status) in freigaben {
            gate.state.lock().setzen(*cap, *status);
        }
        gate
    }
}

#[async_trait]
impl PermissionGate for TestGate {
    async fn status(&self, capability: Capability) -> leon_core::Result<PermissionStatus> {
        Ok(self.state.lock().status(capability))
    }

    async fn grant_consumed(&self, capability: Capability) -> leon_core::Result<()> {
        self.verbraucht.lock().push(capability);
        let mut state = self.state.lock();
        if state.status(capability) == PermissionStatus::Temporary {
            state.setzen(capability, PermissionStatus::Off);
        }
        Ok(())
    }
}
