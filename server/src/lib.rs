//! leon-server – Engine-Host
//!
//! Baut Store, Permission-Gate, Event-Bus und Dokumentzugriffe aus der
//! Konfiguration auf und betreibt die Hintergrunddienste: Task-Watcher,
//! Metriken-Recorder und Observability-Server. Live-Session und
//! Orchestrator werden mit dem jeweiligen Transport bzw. Provider aus
//! [`EngineKomponenten`] erzeugt.

pub mod config;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;

use config::{EngineConfig, StoreBackend, StoreEinstellungen};
use leon_core::BroadcastBus;
use leon_live::{CpalMediaDevices, LiveSessionController, LiveTransport, MediaDevices};
use leon_observability::{observability_server_starten, spawn_event_recorder, EngineMetrics, HealthState};
use leon_store::{Bibliothek, JsonFileStore, KeyValueStore, MemoryStore, StorePermissionGate, TaskListe};
use leon_tasks::{GenerationProvider, TaskOrchestrator, TaskSnapshot, TaskWatcher};

/// Oeffnet das konfigurierte Store-Backend
pub async fn store_oeffnen(einstellungen: &StoreEinstellungen) -> Result<Arc<dyn KeyValueStore>> {
    match einstellungen.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::neu())),
        StoreBackend::Json => {
            tokio::fs::create_dir_all(&einstellungen.verzeichnis).await?;
            tracing::info!(verzeichnis = %einstellungen.verzeichnis.display(), "JSON-Store geoeffnet");
            Ok(Arc::new(JsonFileStore::new(&einstellungen.verzeichnis)))
        }
    }
}

/// Gemeinsam genutzte Bausteine einer laufenden Engine
pub struct EngineKomponenten {
    pub config: EngineConfig,
    pub store: Arc<dyn KeyValueStore>,
    pub gate: StorePermissionGate,
    pub bus: BroadcastBus,
    pub tasks: TaskListe,
    pub bibliothek: Bibliothek,
}

impl EngineKomponenten {
    /// Oeffnet den Store und setzt Einmal-Freigaben vom letzten Lauf zurueck
    pub async fn aufbauen(config: EngineConfig) -> Result<Self> {
        let store = store_oeffnen(&config.store).await?;
        let gate = StorePermissionGate::global(Arc::clone(&store));

        let zurueckgesetzt = gate.beim_start_bereinigen().await?;
        if !zurueckgesetzt.is_empty() {
            tracing::info!(?zurueckgesetzt, "Einmal-Freigaben vom letzten Lauf verworfen");
        }

        Ok(Self {
            tasks: TaskListe::global(Arc::clone(&store)),
            bibliothek: Bibliothek::global(Arc::clone(&store)),
            bus: BroadcastBus::neu(),
            config,
            store,
            gate,
        })
    }

    pub fn orchestrator(&self, provider: Arc<dyn GenerationProvider>) -> TaskOrchestrator {
        TaskOrchestrator::neu(
            self.config.orchestrator_config(),
            provider,
            Arc::new(self.gate.clone()),
            self.tasks.clone(),
            self.bibliothek.clone(),
            Arc::new(self.bus.clone()),
        )
    }

    pub fn live_controller(
        &self,
        transport: Arc<dyn LiveTransport>,
        geraete: Arc<dyn MediaDevices>,
    ) -> LiveSessionController {
        LiveSessionController::neu(
            self.config.live_config(),
            transport,
            Arc::new(self.gate.clone()),
            geraete,
            Arc::new(self.bus.clone()),
        )
    }

    /// Mikrofon und Lautsprecher ueber cpal
    pub fn cpal_geraete(&self) -> CpalMediaDevices {
        let live = self.config.live_config();
        CpalMediaDevices::new(live.capture, live.playback)
    }
}

/// Loggt jede Statusaenderung der Taskliste und spiegelt die
/// Lesbarkeit des Stores in den Health-Check
pub async fn aenderungen_protokollieren(mut rx: watch::Receiver<TaskSnapshot>, health: HealthState) {
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        health.store_status_setzen(snapshot.lesbar);
        for aenderung in &snapshot.aenderungen {
            tracing::info!(
                task_id = %aenderung.task_id,
                vorher = ?aenderung.vorher,
                nachher = ?aenderung.nachher,
                "Task-Status geaendert"
            );
        }
    }
}

pub struct Engine {
    komponenten: EngineKomponenten,
}

impl Engine {
    pub async fn neu(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            komponenten: EngineKomponenten::aufbauen(config).await?,
        })
    }

    pub fn komponenten(&self) -> &EngineKomponenten {
        &self.komponenten
    }

    /// Startet die Hintergrunddienste und laeuft bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let k = &self.komponenten;

        let metriken = EngineMetrics::neu()?;
        let recorder = spawn_event_recorder(metriken.clone(), &k.bus);
        let health = HealthState::neu();

        let watcher = TaskWatcher::starten(k.tasks.clone(), k.config.watcher_intervall());
        let protokoll = tokio::spawn(aenderungen_protokollieren(
            watcher.abonnieren(),
            health.clone(),
        ));

        let observability = if k.config.observability.aktiviert {
            let adresse = k.config.observability_bind_adresse()?;
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(adresse, metriken, health).await {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            None
        };

        tracing::info!(
            store = ?k.config.store.backend,
            tasks = %k.tasks.schluessel(),
            "Engine laeuft. Warte auf Shutdown-Signal (Ctrl-C)..."
        );
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Engine wird beendet");

        watcher.stoppen();
        protokoll.abort();
        recorder.abort();
        if let Some(handle) = observability {
            handle.abort();
        }
        Ok(())
    }
}
