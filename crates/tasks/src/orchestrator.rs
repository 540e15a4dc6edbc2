//! Task-Orchestrator fuer Bild- und Video-Generierung
//!
//! `submit()` prueft die Berechtigung, legt den Task als `processing` an und
//! kehrt sofort zurueck. Die eigentliche Arbeit laeuft in einem eigenen
//! tokio-Task; dessen Ergebnis landet ausschliesslich in der persistierten
//! Taskliste, der Bibliothek und auf dem Event-Bus.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use leon_core::permissions::erfordern;
use leon_core::{
    Capability, EngineEvent, EventBus, PermissionGate, TaskId, TaskKind, TaskStatus,
};
use leon_store::{data_uri, BackgroundTask, Bibliothek, LibraryItem, TaskListe};

use crate::error::{TaskError, TaskResult};
use crate::provider::{
    GenerationProvider, ImageRequest, VideoConfig, VideoRequest, STANDARD_BILDMODELL,
    STANDARD_VIDEOMODELL,
};

const VIDEO_MIME: &str = "video/mp4";

/// Konfiguration des Orchestrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub image_model: String,
    pub image_aspect_ratio: String,
    pub video_model: String,
    pub video: VideoConfig,
    /// Abstand zwischen zwei Abfragen einer Video-Operation
    pub poll_interval_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            image_model: STANDARD_BILDMODELL.to_string(),
            image_aspect_ratio: "16:9".to_string(),
            video_model: STANDARD_VIDEOMODELL.to_string(),
            video: VideoConfig::default(),
            poll_interval_secs: 10,
        }
    }
}

impl OrchestratorConfig {
    pub fn poll_intervall(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Benoetigte Berechtigung je Task-Art
pub fn benoetigte_berechtigung(kind: TaskKind) -> Capability {
    match kind {
        TaskKind::Image => Capability::ImageGen,
        TaskKind::Video => Capability::VideoGen,
    }
}

/// Von allen Workern geteilter Kontext
struct Kontext {
    config: OrchestratorConfig,
    provider: Arc<dyn GenerationProvider>,
    gate: Arc<dyn PermissionGate>,
    tasks: TaskListe,
    bibliothek: Bibliothek,
    bus: Arc<dyn EventBus>,
}

pub struct TaskOrchestrator {
    kontext: Arc<Kontext>,
    worker: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskOrchestrator {
    pub fn neu(
        config: OrchestratorConfig,
        provider: Arc<dyn GenerationProvider>,
        gate: Arc<dyn PermissionGate>,
        tasks: TaskListe,
        bibliothek: Bibliothek,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            kontext: Arc::new(Kontext {
                config,
                provider,
                gate,
                tasks,
                bibliothek,
                bus,
            }),
            worker: Mutex::new(Vec::new()),
        }
    }

    /// Neuen Generierungs-Task starten
    ///
    /// Bei deaktivierter Berechtigung wird nichts angelegt. Sonst ist der
    /// Task beim Zurueckkehren bereits als `processing` persistiert.
    pub async fn submit(&self, kind: TaskKind, prompt: impl Into<String>) -> TaskResult<TaskId> {
        let capability = benoetigte_berechtigung(kind);
        let freigabe = erfordern(self.kontext.gate.as_ref(), capability).await?;

        let task = BackgroundTask::neu(kind, prompt);
        self.kontext.tasks.anhaengen(&task).await?;
        let task_id = task.id;

        info!(task_id = %task_id, kind = %kind, "Generierungs-Task gestartet");
        self.kontext
            .bus
            .senden(EngineEvent::TaskSubmitted { task_id, kind });

        let kontext = Arc::clone(&self.kontext);
        let handle = tokio::spawn(async move {
            kontext.ausfuehren(task, freigabe.ist_einmalig()).await;
        });

        let mut worker = self.worker.lock();
        worker.retain(|h| !h.is_finished());
        worker.push(handle);

        Ok(task_id)
    }

    /// Wartet bis alle bisher gestarteten Worker fertig sind
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(&mut *self.worker.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(fehler = %e, "Task-Worker abgebrochen");
                }
            }
        }
    }

    /// Task aus der Liste entfernen (Schliessen-Aktion der Taskliste)
    ///
    /// Laeuft der Worker noch, wird sein Ergebnis zwar in die Bibliothek
    /// uebernommen, der Status-Update findet den Task aber nicht mehr.
    pub async fn remove_task(&self, id: TaskId) -> TaskResult<bool> {
        let entfernt = self.kontext.tasks.entfernen(id).await?;
        if entfernt {
            debug!(task_id = %id, "Task entfernt");
        }
        Ok(entfernt)
    }

    /// Aktueller Stand der Taskliste
    pub async fn tasks(&self) -> TaskResult<Vec<BackgroundTask>> {
        Ok(self.kontext.tasks.alle().await?)
    }

    /// Anzahl noch nicht abgeschlossener Worker
    pub fn laufende_worker(&self) -> usize {
        self.worker.lock().iter().filter(|h| !h.is_finished()).count()
    }
}

impl Kontext {
    async fn ausfuehren(&self, task: BackgroundTask, einmalig: bool) {
        let ergebnis = match task.kind {
            TaskKind::Image => self.bild_erzeugen(&task.prompt).await,
            TaskKind::Video => self.video_erzeugen(&task.prompt).await,
        };

        let (status, asset) = match ergebnis {
            Ok(item) => match self.bibliothek.hinzufuegen(&item).await {
                Ok(()) => (TaskStatus::Completed, Some(item.id)),
                Err(e) => {
                    warn!(task_id = %task.id, fehler = %e, "Asset konnte nicht gespeichert werden");
                    (TaskStatus::Failed, None)
                }
            },
            Err(e) => {
                warn!(task_id = %task.id, kind = %task.kind, fehler = %e, "Generierung fehlgeschlagen");
                (TaskStatus::Failed, None)
            }
        };

        if let Err(e) = self.tasks.status_setzen(task.id, status, asset).await {
            // z.B. Task wurde waehrend der Generierung entfernt
            debug!(task_id = %task.id, fehler = %e, "Task-Status nicht aktualisiert");
        }

        info!(task_id = %task.id, status = ?status, "Generierungs-Task beendet");
        self.bus.senden(EngineEvent::TaskFinished {
            task_id: task.id,
            status,
        });

        if status == TaskStatus::Completed && einmalig {
            let capability = benoetigte_berechtigung(task.kind);
            match self.gate.grant_consumed(capability).await {
                Ok(()) => self.bus.senden(EngineEvent::GrantConsumed { capability }),
                Err(e) => warn!(capability = %capability, fehler = %e, "Freigabe nicht zurueckgesetzt"),
            }
        }
    }

    async fn bild_erzeugen(&self, prompt: &str) -> TaskResult<LibraryItem> {
        let request = ImageRequest {
            model: self.config.image_model.clone(),
            prompt: prompt.to_string(),
            aspect_ratio: self.config.image_aspect_ratio.clone(),
        };
        let daten = self
            .provider
            .generate_image(&request)
            .await?
            .ok_or_else(|| TaskError::GenerierungFehlgeschlagen("Antwort ohne Bilddaten".into()))?;

        Ok(LibraryItem::neu(
            TaskKind::Image,
            data_uri(&daten.mime_type, &daten.data),
            prompt,
        ))
    }

    async fn video_erzeugen(&self, prompt: &str) -> TaskResult<LibraryItem> {
        let request = VideoRequest {
            model: self.config.video_model.clone(),
            prompt: prompt.to_string(),
            config: self.config.video.clone(),
        };
        let handle = self.provider.submit_video(&request).await?;
        debug!(operation = %handle.0, "Video-Operation gestartet");

        // Kein Abbruch und kein Backoff: es wird abgefragt bis `done`
        let intervall = self.config.poll_intervall();
        let status = loop {
            tokio::time::sleep(intervall).await;
            let status = self.provider.poll_video(&handle).await?;
            if status.done {
                break status;
            }
        };

        let uri = status.result_uri.ok_or_else(|| {
            TaskError::GenerierungFehlgeschlagen("Operation ohne Ergebnis-URI".into())
        })?;
        let bytes = self.provider.fetch(&uri).await?;
        debug!(operation = %handle.0, bytes = bytes.len(), "Video geladen");

        Ok(LibraryItem::neu(
            TaskKind::Video,
            data_uri(VIDEO_MIME, &STANDARD.encode(&bytes)),
            prompt,
        ))
    }
}
