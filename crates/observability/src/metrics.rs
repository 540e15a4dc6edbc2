//! Prometheus-kompatible Metriken fuer die Leon-Engine
//!
//! Registrierte Metriken:
//! - `leon_live_sessions_started_total` – Counter: Gestartete Live-Sessions
//! - `leon_live_sessions_failed_total` – Counter: Fehlgeschlagene Live-Sessions
//! - `leon_live_sessions_active` – Gauge: Aktuell laufende Sessions
//! - `leon_live_outbound_frames_total` – Counter: Gesendete Audio-Frames
//! - `leon_live_outbound_bytes_total` – Counter: Gesendete PCM-Bytes
//! - `leon_live_playback_buffers_total` – Counter: Eingeplante Playback-Puffer
//! - `leon_live_playback_seconds_total` – Counter: Eingeplante Audiodauer
//! - `leon_live_interruptions_total` – Counter: Barge-ins
//! - `leon_live_transcripts_total` – Counter: Transkriptionen (quelle)
//! - `leon_tasks_submitted_total` – Counter: Gestartete Tasks (kind)
//! - `leon_tasks_finished_total` – Counter: Beendete Tasks (status)
//! - `leon_grants_consumed_total` – Counter: Verbrauchte Einmal-Freigaben (capability)
//! - `leon_http_request_duration_seconds` – Histogram: Antwortzeit des Observability-Servers
//!
//! Die Engine-Crates kennen Prometheus nicht. Aktualisiert wird ueber
//! [`spawn_event_recorder`], der den Event-Bus abonniert.

use std::sync::Arc;

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{
    Counter, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use leon_core::{EngineEvent, EventBus, SessionState, TaskStatus, TranscriptQuelle};

#[derive(Clone)]
pub struct EngineMetrics {
    pub registry: Arc<Registry>,

    // Live-Session
    pub sessions_started_total: IntCounter,
    pub sessions_failed_total: IntCounter,
    pub sessions_active: Gauge,
    pub outbound_frames_total: IntCounter,
    pub outbound_bytes_total: IntCounter,
    pub playback_buffers_total: IntCounter,
    pub playback_seconds_total: Counter,
    pub interruptions_total: IntCounter,
    pub transcripts_total: IntCounterVec,

    // Hintergrund-Tasks
    pub tasks_submitted_total: IntCounterVec,
    pub tasks_finished_total: IntCounterVec,
    pub grants_consumed_total: IntCounterVec,

    // HTTP
    pub http_request_duration_seconds: HistogramVec,
}

fn zaehler(registry: &Registry, name: &str, hilfe: &str) -> Result<IntCounter> {
    let counter = IntCounter::with_opts(Opts::new(name, hilfe))?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn zaehler_vec(registry: &Registry, name: &str, hilfe: &str, label: &str) -> Result<IntCounterVec> {
    let counter = IntCounterVec::new(Opts::new(name, hilfe), &[label])?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

impl EngineMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let sessions_active = Gauge::with_opts(Opts::new(
            "leon_live_sessions_active",
            "Anzahl aktuell laufender Live-Sessions",
        ))?;
        registry.register(Box::new(sessions_active.clone()))?;

        let playback_seconds_total = Counter::with_opts(Opts::new(
            "leon_live_playback_seconds_total",
            "Eingeplante Audiodauer in Sekunden",
        ))?;
        registry.register(Box::new(playback_seconds_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "leon_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            sessions_started_total: zaehler(
                &registry,
                "leon_live_sessions_started_total",
                "Gestartete Live-Sessions",
            )?,
            sessions_failed_total: zaehler(
                &registry,
                "leon_live_sessions_failed_total",
                "Fehlgeschlagene Live-Sessions",
            )?,
            sessions_active,
            outbound_frames_total: zaehler(
                &registry,
                "leon_live_outbound_frames_total",
                "Gesendete Audio-Frames",
            )?,
            outbound_bytes_total: zaehler(
                &registry,
                "leon_live_outbound_bytes_total",
                "Gesendete PCM-Bytes",
            )?,
            playback_buffers_total: zaehler(
                &registry,
                "leon_live_playback_buffers_total",
                "Eingeplante Playback-Puffer",
            )?,
            playback_seconds_total,
            interruptions_total: zaehler(
                &registry,
                "leon_live_interruptions_total",
                "Barge-ins mit verworfenem Playback",
            )?,
            transcripts_total: zaehler_vec(
                &registry,
                "leon_live_transcripts_total",
                "Empfangene Transkriptionen",
                "quelle",
            )?,
            tasks_submitted_total: zaehler_vec(
                &registry,
                "leon_tasks_submitted_total",
                "Gestartete Generierungs-Tasks",
                "kind",
            )?,
            tasks_finished_total: zaehler_vec(
                &registry,
                "leon_tasks_finished_total",
                "Beendete Generierungs-Tasks",
                "status",
            )?,
            grants_consumed_total: zaehler_vec(
                &registry,
                "leon_grants_consumed_total",
                "Verbrauchte Einmal-Freigaben",
                "capability",
            )?,
            http_request_duration_seconds,
            registry: Arc::new(registry),
        })
    }

    /// Uebernimmt ein einzelnes Engine-Ereignis
    pub fn erfassen(&self, event: &EngineEvent) {
        match event {
            EngineEvent::SessionStateChanged { state, .. } => match state {
                SessionState::Connecting => {
                    self.sessions_started_total.inc();
                    self.sessions_active.inc();
                }
                SessionState::Closed => self.sessions_active.dec(),
                SessionState::Failed => {
                    self.sessions_failed_total.inc();
                    self.sessions_active.dec();
                }
                SessionState::Idle | SessionState::Active | SessionState::Interrupted => {}
            },
            EngineEvent::SessionInterrupted { .. } => self.interruptions_total.inc(),
            EngineEvent::Transcript { quelle, .. } => {
                let label = match quelle {
                    TranscriptQuelle::Input => "input",
                    TranscriptQuelle::Output => "output",
                };
                self.transcripts_total.with_label_values(&[label]).inc();
            }
            EngineEvent::OutboundFrameSent { bytes, .. } => {
                self.outbound_frames_total.inc();
                self.outbound_bytes_total.inc_by(*bytes as u64);
            }
            EngineEvent::PlaybackScheduled { dauer, .. } => {
                self.playback_buffers_total.inc();
                self.playback_seconds_total.inc_by(dauer.max(0.0));
            }
            EngineEvent::TaskSubmitted { kind, .. } => {
                let kind = kind.to_string();
                self.tasks_submitted_total
                    .with_label_values(&[kind.as_str()])
                    .inc();
            }
            EngineEvent::TaskFinished { status, .. } => {
                let label = match status {
                    TaskStatus::Processing => "processing",
                    TaskStatus::Completed => "completed",
                    TaskStatus::Failed => "failed",
                };
                self.tasks_finished_total.with_label_values(&[label]).inc();
            }
            EngineEvent::GrantConsumed { capability } => {
                self.grants_consumed_total
                    .with_label_values(&[capability.schluessel()])
                    .inc();
            }
        }
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Abonniert den Event-Bus und schreibt jedes Ereignis in die Metriken
///
/// Endet wenn der Bus geschlossen wird. Verpasste Ereignisse (`Lagged`)
/// werden geloggt und uebersprungen.
pub fn spawn_event_recorder(metriken: EngineMetrics, bus: &dyn EventBus) -> JoinHandle<()> {
    let mut rx = bus.abonnieren();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => metriken.erfassen(&event),
                Err(RecvError::Lagged(verpasst)) => {
                    tracing::warn!(verpasst, "Metriken-Recorder hinkt hinterher");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("Metriken-Recorder beendet");
    })
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: EngineMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<EngineMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
