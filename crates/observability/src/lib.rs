//! # leon-observability
//!
//! Observability-Crate fuer Leon:
//! - Prometheus-kompatible Metriken (`/metrics`), gespeist vom Event-Bus
//! - Health-Check-Endpunkt (`/health`)
//! - Structured Logging via tracing-subscriber
//! - Request-Timing Middleware

pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;

pub use health::{health_router, HealthResponse, HealthState, HealthStatus};
pub use logging::logging_initialisieren;
pub use metrics::{metrics_router, spawn_event_recorder, EngineMetrics};
pub use middleware::timing_middleware;

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;

/// Router mit `/metrics` und `/health` samt Timing- und Trace-Layer
pub fn observability_router(metriken: EngineMetrics, health: HealthState) -> Router {
    Router::new()
        .merge(metrics_router(metriken.clone()))
        .merge(health_router(health))
        .layer(axum::middleware::from_fn_with_state(
            metriken,
            timing_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Startet den Observability-HTTP-Server und laeuft bis zum Abbruch
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    metriken: EngineMetrics,
    health: HealthState,
) -> Result<()> {
    let app = observability_router(metriken, health);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}
