//! Request-Timing Middleware fuer den Observability-Server
//!
//! Misst die Antwortzeit jeder Anfrage, loggt sie strukturiert und
//! beobachtet sie im Histogramm `leon_http_request_duration_seconds`.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    middleware::Next,
};

use crate::metrics::EngineMetrics;

/// Verwendung:
/// ```ignore
/// Router::new()
///     .route("/health", get(handler))
///     .layer(axum::middleware::from_fn_with_state(metriken, timing_middleware))
/// ```
pub async fn timing_middleware(
    State(metriken): State<EngineMetrics>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let methode = req.method().to_string();
    let pfad = pfad_label(req.uri().path());
    let start = Instant::now();

    let response = next.run(req).await;

    let dauer = start.elapsed();
    let status = response.status().as_u16().to_string();
    metriken
        .http_request_duration_seconds
        .with_label_values(&[methode.as_str(), pfad, status.as_str()])
        .observe(dauer.as_secs_f64());

    tracing::debug!(
        method = %methode,
        path = pfad,
        status = %status,
        duration_ms = dauer.as_millis() as u64,
        "HTTP-Anfrage abgeschlossen"
    );

    response
}

/// Unbekannte Pfade werden zusammengefasst, damit die Label-Menge begrenzt bleibt
pub fn pfad_label(pfad: &str) -> &'static str {
    match pfad {
        "/metrics" => "/metrics",
        "/health" => "/health",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bekannte_pfade() {
        assert_eq!(pfad_label("/metrics"), "/metrics");
        assert_eq!(pfad_label("/health"), "/health");
    }

    #[test]
    fn unbekannte_pfade_zusammengefasst() {
        assert_eq!(pfad_label("/"), "other");
        assert_eq!(pfad_label("/health/deep"), "other");
        assert_eq!(pfad_label("/wp-admin"), "other");
    }
}
