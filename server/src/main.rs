//! Leon Engine-Host – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet die Engine.

use anyhow::Result;
use leon_observability::logging_initialisieren;
use leon_server::{config::EngineConfig, Engine};

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad = EngineConfig::pfad_aus_env();

    // Standardwerte falls die Datei fehlt
    let config = EngineConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Leon Engine wird initialisiert"
    );

    let engine = Engine::neu(config).await?;
    engine.starten().await?;

    Ok(())
}
