//! Engine-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, die Engine laeuft auch ohne Konfigurationsdatei.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use leon_audio::{CaptureConfig, PlaybackConfig};
use leon_live::{LiveConfig, STANDARD_MODELL, SYSTEM_ANWEISUNG};
use leon_tasks::{OrchestratorConfig, VideoConfig, STANDARD_BILDMODELL, STANDARD_VIDEOMODELL};

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei
pub const ENV_CONFIG: &str = "LEON_CONFIG";
pub const STANDARD_CONFIG_PFAD: &str = "leon.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub live: LiveEinstellungen,
    pub tasks: TaskEinstellungen,
    pub store: StoreEinstellungen,
    pub logging: LoggingEinstellungen,
    pub observability: ObservabilityEinstellungen,
}

/// Live-Session und Audio-Geraete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveEinstellungen {
    pub model: String,
    pub system_instruction: String,
    pub input_transcription: bool,
    pub output_transcription: bool,
    /// Samples pro ausgehendem Audio-Fenster
    pub window_size: usize,
    /// Bevorzugte Rate des Mikrofons. Der Uplink bleibt bei 16 kHz,
    /// abweichende Geraeteraten werden umgetastet.
    pub input_device_rate: Option<u32>,
    /// Bevorzugte Rate des Lautsprechers. Modell-Audio kommt immer mit 24 kHz.
    pub output_device_rate: Option<u32>,
    /// Eingabegeraet (leer = Standardgeraet)
    pub input_device: Option<String>,
    pub output_device: Option<String>,
}

impl Default for LiveEinstellungen {
    fn default() -> Self {
        Self {
            model: STANDARD_MODELL.into(),
            system_instruction: SYSTEM_ANWEISUNG.into(),
            input_transcription: true,
            output_transcription: true,
            window_size: 4096,
            input_device_rate: None,
            output_device_rate: None,
            input_device: None,
            output_device: None,
        }
    }
}

/// Hintergrund-Generierung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEinstellungen {
    pub poll_interval_secs: u64,
    pub watcher_interval_secs: u64,
    pub image_model: String,
    pub video_model: String,
    pub video_resolution: String,
    pub video_aspect_ratio: String,
}

impl Default for TaskEinstellungen {
    fn default() -> Self {
        let video = VideoConfig::default();
        Self {
            poll_interval_secs: 10,
            watcher_interval_secs: 2,
            image_model: STANDARD_BILDMODELL.into(),
            video_model: STANDARD_VIDEOMODELL.into(),
            video_resolution: video.resolution,
            video_aspect_ratio: video.aspect_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreEinstellungen {
    pub backend: StoreBackend,
    /// Verzeichnis fuer den JSON-Backend
    pub verzeichnis: PathBuf,
}

impl Default for StoreEinstellungen {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            verzeichnis: PathBuf::from("leon-data"),
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen (Metriken + Health)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    pub aktiviert: bool,
    pub bind_adresse: String,
    pub port: u16,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            aktiviert: true,
            bind_adresse: "127.0.0.1".into(),
            port: 9300,
        }
    }
}

impl EngineConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `LEON_CONFIG`, sonst `leon.toml`
    pub fn pfad_aus_env() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_CONFIG_PFAD.into())
    }

    pub fn live_config(&self) -> LiveConfig {
        let live = &self.live;
        LiveConfig {
            model: live.model.clone(),
            system_instruction: live.system_instruction.clone(),
            input_transcription: live.input_transcription,
            output_transcription: live.output_transcription,
            capture: CaptureConfig {
                geraete_rate: live.input_device_rate,
                window_size: live.window_size,
                device_name: live.input_device.clone(),
                ..CaptureConfig::default()
            },
            playback: PlaybackConfig {
                geraete_rate: live.output_device_rate,
                device_name: live.output_device.clone(),
            },
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let tasks = &self.tasks;
        OrchestratorConfig {
            image_model: tasks.image_model.clone(),
            video_model: tasks.video_model.clone(),
            video: VideoConfig {
                resolution: tasks.video_resolution.clone(),
                aspect_ratio: tasks.video_aspect_ratio.clone(),
                ..VideoConfig::default()
            },
            poll_interval_secs: tasks.poll_interval_secs,
            ..OrchestratorConfig::default()
        }
    }

    pub fn watcher_intervall(&self) -> Duration {
        Duration::from_secs(self.tasks.watcher_interval_secs.max(1))
    }

    /// Bind-Adresse des Observability-Servers
    pub fn observability_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!(
            "{}:{}",
            self.observability.bind_adresse, self.observability.port
        );
        adresse
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Observability-Adresse '{adresse}': {e}"))
    }
}
