//! Schnittstelle zum Generierungsdienst
//!
//! Bild: eine Anfrage, Antwort sind Inline-Daten. Video: Operation starten,
//! Handle abfragen bis `done`, danach das Ergebnis ueber `fetch` laden.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::TaskResult;

pub const STANDARD_BILDMODELL: &str = "gemini-2.5-flash-image";
pub const STANDARD_VIDEOMODELL: &str = "veo-3.1-fast-generate-preview";

/// Base64-Inhalt mit MIME-Typ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub aspect_ratio: String,
}

/// Parameter der Video-Erzeugung
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoConfig {
    pub resolution: String,
    pub aspect_ratio: String,
    pub number_of_videos: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            resolution: "720p".to_string(),
            aspect_ratio: "16:9".to_string(),
            number_of_videos: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub model: String,
    pub prompt: String,
    pub config: VideoConfig,
}

/// Handle einer laufenden Video-Operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle(pub String);

/// Ergebnis einer Abfrage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub done: bool,
    pub result_uri: Option<String>,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync + 'static {
    /// `None` wenn die Antwort keine Bilddaten enthaelt
    async fn generate_image(&self, request: &ImageRequest) -> TaskResult<Option<InlineData>>;

    async fn submit_video(&self, request: &VideoRequest) -> TaskResult<OperationHandle>;

    async fn poll_video(&self, handle: &OperationHandle) -> TaskResult<OperationStatus>;

    /// Ergebnis einer abgeschlossenen Operation laden
    async fn fetch(&self, uri: &str) -> TaskResult<Bytes>;
}
