//! Persistierte Dokument-Typen
//!
//! Feldnamen folgen dem gespeicherten JSON-Format (camelCase, `type` fuer
//! die Art), damit bestehende Dokumente weiter gelesen werden koennen.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use leon_core::{AssetId, TaskId, TaskKind, TaskStatus};

/// Aktuelle Zeit in Millisekunden seit der Unix-Epoche
pub fn jetzt_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Eintrag der Hintergrund-Taskliste
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundTask {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub prompt: String,
    /// Startzeit in Millisekunden seit der Unix-Epoche
    pub start_time: i64,
    pub status: TaskStatus,
    /// Verweis auf das erzeugte Asset (nur bei `completed`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_ref: Option<AssetId>,
}

impl BackgroundTask {
    /// Neuer Task im Zustand `processing`
    pub fn neu(kind: TaskKind, prompt: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            kind,
            prompt: prompt.into(),
            start_time: jetzt_ms(),
            status: TaskStatus::Processing,
            result_ref: None,
        }
    }
}

/// Eintrag der Asset-Bibliothek
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: AssetId,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Inhalt als `data:`-URI
    pub url: String,
    pub prompt: String,
    pub timestamp: i64,
    #[serde(default)]
    pub liked: bool,
}

impl LibraryItem {
    pub fn neu(kind: TaskKind, url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: AssetId::new(),
            kind,
            url: url.into(),
            prompt: prompt.into(),
            timestamp: jetzt_ms(),
            liked: false,
        }
    }
}

/// Baut eine `data:`-URI aus MIME-Typ und bereits base64-kodierten Daten
pub fn data_uri(mime_type: &str, base64_daten: &str) -> String {
    format!("data:{mime_type};base64,{base64_daten}")
}

/// Absender einer Chat-Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Leon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: i64,
}

/// Gespeicherte Unterhaltung im Verlauf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub timestamp: i64,
}

/// Verknuepftes Social-Media-Konto
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialAccount {
    pub platform: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub username: String,
    /// Letzte Synchronisation in Millisekunden (0 = nie)
    #[serde(default)]
    pub last_sync: i64,
}

impl SocialAccount {
    fn getrennt(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            connected: false,
            username: String::new(),
            last_sync: 0,
        }
    }

    /// Vorbelegung wenn fuer den Benutzer noch nichts gespeichert ist
    pub fn standard_konten() -> Vec<Self> {
        ["Instagram", "Facebook", "WhatsApp", "X"]
            .into_iter()
            .map(Self::getrennt)
            .collect()
    }
}

/// Einstellungen fuer automatische Antworten
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoReplyConfig {
    pub enabled: bool,
    pub delay_minutes: u32,
    pub message: String,
}

impl Default for AutoReplyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_minutes: 30,
            message: "I am busy right now, I will reply to you as soon as I am free.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_json_format() {
        let task = BackgroundTask::neu(TaskKind::Video, "Ein Sonnenuntergang");
        let wert = serde_json::to_value(&task).unwrap();
        assert_eq!(wert["type"], json!("video"));
        assert_eq!(wert["status"], json!("processing"));
        assert!(wert.get("startTime").is_some());
        assert!(wert.get("resultRef").is_none());
    }

    #[test]
    fn bibliothek_eintrag_standardmaessig_nicht_gemocht() {
        let wert = json!({
            "id": AssetId::new(),
            "type": "image",
            "url": "data:image/png;base64,AAAA",
            "prompt": "Katze",
            "timestamp": 1
        });
        let item: LibraryItem = serde_json::from_value(wert).unwrap();
        assert!(!item.liked);
        assert_eq!(item.kind, TaskKind::Image);
    }

    #[test]
    fn chat_rolle_wie_gespeichert() {
        assert_eq!(serde_json::to_value(ChatRole::Leon).unwrap(), json!("Leon"));
    }

    #[test]
    fn social_standard_konten() {
        let konten = SocialAccount::standard_konten();
        assert_eq!(konten.len(), 4);
        assert!(konten.iter().all(|k| !k.connected));
    }

    #[test]
    fn data_uri_format() {
        assert_eq!(data_uri("video/mp4", "QUJD"), "data:video/mp4;base64,QUJD");
    }
}
