//! Chat-Verlauf

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::documents::{jetzt_ms, ChatMessage, ChatSession};
use crate::error::StoreResult;
use crate::keys::{Dokument, DocumentKey};
use crate::store::{liste_lesen, schreiben, KeyValueStore};

/// Titel fuer Unterhaltungen ohne verwertbare erste Nachricht
pub const STANDARD_TITEL: &str = "Neural Discussion";

const TITEL_LAENGE: usize = 30;

/// Titel aus der ersten Nachricht ableiten (hoechstens 30 Zeichen)
pub fn titel_ableiten(messages: &[ChatMessage]) -> String {
    let titel: String = messages
        .first()
        .map(|m| m.text.chars().take(TITEL_LAENGE).collect())
        .unwrap_or_default();
    if titel.is_empty() {
        STANDARD_TITEL.to_string()
    } else {
        titel
    }
}

#[derive(Clone)]
pub struct Verlauf {
    store: Arc<dyn KeyValueStore>,
    key: DocumentKey,
    schreib_sperre: Arc<Mutex<()>>,
}

impl Verlauf {
    pub fn global(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DocumentKey::global(Dokument::History),
            schreib_sperre: Arc::new(Mutex::new(())),
        }
    }

    /// Unterhaltung speichern
    ///
    /// Eine vorhandene Session wird an ihrer Position ersetzt, eine neue
    /// vorne eingefuegt. Leere Unterhaltungen werden nicht gespeichert.
    pub async fn speichern(
        &self,
        session_id: &str,
        messages: Vec<ChatMessage>,
    ) -> StoreResult<Option<ChatSession>> {
        if messages.is_empty() {
            return Ok(None);
        }

        let session = ChatSession {
            id: session_id.to_string(),
            title: titel_ableiten(&messages),
            messages,
            timestamp: jetzt_ms(),
        };

        let _guard = self.schreib_sperre.lock().await;
        let mut sessions = self.alle().await?;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(vorhanden) => *vorhanden = session.clone(),
            None => sessions.insert(0, session.clone()),
        }
        schreiben(self.store.as_ref(), &self.key, &sessions).await?;
        Ok(Some(session))
    }

    pub async fn alle(&self) -> StoreResult<Vec<ChatSession>> {
        liste_lesen(self.store.as_ref(), &self.key).await
    }

    pub async fn loeschen(&self, session_id: &str) -> StoreResult<bool> {
        let _guard = self.schreib_sperre.lock().await;
        let mut sessions = self.alle().await?;
        let vorher = sessions.len();
        sessions.retain(|s| s.id != session_id);
        if sessions.len() == vorher {
            return Ok(false);
        }
        schreiben(self.store.as_ref(), &self.key, &sessions).await?;
        Ok(true)
    }
}
