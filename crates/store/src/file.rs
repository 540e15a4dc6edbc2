//! Datei-basiertes Backend
//!
//! Speichert jedes Dokument als `base_dir/<schluessel>.json`. Schreibvorgaenge
//! gehen ueber eine temporaere Datei und `rename`, sodass Leser nie ein
//! halb geschriebenes Dokument sehen.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{an_liste_haengen, KeyValueStore};

/// JSON-Dateien in einem Verzeichnis
#[derive(Debug)]
pub struct JsonFileStore {
    base_dir: PathBuf,
    /// Serialisiert `append_to_list`-Zyklen dieses Prozesses
    append_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Neuen Store mit dem angegebenen Basisverzeichnis erstellen
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            append_lock: Mutex::new(()),
        }
    }

    /// Basisverzeichnis
    pub fn base_dir(&self) -> &std::path::Path {
        &self.base_dir
    }

    fn pfad(&self, key: &str) -> StoreResult<PathBuf> {
        let gueltig = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !gueltig {
            return Err(StoreError::UngueltigerSchluessel(key.to_string()));
        }
        Ok(self.base_dir.join(format!("{key}.json")))
    }

    async fn lesen(&self, key: &str) -> StoreResult<Option<Value>> {
        let pfad = self.pfad(key)?;
        match tokio::fs::read(&pfad).await {
            Ok(inhalt) => Ok(Some(serde_json::from_slice(&inhalt)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn schreiben(&self, key: &str, value: &Value) -> StoreResult<()> {
        let pfad = self.pfad(key)?;
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let tmp = pfad.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(value)?).await?;
        tokio::fs::rename(&tmp, &pfad).await?;
        tracing::debug!(pfad = %pfad.display(), "Dokument gespeichert");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        self.lesen(key).await
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.schreiben(key, &value).await
    }

    async fn append_to_list(&self, key: &str, item: Value) -> StoreResult<()> {
        let _guard = self.append_lock.lock().await;
        let vorhanden = self.lesen(key).await?;
        let neu = an_liste_haengen(vorhanden, item)
            .map_err(|_| StoreError::KeineListe(key.to_string()))?;
        self.schreiben(key, &neu).await
    }
}
