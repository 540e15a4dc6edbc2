//! In-Memory-Backend (fuer Tests und fluechtige Sessions)

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::store::{an_liste_haengen, KeyValueStore};

/// Fluechtiger Dokumentenspeicher auf Basis einer `DashMap`
///
/// `append_to_list` haelt die Shard-Sperre ueber den gesamten Zyklus und
/// ist damit innerhalb eines Prozesses atomar.
#[derive(Debug, Default)]
pub struct MemoryStore {
    dokumente: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Anzahl gespeicherter Dokumente
    pub fn len(&self) -> usize {
        self.dokumente.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dokumente.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.dokumente.get(key).map(|eintrag| eintrag.value().clone()))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.dokumente.insert(key.to_string(), value);
        Ok(())
    }

    async fn append_to_list(&self, key: &str, item: Value) -> StoreResult<()> {
        let mut eintrag = self.dokumente.entry(key.to_string()).or_insert(Value::Null);
        let vorhanden = std::mem::take(eintrag.value_mut());
        match an_liste_haengen(Some(vorhanden), item) {
            Ok(neu) => {
                *eintrag.value_mut() = neu;
                Ok(())
            }
            Err(unveraendert) => {
                *eintrag.value_mut() = unveraendert;
                Err(StoreError::KeineListe(key.to_string()))
            }
        }
    }
}
