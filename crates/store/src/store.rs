//! Key-Value-Schnittstelle fuer persistierte Dokumente
//!
//! Das `KeyValueStore`-Trait abstrahiert die konkrete Speichertechnik.
//! Werte sind JSON-Dokumente. Es gibt keine Transaktionen: Lese-Aendere-
//! Schreibe-Zyklen mehrerer Akteure auf denselben Schluessel folgen
//! "last writer wins".

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::StoreResult;
use crate::keys::DocumentKey;

/// Abstrakter Dokumentenspeicher
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Dokument laden (`None` wenn der Schluessel nicht existiert)
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Dokument setzen (ersetzt einen vorhandenen Wert)
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Element an eine Liste anhaengen. Fehlt der Schluessel, wird eine
    /// neue Liste angelegt. Ist der Wert keine Liste: `StoreError::KeineListe`.
    async fn append_to_list(&self, key: &str, item: Value) -> StoreResult<()>;
}

/// Haengt `item` an eine vorhandene Liste an (gemeinsame Logik der Backends)
///
/// Ist der Wert keine Liste, kommt er unveraendert als `Err` zurueck.
pub(crate) fn an_liste_haengen(vorhanden: Option<Value>, item: Value) -> Result<Value, Value> {
    match vorhanden {
        None | Some(Value::Null) => Ok(Value::Array(vec![item])),
        Some(Value::Array(mut liste)) => {
            liste.push(item);
            Ok(Value::Array(liste))
        }
        Some(andere) => Err(andere),
    }
}

/// Typisiertes Dokument laden
pub async fn lesen<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &DocumentKey,
) -> StoreResult<Option<T>> {
    match store.get(&key.to_string()).await? {
        None | Some(Value::Null) => Ok(None),
        Some(wert) => Ok(Some(serde_json::from_value(wert)?)),
    }
}

/// Typisiertes Dokument schreiben
pub async fn schreiben<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &DocumentKey,
    wert: &T,
) -> StoreResult<()> {
    store.set(&key.to_string(), serde_json::to_value(wert)?).await
}

/// Typisierte Liste laden (fehlendes Dokument = leere Liste)
pub async fn liste_lesen<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &DocumentKey,
) -> StoreResult<Vec<T>> {
    Ok(lesen::<Vec<T>>(store, key).await?.unwrap_or_default())
}

/// Typisiertes Element an eine Liste anhaengen
pub async fn anhaengen<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &DocumentKey,
    item: &T,
) -> StoreResult<()> {
    store
        .append_to_list(&key.to_string(), serde_json::to_value(item)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn anhaengen_an_fehlende_liste() {
        let neu = an_liste_haengen(None, json!(1)).unwrap();
        assert_eq!(neu, json!([1]));
    }

    #[test]
    fn anhaengen_an_vorhandene_liste() {
        let neu = an_liste_haengen(Some(json!([1, 2])), json!(3)).unwrap();
        assert_eq!(neu, json!([1, 2, 3]));
    }

    #[test]
    fn anhaengen_an_objekt_gibt_wert_zurueck() {
        let result = an_liste_haengen(Some(json!({"a": 1})), json!(3));
        assert_eq!(result, Err(json!({"a": 1})));
    }
}
