//! Asset-Bibliothek (erzeugte Bilder und Videos)

use std::sync::Arc;

use tokio::sync::Mutex;

use leon_core::{AssetId, TaskKind, UserId};

use crate::documents::LibraryItem;
use crate::error::{StoreError, StoreResult};
use crate::keys::{Dokument, DocumentKey};
use crate::store::{anhaengen, liste_lesen, schreiben, KeyValueStore};

/// Filter fuer die Bibliotheksansicht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BibliothekFilter {
    #[default]
    Alle,
    Bilder,
    Videos,
    Gemocht,
}

impl BibliothekFilter {
    fn passt(&self, item: &LibraryItem) -> bool {
        match self {
            Self::Alle => true,
            Self::Bilder => item.kind == TaskKind::Image,
            Self::Videos => item.kind == TaskKind::Video,
            Self::Gemocht => item.liked,
        }
    }
}

#[derive(Clone)]
pub struct Bibliothek {
    store: Arc<dyn KeyValueStore>,
    key: DocumentKey,
    schreib_sperre: Arc<Mutex<()>>,
}

impl Bibliothek {
    pub fn global(store: Arc<dyn KeyValueStore>) -> Self {
        Self::mit_schluessel(store, DocumentKey::global(Dokument::Library))
    }

    pub fn fuer_benutzer(store: Arc<dyn KeyValueStore>, user_id: UserId) -> Self {
        Self::mit_schluessel(store, DocumentKey::benutzer(Dokument::Library, user_id))
    }

    fn mit_schluessel(store: Arc<dyn KeyValueStore>, key: DocumentKey) -> Self {
        Self {
            store,
            key,
            schreib_sperre: Arc::new(Mutex::new(())),
        }
    }

    /// Eintrag anhaengen
    pub async fn hinzufuegen(&self, item: &LibraryItem) -> StoreResult<()> {
        let _guard = self.schreib_sperre.lock().await;
        anhaengen(self.store.as_ref(), &self.key, item).await
    }

    /// Alle Eintraege in Einfuegereihenfolge
    pub async fn alle(&self) -> StoreResult<Vec<LibraryItem>> {
        liste_lesen(self.store.as_ref(), &self.key).await
    }

    /// Eintraege in Anzeigereihenfolge (neueste zuerst), gefiltert
    pub async fn neueste_zuerst(&self, filter: BibliothekFilter) -> StoreResult<Vec<LibraryItem>> {
        let mut items: Vec<_> = self
            .alle()
            .await?
            .into_iter()
            .filter(|item| filter.passt(item))
            .collect();
        items.reverse();
        Ok(items)
    }

    pub async fn like_setzen(&self, id: AssetId, liked: bool) -> StoreResult<LibraryItem> {
        self.aendern(id, |item| item.liked = liked).await
    }

    pub async fn like_umschalten(&self, id: AssetId) -> StoreResult<LibraryItem> {
        self.aendern(id, |item| item.liked = !item.liked).await
    }

    /// Eintrag loeschen. Gibt `false` zurueck wenn die ID fehlt.
    pub async fn loeschen(&self, id: AssetId) -> StoreResult<bool> {
        let _guard = self.schreib_sperre.lock().await;
        let mut items = self.alle().await?;
        let vorher = items.len();
        items.retain(|item| item.id != id);
        if items.len() == vorher {
            return Ok(false);
        }
        schreiben(self.store.as_ref(), &self.key, &items).await?;
        Ok(true)
    }

    async fn aendern<F>(&self, id: AssetId, f: F) -> StoreResult<LibraryItem>
    where
        F: FnOnce(&mut LibraryItem),
    {
        let _guard = self.schreib_sperre.lock().await;
        let mut items = self.alle().await?;
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| StoreError::NichtGefunden(id.to_string()))?;
        f(item);
        let geaendert = item.clone();
        schreiben(self.store.as_ref(), &self.key, &items).await?;
        Ok(geaendert)
    }
}
