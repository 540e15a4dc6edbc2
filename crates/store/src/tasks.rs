//! Zugriff auf die persistierte Hintergrund-Taskliste
//!
//! Die Liste ist das einzige Kommunikationsmittel zwischen Orchestrator und
//! Beobachtern. Schreibzugriffe einer `TaskListe`-Instanz (und ihrer Klone)
//! werden ueber eine gemeinsame Sperre serialisiert.

use std::sync::Arc;

use tokio::sync::Mutex;

use leon_core::{AssetId, TaskId, TaskStatus, UserId};

use crate::documents::BackgroundTask;
use crate::error::{StoreError, StoreResult};
use crate::keys::{Dokument, DocumentKey};
use crate::store::{anhaengen, liste_lesen, schreiben, KeyValueStore};

#[derive(Clone)]
pub struct TaskListe {
    store: Arc<dyn KeyValueStore>,
    key: DocumentKey,
    schreib_sperre: Arc<Mutex<()>>,
}

impl TaskListe {
    /// Globale Taskliste (`leon_bg_tasks_global`)
    pub fn global(store: Arc<dyn KeyValueStore>) -> Self {
        Self::mit_schluessel(store, DocumentKey::global(Dokument::BackgroundTasks))
    }

    /// Taskliste eines Benutzers
    pub fn fuer_benutzer(store: Arc<dyn KeyValueStore>, user_id: UserId) -> Self {
        Self::mit_schluessel(store, DocumentKey::benutzer(Dokument::BackgroundTasks, user_id))
    }

    fn mit_schluessel(store: Arc<dyn KeyValueStore>, key: DocumentKey) -> Self {
        Self {
            store,
            key,
            schreib_sperre: Arc::new(Mutex::new(())),
        }
    }

    pub fn schluessel(&self) -> DocumentKey {
        self.key
    }

    /// Alle Tasks in Einfuegereihenfolge
    pub async fn alle(&self) -> StoreResult<Vec<BackgroundTask>> {
        liste_lesen(self.store.as_ref(), &self.key).await
    }

    /// Einzelnen Task laden
    pub async fn laden(&self, id: TaskId) -> StoreResult<Option<BackgroundTask>> {
        Ok(self.alle().await?.into_iter().find(|t| t.id == id))
    }

    /// Neuen Task anhaengen
    pub async fn anhaengen(&self, task: &BackgroundTask) -> StoreResult<()> {
        let _guard = self.schreib_sperre.lock().await;
        anhaengen(self.store.as_ref(), &self.key, task).await?;
        tracing::debug!(task_id = %task.id, kind = %task.kind, "Task angelegt");
        Ok(())
    }

    /// Status eines Tasks setzen
    ///
    /// Nur `processing -> completed|failed` ist zulaessig. Der aktualisierte
    /// Datensatz wird zurueckgegeben.
    pub async fn status_setzen(
        &self,
        id: TaskId,
        status: TaskStatus,
        result_ref: Option<AssetId>,
    ) -> StoreResult<BackgroundTask> {
        let _guard = self.schreib_sperre.lock().await;
        let mut tasks = self.alle().await?;

        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::NichtGefunden(id.to_string()))?;

        if !task.status.uebergang_erlaubt(status) {
            return Err(StoreError::UngueltigerUebergang {
                von: task.status,
                nach: status,
            });
        }
        task.status = status;
        task.result_ref = result_ref;
        let aktualisiert = task.clone();

        schreiben(self.store.as_ref(), &self.key, &tasks).await?;
        tracing::debug!(task_id = %id, status = ?status, "Task-Status aktualisiert");
        Ok(aktualisiert)
    }

    /// Task aus der Liste entfernen. Gibt `false` zurueck wenn die ID fehlt.
    pub async fn entfernen(&self, id: TaskId) -> StoreResult<bool> {
        let _guard = self.schreib_sperre.lock().await;
        let mut tasks = self.alle().await?;
        let vorher = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == vorher {
            return Ok(false);
        }
        schreiben(self.store.as_ref(), &self.key, &tasks).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use leon_core::TaskKind;

    fn liste() -> TaskListe {
        TaskListe::global(Arc::new(MemoryStore::neu()))
    }

    #[tokio::test]
    async fn leere_liste_ohne_dokument() {
        assert!(liste().alle().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_wechsel_processing_nach_completed() {
        let liste = liste();
        let task = BackgroundTask::neu(TaskKind::Image, "Berg");
        liste.anhaengen(&task).await.unwrap();

        let asset = AssetId::new();
        let neu = liste
            .status_setzen(task.id, TaskStatus::Completed, Some(asset))
            .await
            .unwrap();
        assert_eq!(neu.status, TaskStatus::Completed);
        assert_eq!(neu.result_ref, Some(asset));
        assert_eq!(liste.laden(task.id).await.unwrap(), Some(neu));
    }

    #[tokio::test]
    async fn terminaler_status_ist_endgueltig() {
        let liste = liste();
        let task = BackgroundTask::neu(TaskKind::Video, "Meer");
        liste.anhaengen(&task).await.unwrap();
        liste
            .status_setzen(task.id, TaskStatus::Failed, None)
            .await
            .unwrap();

        let result = liste
            .status_setzen(task.id, TaskStatus::Completed, None)
            .await;
        assert!(matches!(result, Err(StoreError::UngueltigerUebergang { .. })));
    }

    #[tokio::test]
    async fn unbekannte_id() {
        let result = liste()
            .status_setzen(TaskId::new(), TaskStatus::Completed, None)
            .await;
        assert!(matches!(result, Err(StoreError::NichtGefunden(_))));
    }

    #[tokio::test]
    async fn entfernen_loescht_nur_den_task() {
        let liste = liste();
        let a = BackgroundTask::neu(TaskKind::Image, "a");
        let b = BackgroundTask::neu(TaskKind::Image, "b");
        liste.anhaengen(&a).await.unwrap();
        liste.anhaengen(&b).await.unwrap();

        assert!(liste.entfernen(a.id).await.unwrap());
        assert!(!liste.entfernen(a.id).await.unwrap());
        let rest = liste.alle().await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, b.id);
    }
}
