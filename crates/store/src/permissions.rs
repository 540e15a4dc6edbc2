//! Permission-Gate ueber dem persistierten `permissions`-Dokument
//!
//! Fehlendes Dokument oder fehlende Faehigkeit gelten als `off`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use leon_core::{Capability, PermissionGate, PermissionStatus, PermissionsState};

use crate::error::StoreResult;
use crate::keys::{Dokument, DocumentKey};
use crate::store::{lesen, schreiben, KeyValueStore};

#[derive(Clone)]
pub struct StorePermissionGate {
    store: Arc<dyn KeyValueStore>,
    key: DocumentKey,
    schreib_sperre: Arc<Mutex<()>>,
}

impl StorePermissionGate {
    /// Gate ueber `leon_permissions_global`
    pub fn global(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: DocumentKey::global(Dokument::Permissions),
            schreib_sperre: Arc::new(Mutex::new(())),
        }
    }

    /// Aktuellen Berechtigungszustand laden
    pub async fn laden(&self) -> StoreResult<PermissionsState> {
        Ok(lesen(self.store.as_ref(), &self.key)
            .await?
            .unwrap_or_default())
    }

    /// Status einer Faehigkeit setzen (Einstellungs-Ansicht)
    pub async fn aktualisieren(
        &self,
        capability: Capability,
        status: PermissionStatus,
    ) -> StoreResult<PermissionsState> {
        let _guard = self.schreib_sperre.lock().await;
        let mut state = self.laden().await?;
        state.setzen(capability, status);
        schreiben(self.store.as_ref(), &self.key, &state).await?;
        tracing::info!(capability = %capability, status = ?status, "Berechtigung geaendert");
        Ok(state)
    }

    /// Setzt beim Start alle `temporary`-Freigaben auf `off` zurueck
    ///
    /// Gibt die zurueckgesetzten Faehigkeiten zurueck.
    pub async fn beim_start_bereinigen(&self) -> StoreResult<Vec<Capability>> {
        let _guard = self.schreib_sperre.lock().await;
        let mut state = self.laden().await?;
        let zurueckgesetzt = state.temporaere_zuruecksetzen();
        if !zurueckgesetzt.is_empty() {
            schreiben(self.store.as_ref(), &self.key, &state).await?;
            tracing::info!(anzahl = zurueckgesetzt.len(), "Temporaere Freigaben zurueckgesetzt");
        }
        Ok(zurueckgesetzt)
    }
}

#[async_trait]
impl PermissionGate for StorePermissionGate {
    async fn status(&self, capability: Capability) -> leon_core::Result<PermissionStatus> {
        Ok(self.laden().await?.status(capability))
    }

    async fn grant_consumed(&self, capability: Capability) -> leon_core::Result<()> {
        let _guard = self.schreib_sperre.lock().await;
        let mut state = self.laden().await?;
        if state.status(capability) == PermissionStatus::Temporary {
            state.setzen(capability, PermissionStatus::Off);
            schreiben(self.store.as_ref(), &self.key, &state).await?;
            tracing::debug!(capability = %capability, "Einmal-Freigabe verbraucht");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn gate() -> StorePermissionGate {
        StorePermissionGate::global(Arc::new(MemoryStore::neu()))
    }

    #[tokio::test]
    async fn ohne_dokument_alles_aus() {
        let gate = gate();
        for cap in Capability::ALLE {
            assert_eq!(gate.status(cap).await.unwrap(), PermissionStatus::Off);
        }
    }

    #[tokio::test]
    async fn verbrauch_nur_bei_temporary() {
        let gate = gate();
        gate.aktualisieren(Capability::Microphone, PermissionStatus::Temporary)
            .await
            .unwrap();
        gate.aktualisieren(Capability::Camera, PermissionStatus::Permanent)
            .await
            .unwrap();

        gate.grant_consumed(Capability::Microphone).await.unwrap();
        gate.grant_consumed(Capability::Camera).await.unwrap();

        assert_eq!(
            gate.status(Capability::Microphone).await.unwrap(),
            PermissionStatus::Off
        );
        assert_eq!(
            gate.status(Capability::Camera).await.unwrap(),
            PermissionStatus::Permanent
        );
    }

    #[tokio::test]
    async fn start_bereinigung() {
        let gate = gate();
        gate.aktualisieren(Capability::ImageGen, PermissionStatus::Temporary)
            .await
            .unwrap();
        gate.aktualisieren(Capability::VideoGen, PermissionStatus::Permanent)
            .await
            .unwrap();

        let zurueck = gate.beim_start_bereinigen().await.unwrap();
        assert_eq!(zurueck, vec![Capability::ImageGen]);
        let state = gate.laden().await.unwrap();
        assert_eq!(state.image_gen, PermissionStatus::Off);
        assert_eq!(state.video_gen, PermissionStatus::Permanent);
    }
}
