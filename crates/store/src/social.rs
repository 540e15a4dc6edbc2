//! Benutzerbezogene Social-Hub-Dokumente (Konten, Auto-Reply)

use std::sync::Arc;

use leon_core::permissions::erfordern;
use leon_core::{Capability, PermissionGate, UserId};

use crate::documents::{jetzt_ms, AutoReplyConfig, SocialAccount};
use crate::error::{StoreError, StoreResult};
use crate::keys::{Dokument, DocumentKey};
use crate::store::{lesen, schreiben, KeyValueStore};

pub struct SocialHub {
    store: Arc<dyn KeyValueStore>,
    konten_key: DocumentKey,
    auto_reply_key: DocumentKey,
}

impl SocialHub {
    pub fn fuer_benutzer(store: Arc<dyn KeyValueStore>, user_id: UserId) -> Self {
        Self {
            store,
            konten_key: DocumentKey::benutzer(Dokument::SocialAccounts, user_id),
            auto_reply_key: DocumentKey::benutzer(Dokument::AutoReply, user_id),
        }
    }

    /// Konten des Benutzers (Vorbelegung wenn nichts gespeichert ist)
    pub async fn konten(&self) -> StoreResult<Vec<SocialAccount>> {
        Ok(lesen(self.store.as_ref(), &self.konten_key)
            .await?
            .unwrap_or_else(SocialAccount::standard_konten))
    }

    /// Verbindung einer Plattform umschalten
    ///
    /// Erfordert `appAccess`. Bei Erfolg wird eine Einmal-Freigabe verbraucht.
    pub async fn verbindung_umschalten(
        &self,
        gate: &dyn PermissionGate,
        platform: &str,
    ) -> leon_core::Result<SocialAccount> {
        let status = erfordern(gate, Capability::AppAccess).await?;

        let mut konten = self.konten().await?;
        let konto = konten
            .iter_mut()
            .find(|k| k.platform == platform)
            .ok_or_else(|| StoreError::NichtGefunden(platform.to_string()))?;
        konto.connected = !konto.connected;
        konto.last_sync = jetzt_ms();
        let geaendert = konto.clone();
        schreiben(self.store.as_ref(), &self.konten_key, &konten).await?;

        if status.ist_einmalig() {
            gate.grant_consumed(Capability::AppAccess).await?;
        }
        Ok(geaendert)
    }

    pub async fn auto_reply(&self) -> StoreResult<AutoReplyConfig> {
        Ok(lesen(self.store.as_ref(), &self.auto_reply_key)
            .await?
            .unwrap_or_default())
    }

    pub async fn auto_reply_speichern(&self, config: &AutoReplyConfig) -> StoreResult<()> {
        schreiben(self.store.as_ref(), &self.auto_reply_key, config).await
    }
}
