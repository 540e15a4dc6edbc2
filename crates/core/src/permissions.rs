//! Berechtigungsmodell und Permission-Gate-Schnittstelle
//!
//! Jede Faehigkeit (Mikrofon, Kamera, Bildgenerierung, ...) hat einen der
//! Zustaende `off`, `temporary` oder `permanent`. Eine `temporary`-Freigabe
//! gilt fuer genau eine erfolgreiche Nutzung. Die Engine wertet die Policy
//! nicht selbst aus: sie fragt das Gate und meldet verbrauchte Freigaben
//! explizit ueber [`PermissionGate::grant_consumed`] zurueck.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LeonError, Result};

/// Alle Faehigkeiten, die der Benutzer freigeben kann
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Camera,
    Microphone,
    ImageGen,
    VideoGen,
    FileAccess,
    AppAccess,
    SystemControl,
    InternetAccess,
}

impl Capability {
    /// Alle Faehigkeiten in Anzeigereihenfolge
    pub const ALLE: [Capability; 8] = [
        Capability::Camera,
        Capability::Microphone,
        Capability::ImageGen,
        Capability::VideoGen,
        Capability::FileAccess,
        Capability::AppAccess,
        Capability::SystemControl,
        Capability::InternetAccess,
    ];

    /// Schluessel im persistierten `permissions`-Dokument
    pub fn schluessel(&self) -> &'static str {
        match self {
            Self::Camera => "camera",
            Self::Microphone => "microphone",
            Self::ImageGen => "imageGen",
            Self::VideoGen => "videoGen",
            Self::FileAccess => "fileAccess",
            Self::AppAccess => "appAccess",
            Self::SystemControl => "systemControl",
            Self::InternetAccess => "internetAccess",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.schluessel())
    }
}

/// Freigabe-Zustand einer Faehigkeit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    #[default]
    Off,
    /// Einmalige Freigabe, wird nach erfolgreicher Nutzung auf `Off` gesetzt
    Temporary,
    Permanent,
}

impl PermissionStatus {
    pub fn ist_erlaubt(&self) -> bool {
        !matches!(self, Self::Off)
    }

    pub fn ist_einmalig(&self) -> bool {
        matches!(self, Self::Temporary)
    }
}

/// Vollstaendiger Berechtigungszustand (ein Feld pro Faehigkeit)
///
/// Fehlende Felder im persistierten Dokument gelten als `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PermissionsState {
    pub camera: PermissionStatus,
    pub microphone: PermissionStatus,
    pub image_gen: PermissionStatus,
    pub video_gen: PermissionStatus,
    pub file_access: PermissionStatus,
    pub app_access: PermissionStatus,
    pub system_control: PermissionStatus,
    pub internet_access: PermissionStatus,
}

impl PermissionsState {
    /// Gibt den Zustand einer Faehigkeit zurueck
    pub fn status(&self, capability: Capability) -> PermissionStatus {
        *self.feld(capability)
    }

    /// Setzt den Zustand einer Faehigkeit
    pub fn setzen(&mut self, capability: Capability, status: PermissionStatus) {
        *self.feld_mut(capability) = status;
    }

    /// Setzt alle einmaligen Freigaben auf `off` zurueck.
    ///
    /// Gibt die betroffenen Faehigkeiten zurueck.
    pub fn temporaere_zuruecksetzen(&mut self) -> Vec<Capability> {
        let mut zurueckgesetzt = Vec::new();
        for cap in Capability::ALLE {
            if self.status(cap).ist_einmalig() {
                self.setzen(cap, PermissionStatus::Off);
                zurueckgesetzt.push(cap);
            }
        }
        zurueckgesetzt
    }

    fn feld(&self, capability: Capability) -> &PermissionStatus {
        match capability {
            Capability::Camera => &self.camera,
            Capability::Microphone => &self.microphone,
            Capability::ImageGen => &self.image_gen,
            Capability::VideoGen => &self.video_gen,
            Capability::FileAccess => &self.file_access,
            Capability::AppAccess => &self.app_access,
            Capability::SystemControl => &self.system_control,
            Capability::InternetAccess => &self.internet_access,
        }
    }

    fn feld_mut(&mut self, capability: Capability) -> &mut PermissionStatus {
        match capability {
            Capability::Camera => &mut self.camera,
            Capability::Microphone => &mut self.microphone,
            Capability::ImageGen => &mut self.image_gen,
            Capability::VideoGen => &mut self.video_gen,
            Capability::FileAccess => &mut self.file_access,
            Capability::AppAccess => &mut self.app_access,
            Capability::SystemControl => &mut self.system_control,
            Capability::InternetAccess => &mut self.internet_access,
        }
    }
}

/// Externe Berechtigungs-Policy
///
/// Die Engine liest nur und meldet verbrauchte Einmal-Freigaben. Wie die
/// Policy darauf reagiert (typischerweise `temporary -> off`) entscheidet
/// die Implementierung.
#[async_trait]
pub trait PermissionGate: Send + Sync + 'static {
    /// Aktueller Zustand einer Faehigkeit
    async fn status(&self, capability: Capability) -> Result<PermissionStatus>;

    /// Meldet, dass eine Freigabe fuer `capability` erfolgreich genutzt wurde
    async fn grant_consumed(&self, capability: Capability) -> Result<()>;
}

/// Erfordert eine Faehigkeit – gibt `ZugriffVerweigert` zurueck wenn sie `off` ist
pub async fn erfordern(gate: &dyn PermissionGate, capability: Capability) -> Result<PermissionStatus> {
    let status = gate.status(capability).await?;
    if status.ist_erlaubt() {
        Ok(status)
    } else {
        tracing::debug!(capability = %capability, "Berechtigung deaktiviert");
        Err(LeonError::ZugriffVerweigert(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ist_alles_aus() {
        let state = PermissionsState::default();
        for cap in Capability::ALLE {
            assert_eq!(state.status(cap), PermissionStatus::Off);
        }
    }

    #[test]
    fn json_schluessel_wie_dokument() {
        let mut state = PermissionsState::default();
        state.setzen(Capability::ImageGen, PermissionStatus::Temporary);
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["imageGen"], "temporary");
        assert_eq!(json["microphone"], "off");
    }

    #[test]
    fn fehlende_felder_gelten_als_aus() {
        let state: PermissionsState =
            serde_json::from_str(r#"{"microphone":"permanent"}"#).unwrap();
        assert_eq!(state.status(Capability::Microphone), PermissionStatus::Permanent);
        assert_eq!(state.status(Capability::Camera), PermissionStatus::Off);
    }

    #[test]
    fn temporaere_werden_zurueckgesetzt() {
        let mut state = PermissionsState::default();
        state.setzen(Capability::Camera, PermissionStatus::Temporary);
        state.setzen(Capability::Microphone, PermissionStatus::Permanent);
        let betroffen = state.temporaere_zuruecksetzen();
        assert_eq!(betroffen, vec![Capability::Camera]);
        assert_eq!(state.status(Capability::Camera), PermissionStatus::Off);
        assert_eq!(state.status(Capability::Microphone), PermissionStatus::Permanent);
    }

    #[test]
    fn capability_schluessel_stimmt_mit_serde_ueberein() {
        for cap in Capability::ALLE {
            let json = serde_json::to_string(&cap).unwrap();
            assert_eq!(json, format!("\"{}\"", cap.schluessel()));
        }
    }
}
