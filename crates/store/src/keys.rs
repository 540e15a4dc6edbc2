//! Schluessel-Konstruktion fuer persistierte Dokumente
//!
//! Namensraeume sind reine Schluessel-Sache: `leon_<dokument>_global` fuer
//! geteilte Dokumente, `leon_<dokument>_<user-uuid>` fuer benutzerbezogene.

use leon_core::UserId;

/// Logische Dokumente der Anwendung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dokument {
    Permissions,
    Library,
    History,
    BackgroundTasks,
    SocialAccounts,
    AutoReply,
}

impl Dokument {
    fn name(&self) -> &'static str {
        match self {
            Self::Permissions => "permissions",
            Self::Library => "library",
            Self::History => "history",
            Self::BackgroundTasks => "bg_tasks",
            Self::SocialAccounts => "social_accounts",
            Self::AutoReply => "auto_reply",
        }
    }
}

/// Namensraum eines Dokuments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Global,
    Benutzer(UserId),
}

/// Vollstaendiger Schluessel eines Dokuments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub dokument: Dokument,
    pub namespace: Namespace,
}

impl DocumentKey {
    /// Schluessel im globalen Namensraum
    pub fn global(dokument: Dokument) -> Self {
        Self {
            dokument,
            namespace: Namespace::Global,
        }
    }

    /// Schluessel im Namensraum eines Benutzers
    pub fn benutzer(dokument: Dokument, user_id: UserId) -> Self {
        Self {
            dokument,
            namespace: Namespace::Benutzer(user_id),
        }
    }
}

impl std::fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.namespace {
            Namespace::Global => write!(f, "leon_{}_global", self.dokument.name()),
            Namespace::Benutzer(id) => write!(f, "leon_{}_{}", self.dokument.name(), id.inner()),
        }
    }
}
