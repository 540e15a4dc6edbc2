//! leon-store – Dokumentenspeicher fuer Leon
//!
//! Stellt das `KeyValueStore`-Trait samt zwei Backends (In-Memory und
//! JSON-Dateien) sowie typisierten Zugriff auf die Anwendungsdokumente
//! bereit: Hintergrund-Tasks, Asset-Bibliothek, Chat-Verlauf, Social-Hub
//! und Berechtigungen.

pub mod documents;
pub mod error;
pub mod file;
pub mod history;
pub mod keys;
pub mod library;
pub mod memory;
pub mod permissions;
pub mod social;
pub mod store;
pub mod tasks;

pub use documents::{
    data_uri, AutoReplyConfig, BackgroundTask, ChatMessage, ChatRole, ChatSession, LibraryItem,
    SocialAccount,
};
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use history::Verlauf;
pub use keys::{Dokument, DocumentKey, Namespace};
pub use library::{Bibliothek, BibliothekFilter};
pub use memory::MemoryStore;
pub use permissions::StorePermissionGate;
pub use social::SocialHub;
pub use store::KeyValueStore;
pub use tasks::TaskListe;
