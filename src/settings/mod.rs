//! Durable settings and autostart registration
//!
//! All persisted state goes through `SettingsStore`, which loads once at
//! startup and writes through on every change. Storage failures never take
//! the agent down; the in-memory value stays authoritative.

mod autostart;
mod store;

pub use autostart::{plan_migration, quoted_command, AutostartRegistry, MigrationAction};
pub use store::{keys, SettingsBackend, SettingsStore};

/// Test doubles for settings and autostart
#[cfg(test)]
pub mod testing {
    pub use super::autostart::testing::FakeAutostart;
    pub use super::store::testing::{FailingBackend, MemoryBackend};
}

/// Errors reading or writing persisted settings
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read `{name}`: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{name}`: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open `{path}`: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine executable path: {0}")]
    ExecutablePath(#[source] std::io::Error),
}
