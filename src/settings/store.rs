//! Write-through settings store

use tracing::{debug, warn};

use super::PersistenceError;
use crate::hotkey::VirtualKey;

/// Persisted setting names
pub mod keys {
    pub const NOTIFICATIONS_ENABLED: &str = "NotificationsEnabled";
    pub const FAN_SIM_ENABLED: &str = "FanSimEnabled";
    pub const FAN_HOTKEY_VKEY: &str = "FanHotkeyVKey";
}

/// Durable storage of 32-bit values by name
pub trait SettingsBackend: Send {
    /// `Ok(None)` when the value has never been written
    fn read_dword(&self, name: &str) -> Result<Option<u32>, PersistenceError>;
    fn write_dword(&mut self, name: &str, value: u32) -> Result<(), PersistenceError>;
}

/// In-memory view of the persisted settings, written through on change
pub struct SettingsStore {
    backend: Box<dyn SettingsBackend>,
    notifications_enabled: bool,
    fan_sim_enabled: bool,
    fan_hotkey: Option<VirtualKey>,
}

impl SettingsStore {
    /// Load all settings once; unreadable values fall back to defaults
    pub fn load(backend: Box<dyn SettingsBackend>) -> Self {
        let mut store = Self {
            backend,
            notifications_enabled: true,
            fan_sim_enabled: false,
            fan_hotkey: None,
        };

        store.notifications_enabled = store.get_bool(keys::NOTIFICATIONS_ENABLED, true);
        store.fan_sim_enabled = store.get_bool(keys::FAN_SIM_ENABLED, false);

        let raw = store.get_int(keys::FAN_HOTKEY_VKEY, 0);
        store.fan_hotkey = VirtualKey::new(raw);
        if raw != 0 && store.fan_hotkey.is_none() {
            warn!(raw, "stored fan hotkey is not a valid virtual-key code, treating as unbound");
        }

        debug!(
            notifications = store.notifications_enabled,
            fan = store.fan_sim_enabled,
            hotkey = ?store.fan_hotkey,
            "settings loaded"
        );
        store
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
        self.persist_bool(keys::NOTIFICATIONS_ENABLED, enabled);
    }

    pub fn fan_sim_enabled(&self) -> bool {
        self.fan_sim_enabled
    }

    pub fn set_fan_sim_enabled(&mut self, enabled: bool) {
        self.fan_sim_enabled = enabled;
        self.persist_bool(keys::FAN_SIM_ENABLED, enabled);
    }

    pub fn fan_hotkey(&self) -> Option<VirtualKey> {
        self.fan_hotkey
    }

    pub fn set_fan_hotkey(&mut self, key: Option<VirtualKey>) {
        self.fan_hotkey = key;
        let raw = key.map_or(0, |k| u32::from(k.code()));
        if let Err(e) = self.set_int(keys::FAN_HOTKEY_VKEY, raw) {
            warn!(error = %e, "fan hotkey will not survive a restart");
        }
    }

    /// Read a boolean straight from the backend; only `1` means true
    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        match self.backend.read_dword(name) {
            Ok(Some(value)) => value == 1,
            Ok(None) => default,
            Err(e) => {
                warn!(error = %e, name, default, "using default setting");
                default
            }
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<(), PersistenceError> {
        self.backend.write_dword(name, u32::from(value))
    }

    pub fn get_int(&self, name: &str, default: u32) -> u32 {
        match self.backend.read_dword(name) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                warn!(error = %e, name, default, "using default setting");
                default
            }
        }
    }

    pub fn set_int(&mut self, name: &str, value: u32) -> Result<(), PersistenceError> {
        self.backend.write_dword(name, value)
    }

    fn persist_bool(&mut self, name: &str, value: bool) {
        if let Err(e) = self.set_bool(name, value) {
            warn!(error = %e, name, value, "setting will not survive a restart");
        }
    }
}

/// Test doubles for settings persistence
#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::{PersistenceError, SettingsBackend};

    /// Backend sharing its map with the test so writes can be inspected
    #[derive(Clone, Default)]
    pub struct MemoryBackend {
        pub values: Arc<Mutex<HashMap<String, u32>>>,
    }

    impl MemoryBackend {
        pub fn with(values: &[(&str, u32)]) -> Self {
            let backend = Self::default();
            {
                let mut map = backend.values.lock().unwrap();
                for (name, value) in values {
                    map.insert(name.to_string(), *value);
                }
            }
            backend
        }

        pub fn get(&self, name: &str) -> Option<u32> {
            self.values.lock().unwrap().get(name).copied()
        }
    }

    impl SettingsBackend for MemoryBackend {
        fn read_dword(&self, name: &str) -> Result<Option<u32>, PersistenceError> {
            Ok(self.get(name))
        }

        fn write_dword(&mut self, name: &str, value: u32) -> Result<(), PersistenceError> {
            self.values.lock().unwrap().insert(name.to_string(), value);
            Ok(())
        }
    }

    /// Backend whose every operation fails
    pub struct FailingBackend;

    impl SettingsBackend for FailingBackend {
        fn read_dword(&self, name: &str) -> Result<Option<u32>, PersistenceError> {
            Err(PersistenceError::Read {
                name: name.to_string(),
                source: std::io::Error::other("registry unavailable"),
            })
        }

        fn write_dword(&mut self, name: &str, _value: u32) -> Result<(), PersistenceError> {
            Err(PersistenceError::Write {
                name: name.to_string(),
                source: std::io::Error::other("registry unavailable"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FailingBackend, MemoryBackend};
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let store = SettingsStore::load(Box::new(MemoryBackend::default()));
        assert!(store.notifications_enabled());
        assert!(!store.fan_sim_enabled());
        assert_eq!(store.fan_hotkey(), None);
    }

    #[test]
    fn test_load_existing_values() {
        let backend = MemoryBackend::with(&[
            (keys::NOTIFICATIONS_ENABLED, 0),
            (keys::FAN_SIM_ENABLED, 1),
            (keys::FAN_HOTKEY_VKEY, 0x31),
        ]);
        let store = SettingsStore::load(Box::new(backend));
        assert!(!store.notifications_enabled());
        assert!(store.fan_sim_enabled());
        assert_eq!(store.fan_hotkey(), VirtualKey::new(0x31));
    }

    #[test]
    fn test_only_one_means_true() {
        let backend = MemoryBackend::with(&[(keys::FAN_SIM_ENABLED, 2)]);
        let store = SettingsStore::load(Box::new(backend));
        assert!(!store.fan_sim_enabled());
    }

    #[test]
    fn test_invalid_hotkey_is_unbound() {
        let backend = MemoryBackend::with(&[(keys::FAN_HOTKEY_VKEY, 0x1_0000)]);
        let store = SettingsStore::load(Box::new(backend));
        assert_eq!(store.fan_hotkey(), None);
    }

    #[test]
    fn test_write_through() {
        let backend = MemoryBackend::default();
        let mut store = SettingsStore::load(Box::new(backend.clone()));

        store.set_fan_sim_enabled(true);
        store.set_notifications_enabled(false);
        store.set_fan_hotkey(VirtualKey::new(0x70));
        assert_eq!(backend.get(keys::FAN_SIM_ENABLED), Some(1));
        assert_eq!(backend.get(keys::NOTIFICATIONS_ENABLED), Some(0));
        assert_eq!(backend.get(keys::FAN_HOTKEY_VKEY), Some(0x70));

        store.set_fan_hotkey(None);
        assert_eq!(backend.get(keys::FAN_HOTKEY_VKEY), Some(0));
    }

    #[test]
    fn test_failing_backend_keeps_memory_authoritative() {
        let mut store = SettingsStore::load(Box::new(FailingBackend));
        assert!(store.notifications_enabled());

        store.set_fan_sim_enabled(true);
        store.set_fan_hotkey(VirtualKey::new(0x31));
        assert!(store.fan_sim_enabled());
        assert_eq!(store.fan_hotkey(), VirtualKey::new(0x31));
        assert!(store.set_bool("Anything", true).is_err());
    }
}
