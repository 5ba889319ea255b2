//! Configuration loading and management

use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Lock-key sampling interval
    pub poll_interval: Duration,

    /// Edge length of the tray glyph in pixels
    pub icon_size: u32,

    /// `HKCU` subkey holding the persisted settings
    pub settings_key: String,

    /// Capacity of the hook -> agent key edge queue
    pub edge_queue: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            icon_size: 16,
            settings_key: r"Software\TrayStatusHelper".to_string(),
            edge_queue: 64,
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("TRAY_STATUS_POLL_MS") {
            let ms: u64 = parse(&raw, "TRAY_STATUS_POLL_MS")?;
            if ms < 10 {
                bail!("TRAY_STATUS_POLL_MS must be at least 10, got {}", ms);
            }
            config.poll_interval = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("TRAY_STATUS_ICON_SIZE") {
            let size: u32 = parse(&raw, "TRAY_STATUS_ICON_SIZE")?;
            if !(8..=256).contains(&size) {
                bail!("TRAY_STATUS_ICON_SIZE must be within 8..=256, got {}", size);
            }
            config.icon_size = size;
        }

        if let Some(raw) = lookup("TRAY_STATUS_SETTINGS_KEY") {
            let key = raw.trim().trim_matches('\\');
            if key.is_empty() {
                bail!("TRAY_STATUS_SETTINGS_KEY must not be empty");
            }
            config.settings_key = key.to_string();
        }

        if let Some(raw) = lookup("TRAY_STATUS_EDGE_QUEUE") {
            let capacity: usize = parse(&raw, "TRAY_STATUS_EDGE_QUEUE")?;
            if capacity == 0 {
                bail!("TRAY_STATUS_EDGE_QUEUE must be at least 1");
            }
            config.edge_queue = capacity;
        }

        Ok(config)
    }
}

fn parse<T>(raw: &str, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid {} value `{}`", name, raw))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.icon_size, 16);
        assert_eq!(config.settings_key, r"Software\TrayStatusHelper");
        assert_eq!(config.edge_queue, 64);
    }

    #[test]
    fn test_config_overrides() {
        let config = load(&[
            ("TRAY_STATUS_POLL_MS", " 500 "),
            ("TRAY_STATUS_ICON_SIZE", "32"),
            ("TRAY_STATUS_SETTINGS_KEY", r"Software\Other\"),
            ("TRAY_STATUS_EDGE_QUEUE", "8"),
        ])
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.icon_size, 32);
        assert_eq!(config.settings_key, r"Software\Other");
        assert_eq!(config.edge_queue, 8);
    }

    #[test]
    fn test_config_rejects_invalid_values() {
        let err = load(&[("TRAY_STATUS_POLL_MS", "fast")]).unwrap_err();
        assert!(err.to_string().contains("TRAY_STATUS_POLL_MS"));

        assert!(load(&[("TRAY_STATUS_POLL_MS", "5")]).is_err());
        assert!(load(&[("TRAY_STATUS_ICON_SIZE", "4")]).is_err());
        assert!(load(&[("TRAY_STATUS_SETTINGS_KEY", "  ")]).is_err());
        assert!(load(&[("TRAY_STATUS_EDGE_QUEUE", "0")]).is_err());
    }
}
