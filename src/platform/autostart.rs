//! Launch at login through `HKCU\...\CurrentVersion\Run`

use tracing::{debug, info};

use super::registry::RegKey;
use crate::settings::{
    plan_migration, quoted_command, AutostartRegistry, MigrationAction, PersistenceError,
};

const RUN_KEY_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";

/// Canonical run entry name
const VALUE_NAME: &str = "Task Status Assistant";

/// Entry name used by earlier releases
const LEGACY_VALUE_NAME: &str = "TrayStatusHelper";

/// Run-key registration of the current executable
pub struct RunKeyAutostart;

impl RunKeyAutostart {
    fn desired_command() -> Result<String, PersistenceError> {
        let exe = std::env::current_exe().map_err(PersistenceError::ExecutablePath)?;
        Ok(quoted_command(&exe))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AutostartRegistry for RunKeyAutostart {
    fn is_enabled(&self) -> Result<bool, PersistenceError> {
        let Some(key) = RegKey::open(RUN_KEY_PATH, false)? else {
            return Ok(false);
        };
        if non_blank(key.read_string(VALUE_NAME)?).is_some() {
            return Ok(true);
        }
        Ok(non_blank(key.read_string(LEGACY_VALUE_NAME)?).is_some())
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), PersistenceError> {
        let key = RegKey::create(RUN_KEY_PATH)?;

        if enabled {
            key.write_string(VALUE_NAME, &Self::desired_command()?)?;
        } else {
            key.delete_value(VALUE_NAME)?;
        }
        key.delete_value(LEGACY_VALUE_NAME)
    }

    fn migrate(&self) -> Result<MigrationAction, PersistenceError> {
        let Some(key) = RegKey::open(RUN_KEY_PATH, true)? else {
            return Ok(MigrationAction::Nothing);
        };

        let current = key.read_string(VALUE_NAME)?;
        let legacy = key.read_string(LEGACY_VALUE_NAME)?;
        // A missing path only prevents rewriting, never the legacy cleanup
        let desired = Self::desired_command().unwrap_or_default();

        let action = plan_migration(current.as_deref(), legacy.as_deref(), &desired);
        debug!(?action, "autostart migration planned");

        match action {
            MigrationAction::Nothing => {}
            MigrationAction::RenameLegacy => {
                if !desired.is_empty() {
                    key.write_string(VALUE_NAME, &desired)?;
                }
                key.delete_value(LEGACY_VALUE_NAME)?;
                info!("legacy autostart entry renamed");
            }
            MigrationAction::RefreshPath => {
                key.write_string(VALUE_NAME, &desired)?;
                info!(path = %desired, "autostart path refreshed");
            }
        }

        Ok(action)
    }
}
