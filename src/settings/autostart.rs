//! Start-with-Windows registration

use serde::Serialize;

use super::PersistenceError;

/// The OS "run at login" entry for this executable
pub trait AutostartRegistry: Send {
    fn is_enabled(&self) -> Result<bool, PersistenceError>;
    fn set_enabled(&self, enabled: bool) -> Result<(), PersistenceError>;
    /// Move a legacy entry to the canonical name and refresh a stale path
    fn migrate(&self) -> Result<MigrationAction, PersistenceError>;
}

/// What startup migration has to do to the run entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationAction {
    /// Entries are already canonical, or autostart is off
    Nothing,
    /// Write the canonical entry and delete the legacy one
    RenameLegacy,
    /// Rewrite the canonical entry with the current executable path
    RefreshPath,
}

/// Decide the migration from the stored values and the desired command line
///
/// Blank values count as absent. Paths compare trimmed and case-insensitively.
pub fn plan_migration(current: Option<&str>, legacy: Option<&str>, desired: &str) -> MigrationAction {
    let current = current.map(str::trim).filter(|v| !v.is_empty());
    let legacy = legacy.map(str::trim).filter(|v| !v.is_empty());

    match (current, legacy) {
        (None, Some(_)) => MigrationAction::RenameLegacy,
        (Some(current), _) if !desired.is_empty() && current.to_lowercase() != desired.to_lowercase() => {
            MigrationAction::RefreshPath
        }
        _ => MigrationAction::Nothing,
    }
}

/// Quote an executable path the way run entries store it
pub fn quoted_command(exe: &std::path::Path) -> String {
    format!("\"{}\"", exe.display())
}

#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory autostart flag; `fail` makes every call error out
    #[derive(Clone, Default)]
    pub struct FakeAutostart {
        pub enabled: Arc<Mutex<bool>>,
        pub fail: bool,
    }

    impl FakeAutostart {
        fn check(&self) -> Result<(), PersistenceError> {
            if self.fail {
                return Err(PersistenceError::Write {
                    name: "Task Status Assistant".to_string(),
                    source: std::io::Error::other("access denied"),
                });
            }
            Ok(())
        }
    }

    impl AutostartRegistry for FakeAutostart {
        fn is_enabled(&self) -> Result<bool, PersistenceError> {
            self.check()?;
            Ok(*self.enabled.lock().unwrap())
        }

        fn set_enabled(&self, enabled: bool) -> Result<(), PersistenceError> {
            self.check()?;
            *self.enabled.lock().unwrap() = enabled;
            Ok(())
        }

        fn migrate(&self) -> Result<MigrationAction, PersistenceError> {
            self.check()?;
            Ok(MigrationAction::Nothing)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXE: &str = r#""C:\Tools\tray-status-agent.exe""#;

    #[test]
    fn test_nothing_registered() {
        assert_eq!(plan_migration(None, None, EXE), MigrationAction::Nothing);
        assert_eq!(plan_migration(Some("  "), Some(""), EXE), MigrationAction::Nothing);
    }

    #[test]
    fn test_legacy_only_is_renamed() {
        assert_eq!(
            plan_migration(None, Some(r#""D:\old\TrayStatusHelper.exe""#), EXE),
            MigrationAction::RenameLegacy
        );
        assert_eq!(
            plan_migration(Some(""), Some("x"), EXE),
            MigrationAction::RenameLegacy
        );
    }

    #[test]
    fn test_moved_executable_is_refreshed() {
        assert_eq!(
            plan_migration(Some(r#""D:\old\agent.exe""#), None, EXE),
            MigrationAction::RefreshPath
        );
    }

    #[test]
    fn test_same_path_ignores_case_and_whitespace() {
        let stored = r#"  "c:\tools\TRAY-STATUS-AGENT.exe" "#;
        assert_eq!(plan_migration(Some(stored), None, EXE), MigrationAction::Nothing);
        // Canonical present wins over a lingering legacy entry
        assert_eq!(plan_migration(Some(EXE), Some("x"), EXE), MigrationAction::Nothing);
    }

    #[test]
    fn test_same_path_ignores_non_ascii_case() {
        let desired = r#""C:\Users\Ärger\agent.exe""#;
        let stored = r#""c:\users\ärger\AGENT.exe""#;
        assert_eq!(plan_migration(Some(stored), None, desired), MigrationAction::Nothing);
    }

    #[test]
    fn test_unknown_executable_never_rewrites() {
        assert_eq!(plan_migration(Some(EXE), None, ""), MigrationAction::Nothing);
    }

    #[test]
    fn test_quoted_command() {
        let path = std::path::Path::new("agent.exe");
        assert_eq!(quoted_command(path), "\"agent.exe\"");
    }
}
