//! Tray menu commands and layout

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};

use super::status::{HotkeyStatus, StatusSnapshot};

/// User actions available from the tray menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ShowStatus,
    ToggleNotifications,
    ToggleFan,
    LearnHotkey,
    ClearHotkey,
    ToggleAutostart,
    Exit,
}

impl Command {
    const ALL: [Command; 7] = [
        Command::ShowStatus,
        Command::ToggleNotifications,
        Command::ToggleFan,
        Command::LearnHotkey,
        Command::ClearHotkey,
        Command::ToggleAutostart,
        Command::Exit,
    ];

    /// `WM_COMMAND` identifier of the menu item
    pub fn menu_id(self) -> u32 {
        match self {
            Command::ShowStatus => 1001,
            Command::ToggleNotifications => 1002,
            Command::ToggleFan => 1003,
            Command::LearnHotkey => 1004,
            Command::ClearHotkey => 1005,
            Command::ToggleAutostart => 1006,
            Command::Exit => 1007,
        }
    }

    pub fn from_menu_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.menu_id() == id)
    }

    /// Hand the command to the agent from a thread outside the runtime
    ///
    /// Exit waits for queue space; other commands are dropped when the queue is full.
    pub fn deliver(self, commands: &mpsc::Sender<Command>) -> Result<(), TrySendError<Command>> {
        match self {
            Command::Exit => commands
                .blocking_send(self)
                .map_err(|e| TrySendError::Closed(e.0)),
            _ => commands.try_send(self),
        }
    }
}

/// One row of the context menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        command: Command,
        label: &'static str,
        checked: bool,
        enabled: bool,
    },
    /// Disabled informational text
    Info(String),
    Submenu {
        label: &'static str,
        entries: Vec<MenuEntry>,
    },
    Separator,
}

impl MenuEntry {
    fn item(command: Command, label: &'static str) -> Self {
        Self::Item {
            command,
            label,
            checked: false,
            enabled: true,
        }
    }

    fn checked(command: Command, label: &'static str, checked: bool) -> Self {
        Self::Item {
            command,
            label,
            checked,
            enabled: true,
        }
    }
}

/// Build the context menu for the current state
pub fn entries(snapshot: &StatusSnapshot) -> Vec<MenuEntry> {
    let hotkey_enabled = snapshot.hotkey != HotkeyStatus::Unavailable;
    let hotkey_menu = vec![
        MenuEntry::Item {
            command: Command::LearnHotkey,
            label: "Set / Learn",
            checked: false,
            enabled: hotkey_enabled && snapshot.hotkey != HotkeyStatus::Learning,
        },
        MenuEntry::Item {
            command: Command::ClearHotkey,
            label: "Clear",
            checked: false,
            enabled: hotkey_enabled,
        },
        MenuEntry::Separator,
        MenuEntry::Info(snapshot.hotkey.label()),
    ];

    vec![
        MenuEntry::item(Command::ShowStatus, "Show Status"),
        MenuEntry::Separator,
        MenuEntry::checked(Command::ToggleNotifications, "Notifications", snapshot.notifications),
        MenuEntry::checked(Command::ToggleFan, "Fan On/Off", snapshot.fan),
        MenuEntry::Submenu {
            label: "Fan Hotkey",
            entries: hotkey_menu,
        },
        MenuEntry::checked(Command::ToggleAutostart, "Start with Windows", snapshot.autostart),
        MenuEntry::Separator,
        MenuEntry::item(Command::Exit, "Exit"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(hotkey: HotkeyStatus) -> StatusSnapshot {
        StatusSnapshot {
            num_lock: true,
            caps_lock: false,
            fan: true,
            notifications: false,
            autostart: true,
            hotkey,
        }
    }

    fn find(entries: &[MenuEntry], wanted: Command) -> Option<(bool, bool)> {
        entries.iter().find_map(|entry| match entry {
            MenuEntry::Item {
                command,
                checked,
                enabled,
                ..
            } if *command == wanted => Some((*checked, *enabled)),
            MenuEntry::Submenu { entries, .. } => find(entries, wanted),
            _ => None,
        })
    }

    #[test]
    fn test_menu_ids_round_trip() {
        for command in Command::ALL {
            assert_eq!(Command::from_menu_id(command.menu_id()), Some(command));
        }
        assert_eq!(Command::from_menu_id(42), None);
    }

    #[test]
    fn test_exit_waits_for_queue_space() {
        let (tx, mut rx) = mpsc::channel(1);
        Command::ToggleFan.deliver(&tx).unwrap();
        assert!(matches!(
            Command::ShowStatus.deliver(&tx),
            Err(TrySendError::Full(Command::ShowStatus))
        ));

        let sender = std::thread::spawn(move || Command::Exit.deliver(&tx));
        assert_eq!(rx.blocking_recv(), Some(Command::ToggleFan));
        assert_eq!(rx.blocking_recv(), Some(Command::Exit));
        assert!(sender.join().unwrap().is_ok());
    }

    #[test]
    fn test_deliver_reports_closed_queue() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        assert!(matches!(
            Command::Exit.deliver(&tx),
            Err(TrySendError::Closed(Command::Exit))
        ));
    }

    #[test]
    fn test_checked_items_follow_snapshot() {
        let menu = entries(&snapshot(HotkeyStatus::Unbound));
        assert_eq!(find(&menu, Command::ToggleNotifications), Some((false, true)));
        assert_eq!(find(&menu, Command::ToggleFan), Some((true, true)));
        assert_eq!(find(&menu, Command::ToggleAutostart), Some((true, true)));
    }

    #[test]
    fn test_hotkey_entries_greyed_when_unavailable() {
        let menu = entries(&snapshot(HotkeyStatus::Unavailable));
        assert_eq!(find(&menu, Command::LearnHotkey), Some((false, false)));
        assert_eq!(find(&menu, Command::ClearHotkey), Some((false, false)));
        assert_eq!(find(&menu, Command::Exit), Some((false, true)));
    }

    #[test]
    fn test_learn_disabled_while_learning() {
        let menu = entries(&snapshot(HotkeyStatus::Learning));
        assert_eq!(find(&menu, Command::LearnHotkey), Some((false, false)));
        assert!(menu.iter().any(|e| matches!(
            e,
            MenuEntry::Submenu { entries, .. }
                if entries.contains(&MenuEntry::Info("Current: (waiting...)".to_string()))
        )));
    }
}
