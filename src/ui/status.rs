//! Read-only status snapshot shown by the tray surface

use serde::Serialize;

use crate::hotkey::VirtualKey;

/// Product name used in the tooltip and window titles
pub const APP_NAME: &str = "Task Status Assistant";

/// Fan hotkey as presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "vk", rename_all = "snake_case")]
pub enum HotkeyStatus {
    /// The keyboard hook could not be installed
    Unavailable,
    Unbound,
    Learning,
    Bound(VirtualKey),
}

impl HotkeyStatus {
    /// Label for the disabled info entry of the hotkey submenu
    pub fn label(&self) -> String {
        match self {
            HotkeyStatus::Unavailable => "Current: (hotkey unavailable)".to_string(),
            HotkeyStatus::Unbound => "Current: (not set)".to_string(),
            HotkeyStatus::Learning => "Current: (waiting...)".to_string(),
            HotkeyStatus::Bound(key) => format!("Current: {}", key),
        }
    }
}

/// Everything the status surface and menu display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub num_lock: bool,
    pub caps_lock: bool,
    pub fan: bool,
    pub notifications: bool,
    pub autostart: bool,
    pub hotkey: HotkeyStatus,
}

impl StatusSnapshot {
    /// Multi-line body of the status window
    pub fn text(&self) -> String {
        format!(
            "Num Lock: {}\r\nCaps Lock: {}\r\nFan: {}\r\n\r\nNotifications: {}\r\nStart with Windows: {}\r\nFan hotkey: {}",
            on_off(self.num_lock),
            on_off(self.caps_lock),
            on_off(self.fan),
            on_off(self.notifications),
            on_off(self.autostart),
            self.hotkey.label().trim_start_matches("Current: "),
        )
    }
}

/// Tray tooltip, e.g. `Task Status Assistant | C:On N:Off F:Off`
pub fn tooltip(caps_lock: bool, num_lock: bool, fan: bool) -> String {
    let flag = |on: bool| if on { "On" } else { "Off" };
    format!(
        "{} | C:{} N:{} F:{}",
        APP_NAME,
        flag(caps_lock),
        flag(num_lock),
        flag(fan)
    )
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            num_lock: true,
            caps_lock: false,
            fan: true,
            notifications: true,
            autostart: false,
            hotkey: HotkeyStatus::Bound(VirtualKey::new(0x31).unwrap()),
        }
    }

    #[test]
    fn test_tooltip() {
        assert_eq!(
            tooltip(true, false, false),
            "Task Status Assistant | C:On N:Off F:Off"
        );
    }

    #[test]
    fn test_hotkey_labels() {
        assert_eq!(HotkeyStatus::Unbound.label(), "Current: (not set)");
        assert_eq!(HotkeyStatus::Learning.label(), "Current: (waiting...)");
        assert_eq!(
            HotkeyStatus::Bound(VirtualKey::new(0x31).unwrap()).label(),
            "Current: 1 (vk 49)"
        );
    }

    #[test]
    fn test_status_text() {
        let text = snapshot().text();
        assert!(text.starts_with("Num Lock: ON\r\nCaps Lock: OFF\r\nFan: ON"));
        assert!(text.contains("Start with Windows: OFF"));
        assert!(text.ends_with("Fan hotkey: 1 (vk 49)"));
    }

    #[test]
    fn test_snapshot_serialization() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(json["hotkey"]["state"], "bound");
        assert_eq!(json["hotkey"]["vk"], 49);
        assert_eq!(json["caps_lock"], false);
    }
}
