//! Virtual-key codes and key edge definitions
//!
//! Provides the layout-independent key identifier used for the fan hotkey
//! binding and the `KeyEdge` value the keyboard hook hands to the agent.

use serde::{Deserialize, Serialize};

/// Windows virtual-key codes the agent cares about by name
pub mod codes {
    pub const BACK: u16 = 0x08;
    pub const TAB: u16 = 0x09;
    pub const RETURN: u16 = 0x0D;
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    pub const MENU: u16 = 0x12;
    pub const PAUSE: u16 = 0x13;
    pub const CAPITAL: u16 = 0x14;
    pub const ESCAPE: u16 = 0x1B;
    pub const SPACE: u16 = 0x20;
    pub const LWIN: u16 = 0x5B;
    pub const RWIN: u16 = 0x5C;
    pub const NUMPAD0: u16 = 0x60;
    pub const F1: u16 = 0x70;
    pub const F24: u16 = 0x87;
    pub const NUMLOCK: u16 = 0x90;
    pub const SCROLL: u16 = 0x91;
    pub const LSHIFT: u16 = 0xA0;
    pub const RSHIFT: u16 = 0xA1;
    pub const LCONTROL: u16 = 0xA2;
    pub const RCONTROL: u16 = 0xA3;
    pub const LMENU: u16 = 0xA4;
    pub const RMENU: u16 = 0xA5;
    pub const VOLUME_MUTE: u16 = 0xAD;
    pub const LAUNCH_APP1: u16 = 0xB6;
    pub const LAUNCH_APP2: u16 = 0xB7;
}

/// Raw window messages delivered to a low-level keyboard hook
pub mod messages {
    pub const WM_KEYDOWN: u32 = 0x0100;
    pub const WM_KEYUP: u32 = 0x0101;
    pub const WM_SYSKEYDOWN: u32 = 0x0104;
    pub const WM_SYSKEYUP: u32 = 0x0105;
}

/// A non-zero Windows virtual-key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(u16);

impl VirtualKey {
    pub const ESCAPE: VirtualKey = VirtualKey(codes::ESCAPE);

    /// Wrap a raw code; `0` and values above `0xFE` are not keys
    pub fn new(code: u32) -> Option<Self> {
        match code {
            1..=0xFE => Some(Self(code as u16)),
            _ => None,
        }
    }

    /// The raw virtual-key code
    pub fn code(self) -> u16 {
        self.0
    }

    /// Shift, Control, Alt and Windows keys, either side
    pub fn is_modifier(self) -> bool {
        matches!(
            self.0,
            codes::SHIFT
                | codes::CONTROL
                | codes::MENU
                | codes::LWIN
                | codes::RWIN
                | codes::LSHIFT
                | codes::RSHIFT
                | codes::LCONTROL
                | codes::RCONTROL
                | codes::LMENU
                | codes::RMENU
        )
    }

    /// Human-readable key name for menus and notifications
    pub fn name(self) -> String {
        let code = self.0;
        match code {
            0x30..=0x39 | 0x41..=0x5A => char::from(code as u8).to_string(),
            codes::NUMPAD0..=0x69 => format!("NumPad{}", code - codes::NUMPAD0),
            codes::F1..=codes::F24 => format!("F{}", code - codes::F1 + 1),
            codes::BACK => "Backspace".into(),
            codes::TAB => "Tab".into(),
            codes::RETURN => "Enter".into(),
            codes::SHIFT => "Shift".into(),
            codes::CONTROL => "Control".into(),
            codes::MENU => "Alt".into(),
            codes::PAUSE => "Pause".into(),
            codes::CAPITAL => "CapsLock".into(),
            codes::ESCAPE => "Escape".into(),
            codes::SPACE => "Space".into(),
            0x21 => "PageUp".into(),
            0x22 => "PageDown".into(),
            0x23 => "End".into(),
            0x24 => "Home".into(),
            0x25 => "Left".into(),
            0x26 => "Up".into(),
            0x27 => "Right".into(),
            0x28 => "Down".into(),
            0x2C => "PrintScreen".into(),
            0x2D => "Insert".into(),
            0x2E => "Delete".into(),
            codes::LWIN => "LeftWin".into(),
            codes::RWIN => "RightWin".into(),
            0x5D => "Apps".into(),
            codes::NUMLOCK => "NumLock".into(),
            codes::SCROLL => "ScrollLock".into(),
            codes::LSHIFT => "LeftShift".into(),
            codes::RSHIFT => "RightShift".into(),
            codes::LCONTROL => "LeftControl".into(),
            codes::RCONTROL => "RightControl".into(),
            codes::LMENU => "LeftAlt".into(),
            codes::RMENU => "RightAlt".into(),
            codes::VOLUME_MUTE => "VolumeMute".into(),
            0xAE => "VolumeDown".into(),
            0xAF => "VolumeUp".into(),
            codes::LAUNCH_APP1 => "LaunchApp1".into(),
            codes::LAUNCH_APP2 => "LaunchApp2".into(),
            _ => format!("Key{:#04X}", code),
        }
    }
}

impl std::fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (vk {})", self.name(), self.0)
    }
}

/// Press direction of a key edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDirection {
    Down,
    Up,
}

/// A single key transition observed by the hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEdge {
    pub key: VirtualKey,
    pub direction: KeyDirection,
}

impl KeyEdge {
    pub fn down(key: VirtualKey) -> Self {
        Self {
            key,
            direction: KeyDirection::Down,
        }
    }

    pub fn up(key: VirtualKey) -> Self {
        Self {
            key,
            direction: KeyDirection::Up,
        }
    }

    /// Decode a raw hook message and its virtual-key code
    ///
    /// System variants (Alt held) count as ordinary key edges. Anything that
    /// is not a key down/up message, or carries no usable code, yields `None`.
    pub fn decode(message: u32, vk_code: u32) -> Option<Self> {
        let direction = match message {
            messages::WM_KEYDOWN | messages::WM_SYSKEYDOWN => KeyDirection::Down,
            messages::WM_KEYUP | messages::WM_SYSKEYUP => KeyDirection::Up,
            _ => return None,
        };
        let key = VirtualKey::new(vk_code)?;
        Some(Self { key, direction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_a_key() {
        assert!(VirtualKey::new(0).is_none());
        assert!(VirtualKey::new(0xFF).is_none());
        assert_eq!(VirtualKey::new(0x31).map(VirtualKey::code), Some(0x31));
    }

    #[test]
    fn test_decode_directions() {
        let down = KeyEdge::decode(messages::WM_KEYDOWN, 0x31).unwrap();
        assert_eq!(down.direction, KeyDirection::Down);

        let sys_down = KeyEdge::decode(messages::WM_SYSKEYDOWN, 0x31).unwrap();
        assert_eq!(sys_down.direction, KeyDirection::Down);

        let up = KeyEdge::decode(messages::WM_SYSKEYUP, 0x31).unwrap();
        assert_eq!(up.direction, KeyDirection::Up);
    }

    #[test]
    fn test_decode_rejects_other_messages() {
        // WM_CHAR
        assert!(KeyEdge::decode(0x0102, 0x31).is_none());
        assert!(KeyEdge::decode(messages::WM_KEYDOWN, 0).is_none());
    }

    #[test]
    fn test_modifiers() {
        for code in [0x10, 0x11, 0x12, 0x5B, 0x5C, 0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5] {
            assert!(VirtualKey::new(code).unwrap().is_modifier(), "{code:#x}");
        }
        assert!(!VirtualKey::new(0x31).unwrap().is_modifier());
        assert!(!VirtualKey::ESCAPE.is_modifier());
    }

    #[test]
    fn test_names() {
        assert_eq!(VirtualKey::new(0x31).unwrap().name(), "1");
        assert_eq!(VirtualKey::new(0x41).unwrap().name(), "A");
        assert_eq!(VirtualKey::new(0x7B).unwrap().name(), "F12");
        assert_eq!(VirtualKey::new(0x63).unwrap().name(), "NumPad3");
        assert_eq!(VirtualKey::new(0xFE).unwrap().name(), "Key0xFE");
        assert_eq!(VirtualKey::new(0x31).unwrap().to_string(), "1 (vk 49)");
    }
}
