//! Platform-neutral model of the tray surface
//!
//! The agent builds `StatusSnapshot`s; the Windows tray turns them into a
//! menu, a tooltip and the status window text.

mod menu;
mod status;

pub use menu::{entries as menu_entries, Command, MenuEntry};
pub use status::{tooltip, HotkeyStatus, StatusSnapshot, APP_NAME};
