//! Windows implementations of the agent's collaborators
//!
//! Registry-backed settings and autostart, live lock-key state and the
//! notification-area surface. Everything here is thin glue around Win32;
//! behaviour lives in the platform-neutral modules.

mod autostart;
mod icon;
mod lock_keys;
mod registry;
mod tray;

pub use autostart::RunKeyAutostart;
pub use lock_keys::WindowsLockKeys;
pub use registry::RegistrySettings;
pub use tray::TrayUi;
