//! Hotkey module for global keyboard event listening
//!
//! Uses a Windows low-level keyboard hook to observe every key press and
//! release system-wide, decoded into `KeyEdge` values for the agent.

mod keys;
mod listener;

pub use keys::{KeyDirection, KeyEdge, VirtualKey};
pub use listener::{HookInstallError, KeyboardHook};
