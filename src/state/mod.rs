//! State module for the fan hotkey and lock-key observation
//!
//! Provides an explicit hotkey state machine with three states:
//! - Unbound: no hotkey, key events are inert
//! - Bound: armed, toggles the fan once per physical press
//! - Learning: capturing the next key as the new binding
//!
//! and the lock-key monitor that turns polled samples into edge transitions.

mod machine;
mod monitor;

pub use machine::{HotkeyMachine, HotkeyOutcome, HotkeyState};
pub use monitor::{LockChange, LockKeySource, LockMonitor, LockState};
