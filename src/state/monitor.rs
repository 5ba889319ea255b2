//! Lock-key sampling and change detection

use serde::Serialize;

/// Caps Lock / Num Lock toggle state as reported by the OS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LockState {
    pub caps_lock: bool,
    pub num_lock: bool,
}

/// Source of live lock-key state
pub trait LockKeySource: Send {
    fn read(&self) -> LockState;
}

/// Result of comparing a fresh sample with the previous one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockChange {
    /// Either lock key differs from the last sample
    pub changed: bool,
    /// Caps Lock went off -> on
    pub caps_turned_on: bool,
    /// Num Lock went on -> off
    pub num_turned_off: bool,
}

/// Remembers the last observed lock state
#[derive(Debug)]
pub struct LockMonitor {
    last: LockState,
}

impl LockMonitor {
    /// Create a monitor primed with the state seen at startup
    pub fn new(initial: LockState) -> Self {
        Self { last: initial }
    }

    pub fn last(&self) -> LockState {
        self.last
    }

    /// Compare `now` with the last sample, then remember `now`
    pub fn observe(&mut self, now: LockState) -> LockChange {
        let prev = self.last;
        self.last = now;

        LockChange {
            changed: prev != now,
            caps_turned_on: !prev.caps_lock && now.caps_lock,
            num_turned_off: prev.num_lock && !now.num_lock,
        }
    }
}
