//! Live Caps Lock / Num Lock state

use windows::Win32::UI::Input::KeyboardAndMouse::{GetKeyState, VK_CAPITAL, VK_NUMLOCK};

use crate::state::{LockKeySource, LockState};

/// Reads the toggle bit of the lock keys on every call
pub struct WindowsLockKeys;

impl LockKeySource for WindowsLockKeys {
    fn read(&self) -> LockState {
        // Low bit of GetKeyState is the toggle state
        unsafe {
            LockState {
                caps_lock: GetKeyState(VK_CAPITAL.0 as i32) & 1 != 0,
                num_lock: GetKeyState(VK_NUMLOCK.0 as i32) & 1 != 0,
            }
        }
    }
}
