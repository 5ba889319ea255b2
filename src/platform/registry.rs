//! `HKEY_CURRENT_USER` access and the registry settings backend

use windows::core::PCWSTR;
use windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, WIN32_ERROR};
use windows::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegOpenKeyExW, RegQueryValueExW,
    RegSetValueExW, HKEY, HKEY_CURRENT_USER, KEY_READ, KEY_WRITE, REG_DWORD, REG_EXPAND_SZ,
    REG_OPTION_NON_VOLATILE, REG_SZ, REG_VALUE_TYPE,
};

use crate::settings::{PersistenceError, SettingsBackend};

/// Null-terminated UTF-16 copy of `s`
pub fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn os_error(status: WIN32_ERROR) -> std::io::Error {
    std::io::Error::from_raw_os_error(status.0 as i32)
}

/// An open registry key below `HKEY_CURRENT_USER`, closed on drop
pub struct RegKey(HKEY);

impl RegKey {
    /// Open an existing key; `Ok(None)` if it does not exist
    pub fn open(path: &str, writable: bool) -> Result<Option<Self>, PersistenceError> {
        let path_w = wide(path);
        let access = if writable { KEY_READ | KEY_WRITE } else { KEY_READ };
        let mut hkey = HKEY::default();

        let status = unsafe {
            RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR(path_w.as_ptr()),
                Some(0),
                access,
                &mut hkey,
            )
        };

        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status.is_err() {
            return Err(PersistenceError::Open {
                path: path.to_string(),
                source: os_error(status),
            });
        }
        Ok(Some(Self(hkey)))
    }

    /// Open a key for writing, creating it if needed
    pub fn create(path: &str) -> Result<Self, PersistenceError> {
        let path_w = wide(path);
        let mut hkey = HKEY::default();

        let status = unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR(path_w.as_ptr()),
                Some(0),
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_READ | KEY_WRITE,
                None,
                &mut hkey,
                None,
            )
        };

        if status.is_err() {
            return Err(PersistenceError::Open {
                path: path.to_string(),
                source: os_error(status),
            });
        }
        Ok(Self(hkey))
    }

    /// Read a DWORD value; missing or non-DWORD values read as `None`
    pub fn read_dword(&self, name: &str) -> Result<Option<u32>, PersistenceError> {
        let name_w = wide(name);
        let mut kind = REG_VALUE_TYPE::default();
        let mut value = 0u32;
        let mut size = std::mem::size_of::<u32>() as u32;

        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(name_w.as_ptr()),
                None,
                Some(&mut kind),
                Some(&mut value as *mut u32 as *mut u8),
                Some(&mut size),
            )
        };

        if status == ERROR_FILE_NOT_FOUND || status == ERROR_MORE_DATA {
            return Ok(None);
        }
        if status.is_err() {
            return Err(PersistenceError::Read {
                name: name.to_string(),
                source: os_error(status),
            });
        }
        Ok((kind == REG_DWORD).then_some(value))
    }

    pub fn write_dword(&self, name: &str, value: u32) -> Result<(), PersistenceError> {
        let name_w = wide(name);
        let bytes = value.to_le_bytes();

        let status = unsafe {
            RegSetValueExW(self.0, PCWSTR(name_w.as_ptr()), Some(0), REG_DWORD, Some(&bytes))
        };

        if status.is_err() {
            return Err(PersistenceError::Write {
                name: name.to_string(),
                source: os_error(status),
            });
        }
        Ok(())
    }

    /// Read a string value; missing or non-string values read as `None`
    pub fn read_string(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        let name_w = wide(name);
        let read_error = |status: WIN32_ERROR| PersistenceError::Read {
            name: name.to_string(),
            source: os_error(status),
        };

        let mut kind = REG_VALUE_TYPE::default();
        let mut size = 0u32;
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(name_w.as_ptr()),
                None,
                Some(&mut kind),
                None,
                Some(&mut size),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        if status.is_err() {
            return Err(read_error(status));
        }
        if kind != REG_SZ && kind != REG_EXPAND_SZ {
            return Ok(None);
        }

        let mut buf = vec![0u16; (size as usize / 2) + 1];
        let mut size = (buf.len() * 2) as u32;
        let status = unsafe {
            RegQueryValueExW(
                self.0,
                PCWSTR(name_w.as_ptr()),
                None,
                None,
                Some(buf.as_mut_ptr() as *mut u8),
                Some(&mut size),
            )
        };
        if status.is_err() {
            return Err(read_error(status));
        }

        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        Ok(Some(String::from_utf16_lossy(&buf[..len])))
    }

    pub fn write_string(&self, name: &str, value: &str) -> Result<(), PersistenceError> {
        let name_w = wide(name);
        let value_w = wide(value);
        let bytes = unsafe {
            std::slice::from_raw_parts(value_w.as_ptr() as *const u8, value_w.len() * 2)
        };

        let status = unsafe {
            RegSetValueExW(self.0, PCWSTR(name_w.as_ptr()), Some(0), REG_SZ, Some(bytes))
        };

        if status.is_err() {
            return Err(PersistenceError::Write {
                name: name.to_string(),
                source: os_error(status),
            });
        }
        Ok(())
    }

    /// Delete a value; deleting a missing value succeeds
    pub fn delete_value(&self, name: &str) -> Result<(), PersistenceError> {
        let name_w = wide(name);
        let status = unsafe { RegDeleteValueW(self.0, PCWSTR(name_w.as_ptr())) };

        if status.is_err() && status != ERROR_FILE_NOT_FOUND {
            return Err(PersistenceError::Write {
                name: name.to_string(),
                source: os_error(status),
            });
        }
        Ok(())
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        unsafe {
            let _ = RegCloseKey(self.0);
        }
    }
}

/// Settings stored as DWORD values under `HKCU\<key>`
pub struct RegistrySettings {
    key: String,
}

impl RegistrySettings {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl SettingsBackend for RegistrySettings {
    fn read_dword(&self, name: &str) -> Result<Option<u32>, PersistenceError> {
        match RegKey::open(&self.key, false)? {
            Some(key) => key.read_dword(name),
            None => Ok(None),
        }
    }

    fn write_dword(&mut self, name: &str, value: u32) -> Result<(), PersistenceError> {
        RegKey::create(&self.key)?.write_dword(name, value)
    }
}
