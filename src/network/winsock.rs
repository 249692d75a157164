//! Process-wide, reference-counted Winsock initialization.
//!
//! `WSAStartup` runs when the first guard is acquired and `WSACleanup` when
//! the last guard drops. Guards may be held by the enumerator and by any
//! number of monitors at once.

use std::sync::{Mutex, PoisonError};

use windows::Win32::Foundation::WIN32_ERROR;
use windows::Win32::Networking::WinSock::{WSACleanup, WSADATA, WSAStartup};

/// Winsock version 2.2.
const WINSOCK_VERSION: u16 = 0x0202;

static HOLDERS: Mutex<usize> = Mutex::new(0);

/// Keeps Winsock initialized while alive.
#[derive(Debug)]
pub struct WinsockGuard {
    _private: (),
}

impl WinsockGuard {
    /// Acquires a reference, initializing Winsock if this is the first one.
    ///
    /// # Errors
    ///
    /// Returns the `WSAStartup` failure code; no reference is taken then.
    pub fn acquire() -> windows::core::Result<Self> {
        let mut holders = HOLDERS.lock().unwrap_or_else(PoisonError::into_inner);
        if *holders == 0 {
            let mut data = WSADATA::default();
            // SAFETY: `data` is a valid out-pointer for the duration of the call.
            let rc = unsafe { WSAStartup(WINSOCK_VERSION, &raw mut data) };
            if rc != 0 {
                #[allow(clippy::cast_sign_loss)]
                return Err(windows::core::Error::from(WIN32_ERROR(rc as u32)));
            }
            tracing::debug!("Winsock initialized");
        }
        *holders += 1;
        Ok(Self { _private: () })
    }

    /// Number of live guards in the process.
    #[must_use]
    pub fn holders() -> usize {
        *HOLDERS.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for WinsockGuard {
    fn drop(&mut self) {
        let mut holders = HOLDERS.lock().unwrap_or_else(PoisonError::into_inner);
        *holders = holders.saturating_sub(1);
        if *holders == 0 {
            // SAFETY: balanced with the WSAStartup of the first guard.
            unsafe { WSACleanup() };
            tracing::debug!("Winsock released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_guards_stay_counted_while_held() {
        let outer = WinsockGuard::acquire().expect("WSAStartup failed");
        let inner = WinsockGuard::acquire().expect("WSAStartup failed");

        assert!(WinsockGuard::holders() >= 2);
        drop(inner);
        assert!(WinsockGuard::holders() >= 1);
        drop(outer);
    }

    #[test]
    fn reacquire_after_release_succeeds() {
        drop(WinsockGuard::acquire().expect("WSAStartup failed"));
        let again = WinsockGuard::acquire();
        assert!(again.is_ok());
    }
}
