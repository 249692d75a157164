//! Error types for the monitor layer.

use super::MonitorState;
use crate::network::UNSUPPORTED_CODE;
use thiserror::Error;

/// Error type for monitor operations.
///
/// Describes what went wrong without dictating recovery strategy. Use
/// [`MonitorError::is_fatal`] to tell backend failures, which stop the
/// monitor, from failures of a single call.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No change callback was supplied.
    #[error("A change callback is required")]
    MissingCallback,

    /// The operation is not allowed in the monitor's current state.
    #[error("Cannot {operation} a monitor that is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// State of the monitor when the operation was attempted.
        state: MonitorState,
    },

    /// The monitor is not running.
    #[error("Monitor is not running")]
    NotRunning,

    /// No change notification backend exists for this platform.
    #[error("Address change monitoring is not supported on this platform")]
    Unsupported,

    /// An OS call failed.
    #[error("{context}: {source}")]
    Io {
        /// The call that failed.
        context: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The kernel answered with a netlink error message.
    #[error("Netlink error message (errno {errno})")]
    Protocol {
        /// Positive errno carried by the message.
        errno: i32,
    },

    /// The dynamic store or its run loop failed.
    #[error("Run loop failure: {reason}")]
    RunLoop {
        /// What failed.
        reason: &'static str,
    },

    /// The OS notification channel closed unexpectedly.
    #[error("Notification channel disconnected")]
    Disconnected,

    /// Windows API call failed.
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),
}

impl MonitorError {
    /// Creates an `Io` error from the calling thread's last OS error.
    #[must_use]
    pub fn last_os_error(context: &'static str) -> Self {
        Self::Io {
            context,
            source: std::io::Error::last_os_error(),
        }
    }

    /// Stable, non-zero numeric code for this error.
    ///
    /// OS failures report their native code where one is available.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::MissingCallback => 22,
            Self::InvalidState { .. } => 16,
            Self::NotRunning => 3,
            Self::Unsupported => UNSUPPORTED_CODE,
            Self::Io { source, .. } => source.raw_os_error().filter(|c| *c != 0).unwrap_or(5),
            Self::Protocol { errno } => *errno,
            Self::RunLoop { .. } => 2,
            Self::Disconnected => 32,
            #[cfg(windows)]
            Self::WindowsApi(e) => e.code().0,
        }
    }

    /// Returns true if the backend can no longer deliver events.
    ///
    /// A monitor that sees a fatal error moves to `Stopped` and releases its
    /// backend.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Io { .. } | Self::RunLoop { .. } | Self::Disconnected => true,
            #[cfg(windows)]
            Self::WindowsApi(_) => true,
            Self::MissingCallback
            | Self::InvalidState { .. }
            | Self::NotRunning
            | Self::Unsupported
            | Self::Protocol { .. } => false,
        }
    }
}

/// Snapshot of the most recent failed operation of a monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Numeric code, see [`MonitorError::code`].
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl From<&MonitorError> for LastError {
    fn from(error: &MonitorError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}
