//! Fallback backend for platforms without a notification mechanism.

use std::time::Duration;

use crate::monitor::{Backend, ChangeEvent, MonitorError, ProcessOutcome};

/// Backend that can never be opened.
#[derive(Debug)]
pub struct UnsupportedBackend {
    _private: (),
}

impl UnsupportedBackend {
    /// Always fails with [`MonitorError::Unsupported`].
    ///
    /// # Errors
    ///
    /// Always.
    pub const fn open() -> Result<Self, MonitorError> {
        Err(MonitorError::Unsupported)
    }
}

impl Backend for UnsupportedBackend {
    fn process(
        &mut self,
        _timeout: Option<Duration>,
        _emit: &mut dyn FnMut(ChangeEvent),
    ) -> Result<ProcessOutcome, MonitorError> {
        Err(MonitorError::Unsupported)
    }
}
