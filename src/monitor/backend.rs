//! Backend trait for platform change notifications.
//!
//! This module provides the [`Backend`] trait that abstracts the OS
//! notification mechanism behind one synchronous call.

use std::time::Duration;

use super::{ChangeEvent, MonitorError};

/// Outcome of one successful wait for notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Notifications arrived; this many events were delivered.
    ///
    /// The count may be zero when the notifications carried no reportable
    /// address (unknown interface, non-address message).
    Processed(usize),
    /// The wait ended without notifications.
    TimedOut,
    /// The wait was interrupted by a signal.
    Interrupted,
}

/// An opened platform notification source.
///
/// # Resource Semantics
///
/// A backend owns its OS resources from the moment it is opened. Dropping
/// it releases them; there is no separate close call, so a backend can only
/// be released once.
///
/// # Implementation Notes
///
/// - `timeout` of `None` waits indefinitely; `Some(Duration::ZERO)` polls
/// - Every event is passed to `emit` before `process` returns
/// - Errors for which [`MonitorError::is_fatal`] holds mean the backend can
///   no longer deliver events
pub trait Backend {
    /// Waits up to `timeout` for notifications and translates them into events.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when the wait or the notification decoding fails.
    fn process(
        &mut self,
        timeout: Option<Duration>,
        emit: &mut dyn FnMut(ChangeEvent),
    ) -> Result<ProcessOutcome, MonitorError>;
}

/// Converts a C-style millisecond wait into a timeout.
///
/// Negative values wait indefinitely (`None`), zero polls, positive values
/// bound the wait.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use netut::monitor::wait_from_millis;
///
/// assert_eq!(wait_from_millis(-1), None);
/// assert_eq!(wait_from_millis(0), Some(Duration::ZERO));
/// assert_eq!(wait_from_millis(250), Some(Duration::from_millis(250)));
/// ```
#[must_use]
pub fn wait_from_millis(millis: i64) -> Option<Duration> {
    u64::try_from(millis).ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_waits_are_infinite() {
        assert_eq!(wait_from_millis(-1), None);
        assert_eq!(wait_from_millis(i64::MIN), None);
    }

    #[test]
    fn zero_polls() {
        assert_eq!(wait_from_millis(0), Some(Duration::ZERO));
    }

    #[test]
    fn positive_values_bound_the_wait() {
        assert_eq!(wait_from_millis(1500), Some(Duration::from_millis(1500)));
    }
}
