//! The change monitor: lifecycle, event delivery and the blocking loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::platform::PlatformBackend;
use super::{Backend, ChangeEvent, LastError, MonitorError, ProcessOutcome};

/// Default wait slice of [`Monitor::process_blocking`].
pub const DEFAULT_SLICE: Duration = Duration::from_secs(1);

/// Default pause after an interrupted wait in [`Monitor::process_blocking`].
pub const DEFAULT_INTERRUPT_BACKOFF: Duration = Duration::from_millis(500);

/// The user callback receiving change events.
pub type Callback = Box<dyn FnMut(ChangeEvent)>;

type Opener<B> = Box<dyn FnMut() -> Result<B, MonitorError>>;

/// Lifecycle state of a [`Monitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorState {
    /// Constructed; no OS resources held.
    Created,
    /// A backend is open and events can be processed.
    Running,
    /// Stopped explicitly or by a fatal backend error. Terminal.
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Cross-thread request to end [`Monitor::process_blocking`].
///
/// Clones share the same flag. Triggering takes effect at the end of the
/// current wait slice.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Creates an untriggered handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the blocking loop to end.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`trigger`](Self::trigger) was called on any clone.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Watches the host for address changes and delivers them to a callback.
///
/// # State Machine
///
/// ```text
/// Created --start--> Running --stop / fatal error--> Stopped
/// ```
///
/// Creation touches no OS resources. [`start`](Self::start) opens exactly one
/// backend; [`stop`](Self::stop), a fatal backend error, or dropping the
/// monitor releases it exactly once. Every failing operation overwrites the
/// last-error slot.
///
/// # Thread Affinity
///
/// Events are delivered on the thread calling [`process`](Self::process).
/// The monitor is not `Send` on any platform: the callback and the backend
/// opener are not required to be `Send`. Build it on the thread that drives
/// it and stop it from elsewhere through a [`ShutdownHandle`]. On macOS the
/// backend is additionally bound to the run loop of the thread that called
/// `start`.
///
/// ```compile_fail
/// fn assert_send<T: Send>(_: &T) {}
///
/// let monitor = netut::monitor::Monitor::new(|_| {});
/// assert_send(&monitor);
/// ```
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use netut::monitor::{Monitor, ProcessOutcome};
///
/// let mut monitor = Monitor::new(|event| println!("{event}"));
/// monitor.start()?;
///
/// loop {
///     match monitor.process(Some(Duration::from_secs(1)))? {
///         ProcessOutcome::Processed(n) => println!("{n} event(s)"),
///         ProcessOutcome::TimedOut | ProcessOutcome::Interrupted => {}
///     }
/// }
/// # Ok::<(), netut::monitor::MonitorError>(())
/// ```
pub struct Monitor<B: Backend = PlatformBackend> {
    callback: Callback,
    opener: Opener<B>,
    backend: Option<B>,
    state: MonitorState,
    last_error: Option<LastError>,
    shutdown: ShutdownHandle,
    slice: Duration,
    interrupt_backoff: Duration,
}

impl Monitor {
    /// Creates a monitor backed by the platform notification mechanism.
    #[must_use]
    pub fn new(callback: impl FnMut(ChangeEvent) + 'static) -> Self {
        Self::with_backend(callback, PlatformBackend::open)
    }

    /// Creates a platform monitor from an optional callback.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::MissingCallback`] when `callback` is `None`.
    pub fn from_callback(callback: Option<Callback>) -> Result<Self, MonitorError> {
        callback.map(Self::new).ok_or(MonitorError::MissingCallback)
    }
}

impl<B: Backend> Monitor<B> {
    /// Creates a monitor that opens its backend with `opener` on start.
    ///
    /// This is the dependency-injection seam used with mock backends.
    #[must_use]
    pub fn with_backend(
        callback: impl FnMut(ChangeEvent) + 'static,
        opener: impl FnMut() -> Result<B, MonitorError> + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
            opener: Box::new(opener),
            backend: None,
            state: MonitorState::Created,
            last_error: None,
            shutdown: ShutdownHandle::new(),
            slice: DEFAULT_SLICE,
            interrupt_backoff: DEFAULT_INTERRUPT_BACKOFF,
        }
    }

    /// Sets the wait slice used by [`process_blocking`](Self::process_blocking).
    #[must_use]
    pub fn with_slice(mut self, slice: Duration) -> Self {
        self.slice = slice;
        self
    }

    /// Sets the pause after an interrupted wait in the blocking loop.
    #[must_use]
    pub fn with_interrupt_backoff(mut self, backoff: Duration) -> Self {
        self.interrupt_backoff = backoff;
        self
    }

    /// Uses an existing shutdown handle, so it can be shared before the
    /// monitor is created.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns a handle that ends [`process_blocking`](Self::process_blocking).
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> MonitorState {
        self.state
    }

    /// Returns true while a backend is open.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, MonitorState::Running)
    }

    /// Code of the last failed operation; `0` if none failed.
    #[must_use]
    pub fn last_error_code(&self) -> i32 {
        self.last_error.as_ref().map_or(0, |e| e.code)
    }

    /// Message of the last failed operation; empty if none failed.
    #[must_use]
    pub fn last_error_message(&self) -> &str {
        self.last_error.as_ref().map_or("", |e| e.message.as_str())
    }

    /// The last failed operation, if any.
    #[must_use]
    pub const fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// Opens the backend and moves to `Running`.
    ///
    /// On failure the monitor stays `Created` and nothing is left open.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidState`] if the monitor was already
    /// started, or the backend's open error.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.state != MonitorState::Created {
            return self.fail(MonitorError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        match (self.opener)() {
            Ok(backend) => {
                self.backend = Some(backend);
                self.state = MonitorState::Running;
                tracing::debug!("Monitor started");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to start monitor: {e}");
                self.fail(e)
            }
        }
    }

    /// Waits up to `timeout` for notifications and delivers their events.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` polls. Every event
    /// reaches the callback before this returns. A fatal backend error moves
    /// the monitor to `Stopped` and releases the backend.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NotRunning`] unless running, or the backend error.
    pub fn process(&mut self, timeout: Option<Duration>) -> Result<ProcessOutcome, MonitorError> {
        let Some(backend) = self.backend.as_mut() else {
            return self.fail(MonitorError::NotRunning);
        };

        let callback = &mut self.callback;
        let result = backend.process(timeout, &mut |event| {
            tracing::debug!("Address change: {event}");
            callback(event);
        });

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!("Monitor backend failed, stopping: {e}");
                    self.release();
                }
                self.fail(e)
            }
        }
    }

    /// Processes events in wait slices until the monitor stops or the
    /// shutdown handle is triggered.
    ///
    /// Interrupted waits pause for the interrupt backoff before retrying.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NotRunning`] unless running, or the first
    /// error returned by [`process`](Self::process).
    pub fn process_blocking(&mut self) -> Result<(), MonitorError> {
        if !self.is_running() {
            return self.fail(MonitorError::NotRunning);
        }

        while self.is_running() && !self.shutdown.is_triggered() {
            if self.process(Some(self.slice))? == ProcessOutcome::Interrupted {
                tracing::debug!("Wait interrupted, retrying in {:?}", self.interrupt_backoff);
                std::thread::sleep(self.interrupt_backoff);
            }
        }

        tracing::debug!("Blocking loop ended");
        Ok(())
    }

    /// Releases the backend and moves to `Stopped`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NotRunning`] unless running; nothing is
    /// released then.
    pub fn stop(&mut self) -> Result<(), MonitorError> {
        if !self.is_running() {
            return self.fail(MonitorError::NotRunning);
        }
        self.release();
        tracing::debug!("Monitor stopped");
        Ok(())
    }

    /// Stops the monitor if running, then frees it.
    pub fn destroy(self) {
        drop(self);
    }

    fn release(&mut self) {
        self.backend = None;
        self.state = MonitorState::Stopped;
    }

    fn fail<T>(&mut self, error: MonitorError) -> Result<T, MonitorError> {
        self.last_error = Some(LastError::from(&error));
        Err(error)
    }
}

impl<B: Backend> Drop for Monitor<B> {
    fn drop(&mut self) {
        if self.is_running() {
            self.release();
            tracing::debug!("Monitor released on drop");
        }
    }
}

impl<B: Backend> fmt::Debug for Monitor<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("state", &self.state)
            .field("last_error", &self.last_error)
            .field("slice", &self.slice)
            .field("interrupt_backoff", &self.interrupt_backoff)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
