//! Application execution logic.
//!
//! `list` prints one snapshot; `watch` drives the change monitor on a
//! blocking thread until a shutdown signal arrives.

use std::time::Duration;

use thiserror::Error;
use tokio::signal;

use netut::config::ValidatedConfig;
use netut::monitor::{ChangeEvent, Monitor, MonitorError, ShutdownHandle};
use netut::network::filter::NameMatcher;
use netut::network::{AddressList, Enumerator, FilterChain, FormatError, to_json_string};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The OS refused to enumerate addresses.
    #[error("Address enumeration failed with code {code}")]
    Enumerate {
        /// Stable error code of the failure
        code: i32,
    },

    /// `list --interface` named an interface without matching addresses.
    #[error("No address found for interface '{0}'")]
    InterfaceNotFound(String),

    /// Failed to render the JSON snapshot.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The change monitor failed.
    #[error("Monitor failed: {0}")]
    Monitor(#[from] MonitorError),

    /// The monitor thread panicked or was cancelled.
    #[error("Monitor thread ended abnormally: {0}")]
    MonitorThread(#[source] tokio::task::JoinError),

    /// Failed to create the async runtime.
    #[error("Failed to create Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Failed to install the signal handlers.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// Options moved onto the monitor thread.
struct WatchOptions {
    filter: FilterChain,
    slice: Duration,
    interrupt_backoff: Duration,
    json: bool,
}

impl From<ValidatedConfig> for WatchOptions {
    fn from(config: ValidatedConfig) -> Self {
        Self {
            filter: config.filter,
            slice: config.slice,
            interrupt_backoff: config.interrupt_backoff,
            json: config.json,
        }
    }
}

/// Prints a snapshot of the host's addresses.
///
/// # Errors
///
/// Returns an error if enumeration fails, the requested interface has no
/// address, or the JSON document cannot be rendered. An enumeration failure
/// is printed in the requested format before it is returned.
#[cfg(not(tarpaulin_include))]
pub fn list(config: &ValidatedConfig) -> Result<(), RunError> {
    let list = Enumerator::platform().enumerate_with(&config.filter);
    if list.is_error() {
        print!("{}", render_snapshot(&list, config.json)?);
        return Err(RunError::Enumerate {
            code: list.error_code(),
        });
    }

    print!(
        "{}",
        render_list(&list, config.interface.as_deref(), config.json)?
    );
    Ok(())
}

/// Renders the snapshot, or the first address of `interface` when set.
fn render_list(
    list: &AddressList,
    interface: Option<&str>,
    json: bool,
) -> Result<String, RunError> {
    let Some(name) = interface else {
        return render_snapshot(list, json);
    };

    let record = list
        .find_by_interface(name)
        .ok_or_else(|| RunError::InterfaceNotFound(name.to_string()))?;
    render_snapshot(&AddressList::from_records(vec![record.clone()]), json)
}

fn render_snapshot(list: &AddressList, json: bool) -> Result<String, RunError> {
    if json {
        Ok(format!("{}\n", to_json_string(list)?))
    } else {
        Ok(list.to_string())
    }
}

/// Renders one event as a text line or a JSON line.
fn render_event(event: &ChangeEvent, json: bool) -> Result<String, serde_json::Error> {
    if json {
        serde_json::to_string(event)
    } else {
        Ok(event.to_string())
    }
}

/// Prints change events until Ctrl+C (or SIGTERM on Unix).
///
/// The monitor is built on the blocking thread that drives it; the async side
/// only waits for the signal and triggers the shared [`ShutdownHandle`].
///
/// # Errors
///
/// Returns an error if the monitor fails to start or fails fatally while
/// running, or if the signal handlers cannot be installed.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires:
/// - Platform-specific change notification APIs
/// - Real async runtime with signal handling
#[cfg(not(tarpaulin_include))]
pub async fn watch(config: ValidatedConfig) -> Result<(), RunError> {
    let shutdown = ShutdownHandle::new();
    let options = WatchOptions::from(config);
    let worker_shutdown = shutdown.clone();

    let mut worker =
        tokio::task::spawn_blocking(move || watch_blocking(options, worker_shutdown));

    tokio::select! {
        result = &mut worker => {
            return result.map_err(RunError::MonitorThread)?.map_err(RunError::from);
        }
        signal = shutdown_signal() => {
            signal?;
            tracing::info!("Shutdown signal received, stopping...");
            shutdown.trigger();
        }
    }

    worker
        .await
        .map_err(RunError::MonitorThread)?
        .map_err(RunError::from)
}

/// Runs the monitor on the current thread until shutdown or a fatal error.
#[cfg(not(tarpaulin_include))]
fn watch_blocking(options: WatchOptions, shutdown: ShutdownHandle) -> Result<(), MonitorError> {
    let WatchOptions {
        filter,
        slice,
        interrupt_backoff,
        json,
    } = options;

    let mut monitor = Monitor::new(move |event: ChangeEvent| print_event(&filter, &event, json))
        .with_slice(slice)
        .with_interrupt_backoff(interrupt_backoff)
        .with_shutdown(shutdown);

    monitor.start()?;
    tracing::info!("Watching for address changes (Ctrl+C to stop)");

    let result = monitor.process_blocking();
    if let Err(e) = &result {
        tracing::error!("Monitor stopped: {e}");
    }
    monitor.destroy();
    result
}

fn print_event(filter: &FilterChain, event: &ChangeEvent, json: bool) {
    if !filter.matches_name(&event.interface) {
        tracing::debug!("Filtered out: {event}");
        return;
    }

    match render_event(event, json) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::error!("Failed to render event: {e}"),
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() -> Result<(), RunError> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RunError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => result.map_err(RunError::Signal),
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RunError::Signal)
    }
}
