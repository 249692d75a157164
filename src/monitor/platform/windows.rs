//! Windows change notifications using `NotifyIpInterfaceChange`.

use crate::monitor::{Backend, ChangeEvent, ChangeKind, MonitorError, ProcessOutcome};
use crate::network::FetchError;
use crate::network::platform::windows::fetch_adapters;
use crate::network::winsock::WinsockGuard;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use windows::Win32::Foundation::{HANDLE, NO_ERROR, WIN32_ERROR};
use windows::Win32::NetworkManagement::IpHelper::{
    CancelMibChangeNotify2, MIB_IPINTERFACE_ROW, MIB_NOTIFICATION_TYPE, MibAddInstance,
    MibDeleteInstance, NotifyIpInterfaceChange,
};
use windows::Win32::Networking::WinSock::AF_UNSPEC;

/// One OS notification, as posted by the callback thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Notification {
    index: u32,
    kind: MIB_NOTIFICATION_TYPE,
}

/// Windows implementation of [`Backend`] using `NotifyIpInterfaceChange`.
///
/// The OS invokes the registered callback on its own thread pool; the
/// callback only posts the interface index and notification type to a
/// channel. Adapter lookup and event delivery happen in `process`, on the
/// caller's thread.
pub struct WindowsBackend {
    /// Cancels the registration on drop. Declared first so no callback can
    /// run once the other fields are released.
    #[allow(dead_code)]
    handle: NotificationHandle,
    receiver: mpsc::Receiver<Notification>,
    _winsock: WinsockGuard,
}

impl std::fmt::Debug for WindowsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowsBackend").finish_non_exhaustive()
    }
}

impl WindowsBackend {
    /// Registers for IP interface change notifications.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::WindowsApi`] if Winsock initialization or the
    /// registration fails; nothing stays registered.
    pub fn open() -> Result<Self, MonitorError> {
        let winsock = WinsockGuard::acquire()?;
        let (sender, receiver) = mpsc::channel();
        let (handle, context_ptr) = register_notification(sender)?;

        tracing::debug!("Registered for IP interface change notifications");
        Ok(Self {
            handle: NotificationHandle {
                handle,
                context_ptr,
            },
            receiver,
            _winsock: winsock,
        })
    }

    /// Waits for the first notification, then collects the queued rest.
    fn receive(&self, timeout: Option<Duration>) -> Result<Vec<Notification>, RecvTimeoutError> {
        let first = match timeout {
            Some(timeout) => self.receiver.recv_timeout(timeout)?,
            None => self
                .receiver
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected)?,
        };

        let mut notifications = vec![first];
        for next in self.receiver.try_iter() {
            if !notifications.contains(&next) {
                notifications.push(next);
            }
        }
        Ok(notifications)
    }
}

impl Backend for WindowsBackend {
    fn process(
        &mut self,
        timeout: Option<Duration>,
        emit: &mut dyn FnMut(ChangeEvent),
    ) -> Result<ProcessOutcome, MonitorError> {
        let notifications = match self.receive(timeout) {
            Ok(notifications) => notifications,
            Err(RecvTimeoutError::Timeout) => return Ok(ProcessOutcome::TimedOut),
            Err(RecvTimeoutError::Disconnected) => return Err(MonitorError::Disconnected),
        };

        let adapters = fetch_adapters().map_err(from_fetch_error)?;

        let mut count = 0;
        for notification in &notifications {
            let kind = change_kind(notification.kind);
            let mut matched = false;

            for adapter in adapters.iter().filter(|a| a.has_index(notification.index)) {
                matched = true;
                for (address, _) in &adapter.addresses {
                    emit(ChangeEvent::new(adapter.name.clone(), *address, kind));
                    count += 1;
                }
            }

            if !matched {
                tracing::debug!(
                    "Interface index {} not in adapter table, notification skipped",
                    notification.index
                );
            }
        }

        Ok(ProcessOutcome::Processed(count))
    }
}

/// Maps the OS notification type to the event kind.
const fn change_kind(kind: MIB_NOTIFICATION_TYPE) -> ChangeKind {
    if kind.0 == MibAddInstance.0 {
        ChangeKind::Added
    } else if kind.0 == MibDeleteInstance.0 {
        ChangeKind::Removed
    } else {
        ChangeKind::Changed
    }
}

fn from_fetch_error(error: FetchError) -> MonitorError {
    match error {
        FetchError::WindowsApi(e) => MonitorError::WindowsApi(e),
        FetchError::Io { context, source } => MonitorError::Io { context, source },
        FetchError::Platform { message } => MonitorError::Io {
            context: "GetAdaptersAddresses",
            source: std::io::Error::other(message),
        },
        FetchError::Unsupported => MonitorError::Unsupported,
    }
}

/// RAII wrapper for the notification handle.
///
/// Cancels the registration when dropped, then reclaims the leaked
/// `CallbackContext`, closing the channel.
struct NotificationHandle {
    handle: HANDLE,
    /// Raw pointer to reclaim the leaked `CallbackContext` after cancellation.
    context_ptr: *mut CallbackContext,
}

impl Drop for NotificationHandle {
    fn drop(&mut self) {
        // SAFETY: We own this handle and it was returned by NotifyIpInterfaceChange.
        // CancelMibChangeNotify2 is safe to call once per handle.
        let _ = unsafe { CancelMibChangeNotify2(self.handle) };

        // SAFETY: After CancelMibChangeNotify2 returns, Windows guarantees the
        // callback won't fire again, so we can safely reclaim the context.
        drop(unsafe { Box::from_raw(self.context_ptr) });
        tracing::debug!("IP interface change notifications cancelled");
    }
}

/// Context passed to the Windows callback.
struct CallbackContext {
    sender: mpsc::Sender<Notification>,
}

/// Registers for IP interface change notifications.
///
/// Returns both the notification handle and the context pointer, so the caller
/// can store them together and reclaim the context when cancelling.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires actual
/// Windows API interaction.
#[cfg(not(tarpaulin_include))]
fn register_notification(
    sender: mpsc::Sender<Notification>,
) -> Result<(HANDLE, *mut CallbackContext), MonitorError> {
    // Leak the context so it lives for the lifetime of the notification.
    // The caller is responsible for reclaiming it after cancellation.
    let context_ptr = Box::into_raw(Box::new(CallbackContext { sender }));
    let void_ptr = context_ptr.cast::<std::ffi::c_void>();

    let mut handle = HANDLE::default();

    // SAFETY: We provide valid callback and context. The callback will be called
    // from the Windows thread pool when IP interface changes occur.
    let result = unsafe {
        NotifyIpInterfaceChange(
            AF_UNSPEC,
            Some(ip_interface_change_callback),
            Some(void_ptr),
            false, // InitialNotification
            &raw mut handle,
        )
    };

    if result != NO_ERROR {
        // SAFETY: Registration failed, so Windows won't call the callback
        drop(unsafe { Box::from_raw(context_ptr) });
        return Err(windows::core::Error::from(WIN32_ERROR(result.0)).into());
    }

    Ok((handle, context_ptr))
}

/// Callback function for `NotifyIpInterfaceChange`.
///
/// Runs on an OS thread; only posts the notification.
///
/// # Safety
///
/// - `caller_context` must be a valid pointer to `CallbackContext`
/// - `row` may be null, in which case nothing is posted
///
/// # Coverage Note
///
/// This function is excluded from coverage because it's only called by Windows.
#[cfg(not(tarpaulin_include))]
unsafe extern "system" fn ip_interface_change_callback(
    caller_context: *const std::ffi::c_void,
    row: *const MIB_IPINTERFACE_ROW,
    notification_type: MIB_NOTIFICATION_TYPE,
) {
    if caller_context.is_null() {
        return;
    }
    // SAFETY: `row` is either null or valid for the duration of the callback.
    let Some(row) = (unsafe { row.as_ref() }) else {
        return;
    };

    // SAFETY: caller_context was set by us in register_notification
    // and points to a valid CallbackContext.
    let context = unsafe { &*(caller_context.cast::<CallbackContext>()) };

    // The receiver may already be gone during teardown.
    let _ = context.sender.send(Notification {
        index: row.InterfaceIndex,
        kind: notification_type,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use windows::Win32::NetworkManagement::IpHelper::MibParameterNotification;

    #[test]
    fn add_instance_maps_to_added() {
        assert_eq!(change_kind(MibAddInstance), ChangeKind::Added);
    }

    #[test]
    fn delete_instance_maps_to_removed() {
        assert_eq!(change_kind(MibDeleteInstance), ChangeKind::Removed);
    }

    #[test]
    fn parameter_change_maps_to_changed() {
        assert_eq!(change_kind(MibParameterNotification), ChangeKind::Changed);
    }

    #[test]
    fn fetch_errors_keep_their_meaning() {
        assert!(matches!(
            from_fetch_error(FetchError::Unsupported),
            MonitorError::Unsupported
        ));
        assert!(from_fetch_error(FetchError::Platform {
            message: "x".to_string()
        })
        .is_fatal());
    }

    // Integration test: registers with the real notification API.
    #[test]
    fn open_and_poll_without_changes() {
        let mut backend = WindowsBackend::open().expect("registration failed");

        let outcome = backend
            .process(Some(Duration::ZERO), &mut |_| {})
            .unwrap();

        assert!(matches!(
            outcome,
            ProcessOutcome::TimedOut | ProcessOutcome::Processed(_)
        ));
    }

    #[test]
    fn drop_cancels_registration() {
        let backend = WindowsBackend::open().expect("registration failed");
        drop(backend);

        // A second registration succeeds after the first was released.
        assert!(WindowsBackend::open().is_ok());
    }
}
