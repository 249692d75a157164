//! macOS change notifications from the SystemConfiguration dynamic store.
//!
//! The store callback only records which keys changed. After each run of the
//! run loop the backend reads the current address sets of the interfaces
//! named by those keys and reports them as `Changed`; the store does not say
//! whether an address was added or removed.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::dictionary::CFDictionary;
use core_foundation::propertylist::CFPropertyList;
use core_foundation::runloop::{
    CFRunLoop, CFRunLoopRunResult, CFRunLoopSource, kCFRunLoopDefaultMode,
};
use core_foundation::string::CFString;
use system_configuration::dynamic_store::{
    SCDynamicStore, SCDynamicStoreBuilder, SCDynamicStoreCallBackContext,
};

use crate::monitor::{Backend, ChangeEvent, MonitorError, ProcessOutcome};

const STORE_NAME: &str = "netut_ip_monitor";

const GLOBAL_IPV4: &str = "State:/Network/Global/IPv4";
const GLOBAL_IPV6: &str = "State:/Network/Global/IPv6";
const INTERFACE_IPV4_PATTERN: &str = "State:/Network/Interface/.*/IPv4";
const INTERFACE_IPV6_PATTERN: &str = "State:/Network/Interface/.*/IPv6";

const INTERFACE_PREFIX: &str = "State:/Network/Interface/";

/// Stand-in for an unbounded run; the run loop takes seconds as a double.
const FOREVER: Duration = Duration::from_secs(10_000_000_000);

type PendingKeys = Arc<Mutex<Vec<String>>>;

/// macOS implementation of [`Backend`] driving the current thread's run loop.
///
/// The run-loop source is attached to the run loop of the thread that opened
/// the backend, so `process` must be called on that thread.
pub struct MacosBackend {
    // Declared before `store` so the source is released first.
    source: CFRunLoopSource,
    run_loop: CFRunLoop,
    store: SCDynamicStore,
    pending: PendingKeys,
}

impl MacosBackend {
    /// Creates the dynamic store, registers the watched keys and attaches the
    /// run-loop source to the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::RunLoop`] naming the failed step. Whatever was
    /// created before the failure is released.
    #[cfg(not(tarpaulin_include))]
    pub fn open() -> Result<Self, MonitorError> {
        let pending = PendingKeys::default();
        let context = SCDynamicStoreCallBackContext {
            callout: on_store_change,
            info: Arc::clone(&pending),
        };

        let store = SCDynamicStoreBuilder::new(STORE_NAME)
            .callback_context(context)
            .build()
            .ok_or(MonitorError::RunLoop {
                reason: "failed to create dynamic store",
            })?;

        let keys = CFArray::from_CFTypes(&[
            CFString::from_static_string(GLOBAL_IPV4),
            CFString::from_static_string(GLOBAL_IPV6),
        ]);
        let patterns = CFArray::from_CFTypes(&[
            CFString::from_static_string(INTERFACE_IPV4_PATTERN),
            CFString::from_static_string(INTERFACE_IPV6_PATTERN),
        ]);
        if !store.set_notification_keys(&keys, &patterns) {
            return Err(MonitorError::RunLoop {
                reason: "failed to set notification keys",
            });
        }

        let source = store.create_run_loop_source();
        let run_loop = CFRunLoop::get_current();
        // SAFETY: reading an immutable framework constant.
        run_loop.add_source(&source, unsafe { kCFRunLoopDefaultMode });

        tracing::debug!("Watching dynamic store for address changes");
        Ok(Self {
            source,
            run_loop,
            store,
            pending,
        })
    }

    fn take_pending(&self) -> Vec<String> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Emits one `Changed` event per current address of every interface
    /// named by `keys`.
    fn emit_changes(&self, keys: &[String], emit: &mut dyn FnMut(ChangeEvent)) -> usize {
        let interfaces: BTreeSet<String> = keys
            .iter()
            .filter_map(|key| match classify_key(key)? {
                KeyTarget::Interface(name) => Some(name.to_string()),
                KeyTarget::Global => self.primary_interface(key),
            })
            .collect();

        let mut count = 0;
        for interface in &interfaces {
            for family in ["IPv4", "IPv6"] {
                let key = format!("{INTERFACE_PREFIX}{interface}/{family}");
                for address in self.addresses(&key) {
                    emit(ChangeEvent::changed(interface.clone(), address));
                    count += 1;
                }
            }
        }
        count
    }

    fn dictionary(&self, key: &str) -> Option<CFDictionary> {
        self.store
            .get(CFString::new(key))
            .and_then(CFPropertyList::downcast_into::<CFDictionary>)
    }

    /// Reads `PrimaryInterface` from a global state key.
    fn primary_interface(&self, key: &str) -> Option<String> {
        let dictionary = self.dictionary(key)?;
        let value = dictionary.find(CFString::from_static_string("PrimaryInterface").to_void())?;
        // SAFETY: the dictionary keeps the value alive; the get rule retains it.
        let value = unsafe { CFType::wrap_under_get_rule(*value) };
        value.downcast::<CFString>().map(|s| s.to_string())
    }

    /// Reads and parses the `Addresses` array of an interface state key.
    fn addresses(&self, key: &str) -> Vec<IpAddr> {
        let Some(dictionary) = self.dictionary(key) else {
            return Vec::new();
        };
        let Some(value) = dictionary.find(CFString::from_static_string("Addresses").to_void())
        else {
            return Vec::new();
        };
        // SAFETY: the dictionary keeps the value alive; the get rule retains it.
        let value = unsafe { CFType::wrap_under_get_rule(*value) };
        let Some(array) = value.downcast_into::<CFArray>() else {
            return Vec::new();
        };

        array
            .iter()
            .filter_map(|item| {
                // SAFETY: the array keeps the item alive; the get rule retains it.
                let item = unsafe { CFType::wrap_under_get_rule(*item) };
                item.downcast::<CFString>()
            })
            .filter_map(|text| parse_address(&text.to_string()))
            .collect()
    }
}

impl Backend for MacosBackend {
    fn process(
        &mut self,
        timeout: Option<Duration>,
        emit: &mut dyn FnMut(ChangeEvent),
    ) -> Result<ProcessOutcome, MonitorError> {
        // SAFETY: reading an immutable framework constant.
        let mode = unsafe { kCFRunLoopDefaultMode };
        let result = CFRunLoop::run_in_mode(mode, timeout.unwrap_or(FOREVER), true);
        let keys = self.take_pending();

        match result {
            CFRunLoopRunResult::Finished => {
                return Err(MonitorError::RunLoop {
                    reason: "run loop finished, no sources attached",
                });
            }
            CFRunLoopRunResult::Stopped if keys.is_empty() => {
                return Ok(ProcessOutcome::Interrupted);
            }
            _ if keys.is_empty() => return Ok(ProcessOutcome::TimedOut),
            _ => {}
        }

        tracing::debug!("{} dynamic store key(s) changed", keys.len());
        Ok(ProcessOutcome::Processed(self.emit_changes(&keys, emit)))
    }
}

impl Drop for MacosBackend {
    fn drop(&mut self) {
        // SAFETY: reading an immutable framework constant.
        self.run_loop
            .remove_source(&self.source, unsafe { kCFRunLoopDefaultMode });
        tracing::debug!("Dynamic store source removed");
    }
}

impl std::fmt::Debug for MacosBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacosBackend").finish_non_exhaustive()
    }
}

/// Store callback: records the changed keys for the next `process` call.
fn on_store_change(_store: SCDynamicStore, changed: CFArray<CFString>, pending: &mut PendingKeys) {
    let mut queue = pending.lock().unwrap_or_else(PoisonError::into_inner);
    queue.extend(changed.iter().map(|key| key.to_string()));
}

/// What a changed key refers to.
#[derive(Debug, PartialEq, Eq)]
enum KeyTarget<'a> {
    /// `State:/Network/Interface/<name>/IPv4|IPv6`.
    Interface(&'a str),
    /// `State:/Network/Global/IPv4|IPv6`, resolved through `PrimaryInterface`.
    Global,
}

fn classify_key(key: &str) -> Option<KeyTarget<'_>> {
    if key == GLOBAL_IPV4 || key == GLOBAL_IPV6 {
        return Some(KeyTarget::Global);
    }
    let rest = key.strip_prefix(INTERFACE_PREFIX)?;
    let (name, family) = rest.rsplit_once('/')?;
    if name.is_empty() || !matches!(family, "IPv4" | "IPv6") {
        return None;
    }
    Some(KeyTarget::Interface(name))
}

/// Parses a store address, dropping any `%scope` suffix.
fn parse_address(text: &str) -> Option<IpAddr> {
    let bare = text.split_once('%').map_or(text, |(address, _)| address);
    bare.parse().ok()
}
