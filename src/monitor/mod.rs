//! Monitor layer for detecting address changes as the OS reports them.
//!
//! This module provides types and functions for:
//! - Representing change events ([`ChangeEvent`], [`ChangeKind`])
//! - The monitor lifecycle and event loop ([`Monitor`], [`ShutdownHandle`])
//! - Error handling ([`MonitorError`], [`LastError`])
//! - The platform seam ([`Backend`], [`platform`])

mod backend;
mod driver;
mod error;
mod event;
pub mod platform;

pub use backend::{Backend, ProcessOutcome, wait_from_millis};
pub use driver::{
    Callback, DEFAULT_INTERRUPT_BACKOFF, DEFAULT_SLICE, Monitor, MonitorState, ShutdownHandle,
};
pub use error::{LastError, MonitorError};
pub use event::{ChangeEvent, ChangeKind};
