//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use crate::monitor::{DEFAULT_INTERRUPT_BACKOFF, DEFAULT_SLICE};

/// Default config file name written by `netut init`.
pub const CONFIG_FILE: &str = "netut.toml";

/// Default wait slice of `watch`, in milliseconds.
#[allow(clippy::cast_possible_truncation)]
pub const SLICE_MS: u64 = DEFAULT_SLICE.as_millis() as u64;

/// Default sleep after an interrupted wait, in milliseconds.
#[allow(clippy::cast_possible_truncation)]
pub const INTERRUPT_BACKOFF_MS: u64 = DEFAULT_INTERRUPT_BACKOFF.as_millis() as u64;
