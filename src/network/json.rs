//! JSON snapshot of an [`AddressList`].
//!
//! Successful lists serialize as
//! `{"count":N,"addresses":[{"interface","address","family","prefix_length","status","type"}],"error":false}`.
//! Failed lists serialize as `{"error":true,"code":C,"message":"..."}`.

use serde::Serialize;
use thiserror::Error;

use super::{AddressFamily, AddressList, AddressRecord};

/// Error type for JSON formatting.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The destination buffer cannot hold the whole document.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Size of the complete document.
        needed: usize,
        /// Size of the destination buffer.
        available: usize,
    },

    /// Serialization failed.
    #[error("Failed to serialize address list: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Snapshot<'a> {
    count: usize,
    addresses: Vec<Entry<'a>>,
    error: bool,
}

#[derive(Serialize)]
struct Entry<'a> {
    interface: &'a str,
    address: String,
    family: AddressFamily,
    prefix_length: u8,
    status: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> From<&'a AddressRecord> for Entry<'a> {
    fn from(record: &'a AddressRecord) -> Self {
        Self {
            interface: record.interface(),
            address: record.address().to_string(),
            family: record.family(),
            prefix_length: record.prefix_length(),
            status: if record.is_up() { "up" } else { "down" },
            kind: if record.is_loopback() {
                "loopback"
            } else {
                "regular"
            },
        }
    }
}

#[derive(Serialize)]
struct Failure {
    error: bool,
    code: i32,
    message: String,
}

/// Serializes the list into an owned JSON string.
///
/// # Errors
///
/// Returns [`FormatError::Serialize`] if serialization fails.
pub fn to_json_string(list: &AddressList) -> Result<String, FormatError> {
    let json = if let Some(error) = list.error() {
        serde_json::to_string(&Failure {
            error: true,
            code: error.code(),
            message: error.to_string(),
        })?
    } else {
        serde_json::to_string(&Snapshot {
            count: list.len(),
            addresses: list.iter().map(Entry::from).collect(),
            error: false,
        })?
    };
    Ok(json)
}

/// Writes the JSON document into `buffer`, returning the number of bytes written.
///
/// The document is written whole or not at all: when `buffer` is too small,
/// nothing is written and [`FormatError::BufferTooSmall`] is returned.
///
/// # Errors
///
/// Returns [`FormatError::BufferTooSmall`] if the document does not fit, or
/// [`FormatError::Serialize`] if serialization fails.
pub fn write_json(list: &AddressList, buffer: &mut [u8]) -> Result<usize, FormatError> {
    let json = to_json_string(list)?;
    let bytes = json.as_bytes();
    if bytes.len() > buffer.len() {
        return Err(FormatError::BufferTooSmall {
            needed: bytes.len(),
            available: buffer.len(),
        });
    }
    buffer[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}
