//! Network layer for enumerating interface addresses.
//!
//! This module provides types and traits for:
//! - Representing bound addresses ([`AddressRecord`], [`AddressList`])
//! - Fetching the host's address table ([`AddressFetcher`])
//! - Filtering records ([`filter`])
//! - JSON snapshots ([`json`])
//! - Platform-specific implementations ([`platform`])

mod address;
mod fetcher;
pub mod filter;
pub mod json;
pub mod platform;
#[cfg(windows)]
pub(crate) mod winsock;

pub use address::{
    AddressFamily, AddressList, AddressRecord, ipv4_prefix_length, ipv6_prefix_length,
};
pub use fetcher::{AddressFetcher, Enumerator, FetchError, UNSUPPORTED_CODE, enumerate};
pub use filter::{EnumerationFilter, FilterChain, NameRegexFilter, RecordFilter};
pub use json::{FormatError, to_json_string, write_json};
