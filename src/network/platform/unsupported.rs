//! Fallback fetcher for platforms without an enumeration backend.

use crate::network::{AddressFetcher, AddressRecord, FetchError};

/// Fetcher that always reports [`FetchError::Unsupported`].
#[derive(Debug, Clone, Default)]
pub struct UnsupportedFetcher;

impl AddressFetcher for UnsupportedFetcher {
    fn fetch(&self) -> Result<Vec<AddressRecord>, FetchError> {
        Err(FetchError::Unsupported)
    }
}
