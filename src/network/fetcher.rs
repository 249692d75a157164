//! Address fetching trait, error types and the enumerator built on top.

use super::filter::{EnumerationFilter, RecordFilter};
use super::platform::PlatformFetcher;
use super::{AddressFamily, AddressList, AddressRecord};
use thiserror::Error;

/// Error code reported when no enumeration backend exists for the platform.
pub const UNSUPPORTED_CODE: i32 = 99;

/// Error type for address fetching operations.
///
/// Describes what went wrong without dictating recovery strategy.
/// Callers decide how to handle each error variant.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Windows API call failed.
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),

    /// An OS call failed.
    #[error("{context}: {source}")]
    Io {
        /// The call that failed.
        context: &'static str,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Platform-specific error with a generic message.
    #[error("Platform error: {message}")]
    Platform {
        /// Error message describing the platform-specific failure.
        message: String,
    },

    /// No enumeration backend exists for this platform.
    #[error("Address enumeration is not supported on this platform")]
    Unsupported,
}

impl FetchError {
    /// Creates an `Io` error from the calling thread's last OS error.
    #[must_use]
    pub fn last_os_error(context: &'static str) -> Self {
        Self::Io {
            context,
            source: std::io::Error::last_os_error(),
        }
    }

    /// Stable, non-zero numeric code for this error.
    ///
    /// OS errors report their native code where one is available.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            #[cfg(windows)]
            Self::WindowsApi(e) => e.code().0,
            Self::Io { source, .. } => source.raw_os_error().filter(|c| *c != 0).unwrap_or(4),
            Self::Platform { .. } => 1,
            Self::Unsupported => UNSUPPORTED_CODE,
        }
    }
}

/// Trait for fetching the host's interface/address table.
///
/// # Design
///
/// - The platform walk lives behind this trait; filtering does not
/// - Enables dependency injection for testing with mock implementations
/// - Platform-specific implementations provided in [`super::platform`]
pub trait AddressFetcher {
    /// Fetches every IPv4/IPv6 address bound on the host, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the OS interface table cannot be read.
    ///
    /// # Implementation Notes
    ///
    /// - Records follow the OS enumeration order
    /// - Non-IP address families are skipped by the implementation
    /// - Must not mutate OS network state
    fn fetch(&self) -> Result<Vec<AddressRecord>, FetchError>;
}

/// Takes filtered point-in-time snapshots through an [`AddressFetcher`].
#[derive(Debug, Clone, Default)]
pub struct Enumerator<F = PlatformFetcher> {
    fetcher: F,
}

impl Enumerator {
    /// Creates an enumerator backed by the platform fetcher.
    #[must_use]
    pub fn platform() -> Self {
        Self::new(PlatformFetcher::default())
    }
}

impl<F: AddressFetcher> Enumerator<F> {
    /// Creates an enumerator over the given fetcher.
    #[must_use]
    pub const fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Enumerates addresses, keeping those accepted by `filter`.
    ///
    /// Never fails: a fetch error is carried inside the returned list.
    pub fn enumerate_with(&self, filter: &dyn RecordFilter) -> AddressList {
        match self.fetcher.fetch() {
            Ok(records) => {
                let total = records.len();
                let kept: Vec<_> = records.into_iter().filter(|r| filter.matches(r)).collect();
                tracing::debug!("Enumerated {total} address(es), kept {}", kept.len());
                AddressList::from_records(kept)
            }
            Err(e) => {
                tracing::warn!("Address enumeration failed: {e}");
                AddressList::failed(e)
            }
        }
    }

    /// Enumerates addresses with the three inclusion flags.
    pub fn enumerate(
        &self,
        include_ipv6: bool,
        include_loopback: bool,
        include_down: bool,
    ) -> AddressList {
        self.enumerate_with(&EnumerationFilter::new(
            include_ipv6,
            include_loopback,
            include_down,
        ))
    }

    /// IPv4 addresses of up, non-loopback interfaces.
    pub fn ipv4_addresses(&self) -> AddressList {
        self.enumerate_with(&EnumerationFilter::IPV4)
    }

    /// IPv6 addresses of up, non-loopback interfaces.
    pub fn ipv6_addresses(&self) -> AddressList {
        let mut list = self.enumerate_with(&EnumerationFilter::ALL_FAMILIES);
        list.retain(|r| r.family() == AddressFamily::V6);
        list
    }

    /// IPv4 and IPv6 addresses of up, non-loopback interfaces.
    pub fn all_addresses(&self) -> AddressList {
        self.enumerate_with(&EnumerationFilter::ALL_FAMILIES)
    }
}

/// Enumerates host addresses with the platform fetcher.
///
/// See [`Enumerator::enumerate`].
#[must_use]
pub fn enumerate(include_ipv6: bool, include_loopback: bool, include_down: bool) -> AddressList {
    Enumerator::platform().enumerate(include_ipv6, include_loopback, include_down)
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
