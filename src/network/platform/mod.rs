//! Platform-specific address fetcher implementations.
//!
//! This module provides conditional compilation for platform-specific
//! implementations of the [`AddressFetcher`](super::AddressFetcher) trait.
//!
//! # Platform Support
//!
//! - **Linux / macOS / other Unix**: `getifaddrs` via `libc`.
//! - **Windows**: `GetAdaptersAddresses` via the `windows` crate.
//! - **Anything else**: every fetch fails with `FetchError::Unsupported`.

#[cfg(unix)]
mod unix;

#[cfg(windows)]
pub(crate) mod windows;

#[cfg(not(any(unix, windows)))]
mod unsupported;

#[cfg(unix)]
pub use unix::UnixFetcher as PlatformFetcher;

#[cfg(windows)]
pub use self::windows::WindowsFetcher as PlatformFetcher;

#[cfg(not(any(unix, windows)))]
pub use unsupported::UnsupportedFetcher as PlatformFetcher;
