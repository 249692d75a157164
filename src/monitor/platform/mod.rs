//! Platform-specific change notification backends.
//!
//! This module provides conditional compilation for platform-specific
//! implementations of the [`Backend`](super::Backend) trait.
//!
//! # Platform Support
//!
//! - **Linux**: rtnetlink socket subscribed to the address groups.
//! - **macOS**: SystemConfiguration dynamic store driven by a CFRunLoop.
//! - **Windows**: `NotifyIpInterfaceChange` via the `windows` crate.
//! - **Anything else**: starting a monitor fails with `MonitorError::Unsupported`.

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
mod netlink;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(windows)]
mod windows;

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod unsupported;

#[cfg(target_os = "linux")]
pub use linux::LinuxBackend as PlatformBackend;

#[cfg(target_os = "macos")]
pub use macos::MacosBackend as PlatformBackend;

#[cfg(windows)]
pub use self::windows::WindowsBackend as PlatformBackend;

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
pub use unsupported::UnsupportedBackend as PlatformBackend;
