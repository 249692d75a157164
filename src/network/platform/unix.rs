//! Unix address fetching using `getifaddrs`.

use std::ffi::CStr;
use std::mem::size_of;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ptr;

use libc::c_uint;

use crate::network::{
    AddressFetcher, AddressRecord, FetchError, ipv4_prefix_length, ipv6_prefix_length,
};

/// Unix implementation of [`AddressFetcher`] using `getifaddrs`.
///
/// # Example
///
/// ```no_run
/// use netut::network::{AddressFetcher, platform::PlatformFetcher};
///
/// let fetcher = PlatformFetcher::default();
/// for record in fetcher.fetch().expect("getifaddrs failed") {
///     println!("{}: {}/{}", record.interface(), record.address(), record.prefix_length());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnixFetcher {
    _private: (),
}

impl UnixFetcher {
    /// Creates a new Unix fetcher.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl AddressFetcher for UnixFetcher {
    fn fetch(&self) -> Result<Vec<AddressRecord>, FetchError> {
        let table = InterfaceTable::load()?;
        let mut records = Vec::new();

        let mut current = table.head;
        while !current.is_null() {
            // SAFETY: `current` is a node of the list owned by `table`, which
            // stays alive for the whole walk.
            let entry = unsafe { &*current };
            if let Some(record) = parse_entry(entry) {
                records.push(record);
            }
            current = entry.ifa_next;
        }

        Ok(records)
    }
}

/// Owns the linked list returned by `getifaddrs`.
struct InterfaceTable {
    head: *mut libc::ifaddrs,
}

impl InterfaceTable {
    fn load() -> Result<Self, FetchError> {
        let mut head = ptr::null_mut();
        // SAFETY: `head` is a valid out-pointer; on success the list must be
        // released with `freeifaddrs`, which `Drop` does.
        if unsafe { libc::getifaddrs(&raw mut head) } != 0 {
            return Err(FetchError::last_os_error("getifaddrs"));
        }
        Ok(Self { head })
    }
}

impl Drop for InterfaceTable {
    fn drop(&mut self) {
        if !self.head.is_null() {
            // SAFETY: `head` came from a successful `getifaddrs` and is freed once.
            unsafe { libc::freeifaddrs(self.head) };
        }
    }
}

/// Converts one `ifaddrs` node into a record. Non-IP families yield `None`.
fn parse_entry(entry: &libc::ifaddrs) -> Option<AddressRecord> {
    // SAFETY: `ifa_addr` is either null or points to a sockaddr owned by the table.
    let sockaddr = unsafe { entry.ifa_addr.as_ref()? };
    let address = sockaddr_to_ip(sockaddr)?;

    if entry.ifa_name.is_null() {
        return None;
    }
    // SAFETY: `ifa_name` is a NUL-terminated string owned by the table.
    let name = unsafe { CStr::from_ptr(entry.ifa_name) }
        .to_string_lossy()
        .into_owned();

    let flags = entry.ifa_flags;
    let is_up = flags & (libc::IFF_UP as c_uint) != 0;
    let is_loopback = flags & (libc::IFF_LOOPBACK as c_uint) != 0;

    // SAFETY: `ifa_netmask` is either null or points to a sockaddr owned by the table.
    let prefix_length = unsafe { entry.ifa_netmask.as_ref() }
        .map_or(0, |mask| netmask_prefix_length(mask, &address));

    Some(AddressRecord::new(
        name,
        address,
        prefix_length,
        is_up,
        is_loopback,
    ))
}

/// Extracts the IP address from an `AF_INET` / `AF_INET6` sockaddr.
fn sockaddr_to_ip(sockaddr: &libc::sockaddr) -> Option<IpAddr> {
    match i32::from(sockaddr.sa_family) {
        libc::AF_INET => {
            // SAFETY: the family says this is a sockaddr_in.
            let sin: libc::sockaddr_in = unsafe { read_sockaddr(sockaddr) };
            Some(IpAddr::V4(Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes())))
        }
        libc::AF_INET6 => {
            // SAFETY: the family says this is a sockaddr_in6.
            let sin6: libc::sockaddr_in6 = unsafe { read_sockaddr(sockaddr) };
            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}

/// Counts the mask bits of a netmask sockaddr.
///
/// The family of the address decides the layout; netmask family fields are
/// not reliable on every platform.
fn netmask_prefix_length(mask: &libc::sockaddr, address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => {
            // SAFETY: netmasks of IPv4 addresses use the sockaddr_in layout.
            let sin: libc::sockaddr_in = unsafe { read_sockaddr(mask) };
            ipv4_prefix_length(sin.sin_addr.s_addr.to_ne_bytes())
        }
        IpAddr::V6(_) => {
            // SAFETY: netmasks of IPv6 addresses use the sockaddr_in6 layout.
            let sin6: libc::sockaddr_in6 = unsafe { read_sockaddr(mask) };
            ipv6_prefix_length(sin6.sin6_addr.s6_addr)
        }
    }
}

/// Copies a sockaddr into a zeroed `T`, never reading past the sockaddr's length.
///
/// # Safety
///
/// `sockaddr` must point to at least `sockaddr_len(sockaddr, size_of::<T>())`
/// readable bytes, and `T` must be a plain C sockaddr type.
unsafe fn read_sockaddr<T: Copy>(sockaddr: &libc::sockaddr) -> T {
    // SAFETY: sockaddr_in / sockaddr_in6 are plain data; all-zero is valid.
    let mut out: T = unsafe { std::mem::zeroed() };
    let len = sockaddr_len(sockaddr, size_of::<T>());
    // SAFETY: caller guarantees `len` readable bytes; `out` has `size_of::<T>()` >= len.
    unsafe {
        ptr::copy_nonoverlapping(
            ptr::from_ref(sockaddr).cast::<u8>(),
            ptr::from_mut(&mut out).cast::<u8>(),
            len,
        );
    }
    out
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
))]
fn sockaddr_len(sockaddr: &libc::sockaddr, max: usize) -> usize {
    // BSD netmasks may be shorter than the full struct.
    usize::from(sockaddr.sa_len).min(max)
}

#[cfg(not(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd",
    target_os = "dragonfly"
)))]
const fn sockaddr_len(_sockaddr: &libc::sockaddr, max: usize) -> usize {
    max
}
