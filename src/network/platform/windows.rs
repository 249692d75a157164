//! Windows-specific address fetching using `GetAdaptersAddresses`.

use crate::network::winsock::WinsockGuard;
use crate::network::{AddressFetcher, AddressRecord, FetchError};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use windows::Win32::Foundation::WIN32_ERROR;
use windows::Win32::NetworkManagement::IpHelper::{
    GAA_FLAG_INCLUDE_PREFIX, GAA_FLAG_SKIP_ANYCAST, GAA_FLAG_SKIP_DNS_SERVER,
    GAA_FLAG_SKIP_MULTICAST, GET_ADAPTERS_ADDRESSES_FLAGS, GetAdaptersAddresses,
    IF_TYPE_SOFTWARE_LOOPBACK, IP_ADAPTER_ADDRESSES_LH,
};
use windows::Win32::NetworkManagement::Ndis::IfOperStatusUp;
use windows::Win32::Networking::WinSock::{
    AF_INET, AF_INET6, AF_UNSPEC, SOCKADDR_IN, SOCKADDR_IN6,
};

/// Buffer size hint for `GetAdaptersAddresses`.
/// The API will tell us the actual required size if this is insufficient.
const INITIAL_BUFFER_SIZE: u32 = 16384;

/// Windows implementation of [`AddressFetcher`] using `GetAdaptersAddresses`.
///
/// # Example
///
/// ```no_run
/// use netut::network::{AddressFetcher, platform::PlatformFetcher};
///
/// let fetcher = PlatformFetcher::new();
/// for record in fetcher.fetch().expect("Failed to fetch addresses") {
///     println!("{}: {}", record.interface(), record.address());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct WindowsFetcher {
    _private: (),
}

impl WindowsFetcher {
    /// Creates a new Windows fetcher.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl AddressFetcher for WindowsFetcher {
    fn fetch(&self) -> Result<Vec<AddressRecord>, FetchError> {
        let adapters = fetch_adapters()?;
        Ok(adapters.iter().flat_map(AdapterEntry::records).collect())
    }
}

/// One adapter of the OS table with its unicast addresses.
///
/// Shared with the change monitor, which needs the interface indices to
/// match notifications against adapters.
#[derive(Debug, Clone)]
pub(crate) struct AdapterEntry {
    /// IPv4 interface index.
    pub index: u32,
    /// IPv6 interface index.
    pub ipv6_index: u32,
    /// Friendly name.
    pub name: String,
    pub is_up: bool,
    pub is_loopback: bool,
    /// Unicast addresses with their on-link prefix length.
    pub addresses: Vec<(IpAddr, u8)>,
}

impl AdapterEntry {
    /// Returns true if a notification for `index` concerns this adapter.
    pub(crate) const fn has_index(&self, index: u32) -> bool {
        self.index == index || self.ipv6_index == index
    }

    /// Converts the adapter's addresses into records, in OS order.
    pub(crate) fn records(&self) -> impl Iterator<Item = AddressRecord> + '_ {
        self.addresses.iter().map(|(address, prefix)| {
            AddressRecord::new(
                self.name.clone(),
                *address,
                *prefix,
                self.is_up,
                self.is_loopback,
            )
        })
    }
}

/// Fetches all adapters using `GetAdaptersAddresses`.
///
/// Winsock stays initialized for the duration of the call.
pub(crate) fn fetch_adapters() -> Result<Vec<AdapterEntry>, FetchError> {
    let _winsock = WinsockGuard::acquire()?;
    let raw_adapters = get_adapter_addresses()?;

    let mut adapters = Vec::new();
    // SAFETY: GetAdaptersAddresses returns a properly aligned buffer for IP_ADAPTER_ADDRESSES_LH.
    #[allow(clippy::cast_ptr_alignment)]
    let mut current = raw_adapters.as_ptr().cast::<IP_ADAPTER_ADDRESSES_LH>();

    // SAFETY: We iterate through a linked list returned by GetAdaptersAddresses.
    // The list is valid as long as the buffer (`raw_adapters`) is alive.
    while !current.is_null() {
        let adapter = unsafe { &*current };

        if let Some(entry) = parse_adapter(adapter) {
            adapters.push(entry);
        }

        current = adapter.Next;
    }

    Ok(adapters)
}

/// Calls `GetAdaptersAddresses` and returns the raw buffer containing adapter data.
///
/// This function handles the two-call pattern:
/// 1. First call with estimated buffer size
/// 2. Retry with exact size if buffer was too small
fn get_adapter_addresses() -> Result<Vec<u8>, FetchError> {
    let flags = GAA_FLAG_INCLUDE_PREFIX
        | GAA_FLAG_SKIP_ANYCAST
        | GAA_FLAG_SKIP_MULTICAST
        | GAA_FLAG_SKIP_DNS_SERVER;
    let family = u32::from(AF_UNSPEC.0);

    let mut buffer: Vec<u8> = vec![0u8; INITIAL_BUFFER_SIZE as usize];
    let mut size = INITIAL_BUFFER_SIZE;

    // SAFETY: We provide a valid buffer and size. The function writes adapter
    // information to the buffer and updates `size` with the required length.
    let result = unsafe {
        GetAdaptersAddresses(
            family,
            flags,
            None,
            Some(buffer.as_mut_ptr().cast()),
            &raw mut size,
        )
    };

    handle_api_result(result, &mut buffer, &mut size, flags, family)?;

    Ok(buffer)
}

/// Handles the result of `GetAdaptersAddresses`, retrying once with a larger buffer.
///
/// # Coverage Note
///
/// Excluded from coverage: the overflow path needs an adapter table larger
/// than the initial buffer, and the error paths need real API failures.
#[cfg(not(tarpaulin_include))]
fn handle_api_result(
    result: u32,
    buffer: &mut Vec<u8>,
    size: &mut u32,
    flags: GET_ADAPTERS_ADDRESSES_FLAGS,
    family: u32,
) -> Result<(), FetchError> {
    use windows::Win32::Foundation::{ERROR_BUFFER_OVERFLOW, NO_ERROR};

    if result == ERROR_BUFFER_OVERFLOW.0 {
        buffer.resize(*size as usize, 0);

        // SAFETY: Same as above, but with correctly sized buffer
        let result = unsafe {
            GetAdaptersAddresses(
                family,
                flags,
                None,
                Some(buffer.as_mut_ptr().cast()),
                &raw mut *size,
            )
        };

        if result != NO_ERROR.0 {
            return Err(windows::core::Error::from(WIN32_ERROR(result)).into());
        }
    } else if result != NO_ERROR.0 {
        return Err(windows::core::Error::from(WIN32_ERROR(result)).into());
    }

    Ok(())
}

/// Parses a single `IP_ADAPTER_ADDRESSES_LH` structure.
///
/// Returns `None` if the adapter name cannot be read.
fn parse_adapter(adapter: &IP_ADAPTER_ADDRESSES_LH) -> Option<AdapterEntry> {
    // SAFETY: FriendlyName is a NUL-terminated wide string inside the adapter buffer.
    let name = unsafe { adapter.FriendlyName.to_string().ok()? };
    // SAFETY: both union views share the IfIndex field layout.
    let index = unsafe { adapter.Anonymous1.Anonymous.IfIndex };

    Some(AdapterEntry {
        index,
        ipv6_index: adapter.Ipv6IfIndex,
        name,
        is_up: adapter.OperStatus == IfOperStatusUp,
        is_loopback: adapter.IfType == IF_TYPE_SOFTWARE_LOOPBACK,
        addresses: collect_addresses(adapter),
    })
}

/// Collects the unicast addresses of an adapter with their prefix lengths.
///
/// # Safety Note
///
/// The pointer casts to `SOCKADDR_IN` and `SOCKADDR_IN6` are allowed despite alignment
/// concerns because Windows guarantees proper alignment of these structures when returned
/// from the networking APIs.
#[allow(clippy::cast_ptr_alignment)]
fn collect_addresses(adapter: &IP_ADAPTER_ADDRESSES_LH) -> Vec<(IpAddr, u8)> {
    let mut addresses = Vec::new();

    let mut unicast = adapter.FirstUnicastAddress;

    // SAFETY: We iterate through a linked list of unicast addresses.
    // Each address is valid as long as the parent adapter buffer is alive.
    while !unicast.is_null() {
        let entry = unsafe { &*unicast };

        // SAFETY: The Address field contains a valid SOCKET_ADDRESS structure
        // pointing to either SOCKADDR_IN (IPv4) or SOCKADDR_IN6 (IPv6).
        if let Some(sockaddr) = unsafe { entry.Address.lpSockaddr.as_ref() } {
            let address = match sockaddr.sa_family {
                f if f == AF_INET => {
                    // SAFETY: We verified the family is AF_INET, so this is a valid cast.
                    let sockaddr_in =
                        unsafe { &*(std::ptr::from_ref(sockaddr).cast::<SOCKADDR_IN>()) };
                    // SAFETY: sin_addr contains the IPv4 address bytes in network order.
                    let octets = unsafe { sockaddr_in.sin_addr.S_un.S_un_b };
                    Some(IpAddr::V4(Ipv4Addr::new(
                        octets.s_b1,
                        octets.s_b2,
                        octets.s_b3,
                        octets.s_b4,
                    )))
                }
                f if f == AF_INET6 => {
                    // SAFETY: We verified the family is AF_INET6, so this is a valid cast.
                    let sockaddr_in6 =
                        unsafe { &*(std::ptr::from_ref(sockaddr).cast::<SOCKADDR_IN6>()) };
                    // SAFETY: We verified this is an IPv6 address, so the union field is valid.
                    let octets = unsafe { sockaddr_in6.sin6_addr.u.Byte };
                    Some(IpAddr::V6(Ipv6Addr::from(octets)))
                }
                _ => None,
            };

            if let Some(address) = address {
                addresses.push((address, entry.OnLinkPrefixLength));
            }
        }

        unicast = entry.Next;
    }

    addresses
}
