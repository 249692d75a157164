//! Core network types for address representation.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::FetchError;

/// Address family of a bound address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    /// IPv4 address.
    #[serde(rename = "IPv4")]
    V4,
    /// IPv6 address.
    #[serde(rename = "IPv6")]
    V6,
}

impl AddressFamily {
    /// Returns the family of the given address.
    #[must_use]
    pub const fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }

    /// Maximum prefix length for this family (32 or 128).
    #[must_use]
    pub const fn max_prefix_length(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// One address bound to one interface at the time of enumeration.
///
/// Records are immutable once constructed; the prefix length is clamped to
/// the maximum for the address family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    interface: String,
    address: IpAddr,
    prefix_length: u8,
    is_up: bool,
    is_loopback: bool,
}

impl AddressRecord {
    /// Creates a new address record.
    #[must_use]
    pub fn new(
        interface: impl Into<String>,
        address: IpAddr,
        prefix_length: u8,
        is_up: bool,
        is_loopback: bool,
    ) -> Self {
        let max = AddressFamily::of(&address).max_prefix_length();
        Self {
            interface: interface.into(),
            address,
            prefix_length: prefix_length.min(max),
            is_up,
            is_loopback,
        }
    }

    /// Name of the interface the address is bound to.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// The bound address.
    #[must_use]
    pub const fn address(&self) -> IpAddr {
        self.address
    }

    /// Address family, derived from the address.
    #[must_use]
    pub const fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }

    /// Subnet prefix length.
    #[must_use]
    pub const fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Whether the interface was up when enumerated.
    #[must_use]
    pub const fn is_up(&self) -> bool {
        self.is_up
    }

    /// Whether the interface is a loopback device.
    #[must_use]
    pub const fn is_loopback(&self) -> bool {
        self.is_loopback
    }
}

/// Result of a single enumeration: ordered records, or an error.
///
/// # Invariant
///
/// A list carrying an error never carries records. The constructors are the
/// only way to build a list, so callers can rely on `records()` being empty
/// whenever `error()` is `Some`.
#[derive(Debug, Default)]
pub struct AddressList {
    records: Vec<AddressRecord>,
    error: Option<FetchError>,
}

impl AddressList {
    /// Creates a successful list from records in enumeration order.
    #[must_use]
    pub const fn from_records(records: Vec<AddressRecord>) -> Self {
        Self {
            records,
            error: None,
        }
    }

    /// Creates a failed list with no records.
    #[must_use]
    pub const fn failed(error: FetchError) -> Self {
        Self {
            records: Vec::new(),
            error: Some(error),
        }
    }

    /// Records in platform enumeration order.
    #[must_use]
    pub fn records(&self) -> &[AddressRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the list holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The enumeration error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Numeric error code; `0` when the enumeration succeeded.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        self.error.as_ref().map_or(0, FetchError::code)
    }

    /// Returns true if the enumeration failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the first record bound to `name`, in list order.
    #[must_use]
    pub fn find_by_interface(&self, name: &str) -> Option<&AddressRecord> {
        self.records.iter().find(|r| r.interface == name)
    }

    /// Iterates over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, AddressRecord> {
        self.records.iter()
    }

    /// Keeps only records matching the predicate. Error lists are unchanged.
    pub(crate) fn retain(&mut self, keep: impl FnMut(&AddressRecord) -> bool) {
        self.records.retain(keep);
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a AddressRecord;
    type IntoIter = std::slice::Iter<'a, AddressRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl fmt::Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return writeln!(f, "Error [{}]: {error}", error.code());
        }

        writeln!(f, "System IP addresses ({}):", self.records.len())?;
        writeln!(f, "========================================")?;
        for (index, record) in self.records.iter().enumerate() {
            writeln!(f, "{}. Interface: {}", index + 1, record.interface)?;
            writeln!(f, "   Address:   {}", record.address)?;
            writeln!(f, "   Family:    {}", record.family())?;
            writeln!(f, "   Prefix:    /{}", record.prefix_length)?;
            writeln!(
                f,
                "   Status:    {}",
                if record.is_up { "up" } else { "down" }
            )?;
            writeln!(
                f,
                "   Type:      {}",
                if record.is_loopback {
                    "loopback"
                } else {
                    "regular"
                }
            )?;
            writeln!(f, "----------------------------------------")?;
        }
        Ok(())
    }
}

/// Counts the set bits of an IPv4 netmask given in network byte order.
#[must_use]
pub const fn ipv4_prefix_length(mask: [u8; 4]) -> u8 {
    // At most 32, always fits.
    #[allow(clippy::cast_possible_truncation)]
    let ones = u32::from_be_bytes(mask).count_ones() as u8;
    ones
}

/// Counts the set bits of a 16-byte IPv6 netmask, most significant bit first.
#[must_use]
pub fn ipv6_prefix_length(mask: [u8; 16]) -> u8 {
    // At most 128, always fits.
    #[allow(clippy::cast_possible_truncation)]
    let ones = u128::from_be_bytes(mask).count_ones() as u8;
    ones
}
