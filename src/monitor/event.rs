//! Address change event types.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::network::AddressFamily;

/// The kind of address change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// An address was bound to an interface.
    Added,
    /// An address was removed from an interface.
    Removed,
    /// The interface's address configuration changed.
    ///
    /// Reported when the OS does not say whether the address was added or
    /// removed; the event then carries an address that is currently bound.
    Changed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Changed => write!(f, "changed"),
        }
    }
}

/// A single address change, delivered to the monitor callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The name of the interface where the change occurred.
    pub interface: String,
    /// The address concerned by the change.
    pub address: IpAddr,
    /// What happened to the address.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Creates a new change event.
    #[must_use]
    pub fn new(interface: impl Into<String>, address: IpAddr, kind: ChangeKind) -> Self {
        Self {
            interface: interface.into(),
            address,
            kind,
        }
    }

    /// Creates an "added" event.
    #[must_use]
    pub fn added(interface: impl Into<String>, address: IpAddr) -> Self {
        Self::new(interface, address, ChangeKind::Added)
    }

    /// Creates a "removed" event.
    #[must_use]
    pub fn removed(interface: impl Into<String>, address: IpAddr) -> Self {
        Self::new(interface, address, ChangeKind::Removed)
    }

    /// Creates a "changed" event.
    #[must_use]
    pub fn changed(interface: impl Into<String>, address: IpAddr) -> Self {
        Self::new(interface, address, ChangeKind::Changed)
    }

    /// Address family of the event's address.
    #[must_use]
    pub const fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.address)
    }

    /// Returns true if this is an "added" event.
    #[must_use]
    pub const fn is_added(&self) -> bool {
        matches!(self.kind, ChangeKind::Added)
    }

    /// Returns true if this is a "removed" event.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self.kind, ChangeKind::Removed)
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} ({})",
            self.kind,
            self.interface,
            self.address,
            self.family()
        )
    }
}

impl Serialize for ChangeEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ChangeEvent", 4)?;
        state.serialize_field("interface", &self.interface)?;
        state.serialize_field("address", &self.address.to_string())?;
        state.serialize_field("family", &self.family())?;
        state.serialize_field("kind", &self.kind)?;
        state.end()
    }
}
