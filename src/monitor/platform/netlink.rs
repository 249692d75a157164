//! Decoding of rtnetlink address notifications.
//!
//! A datagram holds one or more netlink messages; each is decoded with
//! `netlink-packet-route` and address messages are reduced to an
//! [`AddressNotice`].

use std::net::IpAddr;

use netlink_packet_core::{NetlinkMessage, NetlinkPayload};
use netlink_packet_route::RouteNetlinkMessage;
use netlink_packet_route::address::{AddressAttribute, AddressMessage};

use crate::monitor::{ChangeKind, MonitorError};

const ALIGNTO: usize = 4;

/// An address notification, before its interface index is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressNotice {
    pub kind: ChangeKind,
    pub index: u32,
    pub address: IpAddr,
}

const fn align(len: usize) -> usize {
    (len + ALIGNTO - 1) & !(ALIGNTO - 1)
}

/// Walks one datagram, passing each address notice to `on_address` in order.
///
/// Parsing of the datagram ends at `NLMSG_DONE` or at the first message that
/// fails to decode (truncated or malformed). Messages other than address
/// notifications are ignored, and so are address messages without an address
/// attribute.
///
/// # Errors
///
/// Returns [`MonitorError::Protocol`] for an `NLMSG_ERROR` message carrying a
/// non-zero errno. Messages before it have already been delivered.
pub fn parse_datagram(
    buf: &[u8],
    mut on_address: impl FnMut(AddressNotice),
) -> Result<(), MonitorError> {
    let mut offset = 0;

    while offset < buf.len() {
        let message = match NetlinkMessage::<RouteNetlinkMessage>::deserialize(&buf[offset..]) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Undecodable netlink message at offset {offset}: {e}");
                break;
            }
        };

        let len = message.header.length as usize;
        match message.payload {
            NetlinkPayload::Done(_) => break,
            // A missing code is an acknowledgement.
            NetlinkPayload::Error(error) => {
                if let Some(code) = error.code {
                    return Err(MonitorError::Protocol {
                        errno: code.get().saturating_abs(),
                    });
                }
            }
            NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewAddress(address)) => {
                deliver(ChangeKind::Added, &address, &mut on_address);
            }
            NetlinkPayload::InnerMessage(RouteNetlinkMessage::DelAddress(address)) => {
                deliver(ChangeKind::Removed, &address, &mut on_address);
            }
            _ => {}
        }

        if len == 0 {
            break;
        }
        offset += align(len);
    }

    Ok(())
}

fn deliver(kind: ChangeKind, message: &AddressMessage, on_address: &mut impl FnMut(AddressNotice)) {
    match notice(kind, message) {
        Some(notice) => on_address(notice),
        None => tracing::debug!("Address message without usable address, skipped"),
    }
}

/// Reduces an address message to one notice. `IFA_LOCAL` is preferred over
/// `IFA_ADDRESS`, which differs from it only on point-to-point links.
fn notice(kind: ChangeKind, message: &AddressMessage) -> Option<AddressNotice> {
    let mut local = None;
    let mut address = None;
    for attribute in &message.attributes {
        match attribute {
            AddressAttribute::Local(ip) => local = Some(*ip),
            AddressAttribute::Address(ip) => address = Some(*ip),
            _ => {}
        }
    }

    Some(AddressNotice {
        kind,
        index: message.header.index,
        address: local.or(address)?,
    })
}
