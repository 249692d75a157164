//! netut: network interface and address observer
//!
//! A library for enumerating the IP addresses bound to the host's network
//! interfaces and for watching those addresses change.
//!
//! - [`network`]: point-in-time snapshots ([`network::enumerate`],
//!   [`network::Enumerator`]) with filtering and a JSON form.
//! - [`monitor`]: a call-driven change monitor ([`monitor::Monitor`]) over
//!   the platform notification mechanism.
//! - [`config`]: CLI and TOML configuration of the `netut` binary.

pub mod config;
pub mod monitor;
pub mod network;
