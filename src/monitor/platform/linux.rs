//! Linux change notifications over an rtnetlink socket.

use std::ffi::CStr;
use std::io;
use std::os::fd::AsRawFd;
use std::time::Duration;

use libc::c_int;
use netlink_sys::protocols::NETLINK_ROUTE;
use netlink_sys::{Socket, SocketAddr};

use super::netlink;
use crate::monitor::{Backend, ChangeEvent, MonitorError, ProcessOutcome};

/// Receive buffer size; rtnetlink recommends at least 8 KiB.
const RECV_BUFFER_SIZE: usize = 16 * 1024;

/// IPv4 and IPv6 address multicast groups.
#[allow(clippy::cast_sign_loss)]
const ADDRESS_GROUPS: u32 = (libc::RTMGRP_IPV4_IFADDR | libc::RTMGRP_IPV6_IFADDR) as u32;

/// Linux implementation of [`Backend`] subscribed to the rtnetlink IPv4 and
/// IPv6 address groups.
///
/// The socket is non-blocking; waits happen in `poll(2)`. Each `process`
/// call reads at most one datagram, so a steady stream of notifications
/// cannot hold the caller past its timeout. Dropping the backend closes the
/// socket.
pub struct LinuxBackend {
    socket: Socket,
    buffer: Vec<u8>,
}

impl std::fmt::Debug for LinuxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxBackend")
            .field("fd", &self.socket.as_raw_fd())
            .finish_non_exhaustive()
    }
}

impl LinuxBackend {
    /// Opens and binds the notification socket.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Io`] naming the failing step; nothing stays open.
    #[cfg(not(tarpaulin_include))]
    pub fn open() -> Result<Self, MonitorError> {
        let mut socket = Socket::new(NETLINK_ROUTE).map_err(|source| MonitorError::Io {
            context: "socket",
            source,
        })?;
        // Port id zero lets the kernel assign one.
        socket
            .bind(&SocketAddr::new(0, ADDRESS_GROUPS))
            .map_err(|source| MonitorError::Io {
                context: "bind",
                source,
            })?;
        socket
            .set_non_blocking(true)
            .map_err(|source| MonitorError::Io {
                context: "set_non_blocking",
                source,
            })?;

        tracing::debug!("Subscribed to rtnetlink address notifications");
        Ok(Self {
            socket,
            buffer: Vec::with_capacity(RECV_BUFFER_SIZE),
        })
    }

    /// Reads one queued datagram and emits its events.
    fn receive(&mut self, emit: &mut dyn FnMut(ChangeEvent)) -> Result<ProcessOutcome, MonitorError> {
        self.buffer.clear();
        match self.socket.recv(&mut self.buffer, 0) {
            Ok(0) => return Ok(ProcessOutcome::TimedOut),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(ProcessOutcome::TimedOut),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                return Ok(ProcessOutcome::Interrupted);
            }
            Err(e) if e.raw_os_error() == Some(libc::ENOBUFS) => {
                tracing::warn!("Netlink receive queue overflowed, notifications were lost");
                return Ok(ProcessOutcome::Processed(0));
            }
            Err(source) => {
                return Err(MonitorError::Io {
                    context: "recv",
                    source,
                });
            }
        }

        let mut count = 0;
        netlink::parse_datagram(&self.buffer, |notice| match interface_name(notice.index) {
            Some(name) => {
                emit(ChangeEvent::new(name, notice.address, notice.kind));
                count += 1;
            }
            None => tracing::warn!(
                "Interface index {} no longer exists, {} skipped",
                notice.index,
                notice.address
            ),
        })?;

        Ok(ProcessOutcome::Processed(count))
    }
}

impl Backend for LinuxBackend {
    fn process(
        &mut self,
        timeout: Option<Duration>,
        emit: &mut dyn FnMut(ChangeEvent),
    ) -> Result<ProcessOutcome, MonitorError> {
        let mut pollfd = libc::pollfd {
            fd: self.socket.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        // SAFETY: one valid pollfd entry.
        let ready = unsafe { libc::poll(&raw mut pollfd, 1, poll_timeout(timeout)) };
        if ready < 0 {
            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::Interrupted {
                return Ok(ProcessOutcome::Interrupted);
            }
            return Err(MonitorError::Io {
                context: "poll",
                source: error,
            });
        }
        if ready == 0 {
            return Ok(ProcessOutcome::TimedOut);
        }

        self.receive(emit)
    }
}

/// Converts a timeout to `poll(2)` milliseconds, rounding up so short
/// bounded waits do not turn into polls.
fn poll_timeout(timeout: Option<Duration>) -> c_int {
    timeout.map_or(-1, |t| {
        c_int::try_from(t.as_nanos().div_ceil(1_000_000)).unwrap_or(c_int::MAX)
    })
}

/// Resolves an interface index to its current name.
fn interface_name(index: u32) -> Option<String> {
    let mut name = [0 as libc::c_char; libc::IF_NAMESIZE];
    // SAFETY: `name` holds IF_NAMESIZE bytes as required by if_indextoname.
    let result = unsafe { libc::if_indextoname(index, name.as_mut_ptr()) };
    if result.is_null() {
        return None;
    }
    // SAFETY: on success the buffer holds a NUL-terminated name.
    let name = unsafe { CStr::from_ptr(name.as_ptr()) };
    Some(name.to_string_lossy().into_owned())
}
