//! UDP socket construction
//!
//! Both sides use a plain blocking `std::net::UdpSocket`, built through
//! `socket2` so the kernel receive buffer can be enlarged before binding.
//! A short read timeout keeps the blocking receive loops responsive to
//! the cancellation flag; a timeout is a silent continue, not a loss.

use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::constants::{POLL_TIMEOUT_MS, RECV_BUFFER_SIZE};
use crate::error::NetworkError;

/// Create a UDP socket bound to `addr` with a tuned receive buffer
///
/// SO_RCVBUF is raised to [`RECV_BUFFER_SIZE`] to reduce kernel-level
/// drops under bursty video traffic, and a [`POLL_TIMEOUT_MS`] read
/// timeout is set so receive loops can poll for cancellation.
pub fn bind_udp(addr: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let domain = Domain::for_address(addr);
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .set_recv_buffer_size(RECV_BUFFER_SIZE)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .set_read_timeout(Some(Duration::from_millis(POLL_TIMEOUT_MS)))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

    Ok(socket.into())
}

/// Bind to an ephemeral local port (receiver side)
pub fn bind_ephemeral() -> Result<UdpSocket, NetworkError> {
    bind_udp("0.0.0.0:0".parse().expect("static addr"))
}

/// True when a receive error is just the poll timeout expiring
pub fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}
