//! Viewer session registry
//!
//! The sender learns its viewers from inbound handshake datagrams: any
//! datagram that is not itself a media frame registers its source address.
//! Entries live for the process lifetime; there is no heartbeat or expiry,
//! so a viewer that goes away simply keeps receiving best-effort sends.

use std::net::SocketAddr;

/// Set of viewer endpoints collected from handshakes
#[derive(Debug, Default)]
pub struct SessionRegistry {
    endpoints: Vec<SocketAddr>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an address if it has not been seen before
    ///
    /// Returns `true` when the address was newly added. Idempotent per
    /// address.
    pub fn register_if_new(&mut self, addr: SocketAddr) -> bool {
        if self.endpoints.contains(&addr) {
            return false;
        }
        self.endpoints.push(addr);
        true
    }

    /// Iterate over all registered endpoints
    pub fn endpoints(&self) -> impl Iterator<Item = SocketAddr> + '_ {
        self.endpoints.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
