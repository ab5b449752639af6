//! Server address descriptors.
//!
//! Most deployments dial a host name and port, which must be re-resolved on
//! every attempt — the machine may have moved networks since the last try.
//! Transports that do not speak IP (a local socket, a serial bridge) receive
//! their endpoint as an opaque string instead.

use std::net::{SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

/// A resolvable host/port endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAddress {
    pub host: String,
    pub port: u16,
}

impl NetworkAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Resolves the host name, preferring the first returned address.
    ///
    /// Resolution is repeated on every connection attempt rather than cached:
    /// a laptop that moved networks may get a different answer this time.
    ///
    /// # Errors
    ///
    /// Returns the resolver's error, or `NotFound` when the name resolves to
    /// no addresses at all.
    pub fn resolve(&self) -> std::io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no addresses found for '{}'", self.host),
                )
            })
    }
}

impl std::fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Where the server lives, by address kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerAddress {
    /// A host name and port; resolved by the client before dialing.
    Network(NetworkAddress),
    /// Any other endpoint, passed through to the transport untouched.
    Local(String),
}

impl ServerAddress {
    /// Convenience constructor for the common case.
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Self::Network(NetworkAddress::new(host, port))
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerAddress::Network(addr) => addr.fmt(f),
            ServerAddress::Local(path) => f.write_str(path),
        }
    }
}
