// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint addresses: `tcp://host:port` and `ipc://path`.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// A parsed transport address.
///
/// TCP endpoints are used for everything that crosses hosts; IPC
/// endpoints (Unix-domain sockets) are used for per-module command
/// sockets on a single host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// A `tcp://host:port` address.
    Tcp(String),
    /// An `ipc:///absolute/path` address.
    Ipc(PathBuf),
}

impl Endpoint {
    /// Parses an address of the form `tcp://host:port` or `ipc://path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for unknown schemes or malformed
    /// TCP authority parts.
    pub fn parse(address: &str) -> Result<Self> {
        if let Some(rest) = address.strip_prefix("tcp://") {
            if rest.is_empty() || !rest.contains(':') {
                return Err(Error::InvalidArgument(format!(
                    "tcp address {} must be host:port",
                    address
                )));
            }
            return Ok(Endpoint::Tcp(rest.to_string()));
        }
        if let Some(rest) = address.strip_prefix("ipc://") {
            if rest.is_empty() {
                return Err(Error::InvalidArgument("ipc address is empty".into()));
            }
            return Ok(Endpoint::Ipc(PathBuf::from(rest)));
        }
        Err(Error::InvalidArgument(format!(
            "address {} must start with tcp:// or ipc://",
            address
        )))
    }

    /// Resolves a TCP endpoint to a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportError`] when resolution fails or the
    /// endpoint is IPC.
    pub fn to_socket_addr(&self) -> Result<SocketAddr> {
        match self {
            Endpoint::Tcp(authority) => authority
                .to_socket_addrs()
                .map_err(|e| Error::TransportError(format!("resolve {}: {}", authority, e)))?
                .next()
                .ok_or_else(|| {
                    Error::TransportError(format!("{} resolved to no addresses", authority))
                }),
            Endpoint::Ipc(path) => Err(Error::TransportError(format!(
                "ipc endpoint {} has no socket address",
                path.display()
            ))),
        }
    }

    /// True for `ipc://` endpoints.
    pub fn is_ipc(&self) -> bool {
        matches!(self, Endpoint::Ipc(_))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(authority) => write!(f, "tcp://{}", authority),
            Endpoint::Ipc(path) => write!(f, "ipc://{}", path.display()),
        }
    }
}
