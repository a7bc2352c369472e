// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint descriptors.

use serde::{Deserialize, Serialize};

use crate::authentication::{SecurityLevel, UserPrivileges};
use crate::error::{Error, Result};
use crate::messaging::ConnectOrBind;

/// The socket kind a descriptor advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketKind {
    /// A publish endpoint to connect a subscriber to.
    Publisher,
    /// A subscribe endpoint to feed.
    Subscriber,
    /// An XPUB proxy backend.
    XPublisher,
    /// An XSUB proxy frontend.
    XSubscriber,
    /// A request endpoint.
    Request,
    /// A reply endpoint.
    Reply,
    /// A router service endpoint.
    Router,
    /// A dealer backend endpoint.
    Dealer,
}

/// A published endpoint descriptor.
///
/// This is what the connection-information service hands to clients: the
/// name of the owning component, where to reach it, how, and with what
/// minimum privileges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionDetails {
    name: String,
    socket_kind: SocketKind,
    address: String,
    security_level: SecurityLevel,
    connect_or_bind: ConnectOrBind,
    minimum_user_privileges: UserPrivileges,
}

impl ConnectionDetails {
    /// Creates a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the name or address is
    /// empty.
    pub fn new(
        name: &str,
        socket_kind: SocketKind,
        address: &str,
        security_level: SecurityLevel,
        connect_or_bind: ConnectOrBind,
        minimum_user_privileges: UserPrivileges,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("connection name is empty".into()));
        }
        if address.trim().is_empty() {
            return Err(Error::InvalidArgument("connection address is empty".into()));
        }
        Ok(Self {
            name: name.trim().to_string(),
            socket_kind,
            address: address.trim().to_string(),
            security_level,
            connect_or_bind,
            minimum_user_privileges,
        })
    }

    /// The owning component's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The advertised socket kind.
    pub fn socket_kind(&self) -> SocketKind {
        self.socket_kind
    }

    /// The advertised address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The security level peers must satisfy.
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    /// Whether clients connect to or bind this address.
    pub fn connect_or_bind(&self) -> ConnectOrBind {
        self.connect_or_bind
    }

    /// The minimum privileges required.
    pub fn minimum_user_privileges(&self) -> UserPrivileges {
        self.minimum_user_privileges
    }
}

/// Rewrites a wildcard bind address into one peers can connect to.
///
/// `tcp://0.0.0.0:port` advertises the machine's routable IP; any other
/// address is returned unchanged.
pub fn advertised_address(address: &str) -> String {
    let Some(rest) = address.strip_prefix("tcp://0.0.0.0:") else {
        return address.to_string();
    };
    match local_ip_address::local_ip() {
        Ok(ip) => format!("tcp://{}:{}", ip, rest),
        Err(e) => {
            log::warn!("[connection-information] could not resolve local IP: {}", e);
            address.to_string()
        }
    }
}
