// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The authenticator contract.

use crate::authentication::{
    Keys, Mechanism, SecurityLevel, UserNameAndPassword, UserPrivileges,
};

/// Verdict status for an accepted peer.
pub const OK_STATUS: &str = "200";
/// Verdict status for a rejected peer (bad IP, credentials, or key).
pub const CLIENT_ERROR_STATUS: &str = "400";
/// Verdict status for an authenticator-side failure.
pub const SERVER_ERROR_STATUS: &str = "500";

/// What the transport sends the authenticator for a new peer.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    /// The ZAP domain of the receiving socket.
    pub domain: String,
    /// The peer's IP address (or `"ipc"` for local sockets).
    pub address: String,
    /// The wire mechanism the peer greeted with.
    pub mechanism: Mechanism,
    /// The security level the receiving socket enforces.
    pub security_level: SecurityLevel,
    /// Credentials, when the mechanism is `Plain`.
    pub credentials: Option<UserNameAndPassword>,
    /// The peer's public key, when the mechanism is `Curve`.
    pub public_key: Option<[u8; crate::authentication::KEY_LENGTH]>,
}

/// The authenticator's reply for a peer.
#[derive(Debug, Clone)]
pub struct AuthenticationVerdict {
    /// `"200"`, `"400"`, or `"500"`.
    pub status: String,
    /// Human-readable reason.
    pub text: String,
    /// The authenticated user, when known.
    pub user_id: String,
    /// Privileges granted to the peer.
    pub privileges: UserPrivileges,
}

impl AuthenticationVerdict {
    /// True when the peer was accepted.
    pub fn is_ok(&self) -> bool {
        self.status == OK_STATUS
    }

    pub(crate) fn allowed(user_id: &str, privileges: UserPrivileges) -> Self {
        Self {
            status: OK_STATUS.to_string(),
            text: "OK".to_string(),
            user_id: user_id.to_string(),
            privileges,
        }
    }

    pub(crate) fn denied(status: String, text: String) -> Self {
        Self {
            status,
            text,
            user_id: String::new(),
            privileges: UserPrivileges::ReadOnly,
        }
    }
}

/// Validates peers on behalf of a socket.
///
/// Implementations answer four independent questions; the background
/// [`crate::authentication::Service`] combines them according to the
/// socket's security level. All verdicts are `(status, reason)` pairs with
/// the statuses above.
pub trait Authenticator: Send + Sync {
    /// Is the address on the deny list? `"200"` means not blacklisted.
    fn is_blacklisted(&self, address: &str) -> (String, String);

    /// Is the address allowed? `"200"` means whitelisted (or the list is
    /// open).
    fn is_whitelisted(&self, address: &str) -> (String, String);

    /// Are the username and password valid?
    fn is_valid_credentials(&self, credentials: &UserNameAndPassword) -> (String, String);

    /// Is the public key known?
    fn is_valid_keys(&self, keys: &Keys) -> (String, String);

    /// The minimum privileges granted to an authenticated peer.
    fn minimum_user_privileges(&self) -> UserPrivileges {
        UserPrivileges::ReadOnly
    }
}
