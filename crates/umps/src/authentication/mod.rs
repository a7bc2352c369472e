// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Peer authentication layered on every socket.
//!
//! Each endpoint carries a [`ZapOptions`] selecting one of five security
//! levels:
//!
//! | Level | Server-side checks |
//! |-------|--------------------|
//! | Grasslands | none |
//! | Strawhouse | IP allow/deny lists |
//! | Woodhouse  | IP + username/password |
//! | Stonehouse | IP + client public key |
//! | Ironhouse  | IP + mutual public key verification |
//!
//! On the first frame from a new peer the transport sends the peer's IP,
//! domain, and credentials or public key to the owning socket's
//! background authenticator [`Service`]; a non-`"200"` verdict drops the
//! peer. Verdicts use the string-status contract (`"200"` OK, `"400"`
//! client error, `"500"` server error) for wire compatibility.

mod authenticator;
mod credentials;
mod grasslands;
mod service;
mod sqlite;
mod zap_options;

pub use authenticator::{
    AuthenticationRequest, AuthenticationVerdict, Authenticator, CLIENT_ERROR_STATUS, OK_STATUS,
    SERVER_ERROR_STATUS,
};
pub use credentials::{Keys, UserNameAndPassword, KEY_LENGTH};
pub use grasslands::Grasslands;
pub use service::{AuthenticatorHandle, Service};
pub use sqlite::SqliteAuthenticator;
pub use zap_options::{Mechanism, ZapOptions, ZapRole};

use serde::{Deserialize, Serialize};

/// The security level of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// No validation.
    #[default]
    Grasslands,
    /// Server validates the client's IP address.
    Strawhouse,
    /// Server validates the client's IP address, username, and password.
    Woodhouse,
    /// Server validates the client's IP address and public key.
    Stonehouse,
    /// Server validates the client's IP address and public key, and the
    /// client validates the server's public key.
    Ironhouse,
}

/// A user's privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum UserPrivileges {
    /// Read-only permissions.
    #[default]
    ReadOnly,
    /// Read-write permissions.
    ReadWrite,
    /// Administrative permissions.
    Administrator,
}

/// Internal authenticator outcome; converts into the wire status pair.
///
/// Public APIs speak the string-status contract; this enum exists so the
/// concrete authenticators can reason about the failure class before
/// flattening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationResult {
    Allowed,
    Blacklisted,
    InvalidUser,
    InvalidPassword,
    InvalidPublicKey,
    AlgorithmFailure,
}

impl ValidationResult {
    pub(crate) fn into_status(self) -> (String, String) {
        match self {
            ValidationResult::Allowed => (OK_STATUS.to_string(), "OK".to_string()),
            ValidationResult::Blacklisted => {
                (CLIENT_ERROR_STATUS.to_string(), "Address is blacklisted".to_string())
            }
            ValidationResult::InvalidUser => {
                (CLIENT_ERROR_STATUS.to_string(), "User does not exist".to_string())
            }
            ValidationResult::InvalidPassword => {
                (CLIENT_ERROR_STATUS.to_string(), "Invalid password".to_string())
            }
            ValidationResult::InvalidPublicKey => {
                (CLIENT_ERROR_STATUS.to_string(), "Invalid public key".to_string())
            }
            ValidationResult::AlgorithmFailure => {
                (SERVER_ERROR_STATUS.to_string(), "Authenticator failure".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_levels_are_ordered_by_strictness() {
        assert!(SecurityLevel::Grasslands < SecurityLevel::Strawhouse);
        assert!(SecurityLevel::Strawhouse < SecurityLevel::Woodhouse);
        assert!(SecurityLevel::Woodhouse < SecurityLevel::Stonehouse);
        assert!(SecurityLevel::Stonehouse < SecurityLevel::Ironhouse);
    }

    #[test]
    fn validation_results_flatten_to_wire_statuses() {
        assert_eq!(ValidationResult::Allowed.into_status().0, OK_STATUS);
        assert_eq!(ValidationResult::Blacklisted.into_status().0, CLIENT_ERROR_STATUS);
        assert_eq!(ValidationResult::AlgorithmFailure.into_status().0, SERVER_ERROR_STATUS);
    }
}
