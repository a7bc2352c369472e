// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Credentials presented during the authentication handshake.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Length of a public or private key in bytes.
pub const KEY_LENGTH: usize = 32;

/// A username/password credential pair (Woodhouse).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserNameAndPassword {
    user_name: String,
    password: String,
}

impl UserNameAndPassword {
    /// Creates credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the user name is empty.
    pub fn new(user_name: &str, password: &str) -> Result<Self> {
        if user_name.trim().is_empty() {
            return Err(Error::InvalidArgument("user name is empty".into()));
        }
        Ok(Self {
            user_name: user_name.to_string(),
            password: password.to_string(),
        })
    }

    /// The user name.
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// A public key, optionally paired with its private key (Stonehouse,
/// Ironhouse).
///
/// The key exchange itself is a transport primitive; this type only
/// carries the material the authenticator checks for membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Keys {
    public_key: [u8; KEY_LENGTH],
    private_key: Option<[u8; KEY_LENGTH]>,
}

impl Keys {
    /// Creates a key set holding only a public key.
    pub fn from_public_key(public_key: [u8; KEY_LENGTH]) -> Self {
        Self {
            public_key,
            private_key: None,
        }
    }

    /// Creates a full key pair.
    pub fn from_key_pair(public_key: [u8; KEY_LENGTH], private_key: [u8; KEY_LENGTH]) -> Self {
        Self {
            public_key,
            private_key: Some(private_key),
        }
    }

    /// The public key.
    pub fn public_key(&self) -> &[u8; KEY_LENGTH] {
        &self.public_key
    }

    /// The private key, when held.
    pub fn private_key(&self) -> Option<&[u8; KEY_LENGTH]> {
        self.private_key.as_ref()
    }

    /// True when the private half is held.
    pub fn have_private_key(&self) -> bool {
        self.private_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_user_name_is_rejected() {
        assert!(UserNameAndPassword::new("", "secret").is_err());
        assert!(UserNameAndPassword::new("  ", "secret").is_err());
    }

    #[test]
    fn credentials_hold_fields() {
        let creds = UserNameAndPassword::new("operator", "magma").expect("valid");
        assert_eq!(creds.user_name(), "operator");
        assert_eq!(creds.password(), "magma");
    }

    #[test]
    fn key_pair_accessors() {
        let keys = Keys::from_key_pair([1u8; KEY_LENGTH], [2u8; KEY_LENGTH]);
        assert!(keys.have_private_key());
        assert_eq!(keys.public_key(), &[1u8; KEY_LENGTH]);

        let public_only = Keys::from_public_key([3u8; KEY_LENGTH]);
        assert!(!public_only.have_private_key());
    }
}
