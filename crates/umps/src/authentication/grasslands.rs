// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The open-door authenticator.

use crate::authentication::authenticator::OK_STATUS;
use crate::authentication::{Authenticator, Keys, UserNameAndPassword, UserPrivileges};

/// An authenticator that accepts everything.
///
/// This is the default for sockets whose ZAP options carry the
/// `Grasslands` security level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grasslands;

impl Grasslands {
    /// Creates the authenticator.
    pub fn new() -> Self {
        Self
    }
}

fn ok() -> (String, String) {
    (OK_STATUS.to_string(), "OK".to_string())
}

impl Authenticator for Grasslands {
    fn is_blacklisted(&self, _address: &str) -> (String, String) {
        ok()
    }

    fn is_whitelisted(&self, _address: &str) -> (String, String) {
        ok()
    }

    fn is_valid_credentials(&self, _credentials: &UserNameAndPassword) -> (String, String) {
        ok()
    }

    fn is_valid_keys(&self, _keys: &Keys) -> (String, String) {
        ok()
    }

    fn minimum_user_privileges(&self) -> UserPrivileges {
        UserPrivileges::ReadOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::KEY_LENGTH;

    #[test]
    fn everything_is_allowed() {
        let grasslands = Grasslands::new();
        assert_eq!(grasslands.is_blacklisted("10.0.0.1").0, OK_STATUS);
        assert_eq!(grasslands.is_whitelisted("10.0.0.1").0, OK_STATUS);

        let creds = UserNameAndPassword::new("anyone", "anything").unwrap();
        assert_eq!(grasslands.is_valid_credentials(&creds).0, OK_STATUS);

        let keys = Keys::from_public_key([0u8; KEY_LENGTH]);
        assert_eq!(grasslands.is_valid_keys(&keys).0, OK_STATUS);
    }
}
