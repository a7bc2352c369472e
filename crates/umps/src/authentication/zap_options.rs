// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-endpoint authentication configuration.

use crate::authentication::{Keys, SecurityLevel, UserNameAndPassword};
use crate::error::{Error, Result};

/// Which side of the authentication handshake an endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZapRole {
    /// The endpoint presents credentials.
    #[default]
    Client,
    /// The endpoint verifies peers.
    Server,
}

/// The wire mechanism implied by a security level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Mechanism {
    /// No credentials on the wire (Grasslands, Strawhouse).
    #[default]
    Null,
    /// Username/password (Woodhouse).
    Plain,
    /// Public keys (Stonehouse, Ironhouse).
    Curve,
}

/// Authentication options attached to a socket.
///
/// Defaults to a Grasslands client: no checks, no credentials. The
/// `set_*` helpers configure every level/role combination; the transport
/// reads the resulting mechanism and material when greeting a peer.
#[derive(Debug, Clone, Default)]
pub struct ZapOptions {
    security_level: SecurityLevel,
    role: ZapRole,
    domain: String,
    credentials: Option<UserNameAndPassword>,
    client_keys: Option<Keys>,
    server_key: Option<Keys>,
}

impl ZapOptions {
    /// Creates Grasslands client options.
    pub fn new() -> Self {
        Self {
            domain: "global".to_string(),
            ..Self::default()
        }
    }

    /// No authentication, connecting side.
    pub fn set_grasslands_client(&mut self) {
        self.reset(SecurityLevel::Grasslands, ZapRole::Client);
    }

    /// No authentication, binding side.
    pub fn set_grasslands_server(&mut self) {
        self.reset(SecurityLevel::Grasslands, ZapRole::Server);
    }

    /// IP validation only, connecting side.
    pub fn set_strawhouse_client(&mut self) {
        self.reset(SecurityLevel::Strawhouse, ZapRole::Client);
    }

    /// IP validation only, binding side.
    pub fn set_strawhouse_server(&mut self) {
        self.reset(SecurityLevel::Strawhouse, ZapRole::Server);
    }

    /// IP + username/password, connecting side.
    pub fn set_woodhouse_client(&mut self, credentials: &UserNameAndPassword) {
        self.reset(SecurityLevel::Woodhouse, ZapRole::Client);
        self.credentials = Some(credentials.clone());
    }

    /// IP + username/password, binding side.
    pub fn set_woodhouse_server(&mut self) {
        self.reset(SecurityLevel::Woodhouse, ZapRole::Server);
    }

    /// IP + client key verification, connecting side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the client keys lack the
    /// private half.
    pub fn set_stonehouse_client(&mut self, server_key: &Keys, client_keys: &Keys) -> Result<()> {
        if !client_keys.have_private_key() {
            return Err(Error::InvalidArgument(
                "stonehouse client requires a private key".into(),
            ));
        }
        self.reset(SecurityLevel::Stonehouse, ZapRole::Client);
        self.server_key = Some(server_key.clone());
        self.client_keys = Some(client_keys.clone());
        Ok(())
    }

    /// IP + client key verification, binding side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the server keys lack the
    /// private half.
    pub fn set_stonehouse_server(&mut self, server_keys: &Keys) -> Result<()> {
        if !server_keys.have_private_key() {
            return Err(Error::InvalidArgument(
                "stonehouse server requires a private key".into(),
            ));
        }
        self.reset(SecurityLevel::Stonehouse, ZapRole::Server);
        self.server_key = Some(server_keys.clone());
        Ok(())
    }

    /// Mutual key verification, connecting side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the client keys lack the
    /// private half.
    pub fn set_ironhouse_client(&mut self, server_key: &Keys, client_keys: &Keys) -> Result<()> {
        self.set_stonehouse_client(server_key, client_keys)?;
        self.security_level = SecurityLevel::Ironhouse;
        Ok(())
    }

    /// Mutual key verification, binding side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the server keys lack the
    /// private half.
    pub fn set_ironhouse_server(&mut self, server_keys: &Keys) -> Result<()> {
        self.set_stonehouse_server(server_keys)?;
        self.security_level = SecurityLevel::Ironhouse;
        Ok(())
    }

    /// Sets the ZAP domain; defaults to `"global"`.
    pub fn set_domain(&mut self, domain: &str) -> Result<()> {
        if domain.trim().is_empty() {
            return Err(Error::InvalidArgument("domain is empty".into()));
        }
        self.domain = domain.to_string();
        Ok(())
    }

    /// The ZAP domain.
    pub fn domain(&self) -> &str {
        if self.domain.is_empty() {
            "global"
        } else {
            &self.domain
        }
    }

    /// The configured security level.
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    /// The endpoint's handshake role.
    pub fn role(&self) -> ZapRole {
        self.role
    }

    /// The wire mechanism implied by the security level.
    pub fn mechanism(&self) -> Mechanism {
        match self.security_level {
            SecurityLevel::Grasslands | SecurityLevel::Strawhouse => Mechanism::Null,
            SecurityLevel::Woodhouse => Mechanism::Plain,
            SecurityLevel::Stonehouse | SecurityLevel::Ironhouse => Mechanism::Curve,
        }
    }

    /// The client credentials, when configured.
    pub fn credentials(&self) -> Option<&UserNameAndPassword> {
        self.credentials.as_ref()
    }

    /// The client key pair, when configured.
    pub fn client_keys(&self) -> Option<&Keys> {
        self.client_keys.as_ref()
    }

    /// The server key material, when configured. For clients this is the
    /// expected server public key; for servers the local key pair.
    pub fn server_key(&self) -> Option<&Keys> {
        self.server_key.as_ref()
    }

    fn reset(&mut self, level: SecurityLevel, role: ZapRole) {
        let domain = std::mem::take(&mut self.domain);
        *self = Self::new();
        self.domain = domain;
        self.security_level = level;
        self.role = role;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::KEY_LENGTH;

    #[test]
    fn defaults_are_grasslands_client() {
        let options = ZapOptions::new();
        assert_eq!(options.security_level(), SecurityLevel::Grasslands);
        assert_eq!(options.role(), ZapRole::Client);
        assert_eq!(options.mechanism(), Mechanism::Null);
        assert_eq!(options.domain(), "global");
    }

    #[test]
    fn woodhouse_client_carries_credentials() {
        let mut options = ZapOptions::new();
        let creds = UserNameAndPassword::new("user", "pass").unwrap();
        options.set_woodhouse_client(&creds);
        assert_eq!(options.mechanism(), Mechanism::Plain);
        assert_eq!(options.credentials().unwrap().user_name(), "user");
    }

    #[test]
    fn stonehouse_client_requires_private_key() {
        let mut options = ZapOptions::new();
        let server = Keys::from_public_key([1u8; KEY_LENGTH]);
        let public_only = Keys::from_public_key([2u8; KEY_LENGTH]);
        assert!(options.set_stonehouse_client(&server, &public_only).is_err());

        let pair = Keys::from_key_pair([2u8; KEY_LENGTH], [3u8; KEY_LENGTH]);
        options
            .set_stonehouse_client(&server, &pair)
            .expect("valid keys");
        assert_eq!(options.mechanism(), Mechanism::Curve);
    }

    #[test]
    fn level_switch_clears_stale_material() {
        let mut options = ZapOptions::new();
        options.set_domain("operator").unwrap();
        let creds = UserNameAndPassword::new("user", "pass").unwrap();
        options.set_woodhouse_client(&creds);
        options.set_strawhouse_client();
        assert!(options.credentials().is_none());
        assert_eq!(options.domain(), "operator");
    }
}
