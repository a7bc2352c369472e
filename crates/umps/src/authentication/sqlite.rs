// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Persistent authenticator backed by SQLite.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::authentication::{
    Authenticator, Keys, UserNameAndPassword, UserPrivileges, ValidationResult,
};
use crate::error::{Error, Result};

/// An authenticator with mutable allow/deny lists and a user table.
///
/// Thread-safe via an internal Mutex (a SQLite `Connection` is not `Sync`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     name TEXT PRIMARY KEY,
///     password TEXT,
///     public_key BLOB,
///     privileges INTEGER NOT NULL
/// );
/// CREATE TABLE blacklist (address TEXT PRIMARY KEY);
/// CREATE TABLE whitelist (address TEXT PRIMARY KEY);
/// ```
///
/// Whitelist semantics: an empty whitelist admits every address that is
/// not blacklisted; a non-empty whitelist admits members only.
pub struct SqliteAuthenticator {
    conn: Mutex<Connection>,
    minimum_privileges: UserPrivileges,
}

impl SqliteAuthenticator {
    /// Opens (creating if needed) a file-backed authenticator database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Creates an in-memory authenticator (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let authenticator = Self {
            conn: Mutex::new(conn),
            minimum_privileges: UserPrivileges::ReadOnly,
        };
        authenticator.init_schema()?;
        Ok(authenticator)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                name TEXT PRIMARY KEY,
                password TEXT,
                public_key BLOB,
                privileges INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute("CREATE TABLE IF NOT EXISTS blacklist (address TEXT PRIMARY KEY)", [])?;
        conn.execute("CREATE TABLE IF NOT EXISTS whitelist (address TEXT PRIMARY KEY)", [])?;
        Ok(())
    }

    /// Sets the minimum privileges granted to authenticated peers.
    pub fn set_minimum_user_privileges(&mut self, privileges: UserPrivileges) {
        self.minimum_privileges = privileges;
    }

    /// Adds an address to the deny list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the address is empty or is
    /// already whitelisted.
    pub fn add_to_blacklist(&self, address: &str) -> Result<()> {
        let address = non_empty(address)?;
        let conn = self.conn.lock();
        let whitelisted: Option<String> = conn
            .query_row(
                "SELECT address FROM whitelist WHERE address = ?1",
                [address],
                |row| row.get(0),
            )
            .optional()?;
        if whitelisted.is_some() {
            return Err(Error::InvalidArgument(format!(
                "{} is whitelisted; remove it first",
                address
            )));
        }
        conn.execute(
            "INSERT OR IGNORE INTO blacklist (address) VALUES (?1)",
            [address],
        )?;
        Ok(())
    }

    /// Removes an address from the deny list.
    pub fn remove_from_blacklist(&self, address: &str) -> Result<()> {
        let address = non_empty(address)?;
        self.conn
            .lock()
            .execute("DELETE FROM blacklist WHERE address = ?1", [address])?;
        Ok(())
    }

    /// Adds an address to the allow list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the address is empty or is
    /// already blacklisted.
    pub fn add_to_whitelist(&self, address: &str) -> Result<()> {
        let address = non_empty(address)?;
        let conn = self.conn.lock();
        let blacklisted: Option<String> = conn
            .query_row(
                "SELECT address FROM blacklist WHERE address = ?1",
                [address],
                |row| row.get(0),
            )
            .optional()?;
        if blacklisted.is_some() {
            return Err(Error::InvalidArgument(format!(
                "{} is blacklisted; remove it first",
                address
            )));
        }
        conn.execute(
            "INSERT OR IGNORE INTO whitelist (address) VALUES (?1)",
            [address],
        )?;
        Ok(())
    }

    /// Removes an address from the allow list.
    pub fn remove_from_whitelist(&self, address: &str) -> Result<()> {
        let address = non_empty(address)?;
        self.conn
            .lock()
            .execute("DELETE FROM whitelist WHERE address = ?1", [address])?;
        Ok(())
    }

    /// Adds or replaces a user record.
    pub fn add_user(
        &self,
        name: &str,
        password: &str,
        public_key: Option<&[u8; crate::authentication::KEY_LENGTH]>,
        privileges: UserPrivileges,
    ) -> Result<()> {
        let name = non_empty(name)?;
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO users (name, password, public_key, privileges)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                name,
                password,
                public_key.map(|k| k.to_vec()),
                privileges_to_int(privileges),
            ],
        )?;
        Ok(())
    }

    /// Deletes a user record.
    pub fn delete_user(&self, name: &str) -> Result<()> {
        let name = non_empty(name)?;
        self.conn
            .lock()
            .execute("DELETE FROM users WHERE name = ?1", [name])?;
        Ok(())
    }

    /// True when the user exists.
    pub fn have_user(&self, name: &str) -> bool {
        let conn = self.conn.lock();
        conn.query_row("SELECT name FROM users WHERE name = ?1", [name], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .ok()
        .flatten()
        .is_some()
    }

    fn check_address(&self, address: &str) -> ValidationResult {
        let conn = self.conn.lock();
        let blacklisted = conn
            .query_row(
                "SELECT COUNT(*) FROM blacklist WHERE address = ?1",
                [address],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0);
        if blacklisted > 0 {
            return ValidationResult::Blacklisted;
        }
        ValidationResult::Allowed
    }

    fn check_whitelist(&self, address: &str) -> ValidationResult {
        let conn = self.conn.lock();
        let total = conn
            .query_row("SELECT COUNT(*) FROM whitelist", [], |row| {
                row.get::<_, i64>(0)
            })
            .unwrap_or(0);
        if total == 0 {
            return ValidationResult::Allowed;
        }
        let member = conn
            .query_row(
                "SELECT COUNT(*) FROM whitelist WHERE address = ?1",
                [address],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0);
        if member > 0 {
            ValidationResult::Allowed
        } else {
            ValidationResult::Blacklisted
        }
    }
}

fn non_empty(value: &str) -> Result<&str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidArgument("value is empty".into()));
    }
    Ok(value)
}

fn privileges_to_int(privileges: UserPrivileges) -> i64 {
    match privileges {
        UserPrivileges::ReadOnly => 0,
        UserPrivileges::ReadWrite => 1,
        UserPrivileges::Administrator => 2,
    }
}

impl Authenticator for SqliteAuthenticator {
    fn is_blacklisted(&self, address: &str) -> (String, String) {
        self.check_address(address).into_status()
    }

    fn is_whitelisted(&self, address: &str) -> (String, String) {
        self.check_whitelist(address).into_status()
    }

    fn is_valid_credentials(&self, credentials: &UserNameAndPassword) -> (String, String) {
        let conn = self.conn.lock();
        let stored: Option<String> = conn
            .query_row(
                "SELECT password FROM users WHERE name = ?1",
                [credentials.user_name()],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or(None);
        let result = match stored {
            None => ValidationResult::InvalidUser,
            Some(password) if password == credentials.password() => ValidationResult::Allowed,
            Some(_) => ValidationResult::InvalidPassword,
        };
        result.into_status()
    }

    fn is_valid_keys(&self, keys: &Keys) -> (String, String) {
        let conn = self.conn.lock();
        let count = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE public_key = ?1",
                [keys.public_key().to_vec()],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0);
        let result = if count > 0 {
            ValidationResult::Allowed
        } else {
            ValidationResult::InvalidPublicKey
        };
        result.into_status()
    }

    fn minimum_user_privileges(&self) -> UserPrivileges {
        self.minimum_privileges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{CLIENT_ERROR_STATUS, KEY_LENGTH, OK_STATUS};

    #[test]
    fn blacklist_round_trip() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        assert_eq!(auth.is_blacklisted("127.0.0.1").0, OK_STATUS);

        auth.add_to_blacklist("127.0.0.1").expect("add");
        assert_eq!(auth.is_blacklisted("127.0.0.1").0, CLIENT_ERROR_STATUS);

        auth.remove_from_blacklist("127.0.0.1").expect("remove");
        assert_eq!(auth.is_blacklisted("127.0.0.1").0, OK_STATUS);
    }

    #[test]
    fn empty_whitelist_admits_all_nonempty_restricts() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        assert_eq!(auth.is_whitelisted("10.0.0.5").0, OK_STATUS);

        auth.add_to_whitelist("10.0.0.1").expect("add");
        assert_eq!(auth.is_whitelisted("10.0.0.1").0, OK_STATUS);
        assert_eq!(auth.is_whitelisted("10.0.0.5").0, CLIENT_ERROR_STATUS);
    }

    #[test]
    fn blacklist_and_whitelist_are_mutually_exclusive() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        auth.add_to_blacklist("10.0.0.9").expect("add");
        assert!(auth.add_to_whitelist("10.0.0.9").is_err());

        auth.add_to_whitelist("10.0.0.10").expect("add");
        assert!(auth.add_to_blacklist("10.0.0.10").is_err());
    }

    #[test]
    fn credential_checks() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        auth.add_user("operator", "magma", None, UserPrivileges::ReadWrite)
            .expect("add user");
        assert!(auth.have_user("operator"));

        let good = UserNameAndPassword::new("operator", "magma").unwrap();
        assert_eq!(auth.is_valid_credentials(&good).0, OK_STATUS);

        let bad_password = UserNameAndPassword::new("operator", "basalt").unwrap();
        assert_eq!(auth.is_valid_credentials(&bad_password).0, CLIENT_ERROR_STATUS);

        let unknown = UserNameAndPassword::new("ghost", "boo").unwrap();
        assert_eq!(auth.is_valid_credentials(&unknown).0, CLIENT_ERROR_STATUS);
    }

    #[test]
    fn key_checks() {
        let auth = SqliteAuthenticator::in_memory().expect("open");
        let key = [7u8; KEY_LENGTH];
        auth.add_user("station", "", Some(&key), UserPrivileges::ReadOnly)
            .expect("add user");

        assert_eq!(auth.is_valid_keys(&Keys::from_public_key(key)).0, OK_STATUS);
        assert_eq!(
            auth.is_valid_keys(&Keys::from_public_key([8u8; KEY_LENGTH])).0,
            CLIENT_ERROR_STATUS
        );
    }

    #[test]
    fn file_backed_store_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("auth.sqlite3");
        {
            let auth = SqliteAuthenticator::open(&path).expect("open");
            auth.add_to_blacklist("172.16.0.1").expect("add");
        }
        let auth = SqliteAuthenticator::open(&path).expect("reopen");
        assert_eq!(auth.is_blacklisted("172.16.0.1").0, CLIENT_ERROR_STATUS);
    }
}
