// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The counter store and its request/router front.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use crate::authentication::{Authenticator, ZapOptions};
use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::messaging::request_router::{Router, RouterOptions};
use crate::messaging::Context;
use crate::services::incrementer::{
    IncrementRequest, IncrementResponse, ItemsRequest, ItemsResponse, ReturnCode,
};

/// Incrementer service configuration.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    address: Option<String>,
    sqlite_path: Option<std::path::PathBuf>,
    initial_value: i64,
    increment: i64,
    zap_options: ZapOptions,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            address: None,
            sqlite_path: None,
            initial_value: 0,
            increment: 1,
            zap_options: ZapOptions::new(),
        }
    }
}

impl ServiceOptions {
    /// Defaults: in-memory store, counters start at 0 and step by 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        crate::messaging::transport::Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// Sets the backing database file; omitted means in-memory.
    pub fn set_sqlite_path<P: AsRef<Path>>(&mut self, path: P) {
        self.sqlite_path = Some(path.as_ref().to_path_buf());
    }

    /// Sets the value the first draw of a new item returns.
    pub fn set_initial_value(&mut self, initial_value: i64) {
        self.initial_value = initial_value;
    }

    /// Sets the step between draws.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the increment is not
    /// positive.
    pub fn set_increment(&mut self, increment: i64) -> Result<()> {
        if increment <= 0 {
            return Err(Error::InvalidArgument(format!(
                "increment {} must be positive",
                increment
            )));
        }
        self.increment = increment;
        Ok(())
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }
}

/// SQLite-backed counter table shared by the service callback.
struct CounterStore {
    conn: Mutex<Connection>,
    initial_value: i64,
    increment: i64,
}

impl CounterStore {
    fn open(options: &ServiceOptions) -> Result<Self> {
        let conn = match &options.sqlite_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.execute(
            "CREATE TABLE IF NOT EXISTS counters (
                item TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            initial_value: options.initial_value,
            increment: options.increment,
        })
    }

    fn next_value(&self, item: &str) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO counters (item, value) VALUES (?1, ?2)
             ON CONFLICT(item) DO UPDATE SET value = value + ?3",
            rusqlite::params![item, self.initial_value, self.increment],
        )?;
        let value = conn.query_row(
            "SELECT value FROM counters WHERE item = ?1",
            [item],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(value)
    }

    fn items(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT item FROM counters ORDER BY item")?;
        let items = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }
}

/// Hands out monotone per-item identifiers.
pub struct Service {
    router: Router,
}

impl Service {
    /// Creates the service with no authenticator (Grasslands only).
    pub fn new(context: &Context) -> Self {
        Self {
            router: Router::new(context),
        }
    }

    /// Creates the service owning the given authenticator.
    pub fn with_authenticator(context: &Context, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            router: Router::with_authenticator(context, authenticator),
        }
    }

    /// Opens the store and binds the request endpoint.
    pub fn initialize(&self, options: &ServiceOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("service address not set".into()))?;
        let store = Arc::new(CounterStore::open(options)?);

        let mut router_options = RouterOptions::new();
        router_options.set_address(address)?;
        router_options.set_zap_options(&options.zap_options);
        router_options.set_callback(Arc::new(move |message_type, payload| {
            dispatch(&store, message_type, payload)
        }));
        self.router.initialize(&router_options)
    }

    /// Starts answering requests.
    pub fn start(&self) -> Result<()> {
        self.router.start()
    }

    /// True while the service is answering.
    pub fn is_running(&self) -> bool {
        self.router.is_running()
    }

    /// Stops the service. Idempotent.
    pub fn stop(&self) {
        self.router.stop();
    }
}

fn dispatch(store: &CounterStore, message_type: &str, payload: &[u8]) -> Result<Box<dyn Message>> {
    let increment_type = IncrementRequest::new();
    let items_type = ItemsRequest::new();
    if message_type == increment_type.message_type() {
        let mut request = increment_type;
        let mut response = IncrementResponse::new();
        if request.from_bytes(payload).is_err() || request.item().is_empty() {
            response.set_return_code(ReturnCode::InvalidMessage);
            return Ok(Box::new(response));
        }
        response.set_identifier(request.identifier());
        match store.next_value(request.item()) {
            Ok(value) => response.set_value(value),
            Err(e) => {
                log::error!("[incrementer] draw for {} failed: {}", request.item(), e);
                response.set_return_code(ReturnCode::AlgorithmFailure);
            }
        }
        return Ok(Box::new(response));
    }
    if message_type == items_type.message_type() {
        let mut request = items_type;
        let mut response = ItemsResponse::new();
        if request.from_bytes(payload).is_err() {
            response.set_return_code(ReturnCode::InvalidMessage);
            return Ok(Box::new(response));
        }
        response.set_identifier(request.identifier());
        match store.items() {
            Ok(items) => response.set_items(items),
            Err(e) => {
                log::error!("[incrementer] item listing failed: {}", e);
                response.set_return_code(ReturnCode::AlgorithmFailure);
            }
        }
        return Ok(Box::new(response));
    }
    Err(Error::InvalidMessageType(message_type.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_monotone_per_item() {
        let options = ServiceOptions::new();
        let store = CounterStore::open(&options).expect("open");
        assert_eq!(store.next_value("Pick").unwrap(), 0);
        assert_eq!(store.next_value("Pick").unwrap(), 1);
        assert_eq!(store.next_value("Event").unwrap(), 0);
        assert_eq!(store.next_value("Pick").unwrap(), 2);
        assert_eq!(store.items().unwrap(), vec!["Event", "Pick"]);
    }

    #[test]
    fn initial_value_and_increment_are_honored() {
        let mut options = ServiceOptions::new();
        options.set_initial_value(100);
        options.set_increment(10).unwrap();
        let store = CounterStore::open(&options).expect("open");
        assert_eq!(store.next_value("Pick").unwrap(), 100);
        assert_eq!(store.next_value("Pick").unwrap(), 110);
    }

    #[test]
    fn counters_persist_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("incrementer.sqlite3");
        let mut options = ServiceOptions::new();
        options.set_sqlite_path(&path);
        {
            let store = CounterStore::open(&options).expect("open");
            assert_eq!(store.next_value("Pick").unwrap(), 0);
        }
        let store = CounterStore::open(&options).expect("reopen");
        assert_eq!(store.next_value("Pick").unwrap(), 1);
    }

    #[test]
    fn nonpositive_increment_is_rejected() {
        let mut options = ServiceOptions::new();
        assert!(options.set_increment(0).is_err());
        assert!(options.set_increment(-5).is_err());
    }
}
