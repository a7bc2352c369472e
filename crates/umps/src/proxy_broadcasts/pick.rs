// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The pick broadcast.

use std::time::Duration;

use crate::authentication::ZapOptions;
use crate::error::Result;
use crate::message_formats::{downcast, Messages, Pick};
use crate::messaging::publisher_subscriber;
use crate::messaging::{ConnectOrBind, Context};

pub use crate::messaging::xpub_xsub::{Proxy, ProxyOptions};

/// Publishes picks into the broadcast frontend.
pub struct Publisher {
    inner: publisher_subscriber::Publisher,
}

impl Publisher {
    /// Creates an uninitialized publisher under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            inner: publisher_subscriber::Publisher::new(context),
        }
    }

    /// Connects to the broadcast's XSUB frontend.
    pub fn initialize(&mut self, frontend_address: &str, zap_options: &ZapOptions) -> Result<()> {
        let mut options = publisher_subscriber::PublisherOptions::new();
        options.set_address(frontend_address)?;
        options.set_connect_or_bind(ConnectOrBind::Connect);
        options.set_zap_options(zap_options);
        self.inner.initialize(&options)
    }

    /// Publishes one pick.
    pub fn send(&self, pick: &Pick) -> Result<()> {
        self.inner.send(pick)
    }
}

/// Receives picks from the broadcast backend.
pub struct Subscriber {
    inner: publisher_subscriber::Subscriber,
}

impl Subscriber {
    /// Creates an uninitialized subscriber under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            inner: publisher_subscriber::Subscriber::new(context),
        }
    }

    /// Connects to the broadcast's XPUB backend.
    pub fn initialize(&mut self, backend_address: &str, zap_options: &ZapOptions) -> Result<()> {
        let mut formats = Messages::new();
        formats.add(Box::new(Pick::new()))?;

        let mut options = publisher_subscriber::SubscriberOptions::new();
        options.set_address(backend_address)?;
        options.set_zap_options(zap_options);
        options.set_message_formats(&formats)?;
        self.inner.initialize(&options)
    }

    /// Receives the next pick; `Ok(None)` on timeout.
    pub fn receive(&self, timeout: Option<Duration>) -> Result<Option<Pick>> {
        match self.inner.receive_with_timeout(timeout)? {
            Some(message) => Ok(Some(*downcast::<Pick>(message)?)),
            None => Ok(None),
        }
    }
}
