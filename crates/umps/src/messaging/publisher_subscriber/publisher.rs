// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The broadcast sender.

use std::time::Duration;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use crate::messaging::{ConnectOrBind, Context};

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherOptions {
    address: Option<String>,
    connect_or_bind: ConnectOrBind,
    high_water_mark: usize,
    send_timeout: Option<Duration>,
    zap_options: ZapOptions,
}

impl Default for PublisherOptions {
    fn default() -> Self {
        Self {
            address: None,
            connect_or_bind: ConnectOrBind::Bind,
            high_water_mark: 8192,
            send_timeout: Some(Duration::from_millis(1000)),
            zap_options: ZapOptions::new(),
        }
    }
}

impl PublisherOptions {
    /// Defaults: bind, HWM 8192, 1 s send timeout, Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address, e.g. `tcp://127.0.0.1:5555`.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets whether to bind (direct pub/sub) or connect (to an XSUB
    /// proxy frontend).
    pub fn set_connect_or_bind(&mut self, connect_or_bind: ConnectOrBind) {
        self.connect_or_bind = connect_or_bind;
    }

    /// Sets the outbound high-water mark.
    pub fn set_high_water_mark(&mut self, hwm: usize) {
        self.high_water_mark = hwm.max(1);
    }

    /// The outbound high-water mark.
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Sets the send timeout; `None` blocks indefinitely.
    pub fn set_send_timeout(&mut self, timeout: Option<Duration>) {
        self.send_timeout = timeout;
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }

    /// The authentication options.
    pub fn zap_options(&self) -> &ZapOptions {
        &self.zap_options
    }
}

/// Publishes typed messages to every subscribed peer.
pub struct Publisher {
    context: Context,
    socket: Option<Socket>,
    address: Option<String>,
}

impl Publisher {
    /// Creates an uninitialized publisher under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            socket: None,
            address: None,
        }
    }

    /// Binds (or connects) the publisher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when no address is set and
    /// [`Error::TransportError`] when the endpoint cannot be bound.
    pub fn initialize(&mut self, options: &PublisherOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("publisher address not set".into()))?;
        let endpoint = Endpoint::parse(address)?;

        let mut socket_options = SocketOptions::new();
        socket_options.set_send_high_water_mark(options.high_water_mark);
        socket_options.set_send_timeout(options.send_timeout);
        socket_options.set_zap_options(&options.zap_options);

        let socket = Socket::new(SocketType::Publisher, socket_options);
        match options.connect_or_bind {
            ConnectOrBind::Bind => socket.bind(&endpoint)?,
            ConnectOrBind::Connect => socket.connect(&endpoint)?,
        }
        self.context.register_socket();
        self.socket = Some(socket);
        self.address = Some(address.to_string());
        Ok(())
    }

    /// True after a successful [`Self::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.socket.is_some()
    }

    /// The bound or connected address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sends a message as `[type, payload]` frames.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before `initialize` and
    /// serialization errors from the message itself. Delivery is
    /// fire-and-forget; slow subscribers drop.
    pub fn send(&self, message: &dyn Message) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::NotInitialized("publisher".into()))?;
        let payload = message.to_bytes()?;
        socket.send(vec![message.message_type().as_bytes().to_vec(), payload])
    }

    /// Number of connected subscribers (or proxies).
    pub fn connection_count(&self) -> usize {
        self.socket.as_ref().map_or(0, Socket::connection_count)
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.close();
            self.context.deregister_socket();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_before_initialize_fails() {
        let context = Context::new();
        let publisher = Publisher::new(&context);
        let text = crate::message_formats::Text::from_contents("x");
        assert!(matches!(
            publisher.send(&text),
            Err(Error::NotInitialized(_))
        ));
    }

    #[test]
    fn initialize_requires_address() {
        let context = Context::new();
        let mut publisher = Publisher::new(&context);
        let options = PublisherOptions::new();
        assert!(publisher.initialize(&options).is_err());
        assert!(!publisher.is_initialized());
    }
}
