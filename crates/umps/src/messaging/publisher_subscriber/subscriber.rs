// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The broadcast receiver.

use std::time::{Duration, Instant};

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::{Message, Messages};
use crate::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use crate::messaging::Context;

/// Subscriber configuration.
#[derive(Clone)]
pub struct SubscriberOptions {
    address: Option<String>,
    high_water_mark: usize,
    receive_timeout: Option<Duration>,
    zap_options: ZapOptions,
    message_formats: Messages,
}

impl Default for SubscriberOptions {
    fn default() -> Self {
        Self {
            address: None,
            high_water_mark: 8192,
            receive_timeout: Some(Duration::from_millis(10)),
            zap_options: ZapOptions::new(),
            message_formats: Messages::new(),
        }
    }
}

impl SubscriberOptions {
    /// Defaults: HWM 8192, 10 ms receive timeout, Grasslands, no formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the publisher (or XPUB backend) address to connect to.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets the inbound high-water mark.
    pub fn set_high_water_mark(&mut self, hwm: usize) {
        self.high_water_mark = hwm.max(1);
    }

    /// Sets the default receive timeout; `None` blocks indefinitely.
    pub fn set_receive_timeout(&mut self, timeout: Option<Duration>) {
        self.receive_timeout = timeout;
    }

    /// The default receive timeout.
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }

    /// The authentication options.
    pub fn zap_options(&self) -> &ZapOptions {
        &self.zap_options
    }

    /// Registers the message formats this subscriber wants. Each format's
    /// type string doubles as its topic subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when no formats are given.
    pub fn set_message_formats(&mut self, message_formats: &Messages) -> Result<()> {
        if message_formats.is_empty() {
            return Err(Error::InvalidArgument(
                "subscriber needs at least one message format".into(),
            ));
        }
        self.message_formats = message_formats.clone();
        Ok(())
    }

    /// The registered message formats.
    pub fn message_formats(&self) -> &Messages {
        &self.message_formats
    }
}

/// Receives typed messages from a publisher.
pub struct Subscriber {
    context: Context,
    socket: Option<Socket>,
    message_formats: Messages,
    receive_timeout: Option<Duration>,
}

impl Subscriber {
    /// Creates an uninitialized subscriber under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            socket: None,
            message_formats: Messages::new(),
            receive_timeout: Some(Duration::from_millis(10)),
        }
    }

    /// Connects and subscribes to every registered message type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the address or formats are
    /// missing.
    pub fn initialize(&mut self, options: &SubscriberOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("subscriber address not set".into()))?;
        if options.message_formats.is_empty() {
            return Err(Error::InvalidArgument(
                "subscriber needs at least one message format".into(),
            ));
        }
        let endpoint = Endpoint::parse(address)?;

        let mut socket_options = SocketOptions::new();
        socket_options.set_receive_high_water_mark(options.high_water_mark);
        socket_options.set_zap_options(&options.zap_options);

        let socket = Socket::new(SocketType::Subscriber, socket_options);
        for message_type in options.message_formats.message_types() {
            socket.subscribe(message_type.as_bytes())?;
        }
        socket.connect(&endpoint)?;

        self.context.register_socket();
        self.socket = Some(socket);
        self.message_formats = options.message_formats.clone();
        self.receive_timeout = options.receive_timeout;
        Ok(())
    }

    /// True after a successful [`Self::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.socket.is_some()
    }

    /// Receives the next message using the configured timeout.
    ///
    /// Returns `Ok(None)` when the timeout expires. Frames whose type is
    /// unregistered or whose payload fails to parse are dropped with a
    /// warning; the receive keeps waiting out the remaining timeout.
    pub fn receive(&self) -> Result<Option<Box<dyn Message>>> {
        self.receive_with_timeout(self.receive_timeout)
    }

    /// Receives the next message with an explicit timeout.
    pub fn receive_with_timeout(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<Box<dyn Message>>> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::NotInitialized("subscriber".into()))?;
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let remaining = match deadline {
                None => None,
                Some(deadline) => Some(deadline.saturating_duration_since(Instant::now())),
            };
            let Some(parts) = socket.receive(remaining)? else {
                return Ok(None);
            };
            if parts.len() != 2 {
                log::warn!(
                    "[subscriber] dropped message with {} frames (want 2)",
                    parts.len()
                );
                continue;
            }
            let Ok(message_type) = std::str::from_utf8(&parts[0]) else {
                log::warn!("[subscriber] dropped message with non-UTF-8 type frame");
                continue;
            };
            match self.message_formats.deserialize(message_type, &parts[1]) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    log::warn!("[subscriber] dropped {}: {}", message_type, e);
                    continue;
                }
            }
        }
    }
}

impl Drop for Subscriber {
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
    use crate::message_formats::Text;

    #[test]
    fn initialize_requires_formats_and_address() {
        let context = Context::new();
        let mut subscriber = Subscriber::new(&context);

        let mut options = SubscriberOptions::new();
        assert!(subscriber.initialize(&options).is_err());

        options.set_address("tcp://127.0.0.1:59990").unwrap();
        assert!(subscriber.initialize(&options).is_err());

        let mut formats = Messages::new();
        formats.add(Box::new(Text::new())).unwrap();
        options.set_message_formats(&formats).unwrap();
        assert!(subscriber.initialize(&options).is_ok());
    }
}
