// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The blocking request client.

use std::time::Duration;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::{Message, Messages};
use crate::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use crate::messaging::Context;

/// Requestor configuration.
#[derive(Clone)]
pub struct RequestorOptions {
    address: Option<String>,
    time_out: Option<Duration>,
    zap_options: ZapOptions,
    message_formats: Messages,
}

impl Default for RequestorOptions {
    fn default() -> Self {
        Self {
            address: None,
            time_out: Some(Duration::from_millis(1000)),
            zap_options: ZapOptions::new(),
            message_formats: Messages::new(),
        }
    }
}

impl RequestorOptions {
    /// Defaults: 1 s timeout, Grasslands, no reply formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the router address to connect to.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// The router address.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets how long `request` waits for a reply: `None` blocks
    /// indefinitely, a zero duration returns immediately (the reply, if
    /// any, is dropped), a positive duration bounds the wait.
    pub fn set_time_out(&mut self, time_out: Option<Duration>) {
        self.time_out = time_out;
    }

    /// The receive timeout.
    pub fn time_out(&self) -> Option<Duration> {
        self.time_out
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }

    /// The authentication options.
    pub fn zap_options(&self) -> &ZapOptions {
        &self.zap_options
    }

    /// Registers the reply formats this requestor can decode.
    pub fn set_message_formats(&mut self, message_formats: &Messages) -> Result<()> {
        if message_formats.is_empty() {
            return Err(Error::InvalidArgument(
                "requestor needs at least one reply format".into(),
            ));
        }
        self.message_formats = message_formats.clone();
        Ok(())
    }

    /// The registered reply formats.
    pub fn message_formats(&self) -> &Messages {
        &self.message_formats
    }
}

/// Sends one request at a time and waits for the typed reply.
pub struct Requestor {
    context: Context,
    socket: Option<Socket>,
    message_formats: Messages,
    time_out: Option<Duration>,
}

impl Requestor {
    /// Creates an uninitialized requestor under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            context: context.clone(),
            socket: None,
            message_formats: Messages::new(),
            time_out: Some(Duration::from_millis(1000)),
        }
    }

    /// Connects to the router.
    pub fn initialize(&mut self, options: &RequestorOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("requestor address not set".into()))?;
        if options.message_formats.is_empty() {
            return Err(Error::InvalidArgument(
                "requestor needs at least one reply format".into(),
            ));
        }

        let mut socket_options = SocketOptions::new();
        socket_options.set_zap_options(&options.zap_options);
        // The configured timeout bounds the whole exchange, including the
        // wait for the router to appear.
        socket_options.set_send_timeout(options.time_out);
        let socket = Socket::new(SocketType::Request, socket_options);
        socket.connect(&Endpoint::parse(address)?)?;

        self.context.register_socket();
        self.socket = Some(socket);
        self.message_formats = options.message_formats.clone();
        self.time_out = options.time_out;
        Ok(())
    }

    /// True after a successful [`Self::initialize`].
    pub fn is_initialized(&self) -> bool {
        self.socket.is_some()
    }

    /// Sends a request and waits for the reply with the configured
    /// timeout.
    ///
    /// Returns `Ok(None)` when the timeout expires before a reply
    /// arrives.
    pub fn request(&self, message: &dyn Message) -> Result<Option<Box<dyn Message>>> {
        self.request_with_timeout(message, self.time_out)
    }

    /// Sends a request with an explicit timeout.
    pub fn request_with_timeout(
        &self,
        message: &dyn Message,
        time_out: Option<Duration>,
    ) -> Result<Option<Box<dyn Message>>> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::NotInitialized("requestor".into()))?;

        // A reply from an abandoned earlier request must not satisfy this
        // one.
        while socket.receive(Some(Duration::ZERO))?.is_some() {}

        let deadline = time_out.map(|t| std::time::Instant::now() + t);
        let payload = message.to_bytes()?;
        match socket.send(vec![message.message_type().as_bytes().to_vec(), payload]) {
            Ok(()) => {}
            Err(Error::Timeout) => return Ok(None),
            Err(e) => return Err(e),
        }

        let remaining = deadline.map(|d| d.saturating_duration_since(std::time::Instant::now()));
        let Some(parts) = socket.receive(remaining)? else {
            return Ok(None);
        };
        if parts.len() != 2 {
            return Err(Error::InvalidMessage(format!(
                "reply had {} frames (want 2)",
                parts.len()
            )));
        }
        let message_type = std::str::from_utf8(&parts[0])
            .map_err(|_| Error::InvalidMessage("non-UTF-8 reply type frame".into()))?;
        self.message_formats
            .deserialize(message_type, &parts[1])
            .map(Some)
    }
}

impl Drop for Requestor {
    fn drop(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.close();
            self.context.deregister_socket();
        }
    }
}
