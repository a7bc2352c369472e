// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client side of the remote command plane.

use std::time::Duration;

use crate::authentication::ZapOptions;
use crate::error::{Error, Result};
use crate::message_formats::{downcast_ref, Failure, Message, Messages};
use crate::messaging::transport::{Endpoint, Socket, SocketOptions, SocketType};
use crate::messaging::Context;
use crate::proxy_services::command::{AvailableModulesRequest, AvailableModulesResponse};
use crate::services::command::{
    AvailableCommandsRequest, AvailableCommandsResponse, CommandRequest, CommandResponse,
    ModuleDetails, TerminateRequest, TerminateResponse,
};

/// Requestor configuration.
#[derive(Clone)]
pub struct RequestorOptions {
    address: Option<String>,
    time_out: Option<Duration>,
    zap_options: ZapOptions,
}

impl Default for RequestorOptions {
    fn default() -> Self {
        Self {
            address: None,
            time_out: Some(Duration::from_millis(2500)),
            zap_options: ZapOptions::new(),
        }
    }
}

impl RequestorOptions {
    /// Defaults: 2.5 s timeout, Grasslands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the proxy frontend address.
    pub fn set_address(&mut self, address: &str) -> Result<()> {
        Endpoint::parse(address)?;
        self.address = Some(address.to_string());
        Ok(())
    }

    /// Sets the request timeout.
    pub fn set_time_out(&mut self, time_out: Option<Duration>) {
        self.time_out = time_out;
    }

    /// Sets the authentication options.
    pub fn set_zap_options(&mut self, zap_options: &ZapOptions) {
        self.zap_options = zap_options.clone();
    }
}

/// Lists modules and issues commands through the proxy.
pub struct Requestor {
    socket: Option<Socket>,
    context: Context,
    formats: Messages,
    time_out: Option<Duration>,
}

impl Requestor {
    /// Creates an uninitialized requestor under the context.
    pub fn new(context: &Context) -> Self {
        Self {
            socket: None,
            context: context.clone(),
            formats: Messages::new(),
            time_out: Some(Duration::from_millis(2500)),
        }
    }

    /// Connects to the proxy frontend.
    pub fn initialize(&mut self, options: &RequestorOptions) -> Result<()> {
        let address = options
            .address
            .as_deref()
            .ok_or_else(|| Error::InvalidArgument("requestor address not set".into()))?;

        let mut formats = Messages::new();
        formats.add(Box::new(AvailableModulesResponse::new()))?;
        formats.add(Box::new(AvailableCommandsResponse::new()))?;
        formats.add(Box::new(CommandResponse::new()))?;
        formats.add(Box::new(TerminateResponse::new()))?;
        formats.add(Box::new(Failure::new()))?;

        let mut socket_options = SocketOptions::new();
        socket_options.set_zap_options(&options.zap_options);
        socket_options.set_send_timeout(options.time_out);
        let socket = Socket::new(SocketType::Request, socket_options);
        socket.connect(&Endpoint::parse(address)?)?;

        self.context.register_socket();
        self.socket = Some(socket);
        self.formats = formats;
        self.time_out = options.time_out;
        Ok(())
    }

    /// Lists the modules the proxy believes are alive.
    pub fn available_modules(&self) -> Result<Vec<ModuleDetails>> {
        let request = AvailableModulesRequest::new();
        let reply = self.exchange(None, &request)?;
        match downcast_ref::<AvailableModulesResponse>(reply.as_ref()) {
            Some(response) => Ok(response.modules().to_vec()),
            None => Err(unexpected_reply(reply.as_ref())),
        }
    }

    /// Asks a module for its command listing.
    pub fn available_commands(&self, module: &str) -> Result<AvailableCommandsResponse> {
        let request = AvailableCommandsRequest::new();
        let reply = self.exchange(Some(module), &request)?;
        match downcast_ref::<AvailableCommandsResponse>(reply.as_ref()) {
            Some(response) => Ok(response.clone()),
            None => Err(unexpected_reply(reply.as_ref())),
        }
    }

    /// Runs a command on a module.
    pub fn issue_command(&self, module: &str, request: &CommandRequest) -> Result<CommandResponse> {
        let reply = self.exchange(Some(module), request)?;
        match downcast_ref::<CommandResponse>(reply.as_ref()) {
            Some(response) => Ok(response.clone()),
            None => Err(unexpected_reply(reply.as_ref())),
        }
    }

    /// Tells a module to shut down.
    pub fn terminate(&self, module: &str) -> Result<TerminateResponse> {
        let request = TerminateRequest::new();
        let reply = self.exchange(Some(module), &request)?;
        match downcast_ref::<TerminateResponse>(reply.as_ref()) {
            Some(response) => Ok(response.clone()),
            None => Err(unexpected_reply(reply.as_ref())),
        }
    }

    /// One request/reply exchange, optionally addressed to a module.
    fn exchange(&self, module: Option<&str>, message: &dyn Message) -> Result<Box<dyn Message>> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::NotInitialized("command requestor".into()))?;

        while socket.receive(Some(Duration::ZERO))?.is_some() {}

        let payload = message.to_bytes()?;
        let mut frames = Vec::with_capacity(3);
        if let Some(module) = module {
            if module.trim().is_empty() {
                return Err(Error::InvalidArgument("module name is empty".into()));
            }
            frames.push(module.as_bytes().to_vec());
        }
        frames.push(message.message_type().as_bytes().to_vec());
        frames.push(payload);
        socket.send(frames)?;

        let Some(parts) = socket.receive(self.time_out)? else {
            return Err(Error::Timeout);
        };
        if parts.len() != 2 {
            return Err(Error::InvalidMessage(format!(
                "reply had {} frames (want 2)",
                parts.len()
            )));
        }
        let message_type = std::str::from_utf8(&parts[0])
            .map_err(|_| Error::InvalidMessage("non-UTF-8 reply type frame".into()))?;
        self.formats.deserialize(message_type, &parts[1])
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

fn unexpected_reply(reply: &dyn Message) -> Error {
    if let Some(failure) = downcast_ref::<Failure>(reply) {
        return Error::AlgorithmFailure(failure.details().to_string());
    }
    Error::InvalidMessageType(reply.message_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_before_initialize_fail() {
        let context = Context::new();
        let requestor = Requestor::new(&context);
        assert!(matches!(
            requestor.available_modules(),
            Err(Error::NotInitialized(_))
        ));
    }

    #[test]
    fn empty_module_name_is_rejected() {
        let context = Context::new();
        let mut requestor = Requestor::new(&context);
        let mut options = RequestorOptions::new();
        options.set_address("tcp://127.0.0.1:59980").unwrap();
        options.set_time_out(Some(Duration::from_millis(50)));
        requestor.initialize(&options).expect("initialize");
        let request = CommandRequest::from_command("status").unwrap();
        assert!(matches!(
            requestor.issue_command("  ", &request),
            Err(Error::InvalidArgument(_))
        ));
    }
}
