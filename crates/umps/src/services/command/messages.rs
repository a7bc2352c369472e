// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire messages of the command plane.
//!
//! Shared by the local IPC service and the remote command proxy: a
//! client lists a module's commands, issues one, or terminates it.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message_formats::Message;

const AVAILABLE_COMMANDS_REQUEST_TYPE: &str =
    "UMPS::Services::Command::AvailableCommandsRequest";
const AVAILABLE_COMMANDS_RESPONSE_TYPE: &str =
    "UMPS::Services::Command::AvailableCommandsResponse";
const COMMAND_REQUEST_TYPE: &str = "UMPS::Services::Command::CommandRequest";
const COMMAND_RESPONSE_TYPE: &str = "UMPS::Services::Command::CommandResponse";
const TERMINATE_REQUEST_TYPE: &str = "UMPS::Services::Command::TerminateRequest";
const TERMINATE_RESPONSE_TYPE: &str = "UMPS::Services::Command::TerminateResponse";
const MESSAGE_VERSION: &str = "1.0.0";

macro_rules! impl_cbor_message {
    ($name:ident, $type_string:expr) => {
        impl Message for $name {
            fn message_type(&self) -> &str {
                $type_string
            }

            fn message_version(&self) -> &str {
                MESSAGE_VERSION
            }

            fn clone_box(&self) -> Box<dyn Message> {
                Box::new(self.clone())
            }

            fn create_instance(&self) -> Box<dyn Message> {
                Box::new(Self::new())
            }

            fn to_bytes(&self) -> Result<Vec<u8>> {
                Ok(serde_cbor::to_vec(self)?)
            }

            fn from_bytes(&mut self, data: &[u8]) -> Result<()> {
                *self = serde_cbor::from_slice(data)?;
                Ok(())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn Any> {
                self
            }
        }
    };
}

/// Asks a module what commands it understands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableCommandsRequest {}

impl AvailableCommandsRequest {
    /// Creates a request.
    pub fn new() -> Self {
        Self::default()
    }
}

impl_cbor_message!(AvailableCommandsRequest, AVAILABLE_COMMANDS_REQUEST_TYPE);

/// A human-readable listing of a module's commands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableCommandsResponse {
    commands: String,
}

impl AvailableCommandsResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listing.
    pub fn set_commands(&mut self, commands: &str) {
        self.commands = commands.to_string();
    }

    /// The listing.
    pub fn commands(&self) -> &str {
        &self.commands
    }
}

impl_cbor_message!(AvailableCommandsResponse, AVAILABLE_COMMANDS_RESPONSE_TYPE);

/// Runs a named command on a module.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandRequest {
    command: String,
    arguments: Vec<String>,
}

impl CommandRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request for a command with no arguments.
    pub fn from_command(command: &str) -> Result<Self> {
        let mut request = Self::new();
        request.set_command(command)?;
        Ok(request)
    }

    /// Sets the command.
    pub fn set_command(&mut self, command: &str) -> Result<()> {
        if command.trim().is_empty() {
            return Err(Error::InvalidArgument("command is empty".into()));
        }
        self.command = command.trim().to_string();
        Ok(())
    }

    /// The command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Sets the command arguments.
    pub fn set_arguments(&mut self, arguments: Vec<String>) {
        self.arguments = arguments;
    }

    /// The command arguments.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

impl_cbor_message!(CommandRequest, COMMAND_REQUEST_TYPE);

/// The outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CommandResponse {
    exit_code: i32,
    standard_output: String,
    standard_error: String,
}

impl CommandResponse {
    /// Creates an empty response (exit code 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the exit code; zero means success.
    pub fn set_exit_code(&mut self, exit_code: i32) {
        self.exit_code = exit_code;
    }

    /// The exit code.
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Sets the captured standard output.
    pub fn set_standard_output(&mut self, standard_output: &str) {
        self.standard_output = standard_output.to_string();
    }

    /// The captured standard output.
    pub fn standard_output(&self) -> &str {
        &self.standard_output
    }

    /// Sets the captured standard error.
    pub fn set_standard_error(&mut self, standard_error: &str) {
        self.standard_error = standard_error.to_string();
    }

    /// The captured standard error.
    pub fn standard_error(&self) -> &str {
        &self.standard_error
    }
}

impl_cbor_message!(CommandResponse, COMMAND_RESPONSE_TYPE);

/// Tells a module to shut down.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminateRequest {}

impl TerminateRequest {
    /// Creates a request.
    pub fn new() -> Self {
        Self::default()
    }
}

impl_cbor_message!(TerminateRequest, TERMINATE_REQUEST_TYPE);

/// Acknowledges a terminate request; the module stops right after
/// sending this.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TerminateResponse {
    accepted: bool,
}

impl TerminateResponse {
    /// Creates a response; defaults to not accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the terminate as accepted.
    pub fn set_accepted(&mut self, accepted: bool) {
        self.accepted = accepted;
    }

    /// True when the module is going down.
    pub fn accepted(&self) -> bool {
        self.accepted
    }
}

impl_cbor_message!(TerminateResponse, TERMINATE_RESPONSE_TYPE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_request_round_trip() {
        let mut request = CommandRequest::from_command("status").unwrap();
        request.set_arguments(vec!["--verbose".to_string()]);
        let bytes = request.to_bytes().unwrap();
        let mut copy = CommandRequest::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(request, copy);
        assert_eq!(copy.command(), "status");
        assert_eq!(copy.arguments(), ["--verbose".to_string()]);
    }

    #[test]
    fn command_response_round_trip() {
        let mut response = CommandResponse::new();
        response.set_exit_code(0);
        response.set_standard_output("3 channels live");
        response.set_standard_error("");
        let bytes = response.to_bytes().unwrap();
        let mut copy = CommandResponse::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(response, copy);
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(CommandRequest::from_command("  ").is_err());
    }

    #[test]
    fn type_strings_are_unique() {
        let types = [
            AvailableCommandsRequest::new().message_type().to_string(),
            AvailableCommandsResponse::new().message_type().to_string(),
            CommandRequest::new().message_type().to_string(),
            CommandResponse::new().message_type().to_string(),
            TerminateRequest::new().message_type().to_string(),
            TerminateResponse::new().message_type().to_string(),
        ];
        let unique: std::collections::HashSet<_> = types.iter().collect();
        assert_eq!(unique.len(), types.len());
    }
}
