// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire messages between proxy, modules, and clients.

use std::any::Any;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message_formats::Message;
use crate::services::command::ModuleDetails;

const REGISTRATION_REQUEST_TYPE: &str =
    "UMPS::ProxyServices::Command::RegistrationRequest";
const REGISTRATION_RESPONSE_TYPE: &str =
    "UMPS::ProxyServices::Command::RegistrationResponse";
const PING_REQUEST_TYPE: &str = "UMPS::ProxyServices::Command::PingRequest";
const PING_RESPONSE_TYPE: &str = "UMPS::ProxyServices::Command::PingResponse";
const AVAILABLE_MODULES_REQUEST_TYPE: &str =
    "UMPS::ProxyServices::Command::AvailableModulesRequest";
const AVAILABLE_MODULES_RESPONSE_TYPE: &str =
    "UMPS::ProxyServices::Command::AvailableModulesResponse";
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

/// A registered module's liveness state inside the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModuleState {
    /// Never heard from.
    #[default]
    Unknown,
    /// Registration received, not yet pinged.
    Registering,
    /// Answering pings.
    Alive,
    /// One or more pings outstanding.
    Missed,
    /// Too many consecutive misses; deregistered.
    Dead,
}

/// Register or deregister with the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegistrationType {
    /// Join the module table.
    #[default]
    Register,
    /// Leave the module table.
    Deregister,
}

/// Outcome of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RegistrationReturnCode {
    /// The registration was applied.
    #[default]
    Success,
    /// The request could not be parsed.
    InvalidRequest,
    /// Another live module already holds the name.
    Exists,
    /// The proxy failed internally.
    ServerError,
}

/// A module announcing itself to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationRequest {
    module_details: Option<ModuleDetails>,
    registration_type: RegistrationType,
}

impl RegistrationRequest {
    /// Creates an empty registration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the module's identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the details have no name.
    pub fn set_module_details(&mut self, details: &ModuleDetails) -> Result<()> {
        if details.name().is_empty() {
            return Err(Error::InvalidArgument("module name not set".into()));
        }
        self.module_details = Some(details.clone());
        Ok(())
    }

    /// The module's identity.
    pub fn module_details(&self) -> Option<&ModuleDetails> {
        self.module_details.as_ref()
    }

    /// Sets whether this registers or deregisters.
    pub fn set_registration_type(&mut self, registration_type: RegistrationType) {
        self.registration_type = registration_type;
    }

    /// Whether this registers or deregisters.
    pub fn registration_type(&self) -> RegistrationType {
        self.registration_type
    }
}

impl Message for RegistrationRequest {
    fn message_type(&self) -> &str {
        REGISTRATION_REQUEST_TYPE
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
        if self.module_details.is_none() {
            return Err(Error::InvalidMessage("module details not set".into()));
        }
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

/// The proxy's answer to a registration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationResponse {
    return_code: RegistrationReturnCode,
}

impl RegistrationResponse {
    /// Creates a successful response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the outcome.
    pub fn set_return_code(&mut self, return_code: RegistrationReturnCode) {
        self.return_code = return_code;
    }

    /// The outcome.
    pub fn return_code(&self) -> RegistrationReturnCode {
        self.return_code
    }
}

impl_cbor_message!(RegistrationResponse, REGISTRATION_RESPONSE_TYPE);

/// A liveness probe from the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PingRequest {
    time_microseconds: i64,
}

impl Default for PingRequest {
    fn default() -> Self {
        Self {
            time_microseconds: now_microseconds(),
        }
    }
}

impl PingRequest {
    /// Creates a probe stamped with the current time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the probe time in microseconds since the epoch.
    pub fn set_time_microseconds(&mut self, time: i64) {
        self.time_microseconds = time;
    }

    /// The probe time in microseconds since the epoch.
    pub fn time_microseconds(&self) -> i64 {
        self.time_microseconds
    }
}

impl_cbor_message!(PingRequest, PING_REQUEST_TYPE);

/// A module's acknowledgement of a ping; echoes the probe time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PingResponse {
    time_microseconds: i64,
}

impl PingResponse {
    /// Creates an acknowledgement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the echoed probe time.
    pub fn set_time_microseconds(&mut self, time: i64) {
        self.time_microseconds = time;
    }

    /// The echoed probe time.
    pub fn time_microseconds(&self) -> i64 {
        self.time_microseconds
    }
}

impl_cbor_message!(PingResponse, PING_RESPONSE_TYPE);

/// Asks the proxy which modules are alive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableModulesRequest {
    identifier: u64,
}

impl AvailableModulesRequest {
    /// Creates a request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a correlation identifier echoed in the response.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// The correlation identifier.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }
}

impl_cbor_message!(AvailableModulesRequest, AVAILABLE_MODULES_REQUEST_TYPE);

/// The live modules.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableModulesResponse {
    modules: Vec<ModuleDetails>,
    identifier: u64,
}

impl AvailableModulesResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the live modules.
    pub fn set_modules(&mut self, modules: Vec<ModuleDetails>) {
        self.modules = modules;
    }

    /// The live modules.
    pub fn modules(&self) -> &[ModuleDetails] {
        &self.modules
    }

    /// Sets the echoed correlation identifier.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// The echoed correlation identifier.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }
}

impl_cbor_message!(AvailableModulesResponse, AVAILABLE_MODULES_RESPONSE_TYPE);

#[allow(clippy::cast_possible_truncation)]
fn now_microseconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_requires_details() {
        let request = RegistrationRequest::new();
        assert!(request.to_bytes().is_err());

        let mut details = ModuleDetails::new();
        details.set_name("scanner").unwrap();
        let mut request = RegistrationRequest::new();
        request.set_module_details(&details).unwrap();
        let bytes = request.to_bytes().unwrap();

        let mut copy = RegistrationRequest::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(copy.module_details().unwrap().name(), "scanner");
        assert_eq!(copy.registration_type(), RegistrationType::Register);
    }

    #[test]
    fn ping_round_trip_echoes_time() {
        let request = PingRequest::new();
        assert!(request.time_microseconds() > 0);

        let mut response = PingResponse::new();
        response.set_time_microseconds(request.time_microseconds());
        let bytes = response.to_bytes().unwrap();
        let mut copy = PingResponse::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(copy.time_microseconds(), request.time_microseconds());
    }
}
