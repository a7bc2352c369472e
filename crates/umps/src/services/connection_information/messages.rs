// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire messages of the connection-information service.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message_formats::Message;
use crate::services::connection_information::ConnectionDetails;

const REQUEST_TYPE: &str = "UMPS::Services::ConnectionInformation::AvailableConnectionsRequest";
const RESPONSE_TYPE: &str = "UMPS::Services::ConnectionInformation::AvailableConnectionsResponse";
const MESSAGE_VERSION: &str = "1.0.0";

/// Asks the service for every registered endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableConnectionsRequest {
    identifier: u64,
}

impl AvailableConnectionsRequest {
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

impl Message for AvailableConnectionsRequest {
    fn message_type(&self) -> &str {
        REQUEST_TYPE
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

/// The service's answer: all registered descriptors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailableConnectionsResponse {
    details: Vec<ConnectionDetails>,
    identifier: u64,
}

impl AvailableConnectionsResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the descriptors.
    pub fn set_details(&mut self, details: Vec<ConnectionDetails>) {
        self.details = details;
    }

    /// The descriptors.
    pub fn details(&self) -> &[ConnectionDetails] {
        &self.details
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

impl Message for AvailableConnectionsResponse {
    fn message_type(&self) -> &str {
        RESPONSE_TYPE
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authentication::{SecurityLevel, UserPrivileges};
    use crate::messaging::ConnectOrBind;
    use crate::services::connection_information::SocketKind;

    #[test]
    fn response_round_trip() {
        let details = ConnectionDetails::new(
            "PacketCache",
            SocketKind::Router,
            "tcp://127.0.0.1:8080",
            SecurityLevel::Grasslands,
            ConnectOrBind::Connect,
            UserPrivileges::ReadOnly,
        )
        .unwrap();

        let mut response = AvailableConnectionsResponse::new();
        response.set_identifier(42);
        response.set_details(vec![details]);

        let bytes = response.to_bytes().expect("serialize");
        let mut copy = AvailableConnectionsResponse::new();
        copy.from_bytes(&bytes).expect("deserialize");
        assert_eq!(response, copy);
        assert_eq!(copy.details().len(), 1);
        assert_eq!(copy.details()[0].name(), "PacketCache");
    }
}
