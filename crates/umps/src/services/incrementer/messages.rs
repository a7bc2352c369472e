// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire messages of the incrementer service.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message_formats::Message;

const INCREMENT_REQUEST_TYPE: &str = "UMPS::Services::Incrementer::IncrementRequest";
const INCREMENT_RESPONSE_TYPE: &str = "UMPS::Services::Incrementer::IncrementResponse";
const ITEMS_REQUEST_TYPE: &str = "UMPS::Services::Incrementer::ItemsRequest";
const ITEMS_RESPONSE_TYPE: &str = "UMPS::Services::Incrementer::ItemsResponse";
const MESSAGE_VERSION: &str = "1.0.0";

/// Outcome of an incrementer operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnCode {
    /// The operation succeeded.
    #[default]
    Success,
    /// The request could not be parsed.
    InvalidMessage,
    /// The backing store failed.
    AlgorithmFailure,
}

/// Asks for the next value of an item's counter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncrementRequest {
    item: String,
    identifier: u64,
}

impl IncrementRequest {
    /// Creates an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the item, e.g. `"Pick"` or `"Event"`.
    pub fn set_item(&mut self, item: &str) -> Result<()> {
        if item.trim().is_empty() {
            return Err(Error::InvalidArgument("item is empty".into()));
        }
        self.item = item.trim().to_string();
        Ok(())
    }

    /// The item.
    pub fn item(&self) -> &str {
        &self.item
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

impl Message for IncrementRequest {
    fn message_type(&self) -> &str {
        INCREMENT_REQUEST_TYPE
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
        if self.item.is_empty() {
            return Err(Error::InvalidMessage("increment item not set".into()));
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

/// The next counter value for an item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncrementResponse {
    value: i64,
    identifier: u64,
    return_code: ReturnCode,
}

impl IncrementResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the drawn value.
    pub fn set_value(&mut self, value: i64) {
        self.value = value;
    }

    /// The drawn value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Sets the echoed correlation identifier.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// The echoed correlation identifier.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }

    /// Sets the outcome.
    pub fn set_return_code(&mut self, return_code: ReturnCode) {
        self.return_code = return_code;
    }

    /// The outcome.
    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }
}

impl Message for IncrementResponse {
    fn message_type(&self) -> &str {
        INCREMENT_RESPONSE_TYPE
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

/// Asks which items have counters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsRequest {
    identifier: u64,
}

impl ItemsRequest {
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

impl Message for ItemsRequest {
    fn message_type(&self) -> &str {
        ITEMS_REQUEST_TYPE
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

/// The items with counters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    items: Vec<String>,
    identifier: u64,
    return_code: ReturnCode,
}

impl ItemsResponse {
    /// Creates an empty response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the items.
    pub fn set_items(&mut self, items: Vec<String>) {
        self.items = items;
    }

    /// The items.
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Sets the echoed correlation identifier.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// Sets the outcome.
    pub fn set_return_code(&mut self, return_code: ReturnCode) {
        self.return_code = return_code;
    }

    /// The outcome.
    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }
}

impl Message for ItemsResponse {
    fn message_type(&self) -> &str {
        ITEMS_RESPONSE_TYPE
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

    #[test]
    fn increment_request_requires_item() {
        let mut request = IncrementRequest::new();
        assert!(request.to_bytes().is_err());
        assert!(request.set_item(" ").is_err());
        request.set_item("Pick").unwrap();
        assert!(request.to_bytes().is_ok());
    }

    #[test]
    fn increment_round_trip() {
        let mut request = IncrementRequest::new();
        request.set_item("Event").unwrap();
        request.set_identifier(9);
        let bytes = request.to_bytes().unwrap();
        let mut copy = IncrementRequest::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(request, copy);
    }
}
