// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Standard error reply from a service that could not satisfy a request.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message_formats::Message;

const MESSAGE_TYPE: &str = "UMPS::MessageFormats::Failure";
const MESSAGE_VERSION: &str = "1.0.0";

/// The sentinel a replier returns when its callback fails.
///
/// Repliers send this in place of the callback's reply when the callback
/// panics, when the inbound message type is unregistered, or when the
/// reply itself fails to serialize.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Failure {
    details: String,
}

impl Failure {
    /// Creates an empty failure message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a failure with details.
    pub fn from_details(details: &str) -> Self {
        Self {
            details: details.to_string(),
        }
    }

    /// Sets the failure details.
    pub fn set_details(&mut self, details: &str) {
        self.details = details.to_string();
    }

    /// The failure details.
    pub fn details(&self) -> &str {
        &self.details
    }
}

impl Message for Failure {
    fn message_type(&self) -> &str {
        MESSAGE_TYPE
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
    fn round_trip() {
        let failure = Failure::from_details("callback panicked");
        let bytes = failure.to_bytes().expect("serialize");
        let mut copy = Failure::new();
        copy.from_bytes(&bytes).expect("deserialize");
        assert_eq!(failure, copy);
    }
}
