// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Free-form text message.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message_formats::Message;

const MESSAGE_TYPE: &str = "UMPS::MessageFormats::Text";
const MESSAGE_VERSION: &str = "1.0.0";

/// An unstructured text payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Text {
    contents: String,
}

impl Text {
    /// Creates an empty text message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a text message from contents.
    pub fn from_contents(contents: &str) -> Self {
        Self {
            contents: contents.to_string(),
        }
    }

    /// Sets the contents.
    pub fn set_contents(&mut self, contents: &str) {
        self.contents = contents.to_string();
    }

    /// The contents.
    pub fn contents(&self) -> &str {
        &self.contents
    }
}

impl Message for Text {
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
        let text = Text::from_contents("Message number 7");
        let bytes = text.to_bytes().expect("serialize");
        let mut copy = Text::new();
        copy.from_bytes(&bytes).expect("deserialize");
        assert_eq!(text, copy);
    }
}
