// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Container of unique message-format prototypes.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::message_formats::Message;

/// A registry mapping message type strings to prototype instances.
///
/// Receivers use the registry to turn `[type, payload]` frame pairs back
/// into typed messages: the prototype for `type` is cloned and the payload
/// parsed into the fresh instance.
#[derive(Default)]
pub struct Messages {
    formats: HashMap<String, Box<dyn Message>>,
}

impl Messages {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message prototype to the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the prototype's type string
    /// is already registered; the registry is left unchanged.
    pub fn add(&mut self, prototype: Box<dyn Message>) -> Result<()> {
        let message_type = prototype.message_type().to_string();
        if self.formats.contains_key(&message_type) {
            return Err(Error::InvalidArgument(format!(
                "message type {} already registered",
                message_type
            )));
        }
        self.formats.insert(message_type, prototype);
        Ok(())
    }

    /// True when the message type is registered.
    pub fn contains(&self, message_type: &str) -> bool {
        self.formats.contains_key(message_type)
    }

    /// Returns a fresh instance (a clone of the prototype) for the type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessageType`] when the type is unknown.
    pub fn get(&self, message_type: &str) -> Result<Box<dyn Message>> {
        self.formats
            .get(message_type)
            .map(|p| p.clone_box())
            .ok_or_else(|| Error::InvalidMessageType(message_type.to_string()))
    }

    /// Removes the message type from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the type is not registered.
    pub fn remove(&mut self, message_type: &str) -> Result<()> {
        self.formats
            .remove(message_type)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidArgument(format!("message type {} not found", message_type)))
    }

    /// Number of registered formats.
    pub fn size(&self) -> usize {
        self.formats.len()
    }

    /// True when no formats are registered.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// The registered type strings.
    pub fn message_types(&self) -> Vec<String> {
        self.formats.keys().cloned().collect()
    }

    /// Decodes a `[type, payload]` frame pair into a typed message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessageType`] for unregistered types and
    /// [`Error::InvalidMessage`] for payloads that fail to parse.
    pub fn deserialize(&self, message_type: &str, payload: &[u8]) -> Result<Box<dyn Message>> {
        let prototype = self
            .formats
            .get(message_type)
            .ok_or_else(|| Error::InvalidMessageType(message_type.to_string()))?;
        let mut instance = prototype.create_instance();
        instance.from_bytes(payload)?;
        Ok(instance)
    }
}

impl Clone for Messages {
    fn clone(&self) -> Self {
        let formats = self
            .formats
            .iter()
            .map(|(k, v)| (k.clone(), v.clone_box()))
            .collect();
        Self { formats }
    }
}

impl std::fmt::Debug for Messages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messages")
            .field("types", &self.message_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_formats::{downcast, Text};

    #[test]
    fn add_contains_get_remove() {
        let mut registry = Messages::new();
        assert!(registry.is_empty());

        registry.add(Box::new(Text::new())).expect("add failed");
        assert_eq!(registry.size(), 1);
        assert!(registry.contains("UMPS::MessageFormats::Text"));

        let instance = registry.get("UMPS::MessageFormats::Text").expect("get");
        assert_eq!(instance.message_type(), "UMPS::MessageFormats::Text");

        registry.remove("UMPS::MessageFormats::Text").expect("remove");
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_add_fails_and_leaves_registry_unchanged() {
        let mut registry = Messages::new();
        registry.add(Box::new(Text::new())).expect("first add");
        let result = registry.add(Box::new(Text::new()));
        assert!(result.is_err());
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn deserialize_round_trips_through_prototype() {
        let mut registry = Messages::new();
        registry.add(Box::new(Text::new())).expect("add");

        let mut text = Text::new();
        text.set_contents("sixty-one samples");
        let payload = text.to_bytes().expect("serialize");

        let decoded = registry
            .deserialize("UMPS::MessageFormats::Text", &payload)
            .expect("deserialize");
        let decoded = downcast::<Text>(decoded).expect("downcast");
        assert_eq!(decoded.contents(), "sixty-one samples");
    }

    #[test]
    fn deserialize_unknown_type_fails() {
        let registry = Messages::new();
        let result = registry.deserialize("No::Such::Type", b"");
        assert!(matches!(result, Err(crate::Error::InvalidMessageType(_))));
    }
}
