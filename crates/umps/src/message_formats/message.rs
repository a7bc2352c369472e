// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The polymorphic message abstraction.

use std::any::Any;

use crate::error::{Error, Result};

/// A polymorphic, serializable message.
///
/// Concrete formats implement this trait and register a prototype with a
/// [`crate::message_formats::Messages`] container. The registry clones the
/// prototype to deserialize inbound frames, so implementations must be
/// cheap to clone when empty.
///
/// Type strings are globally unique identifiers; two different formats
/// must never share one.
pub trait Message: Send + Sync {
    /// The globally unique message type string,
    /// e.g. `"UMPS::MessageFormats::Pick"`.
    fn message_type(&self) -> &str;

    /// The message format version, e.g. `"1.0.0"`.
    fn message_version(&self) -> &str;

    /// A deep copy of this message.
    fn clone_box(&self) -> Box<dyn Message>;

    /// A fresh, default-initialized instance of this message format.
    fn create_instance(&self) -> Box<dyn Message>;

    /// Serializes the message payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] when required fields are unset or
    /// the payload cannot be encoded.
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Populates this message from a serialized payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMessage`] when the payload does not parse
    /// as this format.
    fn from_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Upcast for concrete-type recovery.
    fn as_any(&self) -> &dyn Any;

    /// Consuming upcast for concrete-type recovery.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl Clone for Box<dyn Message> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for Box<dyn Message> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Message({})", self.message_type())
    }
}

/// Recovers a concrete message type from a boxed [`Message`].
///
/// # Errors
///
/// Returns [`Error::InvalidMessageType`] when the underlying type is not
/// `T`; the original box is lost in that case, so callers that need to
/// retry should use [`downcast_ref`] first.
pub fn downcast<T: Message + 'static>(message: Box<dyn Message>) -> Result<Box<T>> {
    let message_type = message.message_type().to_string();
    message
        .into_any()
        .downcast::<T>()
        .map_err(|_| Error::InvalidMessageType(message_type))
}

/// Borrowing variant of [`downcast`].
pub fn downcast_ref<T: Message + 'static>(message: &dyn Message) -> Option<&T> {
    message.as_any().downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_formats::Text;

    #[test]
    fn downcast_recovers_concrete_type() {
        let mut text = Text::new();
        text.set_contents("hello");
        let boxed: Box<dyn Message> = Box::new(text);
        let recovered = downcast::<Text>(boxed).expect("downcast failed");
        assert_eq!(recovered.contents(), "hello");
    }

    #[test]
    fn downcast_to_wrong_type_fails() {
        let boxed: Box<dyn Message> = Box::new(Text::new());
        let result = downcast::<crate::message_formats::Failure>(boxed);
        assert!(matches!(result, Err(Error::InvalidMessageType(_))));
    }
}
