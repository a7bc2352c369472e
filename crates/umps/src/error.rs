// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! Every fallible public operation in this crate returns [`Result`].
//! Background workers translate internal failures into these variants
//! before logging; parse failures on received frames are logged and the
//! frame is dropped rather than propagated.

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by UMPS operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Caller errors
    // ========================================================================
    /// Caller supplied malformed input (missing address, empty SNCL,
    /// non-positive sampling rate, duplicate registration, ...).
    InvalidArgument(String),
    /// Operation requires `initialize()` to have succeeded first.
    NotInitialized(String),
    /// Operation requires the component to be running.
    NotRunning(String),

    // ========================================================================
    // Transport errors
    // ========================================================================
    /// Bind/connect/send/receive failure from the underlying transport.
    TransportError(String),
    /// I/O error with underlying cause.
    IoError(std::io::Error),
    /// The peer was rejected by an authenticator (non-200 verdict).
    AuthenticationDenied(String),

    // ========================================================================
    // Message errors
    // ========================================================================
    /// Payload failed to serialize or parse.
    InvalidMessage(String),
    /// Message type is not registered at the receiver.
    InvalidMessageType(String),

    // ========================================================================
    // Runtime errors
    // ========================================================================
    /// A request exceeded its deadline.
    Timeout,
    /// Internal invariant violation (including callback panics).
    AlgorithmFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::NotInitialized(msg) => write!(f, "Not initialized: {}", msg),
            Error::NotRunning(msg) => write!(f, "Not running: {}", msg),
            Error::TransportError(msg) => write!(f, "Transport error: {}", msg),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::AuthenticationDenied(msg) => write!(f, "Authentication denied: {}", msg),
            Error::InvalidMessage(msg) => write!(f, "Invalid message: {}", msg),
            Error::InvalidMessageType(msg) => write!(f, "Invalid message type: {}", msg),
            Error::Timeout => write!(f, "Request timed out"),
            Error::AlgorithmFailure(msg) => write!(f, "Algorithm failure: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

impl From<serde_cbor::Error> for Error {
    fn from(e: serde_cbor::Error) -> Self {
        Error::InvalidMessage(e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::AlgorithmFailure(format!("sqlite: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = Error::InvalidArgument("sampling rate must be positive".into());
        assert!(e.to_string().contains("sampling rate"));
        assert!(Error::Timeout.to_string().contains("timed out"));
    }

    #[test]
    fn io_error_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "bind");
        let e = Error::from(io);
        assert!(std::error::Error::source(&e).is_some());
    }
}
