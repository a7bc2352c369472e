// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The messaging fabric: socket patterns over the transport layer.
//!
//! Four patterns cover every topology in a deployment:
//!
//! - [`publisher_subscriber`] -- direct one-to-many broadcast.
//! - [`xpub_xsub`] -- a broadcast proxy so publishers and subscribers
//!   only need to know the proxy's two addresses.
//! - [`router_dealer`] -- load-balanced request/reply through a proxy
//!   with [`router_dealer::Reply`] workers running a user callback.
//! - [`request_router`] -- synchronous RPC straight at a
//!   [`request_router::Router`] service.
//!
//! Each proxy or service runs on dedicated threads and exposes
//! `start()`/`stop()`/`is_running()`; `stop()` pokes a control channel
//! polled alongside the sockets, and both sockets are closed before the
//! worker exits.

pub mod publisher_subscriber;
pub mod request_router;
pub mod router_dealer;
pub mod transport;
pub mod xpub_xsub;

mod context;

pub use context::Context;

use crate::error::Result;
use crate::message_formats::Message;

/// Whether an endpoint connects to or binds its address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize,
)]
pub enum ConnectOrBind {
    /// The endpoint connects to an already-bound address.
    Connect,
    /// The endpoint binds the address.
    #[default]
    Bind,
}

/// A reply callback: `(message_type, payload) -> reply`.
///
/// Callbacks are registered once at initialization and never mutated; they
/// must be synchronous relative to the worker. A panic inside the callback
/// is caught, logged, and answered with a
/// [`crate::message_formats::Failure`] sentinel.
pub type MessageCallback =
    std::sync::Arc<dyn Fn(&str, &[u8]) -> Result<Box<dyn Message>> + Send + Sync>;

/// Runs a reply callback, translating every failure mode into a
/// serialized reply.
///
/// Returns `(reply_type, reply_payload)`; panics and errors yield a
/// [`crate::message_formats::Failure`] sentinel.
pub(crate) fn run_callback(
    callback: &MessageCallback,
    message_type: &str,
    payload: &[u8],
) -> (String, Vec<u8>) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        callback(message_type, payload)
    }));
    let failure = |details: &str| {
        log::warn!("[callback] {} on {}", details, message_type);
        let sentinel = crate::message_formats::Failure::from_details(details);
        (
            sentinel.message_type().to_string(),
            sentinel.to_bytes().unwrap_or_default(),
        )
    };
    match outcome {
        Ok(Ok(reply)) => match reply.to_bytes() {
            Ok(bytes) => (reply.message_type().to_string(), bytes),
            Err(e) => failure(&format!("reply serialization failed: {}", e)),
        },
        Ok(Err(e)) => failure(&format!("callback failed: {}", e)),
        Err(_) => failure("callback panicked"),
    }
}
