// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # UMPS - Typed, authenticated messaging middleware
//!
//! A pure Rust messaging fabric for real-time seismic networks:
//! producers and consumers exchange typed messages (data packets, picks,
//! heartbeats, commands) over authenticated socket patterns.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use umps::message_formats::Text;
//! use umps::messaging::publisher_subscriber::{Publisher, PublisherOptions};
//! use umps::messaging::Context;
//!
//! fn main() -> umps::Result<()> {
//!     let context = Context::new();
//!     let mut publisher = Publisher::new(&context);
//!
//!     let mut options = PublisherOptions::new();
//!     options.set_address("tcp://127.0.0.1:5555")?;
//!     publisher.initialize(&options)?;
//!
//!     publisher.send(&Text::from_contents("Message number 1"))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                          Application Layer                          |
//! |     broadcasts (DataPacket/Pick/Heartbeat) | services | caches      |
//! +---------------------------------------------------------------------+
//! |                          Messaging Layer                            |
//! |   Pub/Sub | XPub/XSub proxy | Router/Dealer proxy | Request/Router  |
//! +---------------------------------------------------------------------+
//! |                        Authentication Layer                         |
//! |   Grasslands .. Ironhouse | IP lists | credentials | public keys    |
//! +---------------------------------------------------------------------+
//! |                          Transport Layer                            |
//! |      framed multi-part messages over tcp:// and ipc:// streams      |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`message_formats::Message`] | The polymorphic message abstraction |
//! | [`message_formats::Messages`] | Registry of message prototypes |
//! | [`messaging::xpub_xsub::Proxy`] | Broadcast intermediary |
//! | [`messaging::request_router::Requestor`] | Blocking RPC client |
//! | [`proxy_services::packet_cache::CappedCollection`] | Bounded per-sensor packet store |
//! | [`authentication::ZapOptions`] | Per-endpoint security configuration |
//!
//! ## Loss semantics
//!
//! This is not a durable broker: slow joiners miss history, full queues
//! drop, and the packet cache evicts its oldest packets by design. The
//! fabric documents that loss rather than hiding it.
//!
//! ## Logging
//!
//! Everything logs through the [`log`] facade; the embedding application
//! installs the sink.

/// Peer authentication: security levels, credentials, authenticators.
pub mod authentication;
/// Typed message formats and the prototype registry.
pub mod message_formats;
/// Socket patterns over the transport layer.
pub mod messaging;
/// Typed broadcast conveniences (data packets, picks, heartbeats).
pub mod proxy_broadcasts;
/// Services behind a router/dealer proxy (packet cache, remote commands).
pub mod proxy_services;
/// In-process services (discovery, incrementer, local command plane).
pub mod services;

mod error;
mod system;

pub use error::{Error, Result};
