// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Typed message formats exchanged over the messaging fabric.
//!
//! Every application payload on the wire is two logical frames:
//!
//! ```text
//! +---------------------------+-------------------+
//! | Message type (UTF-8)      | Payload (CBOR)    |
//! +---------------------------+-------------------+
//! ```
//!
//! The type string (e.g. `"UMPS::MessageFormats::Pick"`) keys a
//! [`Messages`] registry of prototypes. Receivers clone the prototype and
//! parse the payload into it; frames whose type is unregistered or whose
//! payload fails to parse are dropped with a log entry.

pub mod data_packet;
pub mod failure;
pub mod heartbeat;
mod message;
mod messages;
pub mod pick;
pub mod text;

pub use data_packet::DataPacket;
pub use failure::Failure;
pub use heartbeat::{Heartbeat, HeartbeatStatus};
pub use message::{downcast, downcast_ref, Message};
pub use messages::Messages;
pub use pick::{Pick, Polarity};
pub use text::Text;
