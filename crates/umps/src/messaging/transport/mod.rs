// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction: typed sockets over framed streams.
//!
//! The messaging patterns in [`crate::messaging`] are built on a small
//! ZeroMQ-like socket layer:
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                           Socket                             |
//! |  kind semantics: PUB/SUB/XPUB/XSUB/REQ/REP/ROUTER/DEALER     |
//! |  +--------------------------------------------------------+  |
//! |  |                       Listener                         |  |
//! |  |    accept loop -> handshake -> Connection              |  |
//! |  +--------------------------------------------------------+  |
//! |  |                      Connection                        |  |
//! |  |   reader thread | writer thread | subscription set     |  |
//! |  +--------------------------------------------------------+  |
//! |  |                      ByteStream                        |  |
//! |  |           TcpStream (tcp://) | UnixStream (ipc://)     |  |
//! |  +--------------------------------------------------------+  |
//! +--------------------------------------------------------------+
//! ```
//!
//! # Wire format
//!
//! Streams carry multi-part messages with length-prefix framing:
//!
//! ```text
//! +----------------+---------------------------------------------+
//! | Parts (4B BE)  | per part: Length (4B BE) | Bytes             |
//! +----------------+---------------------------------------------+
//! ```
//!
//! The first exchange on every connection is a CBOR greeting carrying the
//! peer's mechanism, domain, routing identity, and credentials; the
//! accepting side answers with a ZAP verdict and closes on a non-`"200"`
//! status. Application messages are `[type, payload]` frame pairs; router
//! sockets see an identity frame plus an empty delimiter in front.

mod byte_stream;
mod connection;
mod endpoint;
mod frame_codec;
mod handshake;
mod socket;

pub use endpoint::Endpoint;
pub use socket::{Socket, SocketOptions, SocketType};

/// One frame of a multi-part message.
pub type Frame = Vec<u8>;

/// Control byte announcing a subscription (`[0x01, topic...]`).
pub(crate) const SUBSCRIBE_BYTE: u8 = 0x01;
/// Control byte announcing an unsubscription (`[0x00, topic...]`).
pub(crate) const UNSUBSCRIBE_BYTE: u8 = 0x00;
