// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Load-balanced request/reply through a ROUTER/DEALER proxy.
//!
//! Clients talk to the router frontend; [`Reply`] workers connect to the
//! dealer backend and are dealt requests round-robin. The identity
//! envelope the router attaches travels through the dealer and back so
//! every reply reaches the client that asked.

mod proxy;
mod reply;

pub use proxy::{Proxy, ProxyOptions};
pub use reply::{Reply, ReplyOptions};
