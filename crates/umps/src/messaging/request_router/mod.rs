// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronous RPC: a blocking [`Requestor`] against a [`Router`]
//! service that dispatches on message type.

mod requestor;
mod router;

pub use requestor::{Requestor, RequestorOptions};
pub use router::{Router, RouterOptions};
