// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-item monotone counters, served over request/router.
//!
//! Pickers and other producers draw unique identifiers from here so ids
//! stay unique across module restarts: the counters live in SQLite.

mod messages;
mod requestor;
mod service;

pub use messages::{
    IncrementRequest, IncrementResponse, ItemsRequest, ItemsResponse, ReturnCode,
};
pub use requestor::{Requestor, RequestorOptions};
pub use service::{Service, ServiceOptions};
