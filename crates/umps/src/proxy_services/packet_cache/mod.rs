// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The packet cache: a bounded per-sensor store of recent data packets.
//!
//! A subscriber drains the data-packet broadcast into a
//! [`CappedCollection`]; a replier answers time-range queries from it.
//! The cache is intentionally lossy: each sensor keeps at most
//! `max_packets` packets and evicts the oldest on overflow, so memory is
//! bounded no matter the query load.

mod capped_collection;
mod circular_buffer;
mod messages;
mod service;

pub use capped_collection::CappedCollection;
pub use circular_buffer::{AddOutcome, CircularBuffer};
pub use messages::{DataRequest, DataResponse, ReturnCode, SensorRequest, SensorResponse};
pub use service::{Service, ServiceOptions};
