// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The deployment's discovery point.
//!
//! Services and broadcasts register an endpoint descriptor when they
//! start and remove it when they stop; clients ask one well-known
//! address for everything else.

mod details;
mod messages;
mod requestor;
mod service;

pub use details::{advertised_address, ConnectionDetails, SocketKind};
pub use messages::{AvailableConnectionsRequest, AvailableConnectionsResponse};
pub use requestor::{Requestor, RequestorOptions};
pub use service::{Service, ServiceOptions};
