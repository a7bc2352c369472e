// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The remote command plane.
//!
//! A [`Proxy`] aggregates modules across a network: each module's
//! [`Replier`] connects to the backend, registers its
//! [`crate::services::command::ModuleDetails`], and answers periodic
//! pings. Clients connect a [`Requestor`] to the frontend, list live
//! modules, and issue commands addressed to one module by name.
//!
//! Liveness inside the proxy:
//!
//! ```text
//! Unknown -> Registering -> Alive <-> Missed -> Dead
//!                             ^__________________|   (re-registration)
//! ```
//!
//! A ping acknowledgement returns a module to `Alive`; the configured
//! number of consecutive misses (default 3) marks it `Dead` and removes
//! it from the available-modules listing.

mod messages;
mod proxy;
mod replier;
mod requestor;

pub use messages::{
    AvailableModulesRequest, AvailableModulesResponse, ModuleState, PingRequest, PingResponse,
    RegistrationRequest, RegistrationResponse, RegistrationReturnCode, RegistrationType,
};
pub use proxy::{Proxy, ProxyOptions};
pub use replier::{Replier, ReplierOptions};
pub use requestor::{Requestor, RequestorOptions};
