// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-module IPC command plane.
//!
//! Every long-running module binds a local request/router on an `ipc://`
//! endpoint and registers itself in the on-disk module table. External
//! tools look the module up in the table, connect, and can list its
//! commands, issue one, or tell it to terminate.

mod messages;
mod module_details;
mod module_table;
mod service;

pub use messages::{
    AvailableCommandsRequest, AvailableCommandsResponse, CommandRequest, CommandResponse,
    TerminateRequest, TerminateResponse,
};
pub use module_details::ModuleDetails;
pub use module_table::{ModuleTable, ModuleTableRow};
pub use service::{Service, ServiceOptions};

/// Process exit code for an orderly module shutdown.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code when a module fails to initialize.
pub const EXIT_INITIALIZATION_FAILURE: i32 = 1;
/// Process exit code for a fatal runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 2;
