// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic liveness broadcast from a running module.

use std::any::Any;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message_formats::Message;
use crate::system;

const MESSAGE_TYPE: &str = "UMPS::MessageFormats::Heartbeat";
const MESSAGE_VERSION: &str = "1.0.0";

/// The state a module reports in its heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeartbeatStatus {
    /// The module has not reported a state.
    #[default]
    Unknown,
    /// The module is running.
    Alive,
    /// The module is shutting down in an orderly fashion.
    Disconnected,
    /// The module terminated abnormally.
    Died,
}

/// A heartbeat status message.
///
/// New heartbeats default to the sending host's name and the current time;
/// the module name must be set by the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Heartbeat {
    status: HeartbeatStatus,
    module: String,
    host_name: String,
    time_microseconds: i64,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            status: HeartbeatStatus::Unknown,
            module: "unknown".to_string(),
            host_name: system::host_name(),
            time_microseconds: now_microseconds(),
        }
    }
}

impl Heartbeat {
    /// Creates a heartbeat stamped with the current host and time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reported status.
    pub fn set_status(&mut self, status: HeartbeatStatus) {
        self.status = status;
    }

    /// The reported status.
    pub fn status(&self) -> HeartbeatStatus {
        self.status
    }

    /// Sets the originating module name.
    pub fn set_module(&mut self, module: &str) {
        self.module = module.to_string();
    }

    /// The originating module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Sets the originating host name.
    pub fn set_host_name(&mut self, host_name: &str) {
        self.host_name = host_name.to_string();
    }

    /// The originating host name.
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// Sets the heartbeat time in microseconds since the epoch.
    pub fn set_time_microseconds(&mut self, time: i64) {
        self.time_microseconds = time;
    }

    /// Re-stamps the heartbeat with the current time.
    pub fn set_time_to_now(&mut self) {
        self.time_microseconds = now_microseconds();
    }

    /// The heartbeat time in microseconds since the epoch.
    pub fn time_microseconds(&self) -> i64 {
        self.time_microseconds
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_microseconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

impl Message for Heartbeat {
    fn message_type(&self) -> &str {
        MESSAGE_TYPE
    }

    fn message_version(&self) -> &str {
        MESSAGE_VERSION
    }

    fn clone_box(&self) -> Box<dyn Message> {
        Box::new(self.clone())
    }

    fn create_instance(&self) -> Box<dyn Message> {
        Box::new(Self::new())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_cbor::to_vec(self)?)
    }

    fn from_bytes(&mut self, data: &[u8]) -> Result<()> {
        *self = serde_cbor::from_slice(data)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_heartbeat_is_stamped() {
        let heartbeat = Heartbeat::new();
        assert!(heartbeat.time_microseconds() > 0);
        assert!(!heartbeat.host_name().is_empty());
        assert_eq!(heartbeat.status(), HeartbeatStatus::Unknown);
        assert_eq!(heartbeat.module(), "unknown");
    }

    #[test]
    fn round_trip() {
        let mut heartbeat = Heartbeat::new();
        heartbeat.set_module("scanner");
        heartbeat.set_status(HeartbeatStatus::Alive);
        heartbeat.set_time_microseconds(1_000_000);

        let bytes = heartbeat.to_bytes().expect("serialize");
        let mut copy = Heartbeat::new();
        copy.from_bytes(&bytes).expect("deserialize");
        assert_eq!(heartbeat, copy);
    }
}
