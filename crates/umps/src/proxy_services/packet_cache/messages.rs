// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire messages of the packet-cache service.

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message_formats::{DataPacket, Message};

const DATA_REQUEST_TYPE: &str = "UMPS::ProxyServices::PacketCache::DataRequest";
const DATA_RESPONSE_TYPE: &str = "UMPS::ProxyServices::PacketCache::DataResponse";
const SENSOR_REQUEST_TYPE: &str = "UMPS::ProxyServices::PacketCache::SensorRequest";
const SENSOR_RESPONSE_TYPE: &str = "UMPS::ProxyServices::PacketCache::SensorResponse";
const MESSAGE_VERSION: &str = "1.0.0";

macro_rules! impl_cbor_message {
    ($name:ident, $type_string:expr) => {
        impl Message for $name {
            fn message_type(&self) -> &str {
                $type_string
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
    };
}

/// Outcome of a packet-cache query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnCode {
    /// The query succeeded.
    #[default]
    Success,
    /// The sensor is not in the cache.
    NoSensor,
    /// The request could not be parsed.
    InvalidMessage,
    /// The cache failed internally.
    AlgorithmFailure,
}

/// A time-range query over one sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataRequest {
    network: String,
    station: String,
    channel: String,
    location_code: String,
    start_time_microseconds: i64,
    end_time_microseconds: i64,
    identifier: u64,
}

impl Default for DataRequest {
    fn default() -> Self {
        Self {
            network: String::new(),
            station: String::new(),
            channel: String::new(),
            location_code: String::new(),
            start_time_microseconds: 0,
            end_time_microseconds: i64::MAX,
            identifier: 0,
        }
    }
}

impl DataRequest {
    /// Creates a request covering all time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the SNCL to query.
    pub fn set_sensor(
        &mut self,
        network: &str,
        station: &str,
        channel: &str,
        location_code: &str,
    ) -> Result<()> {
        for (value, name) in [
            (network, "network"),
            (station, "station"),
            (channel, "channel"),
            (location_code, "location code"),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidArgument(format!("{} is empty", name)));
            }
        }
        self.network = network.trim().to_string();
        self.station = station.trim().to_string();
        self.channel = channel.trim().to_string();
        self.location_code = location_code.trim().to_string();
        Ok(())
    }

    /// The network code.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The station name.
    pub fn station(&self) -> &str {
        &self.station
    }

    /// The channel code.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The location code.
    pub fn location_code(&self) -> &str {
        &self.location_code
    }

    /// Sets the query window in microseconds since the epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the window is inverted.
    pub fn set_query_times_microseconds(&mut self, t0: i64, t1: i64) -> Result<()> {
        if t1 < t0 {
            return Err(Error::InvalidArgument(format!(
                "query end {} precedes start {}",
                t1, t0
            )));
        }
        self.start_time_microseconds = t0;
        self.end_time_microseconds = t1;
        Ok(())
    }

    /// Sets the query window in seconds since the epoch.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_query_times_seconds(&mut self, t0: f64, t1: f64) -> Result<()> {
        self.set_query_times_microseconds(
            (t0 * 1_000_000.0).round() as i64,
            (t1 * 1_000_000.0).round() as i64,
        )
    }

    /// The window start in microseconds.
    pub fn start_time_microseconds(&self) -> i64 {
        self.start_time_microseconds
    }

    /// The window end in microseconds.
    pub fn end_time_microseconds(&self) -> i64 {
        self.end_time_microseconds
    }

    /// Sets a correlation identifier echoed in the response.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// The correlation identifier.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }
}

impl_cbor_message!(DataRequest, DATA_REQUEST_TYPE);

/// The packets matching a [`DataRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataResponse<T = f64> {
    packets: Vec<DataPacket<T>>,
    identifier: u64,
    return_code: ReturnCode,
}

impl<T> Default for DataResponse<T> {
    fn default() -> Self {
        Self {
            packets: Vec::new(),
            identifier: 0,
            return_code: ReturnCode::Success,
        }
    }
}

impl<T> DataResponse<T> {
    /// Creates an empty, successful response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the matched packets, ascending by start time.
    pub fn set_packets(&mut self, packets: Vec<DataPacket<T>>) {
        self.packets = packets;
    }

    /// The matched packets.
    pub fn packets(&self) -> &[DataPacket<T>] {
        &self.packets
    }

    /// Sets the echoed correlation identifier.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// The echoed correlation identifier.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }

    /// Sets the outcome.
    pub fn set_return_code(&mut self, return_code: ReturnCode) {
        self.return_code = return_code;
    }

    /// The outcome.
    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }
}

impl<T> Message for DataResponse<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    fn message_type(&self) -> &str {
        DATA_RESPONSE_TYPE
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

/// Asks which sensors the cache holds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorRequest {
    identifier: u64,
}

impl SensorRequest {
    /// Creates a request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a correlation identifier echoed in the response.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// The correlation identifier.
    pub fn identifier(&self) -> u64 {
        self.identifier
    }
}

impl_cbor_message!(SensorRequest, SENSOR_REQUEST_TYPE);

/// The sensors in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorResponse {
    sensors: Vec<String>,
    identifier: u64,
    return_code: ReturnCode,
}

impl SensorResponse {
    /// Creates an empty, successful response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sensor names (`N.S.C.L`).
    pub fn set_sensors(&mut self, sensors: Vec<String>) {
        self.sensors = sensors;
    }

    /// The sensor names.
    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    /// Sets the echoed correlation identifier.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = identifier;
    }

    /// Sets the outcome.
    pub fn set_return_code(&mut self, return_code: ReturnCode) {
        self.return_code = return_code;
    }

    /// The outcome.
    pub fn return_code(&self) -> ReturnCode {
        self.return_code
    }
}

impl_cbor_message!(SensorResponse, SENSOR_RESPONSE_TYPE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_request_round_trip() {
        let mut request = DataRequest::new();
        request.set_sensor("UU", "MOUT", "EHZ", "01").unwrap();
        request.set_query_times_seconds(100.0, 200.0).unwrap();
        request.set_identifier(7);

        let bytes = request.to_bytes().unwrap();
        let mut copy = DataRequest::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(request, copy);
        assert_eq!(copy.start_time_microseconds(), 100_000_000);
        assert_eq!(copy.end_time_microseconds(), 200_000_000);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut request = DataRequest::new();
        assert!(request.set_query_times_microseconds(10, 5).is_err());
    }

    #[test]
    fn data_response_round_trip() {
        let mut packet = DataPacket::<f64>::new();
        packet.set_network("UU").unwrap();
        packet.set_station("MOUT").unwrap();
        packet.set_channel("EHZ").unwrap();
        packet.set_location_code("01").unwrap();
        packet.set_sampling_rate(100.0).unwrap();
        packet.set_samples(vec![1.0, 2.0]);

        let mut response = DataResponse::new();
        response.set_packets(vec![packet]);
        response.set_identifier(7);

        let bytes = response.to_bytes().unwrap();
        let mut copy = DataResponse::<f64>::new();
        copy.from_bytes(&bytes).unwrap();
        assert_eq!(response, copy);
        assert_eq!(copy.packets().len(), 1);
    }
}
