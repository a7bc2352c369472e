// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A packet of evenly sampled time-series data from a single sensor.

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message_formats::Message;

const MESSAGE_TYPE: &str = "UMPS::MessageFormats::DataPacket";
const MESSAGE_VERSION: &str = "1.0.0";

/// A seismic data packet.
///
/// A packet is identified by its SNCL (network, station, channel, location
/// code) and carries `samples` starting at `start_time_microseconds` with a
/// fixed, positive sampling rate. The end time is derived:
///
/// ```text
/// end = start + round((n_samples - 1) * 1e6 / sampling_rate)  [microseconds]
/// ```
///
/// Start times are signed microseconds since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataPacket<T = f64> {
    network: String,
    station: String,
    channel: String,
    location_code: String,
    sampling_rate: f64,
    start_time_microseconds: i64,
    samples: Vec<T>,
}

impl<T> Default for DataPacket<T> {
    fn default() -> Self {
        Self {
            network: String::new(),
            station: String::new(),
            channel: String::new(),
            location_code: String::new(),
            sampling_rate: 0.0,
            start_time_microseconds: 0,
            samples: Vec::new(),
        }
    }
}

impl<T> DataPacket<T> {
    /// Creates an empty data packet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network code, e.g. `"UU"`.
    pub fn set_network(&mut self, network: &str) -> Result<()> {
        set_sncl_field(&mut self.network, network, "network")
    }

    /// The network code.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Sets the station name, e.g. `"MOUT"`.
    pub fn set_station(&mut self, station: &str) -> Result<()> {
        set_sncl_field(&mut self.station, station, "station")
    }

    /// The station name.
    pub fn station(&self) -> &str {
        &self.station
    }

    /// Sets the channel code, e.g. `"EHZ"`.
    pub fn set_channel(&mut self, channel: &str) -> Result<()> {
        set_sncl_field(&mut self.channel, channel, "channel")
    }

    /// The channel code.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Sets the location code, e.g. `"01"`.
    pub fn set_location_code(&mut self, location_code: &str) -> Result<()> {
        set_sncl_field(&mut self.location_code, location_code, "location code")
    }

    /// The location code.
    pub fn location_code(&self) -> &str {
        &self.location_code
    }

    /// Sets the sampling rate in Hz.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the rate is not positive.
    pub fn set_sampling_rate(&mut self, sampling_rate: f64) -> Result<()> {
        if sampling_rate <= 0.0 || !sampling_rate.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "sampling rate {} must be positive",
                sampling_rate
            )));
        }
        self.sampling_rate = sampling_rate;
        Ok(())
    }

    /// The sampling rate in Hz; zero when unset.
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Sets the time of the first sample in microseconds since the epoch.
    pub fn set_start_time_microseconds(&mut self, start_time: i64) {
        self.start_time_microseconds = start_time;
    }

    /// The time of the first sample in microseconds since the epoch.
    pub fn start_time_microseconds(&self) -> i64 {
        self.start_time_microseconds
    }

    /// Sets the start time from seconds since the epoch.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_start_time_seconds(&mut self, start_time: f64) {
        self.start_time_microseconds = (start_time * 1_000_000.0).round() as i64;
    }

    /// The time of the last sample in microseconds since the epoch.
    ///
    /// Equals the start time when the packet holds fewer than two samples
    /// or the sampling rate is unset.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn end_time_microseconds(&self) -> i64 {
        if self.samples.len() < 2 || self.sampling_rate <= 0.0 {
            return self.start_time_microseconds;
        }
        let span = ((self.samples.len() - 1) as f64) * 1_000_000.0 / self.sampling_rate;
        self.start_time_microseconds + span.round() as i64
    }

    /// Sets the samples.
    pub fn set_samples(&mut self, samples: Vec<T>) {
        self.samples = samples;
    }

    /// The samples.
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// The number of samples.
    pub fn number_of_samples(&self) -> usize {
        self.samples.len()
    }

    /// True when the SNCL, sampling rate, and samples are all set.
    pub fn is_complete(&self) -> bool {
        !self.network.is_empty()
            && !self.station.is_empty()
            && !self.channel.is_empty()
            && !self.location_code.is_empty()
            && self.sampling_rate > 0.0
            && !self.samples.is_empty()
    }
}

fn set_sncl_field(field: &mut String, value: &str, name: &str) -> crate::error::Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} is empty", name)));
    }
    *field = value.to_string();
    Ok(())
}

impl<T> Message for DataPacket<T>
where
    T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
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

    fn sample_packet() -> DataPacket<i32> {
        let mut packet = DataPacket::<i32>::new();
        packet.set_network("UU").unwrap();
        packet.set_station("MOUT").unwrap();
        packet.set_channel("EHZ").unwrap();
        packet.set_location_code("01").unwrap();
        packet.set_sampling_rate(100.0).unwrap();
        packet.set_start_time_microseconds(1_628_803_598_000_000);
        packet.set_samples((0..100).collect());
        packet
    }

    #[test]
    fn end_time_derivation() {
        let packet = sample_packet();
        // 99 samples at 100 Hz past the first sample = 0.99 s.
        assert_eq!(
            packet.end_time_microseconds(),
            packet.start_time_microseconds() + 990_000
        );
    }

    #[test]
    fn end_time_of_single_sample_is_start_time() {
        let mut packet = sample_packet();
        packet.set_samples(vec![1]);
        assert_eq!(packet.end_time_microseconds(), packet.start_time_microseconds());
    }

    #[test]
    fn invalid_sampling_rate_is_rejected() {
        let mut packet = DataPacket::<f64>::new();
        assert!(packet.set_sampling_rate(0.0).is_err());
        assert!(packet.set_sampling_rate(-100.0).is_err());
        assert!(packet.set_sampling_rate(f64::NAN).is_err());
    }

    #[test]
    fn empty_sncl_is_rejected() {
        let mut packet = DataPacket::<f64>::new();
        assert!(packet.set_network("  ").is_err());
        assert!(packet.set_station("").is_err());
    }

    #[test]
    fn serialized_round_trip_preserves_fields() {
        let packet = sample_packet();
        let bytes = packet.to_bytes().expect("serialize");
        let mut copy = DataPacket::<i32>::new();
        copy.from_bytes(&bytes).expect("deserialize");
        assert_eq!(packet, copy);
    }

    #[test]
    fn start_time_from_seconds_rounds() {
        let mut packet = DataPacket::<f64>::new();
        packet.set_start_time_seconds(500.25);
        assert_eq!(packet.start_time_microseconds(), 500_250_000);
    }
}
