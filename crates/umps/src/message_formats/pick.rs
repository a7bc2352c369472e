// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! A phase arrival pick produced by an automatic or manual picker.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message_formats::Message;

const MESSAGE_TYPE: &str = "UMPS::MessageFormats::Pick";
const MESSAGE_VERSION: &str = "1.0.0";

/// First-motion polarity of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Polarity {
    /// The polarity is unknown.
    #[default]
    Unknown,
    /// Compressional first motion.
    Up,
    /// Dilatational first motion.
    Down,
}

/// A phase pick on a sensor channel.
///
/// Picks are identified by a caller-assigned `identifier` and located by
/// SNCL plus an arrival time in microseconds since the epoch. The phase
/// hint (`"P"`, `"S"`, ...) and the picking algorithm name are optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Pick {
    network: String,
    station: String,
    channel: String,
    location_code: String,
    time_microseconds: Option<i64>,
    identifier: Option<u64>,
    phase_hint: Option<String>,
    algorithm: Option<String>,
    polarity: Polarity,
}

impl Pick {
    /// Creates an empty pick.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network code.
    pub fn set_network(&mut self, network: &str) -> Result<()> {
        set_field(&mut self.network, network, "network")
    }

    /// The network code.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Sets the station name.
    pub fn set_station(&mut self, station: &str) -> Result<()> {
        set_field(&mut self.station, station, "station")
    }

    /// The station name.
    pub fn station(&self) -> &str {
        &self.station
    }

    /// Sets the channel code.
    pub fn set_channel(&mut self, channel: &str) -> Result<()> {
        set_field(&mut self.channel, channel, "channel")
    }

    /// The channel code.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Sets the location code.
    pub fn set_location_code(&mut self, location_code: &str) -> Result<()> {
        set_field(&mut self.location_code, location_code, "location code")
    }

    /// The location code.
    pub fn location_code(&self) -> &str {
        &self.location_code
    }

    /// Sets the pick time in microseconds since the epoch.
    pub fn set_time_microseconds(&mut self, time: i64) {
        self.time_microseconds = Some(time);
    }

    /// Sets the pick time from seconds since the epoch.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_time_seconds(&mut self, time: f64) {
        self.time_microseconds = Some((time * 1_000_000.0).round() as i64);
    }

    /// The pick time in microseconds since the epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the time was never set.
    pub fn time_microseconds(&self) -> Result<i64> {
        self.time_microseconds
            .ok_or_else(|| Error::InvalidArgument("pick time not set".into()))
    }

    /// Sets the unique pick identifier.
    pub fn set_identifier(&mut self, identifier: u64) {
        self.identifier = Some(identifier);
    }

    /// The unique pick identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the identifier was never set.
    pub fn identifier(&self) -> Result<u64> {
        self.identifier
            .ok_or_else(|| Error::InvalidArgument("pick identifier not set".into()))
    }

    /// Sets the phase hint, e.g. `"P"` or `"S"`.
    pub fn set_phase_hint(&mut self, phase_hint: &str) {
        self.phase_hint = Some(phase_hint.to_string());
    }

    /// The phase hint, if any.
    pub fn phase_hint(&self) -> Option<&str> {
        self.phase_hint.as_deref()
    }

    /// Sets the name of the picking algorithm.
    pub fn set_algorithm(&mut self, algorithm: &str) {
        self.algorithm = Some(algorithm.to_string());
    }

    /// The picking algorithm, if any.
    pub fn algorithm(&self) -> Option<&str> {
        self.algorithm.as_deref()
    }

    /// Sets the first-motion polarity.
    pub fn set_polarity(&mut self, polarity: Polarity) {
        self.polarity = polarity;
    }

    /// The first-motion polarity.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

fn set_field(field: &mut String, value: &str, name: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!("{} is empty", name)));
    }
    *field = value.to_string();
    Ok(())
}

impl Message for Pick {
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
        if self.network.is_empty()
            || self.station.is_empty()
            || self.channel.is_empty()
            || self.location_code.is_empty()
        {
            return Err(Error::InvalidMessage("pick SNCL not fully set".into()));
        }
        if self.time_microseconds.is_none() {
            return Err(Error::InvalidMessage("pick time not set".into()));
        }
        if self.identifier.is_none() {
            return Err(Error::InvalidMessage("pick identifier not set".into()));
        }
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
    fn round_trip_preserves_every_field() {
        let mut pick = Pick::new();
        pick.set_identifier(84823);
        pick.set_network("UU").unwrap();
        pick.set_station("MOUT").unwrap();
        pick.set_channel("EHZ").unwrap();
        pick.set_location_code("01").unwrap();
        pick.set_time_seconds(500.0);
        pick.set_polarity(Polarity::Up);
        pick.set_phase_hint("P");
        pick.set_algorithm("autoPicker");

        let bytes = pick.to_bytes().expect("serialize");
        let mut copy = Pick::new();
        copy.from_bytes(&bytes).expect("deserialize");

        assert_eq!(pick, copy);
        assert_eq!(copy.identifier().unwrap(), 84823);
        assert_eq!(copy.time_microseconds().unwrap(), 500_000_000);
        assert_eq!(copy.polarity(), Polarity::Up);
        assert_eq!(copy.phase_hint(), Some("P"));
        assert_eq!(copy.algorithm(), Some("autoPicker"));
    }

    #[test]
    fn serialize_requires_time_and_identifier() {
        let mut pick = Pick::new();
        pick.set_network("UU").unwrap();
        pick.set_station("MOUT").unwrap();
        pick.set_channel("EHZ").unwrap();
        pick.set_location_code("01").unwrap();
        assert!(pick.to_bytes().is_err());

        pick.set_time_seconds(10.0);
        assert!(pick.to_bytes().is_err());

        pick.set_identifier(1);
        assert!(pick.to_bytes().is_ok());
    }
}
