// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The thread-safe map of per-sensor rings.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::message_formats::DataPacket;
use crate::proxy_services::packet_cache::{AddOutcome, CircularBuffer};

/// A capped, per-sensor store of data packets.
///
/// Rings are keyed by `network.station.channel.location_code`. Each ring
/// sits behind its own reader-writer lock, so queries on different
/// sensors never contend and readers of the same sensor share the lock;
/// the outer map only locks a shard when a new sensor appears. Memory
/// never exceeds `sensors x max_packets` packets.
pub struct CappedCollection<T> {
    rings: DashMap<String, Arc<RwLock<CircularBuffer<T>>>>,
    max_packets: usize,
    total: AtomicUsize,
}

impl<T: Clone> CappedCollection<T> {
    /// Creates a collection whose rings hold at most `max_packets`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the bound is zero.
    pub fn new(max_packets: usize) -> Result<Self> {
        if max_packets == 0 {
            return Err(Error::InvalidArgument(
                "max packets must be positive".into(),
            ));
        }
        Ok(Self {
            rings: DashMap::new(),
            max_packets,
            total: AtomicUsize::new(0),
        })
    }

    /// Adds a packet to its sensor's ring.
    ///
    /// Duplicates and expired packets are dropped quietly (with a debug
    /// log); this is the documented lossy behavior, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the packet's SNCL,
    /// sampling rate, or samples are unset.
    pub fn add_packet(&self, packet: &DataPacket<T>) -> Result<()> {
        if !packet.is_complete() {
            return Err(Error::InvalidArgument(
                "packet is missing its SNCL, sampling rate, or samples".into(),
            ));
        }
        let key = sensor_key(
            packet.network(),
            packet.station(),
            packet.channel(),
            packet.location_code(),
        );
        let ring = self
            .rings
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(RwLock::new(
                    CircularBuffer::new(self.max_packets).expect("bound checked in new"),
                ))
            })
            .clone();

        let mut guard = ring.write();
        let before = guard.len();
        let outcome = guard.add(packet.clone());
        let after = guard.len();
        drop(guard);

        self.total.fetch_add(after - before, Ordering::Relaxed);
        match outcome {
            AddOutcome::Inserted => {}
            AddOutcome::RejectedDuplicate => {
                log::debug!("[packet-cache] dropped duplicate packet for {}", key);
            }
            AddOutcome::RejectedExpired => {
                log::debug!("[packet-cache] dropped expired packet for {}", key);
            }
        }
        Ok(())
    }

    /// True when the sensor has a ring.
    pub fn have_sensor(
        &self,
        network: &str,
        station: &str,
        channel: &str,
        location_code: &str,
    ) -> bool {
        self.rings
            .contains_key(&sensor_key(network, station, channel, location_code))
    }

    /// Packets for a sensor whose intervals intersect `[t0, t1]`
    /// microseconds, ascending by start time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the sensor is unknown or
    /// the range is inverted.
    pub fn get_packets(
        &self,
        network: &str,
        station: &str,
        channel: &str,
        location_code: &str,
        t0: i64,
        t1: i64,
    ) -> Result<Vec<DataPacket<T>>> {
        if t1 < t0 {
            return Err(Error::InvalidArgument(format!(
                "query end {} precedes start {}",
                t1, t0
            )));
        }
        let key = sensor_key(network, station, channel, location_code);
        let ring = self
            .rings
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::InvalidArgument(format!("no sensor {}", key)))?;
        let guard = ring.read();
        Ok(guard.packets_in_range(t0, t1))
    }

    /// The sensors with rings, sorted.
    pub fn sensor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rings.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Total packets across every ring.
    pub fn total_packets(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// The per-ring bound.
    pub fn max_packets(&self) -> usize {
        self.max_packets
    }
}

fn sensor_key(network: &str, station: &str, channel: &str, location_code: &str) -> String {
    format!("{}.{}.{}.{}", network, station, channel, location_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(station: &str, start_seconds: i64) -> DataPacket<f64> {
        let mut packet = DataPacket::<f64>::new();
        packet.set_network("UU").unwrap();
        packet.set_station(station).unwrap();
        packet.set_channel("EHZ").unwrap();
        packet.set_location_code("01").unwrap();
        packet.set_sampling_rate(100.0).unwrap();
        packet.set_start_time_microseconds(start_seconds * 1_000_000);
        packet.set_samples(vec![0.0; 100]);
        packet
    }

    #[test]
    fn incomplete_packets_are_rejected() {
        let collection = CappedCollection::<f64>::new(10).unwrap();
        let empty = DataPacket::<f64>::new();
        assert!(collection.add_packet(&empty).is_err());
    }

    #[test]
    fn per_sensor_rings_and_totals() {
        let collection = CappedCollection::new(3).unwrap();
        for start in 0..5 {
            collection.add_packet(&packet("MOUT", start)).unwrap();
            collection.add_packet(&packet("CWU", start)).unwrap();
        }
        assert!(collection.have_sensor("UU", "MOUT", "EHZ", "01"));
        assert!(collection.have_sensor("UU", "CWU", "EHZ", "01"));
        assert!(!collection.have_sensor("UU", "NOPE", "EHZ", "01"));
        // Both rings capped at 3.
        assert_eq!(collection.total_packets(), 6);
        assert_eq!(
            collection.sensor_names(),
            vec!["UU.CWU.EHZ.01", "UU.MOUT.EHZ.01"]
        );
    }

    #[test]
    fn duplicates_do_not_inflate_totals() {
        let collection = CappedCollection::new(10).unwrap();
        collection.add_packet(&packet("MOUT", 1)).unwrap();
        collection.add_packet(&packet("MOUT", 1)).unwrap();
        assert_eq!(collection.total_packets(), 1);
    }

    #[test]
    fn unknown_sensor_query_fails() {
        let collection = CappedCollection::<f64>::new(10).unwrap();
        assert!(collection
            .get_packets("UU", "MOUT", "EHZ", "01", 0, 10)
            .is_err());
    }

    #[test]
    fn inverted_range_fails() {
        let collection = CappedCollection::new(10).unwrap();
        collection.add_packet(&packet("MOUT", 1)).unwrap();
        assert!(collection
            .get_packets("UU", "MOUT", "EHZ", "01", 10, 0)
            .is_err());
    }
}
