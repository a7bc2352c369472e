// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-sensor ring of time-ordered packets.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::message_formats::DataPacket;

/// What happened to a packet offered to the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The packet was inserted (possibly evicting the oldest).
    Inserted,
    /// A packet with the same start time is already present.
    RejectedDuplicate,
    /// The ring is full and the packet is older than everything in it.
    RejectedExpired,
}

/// A bounded, time-ordered ring of packets for one sensor.
///
/// Start times are kept strictly increasing: duplicates are rejected, a
/// packet older than a full ring's oldest is dropped, and inserting past
/// the bound evicts the oldest. Not thread-safe on its own; the
/// [`crate::proxy_services::packet_cache::CappedCollection`] wraps each
/// ring in a reader-writer lock.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    packets: VecDeque<DataPacket<T>>,
    max_packets: usize,
}

impl<T: Clone> CircularBuffer<T> {
    /// Creates a ring bounded by `max_packets`.
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
            packets: VecDeque::with_capacity(max_packets),
            max_packets,
        })
    }

    /// Offers a packet to the ring.
    pub fn add(&mut self, packet: DataPacket<T>) -> AddOutcome {
        let start_time = packet.start_time_microseconds();
        let position = self
            .packets
            .partition_point(|p| p.start_time_microseconds() < start_time);
        if self
            .packets
            .get(position)
            .is_some_and(|p| p.start_time_microseconds() == start_time)
        {
            return AddOutcome::RejectedDuplicate;
        }
        if self.packets.len() >= self.max_packets && position == 0 {
            return AddOutcome::RejectedExpired;
        }
        self.packets.insert(position, packet);
        if self.packets.len() > self.max_packets {
            self.packets.pop_front();
        }
        AddOutcome::Inserted
    }

    /// Packets whose `[start, end]` interval intersects `[t0, t1]`, in
    /// ascending start time.
    pub fn packets_in_range(&self, t0: i64, t1: i64) -> Vec<DataPacket<T>> {
        self.packets
            .iter()
            .filter(|p| p.end_time_microseconds() >= t0 && p.start_time_microseconds() <= t1)
            .cloned()
            .collect()
    }

    /// The oldest start time, when the ring is non-empty.
    pub fn earliest_start_time(&self) -> Option<i64> {
        self.packets.front().map(DataPacket::start_time_microseconds)
    }

    /// The newest start time, when the ring is non-empty.
    pub fn latest_start_time(&self) -> Option<i64> {
        self.packets.back().map(DataPacket::start_time_microseconds)
    }

    /// Number of packets held.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// True when the ring holds nothing.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// The configured bound.
    pub fn max_packets(&self) -> usize {
        self.max_packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(start_seconds: i64) -> DataPacket<i32> {
        let mut packet = DataPacket::<i32>::new();
        packet.set_network("UU").unwrap();
        packet.set_station("MOUT").unwrap();
        packet.set_channel("EHZ").unwrap();
        packet.set_location_code("01").unwrap();
        packet.set_sampling_rate(100.0).unwrap();
        packet.set_start_time_microseconds(start_seconds * 1_000_000);
        packet.set_samples((0..100).collect());
        packet
    }

    #[test]
    fn zero_bound_is_rejected() {
        assert!(CircularBuffer::<i32>::new(0).is_err());
    }

    #[test]
    fn inserts_stay_time_ordered() {
        let mut ring = CircularBuffer::new(10).unwrap();
        for start in [5, 1, 3, 2, 4] {
            assert_eq!(ring.add(packet(start)), AddOutcome::Inserted);
        }
        assert_eq!(ring.earliest_start_time(), Some(1_000_000));
        assert_eq!(ring.latest_start_time(), Some(5_000_000));
        let all = ring.packets_in_range(i64::MIN, i64::MAX);
        let starts: Vec<i64> = all.iter().map(DataPacket::start_time_microseconds).collect();
        assert_eq!(starts, vec![1_000_000, 2_000_000, 3_000_000, 4_000_000, 5_000_000]);
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut ring = CircularBuffer::new(10).unwrap();
        assert_eq!(ring.add(packet(1)), AddOutcome::Inserted);
        assert_eq!(ring.add(packet(1)), AddOutcome::RejectedDuplicate);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn overflow_evicts_the_oldest() {
        let mut ring = CircularBuffer::new(3).unwrap();
        for start in 1..=5 {
            ring.add(packet(start));
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.earliest_start_time(), Some(3_000_000));
    }

    #[test]
    fn expired_packet_into_full_ring_is_a_no_op() {
        let mut ring = CircularBuffer::new(3).unwrap();
        for start in [10, 11, 12] {
            ring.add(packet(start));
        }
        assert_eq!(ring.add(packet(1)), AddOutcome::RejectedExpired);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.earliest_start_time(), Some(10_000_000));
    }

    #[test]
    fn old_packet_into_partial_ring_is_inserted() {
        let mut ring = CircularBuffer::new(3).unwrap();
        ring.add(packet(10));
        assert_eq!(ring.add(packet(1)), AddOutcome::Inserted);
        assert_eq!(ring.earliest_start_time(), Some(1_000_000));
    }

    #[test]
    fn range_query_uses_interval_overlap() {
        let mut ring = CircularBuffer::new(10).unwrap();
        // Each packet spans 0.99 s past its start.
        for start in 0..10 {
            ring.add(packet(start));
        }
        // [3.5 s, 6.2 s] overlaps packets starting at 3, 4, 5, and 6.
        let hits = ring.packets_in_range(3_500_000, 6_200_000);
        let starts: Vec<i64> = hits.iter().map(DataPacket::start_time_microseconds).collect();
        assert_eq!(starts, vec![3_000_000, 4_000_000, 5_000_000, 6_000_000]);
    }
}
