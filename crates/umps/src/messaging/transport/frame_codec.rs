// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefix framing for multi-part messages.
//!
//! Streams have no message boundaries, so every multi-part message is
//! written as:
//!
//! ```text
//! +----------------+------------------------------------------+
//! | Parts (4B BE)  | per part: Length (4B BE) | Part bytes     |
//! +----------------+------------------------------------------+
//! ```
//!
//! Oversized messages are rejected before allocation.

use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::messaging::transport::Frame;

/// Maximum bytes in a single part (anti-OOM guard).
pub(crate) const MAX_PART_SIZE: usize = 16 * 1024 * 1024;

/// Maximum parts in a single message.
pub(crate) const MAX_PARTS: usize = 128;

/// Writes a multi-part message to the stream.
pub(crate) fn write_parts<W: Write>(writer: &mut W, parts: &[Frame]) -> Result<()> {
    if parts.is_empty() || parts.len() > MAX_PARTS {
        return Err(Error::TransportError(format!(
            "message must have 1..={} parts, got {}",
            MAX_PARTS,
            parts.len()
        )));
    }
    #[allow(clippy::cast_possible_truncation)]
    writer.write_all(&(parts.len() as u32).to_be_bytes())?;
    for part in parts {
        if part.len() > MAX_PART_SIZE {
            return Err(Error::TransportError(format!(
                "part of {} bytes exceeds maximum {}",
                part.len(),
                MAX_PART_SIZE
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        writer.write_all(&(part.len() as u32).to_be_bytes())?;
        writer.write_all(part)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads one multi-part message from the stream.
///
/// Blocks until a full message arrives. An orderly remote close while
/// reading the part-count header surfaces as `UnexpectedEof`.
pub(crate) fn read_parts<R: Read>(reader: &mut R) -> Result<Vec<Frame>> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;
    let count = u32::from_be_bytes(header) as usize;
    if count == 0 || count > MAX_PARTS {
        return Err(Error::TransportError(format!(
            "invalid part count {}",
            count
        )));
    }
    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let mut length_bytes = [0u8; 4];
        reader.read_exact(&mut length_bytes)?;
        let length = u32::from_be_bytes(length_bytes) as usize;
        if length > MAX_PART_SIZE {
            return Err(Error::TransportError(format!(
                "part of {} bytes exceeds maximum {}",
                length, MAX_PART_SIZE
            )));
        }
        let mut part = vec![0u8; length];
        reader.read_exact(&mut part)?;
        parts.push(part);
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_multi_part() {
        let parts: Vec<Frame> = vec![b"UMPS::MessageFormats::Text".to_vec(), b"payload".to_vec()];
        let mut buffer = Vec::new();
        write_parts(&mut buffer, &parts).expect("write");

        let mut cursor = std::io::Cursor::new(buffer);
        let decoded = read_parts(&mut cursor).expect("read");
        assert_eq!(decoded, parts);
    }

    #[test]
    fn empty_frames_are_preserved() {
        let parts: Vec<Frame> = vec![b"identity".to_vec(), Vec::new(), b"body".to_vec()];
        let mut buffer = Vec::new();
        write_parts(&mut buffer, &parts).expect("write");
        let decoded = read_parts(&mut std::io::Cursor::new(buffer)).expect("read");
        assert_eq!(decoded.len(), 3);
        assert!(decoded[1].is_empty());
    }

    #[test]
    fn zero_parts_is_rejected() {
        let parts: Vec<Frame> = Vec::new();
        let mut buffer = Vec::new();
        assert!(write_parts(&mut buffer, &parts).is_err());

        let raw = 0u32.to_be_bytes().to_vec();
        assert!(read_parts(&mut std::io::Cursor::new(raw)).is_err());
    }

    #[test]
    fn oversized_part_count_is_rejected() {
        let raw = 1_000_000u32.to_be_bytes().to_vec();
        assert!(read_parts(&mut std::io::Cursor::new(raw)).is_err());
    }
}
