//! Block Checksums
//!
//! Every block in a table file is followed by a 5-byte trailer: a 1-byte
//! compression tag and a 4-byte checksum covering the payload *and* the tag.
//! This module provides the two checksum functions the format supports and
//! the tag enum stored in the footer.
//!
//! ## Why CRC32C and Not CRC32?
//! The format uses the Castagnoli polynomial (CRC32C), which has hardware
//! support on x86 (SSE4.2) and ARM. A plain IEEE CRC32 produces different
//! values and would fail to read existing files.
//!
//! ## The Mask Transform
//! Stored CRC32C values are "masked": rotated and offset by a constant.
//! Storage layers sometimes checksum data that itself contains checksums;
//! masking makes crc(payload-containing-a-crc) not collide with the
//! embedded value. XXH32 values are stored raw.

use crc32c::crc32c;
use xxhash_rust::xxh32::xxh32;

const MASK_DELTA: u32 = 0xa282_ead8;

/// Which checksum function a table's blocks were written with.
///
/// The footer stores this as a single byte; legacy footers are always
/// [`ChecksumType::Crc32c`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChecksumType {
    NoChecksum = 0,
    Crc32c = 1,
    XxHash = 2,
}

impl ChecksumType {
    /// Decode a stored checksum tag. Unknown values return `None`; the read
    /// pipeline surfaces those as an unknown-checksum-type corruption when a
    /// block is actually verified.
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(ChecksumType::NoChecksum),
            1 => Some(ChecksumType::Crc32c),
            2 => Some(ChecksumType::XxHash),
            _ => None,
        }
    }
}

/// CRC32C (Castagnoli) of `data`.
pub fn crc32c_value(data: &[u8]) -> u32 {
    crc32c(data)
}

/// Mask a CRC32C value for storage.
pub fn mask_crc32c(crc: u32) -> u32 {
    // Rotate right by 15 bits and add a constant.
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Invert [`mask_crc32c`], recovering the raw CRC32C value.
pub fn unmask_crc32c(masked: u32) -> u32 {
    let rot = masked.wrapping_sub(MASK_DELTA);
    (rot >> 17) | (rot << 15)
}

/// XXH32 of `data` with the given seed. Block trailers use seed 0.
pub fn xxhash32(data: &[u8], seed: u32) -> u32 {
    xxh32(data, seed)
}
