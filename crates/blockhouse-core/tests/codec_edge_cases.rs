//! Edge-case tests for the varint codec, checksums, and the Status value.

use blockhouse_core::checksum::{crc32c_value, mask_crc32c, unmask_crc32c, xxhash32};
use blockhouse_core::status::Status;
use blockhouse_core::varint::{
    get_varint32, get_varint64, put_varint32, put_varint64, varint_length, MAX_VARINT64_LENGTH,
};

// ---------------------------------------------------------------
// Varint boundaries
// ---------------------------------------------------------------

#[test]
fn varint64_boundary_values() {
    // One value on each side of every length boundary
    let mut boundaries = Vec::new();
    for bits in (7..63).step_by(7) {
        boundaries.push((1u64 << bits) - 1);
        boundaries.push(1u64 << bits);
    }
    boundaries.push(u64::MAX);

    for val in boundaries {
        let mut buf = Vec::new();
        put_varint64(&mut buf, val);
        assert_eq!(buf.len(), varint_length(val), "length mismatch for {val}");
        assert_eq!(get_varint64(&mut buf.as_slice()), Some(val));
    }
}

#[test]
fn varint64_max_is_ten_bytes() {
    let mut buf = Vec::new();
    put_varint64(&mut buf, u64::MAX);
    assert_eq!(buf.len(), MAX_VARINT64_LENGTH);
}

#[test]
fn varint64_rejects_every_truncation() {
    let mut buf = Vec::new();
    put_varint64(&mut buf, u64::MAX);
    for cut in 0..buf.len() {
        let mut cursor = &buf[..cut];
        assert_eq!(get_varint64(&mut cursor), None, "accepted {cut}-byte prefix");
    }
}

#[test]
fn varint32_rejects_oversized_continuation() {
    let mut cursor: &[u8] = &[0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
    assert_eq!(get_varint32(&mut cursor), None);
}

#[test]
fn varint_sequence_decodes_in_order() {
    let values = [0u32, 1, 300, 70_000, u32::MAX];
    let mut buf = Vec::new();
    for v in values {
        put_varint32(&mut buf, v);
    }
    let mut cursor = buf.as_slice();
    for v in values {
        assert_eq!(get_varint32(&mut cursor), Some(v));
    }
    assert!(cursor.is_empty());
}

// ---------------------------------------------------------------
// Checksum mask transform
// ---------------------------------------------------------------

#[test]
fn mask_unmask_inverse_over_sweep() {
    for i in 0..64u32 {
        let crc = i.wrapping_mul(0x9E37_79B9);
        assert_eq!(unmask_crc32c(mask_crc32c(crc)), crc);
    }
}

#[test]
fn crc32c_known_vector() {
    assert_eq!(crc32c_value(b"123456789"), 0xE306_9283);
}

#[test]
fn checksums_disagree_on_same_input() {
    // Two different functions over the same bytes; if these ever collide on
    // this input something is wired to the wrong algorithm.
    let data = b"a block payload with a trailer tag";
    assert_ne!(crc32c_value(data), xxhash32(data, 0));
}

// ---------------------------------------------------------------
// Status contract
// ---------------------------------------------------------------

#[test]
fn status_comparison_is_code_only() {
    let with_msg = Status::not_found_msg("block not in cache");
    let bare = Status::not_found();
    assert_eq!(with_msg, bare);
}

#[test]
fn status_messages_are_preserved_verbatim() {
    for msg in [
        "truncated block read",
        "block checksum mismatch",
        "bad block handle",
        "file is too short to be an sstable",
    ] {
        assert_eq!(Status::corruption(msg).message(), Some(msg));
    }
}
