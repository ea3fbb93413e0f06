//! Block Decompression
//!
//! A block's trailer names the codec its payload was written with; this
//! module turns a raw payload back into uncompressed bytes. The payload is
//! hostile input - every codec error, short header, or unknown tag becomes a
//! `Corruption` with a stable, codec-specific message.
//!
//! ## Size Headers
//! Format version 2 onward prepends the uncompressed size to Zlib, BZip2,
//! and LZ4 payloads as a varint32 ([`compress_format_for_version`]); version
//! 1 LZ4 used a fixed 32-bit little-endian header. ZSTD payloads always
//! carry the varint header. Snappy embeds its own length and is unversioned.
//!
//! ## Dictionaries
//! Zlib, LZ4, LZ4HC, and ZSTD honor a preset compression dictionary; the
//! other codecs ignore it.
//!
//! ## Codec Availability
//! XPRESS has no codec here; its blocks decode to the same corruption
//! message an actually-corrupted block would produce, which is what callers
//! expect when a file was written by a build with more codecs than this one.

use std::io::Read;
use std::time::Instant;

use blockhouse_core::status::{Result, Status};
use blockhouse_core::varint::{decode_fixed32, get_varint32};
use bytes::Bytes;
use flate2::{Decompress, FlushDecompress};

use crate::format::{BlockContents, CompressionType};
use crate::options::{should_report_detailed_time, EngineOptions};
use crate::stats::{Histogram, Ticker};

/// Which on-wire framing a codec uses at a given table format version.
///
/// Version 2 tables began embedding the uncompressed size ahead of the
/// compressed body for the codecs that need it.
pub fn compress_format_for_version(compression: CompressionType, format_version: u32) -> u32 {
    debug_assert!(
        !matches!(
            compression,
            CompressionType::None | CompressionType::Snappy | CompressionType::Xpress
        ),
        "codec is not versioned"
    );
    if format_version < 2 {
        1
    } else {
        2
    }
}

fn corrupt(codec: &str) -> Status {
    Status::corruption(format!(
        "{codec} not supported or corrupted {codec} compressed block contents"
    ))
}

/// Read the varint32 uncompressed-size header, advancing the cursor.
fn get_decompressed_size(input: &mut &[u8]) -> Option<usize> {
    get_varint32(input).map(|n| n as usize)
}

fn snappy_uncompress(payload: &[u8]) -> Result<Vec<u8>> {
    // Ask the stream for its uncompressed length, then decompress into a
    // buffer of exactly that size.
    let len = snap::raw::decompress_len(payload).map_err(|_| corrupt("Snappy"))?;
    let mut buf = vec![0u8; len];
    snap::raw::Decoder::new()
        .decompress(payload, &mut buf)
        .map_err(|_| corrupt("Snappy"))?;
    Ok(buf)
}

fn zlib_uncompress(payload: &[u8], format: u32, dict: &[u8]) -> Result<Vec<u8>> {
    let mut input = payload;
    let size_hint = if format == 2 {
        Some(get_decompressed_size(&mut input).ok_or_else(|| corrupt("Zlib"))?)
    } else {
        None
    };

    // Raw deflate stream (no zlib wrapper).
    let mut decomp = Decompress::new(false);
    if !dict.is_empty() {
        decomp.set_dictionary(dict).map_err(|_| corrupt("Zlib"))?;
    }

    let mut out: Vec<u8> = Vec::with_capacity(size_hint.unwrap_or(input.len() * 2).max(64));
    loop {
        let consumed = decomp.total_in() as usize;
        match decomp.decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish) {
            Ok(flate2::Status::StreamEnd) => break,
            Ok(_) => {
                if out.len() == out.capacity() {
                    out.reserve(out.capacity().max(64));
                } else if decomp.total_in() as usize == consumed {
                    // No forward progress: the stream ended without a finish
                    // marker.
                    return Err(corrupt("Zlib"));
                }
            }
            Err(_) => return Err(corrupt("Zlib")),
        }
    }

    if let Some(expected) = size_hint {
        if out.len() != expected {
            return Err(corrupt("Zlib"));
        }
    }
    Ok(out)
}

fn bzip2_uncompress(payload: &[u8], format: u32) -> Result<Vec<u8>> {
    let mut input = payload;
    let size_hint = if format == 2 {
        Some(get_decompressed_size(&mut input).ok_or_else(|| corrupt("Bzip2"))?)
    } else {
        None
    };

    let mut out = Vec::with_capacity(size_hint.unwrap_or(0));
    bzip2::read::BzDecoder::new(input)
        .read_to_end(&mut out)
        .map_err(|_| corrupt("Bzip2"))?;

    if let Some(expected) = size_hint {
        if out.len() != expected {
            return Err(corrupt("Bzip2"));
        }
    }
    Ok(out)
}

fn lz4_uncompress(payload: &[u8], format: u32, dict: &[u8], codec: &str) -> Result<Vec<u8>> {
    let mut input = payload;
    let size = if format == 2 {
        get_decompressed_size(&mut input).ok_or_else(|| corrupt(codec))?
    } else {
        // Version 1 stored the size as a fixed 32-bit little-endian header.
        if input.len() < 4 {
            return Err(corrupt(codec));
        }
        let size = decode_fixed32(input) as usize;
        input = &input[4..];
        size
    };

    let result = if dict.is_empty() {
        lz4_flex::block::decompress(input, size)
    } else {
        lz4_flex::block::decompress_with_dict(input, size, dict)
    };
    result.map_err(|_| corrupt(codec))
}

fn zstd_uncompress(payload: &[u8], dict: &[u8]) -> Result<Vec<u8>> {
    let mut input = payload;
    let size = get_decompressed_size(&mut input).ok_or_else(|| corrupt("ZSTD"))?;

    let mut decomp = if dict.is_empty() {
        zstd::bulk::Decompressor::new()
    } else {
        zstd::bulk::Decompressor::with_dictionary(dict)
    }
    .map_err(|_| corrupt("ZSTD"))?;

    decomp.decompress(input, size).map_err(|_| corrupt("ZSTD"))
}

/// Decompress a block payload into owned [`BlockContents`].
///
/// `payload` is the compressed body (trailer excluded); `tag` is the
/// compression byte out of the trailer. An unknown tag, a missing codec, or
/// any codec failure is `Corruption` - the payload came off disk or out of a
/// cache and is never trusted.
pub fn uncompress_block_contents(
    payload: &[u8],
    tag: u8,
    format_version: u32,
    compression_dict: &[u8],
    options: &EngineOptions,
) -> Result<BlockContents<'static>> {
    let timer = should_report_detailed_time(options).then(Instant::now);

    let uncompressed = match CompressionType::from_tag(tag) {
        Some(CompressionType::Snappy) => snappy_uncompress(payload)?,
        Some(CompressionType::Zlib) => zlib_uncompress(
            payload,
            compress_format_for_version(CompressionType::Zlib, format_version),
            compression_dict,
        )?,
        Some(CompressionType::Bzip2) => bzip2_uncompress(
            payload,
            compress_format_for_version(CompressionType::Bzip2, format_version),
        )?,
        Some(CompressionType::Lz4) => lz4_uncompress(
            payload,
            compress_format_for_version(CompressionType::Lz4, format_version),
            compression_dict,
            "LZ4",
        )?,
        Some(CompressionType::Lz4hc) => lz4_uncompress(
            payload,
            compress_format_for_version(CompressionType::Lz4hc, format_version),
            compression_dict,
            "LZ4HC",
        )?,
        Some(CompressionType::Xpress) => return Err(corrupt("XPRESS")),
        Some(CompressionType::Zstd) | Some(CompressionType::ZstdNotFinal) => {
            zstd_uncompress(payload, compression_dict)?
        }
        Some(CompressionType::None) | None => {
            return Err(Status::corruption("bad block type"));
        }
    };

    if let (Some(start), Some(stats)) = (timer, options.statistics.as_ref()) {
        stats.measure_time(
            Histogram::DecompressionTimesNanos,
            start.elapsed().as_nanos() as u64,
        );
        stats.measure_time(Histogram::BytesDecompressed, uncompressed.len() as u64);
        stats.record_tick(Ticker::NumberBlockDecompressed, 1);
    }

    Ok(BlockContents::owned(
        Bytes::from(uncompressed),
        CompressionType::None,
    ))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::stats::{StatsLevel, Statistics};
    use std::sync::Arc;

    fn sample_payload() -> Vec<u8> {
        // Repetitive enough that every codec actually shrinks it
        let mut data = Vec::new();
        for i in 0..200u32 {
            data.extend_from_slice(format!("key{:05}=value{:05};", i % 40, i % 40).as_bytes());
        }
        data
    }

    fn opts() -> EngineOptions {
        EngineOptions::default()
    }

    #[test]
    fn test_snappy_roundtrip() {
        let data = sample_payload();
        let compressed = snappy_compress(&data);
        let contents = uncompress_block_contents(
            &compressed,
            CompressionType::Snappy.tag(),
            2,
            &[],
            &opts(),
        )
        .unwrap();
        assert_eq!(contents.data(), &data[..]);
        assert_eq!(contents.compression, CompressionType::None);
        assert!(contents.cachable);
    }

    #[test]
    fn test_snappy_corrupted() {
        let data = sample_payload();
        let mut compressed = snappy_compress(&data);
        let len = compressed.len();
        compressed.truncate(len / 2);

        let err = uncompress_block_contents(
            &compressed,
            CompressionType::Snappy.tag(),
            2,
            &[],
            &opts(),
        )
        .unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(
            err.message(),
            Some("Snappy not supported or corrupted Snappy compressed block contents")
        );
    }

    #[test]
    fn test_zlib_roundtrip() {
        let data = sample_payload();
        let compressed = zlib_compress(&data);
        let contents =
            uncompress_block_contents(&compressed, CompressionType::Zlib.tag(), 2, &[], &opts())
                .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_zlib_garbage_is_corruption() {
        let err = uncompress_block_contents(
            &[0x05, 0xDE, 0xAD, 0xBE, 0xEF, 0x00],
            CompressionType::Zlib.tag(),
            2,
            &[],
            &opts(),
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            Some("Zlib not supported or corrupted Zlib compressed block contents")
        );
    }

    #[test]
    fn test_bzip2_roundtrip() {
        let data = sample_payload();
        let compressed = bzip2_compress(&data);
        let contents =
            uncompress_block_contents(&compressed, CompressionType::Bzip2.tag(), 2, &[], &opts())
                .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_lz4_format2_roundtrip() {
        let data = sample_payload();
        let compressed = lz4_compress_format2(&data);
        let contents =
            uncompress_block_contents(&compressed, CompressionType::Lz4.tag(), 2, &[], &opts())
                .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_lz4_format1_roundtrip() {
        let data = sample_payload();
        let compressed = lz4_compress_format1(&data);
        let contents =
            uncompress_block_contents(&compressed, CompressionType::Lz4.tag(), 1, &[], &opts())
                .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_lz4hc_uses_its_own_message() {
        let err = uncompress_block_contents(
            &[0xFF, 0xFF],
            CompressionType::Lz4hc.tag(),
            2,
            &[],
            &opts(),
        )
        .unwrap_err();
        assert_eq!(
            err.message(),
            Some("LZ4HC not supported or corrupted LZ4HC compressed block contents")
        );
    }

    #[test]
    fn test_zstd_roundtrip() {
        let data = sample_payload();
        let compressed = zstd_compress(&data, &[]);
        let contents =
            uncompress_block_contents(&compressed, CompressionType::Zstd.tag(), 2, &[], &opts())
                .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_zstd_not_final_tag_decodes_as_zstd() {
        let data = sample_payload();
        let compressed = zstd_compress(&data, &[]);
        let contents = uncompress_block_contents(
            &compressed,
            CompressionType::ZstdNotFinal.tag(),
            2,
            &[],
            &opts(),
        )
        .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_zstd_dictionary_roundtrip() {
        let dict = b"key00000=value00000;key00001=value00001;".to_vec();
        let data = sample_payload();
        let compressed = zstd_compress(&data, &dict);

        let contents = uncompress_block_contents(
            &compressed,
            CompressionType::Zstd.tag(),
            2,
            &dict,
            &opts(),
        )
        .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_lz4_with_dictionary_present() {
        // A stream that never references the dictionary must decode the
        // same whether or not one is supplied.
        let dict = b"key00000=value00000;".to_vec();
        let data = sample_payload();
        let compressed = lz4_compress_format2(&data);
        let contents = uncompress_block_contents(
            &compressed,
            CompressionType::Lz4.tag(),
            2,
            &dict,
            &opts(),
        )
        .unwrap();
        assert_eq!(contents.data(), &data[..]);
    }

    #[test]
    fn test_xpress_not_built_in() {
        let err =
            uncompress_block_contents(&[1, 2, 3], CompressionType::Xpress.tag(), 2, &[], &opts())
                .unwrap_err();
        assert_eq!(
            err.message(),
            Some("XPRESS not supported or corrupted XPRESS compressed block contents")
        );
    }

    #[test]
    fn test_unknown_tag_is_bad_block_type() {
        let err = uncompress_block_contents(&[1, 2, 3], 0x77, 2, &[], &opts()).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.message(), Some("bad block type"));

        // The no-compression tag never reaches the decompressor legally
        let err = uncompress_block_contents(&[1, 2, 3], 0, 2, &[], &opts()).unwrap_err();
        assert_eq!(err.message(), Some("bad block type"));
    }

    #[test]
    fn test_detailed_timers_record_stats() {
        let stats = Arc::new(Statistics::new());
        let options = EngineOptions::with_statistics(stats.clone(), StatsLevel::All);

        let data = sample_payload();
        let compressed = lz4_compress_format2(&data);
        uncompress_block_contents(&compressed, CompressionType::Lz4.tag(), 2, &[], &options)
            .unwrap();

        assert_eq!(stats.ticker(Ticker::NumberBlockDecompressed), 1);
        let bytes = stats.histogram(Histogram::BytesDecompressed);
        assert_eq!(bytes.count, 1);
        assert_eq!(bytes.sum, data.len() as u64);
        assert_eq!(stats.histogram(Histogram::DecompressionTimesNanos).count, 1);
    }

    #[test]
    fn test_default_stats_level_records_nothing() {
        let stats = Arc::new(Statistics::new());
        let options =
            EngineOptions::with_statistics(stats.clone(), StatsLevel::ExceptDetailedTimers);

        let data = sample_payload();
        let compressed = lz4_compress_format2(&data);
        uncompress_block_contents(&compressed, CompressionType::Lz4.tag(), 2, &[], &options)
            .unwrap();

        assert_eq!(stats.ticker(Ticker::NumberBlockDecompressed), 0);
        assert_eq!(stats.histogram(Histogram::BytesDecompressed).count, 0);
    }
}
