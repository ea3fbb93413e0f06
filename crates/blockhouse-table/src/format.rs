//! Table File Format: Handles, Footers, and the Block Trailer
//!
//! This module implements the binary format that bootstraps reading a table
//! file. A table is a sequence of blocks followed by a fixed-size footer:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Block 1 payload                                             │
//! │ Block 1 trailer: tag (1 byte) + checksum (4 bytes, LE)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │ ... more blocks ...                                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Metaindex block (+ trailer)                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Index block (+ trailer)                                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │ Footer (48 or 53 bytes, always at EOF)                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Block Handles
//! Every block is addressed by a `BlockHandle`: an `(offset, size)` pair
//! encoded as two varints. `size` counts only the payload - the 5-byte
//! trailer is not included, so the physical extent of a block is
//! `size + BLOCK_TRAILER_SIZE` bytes.
//!
//! ## Two Footer Layouts
//! The format has grown a generation:
//!
//! ```text
//! legacy (48 bytes):                 current (53 bytes):
//!   metaindex handle (varints)         checksum type (1 byte)
//!   index handle (varints)             metaindex handle (varints)
//!   zero padding to 40 bytes           index handle (varints)
//!   magic low  (4 bytes, LE)           zero padding to 41 bytes
//!   magic high (4 bytes, LE)           version (4 bytes, LE)
//!                                      magic low  (4 bytes, LE)
//!                                      magic high (4 bytes, LE)
//! ```
//!
//! Decoding sniffs the 8-byte magic at the very end of the file. Legacy
//! magics are silently upconverted to their current equivalents: the caller
//! always sees a current-format `Footer` with `version == 0` and CRC32C.
//!
//! ## A Deliberate Asymmetry
//! Writers store the checksum type as a literal byte; readers parse it as a
//! varint32. The two coincide for every value below 128, and existing files
//! depend on the varint read, so both sides are preserved here exactly.

use std::fmt;

use blockhouse_core::checksum::ChecksumType;
use blockhouse_core::status::{Result, Status};
use blockhouse_core::varint::{
    decode_fixed32, get_varint32, get_varint64, put_fixed32, put_varint64,
};

use crate::file::{RandomAccessFile, ReadSlice};

/// Magic number of current block-based table files.
pub const BLOCK_BASED_TABLE_MAGIC_NUMBER: u64 = 0x88e241b785f4cff7;

/// Magic number of pre-versioning block-based table files.
pub const LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER: u64 = 0xdb4775248b80fb57;

/// Magic number of current plain table files.
pub const PLAIN_TABLE_MAGIC_NUMBER: u64 = 0x8242229663bf9564;

/// Magic number of pre-versioning plain table files.
pub const LEGACY_PLAIN_TABLE_MAGIC_NUMBER: u64 = 0x4f3418eb7a8f13b8;

/// Bytes appended to every block: 1-byte compression tag + 4-byte checksum.
pub const BLOCK_TRAILER_SIZE: usize = 5;

const MAGIC_NUMBER_LENGTH: usize = 8;

fn is_legacy_footer_format(magic: u64) -> bool {
    magic == LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER || magic == LEGACY_PLAIN_TABLE_MAGIC_NUMBER
}

fn upconvert_legacy_footer_format(magic: u64) -> u64 {
    match magic {
        LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER => BLOCK_BASED_TABLE_MAGIC_NUMBER,
        LEGACY_PLAIN_TABLE_MAGIC_NUMBER => PLAIN_TABLE_MAGIC_NUMBER,
        _ => unreachable!("not a legacy magic number"),
    }
}

/// Compression tag stored in a block trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    None = 0,
    Snappy = 1,
    Zlib = 2,
    Bzip2 = 3,
    Lz4 = 4,
    Lz4hc = 5,
    Xpress = 6,
    Zstd = 7,
    /// Tag written by pre-release ZSTD support; decoded identically to
    /// [`CompressionType::Zstd`].
    ZstdNotFinal = 0x40,
}

impl CompressionType {
    /// Decode a trailer tag byte. Unknown tags return `None`; the read
    /// pipeline reports those as `Corruption("bad block type")`.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionType::None),
            1 => Some(CompressionType::Snappy),
            2 => Some(CompressionType::Zlib),
            3 => Some(CompressionType::Bzip2),
            4 => Some(CompressionType::Lz4),
            5 => Some(CompressionType::Lz4hc),
            6 => Some(CompressionType::Xpress),
            7 => Some(CompressionType::Zstd),
            0x40 => Some(CompressionType::ZstdNotFinal),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The codec name used in user-visible corruption messages.
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "None",
            CompressionType::Snappy => "Snappy",
            CompressionType::Zlib => "Zlib",
            CompressionType::Bzip2 => "Bzip2",
            CompressionType::Lz4 => "LZ4",
            CompressionType::Lz4hc => "LZ4HC",
            CompressionType::Xpress => "XPRESS",
            CompressionType::Zstd | CompressionType::ZstdNotFinal => "ZSTD",
        }
    }
}

/// Storage of a block payload: owned bytes or a zero-copy borrow.
#[derive(Debug, Clone)]
pub enum BlockData<'a> {
    Owned(bytes::Bytes),
    /// Borrow into the file reader's own storage; valid until the next
    /// operation on the reader.
    View(&'a [u8]),
}

/// A block payload handed to the caller by the read pipeline, plus the
/// metadata needed to use it.
#[derive(Debug, Clone)]
pub struct BlockContents<'a> {
    pub data: BlockData<'a>,
    /// Safe to hand to a block cache. Only owned buffers are; a borrow dies
    /// with the reader.
    pub cachable: bool,
    /// Compression of `data`. `None` when the pipeline already decompressed.
    pub compression: CompressionType,
}

impl BlockContents<'static> {
    pub fn owned(data: bytes::Bytes, compression: CompressionType) -> Self {
        BlockContents {
            data: BlockData::Owned(data),
            cachable: true,
            compression,
        }
    }
}

impl<'a> BlockContents<'a> {
    pub fn borrowed(data: &'a [u8], compression: CompressionType) -> Self {
        BlockContents {
            data: BlockData::View(data),
            cachable: false,
            compression,
        }
    }

    /// The payload bytes, wherever they live.
    pub fn data(&self) -> &[u8] {
        match &self.data {
            BlockData::Owned(bytes) => bytes,
            BlockData::View(view) => view,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self.data, BlockData::Owned(_))
    }
}

/// A pointer to a block: file offset and payload size, both in bytes.
///
/// Freshly constructed handles are uninitialized (all-ones sentinel) until
/// both fields are set; [`BlockHandle::decode_from`] only ever produces
/// initialized handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    offset: u64,
    size: u64,
}

const UNINITIALIZED: u64 = u64::MAX;

impl BlockHandle {
    /// Maximum encoded length: two 10-byte varints.
    pub const MAX_ENCODED_LENGTH: usize = 20;

    /// The distinguished `(0, 0)` handle.
    pub const NULL: BlockHandle = BlockHandle { offset: 0, size: 0 };

    pub fn new(offset: u64, size: u64) -> Self {
        BlockHandle { offset, size }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn is_initialized(&self) -> bool {
        self.offset != UNINITIALIZED && self.size != UNINITIALIZED
    }

    /// Append the wire form: `varint64(offset) || varint64(size)`.
    ///
    /// Both fields must have been set; encoding an uninitialized handle is a
    /// logic error.
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        debug_assert!(self.is_initialized());
        put_varint64(dst, self.offset);
        put_varint64(dst, self.size);
    }

    /// Decode a handle, advancing `input` past the consumed bytes.
    pub fn decode_from(input: &mut &[u8]) -> Result<BlockHandle> {
        match (get_varint64(input), get_varint64(input)) {
            (Some(offset), Some(size)) => Ok(BlockHandle { offset, size }),
            _ => Err(Status::corruption("bad block handle")),
        }
    }
}

impl Default for BlockHandle {
    fn default() -> Self {
        BlockHandle {
            offset: UNINITIALIZED,
            size: UNINITIALIZED,
        }
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut encoded = Vec::with_capacity(Self::MAX_ENCODED_LENGTH);
        self.encode_to(&mut encoded);
        for byte in encoded {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// The fixed-size tail of a table file: everything needed to start reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    version: u32,
    // Raw checksum tag. Values outside `ChecksumType` are preserved so that
    // verification, not footer decoding, decides whether a file is readable.
    checksum: u8,
    metaindex_handle: BlockHandle,
    index_handle: BlockHandle,
    table_magic_number: u64,
}

impl Footer {
    /// Encoded length of a legacy (version 0) footer.
    pub const VERSION_0_ENCODED_LENGTH: usize = 2 * BlockHandle::MAX_ENCODED_LENGTH + 8;

    /// Encoded length of a current (version >= 1) footer.
    pub const NEW_VERSIONS_ENCODED_LENGTH: usize =
        1 + 2 * BlockHandle::MAX_ENCODED_LENGTH + 4 + 8;

    /// Shortest tail worth inspecting; also the longest possible footer.
    pub const MIN_ENCODED_LENGTH: usize = Self::NEW_VERSIONS_ENCODED_LENGTH;
    pub const MAX_ENCODED_LENGTH: usize = Self::NEW_VERSIONS_ENCODED_LENGTH;

    /// Create a footer for writing. Legacy magic numbers require
    /// `version == 0`; the checksum type defaults to CRC32C.
    pub fn new(table_magic_number: u64, version: u32) -> Self {
        debug_assert!(
            !is_legacy_footer_format(table_magic_number) || version == 0,
            "legacy table magic requires footer version 0"
        );
        Footer {
            version,
            checksum: ChecksumType::Crc32c as u8,
            metaindex_handle: BlockHandle::default(),
            index_handle: BlockHandle::default(),
            table_magic_number,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// The checksum tag exactly as stored on disk.
    pub fn checksum_raw(&self) -> u8 {
        self.checksum
    }

    /// The checksum type, if the stored tag names a known one.
    pub fn checksum(&self) -> Option<ChecksumType> {
        ChecksumType::from_raw(self.checksum as u32)
    }

    pub fn set_checksum(&mut self, checksum: ChecksumType) {
        self.checksum = checksum as u8;
    }

    pub fn metaindex_handle(&self) -> &BlockHandle {
        &self.metaindex_handle
    }

    pub fn index_handle(&self) -> &BlockHandle {
        &self.index_handle
    }

    pub fn set_metaindex_handle(&mut self, handle: BlockHandle) {
        self.metaindex_handle = handle;
    }

    pub fn set_index_handle(&mut self, handle: BlockHandle) {
        self.index_handle = handle;
    }

    pub fn table_magic_number(&self) -> u64 {
        self.table_magic_number
    }

    fn is_legacy(&self) -> bool {
        is_legacy_footer_format(self.table_magic_number)
    }

    /// Append the encoded footer: exactly 48 bytes for a legacy magic,
    /// 53 bytes otherwise.
    pub fn encode_to(&self, dst: &mut Vec<u8>) {
        let original_size = dst.len();
        if self.is_legacy() {
            // Legacy footers predate configurable checksums.
            debug_assert_eq!(self.checksum, ChecksumType::Crc32c as u8);
            self.metaindex_handle.encode_to(dst);
            self.index_handle.encode_to(dst);
            dst.resize(original_size + 2 * BlockHandle::MAX_ENCODED_LENGTH, 0);
            put_fixed32(dst, (self.table_magic_number & 0xffff_ffff) as u32);
            put_fixed32(dst, (self.table_magic_number >> 32) as u32);
            debug_assert_eq!(dst.len(), original_size + Self::VERSION_0_ENCODED_LENGTH);
        } else {
            dst.push(self.checksum);
            self.metaindex_handle.encode_to(dst);
            self.index_handle.encode_to(dst);
            dst.resize(original_size + Self::NEW_VERSIONS_ENCODED_LENGTH - 12, 0);
            put_fixed32(dst, self.version);
            put_fixed32(dst, (self.table_magic_number & 0xffff_ffff) as u32);
            put_fixed32(dst, (self.table_magic_number >> 32) as u32);
            debug_assert_eq!(dst.len(), original_size + Self::NEW_VERSIONS_ENCODED_LENGTH);
        }
    }

    /// Decode the footer at the end of `input` and consume the input.
    ///
    /// `input` must be the true tail of the file: the last byte of the slice
    /// is the last byte of the magic number. Legacy magics are upconverted
    /// in place; an unrecognized magic is allowed through (callers that want
    /// to reject foreign files do so via [`read_footer_from_file`]).
    pub fn decode_from(input: &mut &[u8]) -> Result<Footer> {
        if input.len() < Self::MIN_ENCODED_LENGTH {
            return Err(Status::corruption("input is too short to be an sstable"));
        }

        let magic_offset = input.len() - MAGIC_NUMBER_LENGTH;
        let magic_lo = decode_fixed32(&input[magic_offset..]);
        let magic_hi = decode_fixed32(&input[magic_offset + 4..]);
        let mut magic = ((magic_hi as u64) << 32) | magic_lo as u64;

        let legacy = is_legacy_footer_format(magic);
        if legacy {
            magic = upconvert_legacy_footer_format(magic);
        }

        let (version, checksum, mut cursor) = if legacy {
            let footer = &input[input.len() - Self::VERSION_0_ENCODED_LENGTH..];
            (0u32, ChecksumType::Crc32c as u8, footer)
        } else {
            let version = decode_fixed32(&input[input.len() - 12..]);
            let mut footer = &input[input.len() - Self::NEW_VERSIONS_ENCODED_LENGTH..];
            let checksum = match get_varint32(&mut footer) {
                Some(value) => value as u8,
                None => return Err(Status::corruption("bad checksum type")),
            };
            (version, checksum, footer)
        };

        let metaindex_handle = BlockHandle::decode_from(&mut cursor)?;
        let index_handle = BlockHandle::decode_from(&mut cursor)?;

        // Skip the padding and the magic; the whole tail has been consumed.
        *input = &input[input.len()..];

        Ok(Footer {
            version,
            checksum,
            metaindex_handle,
            index_handle,
            table_magic_number: magic,
        })
    }
}

impl fmt::Display for Footer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_legacy() {
            writeln!(f, "metaindex handle: {}", self.metaindex_handle)?;
            writeln!(f, "index handle: {}", self.index_handle)?;
            writeln!(f, "table_magic_number: {}", self.table_magic_number)
        } else {
            writeln!(f, "checksum: {}", self.checksum)?;
            writeln!(f, "metaindex handle: {}", self.metaindex_handle)?;
            writeln!(f, "index handle: {}", self.index_handle)?;
            writeln!(f, "footer version: {}", self.version)?;
            writeln!(f, "table_magic_number: {}", self.table_magic_number)
        }
    }
}

fn decode_footer_tail(
    tail: &[u8],
    enforce_table_magic_number: u64,
) -> Result<Footer> {
    if tail.len() < Footer::MIN_ENCODED_LENGTH {
        return Err(Status::corruption("file is too short to be an sstable"));
    }

    let mut cursor = tail;
    let footer = Footer::decode_from(&mut cursor)?;

    if enforce_table_magic_number != 0
        && enforce_table_magic_number != footer.table_magic_number()
    {
        return Err(Status::corruption("Bad table magic number"));
    }
    Ok(footer)
}

/// Read and decode the footer of a table file.
///
/// Pass a non-zero `enforce_table_magic_number` to reject files of a
/// different table family with `Corruption("Bad table magic number")`.
pub fn read_footer_from_file<F>(
    file: &F,
    file_size: u64,
    enforce_table_magic_number: u64,
) -> Result<Footer>
where
    F: RandomAccessFile + ?Sized,
{
    let read_offset = file_size.saturating_sub(Footer::MAX_ENCODED_LENGTH as u64);
    let want = file_size.min(Footer::MAX_ENCODED_LENGTH as u64) as usize;

    let mut scratch = [0u8; Footer::MAX_ENCODED_LENGTH];
    let slice = file.read_at(read_offset, want, &mut scratch)?;
    let tail = match slice {
        ReadSlice::Scratch(n) => &scratch[..n],
        ReadSlice::View(view) => view,
    };

    decode_footer_tail(tail, enforce_table_magic_number)
}

/// Asynchronous form of [`read_footer_from_file`]. Statuses produced after
/// the positional read carry the async-completion bit.
pub async fn read_footer_from_file_async<F>(
    file: &F,
    file_size: u64,
    enforce_table_magic_number: u64,
) -> Result<Footer>
where
    F: RandomAccessFile + ?Sized,
{
    let read_offset = file_size.saturating_sub(Footer::MAX_ENCODED_LENGTH as u64);
    let want = file_size.min(Footer::MAX_ENCODED_LENGTH as u64) as usize;

    let mut scratch = [0u8; Footer::MAX_ENCODED_LENGTH];
    let slice = file
        .read_at_async(read_offset, want, &mut scratch)
        .await
        .map_err(Status::into_async)?;
    let tail = match slice {
        ReadSlice::Scratch(n) => &scratch[..n],
        ReadSlice::View(view) => view,
    };

    decode_footer_tail(tail, enforce_table_magic_number).map_err(Status::into_async)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;
    use bytes::Bytes;

    // ---------------------------------------------------------------
    // Block handle
    // ---------------------------------------------------------------

    #[test]
    fn test_handle_roundtrip() {
        let cases = [
            (0u64, 0u64),
            (1, 1),
            (4096, 128),
            (u64::MAX - 1, u64::MAX - 1),
            (1 << 40, 1 << 33),
        ];
        for (offset, size) in cases {
            let handle = BlockHandle::new(offset, size);
            let mut buf = Vec::new();
            handle.encode_to(&mut buf);
            assert!(buf.len() <= BlockHandle::MAX_ENCODED_LENGTH);

            let mut cursor = buf.as_slice();
            let decoded = BlockHandle::decode_from(&mut cursor).unwrap();
            assert_eq!(decoded, handle);
            assert!(cursor.is_empty(), "decode must consume exactly the handle");
        }
    }

    #[test]
    fn test_handle_decode_failure() {
        // A lone continuation byte is not a valid varint
        let mut cursor: &[u8] = &[0x80];
        let err = BlockHandle::decode_from(&mut cursor).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.message(), Some("bad block handle"));

        // Offset decodes but size is missing
        let mut buf = Vec::new();
        blockhouse_core::varint::put_varint64(&mut buf, 42);
        let mut cursor = buf.as_slice();
        let err = BlockHandle::decode_from(&mut cursor).unwrap_err();
        assert_eq!(err.message(), Some("bad block handle"));
    }

    #[test]
    fn test_handle_sentinels() {
        assert!(BlockHandle::NULL.is_null());
        assert!(BlockHandle::NULL.is_initialized());
        assert!(!BlockHandle::default().is_initialized());
        assert!(BlockHandle::new(8, 0).is_initialized());
    }

    // ---------------------------------------------------------------
    // Footer encode/decode
    // ---------------------------------------------------------------

    fn sample_footer(magic: u64, version: u32) -> Footer {
        let mut footer = Footer::new(magic, version);
        footer.set_metaindex_handle(BlockHandle::new(300, 1400));
        footer.set_index_handle(BlockHandle::new(1705, 99));
        footer
    }

    #[test]
    fn test_footer_roundtrip_current() {
        let mut footer = sample_footer(BLOCK_BASED_TABLE_MAGIC_NUMBER, 1);
        footer.set_checksum(ChecksumType::XxHash);

        let mut encoded = Vec::new();
        footer.encode_to(&mut encoded);
        assert_eq!(encoded.len(), Footer::NEW_VERSIONS_ENCODED_LENGTH);

        let mut cursor = encoded.as_slice();
        let decoded = Footer::decode_from(&mut cursor).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(decoded, footer);
        assert_eq!(decoded.checksum(), Some(ChecksumType::XxHash));
    }

    #[test]
    fn test_footer_roundtrip_legacy() {
        let footer = sample_footer(LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER, 0);

        let mut encoded = Vec::new();
        footer.encode_to(&mut encoded);
        assert_eq!(encoded.len(), Footer::VERSION_0_ENCODED_LENGTH);

        // The decoder needs a 53-byte tail; pad the front the way a real
        // file precedes its footer with block data.
        let mut file_tail = vec![0xAA; 16];
        file_tail.extend_from_slice(&encoded);

        let mut cursor = file_tail.as_slice();
        let decoded = Footer::decode_from(&mut cursor).unwrap();

        // Legacy upconversion: current magic, version 0, CRC32C
        assert_eq!(decoded.table_magic_number(), BLOCK_BASED_TABLE_MAGIC_NUMBER);
        assert_eq!(decoded.version(), 0);
        assert_eq!(decoded.checksum(), Some(ChecksumType::Crc32c));
        assert_eq!(*decoded.metaindex_handle(), BlockHandle::new(300, 1400));
        assert_eq!(*decoded.index_handle(), BlockHandle::new(1705, 99));
    }

    #[test]
    fn test_footer_roundtrip_legacy_plain_table() {
        let footer = sample_footer(LEGACY_PLAIN_TABLE_MAGIC_NUMBER, 0);
        let mut encoded = vec![0u8; 8];
        footer.encode_to(&mut encoded);

        let mut cursor = encoded.as_slice();
        let decoded = Footer::decode_from(&mut cursor).unwrap();
        assert_eq!(decoded.table_magic_number(), PLAIN_TABLE_MAGIC_NUMBER);
    }

    #[test]
    fn test_footer_decode_short_input() {
        let input = vec![0u8; Footer::MIN_ENCODED_LENGTH - 1];
        let mut cursor = input.as_slice();
        let err = Footer::decode_from(&mut cursor).unwrap_err();
        assert_eq!(err.message(), Some("input is too short to be an sstable"));
    }

    #[test]
    fn test_footer_decode_bad_checksum_type() {
        // All-continuation bytes: the checksum varint32 never terminates.
        let mut encoded = vec![0xFF; Footer::NEW_VERSIONS_ENCODED_LENGTH - 12];
        put_fixed32(&mut encoded, 1); // version
        put_fixed32(&mut encoded, (BLOCK_BASED_TABLE_MAGIC_NUMBER & 0xffff_ffff) as u32);
        put_fixed32(&mut encoded, (BLOCK_BASED_TABLE_MAGIC_NUMBER >> 32) as u32);

        let mut cursor = encoded.as_slice();
        let err = Footer::decode_from(&mut cursor).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.message(), Some("bad checksum type"));
    }

    #[test]
    fn test_footer_decode_bad_handle() {
        // Valid checksum byte, then an endless varint where the metaindex
        // handle should be.
        let mut encoded = vec![0xFF; Footer::NEW_VERSIONS_ENCODED_LENGTH - 12];
        encoded[0] = ChecksumType::Crc32c as u8;
        put_fixed32(&mut encoded, 1); // version
        put_fixed32(&mut encoded, (BLOCK_BASED_TABLE_MAGIC_NUMBER & 0xffff_ffff) as u32);
        put_fixed32(&mut encoded, (BLOCK_BASED_TABLE_MAGIC_NUMBER >> 32) as u32);

        let mut cursor = encoded.as_slice();
        let err = Footer::decode_from(&mut cursor).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.message(), Some("bad block handle"));
    }

    #[test]
    fn test_footer_unknown_magic_is_allowed() {
        // Decoding does not enforce the table family; only
        // read_footer_from_file does, when asked.
        let footer = sample_footer(0x1234_5678_9abc_def0, 3);
        let mut encoded = Vec::new();
        footer.encode_to(&mut encoded);

        let decoded = Footer::decode_from(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.table_magic_number(), 0x1234_5678_9abc_def0);
    }

    #[test]
    fn test_footer_checksum_read_as_varint() {
        // Encode writes a literal byte; decode reads a varint32. For tags
        // below 128 the bytes coincide - prove it for the largest one.
        let mut encoded = Vec::new();
        encoded.push(0x7F);
        BlockHandle::new(1, 2).encode_to(&mut encoded);
        BlockHandle::new(3, 4).encode_to(&mut encoded);
        encoded.resize(Footer::NEW_VERSIONS_ENCODED_LENGTH - 12, 0);
        put_fixed32(&mut encoded, 2); // version
        put_fixed32(&mut encoded, (BLOCK_BASED_TABLE_MAGIC_NUMBER & 0xffff_ffff) as u32);
        put_fixed32(&mut encoded, (BLOCK_BASED_TABLE_MAGIC_NUMBER >> 32) as u32);

        let decoded = Footer::decode_from(&mut encoded.as_slice()).unwrap();
        assert_eq!(decoded.checksum_raw(), 0x7F);
        assert_eq!(decoded.checksum(), None); // unknown kind, preserved raw
        assert_eq!(decoded.version(), 2);
    }

    #[test]
    fn test_footer_display() {
        let footer = sample_footer(BLOCK_BASED_TABLE_MAGIC_NUMBER, 1);
        let text = footer.to_string();
        assert!(text.contains("checksum: 1"));
        assert!(text.contains("footer version: 1"));
        assert!(text.contains("index handle: "));

        // Legacy footers have no checksum or version lines
        let legacy = sample_footer(LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER, 0);
        let text = legacy.to_string();
        assert!(!text.contains("footer version"));
        assert!(!text.contains("checksum"));
        assert!(text.contains("metaindex handle: "));
    }

    // ---------------------------------------------------------------
    // read_footer_from_file
    // ---------------------------------------------------------------

    fn file_with_footer(magic: u64, version: u32) -> MemoryFile {
        let footer = sample_footer(magic, version);
        let mut data = vec![0u8; 100]; // stand-in for block data
        footer.encode_to(&mut data);
        MemoryFile::new(Bytes::from(data))
    }

    #[test]
    fn test_read_footer_from_file() {
        let file = file_with_footer(BLOCK_BASED_TABLE_MAGIC_NUMBER, 2);
        let footer = read_footer_from_file(&file, file.len() as u64, 0).unwrap();
        assert_eq!(footer.version(), 2);
        assert_eq!(*footer.index_handle(), BlockHandle::new(1705, 99));
    }

    #[test]
    fn test_read_footer_too_short_file() {
        let file = MemoryFile::new(Bytes::from(vec![0u8; 52]));
        let err = read_footer_from_file(&file, 52, 0).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.message(), Some("file is too short to be an sstable"));
    }

    #[test]
    fn test_read_footer_enforces_magic() {
        let file = file_with_footer(PLAIN_TABLE_MAGIC_NUMBER, 1);
        let err = read_footer_from_file(&file, file.len() as u64, BLOCK_BASED_TABLE_MAGIC_NUMBER)
            .unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(err.message(), Some("Bad table magic number"));

        // The legacy form of the right family upconverts and then passes.
        let file = file_with_footer(LEGACY_BLOCK_BASED_TABLE_MAGIC_NUMBER, 0);
        let footer =
            read_footer_from_file(&file, file.len() as u64, BLOCK_BASED_TABLE_MAGIC_NUMBER)
                .unwrap();
        assert_eq!(footer.version(), 0);
    }

    // ---------------------------------------------------------------
    // Compression tags
    // ---------------------------------------------------------------

    #[test]
    fn test_compression_tag_roundtrip() {
        for t in [
            CompressionType::None,
            CompressionType::Snappy,
            CompressionType::Zlib,
            CompressionType::Bzip2,
            CompressionType::Lz4,
            CompressionType::Lz4hc,
            CompressionType::Xpress,
            CompressionType::Zstd,
            CompressionType::ZstdNotFinal,
        ] {
            assert_eq!(CompressionType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(CompressionType::from_tag(0x77), None);
    }
}
