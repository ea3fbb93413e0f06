//! BlockHouse Core Types
//!
//! This crate holds the leaf components of the BlockHouse table format - the
//! pieces everything else is built on:
//!
//! 1. **Varint codec** (`varint`): variable-length and fixed-width integer
//!    encoding used by block handles and footers
//! 2. **Checksums** (`checksum`): CRC32C (with the mask/unmask transform the
//!    on-disk format requires) and XXH32
//! 3. **Status** (`status`): the result value returned by every table
//!    operation, carrying a code, an optional subcode and message, and the
//!    async-completion bit
//!
//! Nothing in this crate touches the filesystem. Higher layers
//! (`blockhouse-table`) combine these primitives into the footer format and
//! the block read pipeline.

pub mod checksum;
pub mod status;
pub mod varint;

pub use checksum::ChecksumType;
pub use status::{Code, Status, SubCode};
