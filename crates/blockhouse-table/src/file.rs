//! Positional File Access
//!
//! The read pipeline needs exactly one capability from the environment: a
//! positional read. [`RandomAccessFile`] captures that contract, in a
//! synchronous and an asynchronous form, without committing to a filesystem
//! or I/O model.
//!
//! ## Scratch or View
//! A reader may satisfy a request two ways:
//!
//! - **fill the caller's scratch buffer** and report how many bytes landed
//!   there ([`ReadSlice::Scratch`]), or
//! - **hand back a zero-copy view** into its own storage - an mmap, a page
//!   cache, a fully buffered file ([`ReadSlice::View`]). The view stays
//!   valid until the next operation on the reader.
//!
//! The pipeline uses the distinction to decide whether returned block
//! contents can borrow (a view outlives the read) or must be copied out (the
//! scratch buffer goes back to the caller).
//!
//! ## Short Reads
//! Reads that cross the end of the file return the available prefix; the
//! pipeline turns short block reads into `Corruption("truncated block
//! read")`. Backends signal real failures through `Status` (`IoError`,
//! `TimedOut`, `ShutdownInProgress`, ...), which the pipeline propagates
//! without retrying.

use async_trait::async_trait;
use blockhouse_core::status::{Result, Status};
use bytes::Bytes;

/// Where the bytes of a positional read ended up.
#[derive(Debug, Clone, Copy)]
pub enum ReadSlice<'a> {
    /// The read filled the caller's scratch buffer with this many bytes.
    Scratch(usize),
    /// Zero-copy view into the reader's own storage, valid until the next
    /// operation on the reader.
    View(&'a [u8]),
}

impl<'a> ReadSlice<'a> {
    /// Length of the returned data.
    pub fn len(&self) -> usize {
        match self {
            ReadSlice::Scratch(n) => *n,
            ReadSlice::View(view) => view.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Minimal positional-read capability consumed by the read pipeline.
#[async_trait]
pub trait RandomAccessFile: Send + Sync {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// `scratch` must be at least `len` bytes. The returned slice either
    /// reports bytes placed in `scratch` or is a view into the reader's own
    /// storage.
    fn read_at<'f>(&'f self, offset: u64, len: usize, scratch: &mut [u8])
        -> Result<ReadSlice<'f>>;

    /// Asynchronous form of [`RandomAccessFile::read_at`].
    ///
    /// The default implementation completes synchronously; backends with a
    /// real asynchronous path override it. The pipeline treats the await
    /// point as its only suspension point.
    async fn read_at_async<'f>(
        &'f self,
        offset: u64,
        len: usize,
        scratch: &mut [u8],
    ) -> Result<ReadSlice<'f>> {
        self.read_at(offset, len, scratch)
    }
}

/// A table file held entirely in memory.
///
/// This is the reference reader: engines that mmap their tables or buffer
/// them whole (downloaded objects, cache files) wrap the bytes in a
/// `MemoryFile` and get zero-copy block reads for free.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Bytes,
}

impl MemoryFile {
    pub fn new(data: Bytes) -> Self {
        MemoryFile { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl RandomAccessFile for MemoryFile {
    fn read_at<'f>(
        &'f self,
        offset: u64,
        len: usize,
        _scratch: &mut [u8],
    ) -> Result<ReadSlice<'f>> {
        if offset > self.data.len() as u64 {
            return Err(Status::io_error("read past end of file"));
        }
        let start = offset as usize;
        let end = self.data.len().min(start + len);
        Ok(ReadSlice::View(&self.data[start..end]))
    }
}
