//! Reference trace decoding.
//!
//! Traces are flat streams of fixed 24-byte little-endian records:
//!
//! ```text
//! offset 0  : pc     u64
//! offset 8  : vaddr  u64
//! offset 16 : size   u32
//! offset 20 : read   u32   (nonzero = read, zero = write)
//! ```
//!
//! The layout is bit-compatible with pre-existing binary traces; there is
//! no padding. A truncated record at end of file is reported once as
//! [`TraceError::PartialRecord`] and then the stream ends — the tail is
//! skipped, not fatal.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::common::error::TraceError;

/// Size of one trace record in bytes.
pub const RECORD_BYTES: usize = 24;

/// One decoded memory reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRef {
    /// Program counter of the referencing instruction.
    pub pc: u64,
    /// Effective virtual address.
    pub vaddr: u64,
    /// Access size in bytes (informational).
    pub size: u32,
    /// Whether the access is a store.
    pub is_write: bool,
}

impl MemRef {
    /// Decodes one record. The trace's `read` flag inverts into `is_write`.
    fn decode(buf: &[u8; RECORD_BYTES]) -> Self {
        let pc = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let vaddr = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let size = u32::from_le_bytes(buf[16..20].try_into().unwrap());
        let read = u32::from_le_bytes(buf[20..24].try_into().unwrap());
        Self {
            pc,
            vaddr,
            size,
            is_write: read == 0,
        }
    }
}

/// Iterator over the records of a trace stream.
pub struct TraceReader<R: Read> {
    reader: R,
    done: bool,
}

impl TraceReader<BufReader<File>> {
    /// Opens a trace file with a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Io`] when the file cannot be opened.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraceError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> TraceReader<R> {
    /// Wraps any byte source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<MemRef, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = [0u8; RECORD_BYTES];
        let mut filled = 0;
        while filled < RECORD_BYTES {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(TraceError::Io(e)));
                }
            }
        }

        if filled == 0 {
            self.done = true;
            return None;
        }
        if filled < RECORD_BYTES {
            self.done = true;
            return Some(Err(TraceError::PartialRecord { bytes: filled }));
        }
        Some(Ok(MemRef::decode(&buf)))
    }
}
