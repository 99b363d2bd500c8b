//! # WAL - log record framing
//!
//! Reads the block-framed log format shared by the write-ahead log and the
//! MANIFEST. The table reader only ever consumes MANIFEST files through it.
//!
//! ## Physical layout
//!
//! The file is a sequence of 32 KiB blocks. Each block holds one or more
//! fragments; a block tail too short for a fragment header is zero padding.
//!
//! ```text
//! [checksum: u32 LE][length: u16 LE][type: u8][payload: length bytes]
//! ```
//!
//! | Type | Name   | Meaning                                   |
//! |------|--------|-------------------------------------------|
//! | 0    | ZERO   | preallocated space, end of stream         |
//! | 1    | FULL   | a whole logical record                    |
//! | 2    | FIRST  | first fragment of a logical record        |
//! | 3    | MIDDLE | interior fragment                         |
//! | 4    | LAST   | final fragment, completes the record      |
//!
//! The checksum field is carried but not verified.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::LogReader;
//!
//! let mut r = LogReader::open("MANIFEST-000001").unwrap();
//! r.replay(|record| -> Result<(), wal::LogError> {
//!     println!("{} byte record", record.len());
//!     Ok(())
//! }).unwrap();
//! ```

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;
use tracing::trace;

#[cfg(any(test, feature = "test-util"))]
mod writer;
#[cfg(any(test, feature = "test-util"))]
pub use writer::LogWriter;

/// Size of one physical block.
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Fragment header: checksum (4) + length (2) + type (1).
pub const HEADER_SIZE: usize = 4 + 2 + 1;

/// Physical fragment kinds. Type `0` is not a variant: it ends the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FragmentType {
    Full = 1,
    First = 2,
    Middle = 3,
    Last = 4,
}

impl FragmentType {
    /// Maps a type tag to a fragment kind. `0` and unknown tags yield `None`.
    #[must_use]
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Full),
            2 => Some(Self::First),
            3 => Some(Self::Middle),
            4 => Some(Self::Last),
            _ => None,
        }
    }

    /// Whether consuming this fragment completes a logical record.
    #[must_use]
    pub fn completes_record(self) -> bool {
        matches!(self, Self::Full | Self::Last)
    }
}

/// Errors that can occur while reading a log.
#[derive(Debug, Error)]
pub enum LogError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A fragment header announced more payload than its block holds.
    #[error("truncated fragment: length {length}, {remaining} bytes left in block")]
    TruncatedFragment { length: usize, remaining: usize },

    /// A fragment carried a type tag outside 0..=4.
    #[error("unknown fragment type {0}")]
    UnknownFragmentType(u8),
}

/// Sequential reader reassembling physical fragments into logical records.
///
/// Generic over any `Read` implementor, so tests can feed it an in-memory
/// `Cursor`. Records are returned as owned byte vectors; the accumulation
/// buffer starts fresh after each one.
pub struct LogReader<R: Read> {
    rdr: R,
    /// Current physical block.
    block: Vec<u8>,
    /// Bytes of `block` actually read from the source.
    filled: usize,
    /// Read position within `block`.
    pos: usize,
    /// The source returned a short read; `block` is the last one.
    eof: bool,
    /// A zero-type fragment, end of source, or error was reached.
    done: bool,
    /// Payload accumulated for the record in progress.
    record: Vec<u8>,
}

impl LogReader<File> {
    /// Opens a log file for sequential reading.
    ///
    /// Returns `LogError::Io` if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<LogReader<File>, LogError> {
        let f = File::open(path)?;
        Ok(LogReader::from_reader(f))
    }
}

impl<R: Read> LogReader<R> {
    /// Constructs a reader from any `Read` implementor.
    pub fn from_reader(reader: R) -> Self {
        LogReader {
            rdr: reader,
            block: vec![0u8; BLOCK_SIZE],
            filled: 0,
            pos: 0,
            eof: false,
            done: false,
            record: Vec::new(),
        }
    }

    /// Returns the next complete logical record, or `None` at end of stream.
    ///
    /// A record still being accumulated when the stream ends is discarded,
    /// including one whose last fragment is cut short by the end of the
    /// source.
    ///
    /// # Errors
    ///
    /// - **Fragment longer than a full block** -> `LogError::TruncatedFragment`.
    /// - **Type tag above 4** -> `LogError::UnknownFragmentType`.
    /// - **I/O error** -> `LogError::Io`.
    pub fn next_record(&mut self) -> Result<Option<Vec<u8>>, LogError> {
        loop {
            if self.done {
                return Ok(None);
            }

            // Not enough room for a header: block trailer or exhausted block.
            if self.filled - self.pos < HEADER_SIZE {
                if self.eof {
                    self.finish();
                    return Ok(None);
                }
                self.fill_block()?;
                continue;
            }

            let header = &self.block[self.pos..self.pos + HEADER_SIZE];
            let length = LittleEndian::read_u16(&header[4..6]) as usize;
            let tag = header[6];
            self.pos += HEADER_SIZE;

            if tag == 0 {
                self.finish();
                return Ok(None);
            }

            let remaining = self.filled - self.pos;
            if length > remaining {
                // A short last block means the final write was torn.
                if self.eof {
                    self.finish();
                    return Ok(None);
                }
                self.done = true;
                return Err(LogError::TruncatedFragment { length, remaining });
            }

            let kind = match FragmentType::from_u8(tag) {
                Some(kind) => kind,
                None => {
                    self.done = true;
                    return Err(LogError::UnknownFragmentType(tag));
                }
            };
            trace!(?kind, length, "log fragment");

            self.record
                .extend_from_slice(&self.block[self.pos..self.pos + length]);
            self.pos += length;

            if kind.completes_record() {
                return Ok(Some(std::mem::take(&mut self.record)));
            }
        }
    }

    /// Feeds every logical record to `apply`, stopping at the first error
    /// from either the log or the callback.
    pub fn replay<F, E>(&mut self, mut apply: F) -> Result<(), E>
    where
        F: FnMut(Vec<u8>) -> Result<(), E>,
        E: From<LogError>,
    {
        while let Some(record) = self.next_record()? {
            apply(record)?;
        }
        Ok(())
    }

    /// Reads the next physical block, short only at end of source.
    fn fill_block(&mut self) -> Result<(), LogError> {
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.rdr.read(&mut self.block[filled..]) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Err(LogError::Io(e));
                }
            }
        }
        self.filled = filled;
        self.pos = 0;
        Ok(())
    }

    fn finish(&mut self) {
        if !self.record.is_empty() {
            trace!(len = self.record.len(), "dropping incomplete log record");
            self.record.clear();
        }
        self.done = true;
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = Result<Vec<u8>, LogError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
