use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::{FragmentType, BLOCK_SIZE, HEADER_SIZE};

/// Fragmenting log writer used to build MANIFEST fixtures.
///
/// Splits each record across block boundaries the way the reader expects,
/// zero-padding block tails too short for a header. The checksum field is
/// written as zero since the reader never verifies it.
pub struct LogWriter<W: Write> {
    dst: W,
    /// Bytes already written into the current block.
    block_offset: usize,
}

impl LogWriter<File> {
    /// Creates (or truncates) a log file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> LogWriter<W> {
    pub fn new(dst: W) -> Self {
        Self {
            dst,
            block_offset: 0,
        }
    }

    /// Appends one logical record as one or more fragments.
    pub fn add_record(&mut self, data: &[u8]) -> io::Result<()> {
        let mut left = data;
        let mut begin = true;
        loop {
            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                self.dst.write_all(&[0u8; HEADER_SIZE][..leftover])?;
                self.block_offset = 0;
            }

            let avail = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let len = left.len().min(avail);
            let end = len == left.len();
            let kind = match (begin, end) {
                (true, true) => FragmentType::Full,
                (true, false) => FragmentType::First,
                (false, true) => FragmentType::Last,
                (false, false) => FragmentType::Middle,
            };
            self.emit(kind as u8, &left[..len])?;

            left = &left[len..];
            begin = false;
            if end {
                return Ok(());
            }
        }
    }

    /// Writes a single raw fragment with an arbitrary type tag.
    pub fn emit(&mut self, tag: u8, payload: &[u8]) -> io::Result<()> {
        self.dst.write_u32::<LittleEndian>(0)?;
        self.dst.write_u16::<LittleEndian>(payload.len() as u16)?;
        self.dst.write_u8(tag)?;
        self.dst.write_all(payload)?;
        self.block_offset += HEADER_SIZE + payload.len();
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.dst.flush()
    }

    pub fn into_inner(self) -> W {
        self.dst
    }
}
