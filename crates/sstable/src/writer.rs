use coding::encode::{put_fixed32, put_varint32};
use std::io;
use std::path::Path;

use crate::format::{BlockHandle, CompressionType, Footer};
use crate::key::{Key, ValueType};

/// Default target size for uncompressed data blocks.
const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Keys between restart points in data blocks.
const DEFAULT_RESTART_INTERVAL: usize = 16;

/// Builds one block: prefix-compressed entries followed by a restart array.
///
/// Keys must be added in sorted order.
#[derive(Debug)]
pub struct BlockBuilder {
    buf: Vec<u8>,
    restarts: Vec<u32>,
    restart_interval: usize,
    counter: usize,
    last_key: Vec<u8>,
}

impl BlockBuilder {
    pub fn new(restart_interval: usize) -> Self {
        Self {
            buf: Vec::new(),
            restarts: vec![0],
            restart_interval: restart_interval.max(1),
            counter: 0,
            last_key: Vec::new(),
        }
    }

    /// Appends an entry. `key` is stored as given (normally an internal key).
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        let shared = if self.counter < self.restart_interval {
            self.last_key
                .iter()
                .zip(key)
                .take_while(|(a, b)| a == b)
                .count()
        } else {
            self.restarts.push(self.buf.len() as u32);
            self.counter = 0;
            0
        };

        put_varint32(&mut self.buf, shared as u32);
        put_varint32(&mut self.buf, (key.len() - shared) as u32);
        put_varint32(&mut self.buf, value.len() as u32);
        self.buf.extend_from_slice(&key[shared..]);
        self.buf.extend_from_slice(value);

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.counter += 1;
    }

    /// Appends the restart array and returns the finished contents,
    /// leaving the builder empty.
    pub fn finish(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.buf);
        for &restart in &self.restarts {
            put_fixed32(&mut out, restart);
        }
        put_fixed32(&mut out, self.restarts.len() as u32);

        self.restarts = vec![0];
        self.counter = 0;
        self.last_key.clear();
        out
    }

    /// Size of the block if it were finished now.
    pub fn estimated_size(&self) -> usize {
        self.buf.len() + 4 * (self.restarts.len() + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Builds a complete table file in memory.
///
/// ```text
/// data block* | meta-index block (empty) | index block | footer
/// ```
///
/// Every block gets a 5-byte trailer: compression type plus a zero
/// checksum. Each index separator is the last internal key of its data
/// block, unshortened, so it may carry a deletion type.
#[derive(Debug)]
pub struct TableBuilder {
    out: Vec<u8>,
    data: BlockBuilder,
    index: BlockBuilder,
    block_size: usize,
    compression: CompressionType,
    /// Internal key of the most recent entry.
    last_key: Vec<u8>,
    data_handles: Vec<BlockHandle>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            out: Vec::new(),
            data: BlockBuilder::new(DEFAULT_RESTART_INTERVAL),
            index: BlockBuilder::new(1),
            block_size: DEFAULT_BLOCK_SIZE,
            compression: CompressionType::None,
            last_key: Vec::new(),
            data_handles: Vec::new(),
        }
    }

    /// Sets the target data block size. A size of 1 puts every entry in its
    /// own block.
    #[must_use]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Compresses blocks with snappy when that saves at least 1/8th.
    #[must_use]
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Adds an entry. User keys must arrive in sorted order.
    pub fn add(&mut self, user_key: &[u8], sequence: u64, kind: ValueType, value: &[u8]) {
        let internal = Key::new(user_key, sequence, kind).encode();
        self.data.add(&internal, value);
        self.last_key = internal;

        if self.data.estimated_size() >= self.block_size {
            self.flush_data();
        }
    }

    /// Handles of the data blocks written so far.
    pub fn data_handles(&self) -> &[BlockHandle] {
        &self.data_handles
    }

    /// Writes the remaining blocks and the footer, returning the file bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.flush_data();

        let mut meta = BlockBuilder::new(1);
        let meta_index_handle = self.write_block(&meta.finish(), CompressionType::None);
        let index_contents = self.index.finish();
        let index_handle = self.write_block(&index_contents, CompressionType::None);

        let footer = Footer {
            meta_index_handle,
            index_handle,
        };
        self.out.extend_from_slice(&footer.encode());
        self.out
    }

    /// Finishes the table and writes it to `path`.
    pub fn write_to<P: AsRef<Path>>(self, path: P) -> io::Result<()> {
        std::fs::write(path, self.finish())
    }

    fn flush_data(&mut self) {
        if self.data.is_empty() {
            return;
        }
        let contents = self.data.finish();
        let handle = self.write_block(&contents, self.compression);
        self.data_handles.push(handle);

        let mut encoded = Vec::new();
        handle.encode_to(&mut encoded);
        self.index.add(&self.last_key, &encoded);
    }

    fn write_block(&mut self, contents: &[u8], compression: CompressionType) -> BlockHandle {
        let (body, kind) = match compression {
            CompressionType::Snappy => {
                let worth_it = |c: &Vec<u8>| c.len() < contents.len() - contents.len() / 8;
                match snap::raw::Encoder::new().compress_vec(contents) {
                    Ok(c) if worth_it(&c) => (c, CompressionType::Snappy),
                    _ => (contents.to_vec(), CompressionType::None),
                }
            }
            CompressionType::None => (contents.to_vec(), CompressionType::None),
        };

        let handle = BlockHandle::new(self.out.len() as u64, body.len() as u64);
        self.out.extend_from_slice(&body);
        self.out.push(kind as u8);
        put_fixed32(&mut self.out, 0);
        handle
    }
}
