use crate::{Result, TableError};

/// Decodes compressed block contents.
pub trait Decompressor: Send + Sync {
    /// Decompresses `buf[start..start + len]` into a fresh buffer.
    fn decompress(&self, buf: &[u8], start: usize, len: usize) -> Result<Vec<u8>>;
}

/// Raw (unframed) snappy, compression type `1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnappyDecompressor;

impl Decompressor for SnappyDecompressor {
    fn decompress(&self, buf: &[u8], start: usize, len: usize) -> Result<Vec<u8>> {
        let src = start
            .checked_add(len)
            .and_then(|end| buf.get(start..end))
            .ok_or_else(|| TableError::Decompress("range outside buffer".to_string()))?;
        snap::raw::Decoder::new()
            .decompress_vec(src)
            .map_err(|e| TableError::Decompress(e.to_string()))
    }
}
