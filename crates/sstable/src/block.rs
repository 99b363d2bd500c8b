use coding::{decode_fixed32, decode_varint32, ByteView};
use std::cmp::Ordering;

use crate::{Comparator, Key, KeyBuffer, KeyFilter, Result, TableError, ValueType};

/// A decoded table block: parallel, sorted arrays of user keys and values.
///
/// Decoding walks every entry from the first restart point, rebuilding each
/// key from its shared prefix. Only [`ValueType::Value`] entries are kept,
/// so deletions never reach lookups or scans; [`Block::decode_index`] keeps
/// every separator instead. A block is immutable once
/// built and is shared between readers through the block cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
}

impl Block {
    /// Decodes raw (uncompressed) block contents.
    ///
    /// # Errors
    ///
    /// - Too short for its restart array -> [`TableError::BadBlockContents`].
    /// - Shared prefix longer than the previous key, or an entry running
    ///   past the block -> [`TableError::BadEntry`].
    /// - Key over [`crate::MAX_KEY_BYTES`] -> [`TableError::KeyTooLong`].
    /// - Malformed internal key -> [`TableError::BadInternalKey`].
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::parse(data, false)
    }

    /// Decodes an index block.
    ///
    /// Separators are kept whatever their value type: a writer may use a
    /// data block's last internal key, deletion or not, as its separator.
    pub fn decode_index(data: &[u8]) -> Result<Self> {
        Self::parse(data, true)
    }

    fn parse(data: &[u8], keep_deletions: bool) -> Result<Self> {
        if data.len() < 4 {
            return Err(TableError::BadBlockContents);
        }
        let view = ByteView::new(data);

        let num_restarts = decode_fixed32(&mut view.tail(data.len() - 4)?)? as usize;
        let restart_offset = num_restarts
            .checked_add(1)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| data.len().checked_sub(n))
            .ok_or(TableError::BadBlockContents)?;

        // Only the first restart point matters: the whole block is decoded
        // sequentially from there.
        let start = if num_restarts == 0 {
            0
        } else {
            decode_fixed32(&mut view.sub(restart_offset, 4)?)? as usize
        };
        if start > restart_offset {
            return Err(TableError::BadBlockContents);
        }

        let mut p = view.sub(start, restart_offset - start)?;
        let mut key = KeyBuffer::new();
        let mut keys = Vec::new();
        let mut values = Vec::new();

        while !p.is_empty() {
            let (shared, non_shared, value_len) = decode_entry_header(&mut p)?;
            if shared > key.len() || p.len() < non_shared + value_len {
                return Err(TableError::BadEntry);
            }

            key.truncate(shared);
            key.append(p.read_bytes(non_shared)?)?;
            let value = p.read_bytes(value_len)?;

            let parsed = Key::decode(key.as_slice())?;
            if keep_deletions || parsed.kind() == ValueType::Value {
                keys.push(parsed.into_user_key());
                values.push(value.to_vec());
            }
        }

        Ok(Self { keys, values })
    }

    /// Number of live (value-type) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The `i`-th entry in key order.
    #[must_use]
    pub fn entry(&self, i: usize) -> Option<(&[u8], &[u8])> {
        Some((self.keys.get(i)?.as_slice(), self.values.get(i)?.as_slice()))
    }

    /// Returns the value stored under exactly `key`.
    pub fn lookup_exact<C: Comparator + ?Sized>(&self, key: &[u8], cmp: &C) -> Option<&[u8]> {
        self.search(key, cmp)
            .ok()
            .map(|i| self.values[i].as_slice())
    }

    /// Returns the value of the first entry whose key is `>= key`.
    ///
    /// This is how an index block is resolved: each data block is indexed
    /// under a separator at least as large as its last key.
    pub fn lookup_ceiling<C: Comparator + ?Sized>(&self, key: &[u8], cmp: &C) -> Option<&[u8]> {
        let i = self.search(key, cmp).unwrap_or_else(|insert_at| insert_at);
        self.values.get(i).map(Vec::as_slice)
    }

    pub fn contains<C: Comparator + ?Sized>(&self, key: &[u8], cmp: &C) -> bool {
        self.search(key, cmp).is_ok()
    }

    /// All entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> + '_ {
        self.keys
            .iter()
            .zip(&self.values)
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Entries at or past the start of `filter`'s range, in key order.
    pub fn filter<'b, 'f, F: KeyFilter + ?Sized>(
        &'b self,
        filter: &'f F,
    ) -> impl Iterator<Item = (&'b [u8], &'b [u8])> + 'f
    where
        'b: 'f,
    {
        self.iter()
            .filter(move |(k, _)| filter.compare(k) != Ordering::Greater)
    }

    /// Entries inside `filter`'s range, in key order.
    pub fn matching<'b, 'f, F: KeyFilter + ?Sized>(
        &'b self,
        filter: &'f F,
    ) -> impl Iterator<Item = (&'b [u8], &'b [u8])> + 'f
    where
        'b: 'f,
    {
        self.iter()
            .filter(move |(k, _)| filter.compare(k) == Ordering::Equal)
    }

    fn search<C: Comparator + ?Sized>(
        &self,
        key: &[u8],
        cmp: &C,
    ) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|candidate| cmp.compare(candidate, key))
    }
}

/// Reads an entry's `(shared, non_shared, value_len)` header.
///
/// When all three fit in seven bits they are single bytes and decoded
/// directly; otherwise they are read as varint32s.
fn decode_entry_header(p: &mut ByteView<'_>) -> Result<(usize, usize, usize)> {
    let head = p.as_slice();
    if head.len() < 3 {
        return Err(TableError::BadEntry);
    }
    if (head[0] | head[1] | head[2]) < 0x80 {
        let header = (head[0] as usize, head[1] as usize, head[2] as usize);
        p.advance(3)?;
        return Ok(header);
    }

    let shared = decode_varint32(p)? as usize;
    let non_shared = decode_varint32(p)? as usize;
    let value_len = decode_varint32(p)? as usize;
    Ok((shared, non_shared, value_len))
}
