//! Internal keys and the reusable buffer used to rebuild them during block
//! decoding.

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

use crate::{Result, TableError};

/// Capacity of a [`KeyBuffer`]. Keys reconstructed from a block may not
/// exceed it.
pub const MAX_KEY_BYTES: usize = 128;

/// Largest sequence number that fits the 56-bit trailer field.
pub const MAX_SEQUENCE: u64 = (1 << 56) - 1;

/// Operation recorded by an internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Deletion = 0,
    Value = 1,
}

/// A parsed internal key: user key, sequence number and operation.
///
/// On disk the user key is followed by an 8-byte little-endian trailer
/// holding `sequence << 8 | type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    user_key: Vec<u8>,
    sequence: u64,
    kind: ValueType,
}

impl Key {
    #[must_use]
    pub fn new(user_key: impl Into<Vec<u8>>, sequence: u64, kind: ValueType) -> Self {
        Self {
            user_key: user_key.into(),
            sequence,
            kind,
        }
    }

    /// Splits an encoded internal key into its parts.
    ///
    /// # Errors
    ///
    /// [`TableError::BadInternalKey`] if `internal` is shorter than the
    /// trailer or the type byte is neither deletion nor value.
    pub fn decode(internal: &[u8]) -> Result<Self> {
        let n = internal.len();
        if n < 8 {
            return Err(TableError::BadInternalKey);
        }
        let trailer = LittleEndian::read_u64(&internal[n - 8..]);
        let kind = match trailer & 0xff {
            0 => ValueType::Deletion,
            1 => ValueType::Value,
            _ => return Err(TableError::BadInternalKey),
        };
        Ok(Self {
            user_key: internal[..n - 8].to_vec(),
            sequence: trailer >> 8,
            kind,
        })
    }

    #[must_use]
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    #[must_use]
    pub fn into_user_key(self) -> Vec<u8> {
        self.user_key
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn kind(&self) -> ValueType {
        self.kind
    }

    #[must_use]
    pub fn is_deletion(&self) -> bool {
        self.kind == ValueType::Deletion
    }

    /// Encodes the key back into internal form.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.user_key.clone();
        coding::encode::put_fixed64(&mut out, (self.sequence << 8) | self.kind as u64);
        out
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.user_key))
    }
}

/// Fixed-capacity scratch buffer holding the key currently being rebuilt
/// from shared-prefix entries.
///
/// Each entry keeps `shared` bytes of the previous key ([`truncate`]) and
/// adds its own suffix ([`append`]).
///
/// [`truncate`]: KeyBuffer::truncate
/// [`append`]: KeyBuffer::append
pub struct KeyBuffer {
    bytes: [u8; MAX_KEY_BYTES],
    len: usize,
}

impl KeyBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: [0u8; MAX_KEY_BYTES],
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Keeps only the first `len` bytes. Never grows the key.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    /// Extends the key with `suffix`.
    ///
    /// # Errors
    ///
    /// [`TableError::KeyTooLong`] if the result would exceed
    /// [`MAX_KEY_BYTES`]; the buffer is left unchanged.
    pub fn append(&mut self, suffix: &[u8]) -> Result<()> {
        let end = self.len + suffix.len();
        if end > MAX_KEY_BYTES {
            return Err(TableError::KeyTooLong { len: end });
        }
        self.bytes[self.len..end].copy_from_slice(suffix);
        self.len = end;
        Ok(())
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Default for KeyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBuffer")
            .field("key", &self.as_slice())
            .finish()
    }
}
