use crate::{CodingError, Result};

/// A cursor over a borrowed byte buffer.
///
/// A view is `(buffer, offset, length)`. It owns nothing, so any number of
/// views may alias the same buffer. The view is `Copy`: decode steps take it
/// by `&mut` and move its window forward, and a caller that wants to keep a
/// position simply copies the view first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteView<'a> {
    buf: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> ByteView<'a> {
    /// A view covering the whole of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            len: buf.len(),
        }
    }

    /// A view over `buf[offset..offset + len]`, clamped to the buffer bounds.
    #[must_use]
    pub fn with_range(buf: &'a [u8], offset: usize, len: usize) -> Self {
        let offset = offset.min(buf.len());
        let len = len.min(buf.len() - offset);
        Self { buf, offset, len }
    }

    /// Absolute offset of the view's first byte within the underlying buffer.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of bytes remaining in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The underlying buffer, independent of the view's window.
    #[must_use]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// The bytes currently inside the window.
    #[must_use]
    pub fn as_slice(&self) -> &'a [u8] {
        &self.buf[self.offset..self.offset + self.len]
    }

    /// Copies the window into an owned vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Returns the byte at `index` relative to the window, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.as_slice().get(index).copied()
    }

    /// A sub-view of `len` bytes starting `offset` bytes into this window.
    ///
    /// # Errors
    ///
    /// Returns [`CodingError::Truncated`] if the range does not fit.
    pub fn sub(&self, offset: usize, len: usize) -> Result<ByteView<'a>> {
        let end = offset.checked_add(len).unwrap_or(usize::MAX);
        if end > self.len {
            return Err(CodingError::Truncated {
                needed: end,
                remaining: self.len,
            });
        }
        Ok(Self {
            buf: self.buf,
            offset: self.offset + offset,
            len,
        })
    }

    /// A sub-view from `offset` bytes into this window up to its end.
    ///
    /// # Errors
    ///
    /// Returns [`CodingError::Truncated`] if `offset` is past the end.
    pub fn tail(&self, offset: usize) -> Result<ByteView<'a>> {
        if offset > self.len {
            return Err(CodingError::Truncated {
                needed: offset,
                remaining: self.len,
            });
        }
        self.sub(offset, self.len - offset)
    }

    /// Drops `n` bytes from the front of the window.
    ///
    /// # Errors
    ///
    /// Returns [`CodingError::Truncated`] if fewer than `n` bytes remain.
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Consumes a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodingError::Truncated`] on an empty view.
    pub fn read_byte(&mut self) -> Result<u8> {
        let b = self.read_bytes(1)?;
        Ok(b[0])
    }

    /// Consumes `n` bytes, returning them as a slice of the underlying buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CodingError::Truncated`] if fewer than `n` bytes remain; the
    /// view is left untouched in that case.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.len {
            return Err(CodingError::Truncated {
                needed: n,
                remaining: self.len,
            });
        }
        let out = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        self.len -= n;
        Ok(out)
    }
}
