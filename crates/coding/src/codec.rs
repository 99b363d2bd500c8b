//! Stateless decoders. Each one reads from the front of a [`ByteView`] and
//! advances it past the consumed bytes.

use byteorder::{ByteOrder, LittleEndian};

use crate::{ByteView, CodingError, Result};

/// Longest legal encoding of a 32-bit varint.
pub const MAX_VARINT32_BYTES: usize = 5;

/// Longest legal encoding of a 64-bit varint.
pub const MAX_VARINT64_BYTES: usize = 10;

/// Reads a little-endian `u32`.
pub fn decode_fixed32(view: &mut ByteView<'_>) -> Result<u32> {
    let bytes = view.read_bytes(4)?;
    Ok(LittleEndian::read_u32(bytes))
}

/// Reads a little-endian `u64`.
pub fn decode_fixed64(view: &mut ByteView<'_>) -> Result<u64> {
    let bytes = view.read_bytes(8)?;
    Ok(LittleEndian::read_u64(bytes))
}

/// Reads a varint of at most [`MAX_VARINT32_BYTES`] bytes.
pub fn decode_varint32(view: &mut ByteView<'_>) -> Result<u32> {
    decode_varint(view, MAX_VARINT32_BYTES, 32).map(|v| v as u32)
}

/// Reads a varint of at most [`MAX_VARINT64_BYTES`] bytes.
pub fn decode_varint64(view: &mut ByteView<'_>) -> Result<u64> {
    decode_varint(view, MAX_VARINT64_BYTES, 64)
}

/// Reads a varint32 length followed by that many raw bytes.
pub fn decode_length_prefixed<'a>(view: &mut ByteView<'a>) -> Result<&'a [u8]> {
    let len = decode_varint32(view)? as usize;
    view.read_bytes(len)
}

fn decode_varint(view: &mut ByteView<'_>, max_bytes: usize, bits: u32) -> Result<u64> {
    let mut result = 0u64;
    for i in 0..max_bytes {
        // Running dry mid-varint is reported as a malformed varint, not a
        // plain truncation: the terminator is what is missing.
        let byte = view
            .read_byte()
            .map_err(|_| CodingError::MalformedVarint { bits })?;
        result |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(CodingError::MalformedVarint { bits })
}
