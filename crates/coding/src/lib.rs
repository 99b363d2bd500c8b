//! # Coding - byte views and integer decoding
//!
//! Leaf utilities shared by every other crate in the workspace. A
//! [`ByteView`] is a cursor over a borrowed buffer; the decode functions in
//! this crate consume bytes from the front of a view and advance it.
//!
//! ## Encodings
//!
//! ```text
//! fixed32 / fixed64   little-endian, 4 / 8 bytes
//! varint32 / varint64 7 bits per byte, high bit = continuation,
//!                     least significant group first (max 5 / 10 bytes)
//! length-prefixed     varint32 length | raw bytes
//! ```
//!
//! The encoders in [`encode`] exist only for building fixtures; they are
//! compiled for tests and behind the `test-util` feature.

mod codec;
mod view;

#[cfg(any(test, feature = "test-util"))]
pub mod encode;

pub use codec::{
    decode_fixed32, decode_fixed64, decode_length_prefixed, decode_varint32, decode_varint64,
    MAX_VARINT32_BYTES, MAX_VARINT64_BYTES,
};
pub use view::ByteView;

use thiserror::Error;

/// Errors raised while decoding from a [`ByteView`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodingError {
    /// A read asked for more bytes than the view has left.
    #[error("truncated buffer: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// No terminating byte was found within the varint's maximum width.
    #[error("malformed varint{bits}")]
    MalformedVarint { bits: u32 },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodingError>;

#[cfg(test)]
mod tests;
