use super::encode::*;
use super::*;
use anyhow::Result;
use proptest::prelude::*;

// -------------------- ByteView --------------------

#[test]
fn read_bytes_advances_cursor() -> Result<()> {
    let data = b"abcdef";
    let mut view = ByteView::new(data);
    assert_eq!(view.read_bytes(2)?, b"ab");
    assert_eq!(view.offset(), 2);
    assert_eq!(view.len(), 4);
    assert_eq!(view.read_byte()?, b'c');
    assert_eq!(view.as_slice(), b"def");
    Ok(())
}

#[test]
fn read_past_end_is_truncated_and_leaves_view_intact() {
    let data = [1u8, 2, 3];
    let mut view = ByteView::new(&data);
    let err = view.read_bytes(4).unwrap_err();
    assert_eq!(
        err,
        CodingError::Truncated {
            needed: 4,
            remaining: 3
        }
    );
    assert_eq!(view.len(), 3);

    let mut empty = ByteView::new(&[]);
    assert!(empty.read_byte().is_err());
}

#[test]
fn sub_views_alias_the_same_buffer() -> Result<()> {
    let data = b"0123456789";
    let view = ByteView::new(data);
    let mid = view.sub(3, 4)?;
    assert_eq!(mid.as_slice(), b"3456");
    assert_eq!(mid.offset(), 3);

    let inner = mid.sub(1, 2)?;
    assert_eq!(inner.as_slice(), b"45");
    assert_eq!(inner.offset(), 4);

    assert_eq!(mid.tail(2)?.as_slice(), b"56");
    assert!(mid.sub(2, 3).is_err());
    assert!(mid.tail(5).is_err());
    Ok(())
}

#[test]
fn with_range_clamps_to_buffer() {
    let data = b"xyz";
    assert_eq!(ByteView::with_range(data, 1, 100).as_slice(), b"yz");
    assert!(ByteView::with_range(data, 10, 2).is_empty());
}

// -------------------- Fixed-width --------------------

#[test]
fn fixed_width_is_little_endian() -> Result<()> {
    let data = [0x78, 0x56, 0x34, 0x12, 1, 0, 0, 0, 0, 0, 0, 0x80];
    let mut view = ByteView::new(&data);
    assert_eq!(decode_fixed32(&mut view)?, 0x1234_5678);
    assert_eq!(decode_fixed64(&mut view)?, 0x8000_0000_0000_0001);
    assert!(view.is_empty());
    Ok(())
}

#[test]
fn fixed_on_short_buffer_is_truncated() {
    let data = [1u8, 2, 3];
    let mut view = ByteView::new(&data);
    assert!(matches!(
        decode_fixed32(&mut view),
        Err(CodingError::Truncated { .. })
    ));
}

// -------------------- Varint --------------------

#[test]
fn varint_known_encodings() -> Result<()> {
    let data = [0x00, 0x7f, 0xac, 0x02, 0xff, 0xff, 0xff, 0xff, 0x0f];
    let mut view = ByteView::new(&data);
    assert_eq!(decode_varint32(&mut view)?, 0);
    assert_eq!(decode_varint32(&mut view)?, 127);
    assert_eq!(decode_varint32(&mut view)?, 300);
    assert_eq!(decode_varint32(&mut view)?, u32::MAX);
    assert!(view.is_empty());
    Ok(())
}

#[test]
fn varint32_without_terminator_is_malformed() {
    let data = [0x80u8; 6];
    let mut view = ByteView::new(&data);
    assert_eq!(
        decode_varint32(&mut view),
        Err(CodingError::MalformedVarint { bits: 32 })
    );
}

#[test]
fn varint64_without_terminator_is_malformed() {
    let data = [0xffu8; 11];
    let mut view = ByteView::new(&data);
    assert_eq!(
        decode_varint64(&mut view),
        Err(CodingError::MalformedVarint { bits: 64 })
    );
}

#[test]
fn varint_running_out_of_bytes_is_malformed() {
    let data = [0x80u8, 0x80];
    let mut view = ByteView::new(&data);
    assert!(matches!(
        decode_varint64(&mut view),
        Err(CodingError::MalformedVarint { .. })
    ));
}

// -------------------- Length-prefixed --------------------

#[test]
fn length_prefixed_reads_exact_payload() -> Result<()> {
    let mut buf = Vec::new();
    put_length_prefixed(&mut buf, b"leveldb.BytewiseComparator");
    buf.push(0xaa);

    let mut view = ByteView::new(&buf);
    assert_eq!(decode_length_prefixed(&mut view)?, b"leveldb.BytewiseComparator");
    assert_eq!(view.as_slice(), &[0xaa]);
    Ok(())
}

#[test]
fn length_prefixed_longer_than_buffer_is_truncated() {
    let data = [5u8, b'a', b'b'];
    let mut view = ByteView::new(&data);
    assert!(matches!(
        decode_length_prefixed(&mut view),
        Err(CodingError::Truncated {
            needed: 5,
            remaining: 2
        })
    ));
}

#[test]
fn varint_length_matches_encoder() {
    for v in [0u64, 127, 128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX] {
        let mut buf = Vec::new();
        put_varint64(&mut buf, v);
        assert_eq!(buf.len(), varint_length(v));
    }
    assert_eq!(varint_length(u64::MAX), MAX_VARINT64_BYTES);
}

// -------------------- Round trips --------------------

proptest! {
    #[test]
    fn varint32_roundtrip(v in any::<u32>()) {
        let mut buf = Vec::new();
        put_varint32(&mut buf, v);
        let mut view = ByteView::new(&buf);
        prop_assert_eq!(decode_varint32(&mut view).unwrap(), v);
        prop_assert!(view.is_empty());
    }

    #[test]
    fn varint64_roundtrip(v in any::<u64>()) {
        let mut buf = Vec::new();
        put_varint64(&mut buf, v);
        let mut view = ByteView::new(&buf);
        prop_assert_eq!(decode_varint64(&mut view).unwrap(), v);
        prop_assert!(view.is_empty());
    }

    #[test]
    fn fixed_roundtrip(a in any::<u32>(), b in any::<u64>()) {
        let mut buf = Vec::new();
        put_fixed32(&mut buf, a);
        put_fixed64(&mut buf, b);
        let mut view = ByteView::new(&buf);
        prop_assert_eq!(decode_fixed32(&mut view).unwrap(), a);
        prop_assert_eq!(decode_fixed64(&mut view).unwrap(), b);
    }
}
