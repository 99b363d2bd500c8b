use crate::*;
use anyhow::Result;
use sstable::{Decompressor, SnappyDecompressor, StartsWith, TableError};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use tempfile::tempdir;

use super::helpers::{write_sample_db, write_three_file_db};

fn pairs(entries: &[(&str, &str)]) -> Vec<(Vec<u8>, Vec<u8>)> {
    entries
        .iter()
        .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
        .collect()
}

// -------------------- Point lookups --------------------

#[test]
fn sample_database_lookups() -> Result<()> {
    let dir = tempdir()?;
    write_sample_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    assert_eq!(table.try_get(b"b")?, Some(b"1".to_vec()));
    assert_eq!(table.try_get(b"m")?, Some(b"2".to_vec()));
    assert_eq!(table.try_get(b"c")?, None);
    assert_eq!(table.try_get(b"zz")?, None);
    assert_eq!(table.try_get(b"a")?, None);

    assert!(table.contains_key(b"b")?);
    assert!(!table.contains_key(b"c")?);
    assert!(!table.contains_key(b"zz")?);
    Ok(())
}

#[test]
fn lookup_leaves_file_open() -> Result<()> {
    let dir = tempdir()?;
    write_sample_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    // Outside every range: nothing is opened.
    table.try_get(b"zz")?;
    assert!(!table.version_set().files()[0].is_open());

    table.try_get(b"b")?;
    assert!(table.version_set().files()[0].is_open());

    table.close_all();
    assert!(!table.version_set().files()[0].is_open());
    assert_eq!(table.try_get(b"b")?, Some(b"1".to_vec()));
    Ok(())
}

#[test]
fn lookups_route_to_covering_file() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    assert_eq!(table.try_get(b"apple")?, Some(b"1".to_vec()));
    assert_eq!(table.try_get(b"kiwi")?, Some(b"5".to_vec()));
    assert_eq!(table.try_get(b"peach")?, Some(b"9".to_vec()));
    assert_eq!(table.try_get(b"cherry")?, None);
    assert_eq!(table.try_get(b"mango")?, None);

    let open: Vec<bool> = table.version_set().files().iter().map(|f| f.is_open()).collect();
    assert_eq!(open, vec![true, true, true]);
    Ok(())
}

#[test]
fn missing_table_file_surfaces_on_lookup() -> Result<()> {
    let dir = tempdir()?;
    write_sample_db(dir.path())?;
    std::fs::remove_file(dir.path().join("000002.ldb"))?;

    let mut table = Table::open(dir.path())?;
    let err = table.try_get(b"b").unwrap_err();
    assert!(matches!(err, Error::Table(TableError::Io(_))));
    Ok(())
}

// -------------------- Enumeration --------------------

#[test]
fn sample_database_enumeration() -> Result<()> {
    let dir = tempdir()?;
    write_sample_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    let entries = table.iter().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(entries, pairs(&[("b", "1"), ("m", "2")]));
    Ok(())
}

#[test]
fn enumeration_follows_manifest_order() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    let keys = table.keys().collect::<Result<Vec<_>, _>>()?;
    let expected: Vec<Vec<u8>> = [
        "apple", "banana", "fig", "grape", "kiwi", "lemon", "nectarine", "orange", "peach",
    ]
    .iter()
    .map(|k| k.as_bytes().to_vec())
    .collect();
    assert_eq!(keys, expected);

    let values = table.values().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(values.len(), 9);
    assert_eq!(values[0], b"1");
    assert_eq!(values[8], b"9");
    Ok(())
}

#[test]
fn enumeration_closes_files_by_default() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    assert_eq!(table.iter().count(), 9);
    assert!(table.version_set().files().iter().all(|f| !f.is_open()));
    Ok(())
}

#[test]
fn enumeration_can_keep_files_open() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let opts = Options::default().with_close_after_scan(false);
    let mut table = Table::open_with(dir.path(), &opts)?;

    assert_eq!(table.iter().count(), 9);
    assert!(table.version_set().files().iter().all(|f| f.is_open()));
    Ok(())
}

#[test]
fn partial_enumeration_is_lazy() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    let first = table.iter().next().transpose()?;
    assert_eq!(first, Some((b"apple".to_vec(), b"1".to_vec())));

    let files = table.version_set().files();
    assert!(files[0].is_open());
    assert!(!files[1].is_open());
    assert!(!files[2].is_open());
    Ok(())
}

#[test]
fn empty_database_enumerates_nothing() -> Result<()> {
    let dir = tempdir()?;
    super::helpers::write_manifest(dir.path(), &[])?;
    let mut table = Table::open(dir.path())?;
    assert_eq!(table.iter().count(), 0);
    assert_eq!(table.try_get(b"a")?, None);
    Ok(())
}

#[test]
fn enumeration_stops_at_first_error() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    std::fs::remove_file(dir.path().join("000006.ldb"))?;
    let mut table = Table::open(dir.path())?;

    let results: Vec<_> = table.iter().collect();
    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(|r| r.is_ok()));
    assert!(matches!(results[3], Err(Error::Table(TableError::Io(_)))));
    Ok(())
}

// -------------------- Filtering --------------------

#[test]
fn prefix_filter_within_one_file() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    let prefix = StartsWith::new("b");
    let hits = table.filter(&prefix).collect::<Result<Vec<_>, _>>()?;
    assert_eq!(hits, pairs(&[("banana", "2")]));
    Ok(())
}

#[test]
fn filter_skips_files_outside_range() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    let prefix = StartsWith::new("o");
    let hits = table.filter(&prefix).collect::<Result<Vec<_>, _>>()?;
    assert_eq!(hits, pairs(&[("orange", "8")]));

    let open: Vec<bool> = table.version_set().files().iter().map(|f| f.is_open()).collect();
    assert_eq!(open, vec![false, false, true]);
    Ok(())
}

#[test]
fn closure_range_filter_spans_files() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    // ["fig", "kiwi"]
    let range = |k: &[u8]| {
        if k < &b"fig"[..] {
            Ordering::Greater
        } else if k > &b"kiwi"[..] {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    };
    let keys: Vec<Vec<u8>> = table
        .filter(&range)
        .map(|e| e.map(|(k, _)| k))
        .collect::<Result<_, _>>()?;
    assert_eq!(keys, vec![b"fig".to_vec(), b"grape".to_vec(), b"kiwi".to_vec()]);
    Ok(())
}

#[test]
fn filter_with_no_matches() -> Result<()> {
    let dir = tempdir()?;
    write_sample_db(dir.path())?;
    let mut table = Table::open(dir.path())?;
    assert_eq!(table.filter(&StartsWith::new("q")).count(), 0);
    Ok(())
}

// -------------------- Cache and codec --------------------

#[test]
fn blocks_are_served_from_cache() -> Result<()> {
    let dir = tempdir()?;
    write_sample_db(dir.path())?;
    let mut table = Table::open(dir.path())?;

    assert!(table.block_cache().is_empty());
    table.try_get(b"b")?;
    assert_eq!(table.block_cache().len(), 1);
    table.try_get(b"m")?;
    assert_eq!(table.block_cache().len(), 1);

    table.clear_cache();
    assert!(table.block_cache().is_empty());
    assert_eq!(table.try_get(b"m")?, Some(b"2".to_vec()));
    Ok(())
}

#[test]
fn cache_capacity_bounds_decoded_blocks() -> Result<()> {
    let dir = tempdir()?;
    write_three_file_db(dir.path())?;
    let opts = Options::default().with_block_cache_capacity(2);
    let mut table = Table::open_with(dir.path(), &opts)?;

    assert_eq!(table.iter().count(), 9);
    assert!(table.block_cache().len() <= 2);
    Ok(())
}

/// Counts calls before delegating to snappy.
struct CountingDecompressor {
    calls: AtomicUsize,
}

impl Decompressor for CountingDecompressor {
    fn decompress(&self, buf: &[u8], start: usize, len: usize) -> sstable::Result<Vec<u8>> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        SnappyDecompressor.decompress(buf, start, len)
    }
}

#[test]
fn custom_decompressor_handles_snappy_blocks() -> Result<()> {
    let dir = tempdir()?;
    let mut builder =
        sstable::TableBuilder::new().with_compression(sstable::CompressionType::Snappy);
    let value = "x".repeat(500);
    builder.add(b"k", 1, sstable::ValueType::Value, value.as_bytes());
    builder.write_to(dir.path().join(sstable::table_file_name(3)))?;
    super::helpers::write_manifest(
        dir.path(),
        &[super::helpers::EditBuilder::new()
            .new_file(0, 3, b"a", b"z")
            .build()],
    )?;

    let mut table = Table::open(dir.path())?;
    let counting = Arc::new(CountingDecompressor {
        calls: AtomicUsize::new(0),
    });
    table.set_decompressor(counting.clone());

    assert_eq!(table.try_get(b"k")?, Some(value.into_bytes()));
    assert_eq!(counting.calls.load(AtomicOrdering::SeqCst), 1);
    Ok(())
}
