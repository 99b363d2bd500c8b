/// Cold-start path: resolve `CURRENT` to a manifest and fold the manifest's
/// version edits into a [`VersionSet`].
use std::fs;
use std::path::Path;
use tracing::debug;
use wal::LogReader;

use crate::{Error, Result, VersionSet};

/// Name of the pointer file naming the active manifest.
pub const CURRENT_FILENAME: &str = "CURRENT";

/// Reads the manifest name from `dir/CURRENT`.
///
/// Only the first line counts; surrounding whitespace is dropped.
///
/// # Errors
///
/// [`Error::Io`] if the file cannot be read, [`Error::InvalidCurrent`] if its
/// first line is blank.
pub fn read_current(dir: &Path) -> Result<String> {
    let contents = fs::read_to_string(dir.join(CURRENT_FILENAME))?;
    contents
        .lines()
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or(Error::InvalidCurrent)
}

/// Replays every record of `dir/<manifest>` into a fresh [`VersionSet`].
///
/// # Errors
///
/// Propagates framing errors from [`LogReader`] and decode errors from
/// [`VersionSet::apply`]; replay stops at the first one.
pub fn load_version_set(dir: &Path, manifest: &str) -> Result<VersionSet> {
    let mut reader = LogReader::open(dir.join(manifest))?;
    let mut versions = VersionSet::new();
    let mut records = 0usize;

    reader.replay(|record| {
        records += 1;
        versions.apply(&record)
    })?;

    debug!(
        manifest,
        records,
        files = versions.files().len(),
        "replayed manifest"
    );
    Ok(versions)
}
