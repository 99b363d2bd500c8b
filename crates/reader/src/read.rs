/// Read path: point lookups and lazy scans across table files.
///
/// Lookups pick the first file in manifest order whose key range covers the
/// key and consult only that file. Scans walk files in manifest order, each
/// file in index order, each block in key order.
use sstable::{BlockCache, Decompressor, EntryCursor, KeyFilter, TableFile};
use std::path::Path;
use std::sync::Arc;

use crate::{Result, Table};

impl Table {
    /// Looks up `key`, returning its value if a covering file holds it.
    ///
    /// Opens the covering file if needed and leaves it open.
    ///
    /// # Errors
    ///
    /// Returns an error if the covering file cannot be opened or one of its
    /// blocks fails to decode.
    pub fn try_get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(i) = self.find_file(key) else {
            return Ok(None);
        };
        let file = &mut self.versions.files_mut()[i];
        file.open(&self.dir, &self.cache, &self.decompressor)?;
        Ok(file.get(key, &self.comparator)?)
    }

    /// Returns `true` if `key` has a live value.
    pub fn contains_key(&mut self, key: &[u8]) -> Result<bool> {
        let Some(i) = self.find_file(key) else {
            return Ok(false);
        };
        let file = &mut self.versions.files_mut()[i];
        file.open(&self.dir, &self.cache, &self.decompressor)?;
        Ok(file.contains_key(key, &self.comparator)?)
    }

    /// Lazily yields every live entry of every file.
    ///
    /// Files are opened in turn and, with
    /// [`Options::close_after_scan`](crate::Options::close_after_scan),
    /// closed again once drained.
    pub fn iter(&mut self) -> Entries<'_> {
        let close_after = self.options.close_after_scan;
        self.entries(None, close_after)
    }

    /// Lazily yields the entries inside `filter`'s range.
    ///
    /// Files whose key range does not intersect the filter are skipped
    /// without being opened. Files opened by the scan stay open.
    pub fn filter<'a, F: KeyFilter + ?Sized>(&'a mut self, filter: &'a F) -> Entries<'a, F> {
        self.entries(Some(filter), false)
    }

    /// Lazily yields every live key.
    pub fn keys(&mut self) -> impl Iterator<Item = Result<Vec<u8>>> + '_ {
        self.iter().map(|entry| entry.map(|(k, _)| k))
    }

    /// Lazily yields every live value.
    pub fn values(&mut self) -> impl Iterator<Item = Result<Vec<u8>>> + '_ {
        self.iter().map(|entry| entry.map(|(_, v)| v))
    }

    fn entries<'a, F: KeyFilter + ?Sized>(
        &'a mut self,
        filter: Option<&'a F>,
        close_after: bool,
    ) -> Entries<'a, F> {
        Entries {
            files: self.versions.files_mut(),
            dir: &self.dir,
            cache: &self.cache,
            decompressor: &self.decompressor,
            filter,
            close_after,
            next_file: 0,
            current: None,
            done: false,
        }
    }

    /// Index of the first file whose range covers `key`.
    fn find_file(&self, key: &[u8]) -> Option<usize> {
        self.versions
            .files()
            .iter()
            .position(|f| f.covers(key, &self.comparator))
    }
}

/// Lazy scan over the table files of a [`Table`].
///
/// Yields `(key, value)` pairs and stops after the first error.
pub struct Entries<'a, F: KeyFilter + ?Sized = dyn KeyFilter> {
    files: &'a mut [TableFile],
    dir: &'a Path,
    cache: &'a Arc<BlockCache>,
    decompressor: &'a Arc<dyn Decompressor>,
    filter: Option<&'a F>,
    close_after: bool,
    next_file: usize,
    /// File being drained, by index into `files`.
    current: Option<(usize, EntryCursor)>,
    done: bool,
}

impl<'a, F: KeyFilter + ?Sized> Entries<'a, F> {
    /// Opens the next file worth scanning, or returns `None` when all files
    /// have been visited.
    fn advance_file(&mut self) -> Option<Result<()>> {
        while self.next_file < self.files.len() {
            let i = self.next_file;
            self.next_file += 1;

            let file = &mut self.files[i];
            if let Some(filter) = self.filter {
                if !file.overlaps(filter) {
                    continue;
                }
            }

            let opened = file
                .open(self.dir, self.cache, self.decompressor)
                .and_then(|()| EntryCursor::new(file));
            return Some(match opened {
                Ok(cursor) => {
                    self.current = Some((i, cursor));
                    Ok(())
                }
                Err(e) => Err(e.into()),
            });
        }
        None
    }
}

impl<'a, F: KeyFilter + ?Sized> Iterator for Entries<'a, F> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some((i, cursor)) = &mut self.current {
                let i = *i;
                match cursor.next_entry(&self.files[i], self.filter) {
                    Some(Ok(entry)) => return Some(Ok(entry)),
                    Some(Err(e)) => {
                        self.done = true;
                        return Some(Err(e.into()));
                    }
                    None => {
                        if self.close_after {
                            self.files[i].close();
                        }
                        self.current = None;
                    }
                }
            }

            match self.advance_file() {
                Some(Ok(())) => continue,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
