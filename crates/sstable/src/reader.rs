use cache::BoundedLruCache;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::format::{
    read_block, read_footer, read_index_block, table_file_name, BlockHandle, BLOCK_TRAILER_LEN,
};
use crate::{Block, Comparator, Decompressor, Key, KeyFilter, Result, TableError};

/// Decoded blocks shared by every table file of one database, keyed by
/// `(file number, block handle)`.
pub type BlockCache = BoundedLruCache<(u64, BlockHandle), Arc<Block>>;

/// One live table file as recorded in the MANIFEST.
///
/// The identity fields never change. The file handle and index block exist
/// only while the file is open: [`open`](TableFile::open) loads the footer
/// and index, [`close`](TableFile::close) drops them, and the file may be
/// reopened later. Data blocks are read through the shared [`BlockCache`].
#[derive(Debug)]
pub struct TableFile {
    level: u32,
    number: u64,
    file_size: u64,
    smallest: Key,
    largest: Key,
    state: FileState,
}

enum FileState {
    Closed,
    Open(OpenTable),
}

/// Resources held while a table file is open.
struct OpenTable {
    file: File,
    /// Actual length on disk, used to bounds-check block handles.
    file_len: u64,
    index: Arc<Block>,
    cache: Arc<BlockCache>,
    decompressor: Arc<dyn Decompressor>,
}

impl std::fmt::Debug for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileState::Closed => f.write_str("Closed"),
            FileState::Open(open) => f
                .debug_struct("Open")
                .field("file_len", &open.file_len)
                .field("index_entries", &open.index.len())
                .finish(),
        }
    }
}

impl TableFile {
    /// Creates a closed table file.
    #[must_use]
    pub fn new(level: u32, number: u64, file_size: u64, smallest: Key, largest: Key) -> Self {
        Self {
            level,
            number,
            file_size,
            smallest,
            largest,
            state: FileState::Closed,
        }
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// File size as recorded in the MANIFEST.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    #[must_use]
    pub fn smallest(&self) -> &Key {
        &self.smallest
    }

    #[must_use]
    pub fn largest(&self) -> &Key {
        &self.largest
    }

    #[must_use]
    pub fn file_name(&self) -> String {
        table_file_name(self.number)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, FileState::Open(_))
    }

    /// Whether `key` lies within `[smallest, largest]` (by user key).
    pub fn covers<C: Comparator + ?Sized>(&self, key: &[u8], cmp: &C) -> bool {
        cmp.compare(key, self.smallest.user_key()) != Ordering::Less
            && cmp.compare(key, self.largest.user_key()) != Ordering::Greater
    }

    /// Whether the file's key range intersects `filter`'s range.
    pub fn overlaps<F: KeyFilter + ?Sized>(&self, filter: &F) -> bool {
        filter.compare(self.smallest.user_key()) != Ordering::Less
            && filter.compare(self.largest.user_key()) != Ordering::Greater
    }

    /// Opens `dir/NNNNNN.ldb`, decodes its footer and loads the index block.
    ///
    /// The index block is read directly, not through `cache`; `cache` and
    /// `decompressor` are retained for data block loads. Does nothing if the
    /// file is already open.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, too small, has a bad magic,
    /// or its index block cannot be decoded.
    pub fn open(
        &mut self,
        dir: &Path,
        cache: &Arc<BlockCache>,
        decompressor: &Arc<dyn Decompressor>,
    ) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let path = dir.join(self.file_name());
        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();

        let footer = read_footer(&mut file)?;
        check_bounds(footer.index_handle, file_len)?;
        let index = read_index_block(&mut file, footer.index_handle, decompressor.as_ref())?;

        debug!(
            number = self.number,
            level = self.level,
            index_entries = index.len(),
            "opened table file"
        );

        self.state = FileState::Open(OpenTable {
            file,
            file_len,
            index: Arc::new(index),
            cache: Arc::clone(cache),
            decompressor: Arc::clone(decompressor),
        });
        Ok(())
    }

    /// Releases the file handle and the index block. Idempotent.
    pub fn close(&mut self) {
        if let FileState::Open(_) = std::mem::replace(&mut self.state, FileState::Closed) {
            debug!(number = self.number, "closed table file");
        }
    }

    /// Finds the data block that may hold `key`.
    ///
    /// Returns `None` if the index is empty or `key` sorts after every
    /// separator.
    pub fn resolve<C: Comparator + ?Sized>(
        &self,
        key: &[u8],
        cmp: &C,
    ) -> Result<Option<BlockHandle>> {
        let open = self.open_state()?;
        open.index
            .lookup_ceiling(key, cmp)
            .map(BlockHandle::decode_from)
            .transpose()
    }

    /// Returns the decoded block at `handle`, from the cache or from disk.
    ///
    /// Blocks read from disk are inserted into the shared cache.
    pub fn load_block(&self, handle: BlockHandle) -> Result<Arc<Block>> {
        let open = self.open_state()?;
        let cache_key = (self.number, handle);

        if let Some(block) = open.cache.get(&cache_key) {
            trace!(number = self.number, %handle, "block cache hit");
            return Ok(block);
        }
        trace!(number = self.number, %handle, "block cache miss");

        check_bounds(handle, open.file_len)?;
        let mut f = &open.file;
        let block = Arc::new(read_block(&mut f, handle, open.decompressor.as_ref())?);
        open.cache.put(cache_key, Arc::clone(&block));
        Ok(block)
    }

    /// Point lookup for a single user key.
    pub fn get<C: Comparator + ?Sized>(&self, key: &[u8], cmp: &C) -> Result<Option<Vec<u8>>> {
        match self.resolve(key, cmp)? {
            Some(handle) => Ok(self
                .load_block(handle)?
                .lookup_exact(key, cmp)
                .map(<[u8]>::to_vec)),
            None => Ok(None),
        }
    }

    pub fn contains_key<C: Comparator + ?Sized>(&self, key: &[u8], cmp: &C) -> Result<bool> {
        match self.resolve(key, cmp)? {
            Some(handle) => Ok(self.load_block(handle)?.contains(key, cmp)),
            None => Ok(false),
        }
    }

    /// Lazily yields every live entry, in index order then key order.
    pub fn iter(&self) -> Result<FileIter<'_>> {
        Ok(FileIter {
            file: self,
            cursor: EntryCursor::new(self)?,
            filter: None,
            done: false,
        })
    }

    /// Lazily yields the entries inside `filter`'s range.
    ///
    /// Data blocks whose separator sorts before the range are skipped, and
    /// the scan ends after the first block whose separator lies past it.
    pub fn filter<'a, F: KeyFilter + ?Sized>(
        &'a self,
        filter: &'a F,
    ) -> Result<FileIter<'a, F>> {
        Ok(FileIter {
            file: self,
            cursor: EntryCursor::new(self)?,
            filter: Some(filter),
            done: false,
        })
    }

    fn open_state(&self) -> Result<&OpenTable> {
        match &self.state {
            FileState::Open(open) => Ok(open),
            FileState::Closed => Err(TableError::NotOpen {
                number: self.number,
            }),
        }
    }
}

fn check_bounds(handle: BlockHandle, file_len: u64) -> Result<()> {
    let end = handle
        .offset
        .checked_add(handle.size)
        .and_then(|e| e.checked_add(BLOCK_TRAILER_LEN as u64));
    match end {
        Some(end) if end <= file_len => Ok(()),
        _ => Err(TableError::BlockOutOfBounds {
            offset: handle.offset,
            size: handle.size,
            file_len,
        }),
    }
}

/// Position of a scan within one table file.
///
/// Holds the index block by `Arc` and the current block's remaining entries
/// by value rather than by borrow, so a caller that owns the files mutably
/// can drive a cursor against one file while opening or closing others.
#[derive(Debug)]
pub struct EntryCursor {
    index: Arc<Block>,
    index_pos: usize,
    started: bool,
    /// Entries of the current data block not yet yielded.
    pending: VecDeque<(Vec<u8>, Vec<u8>)>,
    /// Set once a block reaching past the filter's range has been loaded.
    last_block: bool,
}

impl EntryCursor {
    /// Starts a scan at the first index entry of an open file.
    pub fn new(file: &TableFile) -> Result<Self> {
        Ok(Self {
            index: Arc::clone(&file.open_state()?.index),
            index_pos: 0,
            started: false,
            pending: VecDeque::new(),
            last_block: false,
        })
    }

    /// Advances to the next entry of `file`, optionally restricted to
    /// `filter`'s range. `file` and `filter` must be the same on every call.
    pub fn next_entry<F: KeyFilter + ?Sized>(
        &mut self,
        file: &TableFile,
        filter: Option<&F>,
    ) -> Option<Result<(Vec<u8>, Vec<u8>)>> {
        if !self.started {
            self.started = true;
            if let Some(f) = filter {
                // Separators before the range form a prefix of the index.
                self.index_pos = self.index.len() - self.index.filter(f).count();
            }
        }

        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }
            if self.last_block {
                return None;
            }

            let (separator, encoded) = self.index.entry(self.index_pos)?;
            self.index_pos += 1;
            if filter.is_some_and(|f| f.compare(separator) == Ordering::Less) {
                self.last_block = true;
            }

            let block = match BlockHandle::decode_from(encoded).and_then(|h| file.load_block(h)) {
                Ok(block) => block,
                Err(e) => return Some(Err(e)),
            };
            self.pending = match filter {
                Some(f) => block.matching(f).map(owned).collect(),
                None => block.iter().map(owned).collect(),
            };
        }
    }
}

fn owned((key, value): (&[u8], &[u8])) -> (Vec<u8>, Vec<u8>) {
    (key.to_vec(), value.to_vec())
}

/// Iterator over the entries of one open table file.
///
/// Stops after the first error.
pub struct FileIter<'a, F: KeyFilter + ?Sized = dyn KeyFilter> {
    file: &'a TableFile,
    cursor: EntryCursor,
    filter: Option<&'a F>,
    done: bool,
}

impl<'a, F: KeyFilter + ?Sized> Iterator for FileIter<'a, F> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.cursor.next_entry(self.file, self.filter);
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}
