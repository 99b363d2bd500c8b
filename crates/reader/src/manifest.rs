/// # Manifest - version edit folding
///
/// The MANIFEST is a log (see the `wal` crate for the framing) whose records
/// are version edits. Each edit is a run of tagged fields:
///
/// ```text
/// tag (varint32) | field ... | tag (varint32) | field ... | ...
/// ```
///
/// | Tag | Field              | Encoding                                        |
/// |-----|--------------------|-------------------------------------------------|
/// | 1   | comparator name    | length-prefixed bytes                           |
/// | 2   | log number         | varint64                                        |
/// | 3   | next file number   | varint64                                        |
/// | 4   | last sequence      | varint64                                        |
/// | 5   | compact pointer    | varint32 level, length-prefixed key (ignored)   |
/// | 6   | deleted file       | varint32 level, varint64 number (ignored)       |
/// | 7   | new file           | varint32 level, varint64 number, varint64 size, |
/// |     |                    | length-prefixed smallest, largest internal keys |
/// | 9   | previous log number| varint64                                        |
///
/// Edits are folded in order into a single [`VersionSet`]. Scalar fields keep
/// the last value seen; new files are appended and never removed.
use coding::{decode_length_prefixed, decode_varint32, decode_varint64, ByteView};
use sstable::{Key, TableFile};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Comparator = 1,
    LogNumber = 2,
    NextFileNumber = 3,
    LastSequence = 4,
    CompactPointer = 5,
    DeletedFile = 6,
    NewFile = 7,
    PrevLogNumber = 9,
}

impl Tag {
    fn from_u32(tag: u32) -> Option<Self> {
        Some(match tag {
            1 => Self::Comparator,
            2 => Self::LogNumber,
            3 => Self::NextFileNumber,
            4 => Self::LastSequence,
            5 => Self::CompactPointer,
            6 => Self::DeletedFile,
            7 => Self::NewFile,
            9 => Self::PrevLogNumber,
            _ => return None,
        })
    }
}

/// Global metadata and the live table files recovered from a MANIFEST.
#[derive(Debug, Default)]
pub struct VersionSet {
    comparator: Option<String>,
    log_number: Option<u64>,
    next_file_number: Option<u64>,
    last_sequence: Option<u64>,
    prev_log_number: Option<u64>,
    files: Vec<TableFile>,
}

impl VersionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one version edit into the set.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownTag`] for tags 0, 8 and anything above 9.
    /// - [`Error::Coding`] if a field is truncated or malformed.
    /// - [`Error::Table`] if a new-file key is not a valid internal key.
    ///
    /// Fields decoded before the failing one stay applied.
    pub fn apply(&mut self, record: &[u8]) -> Result<()> {
        let mut view = ByteView::new(record);

        while !view.is_empty() {
            let raw = decode_varint32(&mut view)?;
            let tag = Tag::from_u32(raw).ok_or(Error::UnknownTag(raw))?;

            match tag {
                Tag::Comparator => {
                    let name = decode_length_prefixed(&mut view)?;
                    self.comparator = Some(String::from_utf8_lossy(name).into_owned());
                }
                Tag::LogNumber => self.log_number = Some(decode_varint64(&mut view)?),
                Tag::NextFileNumber => self.next_file_number = Some(decode_varint64(&mut view)?),
                Tag::LastSequence => self.last_sequence = Some(decode_varint64(&mut view)?),
                Tag::PrevLogNumber => self.prev_log_number = Some(decode_varint64(&mut view)?),
                Tag::CompactPointer => {
                    decode_varint32(&mut view)?;
                    decode_length_prefixed(&mut view)?;
                }
                Tag::DeletedFile => {
                    decode_varint32(&mut view)?;
                    decode_varint64(&mut view)?;
                }
                Tag::NewFile => {
                    let level = decode_varint32(&mut view)?;
                    let number = decode_varint64(&mut view)?;
                    let file_size = decode_varint64(&mut view)?;
                    let smallest = Key::decode(decode_length_prefixed(&mut view)?)?;
                    let largest = Key::decode(decode_length_prefixed(&mut view)?)?;
                    self.files
                        .push(TableFile::new(level, number, file_size, smallest, largest));
                }
            }
        }
        Ok(())
    }

    /// Comparator name, if the manifest recorded one.
    #[must_use]
    pub fn comparator(&self) -> Option<&str> {
        self.comparator.as_deref()
    }

    #[must_use]
    pub fn has_comparator(&self) -> bool {
        self.comparator.is_some()
    }

    #[must_use]
    pub fn log_number(&self) -> Option<u64> {
        self.log_number
    }

    #[must_use]
    pub fn next_file_number(&self) -> Option<u64> {
        self.next_file_number
    }

    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    #[must_use]
    pub fn prev_log_number(&self) -> Option<u64> {
        self.prev_log_number
    }

    /// Live table files in the order the manifest added them.
    #[must_use]
    pub fn files(&self) -> &[TableFile] {
        &self.files
    }

    pub fn files_mut(&mut self) -> &mut [TableFile] {
        &mut self.files
    }
}
