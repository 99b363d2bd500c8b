use coding::encode::{put_length_prefixed, put_varint32, put_varint64};
use sstable::{table_file_name, Key, TableBuilder, ValueType, BYTEWISE_COMPARATOR_NAME};
use std::fs;
use std::path::Path;
use wal::LogWriter;

pub const MANIFEST: &str = "MANIFEST-000001";

/// Encodes one version edit, field by field.
#[derive(Default)]
pub struct EditBuilder {
    buf: Vec<u8>,
}

impl EditBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comparator(mut self, name: &str) -> Self {
        put_varint32(&mut self.buf, 1);
        put_length_prefixed(&mut self.buf, name.as_bytes());
        self
    }

    pub fn log_number(self, n: u64) -> Self {
        self.tagged_u64(2, n)
    }

    pub fn next_file_number(self, n: u64) -> Self {
        self.tagged_u64(3, n)
    }

    pub fn last_sequence(self, n: u64) -> Self {
        self.tagged_u64(4, n)
    }

    pub fn prev_log_number(self, n: u64) -> Self {
        self.tagged_u64(9, n)
    }

    pub fn compact_pointer(mut self, level: u32, key: &[u8]) -> Self {
        put_varint32(&mut self.buf, 5);
        put_varint32(&mut self.buf, level);
        put_length_prefixed(&mut self.buf, &Key::new(key, 1, ValueType::Value).encode());
        self
    }

    pub fn deleted_file(mut self, level: u32, number: u64) -> Self {
        put_varint32(&mut self.buf, 6);
        put_varint32(&mut self.buf, level);
        put_varint64(&mut self.buf, number);
        self
    }

    pub fn new_file(mut self, level: u32, number: u64, smallest: &[u8], largest: &[u8]) -> Self {
        put_varint32(&mut self.buf, 7);
        put_varint32(&mut self.buf, level);
        put_varint64(&mut self.buf, number);
        put_varint64(&mut self.buf, 1024);
        put_length_prefixed(&mut self.buf, &Key::new(smallest, 1, ValueType::Value).encode());
        put_length_prefixed(&mut self.buf, &Key::new(largest, 1, ValueType::Value).encode());
        self
    }

    /// Appends a bare tag with no payload.
    pub fn raw_tag(mut self, tag: u32) -> Self {
        put_varint32(&mut self.buf, tag);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }

    fn tagged_u64(mut self, tag: u32, n: u64) -> Self {
        put_varint32(&mut self.buf, tag);
        put_varint64(&mut self.buf, n);
        self
    }
}

/// Writes `CURRENT` and a manifest holding `edits`, one record each.
pub fn write_manifest(dir: &Path, edits: &[Vec<u8>]) -> anyhow::Result<()> {
    let mut log = LogWriter::create(dir.join(MANIFEST))?;
    for edit in edits {
        log.add_record(edit)?;
    }
    log.flush()?;
    fs::write(dir.join("CURRENT"), format!("{}\n", MANIFEST))?;
    Ok(())
}

/// Writes table file `number` holding `entries` (sorted by key).
pub fn write_table(
    dir: &Path,
    number: u64,
    entries: &[(&str, ValueType, &str)],
) -> anyhow::Result<()> {
    let mut builder = TableBuilder::new().with_block_size(64);
    for (seq, (key, kind, value)) in entries.iter().enumerate() {
        builder.add(key.as_bytes(), seq as u64 + 1, *kind, value.as_bytes());
    }
    builder.write_to(dir.join(table_file_name(number)))?;
    Ok(())
}

/// The single-file database: `000002.ldb` spans `a..z` and holds `b=1`,
/// `c` (deleted) and `m=2`.
pub fn write_sample_db(dir: &Path) -> anyhow::Result<()> {
    write_table(
        dir,
        2,
        &[
            ("b", ValueType::Value, "1"),
            ("c", ValueType::Deletion, ""),
            ("m", ValueType::Value, "2"),
        ],
    )?;
    write_manifest(
        dir,
        &[EditBuilder::new()
            .comparator(BYTEWISE_COMPARATOR_NAME)
            .log_number(3)
            .next_file_number(4)
            .last_sequence(3)
            .new_file(0, 2, b"a", b"z")
            .build()],
    )
}

/// Three files covering `apple..fig`, `grape..lemon` and `nectarine..peach`.
pub fn write_three_file_db(dir: &Path) -> anyhow::Result<()> {
    write_table(
        dir,
        5,
        &[
            ("apple", ValueType::Value, "1"),
            ("banana", ValueType::Value, "2"),
            ("cherry", ValueType::Deletion, ""),
            ("fig", ValueType::Value, "3"),
        ],
    )?;
    write_table(
        dir,
        6,
        &[
            ("grape", ValueType::Value, "4"),
            ("kiwi", ValueType::Value, "5"),
            ("lemon", ValueType::Value, "6"),
        ],
    )?;
    write_table(
        dir,
        7,
        &[
            ("nectarine", ValueType::Value, "7"),
            ("orange", ValueType::Value, "8"),
            ("peach", ValueType::Value, "9"),
        ],
    )?;
    write_manifest(
        dir,
        &[
            EditBuilder::new()
                .comparator(BYTEWISE_COMPARATOR_NAME)
                .next_file_number(8)
                .build(),
            EditBuilder::new().new_file(1, 5, b"apple", b"fig").build(),
            EditBuilder::new()
                .new_file(1, 6, b"grape", b"lemon")
                .new_file(1, 7, b"nectarine", b"peach")
                .build(),
        ],
    )
}
