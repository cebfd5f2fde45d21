//! Fixtures for writing records out and reading them back.
//!
//! The helpers drive the real engines through associated streams, so a
//! round trip through them exercises the same code paths as an
//! application would.

use csvrw_core::{
    CsvReader, CsvResult, CsvWriter, ReadFlags, ReadOutcome, WriteFlags, DEFAULT_BUFFER_SIZE,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A record as a list of raw field values.
pub type Record = Vec<Vec<u8>>;

/// Settings shared by a write and the read that checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    /// Delimiter the reader splits on.
    pub read_delimiter: char,
    /// Delimiter the writer emits, possibly padded with spaces.
    pub write_delimiter: String,
    /// Record terminator the writer emits.
    pub terminator: String,
    /// Writer buffer capacity.
    pub write_buffer: usize,
    /// Reader buffer capacity.
    pub read_buffer: usize,
    /// Whether a byte-order mark starts the output.
    pub bom: bool,
    /// Whether zero-field records are written and read.
    pub process_empty_records: bool,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            read_delimiter: ',',
            write_delimiter: ",".to_string(),
            terminator: "\n".to_string(),
            write_buffer: DEFAULT_BUFFER_SIZE,
            read_buffer: DEFAULT_BUFFER_SIZE,
            bom: false,
            process_empty_records: false,
        }
    }
}

impl CsvLayout {
    /// Flags for the write side.
    #[must_use]
    pub fn write_flags(&self) -> WriteFlags {
        WriteFlags::none().process_empty_records(self.process_empty_records)
    }

    /// Flags for the read side.
    #[must_use]
    pub fn read_flags(&self) -> ReadFlags {
        ReadFlags::none().process_empty_records(self.process_empty_records)
    }

    fn writer<'s>(&self) -> CsvResult<CsvWriter<'s>> {
        let mut writer = CsvWriter::new();
        writer.set_delimiter(self.write_delimiter.as_str())?;
        writer.set_terminator(self.terminator.as_str())?;
        writer.resize_buffer(self.write_buffer)?;
        Ok(writer)
    }

    fn reader<'s>(&self) -> CsvResult<CsvReader<'s>> {
        let mut reader = CsvReader::new();
        reader.set_delimiter(self.read_delimiter)?;
        reader.resize_buffer(self.read_buffer)?;
        Ok(reader)
    }
}

/// Writes `records` with `layout` and returns the produced bytes.
///
/// # Errors
///
/// Returns the first engine error.
pub fn write_to_vec(records: &[Record], layout: &CsvLayout) -> CsvResult<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut writer = layout.writer()?;
        writer.associate(&mut out, layout.write_flags())?;
        if layout.bom {
            writer.write_utf8_bom()?;
        }
        for record in records {
            writer.write_record(record, true)?;
        }
        writer.close()?;
    }
    Ok(out)
}

/// Reads every record of `bytes` sequentially.
///
/// # Errors
///
/// Returns the first engine error.
pub fn read_from_slice(bytes: &[u8], layout: &CsvLayout) -> CsvResult<Vec<Record>> {
    read_with_flags(bytes, layout, layout.read_flags())
}

/// Reads every record of `bytes` sequentially with explicit flags.
///
/// # Errors
///
/// Returns the first engine error.
pub fn read_with_flags(bytes: &[u8], layout: &CsvLayout, flags: ReadFlags) -> CsvResult<Vec<Record>> {
    let mut source = Cursor::new(bytes);
    let mut reader = layout.reader()?;
    reader.associate(&mut source, flags)?;
    let mut records = Vec::new();
    while reader.read_record()?.is_record() {
        records.push(reader.fields().to_vec());
    }
    reader.close()?;
    Ok(records)
}

/// Reads record `record` (1-based) of `bytes`, or `None` past the end.
///
/// # Errors
///
/// Returns the first engine error.
pub fn read_record_from_slice(
    bytes: &[u8],
    layout: &CsvLayout,
    record: u64,
) -> CsvResult<Option<Record>> {
    let mut source = Cursor::new(bytes);
    let mut reader = layout.reader()?;
    reader.associate(&mut source, layout.read_flags())?;
    let outcome = reader.read_record_at(record)?;
    Ok(match outcome {
        ReadOutcome::Record => Some(reader.fields().to_vec()),
        ReadOutcome::Exhausted => None,
    })
}

/// Builds a record from string fields.
#[must_use]
pub fn record(fields: &[&str]) -> Record {
    fields.iter().map(|field| field.as_bytes().to_vec()).collect()
}

/// A CSV file in a temporary directory, removed on drop.
pub struct TempCsv {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TempCsv {
    /// Creates an empty temporary location. The file itself does not exist
    /// until something writes it.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.csv");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Creates a temporary file holding `bytes`.
    pub fn with_bytes(bytes: &[u8]) -> Self {
        let csv = Self::new();
        std::fs::write(&csv.path, bytes).expect("Failed to write temp file");
        csv
    }

    /// Creates a temporary file holding `records` written with `layout`.
    pub fn with_records(records: &[Record], layout: &CsvLayout) -> Self {
        let bytes = write_to_vec(records, layout).expect("Failed to encode records");
        Self::with_bytes(&bytes)
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current file contents.
    pub fn contents(&self) -> Vec<u8> {
        std::fs::read(&self.path).expect("Failed to read temp file")
    }
}

impl Default for TempCsv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_output() {
        let records = vec![record(&["a", "b"]), record(&["c\"d"])];
        let bytes = write_to_vec(&records, &CsvLayout::default()).unwrap();
        assert_eq!(bytes, b"\"a\",\"b\"\n\"c\"\"d\"\n");
        assert_eq!(read_from_slice(&bytes, &CsvLayout::default()).unwrap(), records);
    }

    #[test]
    fn padded_layout_round_trips() {
        let layout = CsvLayout {
            read_delimiter: ';',
            write_delimiter: " ; ".to_string(),
            terminator: " \r\n ".to_string(),
            write_buffer: 3,
            read_buffer: 2,
            bom: true,
            process_empty_records: true,
        };
        let records = vec![record(&["x", ""]), Vec::new(), record(&["y;z\r\n"])];
        let bytes = write_to_vec(&records, &layout).unwrap();
        assert!(bytes.starts_with(&csvrw_core::UTF8_BOM));
        assert_eq!(read_from_slice(&bytes, &layout).unwrap(), records);
    }

    #[test]
    fn empty_records_dropped_without_flag() {
        let records = vec![record(&["a"]), Vec::new(), record(&["b"])];
        let bytes = write_to_vec(&records, &CsvLayout::default()).unwrap();
        assert_eq!(bytes, b"\"a\"\n\"b\"\n");
    }

    #[test]
    fn single_record_access() {
        let records = vec![record(&["1"]), record(&["2"]), record(&["3"])];
        let bytes = write_to_vec(&records, &CsvLayout::default()).unwrap();
        let layout = CsvLayout::default();
        assert_eq!(read_record_from_slice(&bytes, &layout, 2).unwrap(), Some(record(&["2"])));
        assert_eq!(read_record_from_slice(&bytes, &layout, 4).unwrap(), None);
    }

    #[test]
    fn temp_csv_holds_records() {
        let records = vec![record(&["k", "v"])];
        let csv = TempCsv::with_records(&records, &CsvLayout::default());
        assert_eq!(csv.contents(), b"\"k\",\"v\"\n");

        let mut reader = CsvReader::new();
        reader.open(csv.path(), ReadFlags::none()).unwrap();
        assert!(reader.read_record().unwrap().is_record());
        assert_eq!(reader.fields(), records[0].as_slice());
    }
}
