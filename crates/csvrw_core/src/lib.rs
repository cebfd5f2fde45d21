//! # csvrw Core
//!
//! Buffered CSV reading and writing over files or caller-supplied streams.
//!
//! This crate provides:
//! - [`CsvReader`]: sequential and random record access, with a lazily built
//!   [`RecordIndex`] so revisiting a record never rescans the stream
//! - [`CsvWriter`]: field, record and terminator writing with configurable
//!   delimiter and terminator strings
//! - Per-session [`ReadFlags`] and [`WriteFlags`], object-level
//!   [`ReaderConfig`] and [`WriterConfig`]
//!
//! Both engines keep the first error of a session. Every later call returns
//! it until the session is closed or a new one is started, and it can be
//! inspected with `has_error`, `error` and `error_msg`.
//!
//! ## Example
//!
//! ```rust
//! use csvrw_core::{CsvReader, CsvWriter, ReadFlags, ReadOutcome, WriteFlags};
//! use std::io::Cursor;
//!
//! let mut bytes = Vec::new();
//! {
//!     let mut writer = CsvWriter::new();
//!     writer.associate(&mut bytes, WriteFlags::none()).unwrap();
//!     writer.write_record(["a", "b"], true).unwrap();
//!     writer.write_record(["c,d", "e\"f"], true).unwrap();
//!     writer.close().unwrap();
//! }
//! assert_eq!(bytes, b"\"a\",\"b\"\n\"c,d\",\"e\"\"f\"\n");
//!
//! let mut source = Cursor::new(bytes);
//! let mut reader = CsvReader::new();
//! reader.associate(&mut source, ReadFlags::none().strict_mode(true)).unwrap();
//!
//! assert_eq!(reader.read_record_at(2).unwrap(), ReadOutcome::Record);
//! assert_eq!(reader.fields_lossy(), ["c,d", "e\"f"]);
//! assert_eq!(reader.read_record().unwrap(), ReadOutcome::Exhausted);
//! assert_eq!(reader.end_record_num(), Some(2));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod flags;
mod index;
mod reader;
mod writer;

pub use config::{ReaderConfig, WriterConfig};
pub use error::{CsvError, CsvResult};
pub use flags::{ReadFlags, WriteFlags};
pub use index::{IndexEntry, RecordIndex};
pub use reader::{CsvReader, ReadOutcome};
pub use writer::CsvWriter;

pub use csvrw_codec::UTF8_BOM;
pub use csvrw_storage::{IoStats, DEFAULT_BUFFER_SIZE};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
