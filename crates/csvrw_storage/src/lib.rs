//! # csvrw Storage
//!
//! Byte stream association and buffer management for csvrw.
//!
//! This crate provides the lowest-level I/O layer of the engine. Nothing here
//! understands CSV: streams and buffers move **opaque bytes** between the
//! underlying stream and the parser or encoder sitting above them.
//!
//! ## Design Principles
//!
//! - A stream is either owned by the engine (opened from a path) or borrowed
//!   from the caller; only owned streams are closed by the engine
//! - Buffers batch reads and writes to minimize I/O calls
//! - Buffers can be resized at any quiescent point without losing unread
//!   (read side) or unflushed (write side) bytes
//! - Offsets are stream-relative, never buffer-relative
//!
//! ## Example
//!
//! ```rust
//! use csvrw_storage::{ReadBuffer, ReadStream};
//! use std::io::Cursor;
//!
//! let mut source = Cursor::new(b"hello world".to_vec());
//! let mut stream = ReadStream::borrow_read(&mut source);
//! let mut buffer = ReadBuffer::with_capacity(4).unwrap();
//!
//! let n = buffer.fill(stream.get_mut()).unwrap();
//! assert_eq!(n, 4);
//! assert_eq!(buffer.unconsumed(), b"hell");
//! buffer.consume(4);
//! assert_eq!(buffer.position(), 4);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod error;
mod stream;

pub use buffer::{IoStats, ReadBuffer, WriteBuffer, DEFAULT_BUFFER_SIZE};
pub use error::{StorageError, StorageResult};
pub use stream::{Ownership, ReadSeek, ReadStream, Stream, WriteStream};
