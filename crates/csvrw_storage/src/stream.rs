//! Byte stream association.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

/// A byte source that can be read and repositioned.
///
/// Blanket-implemented for every `Read + Seek` type so callers can hand in
/// files, cursors, or their own stream types.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// Who is responsible for closing an associated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The engine opened the stream and closes it.
    Owned,
    /// The caller supplied the stream and keeps ownership.
    Borrowed,
}

/// A byte stream associated with an engine session.
///
/// `Owned` streams were opened by the engine from a path and are dropped
/// (closed) when the session ends. `Borrowed` streams belong to the caller;
/// ending the session only releases the borrow.
pub enum Stream<'s, S: ?Sized + 's> {
    /// Engine-opened stream, released on close.
    Owned(Box<S>),
    /// Caller-owned stream, never closed by the engine.
    Borrowed(&'s mut S),
}

/// A readable, seekable stream association.
pub type ReadStream<'s> = Stream<'s, dyn ReadSeek + 's>;

/// A writable stream association.
pub type WriteStream<'s> = Stream<'s, dyn Write + 's>;

impl<'s, S: ?Sized + 's> Stream<'s, S> {
    /// Returns who owns the underlying stream.
    #[must_use]
    pub fn ownership(&self) -> Ownership {
        match self {
            Self::Owned(_) => Ownership::Owned,
            Self::Borrowed(_) => Ownership::Borrowed,
        }
    }

    /// Returns `true` if the engine is responsible for closing the stream.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Returns the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        match self {
            Self::Owned(stream) => stream.as_mut(),
            Self::Borrowed(stream) => &mut **stream,
        }
    }
}

impl<'s> Stream<'s, dyn ReadSeek + 's> {
    /// Opens a file for reading. The engine owns the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_read(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::Owned(Box::new(file)))
    }

    /// Associates a caller-owned readable stream.
    pub fn borrow_read<R: Read + Seek + 's>(stream: &'s mut R) -> Self {
        Self::Borrowed(stream)
    }
}

impl<'s> Stream<'s, dyn Write + 's> {
    /// Opens or creates a file for writing. The engine owns the handle.
    ///
    /// With `truncate` the file is emptied, otherwise writes are appended.
    /// Returns the stream together with the file length after opening, which
    /// is zero for a truncated or freshly created file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open_write(path: &Path, truncate: bool) -> io::Result<(Self, u64)> {
        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(path)?;
        let len = file.metadata()?.len();
        Ok((Self::Owned(Box::new(file)), len))
    }

    /// Associates a caller-owned writable stream.
    pub fn borrow_write<W: Write + 's>(stream: &'s mut W) -> Self {
        Self::Borrowed(stream)
    }
}

impl<S: ?Sized> fmt::Debug for Stream<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("ownership", &self.ownership())
            .finish_non_exhaustive()
    }
}
