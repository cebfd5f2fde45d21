//! Resizable read and write buffers.
//!
//! Both buffers sit between a stream and the parser/encoder. They batch I/O
//! and can change capacity between operations while keeping every byte that
//! has not yet been consumed (read side) or flushed (write side).

use crate::error::{StorageError, StorageResult};
use std::io::{ErrorKind, Read, Write};

/// Default buffer capacity in bytes for read and write sessions.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Counters for calls made to the underlying stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    /// Number of read or write calls issued to the stream.
    pub calls: u64,
    /// Number of bytes moved to or from the stream.
    pub bytes: u64,
}

fn allocate(capacity: usize) -> StorageResult<Vec<u8>> {
    if capacity == 0 {
        return Err(StorageError::InvalidBufferSize {
            requested: capacity,
            reason: "capacity must be at least one byte",
        });
    }
    let mut region = Vec::new();
    region
        .try_reserve_exact(capacity)
        .map_err(|_| StorageError::AllocationFailed {
            requested: capacity,
        })?;
    Ok(region)
}

/// Read-side buffer with a consumed-up-to cursor.
///
/// Bytes in `[start, end)` have been read from the stream but not yet handed
/// to the parser. `base` is the stream offset of the first byte in the region,
/// so [`ReadBuffer::position`] always reports the stream offset of the next
/// unconsumed byte.
#[derive(Debug)]
pub struct ReadBuffer {
    region: Vec<u8>,
    start: usize,
    end: usize,
    base: u64,
    stats: IoStats,
}

impl Default for ReadBuffer {
    fn default() -> Self {
        Self {
            region: vec![0; DEFAULT_BUFFER_SIZE],
            start: 0,
            end: 0,
            base: 0,
            stats: IoStats::default(),
        }
    }
}

impl ReadBuffer {
    /// Creates a buffer with [`DEFAULT_BUFFER_SIZE`] capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero or cannot be allocated.
    pub fn with_capacity(capacity: usize) -> StorageResult<Self> {
        let mut region = allocate(capacity)?;
        region.resize(capacity, 0);
        Ok(Self {
            region,
            ..Self::default()
        })
    }

    /// Returns the buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Returns the buffered bytes not yet consumed.
    #[must_use]
    pub fn unconsumed(&self) -> &[u8] {
        &self.region[self.start..self.end]
    }

    /// Returns the number of buffered bytes not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns `true` if every buffered byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Marks `n` unconsumed bytes as consumed.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the number of unconsumed bytes.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "consumed past the buffered data");
        self.start += n;
    }

    /// Returns the stream offset of the next unconsumed byte.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.base + self.start as u64
    }

    /// Discards all buffered bytes; the stream is now positioned at `position`.
    pub fn reset(&mut self, position: u64) {
        self.start = 0;
        self.end = 0;
        self.base = position;
    }

    /// Moves the cursor to `position` if that offset is inside the buffered
    /// window, avoiding a stream seek. Returns `false` if it is not.
    pub fn seek_within(&mut self, position: u64) -> bool {
        let window_end = self.base + self.end as u64;
        if position < self.base || position > window_end {
            return false;
        }
        self.start = (position - self.base) as usize;
        true
    }

    /// Reads more bytes from `source` into the free space of the buffer.
    ///
    /// Unconsumed bytes are first moved to the start of the region. Returns
    /// the number of bytes read; zero signals end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or if the buffer holds nothing
    /// but unconsumed bytes.
    pub fn fill<R: Read + ?Sized>(&mut self, source: &mut R) -> StorageResult<usize> {
        if self.start > 0 {
            self.region.copy_within(self.start..self.end, 0);
            self.base += self.start as u64;
            self.end -= self.start;
            self.start = 0;
        }
        if self.end == self.region.len() {
            return Err(StorageError::BufferFull {
                capacity: self.region.len(),
            });
        }

        loop {
            match source.read(&mut self.region[self.end..]) {
                Ok(n) => {
                    self.end += n;
                    self.stats.calls += 1;
                    self.stats.bytes += n as u64;
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Changes the capacity, relocating unconsumed bytes to the start of the
    /// new region.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero, smaller than the unconsumed
    /// data, or cannot be allocated. The buffer is unchanged on error.
    pub fn resize(&mut self, capacity: usize) -> StorageResult<()> {
        let pending = self.len();
        if capacity < pending {
            return Err(StorageError::InvalidBufferSize {
                requested: capacity,
                reason: "capacity is smaller than the unconsumed data",
            });
        }
        let mut region = allocate(capacity)?;
        region.extend_from_slice(self.unconsumed());
        region.resize(capacity, 0);

        self.base += self.start as u64;
        self.start = 0;
        self.end = pending;
        self.region = region;
        Ok(())
    }

    /// Returns the I/O counters accumulated since the last reset.
    #[must_use]
    pub fn stats(&self) -> IoStats {
        self.stats
    }

    /// Clears the I/O counters.
    pub fn reset_stats(&mut self) {
        self.stats = IoStats::default();
    }
}

/// Write-side buffer holding bytes not yet flushed to the stream.
#[derive(Debug)]
pub struct WriteBuffer {
    pending: Vec<u8>,
    capacity: usize,
    stats: IoStats,
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self {
            pending: Vec::with_capacity(DEFAULT_BUFFER_SIZE),
            capacity: DEFAULT_BUFFER_SIZE,
            stats: IoStats::default(),
        }
    }
}

impl WriteBuffer {
    /// Creates a buffer with [`DEFAULT_BUFFER_SIZE`] capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero or cannot be allocated.
    pub fn with_capacity(capacity: usize) -> StorageResult<Self> {
        Ok(Self {
            pending: allocate(capacity)?,
            capacity,
            stats: IoStats::default(),
        })
    }

    /// Returns the buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the bytes waiting to be flushed.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Returns the number of bytes waiting to be flushed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is waiting to be flushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Appends `data`, flushing to `sink` whenever the buffer fills up.
    ///
    /// # Errors
    ///
    /// Returns an error if a flush fails. Bytes accepted before the failure
    /// stay buffered.
    pub fn write<W: Write + ?Sized>(&mut self, mut data: &[u8], sink: &mut W) -> StorageResult<()> {
        while !data.is_empty() {
            let free = self.capacity - self.pending.len();
            if free == 0 {
                self.flush(sink)?;
                continue;
            }
            let n = free.min(data.len());
            self.pending.extend_from_slice(&data[..n]);
            data = &data[n..];
        }
        Ok(())
    }

    /// Writes every pending byte to `sink`.
    ///
    /// This does not call `sink.flush()`; the caller decides when the stream
    /// itself is flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails to accept all pending bytes.
    pub fn flush<W: Write + ?Sized>(&mut self, sink: &mut W) -> StorageResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        sink.write_all(&self.pending)?;
        self.stats.calls += 1;
        self.stats.bytes += self.pending.len() as u64;
        self.pending.clear();
        Ok(())
    }

    /// Drops every pending byte without writing it.
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Changes the capacity, keeping pending bytes at the start of the new
    /// region.
    ///
    /// # Errors
    ///
    /// Returns an error if `capacity` is zero, smaller than the pending data,
    /// or cannot be allocated. The buffer is unchanged on error.
    pub fn resize(&mut self, capacity: usize) -> StorageResult<()> {
        if capacity < self.pending.len() {
            return Err(StorageError::InvalidBufferSize {
                requested: capacity,
                reason: "capacity is smaller than the unflushed data",
            });
        }
        let mut region = allocate(capacity)?;
        region.extend_from_slice(&self.pending);
        self.pending = region;
        self.capacity = capacity;
        Ok(())
    }

    /// Returns the I/O counters accumulated since the last reset.
    #[must_use]
    pub fn stats(&self) -> IoStats {
        self.stats
    }

    /// Clears the I/O counters.
    pub fn reset_stats(&mut self) {
        self.stats = IoStats::default();
    }
}
