//! Record index: record number to stream offset.
//!
//! Entries are kept sorted by record number in a flat vector. Only visited
//! records are present; lookups use binary search for the closest entry at
//! or below a target.

/// One indexed record start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// 1-based record number.
    pub record: u64,
    /// Stream offset where parsing of the record begins.
    pub offset: u64,
}

/// Sparse, append-mostly map from record number to stream offset.
///
/// An entry is never overwritten once inserted: stream offsets are stable
/// for the lifetime of a read session.
#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    entries: Vec<IndexEntry>,
}

impl RecordIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `record` begins at `offset`.
    ///
    /// Returns `false` if the record was already indexed, in which case the
    /// existing entry is kept.
    pub fn insert(&mut self, record: u64, offset: u64) -> bool {
        // Sequential scans append, so check the tail first.
        if self.entries.last().is_none_or(|last| last.record < record) {
            self.entries.push(IndexEntry { record, offset });
            return true;
        }
        let at = self.entries.partition_point(|e| e.record < record);
        if self.entries.get(at).is_some_and(|e| e.record == record) {
            return false;
        }
        self.entries.insert(at, IndexEntry { record, offset });
        true
    }

    /// Returns the offset of `record` if it is indexed.
    #[must_use]
    pub fn get(&self, record: u64) -> Option<u64> {
        self.entries
            .binary_search_by_key(&record, |e| e.record)
            .ok()
            .map(|i| self.entries[i].offset)
    }

    /// Returns the entry with the largest record number not above `record`.
    #[must_use]
    pub fn floor(&self, record: u64) -> Option<IndexEntry> {
        let at = self.entries.partition_point(|e| e.record <= record);
        at.checked_sub(1).map(|i| self.entries[i])
    }

    /// Returns the highest indexed entry.
    #[must_use]
    pub fn last(&self) -> Option<IndexEntry> {
        self.entries.last().copied()
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over the entries in record order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> + '_ {
        self.entries.iter()
    }
}
