//! Keyed storage of encoded vectors for one table instance.
//!
//! The store owns every buffer it holds; callers copy data in on mutation
//! and copy data out on fetch. Nothing outside the adapter retains a
//! reference into the store across a call boundary.

use std::collections::BTreeMap;

use crate::codec;
use crate::error::VectorError;

/// Describes one logical vector table: its name and fixed dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Name of the vector column.
    pub column: String,
    /// Number of elements in every stored vector. Fixed for the table's
    /// lifetime.
    pub dimension: usize,
}

/// In-memory mapping from rowid to encoded vector buffer.
///
/// Every buffer accepted by a mutating operation satisfies the table's
/// dimension invariant: `len == dimension × 4`. Records live for the
/// owning connection's lifetime.
#[derive(Debug)]
pub struct VectorStore {
    dimension: usize,
    records: BTreeMap<i64, Vec<u8>>,
}

impl VectorStore {
    /// Creates an empty store for vectors of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: BTreeMap::new(),
        }
    }

    /// The fixed dimension of every vector in this store.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store contains no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts a new record.
    ///
    /// Fails with [`VectorError::DuplicateKey`] if `rowid` is already
    /// present; the existing record is left untouched.
    pub fn insert(&mut self, rowid: i64, buffer: Vec<u8>) -> Result<(), VectorError> {
        self.check_buffer(&buffer)?;
        if self.records.contains_key(&rowid) {
            return Err(VectorError::DuplicateKey(rowid));
        }
        log::trace!("store insert rowid={rowid} ({} bytes)", buffer.len());
        self.records.insert(rowid, buffer);
        Ok(())
    }

    /// Replaces the buffer stored under an existing rowid.
    ///
    /// Fails with [`VectorError::NotFound`] if the rowid is absent.
    pub fn update(&mut self, rowid: i64, buffer: Vec<u8>) -> Result<(), VectorError> {
        self.check_buffer(&buffer)?;
        match self.records.get_mut(&rowid) {
            Some(slot) => {
                *slot = buffer;
                Ok(())
            }
            None => Err(VectorError::NotFound(rowid)),
        }
    }

    /// Removes the record stored under a rowid.
    ///
    /// Fails with [`VectorError::NotFound`] if the rowid is absent; deleting
    /// a missing row never silently succeeds.
    pub fn delete(&mut self, rowid: i64) -> Result<(), VectorError> {
        match self.records.remove(&rowid) {
            Some(_) => {
                log::trace!("store delete rowid={rowid}");
                Ok(())
            }
            None => Err(VectorError::NotFound(rowid)),
        }
    }

    /// Fetches the buffer stored under a rowid.
    pub fn get(&self, rowid: i64) -> Result<&[u8], VectorError> {
        self.records
            .get(&rowid)
            .map(Vec::as_slice)
            .ok_or(VectorError::NotFound(rowid))
    }

    /// Starts a scan over all records.
    ///
    /// The returned iterator owns a snapshot taken at this call: mutations
    /// applied to the store after `scan` returns are not visible to it.
    /// Iteration order is ascending rowid, stable for the scan's duration.
    pub fn scan(&self) -> Scan {
        let rows: Vec<(i64, Vec<u8>)> = self
            .records
            .iter()
            .map(|(rowid, buffer)| (*rowid, buffer.clone()))
            .collect();
        Scan { rows: rows.into_iter() }
    }

    /// The rowid assigned to an insert that did not specify one.
    pub fn next_rowid(&self) -> i64 {
        match self.records.last_key_value() {
            Some((max, _)) => max.saturating_add(1),
            None => 1,
        }
    }

    fn check_buffer(&self, buffer: &[u8]) -> Result<(), VectorError> {
        if buffer.len() == codec::byte_len(self.dimension) {
            return Ok(());
        }
        if buffer.len().is_multiple_of(codec::ELEMENT_SIZE) {
            Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: buffer.len() / codec::ELEMENT_SIZE,
            })
        } else {
            Err(VectorError::MalformedBuffer {
                expected: codec::byte_len(self.dimension),
                actual: buffer.len(),
            })
        }
    }
}

/// Snapshot iterator over `(rowid, buffer)` pairs produced by
/// [`VectorStore::scan`].
pub struct Scan {
    rows: std::vec::IntoIter<(i64, Vec<u8>)>,
}

impl Iterator for Scan {
    type Item = (i64, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl ExactSizeIterator for Scan {
    fn len(&self) -> usize {
        self.rows.len()
    }
}
