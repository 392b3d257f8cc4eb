//! Nearest-neighbor query execution over a vector store.
//!
//! Execution is a straight line through four stages: validate the query
//! dimension, score a full store snapshot, rank by distance, truncate to the
//! limit. There is no index pruning; cost is linear in stored row count
//! times dimension. The ranked rows are then streamed forward-only by the
//! cursor that owns them.

use crate::codec;
use crate::distance;
use crate::error::VectorError;
use crate::store::VectorStore;

/// One similarity query: the vector to compare against and an optional
/// cap on the number of rows returned.
///
/// Transient: built per query execution and discarded when the cursor
/// finishes.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    query: Vec<f32>,
    limit: Option<usize>,
}

impl QueryDescriptor {
    /// Builds a descriptor. `limit: None` means unbounded.
    pub fn new(query: Vec<f32>, limit: Option<usize>) -> Self {
        Self { query, limit }
    }
}

/// One row of a ranked result: the record's identity, its distance to the
/// query vector, and a copy of its encoded buffer for callers that project
/// the vector column instead of the distance.
#[derive(Debug, Clone)]
pub struct RankedRow {
    /// Identifier of the matched record.
    pub rowid: i64,
    /// Euclidean distance to the query vector.
    pub distance: f32,
    /// The record's encoded vector buffer.
    pub vector: Vec<u8>,
}

/// Runs a similarity query against the store.
///
/// Returns rows sorted ascending by distance, ties broken by ascending
/// rowid, truncated to the descriptor's limit. Fails with
/// [`VectorError::DimensionMismatch`] before touching storage if the query
/// vector's dimension disagrees with the table's, and with
/// [`VectorError::CorruptRecord`] if any stored buffer has drifted from the
/// dimension invariant. A corrupt record fails the whole query; it is never
/// skipped.
pub fn nearest(store: &VectorStore, descriptor: &QueryDescriptor) -> Result<Vec<RankedRow>, VectorError> {
    let dimension = store.dimension();
    if descriptor.query.len() != dimension {
        return Err(VectorError::DimensionMismatch {
            expected: dimension,
            actual: descriptor.query.len(),
        });
    }

    let mut rows = score(store.scan(), &descriptor.query, dimension)?;

    rows.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.rowid.cmp(&b.rowid))
    });

    if let Some(limit) = descriptor.limit {
        rows.truncate(limit);
    }
    log::trace!("ranked {} rows (limit {:?})", rows.len(), descriptor.limit);
    Ok(rows)
}

/// Scores every scanned record against the query vector.
///
/// Ranking uses the squared distance; the reported value takes the root
/// once per surviving row.
fn score(
    scan: impl Iterator<Item = (i64, Vec<u8>)>,
    query: &[f32],
    dimension: usize,
) -> Result<Vec<RankedRow>, VectorError> {
    let mut rows = Vec::with_capacity(scan.size_hint().0);
    for (rowid, buffer) in scan {
        let stored = codec::decode(&buffer, dimension).map_err(|_| VectorError::CorruptRecord {
            rowid,
            actual: buffer.len(),
        })?;
        rows.push(RankedRow {
            rowid,
            distance: distance::euclidean_squared(query, &stored),
            vector: buffer,
        });
    }
    for row in &mut rows {
        row.distance = row.distance.sqrt();
    }
    Ok(rows)
}
