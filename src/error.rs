//! Error types for vector table operations.

use std::fmt;

use rusqlite::ffi;

/// Errors that can occur when working with a vector table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorError {
    /// The virtual table declaration could not be parsed.
    InvalidSchema(String),
    /// A vector's element count disagrees with the table dimension.
    DimensionMismatch {
        /// Dimension declared for the table.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// An encoded buffer's byte length disagrees with the table dimension.
    MalformedBuffer {
        /// Byte length implied by the table dimension.
        expected: usize,
        /// Byte length of the offending buffer.
        actual: usize,
    },
    /// An insert targeted a rowid that is already present.
    DuplicateKey(i64),
    /// An update or delete targeted a rowid that is not present.
    NotFound(i64),
    /// A stored record no longer satisfies the table's dimension invariant.
    CorruptRecord {
        /// Rowid of the damaged record.
        rowid: i64,
        /// Byte length found in storage.
        actual: usize,
    },
}

impl fmt::Display for VectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorError::InvalidSchema(msg) => {
                write!(f, "invalid vector table declaration: {msg}")
            }
            VectorError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected} elements, got {actual}")
            }
            VectorError::MalformedBuffer { expected, actual } => {
                write!(f, "malformed vector buffer: expected {expected} bytes, got {actual}")
            }
            VectorError::DuplicateKey(rowid) => {
                write!(f, "rowid {rowid} already exists")
            }
            VectorError::NotFound(rowid) => {
                write!(f, "rowid {rowid} not found")
            }
            VectorError::CorruptRecord { rowid, actual } => {
                write!(f, "corrupt record at rowid {rowid}: stored buffer is {actual} bytes")
            }
        }
    }
}

impl std::error::Error for VectorError {}

/// Maps component failures onto the host engine's standard error signals.
///
/// `DuplicateKey` surfaces as a primary key constraint violation; everything
/// else becomes a module error carrying the descriptive message.
impl From<VectorError> for rusqlite::Error {
    fn from(err: VectorError) -> Self {
        match err {
            VectorError::DuplicateKey(_) => rusqlite::Error::SqliteFailure(
                ffi::Error::new(ffi::SQLITE_CONSTRAINT_PRIMARYKEY),
                Some(err.to_string()),
            ),
            _ => rusqlite::Error::ModuleError(err.to_string()),
        }
    }
}
