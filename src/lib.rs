//! # vectab
//!
//! A vector similarity search virtual table for SQLite, plus the small
//! companion extensions (`generate_series`, UUID functions) its test
//! harness exercises.
//!
//! The `vec0` module stores fixed-dimension `f32` vectors keyed by rowid
//! and answers nearest-neighbor queries expressed as a MATCH predicate.
//! Search is exact: every query scores a full scan of the table and ranks
//! rows ascending by Euclidean distance. There is no approximate indexing
//! and no support for mixing dimensions within one table.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rusqlite::Connection;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = Connection::open_in_memory()?;
//! vectab::register_all(&conn)?;
//!
//! conn.execute_batch("CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[4])")?;
//!
//! let vector: [f32; 4] = [0.1, 0.1, 0.1, 0.1];
//! let blob: Vec<u8> = vector.iter().flat_map(|v| v.to_le_bytes()).collect();
//! conn.execute(
//!     "INSERT INTO vec_items(rowid, embedding) VALUES (?1, ?2)",
//!     rusqlite::params![1i64, blob],
//! )?;
//!
//! let query: Vec<u8> = [0.3f32; 4].iter().flat_map(|v| v.to_le_bytes()).collect();
//! let mut stmt = conn.prepare(
//!     "SELECT rowid, distance FROM vec_items WHERE embedding MATCH ?1 \
//!      ORDER BY distance LIMIT 3",
//! )?;
//! let mut rows = stmt.query(rusqlite::params![query])?;
//! while let Some(row) = rows.next()? {
//!     let (rowid, distance): (i64, f64) = (row.get(0)?, row.get(1)?);
//!     println!("rowid={rowid} distance={distance}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Modules are registered explicitly, per connection, via the
//! `register_*` functions — there is no process-wide auto-extension hook.
//! Table contents are memory-resident and scoped to the registering
//! connection; the host engine serializes all calls, so the crate does no
//! locking of its own.

#![deny(missing_docs)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod codec;
pub mod distance;
pub mod error;
pub mod query;
pub mod series;
pub mod store;
pub mod uuid;
pub mod vtab;

pub use error::VectorError;
pub use query::{QueryDescriptor, RankedRow};
pub use series::register_series_module;
pub use store::{TableDescriptor, VectorStore};
pub use uuid::register_uuid_functions;
pub use vtab::register_vector_module;

use rusqlite::Connection;

/// Registers every module this crate provides on one connection.
pub fn register_all(conn: &Connection) -> rusqlite::Result<()> {
    register_vector_module(conn)?;
    register_series_module(conn)?;
    register_uuid_functions(conn)?;
    Ok(())
}
