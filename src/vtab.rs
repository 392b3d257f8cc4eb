//! The `vec0` virtual table: SQLite's table-module protocol translated onto
//! the codec, store, and query components.
//!
//! ```sql
//! CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[4]);
//! INSERT INTO vec_items(rowid, embedding) VALUES (1, ?);
//! SELECT rowid, distance FROM vec_items
//!   WHERE embedding MATCH ? ORDER BY distance LIMIT 3;
//! ```
//!
//! The declared schema is one vector column plus a hidden `distance` column
//! that is populated only for MATCH queries. Table contents are
//! memory-resident and live for the owning connection's lifetime.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::os::raw::c_int;
use std::rc::Rc;

use rusqlite::Connection;
use rusqlite::types::{Null, ValueRef};
use rusqlite::vtab::{
    Context, CreateVTab, IndexConstraintOp, IndexInfo, UpdateVTab, VTab, VTabConnection,
    Filters, Inserts, Updates, VTabCursor, VTabKind, Values, sqlite3_vtab, sqlite3_vtab_cursor,
    update_module,
};

use crate::codec;
use crate::error::VectorError;
use crate::query::{self, QueryDescriptor, RankedRow};
use crate::store::{TableDescriptor, VectorStore};

/// Query plan bit recorded in `idx_num`: a MATCH constraint supplies the
/// query vector as filter argument 0.
const PLAN_MATCH: c_int = 0x01;
/// Query plan bit recorded in `idx_num`: a LIMIT clause supplies the row
/// cap as filter argument 1.
const PLAN_LIMIT: c_int = 0x02;

/// Index of the vector column in the declared schema.
const COL_VECTOR: c_int = 0;
/// Index of the hidden `distance` column.
const COL_DISTANCE: c_int = 1;

/// Registers the `vec0` module on one connection.
///
/// Registration is explicit and per-connection; the crate keeps no
/// process-wide module list.
pub fn register_vector_module(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_module("vec0", update_module::<VecTab>(), None)
}

/// The virtual table instance: descriptor plus the store it owns.
///
/// The store sits behind `Rc<RefCell<…>>` so open cursors on the same
/// connection can reach it during `filter`; the host serializes all calls,
/// so borrows never overlap.
#[repr(C)]
pub struct VecTab {
    /// Base class. Must be first.
    base: sqlite3_vtab,
    table: TableDescriptor,
    store: Rc<RefCell<VectorStore>>,
}

impl VecTab {
    /// Parses the module arguments handed to create/connect.
    ///
    /// `args` is `[module, database, table, declarations…]`; exactly one
    /// column declaration of the form `<name> float[<dimension>]` is
    /// accepted.
    fn parse_args(args: &[&[u8]]) -> Result<TableDescriptor, VectorError> {
        let decls = &args[3..];
        match decls {
            [] => Err(VectorError::InvalidSchema(
                "a vector column declaration is required".into(),
            )),
            [decl] => {
                let decl = std::str::from_utf8(decl).map_err(|_| {
                    VectorError::InvalidSchema("declaration is not valid UTF-8".into())
                })?;
                parse_declaration(decl)
            }
            _ => Err(VectorError::InvalidSchema(
                "exactly one vector column is supported".into(),
            )),
        }
    }
}

/// Parses `<name> float[<dimension>]`.
fn parse_declaration(decl: &str) -> Result<TableDescriptor, VectorError> {
    let decl = decl.trim();
    let (column, ty) = decl
        .split_once(char::is_whitespace)
        .ok_or_else(|| VectorError::InvalidSchema(format!("missing type in '{decl}'")))?;
    let ty = ty.trim();

    let open = ty
        .find('[')
        .ok_or_else(|| VectorError::InvalidSchema(format!("missing dimension in '{decl}'")))?;
    let close = ty
        .rfind(']')
        .filter(|close| *close == ty.len() - 1 && *close > open)
        .ok_or_else(|| VectorError::InvalidSchema(format!("unterminated dimension in '{decl}'")))?;

    let element = ty[..open].trim();
    if !element.eq_ignore_ascii_case("float") {
        return Err(VectorError::InvalidSchema(format!(
            "unsupported element type '{element}'"
        )));
    }

    let dimension: usize = ty[open + 1..close]
        .trim()
        .parse()
        .map_err(|_| VectorError::InvalidSchema(format!("non-numeric dimension in '{decl}'")))?;
    if dimension == 0 {
        return Err(VectorError::InvalidSchema("dimension must be positive".into()));
    }

    Ok(TableDescriptor {
        column: column.to_string(),
        dimension,
    })
}

unsafe impl<'vtab> VTab<'vtab> for VecTab {
    type Aux = ();
    type Cursor = VecCursor<'vtab>;

    fn connect(
        _db: &mut VTabConnection,
        _aux: Option<&Self::Aux>,
        args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let table = Self::parse_args(args)?;
        log::debug!(
            "vec0 table '{}' connected: dimension {}",
            table.column,
            table.dimension
        );

        let schema = format!(
            "CREATE TABLE x(\"{}\" BLOB, distance REAL HIDDEN)",
            table.column
        );
        let store = Rc::new(RefCell::new(VectorStore::new(table.dimension)));
        Ok((
            schema,
            VecTab {
                base: sqlite3_vtab::default(),
                table,
                store,
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let mut match_idx = None;
        let mut limit_idx = None;

        for (i, constraint) in info.constraints().enumerate() {
            if !constraint.is_usable() {
                continue;
            }
            match constraint.operator() {
                IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_MATCH
                    if constraint.column() == COL_VECTOR =>
                {
                    match_idx = Some(i);
                }
                IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_LIMIT => {
                    limit_idx = Some(i);
                }
                _ => {}
            }
        }

        let Some(match_idx) = match_idx else {
            // No match predicate: unordered full scan.
            info.set_idx_num(0);
            info.set_estimated_cost(1_000_000.0);
            return Ok(());
        };

        let mut idx_num = PLAN_MATCH;
        // omit keeps SQLite from invoking the stub match() function at
        // runtime; the constraint is fully consumed here.
        info.constraint_usage(match_idx).set_argv_index(1);
        info.constraint_usage(match_idx).set_omit(true);

        if let Some(limit_idx) = limit_idx {
            idx_num |= PLAN_LIMIT;
            info.constraint_usage(limit_idx).set_argv_index(2);
        }

        info.set_idx_num(idx_num);
        info.set_estimated_cost(100.0);
        info.set_estimated_rows(25);
        Ok(())
    }

    fn open(&mut self) -> rusqlite::Result<VecCursor<'vtab>> {
        Ok(VecCursor {
            base: sqlite3_vtab_cursor::default(),
            store: Rc::clone(&self.store),
            state: CursorState::Unopened,
            phantom: PhantomData,
        })
    }
}

impl<'vtab> CreateVTab<'vtab> for VecTab {
    const KIND: VTabKind = VTabKind::Default;

    fn destroy(&self) -> rusqlite::Result<()> {
        log::debug!(
            "vec0 table '{}' destroyed ({} records dropped)",
            self.table.column,
            self.store.borrow().len()
        );
        Ok(())
    }
}

impl<'vtab> UpdateVTab<'vtab> for VecTab {
    fn delete(&mut self, arg: ValueRef<'_>) -> rusqlite::Result<()> {
        let rowid = match arg {
            ValueRef::Integer(rowid) => rowid,
            _ => {
                return Err(rusqlite::Error::ModuleError(
                    "vec0 delete expects an integer rowid".into(),
                ));
            }
        };
        self.store.borrow_mut().delete(rowid)?;
        Ok(())
    }

    fn insert(&mut self, args: &Inserts<'_>) -> rusqlite::Result<i64> {
        // args: [old rowid (NULL for insert), new rowid, vector, distance]
        let rowid = match args.get::<Option<i64>>(1)? {
            Some(rowid) => rowid,
            None => self.store.borrow().next_rowid(),
        };
        let buffer = vector_argument(args, 2)?;
        reject_distance_write(args, 3)?;
        self.store.borrow_mut().insert(rowid, buffer)?;
        Ok(rowid)
    }

    fn update(&mut self, args: &Updates<'_>) -> rusqlite::Result<()> {
        // args: [old rowid, new rowid, vector, distance]
        let old_rowid = args.get::<i64>(0)?;
        let new_rowid = args.get::<i64>(1)?;
        if old_rowid != new_rowid {
            return Err(rusqlite::Error::ModuleError(
                "vec0 does not support changing a row's rowid".into(),
            ));
        }
        let buffer = vector_argument(args, 2)?;
        reject_distance_write(args, 3)?;
        self.store.borrow_mut().update(old_rowid, buffer)?;
        Ok(())
    }
}

/// Copies the bound vector blob out of an update argument list.
fn vector_argument(args: &Values<'_>, idx: usize) -> rusqlite::Result<Vec<u8>> {
    args.get::<Option<Vec<u8>>>(idx)?.ok_or_else(|| {
        rusqlite::Error::ModuleError("vector column requires a non-NULL blob".into())
    })
}

/// The hidden distance column is computed, never stored.
fn reject_distance_write(args: &Values<'_>, idx: usize) -> rusqlite::Result<()> {
    if idx < args.len() && args.get::<Option<f64>>(idx)?.is_some() {
        return Err(rusqlite::Error::ModuleError(
            "distance column is read-only".into(),
        ));
    }
    Ok(())
}

/// Explicit cursor state machine.
///
/// Every `filter` call rebuilds the state from scratch; rows are
/// materialized there, so mutations issued after a scan begins cannot
/// perturb it. The cursor is exhausted once `pos` runs off the rows.
enum CursorState {
    /// No filter call has happened yet; reports eof.
    Unopened,
    /// Unordered scan of a store snapshot; distance reads as NULL.
    FullScan {
        rows: Vec<(i64, Vec<u8>)>,
        pos: usize,
    },
    /// Ranked nearest-neighbor stream, ascending by distance.
    Ranked { rows: Vec<RankedRow>, pos: usize },
}

/// Cursor over one `vec0` table.
#[repr(C)]
pub struct VecCursor<'vtab> {
    /// Base class. Must be first.
    base: sqlite3_vtab_cursor,
    store: Rc<RefCell<VectorStore>>,
    state: CursorState,
    phantom: PhantomData<&'vtab VecTab>,
}

unsafe impl VTabCursor for VecCursor<'_> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        if idx_num & PLAN_MATCH != 0 {
            let blob = args.get::<Vec<u8>>(0)?;
            if !blob.len().is_multiple_of(codec::ELEMENT_SIZE) {
                return Err(VectorError::MalformedBuffer {
                    expected: codec::byte_len(self.store.borrow().dimension()),
                    actual: blob.len(),
                }
                .into());
            }
            // Decode at the blob's own dimension; the planner rejects any
            // disagreement with the table dimension as a mismatch.
            let query_vector = codec::decode(&blob, blob.len() / codec::ELEMENT_SIZE)?;
            let store = self.store.borrow();

            let limit = if idx_num & PLAN_LIMIT != 0 {
                let n = args.get::<i64>(1)?;
                // SQLite signals "no limit" as a negative value.
                usize::try_from(n).ok()
            } else {
                None
            };

            log::trace!("vec0 knn filter: limit {limit:?}");
            let rows = query::nearest(&store, &QueryDescriptor::new(query_vector, limit))?;
            self.state = CursorState::Ranked { rows, pos: 0 };
        } else {
            log::trace!("vec0 full scan filter");
            let rows: Vec<(i64, Vec<u8>)> = self.store.borrow().scan().collect();
            self.state = CursorState::FullScan { rows, pos: 0 };
        }
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        match &mut self.state {
            CursorState::Unopened => Err(rusqlite::Error::ModuleError(
                "cursor advanced before filter".into(),
            )),
            CursorState::FullScan { pos, .. } | CursorState::Ranked { pos, .. } => {
                *pos += 1;
                Ok(())
            }
        }
    }

    fn eof(&self) -> bool {
        match &self.state {
            CursorState::Unopened => true,
            CursorState::FullScan { rows, pos } => *pos >= rows.len(),
            CursorState::Ranked { rows, pos } => *pos >= rows.len(),
        }
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        match &self.state {
            CursorState::Unopened => Err(rusqlite::Error::ModuleError(
                "column fetch before filter".into(),
            )),
            CursorState::FullScan { rows, pos } => {
                let (_, vector) = current(rows, *pos)?;
                match i {
                    COL_VECTOR => ctx.set_result(vector),
                    COL_DISTANCE => ctx.set_result(&Null),
                    _ => Err(column_out_of_range(i)),
                }
            }
            CursorState::Ranked { rows, pos } => {
                let row = current(rows, *pos)?;
                match i {
                    COL_VECTOR => ctx.set_result(&row.vector),
                    COL_DISTANCE => ctx.set_result(&f64::from(row.distance)),
                    _ => Err(column_out_of_range(i)),
                }
            }
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        match &self.state {
            CursorState::Unopened => Err(rusqlite::Error::ModuleError(
                "rowid fetch before filter".into(),
            )),
            CursorState::FullScan { rows, pos } => Ok(current(rows, *pos)?.0),
            CursorState::Ranked { rows, pos } => Ok(current(rows, *pos)?.rowid),
        }
    }
}

fn current<T>(rows: &[T], pos: usize) -> rusqlite::Result<&T> {
    rows.get(pos)
        .ok_or_else(|| rusqlite::Error::ModuleError("cursor read past end".into()))
}

fn column_out_of_range(i: c_int) -> rusqlite::Error {
    rusqlite::Error::ModuleError(format!("column index {i} out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_parses_name_and_dimension() {
        let table = parse_declaration("embedding float[4]").unwrap();
        assert_eq!(table.column, "embedding");
        assert_eq!(table.dimension, 4);
    }

    #[test]
    fn declaration_tolerates_extra_whitespace_and_case() {
        let table = parse_declaration("  v   FLOAT[ 768 ]  ").unwrap();
        assert_eq!(table.column, "v");
        assert_eq!(table.dimension, 768);
    }

    #[test]
    fn missing_dimension_is_invalid() {
        assert!(matches!(
            parse_declaration("embedding float").unwrap_err(),
            VectorError::InvalidSchema(_)
        ));
    }

    #[test]
    fn zero_dimension_is_invalid() {
        assert!(matches!(
            parse_declaration("embedding float[0]").unwrap_err(),
            VectorError::InvalidSchema(_)
        ));
    }

    #[test]
    fn non_numeric_dimension_is_invalid() {
        assert!(matches!(
            parse_declaration("embedding float[four]").unwrap_err(),
            VectorError::InvalidSchema(_)
        ));
    }

    #[test]
    fn non_float_element_type_is_invalid() {
        assert!(matches!(
            parse_declaration("embedding int8[4]").unwrap_err(),
            VectorError::InvalidSchema(_)
        ));
    }
}
