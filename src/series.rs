//! The `generate_series` table-valued function.
//!
//! `generate_series(start, stop[, step])` yields the integers from `start`
//! to `stop` inclusive, `step` apart. A trivially-stateful companion to the
//! vector table; it shares no storage and exists so the harness can exercise
//! an eponymous virtual table alongside the stored one.

use std::marker::PhantomData;
use std::os::raw::c_int;

use rusqlite::Connection;
use rusqlite::vtab::{
    Context, Filters, IndexConstraintOp, IndexInfo, VTab, VTabConnection, VTabCursor,
    eponymous_only_module, sqlite3_vtab, sqlite3_vtab_cursor,
};

/// `idx_num` bit: a `start` constraint is filter argument 0‥.
const PLAN_START: c_int = 0x01;
/// `idx_num` bit: a `stop` constraint follows `start`.
const PLAN_STOP: c_int = 0x02;
/// `idx_num` bit: a `step` constraint follows `stop`.
const PLAN_STEP: c_int = 0x04;
/// `idx_num` bit: the host wants descending order.
const PLAN_DESC: c_int = 0x08;

/// Default upper bound when `stop` is not constrained, from the reference
/// `series` extension.
const DEFAULT_STOP: i64 = 4_294_967_295;

/// Registers `generate_series` on one connection.
pub fn register_series_module(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_module("generate_series", eponymous_only_module::<SeriesTab>(), None)
}

/// The eponymous series table. Stateless; everything lives on the cursor.
#[repr(C)]
pub struct SeriesTab {
    /// Base class. Must be first.
    base: sqlite3_vtab,
}

unsafe impl<'vtab> VTab<'vtab> for SeriesTab {
    type Aux = ();
    type Cursor = SeriesCursor<'vtab>;

    fn connect(
        _db: &mut VTabConnection,
        _aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        Ok((
            "CREATE TABLE x(value, start HIDDEN, stop HIDDEN, step HIDDEN)".into(),
            SeriesTab {
                base: sqlite3_vtab::default(),
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        // Map EQ constraints on the hidden columns to filter arguments,
        // in declaration order.
        let mut columns = [None; 3];
        for (i, constraint) in info.constraints().enumerate() {
            if !constraint.is_usable() {
                continue;
            }
            if constraint.operator() != IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ {
                continue;
            }
            match constraint.column() {
                1 => columns[0] = Some(i),
                2 => columns[1] = Some(i),
                3 => columns[2] = Some(i),
                _ => {}
            }
        }

        let mut idx_num = 0;
        let mut argv = 0;
        for (slot, flag) in columns.iter().zip([PLAN_START, PLAN_STOP, PLAN_STEP]) {
            if let Some(constraint_idx) = slot {
                argv += 1;
                idx_num |= flag;
                info.constraint_usage(*constraint_idx).set_argv_index(argv);
                info.constraint_usage(*constraint_idx).set_omit(true);
            }
        }

        if info.num_of_order_by() == 1 {
            if info.order_bys().next().is_some_and(|o| o.is_order_by_desc()) {
                idx_num |= PLAN_DESC;
            }
            info.set_order_by_consumed(true);
        }

        info.set_idx_num(idx_num);
        info.set_estimated_cost(if idx_num & (PLAN_START | PLAN_STOP) != 0 {
            1.0
        } else {
            2_147_483_647.0
        });
        Ok(())
    }

    fn open(&mut self) -> rusqlite::Result<SeriesCursor<'vtab>> {
        Ok(SeriesCursor {
            base: sqlite3_vtab_cursor::default(),
            desc: false,
            value: None,
            min: 0,
            max: 0,
            step: 1,
            row: 0,
            phantom: PhantomData,
        })
    }
}

/// Cursor over one series expansion.
#[repr(C)]
pub struct SeriesCursor<'vtab> {
    /// Base class. Must be first.
    base: sqlite3_vtab_cursor,
    desc: bool,
    /// Current value; `None` once the series is exhausted.
    value: Option<i64>,
    min: i64,
    max: i64,
    step: i64,
    row: i64,
    phantom: PhantomData<&'vtab SeriesTab>,
}

impl SeriesCursor<'_> {
    fn advance(&mut self) {
        let Some(value) = self.value else { return };
        self.row += 1;
        let next = if self.desc {
            value.checked_sub(self.step).filter(|v| *v >= self.min)
        } else {
            value.checked_add(self.step).filter(|v| *v <= self.max)
        };
        self.value = next;
    }
}

unsafe impl VTabCursor for SeriesCursor<'_> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        let mut argv = 0;
        let mut next_arg = |present: bool| -> rusqlite::Result<Option<i64>> {
            if present {
                let v = args.get::<i64>(argv)?;
                argv += 1;
                Ok(Some(v))
            } else {
                Ok(None)
            }
        };

        self.min = next_arg(idx_num & PLAN_START != 0)?.unwrap_or(0);
        self.max = next_arg(idx_num & PLAN_STOP != 0)?.unwrap_or(DEFAULT_STOP);
        self.step = next_arg(idx_num & PLAN_STEP != 0)?.unwrap_or(1).max(1);
        self.desc = idx_num & PLAN_DESC != 0;
        self.row = 0;

        self.value = if self.min > self.max {
            None
        } else if self.desc {
            // Largest value of the ascending series, so descending output
            // hits the same members.
            Some(self.max - (self.max - self.min) % self.step)
        } else {
            Some(self.min)
        };
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        self.advance();
        Ok(())
    }

    fn eof(&self) -> bool {
        self.value.is_none()
    }

    fn column(&self, ctx: &mut Context, i: c_int) -> rusqlite::Result<()> {
        let value = match i {
            0 => self.value.unwrap_or(0),
            1 => self.min,
            2 => self.max,
            3 => self.step,
            _ => {
                return Err(rusqlite::Error::ModuleError(format!(
                    "column index {i} out of range"
                )));
            }
        };
        ctx.set_result(&value)
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        Ok(self.row + 1)
    }
}
