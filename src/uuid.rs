//! UUID scalar functions.
//!
//! Mirrors the reference `uuid` extension: `uuid()` generates a random
//! version-4 UUID in the canonical text form, `uuid_str(X)` and
//! `uuid_blob(X)` convert between that form and the 16-byte blob form.
//! The converters return NULL for input they cannot interpret.

use rusqlite::Connection;
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::ValueRef;
use uuid::Uuid;

/// Registers the three UUID functions on one connection.
pub fn register_uuid_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "uuid",
        0,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_INNOCUOUS,
        |_ctx| Ok(Uuid::new_v4().hyphenated().to_string()),
    )?;
    conn.create_scalar_function(
        "uuid_str",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_INNOCUOUS | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(parse_argument(ctx).map(|u| u.hyphenated().to_string())),
    )?;
    conn.create_scalar_function(
        "uuid_blob",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_INNOCUOUS | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(parse_argument(ctx).map(|u| u.as_bytes().to_vec())),
    )
}

/// Interprets the single argument as a UUID in either representation.
fn parse_argument(ctx: &Context<'_>) -> Option<Uuid> {
    match ctx.get_raw(0) {
        ValueRef::Text(text) => std::str::from_utf8(text)
            .ok()
            .and_then(|s| Uuid::try_parse(s.trim()).ok()),
        ValueRef::Blob(blob) => Uuid::from_slice(blob).ok(),
        _ => None,
    }
}
