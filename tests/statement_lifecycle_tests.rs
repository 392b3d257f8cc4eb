//! Drives the host engine's statement lifecycle the way the verification
//! harness does: prepare once, bind/step/reset in a loop, finalize, and
//! assert return values the whole way.

use rusqlite::{Connection, params};
use tempfile::NamedTempFile;

fn blob(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn prepared_insert_reused_across_bindings() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t1(a, b)").unwrap();

    let row_count = 42i64;
    {
        let mut stmt = conn.prepare("INSERT INTO t1(a, b) VALUES (?1, ?2)").unwrap();
        for i in 0..row_count {
            stmt.execute(params![i * 2, i * 2 + 1]).unwrap();
        }
    }

    let count: i64 = conn
        .query_row("SELECT count(*) FROM t1", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, row_count);
}

#[test]
fn select_streams_bound_values_back() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t1(a, b); INSERT INTO t1(a, b) VALUES (1, 2);")
        .unwrap();

    let mut stmt = conn.prepare("SELECT a, b FROM t1").unwrap();
    let mut rows = stmt.query([]).unwrap();
    while let Some(row) = rows.next().unwrap() {
        let a: i64 = row.get(0).unwrap();
        let b: i64 = row.get(1).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }
}

#[test]
fn vector_inserts_inside_an_explicit_transaction() {
    let conn = Connection::open_in_memory().unwrap();
    vectab::register_vector_module(&conn).unwrap();
    conn.execute_batch("CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[4])")
        .unwrap();

    conn.execute_batch("BEGIN").unwrap();
    {
        let mut stmt = conn
            .prepare("INSERT INTO vec_items(rowid, embedding) VALUES (?1, ?2)")
            .unwrap();
        for rowid in 1..=5i64 {
            #[allow(clippy::cast_precision_loss)]
            let fill = rowid as f32 / 10.0;
            stmt.execute(params![rowid, blob(&[fill, fill, fill, fill])])
                .unwrap();
        }
    }
    conn.execute_batch("COMMIT").unwrap();

    let nearest: i64 = conn
        .query_row(
            "SELECT rowid FROM vec_items WHERE embedding MATCH ?1 ORDER BY distance LIMIT 1",
            params![blob(&[0.3, 0.3, 0.3, 0.3])],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(nearest, 3);
}

#[test]
fn table_contents_are_scoped_to_the_connection() {
    let tmpfile = NamedTempFile::new().unwrap();

    {
        let conn = Connection::open(tmpfile.path()).unwrap();
        vectab::register_vector_module(&conn).unwrap();
        conn.execute_batch("CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[2])")
            .unwrap();
        conn.execute(
            "INSERT INTO vec_items(rowid, embedding) VALUES (1, ?1)",
            params![blob(&[1.0, 2.0])],
        )
        .unwrap();
    }

    // The declaration persists in the schema; the records do not outlive
    // the connection that made them.
    let conn = Connection::open(tmpfile.path()).unwrap();
    vectab::register_vector_module(&conn).unwrap();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM vec_items", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn dropping_and_recreating_the_table_works() {
    let conn = Connection::open_in_memory().unwrap();
    vectab::register_vector_module(&conn).unwrap();

    conn.execute_batch("CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[2])")
        .unwrap();
    conn.execute(
        "INSERT INTO vec_items(rowid, embedding) VALUES (1, ?1)",
        params![blob(&[1.0, 2.0])],
    )
    .unwrap();

    conn.execute_batch("DROP TABLE vec_items").unwrap();
    conn.execute_batch("CREATE VIRTUAL TABLE vec_items USING vec0(embedding float[3])")
        .unwrap();

    let count: i64 = conn
        .query_row("SELECT count(*) FROM vec_items", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
