use rusqlite::{Connection, params};
use uuid::Uuid;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    vectab::register_all(&conn).unwrap();
    conn
}

#[test]
fn uuid_generates_canonical_v4_text() {
    let conn = setup();
    let text: String = conn.query_row("SELECT uuid()", [], |row| row.get(0)).unwrap();

    let groups: Vec<&str> = text.split('-').collect();
    assert_eq!(groups.len(), 5);
    assert_eq!(groups[0].len(), 8);
    assert_eq!(groups[1].len(), 4);
    assert_eq!(groups[2].len(), 4);
    assert_eq!(groups[3].len(), 4);
    assert_eq!(groups[4].len(), 12);

    let parsed = Uuid::try_parse(&text).unwrap();
    assert_eq!(parsed.get_version_num(), 4);
}

#[test]
fn uuid_calls_are_distinct() {
    let conn = setup();
    let (a, b): (String, String) = conn
        .query_row("SELECT uuid(), uuid()", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn uuid_blob_and_str_convert_both_ways() {
    let conn = setup();
    let id = Uuid::new_v4();
    let text = id.hyphenated().to_string();

    let blob: Vec<u8> = conn
        .query_row("SELECT uuid_blob(?1)", params![text], |row| row.get(0))
        .unwrap();
    assert_eq!(blob.as_slice(), id.as_bytes());

    let round_tripped: String = conn
        .query_row("SELECT uuid_str(uuid_blob(?1))", params![text], |row| row.get(0))
        .unwrap();
    assert_eq!(round_tripped, text);
}

#[test]
fn uuid_converters_return_null_for_garbage() {
    let conn = setup();
    let result: Option<String> = conn
        .query_row("SELECT uuid_str('not-a-uuid')", [], |row| row.get(0))
        .unwrap();
    assert!(result.is_none());

    let result: Option<Vec<u8>> = conn
        .query_row("SELECT uuid_blob(x'0011')", [], |row| row.get(0))
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn generate_series_steps_inclusively() {
    let conn = setup();
    let values: Vec<i64> = conn
        .prepare("SELECT value FROM generate_series(10, 20, 5)")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(values, vec![10, 15, 20]);
}

#[test]
fn generate_series_defaults_to_step_one() {
    let conn = setup();
    let values: Vec<i64> = conn
        .prepare("SELECT value FROM generate_series(1, 5)")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[test]
fn generate_series_descending_hits_the_same_members() {
    let conn = setup();
    let values: Vec<i64> = conn
        .prepare("SELECT value FROM generate_series(10, 20, 5) ORDER BY value DESC")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .map(Result::unwrap)
        .collect();
    assert_eq!(values, vec![20, 15, 10]);
}

#[test]
fn generate_series_with_inverted_bounds_is_empty() {
    let conn = setup();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM generate_series(5, 1)", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
