use viewpress_core::db::migrations::latest_version;
use viewpress_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "documents");
    assert_index_exists(&conn, "idx_documents_published");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viewpress.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "documents");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn documents_table_rejects_non_json_bodies() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO documents (id, rev, body) VALUES ('x', '1-a', 'not json');",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, name: &str) {
    assert!(sqlite_object_exists(conn, "table", name), "missing table {name}");
}

fn assert_index_exists(conn: &Connection, name: &str) {
    assert!(sqlite_object_exists(conn, "index", name), "missing index {name}");
}

fn sqlite_object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}
