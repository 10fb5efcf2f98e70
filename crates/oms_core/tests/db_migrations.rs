use chrono::{TimeZone, Utc};
use oms_core::db::migrations::latest_version;
use oms_core::db::{open_db, open_db_in_memory, recreate_schema, DbError};
use oms_core::{ListQuery, Organization, Organizations, RecordStore, SqliteConnector};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "organizations_data");
    assert_table_exists(&conn, "users_data");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oms.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "organizations_data");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
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
fn recreate_schema_wipes_rows_and_keeps_version() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO organizations_data (
            organizations_id, organization_name, created_by_password,
            created_at, created_by, updated_at, updated_by
        ) VALUES ('o1', 'Acme', 'hash', 0, 'a@x.com', 0, 'a@x.com');",
        [],
    )
    .unwrap();

    recreate_schema(&mut conn).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM organizations_data;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn file_connector_persists_across_sessions_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oms.db");
    let created_at = Utc.with_ymd_and_hms(2024, 11, 29, 8, 0, 0).unwrap();

    {
        let connector = SqliteConnector::open(&path).unwrap();
        let store = RecordStore::<Organizations, _>::new(&connector);
        store
            .create(Organization::new_fields(
                "o1", "Acme", "hash", created_at, "a@x.com",
            ))
            .unwrap();
        assert!(store.get("o1").unwrap().is_some());
    }

    let connector = SqliteConnector::open(&path).unwrap();
    let store = RecordStore::<Organizations, _>::new(&connector);
    let record = store.get("o1").unwrap().unwrap();
    assert_eq!(record.timestamp("created_at").unwrap(), created_at);

    let folded = store
        .list(&ListQuery::new().filter("organization_name__icontains", "ACME"))
        .unwrap();
    assert_eq!(folded.total_count, 1);

    connector.recreate_schema().unwrap();
    assert!(store.get("o1").unwrap().is_none());
}

#[test]
fn in_memory_connectors_are_isolated() {
    let first = SqliteConnector::in_memory().unwrap();
    let second = SqliteConnector::in_memory().unwrap();
    let created_at = Utc.with_ymd_and_hms(2024, 11, 29, 8, 0, 0).unwrap();

    RecordStore::<Organizations, _>::new(&first)
        .create(Organization::new_fields(
            "o1", "Acme", "hash", created_at, "a@x.com",
        ))
        .unwrap();

    assert!(RecordStore::<Organizations, _>::new(&second)
        .get("o1")
        .unwrap()
        .is_none());
}

#[test]
fn is_deleted_rejects_values_other_than_zero_or_one() {
    let conn = open_db_in_memory().unwrap();
    let result = conn.execute(
        "INSERT INTO users_data (
            users_id, user_email, user_password, user_type,
            created_at, created_by, updated_at, updated_by, is_deleted
        ) VALUES ('u1', 'a@x.com', 'hash', 'ADMIN', 0, 'a@x.com', 0, 'a@x.com', 2);",
        [],
    );
    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
