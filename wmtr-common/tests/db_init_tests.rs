//! Tests for database initialization
//!
//! Covers automatic creation on first run, idempotent re-initialization,
//! and the referential-integrity pragmas the readings table relies on.

use tempfile::TempDir;
use wmtr_common::db::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("wmtr.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("wmtr.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Second init must be a no-op open, not a failure
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("wmtr.db")).await.unwrap();

    for table in ["users", "sessions", "buildings", "rooms", "meter_readings"] {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, 1, "Missing table: {}", table);
    }
}

#[tokio::test]
async fn test_foreign_keys_on_for_every_pooled_connection() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("wmtr.db")).await.unwrap();

    // Hold two connections at once so the second cannot be a reuse of
    // the first; both must have the pragma applied
    let mut c1 = pool.acquire().await.unwrap();
    let mut c2 = pool.acquire().await.unwrap();

    for conn in [&mut c1, &mut c2] {
        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut **conn)
            .await
            .unwrap();
        assert_eq!(fk, 1, "foreign_keys must be on for every connection");
    }
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("wmtr.db")).await.unwrap();

    // A reading pointing at nonexistent tenant entities must be rejected
    let result = sqlx::query(
        "INSERT INTO meter_readings (guid, user_id, building_id, room_id, image_url, meter_value)
         VALUES ('r1', 'nobody', 'nowhere', 'norroom', 'http://x/y.jpg', 0)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Expected foreign key violation");
}
