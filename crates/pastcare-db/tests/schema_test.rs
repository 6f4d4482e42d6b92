//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    pastcare_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("church"), "missing church table");
    assert!(info_str.contains("user"), "missing user table");
    assert!(
        info_str.contains("refresh_token"),
        "missing refresh_token table"
    );
    assert!(
        info_str.contains("login_attempt"),
        "missing login_attempt table"
    );
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    pastcare_db::run_migrations(&db).await.unwrap();
    pastcare_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn church_names_are_unique_ignoring_case() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pastcare_db::run_migrations(&db).await.unwrap();

    db.query("CREATE church SET name = 'Grace Chapel', name_key = 'grace chapel'")
        .await
        .unwrap()
        .check()
        .unwrap();
    let duplicate = db
        .query("CREATE church SET name = 'GRACE CHAPEL', name_key = 'grace chapel'")
        .await
        .unwrap()
        .check();
    assert!(duplicate.is_err(), "name_key index should reject duplicates");
}
