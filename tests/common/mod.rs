//! Shared setup for tests that need PostgreSQL. Each call gets its own schema.
//! Set `TEST_DATABASE_URL` to run them; without it the tests return early.

#![allow(dead_code)]

use outing_schema::config::resolve;
use outing_schema::sql::quote_ident;
use outing_schema::{apply_migrations, connect, ensure_database_exists, tourism, Database, DbConfig};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SCHEMA: AtomicUsize = AtomicUsize::new(0);

pub fn test_config() -> Option<DbConfig> {
    let database_url = std::env::var("TEST_DATABASE_URL").ok()?;
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let schema = format!(
        "outing_test_{}_{}_{}",
        std::process::id(),
        NEXT_SCHEMA.fetch_add(1, Ordering::SeqCst),
        nanos
    );
    Some(DbConfig {
        database_url,
        max_connections: 2,
        schema,
    })
}

/// Connect and materialize the tourism schema into a fresh PostgreSQL schema.
pub async fn test_db() -> Option<Database> {
    let Some(config) = test_config() else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return None;
    };
    ensure_database_exists(&config.database_url).await.expect("create database");
    let pool = connect(&config).await.expect("connect");
    let registry = tourism::registry_in_schema(&config.schema).expect("registry");
    apply_migrations(&pool, &registry).await.expect("materialize");
    let model = resolve(&registry).expect("resolve");
    Some(Database::new(pool, model))
}

pub fn schema_of(db: &Database) -> String {
    db.model.entities[0].schema_name.clone()
}

pub async fn drop_schema(db: Database) {
    let sql = format!("DROP SCHEMA IF EXISTS {} CASCADE", quote_ident(&schema_of(&db)));
    sqlx::query(&sql).execute(&db.pool).await.expect("drop schema");
    db.pool.close().await;
}
