//! Materialize the tourism schema into the configured database and exit.
//!
//! Settings come from the environment (`DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`,
//! `OUTING_SCHEMA`), with `.env` read first.

use outing_schema::{bootstrap, DbConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("outing_schema=info")),
        )
        .init();

    let config = DbConfig::from_env()?;
    let db = bootstrap(&config).await?;
    for entity in &db.model.entities {
        tracing::info!(entity = %entity.name, table = %entity.table_name, "table ready");
    }
    db.pool.close().await;
    Ok(())
}
