use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::config;
use crate::store::error::StoreError;

/// Open the application pool from DATABASE_URL.
///
/// One database for all tenants; isolation happens at the row level through
/// the query scoping layer, not through per-tenant databases.
pub async fn connect() -> Result<PgPool, StoreError> {
    let raw = std::env::var("DATABASE_URL")
        .map_err(|_| StoreError::ConfigMissing("DATABASE_URL"))?;
    let parsed = url::Url::parse(&raw).map_err(|_| StoreError::InvalidDatabaseUrl)?;

    let db = &config::config().database;
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .acquire_timeout(Duration::from_secs(db.connection_timeout_secs))
        .connect(&raw)
        .await?;

    info!(
        "Connected to database {} (max_connections={})",
        parsed.path().trim_start_matches('/'),
        db.max_connections
    );
    Ok(pool)
}

/// Ping the pool to ensure connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
