//! tk-db
//!
//! Postgres adapters:
//! - [`PgHandStore`]: latest off-chain hand per table (reconciler read side).
//! - [`PgOutboxPublisher`]: durable control outbox (publish side).
//!
//! Queries are runtime-checked (`sqlx::query` / `query_as`); no database is
//! needed at compile time.

mod hands;
mod outbox;

pub use hands::{upsert_hand, PgHandStore};
pub use outbox::{outbox_count, outbox_recent, OutboxRow, PgOutboxPublisher};

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub const ENV_DB_URL: &str = "TK_DATABASE_URL";

/// Connect to Postgres using `TK_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url, 10).await
}

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct DbStatus {
    pub ok: bool,
    pub has_hands_table: bool,
    pub has_outbox_table: bool,
}

/// Connectivity + schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_hands_table: table_exists(pool, "hands").await?,
        has_outbox_table: table_exists(pool, "control_outbox").await?,
    })
}

async fn table_exists(pool: &PgPool, name: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = $1
        )
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .with_context(|| format!("status table-exists query failed: {name}"))?;
    Ok(exists)
}
