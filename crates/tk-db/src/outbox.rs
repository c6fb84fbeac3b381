use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use tk_bus::{PublishError, Publisher};
use tk_schemas::{ControlEnvelope, LiveUpdate};

/// Durable publisher: one `control_outbox` row per control event.
///
/// Live updates are UI fan-out only and are not persisted.
#[derive(Clone)]
pub struct PgOutboxPublisher {
    pool: PgPool,
}

impl PgOutboxPublisher {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, env: &ControlEnvelope) -> Result<()> {
        sqlx::query(
            r#"
            insert into control_outbox (event_id, ts_utc, subject, table_addr, payload)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(env.event_id)
        .bind(env.ts_utc)
        .bind(env.subject.as_str())
        .bind(&env.table_addr)
        .bind(&env.payload)
        .execute(&self.pool)
        .await
        .context("control outbox insert failed")?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for PgOutboxPublisher {
    async fn publish_envelope(&self, env: &ControlEnvelope) -> std::result::Result<(), PublishError> {
        self.enqueue(env)
            .await
            .map_err(|e| PublishError::Transport(format!("{e:#}")))?;
        debug!(event_id = %env.event_id, subject = %env.subject, table = %env.table_addr, "control event enqueued");
        Ok(())
    }

    async fn publish_live(&self, _update: &LiveUpdate) -> std::result::Result<(), PublishError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub event_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub subject: String,
    pub table_addr: String,
    pub payload: serde_json::Value,
}

/// Most recent outbox rows for one table, newest first.
pub async fn outbox_recent(pool: &PgPool, table_addr: &str, limit: i64) -> Result<Vec<OutboxRow>> {
    let rows = sqlx::query(
        r#"
        select event_id, ts_utc, subject, table_addr, payload
        from control_outbox
        where table_addr = $1
        order by created_at desc, ts_utc desc
        limit $2
        "#,
    )
    .bind(table_addr)
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("outbox_recent query failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(OutboxRow {
            event_id: row.try_get("event_id")?,
            ts_utc: row.try_get("ts_utc")?,
            subject: row.try_get("subject")?,
            table_addr: row.try_get("table_addr")?,
            payload: row.try_get("payload")?,
        });
    }
    Ok(out)
}

/// Rows enqueued for one table.
pub async fn outbox_count(pool: &PgPool, table_addr: &str) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as::<_, (i64,)>(
        "select count(*)::bigint from control_outbox where table_addr = $1",
    )
    .bind(table_addr)
    .fetch_one(pool)
    .await
    .context("outbox_count query failed")?;
    Ok(n)
}
