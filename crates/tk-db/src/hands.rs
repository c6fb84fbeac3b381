use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

use tk_reconcile::{HandStore, ReadError};
use tk_schemas::HandRecord;

/// Reads the latest hand per table from `hands`.
#[derive(Clone)]
pub struct PgHandStore {
    pool: PgPool,
}

impl PgHandStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_last(&self, table_addr: &str) -> Result<Option<HandRecord>> {
        let row = sqlx::query(
            r#"
            select record
            from hands
            where table_addr = $1
            order by hand_id desc
            limit 1
            "#,
        )
        .bind(table_addr)
        .fetch_optional(&self.pool)
        .await
        .context("fetch last hand failed")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record: serde_json::Value = row.try_get("record")?;
        let hand: HandRecord = serde_json::from_value(record).context("hand record decode failed")?;
        Ok(Some(hand))
    }
}

#[async_trait]
impl HandStore for PgHandStore {
    async fn get_last_hand(&self, table_addr: &str) -> std::result::Result<Option<HandRecord>, ReadError> {
        self.fetch_last(table_addr)
            .await
            .map_err(|e| ReadError::store(table_addr, format!("{e:#}")))
    }
}

/// Insert or replace one hand record. `changed` must not go backwards.
pub async fn upsert_hand(pool: &PgPool, hand: &HandRecord) -> Result<()> {
    let record = serde_json::to_value(hand).context("hand record encode failed")?;
    let hand_id = i64::try_from(hand.hand_id).context("hand_id out of range")?;

    let res = sqlx::query(
        r#"
        insert into hands (table_addr, hand_id, state, changed, record)
        values ($1, $2, $3, $4, $5)
        on conflict (table_addr, hand_id) do update
           set state = excluded.state,
               changed = excluded.changed,
               record = excluded.record,
               updated_at = now()
         where hands.changed <= excluded.changed
        "#,
    )
    .bind(&hand.table_addr)
    .bind(hand_id)
    .bind(hand.state.as_str())
    .bind(hand.changed)
    .bind(record)
    .execute(pool)
    .await
    .context("upsert hand failed")?;

    if res.rows_affected() == 0 {
        anyhow::bail!(
            "stale hand write rejected: table={} hand_id={} changed={}",
            hand.table_addr,
            hand.hand_id,
            hand.changed
        );
    }
    Ok(())
}
