//! Repository for fiscal period operations
//!
//! Provides database access for the fiscal period lifecycle. Status is the
//! only mutable field in the ledger schema and moves monotonically
//! open -> closed -> locked.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Fiscal period status matching database period_status
#[derive(Debug, Clone, Copy, sqlx::Type, Serialize, Deserialize, PartialEq, Eq)]
#[sqlx(type_name = "period_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Open,
    Closed,
    Locked,
}

/// Fiscal period model
#[derive(Debug, Clone, FromRow)]
pub struct FiscalPeriod {
    pub id: Uuid,
    pub org_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: PeriodStatus,
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub close_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Find the fiscal period that contains the given date for an org
/// Returns None if no period covers the date
pub async fn find_by_date(
    pool: &PgPool,
    org_id: &str,
    date: NaiveDate,
) -> Result<Option<FiscalPeriod>, sqlx::Error> {
    let period = sqlx::query_as::<_, FiscalPeriod>(
        r#"
        SELECT id, org_id, period_start, period_end, status,
               closed_by, closed_at, locked_by, locked_at, close_hash, created_at
        FROM fiscal_periods
        WHERE org_id = $1
          AND period_start <= $2
          AND period_end >= $2
        LIMIT 1
        "#,
    )
    .bind(org_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(period)
}

/// Find the fiscal period that contains the given date within a transaction
pub async fn find_by_date_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    date: NaiveDate,
) -> Result<Option<FiscalPeriod>, sqlx::Error> {
    let period = sqlx::query_as::<_, FiscalPeriod>(
        r#"
        SELECT id, org_id, period_start, period_end, status,
               closed_by, closed_at, locked_by, locked_at, close_hash, created_at
        FROM fiscal_periods
        WHERE org_id = $1
          AND period_start <= $2
          AND period_end >= $2
        LIMIT 1
        "#,
    )
    .bind(org_id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(period)
}

/// Find a fiscal period by id
pub async fn find_by_id(
    pool: &PgPool,
    org_id: &str,
    period_id: Uuid,
) -> Result<Option<FiscalPeriod>, sqlx::Error> {
    let period = sqlx::query_as::<_, FiscalPeriod>(
        r#"
        SELECT id, org_id, period_start, period_end, status,
               closed_by, closed_at, locked_by, locked_at, close_hash, created_at
        FROM fiscal_periods
        WHERE id = $1 AND org_id = $2
        "#,
    )
    .bind(period_id)
    .bind(org_id)
    .fetch_optional(pool)
    .await?;

    Ok(period)
}

/// Fetch a fiscal period row with a row-level lock (SELECT ... FOR UPDATE)
///
/// Serializes concurrent close/lock transitions on the same period: the
/// second caller blocks until the first commits, then observes the new
/// status.
pub async fn lock_row_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    period_id: Uuid,
) -> Result<Option<FiscalPeriod>, sqlx::Error> {
    let period = sqlx::query_as::<_, FiscalPeriod>(
        r#"
        SELECT id, org_id, period_start, period_end, status,
               closed_by, closed_at, locked_by, locked_at, close_hash, created_at
        FROM fiscal_periods
        WHERE id = $1 AND org_id = $2
        FOR UPDATE
        "#,
    )
    .bind(period_id)
    .bind(org_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(period)
}

/// Transition a period to closed, recording the actor and close hash
pub async fn mark_closed_tx(
    tx: &mut Transaction<'_, Postgres>,
    period_id: Uuid,
    closed_by: &str,
    close_hash: &str,
) -> Result<FiscalPeriod, sqlx::Error> {
    let period = sqlx::query_as::<_, FiscalPeriod>(
        r#"
        UPDATE fiscal_periods
        SET status = 'closed', closed_by = $2, closed_at = NOW(), close_hash = $3
        WHERE id = $1
        RETURNING id, org_id, period_start, period_end, status,
                  closed_by, closed_at, locked_by, locked_at, close_hash, created_at
        "#,
    )
    .bind(period_id)
    .bind(closed_by)
    .bind(close_hash)
    .fetch_one(&mut **tx)
    .await?;

    Ok(period)
}

/// Transition a period to locked, recording the actor
pub async fn mark_locked_tx(
    tx: &mut Transaction<'_, Postgres>,
    period_id: Uuid,
    locked_by: &str,
) -> Result<FiscalPeriod, sqlx::Error> {
    let period = sqlx::query_as::<_, FiscalPeriod>(
        r#"
        UPDATE fiscal_periods
        SET status = 'locked', locked_by = $2, locked_at = NOW()
        WHERE id = $1
        RETURNING id, org_id, period_start, period_end, status,
                  closed_by, closed_at, locked_by, locked_at, close_hash, created_at
        "#,
    )
    .bind(period_id)
    .bind(locked_by)
    .fetch_one(&mut **tx)
    .await?;

    Ok(period)
}
