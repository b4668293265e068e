//! Fiscal period lifecycle service
//!
//! Owns the period state machine: open -> closed -> locked, with no skips
//! and no regression. Closing computes and posts the closing entry and
//! flips the status in one transaction; a crash can never leave one without
//! the other, and retrying a failed close is safe because the closing entry
//! is keyed by the period id.

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::posting_request::{EntrySource, PostingRequest};
use crate::repos::period_repo::{self, FiscalPeriod, PeriodStatus};
use crate::repos::report_query_repo;
use crate::services::closing_entries::build_closing_lines;
use crate::services::posting_service::{self, PostingError};

/// Errors that can occur during period lifecycle operations
#[derive(Debug, Error)]
pub enum PeriodLifecycleError {
    #[error("Fiscal period not found: {0}")]
    PeriodNotFound(Uuid),

    #[error("Invalid period state: period {period_id} is {actual:?}, expected {expected:?}")]
    InvalidPeriodState {
        period_id: Uuid,
        expected: PeriodStatus,
        actual: PeriodStatus,
    },

    #[error("Closing entry rejected: {0}")]
    Posting(#[from] PostingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Close a fiscal period
///
/// Steps, all inside one transaction serialized per period by a row-level
/// lock:
/// 1. Lock the period row; status must be Open, else `InvalidPeriodState`
///    (a concurrent close observes this after the first one commits)
/// 2. Aggregate temporary-account balances per branch over the period's
///    date range
/// 3. Build the closing lines that zero them into `retained_earnings_code`
/// 4. Post the closing entry through the posting engine with
///    `source = PERIOD_CLOSE` and `source_ref = period_id` (a period with
///    no temporary activity closes without an entry)
/// 5. Seal the period totals into a deterministic close hash and flip the
///    status to Closed with actor and timestamp
pub async fn close_period(
    pool: &PgPool,
    org_id: &str,
    period_id: Uuid,
    actor_id: &str,
    retained_earnings_code: &str,
) -> Result<FiscalPeriod, PeriodLifecycleError> {
    let mut tx = pool.begin().await?;

    let period = period_repo::lock_row_tx(&mut tx, org_id, period_id)
        .await?
        .ok_or(PeriodLifecycleError::PeriodNotFound(period_id))?;

    if period.status != PeriodStatus::Open {
        return Err(PeriodLifecycleError::InvalidPeriodState {
            period_id,
            expected: PeriodStatus::Open,
            actual: period.status,
        });
    }

    let balances = report_query_repo::temporary_balances_by_branch_tx(
        &mut tx,
        org_id,
        period.period_start,
        period.period_end,
    )
    .await?;

    let computation = build_closing_lines(&balances, retained_earnings_code);

    if !computation.lines.is_empty() {
        let request = PostingRequest {
            org_id: org_id.to_string(),
            branch_id: None,
            entry_date: period.period_end,
            memo: format!(
                "Period close {} to {}",
                period.period_start, period.period_end
            ),
            source: EntrySource::PeriodClose,
            source_ref: Some(period_id.to_string()),
            reverses_entry_id: None,
            lines: computation.lines,
        };
        posting_service::post_in_tx(&mut tx, &request, actor_id).await?;
    }

    // Seal what was closed: totals include the closing entry itself.
    let totals = report_query_repo::period_totals_tx(
        &mut tx,
        org_id,
        period.period_start,
        period.period_end,
    )
    .await?;
    let close_hash = compute_close_hash(
        org_id,
        period_id,
        totals.journal_count,
        totals.total_debits_minor,
        totals.total_credits_minor,
    );

    let closed = period_repo::mark_closed_tx(&mut tx, period_id, actor_id, &close_hash).await?;

    tx.commit().await?;

    tracing::info!(
        period_id = %period_id,
        org_id = %org_id,
        closed_by = %actor_id,
        net_income_minor = computation.net_income_minor,
        "Fiscal period closed"
    );

    Ok(closed)
}

/// Lock a fiscal period
///
/// Precondition: status is Closed. After locking, the posting engine
/// rejects every entry dated within this period, permanently.
pub async fn lock_period(
    pool: &PgPool,
    org_id: &str,
    period_id: Uuid,
    actor_id: &str,
) -> Result<FiscalPeriod, PeriodLifecycleError> {
    let mut tx = pool.begin().await?;

    let period = period_repo::lock_row_tx(&mut tx, org_id, period_id)
        .await?
        .ok_or(PeriodLifecycleError::PeriodNotFound(period_id))?;

    if period.status != PeriodStatus::Closed {
        return Err(PeriodLifecycleError::InvalidPeriodState {
            period_id,
            expected: PeriodStatus::Closed,
            actual: period.status,
        });
    }

    let locked = period_repo::mark_locked_tx(&mut tx, period_id, actor_id).await?;

    tx.commit().await?;

    tracing::info!(
        period_id = %period_id,
        org_id = %org_id,
        locked_by = %actor_id,
        "Fiscal period locked"
    );

    Ok(locked)
}

/// Compute the deterministic close hash for a period
///
/// SHA-256 over pipe-separated inputs: org_id, period_id, journal count,
/// total debits, total credits. Recomputing the hash later and comparing it
/// to the sealed value detects both tampering and late postings against a
/// closed (not yet locked) period.
pub fn compute_close_hash(
    org_id: &str,
    period_id: Uuid,
    journal_count: i64,
    total_debits_minor: i64,
    total_credits_minor: i64,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(org_id.as_bytes());
    hasher.update(b"|");
    hasher.update(period_id.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(journal_count.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(total_debits_minor.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(total_credits_minor.to_string().as_bytes());

    format!("{:x}", hasher.finalize())
}
