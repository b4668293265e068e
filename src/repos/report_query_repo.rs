//! Repository for report query operations
//!
//! Provides read-only, org-scoped aggregation over journal lines. Balances
//! are always derived by aggregation at read time; there is no running
//! balance counter anywhere, which is what makes concurrent postings safe
//! without account-level locking.

use chrono::NaiveDate;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::posting_request::EntrySource;
use crate::repos::account_repo::AccountType;

/// Errors that can occur during report query operations
#[derive(Debug, Error)]
pub enum ReportQueryError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid pagination parameters: limit={limit}, offset={offset}")]
    InvalidPagination { limit: i64, offset: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Aggregated debit/credit totals for one account (optionally per branch)
///
/// The shared row shape consumed by the trial balance, income statement and
/// balance sheet builders, and by the period close computation. Every
/// statement deriving from the same rows is what guarantees cross-caller
/// alignment.
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct AccountBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub branch_id: Option<Uuid>,
    pub debit_total_minor: i64,
    pub credit_total_minor: i64,
}

impl AccountBalanceRow {
    /// Net balance on the debit side (negative means a net credit balance).
    pub fn net_debit_minor(&self) -> i64 {
        self.debit_total_minor - self.credit_total_minor
    }
}

/// Aggregate per-account balances over all lines dated on or before `as_of`
///
/// When `branch_id` is given, only lines attributed to that branch are
/// included (line-level branch overrides the entry-level branch). Rows are
/// grouped by account only; the `branch_id` column echoes the filter.
pub async fn balances_as_of(
    pool: &PgPool,
    org_id: &str,
    as_of: NaiveDate,
    branch_id: Option<Uuid>,
) -> Result<Vec<AccountBalanceRow>, ReportQueryError> {
    let rows = sqlx::query_as::<_, AccountBalanceRow>(
        r#"
        SELECT
            a.code AS account_code,
            a.name AS account_name,
            a.type AS account_type,
            $3::UUID AS branch_id,
            COALESCE(SUM(jl.debit_minor), 0)::BIGINT AS debit_total_minor,
            COALESCE(SUM(jl.credit_minor), 0)::BIGINT AS credit_total_minor
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        INNER JOIN accounts a ON a.org_id = je.org_id AND a.code = jl.account_code
        WHERE je.org_id = $1
          AND je.entry_date <= $2
          AND ($3::UUID IS NULL OR COALESCE(jl.branch_id, je.branch_id) = $3)
        GROUP BY a.code, a.name, a.type
        ORDER BY a.code
        "#,
    )
    .bind(org_id)
    .bind(as_of)
    .bind(branch_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate per-account balances over lines dated within [from, to]
pub async fn activity_between(
    pool: &PgPool,
    org_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    branch_id: Option<Uuid>,
) -> Result<Vec<AccountBalanceRow>, ReportQueryError> {
    if from > to {
        return Err(ReportQueryError::InvalidDateRange { start: from, end: to });
    }

    let rows = sqlx::query_as::<_, AccountBalanceRow>(
        r#"
        SELECT
            a.code AS account_code,
            a.name AS account_name,
            a.type AS account_type,
            $4::UUID AS branch_id,
            COALESCE(SUM(jl.debit_minor), 0)::BIGINT AS debit_total_minor,
            COALESCE(SUM(jl.credit_minor), 0)::BIGINT AS credit_total_minor
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        INNER JOIN accounts a ON a.org_id = je.org_id AND a.code = jl.account_code
        WHERE je.org_id = $1
          AND je.entry_date >= $2
          AND je.entry_date <= $3
          AND ($4::UUID IS NULL OR COALESCE(jl.branch_id, je.branch_id) = $4)
        GROUP BY a.code, a.name, a.type
        ORDER BY a.code
        "#,
    )
    .bind(org_id)
    .bind(from)
    .bind(to)
    .bind(branch_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Aggregate temporary-account (revenue, COGS, expense) balances per branch
/// over lines dated within [from, to], within a transaction
///
/// Used by the period close computation. Grouping is per (account, branch)
/// so the closing entry can offset each branch against retained earnings
/// separately. Reads run in the close transaction so a racing posting is
/// either fully included or fully excluded.
pub async fn temporary_balances_by_branch_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<AccountBalanceRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountBalanceRow>(
        r#"
        SELECT
            a.code AS account_code,
            a.name AS account_name,
            a.type AS account_type,
            COALESCE(jl.branch_id, je.branch_id) AS branch_id,
            COALESCE(SUM(jl.debit_minor), 0)::BIGINT AS debit_total_minor,
            COALESCE(SUM(jl.credit_minor), 0)::BIGINT AS credit_total_minor
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        INNER JOIN accounts a ON a.org_id = je.org_id AND a.code = jl.account_code
        WHERE je.org_id = $1
          AND je.entry_date >= $2
          AND je.entry_date <= $3
          AND a.type = ANY($4)
        GROUP BY a.code, a.name, a.type, COALESCE(jl.branch_id, je.branch_id)
        ORDER BY COALESCE(jl.branch_id, je.branch_id) NULLS FIRST, a.code
        "#,
    )
    .bind(org_id)
    .bind(from)
    .bind(to)
    .bind(vec![AccountType::Revenue, AccountType::Cogs, AccountType::Expense])
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}

/// Journal-wide totals for a date range, within a transaction
#[derive(Debug, Clone, FromRow)]
pub struct PeriodTotals {
    pub journal_count: i64,
    pub total_debits_minor: i64,
    pub total_credits_minor: i64,
}

/// Count entries and sum debit/credit totals over [from, to]
///
/// Inputs to the deterministic close hash sealed onto a period at close.
pub async fn period_totals_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<PeriodTotals, sqlx::Error> {
    let totals = sqlx::query_as::<_, PeriodTotals>(
        r#"
        SELECT
            COUNT(DISTINCT je.id)::BIGINT AS journal_count,
            COALESCE(SUM(jl.debit_minor), 0)::BIGINT AS total_debits_minor,
            COALESCE(SUM(jl.credit_minor), 0)::BIGINT AS total_credits_minor
        FROM journal_entries je
        LEFT JOIN journal_lines jl ON jl.journal_entry_id = je.id
        WHERE je.org_id = $1
          AND je.entry_date >= $2
          AND je.entry_date <= $3
        "#,
    )
    .bind(org_id)
    .bind(from)
    .bind(to)
    .fetch_one(&mut **tx)
    .await?;

    Ok(totals)
}

/// Count PERIOD_CLOSE entries keyed to a period's idempotency ref
pub async fn count_close_entries(
    pool: &PgPool,
    org_id: &str,
    period_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM journal_entries
        WHERE org_id = $1 AND source = $2 AND source_ref = $3
        "#,
    )
    .bind(org_id)
    .bind(EntrySource::PeriodClose)
    .bind(period_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// A single journal line for an account, with its entry header fields
#[derive(Debug, Clone, FromRow)]
pub struct AccountActivityLine {
    pub entry_id: Uuid,
    pub entry_date: NaiveDate,
    pub memo: String,
    pub source: EntrySource,
    pub line_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub debit_minor: i64,
    pub credit_minor: i64,
}

/// Query line-level activity for a single account over a date range
///
/// Returns lines ordered by entry_date ASC, line_no ASC. Bounded by
/// limit/offset; the audit companion to the aggregated statements.
pub async fn account_activity(
    pool: &PgPool,
    org_id: &str,
    account_code: &str,
    from: NaiveDate,
    to: NaiveDate,
    limit: i64,
    offset: i64,
) -> Result<Vec<AccountActivityLine>, ReportQueryError> {
    if from > to {
        return Err(ReportQueryError::InvalidDateRange { start: from, end: to });
    }

    if limit <= 0 || offset < 0 {
        return Err(ReportQueryError::InvalidPagination { limit, offset });
    }

    let lines = sqlx::query_as::<_, AccountActivityLine>(
        r#"
        SELECT
            je.id AS entry_id,
            je.entry_date,
            je.memo,
            je.source,
            jl.id AS line_id,
            COALESCE(jl.branch_id, je.branch_id) AS branch_id,
            jl.debit_minor,
            jl.credit_minor
        FROM journal_entries je
        INNER JOIN journal_lines jl ON jl.journal_entry_id = je.id
        WHERE je.org_id = $1
          AND jl.account_code = $2
          AND je.entry_date >= $3
          AND je.entry_date <= $4
        ORDER BY je.entry_date ASC, je.created_at ASC, jl.line_no ASC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(org_id)
    .bind(account_code)
    .bind(from)
    .bind(to)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}
