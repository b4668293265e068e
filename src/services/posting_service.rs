//! Posting engine
//!
//! The single write path into the ledger. Validates a posting request,
//! enforces the period gate and the idempotency guard, and persists the
//! entry with its lines as one atomic unit. No other component writes
//! journal data.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::posting_request::{EntrySource, PostingRequest};
use crate::repos::account_repo::{self, AccountError};
use crate::repos::journal_repo::{
    self, JournalEntry, JournalEntryInsert, JournalLine, JournalLineInsert,
};
use crate::repos::period_repo::{self, PeriodStatus};
use crate::validation::{validate_posting_request, ValidationError};

/// Errors that can occur while posting a journal entry
#[derive(Debug, thiserror::Error)]
pub enum PostingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Account '{code}' not found in chart of accounts for org '{org_id}'")]
    UnknownAccount { org_id: String, code: String },

    #[error("No fiscal period covers {date} for org '{org_id}'")]
    NoPeriodForDate {
        org_id: String,
        date: chrono::NaiveDate,
    },

    #[error("Fiscal period {period_id} is locked; posting dated {date} rejected")]
    PeriodLocked {
        period_id: Uuid,
        date: chrono::NaiveDate,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for posting operations
pub type PostingResult<T> = Result<T, PostingError>;

/// A persisted journal entry with its lines
#[derive(Debug, Clone)]
pub struct PostedEntry {
    pub entry: JournalEntry,
    pub lines: Vec<JournalLine>,
    /// True when the idempotency guard matched a prior entry and no new
    /// entry was created
    pub deduplicated: bool,
}

/// Post a journal entry
///
/// Validation order, any failure aborting with no partial write:
/// 1. Lines are non-empty and each has exactly one positive side
/// 2. Total debits equal total credits, exact integer equality
/// 3. Every referenced account exists (and is active) in the org's chart
/// 4. The fiscal period covering the entry date exists and is not locked
/// 5. If `source_ref` is set and the (org_id, source, source_ref) tuple was
///    already posted, the existing entry is returned as a no-op
///
/// The entry and its lines are persisted in a single transaction. A
/// concurrent duplicate that loses the unique-index race is resolved by
/// re-reading the winning entry.
pub async fn post(
    pool: &PgPool,
    request: &PostingRequest,
    posted_by: &str,
) -> PostingResult<PostedEntry> {
    let mut tx = pool.begin().await?;

    match post_in_tx(&mut tx, request, posted_by).await {
        Ok(posted) => {
            tx.commit().await?;

            if !posted.deduplicated {
                tracing::info!(
                    entry_id = %posted.entry.id,
                    org_id = %request.org_id,
                    source = ?request.source,
                    line_count = posted.lines.len(),
                    "Journal entry posted"
                );
            }

            Ok(posted)
        }
        Err(PostingError::Database(err)) if is_source_ref_conflict(&err) => {
            // Lost the insert race to a concurrent duplicate. The winner's
            // entry is the idempotent result.
            drop(tx);

            let source_ref = request
                .source_ref
                .as_deref()
                .ok_or(PostingError::Database(err))?;

            let existing =
                journal_repo::find_by_source_ref(pool, &request.org_id, request.source, source_ref)
                    .await?
                    .ok_or(PostingError::Database(sqlx::Error::RowNotFound))?;

            tracing::info!(
                entry_id = %existing.id,
                org_id = %request.org_id,
                source_ref = %source_ref,
                "Concurrent duplicate posting resolved to existing entry (idempotency)"
            );

            let lines = journal_repo::fetch_lines(pool, existing.id).await?;
            Ok(PostedEntry {
                entry: existing,
                lines,
                deduplicated: true,
            })
        }
        Err(err) => Err(err),
    }
}

/// Post a journal entry inside a caller-supplied transaction
///
/// Runs the same validation pipeline as [`post`]. The period close uses this
/// to make its closing entry and the period status flip a single atomic
/// unit.
pub async fn post_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    request: &PostingRequest,
    posted_by: &str,
) -> PostingResult<PostedEntry> {
    validate_posting_request(request)?;

    // Account existence, in line order
    for code in distinct_account_codes(request) {
        match account_repo::find_active_by_code_tx(tx, &request.org_id, code).await {
            Ok(_) => {}
            Err(AccountError::NotFound { .. }) | Err(AccountError::Inactive { .. }) => {
                return Err(PostingError::UnknownAccount {
                    org_id: request.org_id.clone(),
                    code: code.to_string(),
                });
            }
            Err(AccountError::Database(err)) => return Err(err.into()),
        }
    }

    // Period gate: the covering period must exist and must not be locked.
    // Locked periods reject every posting, closing and reversal entries
    // included.
    let period = period_repo::find_by_date_tx(tx, &request.org_id, request.entry_date).await?;
    match period {
        None => {
            return Err(PostingError::NoPeriodForDate {
                org_id: request.org_id.clone(),
                date: request.entry_date,
            });
        }
        Some(p) if p.status == PeriodStatus::Locked => {
            return Err(PostingError::PeriodLocked {
                period_id: p.id,
                date: request.entry_date,
            });
        }
        Some(_) => {}
    }

    // Idempotency guard for at-least-once callers
    if let Some(source_ref) = request.source_ref.as_deref() {
        if let Some(existing) =
            journal_repo::find_by_source_ref_tx(tx, &request.org_id, request.source, source_ref)
                .await?
        {
            tracing::info!(
                entry_id = %existing.id,
                org_id = %request.org_id,
                source = ?request.source,
                source_ref = %source_ref,
                "Duplicate posting, returning existing entry (idempotency)"
            );
            let lines = journal_repo::fetch_lines_tx(tx, existing.id).await?;
            return Ok(PostedEntry {
                entry: existing,
                lines,
                deduplicated: true,
            });
        }
    }

    let entry_id = Uuid::new_v4();
    let created_at = Utc::now();

    let entry_insert = JournalEntryInsert {
        id: entry_id,
        org_id: request.org_id.clone(),
        branch_id: request.branch_id,
        entry_date: request.entry_date,
        memo: request.memo.clone(),
        source: request.source,
        source_ref: request.source_ref.clone(),
        reverses_entry_id: request.reverses_entry_id,
        posted_by: posted_by.to_string(),
        created_at,
    };
    journal_repo::insert_entry(tx, &entry_insert).await?;

    let line_inserts: Vec<JournalLineInsert> = request
        .lines
        .iter()
        .enumerate()
        .map(|(idx, line)| JournalLineInsert {
            id: Uuid::new_v4(),
            line_no: (idx + 1) as i32,
            account_code: line.account_code.clone(),
            branch_id: line.branch_id,
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            metadata: line.metadata.clone(),
        })
        .collect();
    journal_repo::bulk_insert_lines(tx, entry_id, &line_inserts).await?;

    let entry = JournalEntry {
        id: entry_id,
        org_id: entry_insert.org_id,
        branch_id: entry_insert.branch_id,
        entry_date: entry_insert.entry_date,
        memo: entry_insert.memo,
        source: entry_insert.source,
        source_ref: entry_insert.source_ref,
        reverses_entry_id: entry_insert.reverses_entry_id,
        posted_by: entry_insert.posted_by,
        created_at,
    };
    let lines = line_inserts
        .into_iter()
        .map(|line| JournalLine {
            id: line.id,
            journal_entry_id: entry_id,
            line_no: line.line_no,
            account_code: line.account_code,
            branch_id: line.branch_id,
            debit_minor: line.debit_minor,
            credit_minor: line.credit_minor,
            metadata: line.metadata,
        })
        .collect();

    Ok(PostedEntry {
        entry,
        lines,
        deduplicated: false,
    })
}

/// Post a manual journal entry
///
/// Thin wrapper over [`post`] that forces `source = MANUAL`. This is the
/// only posting path intended for direct human invocation; callers must
/// hold elevated financial-write privilege, which is checked upstream and
/// treated here as an opaque precondition.
pub async fn post_manual(
    pool: &PgPool,
    request: &PostingRequest,
    posted_by: &str,
) -> PostingResult<PostedEntry> {
    let manual_request = PostingRequest {
        source: EntrySource::Manual,
        ..request.clone()
    };
    post(pool, &manual_request, posted_by).await
}

/// Distinct account codes in line order of first appearance
fn distinct_account_codes(request: &PostingRequest) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        if !seen.contains(&line.account_code.as_str()) {
            seen.push(line.account_code.as_str());
        }
    }
    seen
}

/// Whether a database error is a unique violation of the idempotency index
fn is_source_ref_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.constraint())
        .map(|constraint| constraint == "uq_journal_entries_source_ref")
        .unwrap_or(false)
}
