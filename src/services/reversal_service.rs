//! Reversal service
//!
//! Corrections are append-only: a reversal is a new entry with the debit
//! and credit sides swapped relative to the original, linked back via
//! `reverses_entry_id`. The original is never edited. Reversals go through
//! the posting engine, so the period gate and balance invariant apply to
//! them like any other entry.

use chrono::NaiveDate;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::posting_request::{LineInput, PostingRequest};
use crate::repos::journal_repo;
use crate::services::posting_service::{self, PostedEntry, PostingError};

/// Errors that can occur while reversing a journal entry
#[derive(Debug, Error)]
pub enum ReversalError {
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),

    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(Uuid),

    #[error("Journal entry {0} is itself a reversal and cannot be reversed")]
    CannotReverseReversal(Uuid),

    #[error("Reversal posting rejected: {0}")]
    Posting(#[from] PostingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Reverse a posted journal entry
///
/// Builds a new entry mirroring the original with swapped sides, dated
/// `entry_date` (reversals usually land in the current open period, not
/// the original's). The reversal keeps the original's source; its
/// `source_ref` is derived from the original entry id, so retrying a
/// reversal is idempotent. An entry can be reversed at most once, and a
/// reversal entry can never be reversed itself; undoing a mistaken
/// reversal means re-posting the original facts as a new entry.
pub async fn reverse_entry(
    pool: &PgPool,
    org_id: &str,
    original_entry_id: Uuid,
    entry_date: NaiveDate,
    posted_by: &str,
) -> Result<PostedEntry, ReversalError> {
    let (original, original_lines) = journal_repo::fetch_entry_with_lines(pool, original_entry_id)
        .await?
        .filter(|(entry, _)| entry.org_id == org_id)
        .ok_or(ReversalError::EntryNotFound(original_entry_id))?;

    // Reversing a reversal would silently re-apply the original entry.
    if original.reverses_entry_id.is_some() {
        return Err(ReversalError::CannotReverseReversal(original_entry_id));
    }

    if journal_repo::has_reversal(pool, original_entry_id).await? {
        return Err(ReversalError::AlreadyReversed(original_entry_id));
    }

    let lines = original_lines
        .iter()
        .map(|line| LineInput {
            account_code: line.account_code.clone(),
            branch_id: line.branch_id,
            debit_minor: line.credit_minor,
            credit_minor: line.debit_minor,
            metadata: line.metadata.clone(),
        })
        .collect();

    let request = PostingRequest {
        org_id: org_id.to_string(),
        branch_id: original.branch_id,
        entry_date,
        memo: format!("Reversal of journal entry {}", original_entry_id),
        source: original.source,
        source_ref: Some(format!("reversal:{}", original_entry_id)),
        reverses_entry_id: Some(original_entry_id),
        lines,
    };

    let posted = posting_service::post(pool, &request, posted_by).await?;

    if !posted.deduplicated {
        tracing::info!(
            entry_id = %posted.entry.id,
            reverses_entry_id = %original_entry_id,
            org_id = %org_id,
            "Journal entry reversed"
        );
    }

    Ok(posted)
}
