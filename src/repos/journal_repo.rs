use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::posting_request::EntrySource;

/// Journal entry header (for reading from DB)
///
/// Immutable after creation. Corrections are new reversal entries linked via
/// `reverses_entry_id`, never edits.
#[derive(Debug, Clone, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub org_id: String,
    pub branch_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub memo: String,
    pub source: EntrySource,
    pub source_ref: Option<String>,
    pub reverses_entry_id: Option<Uuid>,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
}

/// Journal line (for reading from DB)
#[derive(Debug, Clone, FromRow)]
pub struct JournalLine {
    pub id: Uuid,
    pub journal_entry_id: Uuid,
    pub line_no: i32,
    pub account_code: String,
    pub branch_id: Option<Uuid>,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub metadata: Option<serde_json::Value>,
}

/// Struct for inserting a journal entry header
#[derive(Debug, Clone)]
pub struct JournalEntryInsert {
    pub id: Uuid,
    pub org_id: String,
    pub branch_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub memo: String,
    pub source: EntrySource,
    pub source_ref: Option<String>,
    pub reverses_entry_id: Option<Uuid>,
    pub posted_by: String,
    pub created_at: DateTime<Utc>,
}

/// Struct for inserting a journal line
#[derive(Debug, Clone)]
pub struct JournalLineInsert {
    pub id: Uuid,
    pub line_no: i32,
    pub account_code: String,
    pub branch_id: Option<Uuid>,
    pub debit_minor: i64,
    pub credit_minor: i64,
    pub metadata: Option<serde_json::Value>,
}

/// Insert a journal entry header
pub async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &JournalEntryInsert,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO journal_entries
            (id, org_id, branch_id, entry_date, memo, source, source_ref,
             reverses_entry_id, posted_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(entry.id)
    .bind(&entry.org_id)
    .bind(entry.branch_id)
    .bind(entry.entry_date)
    .bind(&entry.memo)
    .bind(entry.source)
    .bind(&entry.source_ref)
    .bind(entry.reverses_entry_id)
    .bind(&entry.posted_by)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Bulk insert journal lines for a journal entry
pub async fn bulk_insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    journal_entry_id: Uuid,
    lines: &[JournalLineInsert],
) -> Result<(), sqlx::Error> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO journal_lines
                (id, journal_entry_id, line_no, account_code, branch_id,
                 debit_minor, credit_minor, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(line.id)
        .bind(journal_entry_id)
        .bind(line.line_no)
        .bind(&line.account_code)
        .bind(line.branch_id)
        .bind(line.debit_minor)
        .bind(line.credit_minor)
        .bind(&line.metadata)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Find an entry by its idempotency tuple (org_id, source, source_ref)
pub async fn find_by_source_ref(
    pool: &PgPool,
    org_id: &str,
    source: EntrySource,
    source_ref: &str,
) -> Result<Option<JournalEntry>, sqlx::Error> {
    let entry = sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT id, org_id, branch_id, entry_date, memo, source, source_ref,
               reverses_entry_id, posted_by, created_at
        FROM journal_entries
        WHERE org_id = $1 AND source = $2 AND source_ref = $3
        "#,
    )
    .bind(org_id)
    .bind(source)
    .bind(source_ref)
    .fetch_optional(pool)
    .await?;

    Ok(entry)
}

/// Find an entry by its idempotency tuple within a transaction
pub async fn find_by_source_ref_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    source: EntrySource,
    source_ref: &str,
) -> Result<Option<JournalEntry>, sqlx::Error> {
    let entry = sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT id, org_id, branch_id, entry_date, memo, source, source_ref,
               reverses_entry_id, posted_by, created_at
        FROM journal_entries
        WHERE org_id = $1 AND source = $2 AND source_ref = $3
        "#,
    )
    .bind(org_id)
    .bind(source)
    .bind(source_ref)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(entry)
}

/// Fetch all lines for a journal entry, ordered by line number
pub async fn fetch_lines(
    pool: &PgPool,
    journal_entry_id: Uuid,
) -> Result<Vec<JournalLine>, sqlx::Error> {
    let lines = sqlx::query_as::<_, JournalLine>(
        r#"
        SELECT id, journal_entry_id, line_no, account_code, branch_id,
               debit_minor, credit_minor, metadata
        FROM journal_lines
        WHERE journal_entry_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(journal_entry_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}

/// Fetch all lines for a journal entry within a transaction
pub async fn fetch_lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    journal_entry_id: Uuid,
) -> Result<Vec<JournalLine>, sqlx::Error> {
    let lines = sqlx::query_as::<_, JournalLine>(
        r#"
        SELECT id, journal_entry_id, line_no, account_code, branch_id,
               debit_minor, credit_minor, metadata
        FROM journal_lines
        WHERE journal_entry_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(journal_entry_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(lines)
}

/// Fetch a journal entry by ID with its lines
pub async fn fetch_entry_with_lines(
    pool: &PgPool,
    entry_id: Uuid,
) -> Result<Option<(JournalEntry, Vec<JournalLine>)>, sqlx::Error> {
    let entry = sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT id, org_id, branch_id, entry_date, memo, source, source_ref,
               reverses_entry_id, posted_by, created_at
        FROM journal_entries
        WHERE id = $1
        "#,
    )
    .bind(entry_id)
    .fetch_optional(pool)
    .await?;

    let Some(entry) = entry else {
        return Ok(None);
    };

    let lines = fetch_lines(pool, entry_id).await?;

    Ok(Some((entry, lines)))
}

/// Check whether an entry has already been reversed
pub async fn has_reversal(pool: &PgPool, entry_id: Uuid) -> Result<bool, sqlx::Error> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM journal_entries WHERE reverses_entry_id = $1)",
    )
    .bind(entry_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
