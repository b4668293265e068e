//! Posting request contract types
//!
//! This is the single write contract into the ledger. Operational adapters
//! (sale completion, wastage recording, payroll, service-provider accruals and
//! payments) build a `PostingRequest` with pre-balanced lines and hand it to
//! the posting service; the manual-entry surface uses the same contract with
//! `source = MANUAL`.
//!
//! Amounts are integer minor currency units. No floating point anywhere in
//! this contract.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational source that produced a journal entry.
///
/// Automatic sources are posted programmatically by adapter modules;
/// `Manual` is the only source intended for direct human invocation and
/// `PeriodClose` is reserved for the fiscal period manager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "entry_source", rename_all = "snake_case")]
pub enum EntrySource {
    Sale,
    Wastage,
    Payroll,
    ServiceProviderAccrual,
    ServiceProviderPayment,
    Manual,
    PeriodClose,
}

/// Request to post one journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostingRequest {
    /// Organization whose ledger receives the entry
    pub org_id: String,

    /// Entry-level branch; None means org-level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,

    /// Accounting date for the journal entry
    pub entry_date: NaiveDate,

    /// Human-readable description (1-500 chars)
    pub memo: String,

    /// Source that produced this entry
    pub source: EntrySource,

    /// Opaque idempotency key; the same (org_id, source, source_ref) tuple
    /// is only ever posted once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<String>,

    /// Entry being corrected, when this entry is an append-only reversal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverses_entry_id: Option<Uuid>,

    /// Journal lines; must balance exactly
    pub lines: Vec<LineInput>,
}

/// A single line in a posting request.
///
/// Exactly one of `debit_minor` / `credit_minor` must be strictly positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineInput {
    /// Chart of Accounts code (e.g. "1000")
    pub account_code: String,

    /// Line-level branch override for multi-branch entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,

    /// Debit amount in minor units (must be >= 0)
    pub debit_minor: i64,

    /// Credit amount in minor units (must be >= 0)
    pub credit_minor: i64,

    /// Optional opaque line metadata (adapter-defined)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl LineInput {
    /// Debit-side line with no branch override or metadata.
    pub fn debit(account_code: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            account_code: account_code.into(),
            branch_id: None,
            debit_minor: amount_minor,
            credit_minor: 0,
            metadata: None,
        }
    }

    /// Credit-side line with no branch override or metadata.
    pub fn credit(account_code: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            account_code: account_code.into(),
            branch_id: None,
            debit_minor: 0,
            credit_minor: amount_minor,
            metadata: None,
        }
    }
}
