//! Trial balance service
//!
//! Read-only per-account balance listing derived by aggregating journal
//! lines at query time. Balances are normalized to each account's natural
//! side; the unfiltered listing always balances because every persisted
//! entry does.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::repos::account_repo::{AccountType, NormalBalance};
use crate::repos::report_query_repo::{self, AccountBalanceRow, ReportQueryError};

/// Trial balance report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    pub org_id: String,
    pub as_of: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
    pub rows: Vec<TrialBalanceRow>,
    pub totals: TrialBalanceTotals,
}

/// One account's balance in the trial balance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialBalanceRow {
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub normal_balance: NormalBalance,
    pub debit_total_minor: i64,
    pub credit_total_minor: i64,
    /// Signed balance normalized to the account's natural side: positive
    /// means the account carries its normal balance
    pub balance_minor: i64,
}

/// Trial balance totals for verification
///
/// Computed over every account, including rows omitted from the listing as
/// negligible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialBalanceTotals {
    pub total_debits_minor: i64,
    pub total_credits_minor: i64,
    pub is_balanced: bool,
}

/// Errors that can occur during trial balance operations
#[derive(Debug, Error)]
pub enum TrialBalanceError {
    #[error("org_id cannot be empty")]
    EmptyOrgId,

    #[error("Report query error: {0}")]
    Query(#[from] ReportQueryError),
}

/// Get the trial balance for an org as of a date
///
/// `negligible_threshold_minor` omits accounts whose absolute normalized
/// balance falls below it from the listing; the totals still include them.
/// A threshold of zero lists every account with activity.
pub async fn get_trial_balance(
    pool: &PgPool,
    org_id: &str,
    as_of: NaiveDate,
    branch_id: Option<Uuid>,
    negligible_threshold_minor: i64,
) -> Result<TrialBalanceReport, TrialBalanceError> {
    if org_id.is_empty() {
        return Err(TrialBalanceError::EmptyOrgId);
    }

    let balance_rows = report_query_repo::balances_as_of(pool, org_id, as_of, branch_id).await?;

    let (rows, totals) = build_trial_balance(&balance_rows, negligible_threshold_minor);

    Ok(TrialBalanceReport {
        org_id: org_id.to_string(),
        as_of,
        branch_id,
        rows,
        totals,
    })
}

/// Fold aggregated balance rows into trial balance rows and totals
pub fn build_trial_balance(
    balance_rows: &[AccountBalanceRow],
    negligible_threshold_minor: i64,
) -> (Vec<TrialBalanceRow>, TrialBalanceTotals) {
    let total_debits_minor: i64 = balance_rows.iter().map(|r| r.debit_total_minor).sum();
    let total_credits_minor: i64 = balance_rows.iter().map(|r| r.credit_total_minor).sum();

    let rows = balance_rows
        .iter()
        .map(|row| {
            let net_debit = row.net_debit_minor();
            let normal_balance = row.account_type.normal_balance();
            let balance_minor = match normal_balance {
                NormalBalance::Debit => net_debit,
                NormalBalance::Credit => -net_debit,
            };

            TrialBalanceRow {
                account_code: row.account_code.clone(),
                account_name: row.account_name.clone(),
                account_type: row.account_type,
                normal_balance,
                debit_total_minor: row.debit_total_minor,
                credit_total_minor: row.credit_total_minor,
                balance_minor,
            }
        })
        .filter(|row| row.balance_minor.abs() >= negligible_threshold_minor)
        .collect();

    let totals = TrialBalanceTotals {
        total_debits_minor,
        total_credits_minor,
        is_balanced: total_debits_minor == total_credits_minor,
    };

    (rows, totals)
}
