//! Balance sheet service
//!
//! Point-in-time asset, liability, and equity positions derived from the
//! same aggregation as the trial balance. Temporary-account balances not
//! yet closed into retained earnings roll up as current earnings inside
//! the equity section, so the accounting identity holds at any date, not
//! just at period boundaries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::repos::account_repo::AccountType;
use crate::repos::report_query_repo::{self, AccountBalanceRow, ReportQueryError};

/// Balance sheet report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetReport {
    pub org_id: String,
    pub as_of: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
    pub assets: BalanceSheetSection,
    pub liabilities: BalanceSheetSection,
    pub equity: BalanceSheetSection,
    /// Net income accumulated since the last close, folded into the equity
    /// total but broken out here
    pub current_earnings_minor: i64,
    /// `assets.total == liabilities.total + equity.total`
    pub is_balanced: bool,
}

/// One side of the balance sheet with its per-account breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSheetSection {
    pub lines: Vec<BalanceSheetLine>,
    pub total_minor: i64,
}

/// A single account's position on the balance sheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSheetLine {
    pub account_code: String,
    pub account_name: String,
    pub balance_minor: i64,
}

/// Errors that can occur during balance sheet operations
#[derive(Debug, Error)]
pub enum BalanceSheetError {
    #[error("org_id cannot be empty")]
    EmptyOrgId,

    #[error("Report query error: {0}")]
    Query(#[from] ReportQueryError),
}

/// Get the balance sheet for an org as of a date
pub async fn get_balance_sheet(
    pool: &PgPool,
    org_id: &str,
    as_of: NaiveDate,
    branch_id: Option<Uuid>,
) -> Result<BalanceSheetReport, BalanceSheetError> {
    if org_id.is_empty() {
        return Err(BalanceSheetError::EmptyOrgId);
    }

    let rows = report_query_repo::balances_as_of(pool, org_id, as_of, branch_id).await?;

    let built = build_balance_sheet(&rows);

    tracing::debug!(
        org_id = %org_id,
        as_of = %as_of,
        is_balanced = built.is_balanced,
        "Balance sheet derived"
    );

    Ok(BalanceSheetReport {
        org_id: org_id.to_string(),
        as_of,
        branch_id,
        assets: built.assets,
        liabilities: built.liabilities,
        equity: built.equity,
        current_earnings_minor: built.current_earnings_minor,
        is_balanced: built.is_balanced,
    })
}

/// Sections computed from aggregated rows, before report framing
#[derive(Debug, Clone)]
pub struct BalanceSheetFigures {
    pub assets: BalanceSheetSection,
    pub liabilities: BalanceSheetSection,
    pub equity: BalanceSheetSection,
    pub current_earnings_minor: i64,
    pub is_balanced: bool,
}

/// Fold aggregated balance rows into balance sheet sections
///
/// Assets carry debit-normal balances; liabilities and equity carry
/// credit-normal balances. Temporary accounts contribute only their net
/// credit sum, reported as current earnings and added to the equity total.
pub fn build_balance_sheet(rows: &[AccountBalanceRow]) -> BalanceSheetFigures {
    let mut assets = BalanceSheetSection {
        lines: Vec::new(),
        total_minor: 0,
    };
    let mut liabilities = BalanceSheetSection {
        lines: Vec::new(),
        total_minor: 0,
    };
    let mut equity = BalanceSheetSection {
        lines: Vec::new(),
        total_minor: 0,
    };
    let mut current_earnings_minor: i64 = 0;

    for row in rows {
        let section = match row.account_type {
            AccountType::Asset => &mut assets,
            AccountType::Liability => &mut liabilities,
            AccountType::Equity => &mut equity,
            AccountType::Revenue | AccountType::Cogs | AccountType::Expense => {
                current_earnings_minor += -row.net_debit_minor();
                continue;
            }
        };

        let balance_minor = match row.account_type {
            AccountType::Asset => row.net_debit_minor(),
            _ => -row.net_debit_minor(),
        };

        section.lines.push(BalanceSheetLine {
            account_code: row.account_code.clone(),
            account_name: row.account_name.clone(),
            balance_minor,
        });
        section.total_minor += balance_minor;
    }

    for section in [&mut assets, &mut liabilities, &mut equity] {
        section
            .lines
            .sort_by(|a, b| a.account_code.cmp(&b.account_code));
    }

    let equity_total_with_earnings = equity.total_minor + current_earnings_minor;
    let is_balanced = assets.total_minor == liabilities.total_minor + equity_total_with_earnings;
    equity.total_minor = equity_total_with_earnings;

    BalanceSheetFigures {
        assets,
        liabilities,
        equity,
        current_earnings_minor,
        is_balanced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(code: &str, account_type: AccountType, debit: i64, credit: i64) -> AccountBalanceRow {
        AccountBalanceRow {
            account_code: code.to_string(),
            account_name: code.to_string(),
            account_type,
            branch_id: None,
            debit_total_minor: debit,
            credit_total_minor: credit,
        }
    }

    #[test]
    fn test_identity_holds_after_close() {
        // After a close: Cash 60.00 in assets, Retained Earnings 60.00
        let rows = vec![
            balance("1000", AccountType::Asset, 10000, 4000),
            balance("3900", AccountType::Equity, 0, 6000),
        ];

        let figures = build_balance_sheet(&rows);

        assert_eq!(figures.assets.total_minor, 6000);
        assert_eq!(figures.liabilities.total_minor, 0);
        assert_eq!(figures.equity.total_minor, 6000);
        assert_eq!(figures.current_earnings_minor, 0);
        assert!(figures.is_balanced);
    }

    #[test]
    fn test_identity_holds_mid_period() {
        // Mid-period, before any close: unclosed revenue sits in current
        // earnings inside equity.
        let rows = vec![
            balance("1000", AccountType::Asset, 11000, 0),
            balance("2300", AccountType::Liability, 0, 1000),
            balance("4000", AccountType::Revenue, 0, 10000),
        ];

        let figures = build_balance_sheet(&rows);

        assert_eq!(figures.assets.total_minor, 11000);
        assert_eq!(figures.liabilities.total_minor, 1000);
        assert_eq!(figures.current_earnings_minor, 10000);
        assert_eq!(figures.equity.total_minor, 10000);
        assert!(figures.is_balanced);

        // Temporary accounts never appear as listed lines
        assert!(figures.equity.lines.is_empty());
    }

    #[test]
    fn test_mid_period_loss() {
        let rows = vec![
            balance("1000", AccountType::Asset, 1000, 3000),
            balance("3000", AccountType::Equity, 0, 0),
            balance("6000", AccountType::Expense, 2000, 0),
        ];

        let figures = build_balance_sheet(&rows);

        assert_eq!(figures.assets.total_minor, -2000);
        assert_eq!(figures.current_earnings_minor, -2000);
        assert_eq!(figures.equity.total_minor, -2000);
        assert!(figures.is_balanced);
    }

    #[test]
    fn test_lines_sorted_within_sections() {
        let rows = vec![
            balance("1200", AccountType::Asset, 500, 0),
            balance("1000", AccountType::Asset, 300, 0),
            balance("2000", AccountType::Liability, 0, 800),
        ];

        let figures = build_balance_sheet(&rows);

        let codes: Vec<&str> = figures
            .assets
            .lines
            .iter()
            .map(|l| l.account_code.as_str())
            .collect();
        assert_eq!(codes, vec!["1000", "1200"]);
    }

    #[test]
    fn test_empty_ledger_is_balanced() {
        let figures = build_balance_sheet(&[]);
        assert!(figures.is_balanced);
        assert_eq!(figures.assets.total_minor, 0);
    }
}
