//! Income statement service
//!
//! Derives revenue, COGS, and expense sections from journal activity within
//! a date range. Only temporary accounts contribute; everything else is
//! filtered out of the aggregated rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::repos::account_repo::AccountType;
use crate::repos::report_query_repo::{self, AccountBalanceRow, ReportQueryError};

/// Income statement report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementReport {
    pub org_id: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
    pub revenue: StatementSection,
    pub cogs: StatementSection,
    pub expenses: StatementSection,
    pub gross_profit_minor: i64,
    pub net_income_minor: i64,
}

/// One section of the income statement with its per-account breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementSection {
    pub lines: Vec<StatementLine>,
    pub total_minor: i64,
}

/// A single account's contribution to a statement section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementLine {
    pub account_code: String,
    pub account_name: String,
    pub amount_minor: i64,
}

/// Errors that can occur during income statement operations
#[derive(Debug, Error)]
pub enum IncomeStatementError {
    #[error("org_id cannot be empty")]
    EmptyOrgId,

    #[error("Report query error: {0}")]
    Query(#[from] ReportQueryError),
}

/// Get the income statement for an org over a date range
///
/// The range is inclusive on both ends. Note that a closed period's
/// closing entry is dated on the period end and nets each temporary
/// account to zero, so a range covering that date reports zero for the
/// closed activity; report on closed periods by ending the range the day
/// before the close date.
pub async fn get_income_statement(
    pool: &PgPool,
    org_id: &str,
    period_start: NaiveDate,
    period_end: NaiveDate,
    branch_id: Option<Uuid>,
) -> Result<IncomeStatementReport, IncomeStatementError> {
    if org_id.is_empty() {
        return Err(IncomeStatementError::EmptyOrgId);
    }

    let rows =
        report_query_repo::activity_between(pool, org_id, period_start, period_end, branch_id)
            .await?;

    let (revenue, cogs, expenses) = build_income_statement(&rows);
    let gross_profit_minor = revenue.total_minor - cogs.total_minor;
    let net_income_minor = gross_profit_minor - expenses.total_minor;

    Ok(IncomeStatementReport {
        org_id: org_id.to_string(),
        period_start,
        period_end,
        branch_id,
        revenue,
        cogs,
        expenses,
        gross_profit_minor,
        net_income_minor,
    })
}

/// Fold aggregated activity rows into the three statement sections
///
/// Revenue amounts are net credits; COGS and expense amounts are net
/// debits. Non-temporary accounts are skipped. Zero-amount accounts are
/// kept in their section so a chart account with offsetting activity still
/// shows up.
pub fn build_income_statement(
    rows: &[AccountBalanceRow],
) -> (StatementSection, StatementSection, StatementSection) {
    let mut revenue = StatementSection {
        lines: Vec::new(),
        total_minor: 0,
    };
    let mut cogs = StatementSection {
        lines: Vec::new(),
        total_minor: 0,
    };
    let mut expenses = StatementSection {
        lines: Vec::new(),
        total_minor: 0,
    };

    for row in rows {
        let (section, amount_minor) = match row.account_type {
            AccountType::Revenue => (&mut revenue, -row.net_debit_minor()),
            AccountType::Cogs => (&mut cogs, row.net_debit_minor()),
            AccountType::Expense => (&mut expenses, row.net_debit_minor()),
            _ => continue,
        };

        section.lines.push(StatementLine {
            account_code: row.account_code.clone(),
            account_name: row.account_name.clone(),
            amount_minor,
        });
        section.total_minor += amount_minor;
    }

    for section in [&mut revenue, &mut cogs, &mut expenses] {
        section
            .lines
            .sort_by(|a, b| a.account_code.cmp(&b.account_code));
    }

    (revenue, cogs, expenses)
}
