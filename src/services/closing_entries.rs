//! Closing entry computation
//!
//! Deterministic, pure computation of the lines that zero the temporary
//! accounts (revenue, COGS, expense) into retained earnings at period
//! close. Operates on aggregated balance rows; the period service supplies
//! rows read inside the close transaction.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::contracts::posting_request::LineInput;
use crate::repos::report_query_repo::AccountBalanceRow;

/// Result of the closing computation
#[derive(Debug, Clone)]
pub struct ClosingComputation {
    /// Balanced closing lines: one per nonzero temporary-account balance,
    /// plus one retained earnings offset per branch
    pub lines: Vec<LineInput>,
    /// Net income for the period across all branches (positive = profit)
    pub net_income_minor: i64,
}

/// Build the closing lines for a set of temporary-account balances
///
/// For each nonzero balance the closing line negates it: a revenue account
/// with a net credit balance gets a debit of that amount, a COGS or expense
/// account with a net debit balance gets a credit. One offsetting line per
/// branch against `retained_earnings_code` makes the entry balance; its
/// credit side carries the branch's net income.
///
/// Rows with a zero net balance produce no line, and rows for permanent
/// accounts are ignored outright; only temporary balances close. An
/// all-zero period yields an empty line set.
///
/// Ordering is deterministic: branches ascending (org-level first), then
/// account code, with the retained earnings offset last within each branch.
pub fn build_closing_lines(
    balances: &[AccountBalanceRow],
    retained_earnings_code: &str,
) -> ClosingComputation {
    // Group rows per branch; BTreeMap for deterministic branch order.
    let mut by_branch: BTreeMap<Option<Uuid>, Vec<&AccountBalanceRow>> = BTreeMap::new();
    for row in balances {
        if !row.account_type.is_temporary() {
            continue;
        }
        by_branch.entry(row.branch_id).or_default().push(row);
    }

    let mut lines = Vec::new();
    let mut net_income_minor: i64 = 0;

    for (branch_id, rows) in by_branch {
        let mut branch_net_debit: i64 = 0;

        let mut sorted = rows;
        sorted.sort_by(|a, b| a.account_code.cmp(&b.account_code));

        for row in sorted {
            let net_debit = row.net_debit_minor();
            if net_debit == 0 {
                continue;
            }

            // Negate the balance: net debit is closed with a credit and
            // vice versa.
            let mut line = if net_debit > 0 {
                LineInput::credit(row.account_code.clone(), net_debit)
            } else {
                LineInput::debit(row.account_code.clone(), -net_debit)
            };
            line.branch_id = branch_id;
            lines.push(line);

            branch_net_debit += net_debit;
        }

        // Offset against retained earnings so the branch's lines balance.
        // Temporary accounts netting to credit (profit) credit retained
        // earnings; netting to debit (loss) debit it.
        if branch_net_debit != 0 {
            let mut offset = if branch_net_debit > 0 {
                LineInput::debit(retained_earnings_code.to_string(), branch_net_debit)
            } else {
                LineInput::credit(retained_earnings_code.to_string(), -branch_net_debit)
            };
            offset.branch_id = branch_id;
            lines.push(offset);

            net_income_minor += -branch_net_debit;
        }
    }

    ClosingComputation {
        lines,
        net_income_minor,
    }
}
