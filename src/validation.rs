//! Validation logic for posting requests
//!
//! Validates the shape and balance of a posting request before anything
//! touches the database. Account existence and period status are checked
//! separately inside the posting transaction.

use thiserror::Error;

use crate::contracts::posting_request::{LineInput, PostingRequest};

/// Validation errors for posting requests
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Entry must contain at least one line")]
    NoLines,

    #[error("Memo must be between 1 and 500 characters, got {0}")]
    InvalidMemoLength(usize),

    #[error("Line {0}: exactly one of debit/credit must be positive, got debit={1}, credit={2}")]
    InvalidLineShape(usize, i64, i64),

    #[error("Total debits ({0}) must equal total credits ({1})")]
    UnbalancedEntry(i64, i64),
}

/// Validate a posting request payload
///
/// # Validation Rules
///
/// In order:
/// - `lines`: must be non-empty
/// - `memo`: must be 1-500 characters
/// - Each line: exactly one of `debit_minor` / `credit_minor` is strictly
///   positive and the other is zero (this also rejects negative amounts)
/// - Total debits must equal total credits, exact integer equality
///
/// # Errors
///
/// Returns `ValidationError` if any rule is violated
pub fn validate_posting_request(request: &PostingRequest) -> Result<(), ValidationError> {
    if request.lines.is_empty() {
        return Err(ValidationError::NoLines);
    }

    let memo_len = request.memo.len();
    if memo_len == 0 || memo_len > 500 {
        return Err(ValidationError::InvalidMemoLength(memo_len));
    }

    let mut total_debits: i64 = 0;
    let mut total_credits: i64 = 0;

    for (idx, line) in request.lines.iter().enumerate() {
        validate_line(line, idx)?;
        total_debits += line.debit_minor;
        total_credits += line.credit_minor;
    }

    // Exact integer equality in minor units. No tolerance window.
    if total_debits != total_credits {
        return Err(ValidationError::UnbalancedEntry(total_debits, total_credits));
    }

    Ok(())
}

/// Validate a single line's shape
fn validate_line(line: &LineInput, index: usize) -> Result<(), ValidationError> {
    let debit_only = line.debit_minor > 0 && line.credit_minor == 0;
    let credit_only = line.credit_minor > 0 && line.debit_minor == 0;

    if !debit_only && !credit_only {
        return Err(ValidationError::InvalidLineShape(
            index,
            line.debit_minor,
            line.credit_minor,
        ));
    }

    Ok(())
}
