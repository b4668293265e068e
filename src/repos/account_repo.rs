use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Account type enum matching database account_type
///
/// The type fixes the account's normal balance side: asset, COGS and expense
/// accounts are debit-normal; liability, equity and revenue accounts are
/// credit-normal.
#[derive(Debug, Clone, Copy, sqlx::Type, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Cogs,
    Expense,
}

impl AccountType {
    /// Natural balance side for this account type.
    pub fn normal_balance(self) -> NormalBalance {
        match self {
            AccountType::Asset | AccountType::Cogs | AccountType::Expense => NormalBalance::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalBalance::Credit
            }
        }
    }

    /// Temporary accounts are zeroed into retained earnings at period close.
    pub fn is_temporary(self) -> bool {
        matches!(
            self,
            AccountType::Revenue | AccountType::Cogs | AccountType::Expense
        )
    }
}

/// Normal balance side of an account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    Debit,
    Credit,
}

/// Account model representing a Chart of Accounts entry
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub org_id: String,
    pub code: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub account_type: AccountType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur during account repository operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Account not found: org_id={org_id}, code={code}")]
    NotFound { org_id: String, code: String },

    #[error("Account is inactive: org_id={org_id}, code={code}")]
    Inactive { org_id: String, code: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Find an account by org_id and code
/// Returns None if the account doesn't exist
pub async fn find_by_code(
    pool: &PgPool,
    org_id: &str,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, org_id, code, name, type, is_active, created_at
        FROM accounts
        WHERE org_id = $1 AND code = $2
        "#,
    )
    .bind(org_id)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

/// Find an account by org_id and code within a transaction
pub async fn find_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, org_id, code, name, type, is_active, created_at
        FROM accounts
        WHERE org_id = $1 AND code = $2
        "#,
    )
    .bind(org_id)
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(account)
}

/// Find an active account by org_id and code
/// Returns an error if the account doesn't exist or is inactive
pub async fn find_active_by_code(
    pool: &PgPool,
    org_id: &str,
    code: &str,
) -> Result<Account, AccountError> {
    let account = find_by_code(pool, org_id, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            org_id: org_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            org_id: org_id.to_string(),
            code: code.to_string(),
        }),
    }
}

/// Find an active account by org_id and code within a transaction
pub async fn find_active_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    org_id: &str,
    code: &str,
) -> Result<Account, AccountError> {
    let account = find_by_code_tx(tx, org_id, code).await?;

    match account {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            org_id: org_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            org_id: org_id.to_string(),
            code: code.to_string(),
        }),
    }
}
