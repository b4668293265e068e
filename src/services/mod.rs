pub mod balance_sheet_service;
pub mod closing_entries;
pub mod income_statement_service;
pub mod period_service;
pub mod posting_service;
pub mod reversal_service;
pub mod trial_balance_service;
