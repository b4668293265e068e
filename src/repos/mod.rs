pub mod account_repo;
pub mod journal_repo;
pub mod period_repo;
pub mod report_query_repo;
