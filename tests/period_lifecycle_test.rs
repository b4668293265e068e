//! Fiscal Period Lifecycle Integration Tests
//!
//! Close and lock against a real Postgres: closing entry contents, state
//! machine enforcement, close hash sealing, and the post-lock gate.
//!
//! Note: these tests need DATABASE_URL pointing at a migrated database and
//! are marked #[ignore] so plain `cargo test` stays green without one.

mod common;

use chrono::NaiveDate;
use serial_test::serial;
use uuid::Uuid;

use gl_core::contracts::posting_request::{EntrySource, LineInput, PostingRequest};
use gl_core::repos::period_repo::{self, PeriodStatus};
use gl_core::repos::report_query_repo;
use gl_core::services::period_service::{self, PeriodLifecycleError};
use gl_core::services::posting_service::{self, PostingError};

const RETAINED_EARNINGS: &str = "3900";

fn feb_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
}

fn feb_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
}

async fn post_sale(pool: &sqlx::PgPool, org_id: &str, source_ref: &str, lines: Vec<LineInput>) {
    let req = PostingRequest {
        org_id: org_id.to_string(),
        branch_id: None,
        entry_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
        memo: "Lifecycle test activity".to_string(),
        source: EntrySource::Sale,
        source_ref: Some(source_ref.to_string()),
        reverses_entry_id: None,
        lines,
    };
    posting_service::post(pool, &req, "test_user")
        .await
        .expect("activity entry should post");
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_close_zeroes_temporaries_into_retained_earnings() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    let period_id = common::setup_period(&pool, org_id, feb_start(), feb_end(), "open").await;

    // Revenue 100.00, COGS 40.00, Expenses 20.00
    post_sale(
        &pool,
        org_id,
        "s1",
        vec![LineInput::debit("1000", 10000), LineInput::credit("4000", 10000)],
    )
    .await;
    post_sale(
        &pool,
        org_id,
        "s2",
        vec![LineInput::debit("5000", 4000), LineInput::credit("1000", 4000)],
    )
    .await;
    post_sale(
        &pool,
        org_id,
        "s3",
        vec![LineInput::debit("6000", 2000), LineInput::credit("1000", 2000)],
    )
    .await;

    let closed =
        period_service::close_period(&pool, org_id, period_id, "closer", RETAINED_EARNINGS)
            .await
            .expect("close should succeed");

    assert_eq!(closed.status, PeriodStatus::Closed);
    assert_eq!(closed.closed_by.as_deref(), Some("closer"));
    assert!(closed.closed_at.is_some());
    assert_eq!(closed.close_hash.as_deref().map(|h| h.len()), Some(64));

    // Exactly one closing entry, keyed by the period id
    let close_count = report_query_repo::count_close_entries(&pool, org_id, period_id)
        .await
        .unwrap();
    assert_eq!(close_count, 1);

    // Temporary accounts net to zero over the period
    for code in ["4000", "5000", "6000"] {
        let net: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(jl.debit_minor - jl.credit_minor), 0)::BIGINT
            FROM journal_lines jl
            JOIN journal_entries je ON je.id = jl.journal_entry_id
            WHERE je.org_id = $1 AND jl.account_code = $2
            "#,
        )
        .bind(org_id)
        .bind(code)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(net, 0, "account {code} should be zeroed by the close");
    }

    // Retained earnings carries net income of 40.00 as a credit
    let retained_net: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(jl.credit_minor - jl.debit_minor), 0)::BIGINT
        FROM journal_lines jl
        JOIN journal_entries je ON je.id = jl.journal_entry_id
        WHERE je.org_id = $1 AND jl.account_code = $2
        "#,
    )
    .bind(org_id)
    .bind(RETAINED_EARNINGS)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(retained_net, 4000);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_second_close_fails_and_posts_nothing() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    let period_id = common::setup_period(&pool, org_id, feb_start(), feb_end(), "open").await;

    post_sale(
        &pool,
        org_id,
        "s1",
        vec![LineInput::debit("1000", 5000), LineInput::credit("4000", 5000)],
    )
    .await;

    period_service::close_period(&pool, org_id, period_id, "closer", RETAINED_EARNINGS)
        .await
        .unwrap();

    let err = period_service::close_period(&pool, org_id, period_id, "closer", RETAINED_EARNINGS)
        .await
        .expect_err("second close must fail");
    assert!(matches!(
        err,
        PeriodLifecycleError::InvalidPeriodState {
            expected: PeriodStatus::Open,
            actual: PeriodStatus::Closed,
            ..
        }
    ));

    // Still exactly one closing entry
    let close_count = report_query_repo::count_close_entries(&pool, org_id, period_id)
        .await
        .unwrap();
    assert_eq!(close_count, 1);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_close_with_no_activity_posts_no_entry() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    let period_id = common::setup_period(&pool, org_id, feb_start(), feb_end(), "open").await;

    let closed =
        period_service::close_period(&pool, org_id, period_id, "closer", RETAINED_EARNINGS)
            .await
            .expect("closing an empty period should succeed");
    assert_eq!(closed.status, PeriodStatus::Closed);

    let entry_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(entry_count, 0);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_lock_requires_closed_and_gates_postings() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    let period_id = common::setup_period(&pool, org_id, feb_start(), feb_end(), "open").await;

    // Locking an open period is a state machine violation
    let err = period_service::lock_period(&pool, org_id, period_id, "locker")
        .await
        .expect_err("lock on an open period must fail");
    assert!(matches!(
        err,
        PeriodLifecycleError::InvalidPeriodState {
            expected: PeriodStatus::Closed,
            actual: PeriodStatus::Open,
            ..
        }
    ));

    period_service::close_period(&pool, org_id, period_id, "closer", RETAINED_EARNINGS)
        .await
        .unwrap();

    let locked = period_service::lock_period(&pool, org_id, period_id, "locker")
        .await
        .expect("lock after close should succeed");
    assert_eq!(locked.status, PeriodStatus::Locked);
    assert_eq!(locked.locked_by.as_deref(), Some("locker"));

    // Any posting dated inside the locked period now fails
    let req = PostingRequest {
        org_id: org_id.to_string(),
        branch_id: None,
        entry_date: NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(),
        memo: "Late posting".to_string(),
        source: EntrySource::Manual,
        source_ref: None,
        reverses_entry_id: None,
        lines: vec![LineInput::debit("1000", 100), LineInput::credit("4000", 100)],
    };
    let err = posting_service::post(&pool, &req, "test_user")
        .await
        .expect_err("posting into a locked period must fail");
    assert!(matches!(err, PostingError::PeriodLocked { .. }));

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_find_period_by_date_respects_range() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    let period_id = common::setup_period(&pool, org_id, feb_start(), feb_end(), "open").await;

    let covering = period_repo::find_by_date(&pool, org_id, NaiveDate::from_ymd_opt(2026, 2, 15).unwrap())
        .await
        .unwrap()
        .expect("mid-February date should be covered");
    assert_eq!(covering.id, period_id);

    // Boundary dates are inclusive on both ends
    let on_start = period_repo::find_by_date(&pool, org_id, feb_start()).await.unwrap();
    assert!(on_start.is_some());

    let outside = period_repo::find_by_date(&pool, org_id, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
        .await
        .unwrap();
    assert!(outside.is_none());

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_close_of_unknown_period_fails() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;

    let missing = Uuid::new_v4();
    let err = period_service::close_period(&pool, org_id, missing, "closer", RETAINED_EARNINGS)
        .await
        .expect_err("closing a nonexistent period must fail");
    assert!(matches!(err, PeriodLifecycleError::PeriodNotFound(id) if id == missing));

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_closed_period_row_reflects_lifecycle_fields() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_close_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    let period_id = common::setup_period(&pool, org_id, feb_start(), feb_end(), "open").await;

    post_sale(
        &pool,
        org_id,
        "s1",
        vec![LineInput::debit("1000", 7000), LineInput::credit("4000", 7000)],
    )
    .await;

    period_service::close_period(&pool, org_id, period_id, "closer", RETAINED_EARNINGS)
        .await
        .unwrap();

    let row = period_repo::find_by_id(&pool, org_id, period_id)
        .await
        .unwrap()
        .expect("period should exist");
    assert_eq!(row.status, PeriodStatus::Closed);
    assert!(row.close_hash.is_some());
    assert!(row.locked_by.is_none());
    assert!(row.locked_at.is_none());

    common::cleanup_org(&pool, org_id).await;
}
