//! Reversal Integration Tests
//!
//! Append-only corrections: a reversal mirrors the original with swapped
//! sides, links back to it, and nets the affected accounts to zero. The
//! original row is never touched.
//!
//! Note: these tests need DATABASE_URL pointing at a migrated database and
//! are marked #[ignore] so plain `cargo test` stays green without one.

mod common;

use chrono::NaiveDate;
use serial_test::serial;
use uuid::Uuid;

use gl_core::contracts::posting_request::{EntrySource, LineInput, PostingRequest};
use gl_core::services::posting_service;
use gl_core::services::reversal_service::{self, ReversalError};

fn feb(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

async fn post_original(pool: &sqlx::PgPool, org_id: &str) -> Uuid {
    let req = PostingRequest {
        org_id: org_id.to_string(),
        branch_id: None,
        entry_date: feb(10),
        memo: "Original sale".to_string(),
        source: EntrySource::Sale,
        source_ref: Some("sale_orig".to_string()),
        reverses_entry_id: None,
        lines: vec![
            LineInput::debit("1000", 11000),
            LineInput::credit("4000", 10000),
            LineInput::credit("2300", 1000),
        ],
    };
    posting_service::post(pool, &req, "test_user")
        .await
        .expect("original entry should post")
        .entry
        .id
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_reversal_swaps_sides_and_links_original() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_rev_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    common::setup_period(&pool, org_id, feb(1), feb(28), "open").await;

    let original_id = post_original(&pool, org_id).await;

    let reversal = reversal_service::reverse_entry(&pool, org_id, original_id, feb(12), "fixer")
        .await
        .expect("reversal should post");

    assert!(!reversal.deduplicated);
    assert_eq!(reversal.entry.reverses_entry_id, Some(original_id));
    assert_eq!(reversal.entry.source, EntrySource::Sale);
    assert_eq!(reversal.lines.len(), 3);

    // Sides are swapped relative to the original
    let cash = reversal
        .lines
        .iter()
        .find(|l| l.account_code == "1000")
        .unwrap();
    assert_eq!(cash.credit_minor, 11000);
    assert_eq!(cash.debit_minor, 0);

    // Every touched account nets to zero afterwards
    for code in ["1000", "4000", "2300"] {
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
        assert_eq!(net, 0, "account {code} should net to zero after reversal");
    }

    // The original row is untouched
    let memo: String = sqlx::query_scalar("SELECT memo FROM journal_entries WHERE id = $1")
        .bind(original_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(memo, "Original sale");

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_entry_can_be_reversed_only_once() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_rev_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    common::setup_period(&pool, org_id, feb(1), feb(28), "open").await;

    let original_id = post_original(&pool, org_id).await;

    reversal_service::reverse_entry(&pool, org_id, original_id, feb(12), "fixer")
        .await
        .unwrap();

    let err = reversal_service::reverse_entry(&pool, org_id, original_id, feb(13), "fixer")
        .await
        .expect_err("second reversal must fail");
    assert!(matches!(err, ReversalError::AlreadyReversed(id) if id == original_id));

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_reversal_entry_itself_cannot_be_reversed() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_rev_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    common::setup_period(&pool, org_id, feb(1), feb(28), "open").await;

    let original_id = post_original(&pool, org_id).await;

    let reversal = reversal_service::reverse_entry(&pool, org_id, original_id, feb(12), "fixer")
        .await
        .unwrap();
    let reversal_id = reversal.entry.id;

    // Reversing the reversal would re-apply the original sale
    let err = reversal_service::reverse_entry(&pool, org_id, reversal_id, feb(13), "fixer")
        .await
        .expect_err("a reversal entry must not be reversible");
    assert!(matches!(err, ReversalError::CannotReverseReversal(id) if id == reversal_id));

    // Nothing new was posted: original plus exactly one reversal
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM journal_entries WHERE org_id = $1")
            .bind(org_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(count, 2);

    common::cleanup_org(&pool, org_id).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_reversal_of_foreign_org_entry_is_not_found() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_rev_{}", Uuid::new_v4().simple());
    let other_org = &format!("org_rev_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    common::setup_period(&pool, org_id, feb(1), feb(28), "open").await;

    let original_id = post_original(&pool, org_id).await;

    // A different org cannot see, let alone reverse, the entry
    let err = reversal_service::reverse_entry(&pool, other_org, original_id, feb(12), "fixer")
        .await
        .expect_err("cross-org reversal must fail");
    assert!(matches!(err, ReversalError::EntryNotFound(id) if id == original_id));

    common::cleanup_org(&pool, org_id).await;
    common::cleanup_org(&pool, other_org).await;
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_reversal_into_locked_period_rejected() {
    let pool = common::get_test_pool().await;
    let org_id = &format!("org_rev_{}", Uuid::new_v4().simple());
    common::setup_basic_chart(&pool, org_id).await;
    common::setup_period(&pool, org_id, feb(1), feb(28), "open").await;
    common::setup_period(
        &pool,
        org_id,
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        "locked",
    )
    .await;

    let original_id = post_original(&pool, org_id).await;

    // Dating the reversal into a locked period trips the period gate
    let err = reversal_service::reverse_entry(
        &pool,
        org_id,
        original_id,
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        "fixer",
    )
    .await
    .expect_err("reversal dated in a locked period must fail");
    assert!(matches!(err, ReversalError::Posting(_)));

    common::cleanup_org(&pool, org_id).await;
}
