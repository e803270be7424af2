mod common;

use common::*;
use futures_util::future::join_all;
use points_ledger::entities::{PointKind, PointSource, UsageType};
use points_ledger::error::AppError;
use points_ledger::models::SpendDetails;

async fn fund(svc: &Services, user_id: i64, free: i64, paid: i64) {
    if free > 0 {
        svc.points
            .acquire(user_id, PointKind::Free, free, PointSource::DailyAttendance, days_from_now(30), None)
            .await
            .unwrap();
    }
    if paid > 0 {
        svc.points
            .acquire(user_id, PointKind::Paid, paid, PointSource::Purchase, days_from_now(365), None)
            .await
            .unwrap();
    }
}

fn chat_details() -> SpendDetails {
    SpendDetails {
        description: Some("chat reply".to_string()),
        related_chat_id: Some("chat-1".to_string()),
        related_message_id: Some("msg-9".to_string()),
    }
}

#[tokio::test]
async fn test_free_points_are_consumed_before_paid() {
    let svc = services().await;
    fund(&svc, 1, 5, 10).await;

    let outcome = svc
        .points
        .spend(1, 8, UsageType::ChatMessage, chat_details())
        .await
        .unwrap();

    assert_eq!(outcome.free_used, 5);
    assert_eq!(outcome.paid_used, 3);
    assert_eq!(outcome.balance.free, 0);
    assert_eq!(outcome.balance.paid, 7);

    let balance = svc.points.get_balance(1).await.unwrap();
    assert_eq!((balance.free, balance.paid, balance.total), (0, 7, 7));

    let records = spend_records(&svc.db, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].points_used, 8);
    assert_eq!(records[0].related_chat_id.as_deref(), Some("chat-1"));
    assert_eq!(records[0].transaction_details["free_used"], 5);
    assert_eq!(records[0].transaction_details["paid_used"], 3);
}

#[tokio::test]
async fn test_insufficient_funds_changes_nothing() {
    let svc = services().await;
    fund(&svc, 1, 3, 2).await;

    let err = svc
        .points
        .spend(1, 10, UsageType::ResponseBoost, SpendDetails::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientFunds {
            required: 10,
            available: 5
        }
    ));
    let balance = svc.points.get_balance(1).await.unwrap();
    assert_eq!((balance.free, balance.paid), (3, 2));
    assert!(spend_records(&svc.db, 1).await.is_empty());
}

#[tokio::test]
async fn test_user_without_balance_row_cannot_spend() {
    let svc = services().await;

    let err = svc
        .points
        .spend(42, 1, UsageType::ChatMessage, SpendDetails::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientFunds { available: 0, .. }));
    assert_eq!(svc.points.get_balance(42).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_zero_cost_writes_no_record_and_negative_cost_is_rejected() {
    let svc = services().await;
    fund(&svc, 1, 4, 0).await;

    let outcome = svc
        .points
        .spend(1, 0, UsageType::ChatMessage, SpendDetails::default())
        .await
        .unwrap();
    assert_eq!(outcome.record_id, None);
    assert_eq!(outcome.balance.free, 4);

    let err = svc
        .points
        .spend(1, -3, UsageType::ChatMessage, SpendDetails::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    assert!(spend_records(&svc.db, 1).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_spends_never_overdraw() {
    let svc = services().await;
    fund(&svc, 1, 12, 8).await;

    let attempts = (0..10).map(|_| {
        svc.points
            .spend(1, 3, UsageType::ChatMessage, SpendDetails::default())
    });
    let results = join_all(attempts).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::InsufficientFunds { .. })))
        .count();
    assert_eq!(succeeded, 6);
    assert_eq!(rejected, 4);

    let balance = svc.points.get_balance(1).await.unwrap();
    assert_eq!(balance.total, 2);
    assert!(balance.free >= 0 && balance.paid >= 0);
    assert_eq!(spend_records(&svc.db, 1).await.len(), 6);
}

#[tokio::test]
async fn test_cache_only_policy_leaves_ledger_untouched() {
    let svc = services().await;
    fund(&svc, 1, 10, 0).await;

    svc.points
        .spend(1, 4, UsageType::ChatMessage, SpendDetails::default())
        .await
        .unwrap();

    let entries = ledger_entries(&svc.db, 1).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].balance, 10);
}

#[tokio::test]
async fn test_ledger_fifo_policy_drains_oldest_expiring_batch_first() {
    let svc = services_with(fifo_config()).await;
    let late = svc
        .points
        .acquire(1, PointKind::Free, 10, PointSource::Referral, days_from_now(200), None)
        .await
        .unwrap();
    let soon = svc
        .points
        .acquire(1, PointKind::Free, 5, PointSource::DailyAttendance, days_from_now(3), None)
        .await
        .unwrap();
    svc.points
        .acquire(1, PointKind::Paid, 20, PointSource::Purchase, days_from_now(365), None)
        .await
        .unwrap();

    let outcome = svc
        .points
        .spend(1, 18, UsageType::ChatMessage, SpendDetails::default())
        .await
        .unwrap();
    assert_eq!((outcome.free_used, outcome.paid_used), (15, 3));

    let entries = ledger_entries(&svc.db, 1).await;
    let balance_of = |id: i64| entries.iter().find(|e| e.id == id).unwrap().balance;
    assert_eq!(balance_of(soon), 0);
    assert_eq!(balance_of(late), 0);
    assert_eq!(active_ledger_total(&svc.db, 1, PointKind::Paid).await, 17);

    // 流水与缓存一致，对账无需修正
    let diffs = svc.reconciliation.reconcile_user(1).await.unwrap();
    assert!(diffs.iter().all(|d| !d.corrected));
}

#[tokio::test]
async fn test_ledger_fifo_policy_partially_drains_a_batch() {
    let svc = services_with(fifo_config()).await;
    let first = svc
        .points
        .acquire(1, PointKind::Free, 10, PointSource::DailyAttendance, days_from_now(5), None)
        .await
        .unwrap();
    let second = svc
        .points
        .acquire(1, PointKind::Free, 10, PointSource::DailyAttendance, days_from_now(6), None)
        .await
        .unwrap();

    svc.points
        .spend(1, 7, UsageType::ChatMessage, SpendDetails::default())
        .await
        .unwrap();

    let entries = ledger_entries(&svc.db, 1).await;
    assert_eq!(entries.iter().find(|e| e.id == first).unwrap().balance, 3);
    assert_eq!(entries.iter().find(|e| e.id == second).unwrap().balance, 10);
}
