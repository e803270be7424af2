mod common;

use common::*;
use points_ledger::entities::{PointKind, PointSource};
use points_ledger::config::PointsConfig;
use points_ledger::error::AppError;

#[tokio::test]
async fn test_acquire_appends_entry_and_credits_cache() {
    let svc = services().await;
    let expires_at = days_from_now(90);

    let entry_id = svc
        .points
        .acquire(
            7,
            PointKind::Paid,
            25,
            PointSource::Purchase,
            expires_at,
            Some("starter pack".to_string()),
        )
        .await
        .unwrap();

    let entries = ledger_entries(&svc.db, 7).await;
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.id, entry_id);
    assert_eq!((entry.amount, entry.balance), (25, 25));
    assert_eq!(entry.kind, PointKind::Paid);
    assert_eq!(entry.source, PointSource::Purchase);
    assert_eq!(entry.expires_at, expires_at);
    assert_eq!(entry.description.as_deref(), Some("starter pack"));

    let balance = svc.points.get_balance(7).await.unwrap();
    assert_eq!((balance.free, balance.paid), (0, 25));
}

#[tokio::test]
async fn test_acquire_rejects_invalid_grants() {
    let svc = services().await;

    let zero = svc
        .points
        .acquire(1, PointKind::Free, 0, PointSource::AdminGrant, days_from_now(1), None)
        .await;
    assert!(matches!(zero, Err(AppError::ValidationError(_))));

    let expired = svc
        .points
        .acquire(1, PointKind::Free, 5, PointSource::AdminGrant, days_ago(1), None)
        .await;
    assert!(matches!(expired, Err(AppError::ValidationError(_))));

    assert!(ledger_entries(&svc.db, 1).await.is_empty());
    assert_eq!(svc.points.get_balance(1).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_daily_attendance_is_claimed_once_per_day() {
    let svc = services().await;

    let first = svc.grants.claim_daily_attendance(3).await.unwrap();
    assert!(first.claimed);
    assert_eq!(first.points, 10);
    assert_eq!(first.balance.free, 10);

    let second = svc.grants.claim_daily_attendance(3).await.unwrap();
    assert!(!second.claimed);
    assert_eq!(second.points, 0);
    assert_eq!(second.balance.free, 10);

    let entries = ledger_entries(&svc.db, 3).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, PointSource::DailyAttendance);
    assert_eq!(entries[0].kind, PointKind::Free);
}

#[tokio::test]
async fn test_daily_attendance_with_non_positive_points_writes_nothing() {
    let svc = services_with(PointsConfig {
        daily_attendance_points: -5,
        ..points_config()
    })
    .await;

    let err = svc.grants.claim_daily_attendance(3).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
    assert!(ledger_entries(&svc.db, 3).await.is_empty());
    assert_eq!(svc.points.get_balance(3).await.unwrap().free, 0);
}

#[tokio::test]
async fn test_referral_rewards_both_users_once() {
    let svc = services().await;

    let reward = svc.grants.reward_referral(1, 2).await.unwrap();
    assert!(reward.rewarded);
    assert!(reward.referrer_entry_id.is_some());
    assert!(reward.referee_entry_id.is_some());

    assert_eq!(svc.points.get_balance(1).await.unwrap().free, 100);
    assert_eq!(svc.points.get_balance(2).await.unwrap().free, 50);

    let replay = svc.grants.reward_referral(1, 2).await.unwrap();
    assert!(!replay.rewarded);

    // 同一个被推荐人不能再被其他人推荐
    let other = svc.grants.reward_referral(9, 2).await.unwrap();
    assert!(!other.rewarded);

    assert_eq!(svc.points.get_balance(1).await.unwrap().free, 100);
    assert_eq!(svc.points.get_balance(2).await.unwrap().free, 50);
    assert_eq!(svc.points.get_balance(9).await.unwrap().free, 0);
}

#[tokio::test]
async fn test_self_referral_is_rejected() {
    let svc = services().await;
    let err = svc.grants.reward_referral(5, 5).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn test_replayed_purchase_returns_the_original_entry() {
    let svc = services().await;

    let first = svc.grants.credit_purchase(4, 300, "cs_test_123").await.unwrap();
    assert!(!first.replayed);
    assert_eq!(first.balance.paid, 300);

    let replay = svc.grants.credit_purchase(4, 300, "cs_test_123").await.unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.entry_id, first.entry_id);
    assert_eq!(replay.balance.paid, 300);

    let entries = ledger_entries(&svc.db, 4).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, PointSource::Purchase);
    assert_eq!(entries[0].kind, PointKind::Paid);
}

#[tokio::test]
async fn test_purchase_requires_reference_and_positive_points() {
    let svc = services().await;
    assert!(matches!(
        svc.grants.credit_purchase(4, 100, "  ").await,
        Err(AppError::ValidationError(_))
    ));
    assert!(matches!(
        svc.grants.credit_purchase(4, 0, "cs_zero").await,
        Err(AppError::ValidationError(_))
    ));
}

#[tokio::test]
async fn test_admin_grant_uses_admin_source() {
    let svc = services().await;

    let granted = svc
        .grants
        .admin_grant(6, PointKind::Free, 15, Some("support ticket 881".to_string()))
        .await
        .unwrap();
    assert_eq!(granted.balance.free, 15);

    let entries = ledger_entries(&svc.db, 6).await;
    assert_eq!(entries[0].id, granted.entry_id);
    assert_eq!(entries[0].source, PointSource::AdminGrant);
    assert_eq!(entries[0].description.as_deref(), Some("support ticket 881"));
}

#[tokio::test]
async fn test_open_account_is_idempotent() {
    let svc = services().await;

    let opened = svc.grants.open_account(11).await.unwrap();
    assert_eq!(opened.total, 0);

    svc.grants.admin_grant(11, PointKind::Paid, 9, None).await.unwrap();
    let reopened = svc.grants.open_account(11).await.unwrap();
    assert_eq!(reopened.paid, 9);
}
