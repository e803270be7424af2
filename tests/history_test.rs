mod common;

use chrono::Duration;
use common::*;
use points_ledger::entities::{PointKind, PointSource};
use points_ledger::error::AppError;
use points_ledger::models::{HistoryItem, HistoryKind, HistoryQuery, MAX_OFFSET};
use points_ledger::services::ledger::{self as ledger_store, NewLedgerEntry};

async fn seed_earn(svc: &Services, user_id: i64, minutes_ago: i64) -> i64 {
    let acquired_at = days_ago(0) - Duration::minutes(minutes_ago);
    let entry = NewLedgerEntry::grant(
        user_id,
        PointKind::Free,
        10,
        PointSource::DailyAttendance,
        acquired_at,
        acquired_at + Duration::days(365),
    );
    ledger_store::append(&svc.db, entry).await.unwrap()
}

async fn seed_spent(svc: &Services, user_id: i64, minutes_ago: i64) -> i64 {
    seed_spend(&svc.db, user_id, 1, days_ago(0) - Duration::minutes(minutes_ago)).await
}

fn query(kind: HistoryKind, limit: u64, offset: u64) -> HistoryQuery {
    HistoryQuery {
        limit: Some(limit),
        offset: Some(offset),
        kind,
    }
}

fn labels(items: &[HistoryItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match item {
            HistoryItem::Earn(e) => format!("e{}", e.id),
            HistoryItem::Spend(s) => format!("s{}", s.id),
        })
        .collect()
}

#[tokio::test]
async fn test_all_history_pages_over_the_merged_sequence() {
    let svc = services().await;
    // 时间线（越小越新）: e1@1 s1@2 s2@3 s3@4 e2@5 e3@6
    let e1 = seed_earn(&svc, 1, 1).await;
    let e2 = seed_earn(&svc, 1, 5).await;
    let e3 = seed_earn(&svc, 1, 6).await;
    let s1 = seed_spent(&svc, 1, 2).await;
    let s2 = seed_spent(&svc, 1, 3).await;
    let s3 = seed_spent(&svc, 1, 4).await;

    let first = svc.points.get_history(1, &query(HistoryKind::All, 2, 0)).await.unwrap();
    let second = svc.points.get_history(1, &query(HistoryKind::All, 2, 2)).await.unwrap();
    let third = svc.points.get_history(1, &query(HistoryKind::All, 2, 4)).await.unwrap();

    assert_eq!(labels(&first.data), vec![format!("e{e1}"), format!("s{s1}")]);
    assert_eq!(labels(&second.data), vec![format!("s{s2}"), format!("s{s3}")]);
    assert_eq!(labels(&third.data), vec![format!("e{e2}"), format!("e{e3}")]);

    assert_eq!(first.total, 6);
    assert!(first.has_more);
    assert!(!third.has_more);
}

#[tokio::test]
async fn test_single_kind_history() {
    let svc = services().await;
    seed_earn(&svc, 1, 10).await;
    seed_earn(&svc, 1, 20).await;
    seed_spent(&svc, 1, 15).await;
    // 其他用户的数据不可见
    seed_earn(&svc, 2, 5).await;

    let earns = svc.points.get_history(1, &query(HistoryKind::Earn, 10, 0)).await.unwrap();
    assert_eq!(earns.total, 2);
    assert!(earns.data.iter().all(|i| matches!(i, HistoryItem::Earn(_))));
    assert!(earns.data[0].occurred_at() > earns.data[1].occurred_at());

    let spends = svc.points.get_history(1, &query(HistoryKind::Spend, 10, 0)).await.unwrap();
    assert_eq!(spends.total, 1);
    assert!(matches!(spends.data[0], HistoryItem::Spend(_)));
}

#[tokio::test]
async fn test_history_limit_is_clamped() {
    let svc = services().await;
    for minutes in 0..5 {
        seed_earn(&svc, 1, minutes).await;
    }

    let page = svc.points.get_history(1, &query(HistoryKind::All, 10_000, 0)).await.unwrap();
    assert_eq!(page.limit, 100);
    assert_eq!(page.data.len(), 5);

    let defaults = svc.points.get_history(1, &HistoryQuery::default()).await.unwrap();
    assert_eq!(defaults.limit, 20);
    assert_eq!(defaults.offset, 0);
}

#[tokio::test]
async fn test_history_offset_is_bounded() {
    let svc = services().await;
    seed_earn(&svc, 1, 1).await;

    for kind in [HistoryKind::All, HistoryKind::Earn, HistoryKind::Spend] {
        let err = svc
            .points
            .get_history(1, &query(kind, 10, u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    let last = svc
        .points
        .get_history(1, &query(HistoryKind::All, 10, MAX_OFFSET))
        .await
        .unwrap();
    assert!(last.data.is_empty());
    assert!(!last.has_more);
}
