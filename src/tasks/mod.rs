//! Background scheduled tasks for the application.
//!
//! Call `spawn_all` once during startup.

use crate::config::{ConsumptionPolicy, PointsConfig};
use crate::services::ReconciliationService;

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(config: &PointsConfig, reconciliation_service: ReconciliationService) {
    // 定时全量对账，interval 为 0 时关闭
    if config.reconcile_interval_secs > 0 {
        if config.consumption_policy == ConsumptionPolicy::CacheOnly {
            // cache_only 下的扣费不写流水，对账会把已消费的积分补回缓存
            log::warn!(
                "Scheduled reconciliation is enabled with the cache_only consumption policy"
            );
        }
        let interval = std::time::Duration::from_secs(config.reconcile_interval_secs);
        let svc = reconciliation_service;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match svc.reconcile_all().await {
                    Ok(summary) if summary.users_corrected > 0 || summary.users_failed > 0 => {
                        log::warn!(
                            "Scheduled reconciliation corrected {} users, {} failed",
                            summary.users_corrected,
                            summary.users_failed
                        );
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Scheduled reconciliation failed: {e:?}"),
                }
            }
        });
    } else {
        log::info!("Scheduled reconciliation disabled");
    }
}
