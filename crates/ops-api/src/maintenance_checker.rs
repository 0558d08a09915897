use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ops_maintenance::MaintenanceStore;
use ops_monitor::MaintenanceChecker;
use std::sync::Arc;
use tracing::warn;

/// 告警维护检查的存储适配器
///
/// 维护窗口查询失败时按"不在维护中"处理，
/// 告警路径的可用性优先于注明的准确性
pub struct StoreMaintenanceChecker {
    store: Arc<MaintenanceStore>,
}

impl StoreMaintenanceChecker {
    pub fn new(store: Arc<MaintenanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MaintenanceChecker for StoreMaintenanceChecker {
    async fn in_maintenance(&self, server_id: &str, at: DateTime<Utc>) -> bool {
        match self.store.active_window_at(server_id, at).await {
            Ok(window) => window.is_some(),
            Err(e) => {
                warn!(server_id = %server_id, error = %e, "Maintenance lookup failed, treating as not in maintenance");
                false
            }
        }
    }
}
