use ops_directory::ServerDirectory;
use ops_maintenance::MaintenanceScheduler;
use ops_monitor::{Aggregator, AlertManager, MetricStore};
use ops_notify::InAppChannel;
use std::sync::Arc;

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 告警管理器
    pub alert_manager: Arc<AlertManager>,

    /// 聚合引擎
    pub aggregator: Arc<Aggregator>,

    /// 指标/阈值存储
    pub metric_store: Arc<MetricStore>,

    /// 维护调度器
    pub scheduler: Arc<MaintenanceScheduler>,

    /// 服务器目录
    pub directory: Arc<dyn ServerDirectory>,

    /// 站内通知渠道
    pub in_app: Arc<InAppChannel>,
}
