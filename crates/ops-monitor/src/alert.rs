use crate::error::{MonitorError, Result};
use crate::model::{Alert, AlertFilter, AlertSeverity, AlertStatus, MetricSample, MetricType};
use crate::store::MetricStore;
use crate::threshold::{AlertDecision, ThresholdEvaluator};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ops_directory::ServerLocks;
use ops_notify::{EventDispatcher, NotifyLevel, OpsEvent};
use std::sync::Arc;
use tracing::{info, warn};

/// 维护状态查询接口
///
/// 由维护子系统（或其适配器）实现，告警管理器据此判断
/// 越限发生时服务器是否处于维护窗口内
#[async_trait]
pub trait MaintenanceChecker: Send + Sync {
    async fn in_maintenance(&self, server_id: &str, at: DateTime<Utc>) -> bool;
}

/// 维护窗口内的告警策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenancePolicy {
    /// 照常开启告警，但在描述中注明处于维护窗口（默认）
    Annotate,
    /// 丢弃越限，只记录日志
    Suppress,
}

/// 样本摄入结果
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// 已持久化的样本
    pub sample: MetricSample,
    /// 本次摄入开启、更新或解决的告警
    pub alert: Option<Alert>,
}

/// 告警生命周期管理器
///
/// 状态机：ACTIVE → ACKNOWLEDGED → RESOLVED，ACTIVE → RESOLVED（自动清除），
/// ACTIVE|ACKNOWLEDGED → DISMISSED。RESOLVED 与 DISMISSED 为终态，
/// 终态之后的新越限会创建新的告警记录。
/// 同一服务器上的开启/解决操作经由按服务器划分的锁串行执行
pub struct AlertManager {
    store: Arc<MetricStore>,
    locks: Arc<ServerLocks>,
    dispatcher: Arc<EventDispatcher>,
    maintenance: Option<Arc<dyn MaintenanceChecker>>,
    policy: MaintenancePolicy,
}

impl AlertManager {
    pub fn new(
        store: Arc<MetricStore>,
        locks: Arc<ServerLocks>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            store,
            locks,
            dispatcher,
            maintenance: None,
            policy: MaintenancePolicy::Annotate,
        }
    }

    pub fn with_maintenance_checker(
        mut self,
        checker: Arc<dyn MaintenanceChecker>,
        policy: MaintenancePolicy,
    ) -> Self {
        self.maintenance = Some(checker);
        self.policy = policy;
        self
    }

    /// 摄入样本：持久化、评估阈值、应用结论
    ///
    /// # 错误
    /// * `ValidationError` - 样本值非法
    /// * `Unavailable` - 存储超时
    pub async fn ingest(&self, sample: MetricSample, tenant_id: &str) -> Result<IngestOutcome> {
        sample.validate()?;

        // 同一服务器上评估与告警写入串行执行，保证去重不变量
        let _guard = self.locks.acquire(&sample.server_id).await;

        let sample = self.store.insert_sample(sample).await?;
        let thresholds = self
            .store
            .thresholds_for(tenant_id, &sample.server_id, sample.metric_type)
            .await?;

        let decision = ThresholdEvaluator::evaluate(&sample, &thresholds);
        let alert = self.apply_decision(&sample, decision).await?;

        Ok(IngestOutcome { sample, alert })
    }

    /// 应用评估结论（调用方必须持有该服务器的锁）
    async fn apply_decision(
        &self,
        sample: &MetricSample,
        decision: AlertDecision,
    ) -> Result<Option<Alert>> {
        match decision {
            AlertDecision::Breach {
                severity, message, ..
            } => {
                let in_maintenance = match &self.maintenance {
                    Some(checker) => checker.in_maintenance(&sample.server_id, Utc::now()).await,
                    None => false,
                };

                if in_maintenance && self.policy == MaintenancePolicy::Suppress {
                    warn!(
                        server_id = %sample.server_id,
                        metric_type = %sample.metric_type.as_str(),
                        value = %sample.value,
                        "Breach suppressed: server is in a maintenance window"
                    );
                    return Ok(None);
                }

                let description = if in_maintenance {
                    format!("{} (during maintenance window)", message)
                } else {
                    message
                };

                match self
                    .store
                    .find_active_alert(&sample.server_id, sample.metric_type)
                    .await?
                {
                    Some(mut existing) => {
                        // 重复越限就地更新，不产生重复告警
                        existing.update_breach(severity, description);
                        let updated = self.store.update_alert(existing).await?;

                        info!(
                            alert_id = %updated.id,
                            server_id = %updated.server_id,
                            severity = %updated.severity.as_str(),
                            "Active alert updated by repeated breach"
                        );

                        self.emit(&updated, "Alert updated");
                        Ok(Some(updated))
                    }
                    None => {
                        let alert = Alert::new(
                            sample.server_id.clone(),
                            sample.metric_type,
                            severity,
                            format!("{} threshold breached", sample.metric_type.as_str()),
                            description,
                        );
                        let alert = self.store.insert_alert(alert).await?;

                        info!(
                            alert_id = %alert.id,
                            server_id = %alert.server_id,
                            severity = %alert.severity.as_str(),
                            "Alert opened"
                        );

                        self.emit(&alert, "Alert opened");
                        Ok(Some(alert))
                    }
                }
            }
            AlertDecision::Clear => {
                match self
                    .store
                    .find_active_alert(&sample.server_id, sample.metric_type)
                    .await?
                {
                    Some(mut active) => {
                        active.resolve("auto");
                        let resolved = self.store.update_alert(active).await?;

                        info!(
                            alert_id = %resolved.id,
                            server_id = %resolved.server_id,
                            "Alert auto-resolved: metric back within threshold"
                        );

                        self.emit(&resolved, "Alert auto-resolved");
                        Ok(Some(resolved))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// 确认告警，仅允许从 ACTIVE 转换
    pub async fn acknowledge(&self, alert_id: &str, by: &str) -> Result<Alert> {
        let alert = self.require_alert(alert_id).await?;
        let _guard = self.locks.acquire(&alert.server_id).await;

        // 持锁后重读，避免与并发转换竞争
        let mut alert = self.require_alert(alert_id).await?;
        if alert.status != AlertStatus::Active {
            return Err(MonitorError::InvalidTransition {
                from: alert.status,
                action: "acknowledge",
            });
        }

        alert.acknowledge(by);
        let alert = self.store.update_alert(alert).await?;

        info!(alert_id = %alert.id, by = %by, "Alert acknowledged");
        self.emit(&alert, "Alert acknowledged");
        Ok(alert)
    }

    /// 解决告警，允许从 ACTIVE 或 ACKNOWLEDGED 转换
    pub async fn resolve(&self, alert_id: &str, by: &str) -> Result<Alert> {
        let alert = self.require_alert(alert_id).await?;
        let _guard = self.locks.acquire(&alert.server_id).await;

        let mut alert = self.require_alert(alert_id).await?;
        if !matches!(
            alert.status,
            AlertStatus::Active | AlertStatus::Acknowledged
        ) {
            return Err(MonitorError::InvalidTransition {
                from: alert.status,
                action: "resolve",
            });
        }

        alert.resolve(by);
        let alert = self.store.update_alert(alert).await?;

        info!(alert_id = %alert.id, by = %by, "Alert resolved");
        self.emit(&alert, "Alert resolved");
        Ok(alert)
    }

    /// 忽略告警，允许从 ACTIVE 或 ACKNOWLEDGED 转换，之后不再跟踪该越限
    pub async fn dismiss(&self, alert_id: &str, by: &str, reason: &str) -> Result<Alert> {
        let alert = self.require_alert(alert_id).await?;
        let _guard = self.locks.acquire(&alert.server_id).await;

        let mut alert = self.require_alert(alert_id).await?;
        if !matches!(
            alert.status,
            AlertStatus::Active | AlertStatus::Acknowledged
        ) {
            return Err(MonitorError::InvalidTransition {
                from: alert.status,
                action: "dismiss",
            });
        }

        alert.dismiss(by, reason);
        let alert = self.store.update_alert(alert).await?;

        info!(alert_id = %alert.id, by = %by, reason = %reason, "Alert dismissed");
        self.emit(&alert, "Alert dismissed");
        Ok(alert)
    }

    /// 获取告警
    pub async fn get(&self, alert_id: &str) -> Result<Option<Alert>> {
        self.store.get_alert(alert_id).await
    }

    /// 分页查询告警
    pub async fn list(&self, filter: &AlertFilter) -> Result<(Vec<Alert>, u64)> {
        self.store.list_alerts(filter).await
    }

    async fn require_alert(&self, alert_id: &str) -> Result<Alert> {
        self.store
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| MonitorError::NotFound(format!("alert {}", alert_id)))
    }

    /// 发出通知事件，投递在后台进行，不阻塞触发操作
    fn emit(&self, alert: &Alert, title: &str) {
        let event = OpsEvent::alert(
            alert.server_id.clone(),
            notify_level(alert.severity),
            title,
            alert.description.clone(),
        )
        .with_payload(serde_json::json!({
            "alert_id": alert.id,
            "metric_type": alert.metric_type.as_str(),
            "severity": alert.severity.as_str(),
            "status": alert.status.as_str(),
        }));

        self.dispatcher.dispatch_detached(event);
    }
}

fn notify_level(severity: AlertSeverity) -> NotifyLevel {
    match severity {
        AlertSeverity::Low => NotifyLevel::Info,
        AlertSeverity::Medium => NotifyLevel::Warning,
        AlertSeverity::High => NotifyLevel::Error,
        AlertSeverity::Critical => NotifyLevel::Critical,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::model::{ComparisonDirection, MetricThreshold};
    use ops_notify::InAppChannel;
    use sea_orm::Database;

    struct AlwaysInMaintenance;

    #[async_trait]
    impl MaintenanceChecker for AlwaysInMaintenance {
        async fn in_maintenance(&self, _server_id: &str, _at: DateTime<Utc>) -> bool {
            true
        }
    }

    async fn create_test_manager() -> (AlertManager, Arc<MetricStore>, Arc<InAppChannel>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        init_schema(&db).await.unwrap();

        let store = Arc::new(MetricStore::new(Arc::new(db)));
        let dispatcher = Arc::new(EventDispatcher::new(NotifyLevel::Info));
        let channel = Arc::new(InAppChannel::new(100));
        dispatcher.register(channel.clone()).await;

        let manager = AlertManager::new(store.clone(), Arc::new(ServerLocks::new()), dispatcher);
        (manager, store, channel)
    }

    async fn install_cpu_threshold(store: &MetricStore) {
        let threshold = MetricThreshold::new(
            "tenant_a",
            MetricType::CpuUsage,
            80.0,
            90.0,
            ComparisonDirection::Above,
        );
        store.insert_threshold(threshold).await.unwrap();
    }

    #[tokio::test]
    async fn test_breach_opens_then_clears() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        // 越限样本开启严重告警
        let sample = MetricSample::new("srv_001", MetricType::CpuUsage, 95.0);
        let outcome = manager.ingest(sample, "tenant_a").await.unwrap();
        let alert = outcome.alert.unwrap();
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.severity, AlertSeverity::Critical);

        // 回落样本自动解决
        let sample = MetricSample::new("srv_001", MetricType::CpuUsage, 50.0);
        let outcome = manager.ingest(sample, "tenant_a").await.unwrap();
        let resolved = outcome.alert.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("auto"));
        assert_eq!(resolved.id, alert.id);
    }

    #[tokio::test]
    async fn test_repeated_breach_is_idempotent() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let first = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();
        let second = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 96.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();

        // 同一条活跃告警被更新，不产生重复
        assert_eq!(first.id, second.id);

        let filter = AlertFilter {
            status: Some(AlertStatus::Active),
            server_id: Some("srv_001".to_string()),
            ..Default::default()
        };
        let (_alerts, total) = manager.list(&filter).await.unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_breach_escalates_severity_in_place() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let warning = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 85.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();
        assert_eq!(warning.severity, AlertSeverity::Medium);

        let escalated = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();
        assert_eq!(escalated.id, warning.id);
        assert_eq!(escalated.severity, AlertSeverity::Critical);
    }

    #[tokio::test]
    async fn test_new_breach_after_terminal_creates_fresh_alert() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let first = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();
        manager.dismiss(&first.id, "operator", "known issue").await.unwrap();

        // 终态后的新越限产生新的告警记录
        let second = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 97.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, AlertStatus::Active);
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let alert = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();

        let acked = manager.acknowledge(&alert.id, "operator").await.unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);

        // 已确认的告警不能再次确认
        let err = manager.acknowledge(&alert.id, "operator").await.unwrap_err();
        assert!(matches!(err, MonitorError::InvalidTransition { .. }));

        let resolved = manager.resolve(&alert.id, "operator").await.unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);

        // RESOLVED 是终态
        let err = manager.acknowledge(&alert.id, "operator").await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::InvalidTransition {
                from: AlertStatus::Resolved,
                ..
            }
        ));
        let err = manager.dismiss(&alert.id, "operator", "n/a").await.unwrap_err();
        assert!(matches!(err, MonitorError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_alert_is_not_found() {
        let (manager, _store, _channel) = create_test_manager().await;

        let err = manager.acknowledge("alr_missing", "operator").await.unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transitions_emit_events() {
        let (manager, store, channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let alert = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();
        manager.acknowledge(&alert.id, "operator").await.unwrap();

        // 后台分发完成后，开启与确认各一条事件
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(channel.len().await, 2);
    }

    #[tokio::test]
    async fn test_maintenance_annotate_policy() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let manager = manager.with_maintenance_checker(
            Arc::new(AlwaysInMaintenance),
            MaintenancePolicy::Annotate,
        );

        let alert = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap()
            .alert
            .unwrap();

        // 注明维护窗口但不抑制
        assert_eq!(alert.status, AlertStatus::Active);
        assert!(alert.description.contains("during maintenance window"));
    }

    #[tokio::test]
    async fn test_maintenance_suppress_policy() {
        let (manager, store, _channel) = create_test_manager().await;
        install_cpu_threshold(&store).await;

        let manager = manager.with_maintenance_checker(
            Arc::new(AlwaysInMaintenance),
            MaintenancePolicy::Suppress,
        );

        let outcome = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, 95.0), "tenant_a")
            .await
            .unwrap();

        // 越限被抑制，样本仍然落库
        assert!(outcome.alert.is_none());
        let active = store
            .find_active_alert("srv_001", MetricType::CpuUsage)
            .await
            .unwrap();
        assert!(active.is_none());
    }

    #[tokio::test]
    async fn test_invalid_sample_rejected() {
        let (manager, _store, _channel) = create_test_manager().await;

        let err = manager
            .ingest(MetricSample::new("srv_001", MetricType::CpuUsage, -5.0), "tenant_a")
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::ValidationError(_)));
    }
}
