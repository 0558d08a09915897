use crate::db::{alert, metric_sample, metric_threshold};
use crate::error::{MonitorError, Result};
use crate::model::{Alert, AlertFilter, MetricSample, MetricThreshold, MetricType};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 默认的存储调用超时
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 指标/阈值/告警存储适配器
///
/// 持久化存储是唯一的共享可变资源，所有状态都按请求往返读写，
/// 不做跨请求缓存。每次调用受超时约束，超时映射为 `Unavailable`；
/// 幂等读取内部重试一次，写入绝不自动重试（避免重复提交）
pub struct MetricStore {
    db: Arc<DatabaseConnection>,
    timeout: Duration,
}

impl MetricStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 数据库连接
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.db.clone()
    }

    /// 受超时约束的写入，不重试
    async fn bounded_write<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, DbErr>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(MonitorError::Unavailable(
                "persistence store write timed out".to_string(),
            )),
        }
    }

    /// 受超时约束的读取，超时后重试一次
    async fn bounded_read<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, DbErr>>,
    {
        match tokio::time::timeout(self.timeout, op()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!("Store read timed out, retrying once");
                match tokio::time::timeout(self.timeout, op()).await {
                    Ok(result) => Ok(result?),
                    Err(_) => Err(MonitorError::Unavailable(
                        "persistence store read timed out".to_string(),
                    )),
                }
            }
        }
    }

    // ========== 指标样本 ==========

    /// 写入指标样本
    pub async fn insert_sample(&self, sample: MetricSample) -> Result<MetricSample> {
        let active: metric_sample::ActiveModel = sample.clone().into();
        self.bounded_write(metric_sample::Entity::insert(active).exec(&*self.db))
            .await?;

        debug!(
            server_id = %sample.server_id,
            metric_type = %sample.metric_type.as_str(),
            value = %sample.value,
            "Metric sample stored"
        );

        Ok(sample)
    }

    /// 查询时间范围内的样本，按时间升序
    pub async fn query_samples(
        &self,
        server_id: &str,
        metric_type: MetricType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>> {
        let db = self.db.clone();
        let server_id = server_id.to_string();
        let metric_type = metric_type.as_str().to_string();

        let models = self
            .bounded_read(move || {
                let db = db.clone();
                let server_id = server_id.clone();
                let metric_type = metric_type.clone();
                async move {
                    metric_sample::Entity::find()
                        .filter(metric_sample::Column::ServerId.eq(server_id))
                        .filter(metric_sample::Column::MetricType.eq(metric_type))
                        .filter(metric_sample::Column::Timestamp.gte(start))
                        .filter(metric_sample::Column::Timestamp.lt(end))
                        .order_by_asc(metric_sample::Column::Timestamp)
                        .all(&*db)
                        .await
                }
            })
            .await?;

        models.into_iter().map(TryInto::try_into).collect()
    }

    // ========== 阈值 ==========

    /// 创建阈值
    pub async fn insert_threshold(&self, threshold: MetricThreshold) -> Result<MetricThreshold> {
        let active: metric_threshold::ActiveModel = threshold.clone().into();
        self.bounded_write(metric_threshold::Entity::insert(active).exec(&*self.db))
            .await?;

        debug!(threshold_id = %threshold.id, "Threshold created");
        Ok(threshold)
    }

    /// 更新阈值
    pub async fn update_threshold(&self, threshold: MetricThreshold) -> Result<MetricThreshold> {
        let active: metric_threshold::ActiveModel = threshold.clone().into();
        self.bounded_write(metric_threshold::Entity::update(active).exec(&*self.db))
            .await?;

        debug!(threshold_id = %threshold.id, "Threshold updated");
        Ok(threshold)
    }

    /// 删除阈值
    ///
    /// 删除不回溯关闭由其触发的告警
    pub async fn delete_threshold(&self, threshold_id: &str) -> Result<()> {
        let result = self
            .bounded_write(
                metric_threshold::Entity::delete_by_id(threshold_id.to_string()).exec(&*self.db),
            )
            .await?;

        if result.rows_affected == 0 {
            return Err(MonitorError::NotFound(format!(
                "threshold {}",
                threshold_id
            )));
        }

        debug!(threshold_id = %threshold_id, "Threshold deleted");
        Ok(())
    }

    /// 获取阈值
    pub async fn get_threshold(&self, threshold_id: &str) -> Result<Option<MetricThreshold>> {
        let db = self.db.clone();
        let id = threshold_id.to_string();

        let model = self
            .bounded_read(move || {
                let db = db.clone();
                let id = id.clone();
                async move { metric_threshold::Entity::find_by_id(id).one(&*db).await }
            })
            .await?;

        model.map(TryInto::try_into).transpose()
    }

    /// 列出租户下的全部阈值
    pub async fn list_thresholds(&self, tenant_id: &str) -> Result<Vec<MetricThreshold>> {
        let db = self.db.clone();
        let tenant_id = tenant_id.to_string();

        let models = self
            .bounded_read(move || {
                let db = db.clone();
                let tenant_id = tenant_id.clone();
                async move {
                    metric_threshold::Entity::find()
                        .filter(metric_threshold::Column::TenantId.eq(tenant_id))
                        .order_by_asc(metric_threshold::Column::CreatedAt)
                        .all(&*db)
                        .await
                }
            })
            .await?;

        models.into_iter().map(TryInto::try_into).collect()
    }

    /// 查询对某台服务器的某个指标生效的已启用阈值
    ///
    /// 命中条件：同租户，指标类型一致，server_id 等于该服务器或为空（租户级）
    pub async fn thresholds_for(
        &self,
        tenant_id: &str,
        server_id: &str,
        metric_type: MetricType,
    ) -> Result<Vec<MetricThreshold>> {
        let db = self.db.clone();
        let tenant_id = tenant_id.to_string();
        let server_id = server_id.to_string();
        let metric_type = metric_type.as_str().to_string();

        let models = self
            .bounded_read(move || {
                let db = db.clone();
                let tenant_id = tenant_id.clone();
                let server_id = server_id.clone();
                let metric_type = metric_type.clone();
                async move {
                    metric_threshold::Entity::find()
                        .filter(metric_threshold::Column::TenantId.eq(tenant_id))
                        .filter(metric_threshold::Column::MetricType.eq(metric_type))
                        .filter(metric_threshold::Column::Enabled.eq(true))
                        .filter(
                            Condition::any()
                                .add(metric_threshold::Column::ServerId.eq(server_id))
                                .add(metric_threshold::Column::ServerId.is_null()),
                        )
                        .all(&*db)
                        .await
                }
            })
            .await?;

        models.into_iter().map(TryInto::try_into).collect()
    }

    // ========== 告警 ==========

    /// 创建告警
    pub async fn insert_alert(&self, alert: Alert) -> Result<Alert> {
        let active: alert::ActiveModel = alert.clone().into();
        self.bounded_write(alert::Entity::insert(active).exec(&*self.db))
            .await?;

        debug!(alert_id = %alert.id, server_id = %alert.server_id, "Alert stored");
        Ok(alert)
    }

    /// 更新告警
    pub async fn update_alert(&self, alert: Alert) -> Result<Alert> {
        let active: alert::ActiveModel = alert.clone().into();
        self.bounded_write(alert::Entity::update(active).exec(&*self.db))
            .await?;

        debug!(alert_id = %alert.id, status = %alert.status.as_str(), "Alert updated");
        Ok(alert)
    }

    /// 获取告警
    pub async fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        let db = self.db.clone();
        let id = alert_id.to_string();

        let model = self
            .bounded_read(move || {
                let db = db.clone();
                let id = id.clone();
                async move { alert::Entity::find_by_id(id).one(&*db).await }
            })
            .await?;

        model.map(TryInto::try_into).transpose()
    }

    /// 查找某服务器某指标上的活跃告警
    ///
    /// 不变量：每个 (server_id, metric_type) 至多一条 ACTIVE 告警
    pub async fn find_active_alert(
        &self,
        server_id: &str,
        metric_type: MetricType,
    ) -> Result<Option<Alert>> {
        let db = self.db.clone();
        let server_id = server_id.to_string();
        let metric_type = metric_type.as_str().to_string();

        let model = self
            .bounded_read(move || {
                let db = db.clone();
                let server_id = server_id.clone();
                let metric_type = metric_type.clone();
                async move {
                    alert::Entity::find()
                        .filter(alert::Column::ServerId.eq(server_id))
                        .filter(alert::Column::MetricType.eq(metric_type))
                        .filter(alert::Column::Status.eq("ACTIVE"))
                        .one(&*db)
                        .await
                }
            })
            .await?;

        model.map(TryInto::try_into).transpose()
    }

    /// 按过滤器分页查询告警，返回（结果，总数）
    pub async fn list_alerts(&self, filter: &AlertFilter) -> Result<(Vec<Alert>, u64)> {
        let mut query = alert::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(alert::Column::Status.eq(status.as_str()));
        }
        if let Some(severity) = filter.severity {
            query = query.filter(alert::Column::Severity.eq(severity.as_str()));
        }
        if let Some(server_id) = &filter.server_id {
            query = query.filter(alert::Column::ServerId.eq(server_id.clone()));
        }
        if let Some(server_ids) = &filter.server_ids {
            query = query.filter(alert::Column::ServerId.is_in(server_ids.clone()));
        }

        let db = self.db.clone();
        let count_query = query.clone();
        let total = self
            .bounded_read(move || {
                let db = db.clone();
                let query = count_query.clone();
                async move { query.count(&*db).await }
            })
            .await?;

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(20).clamp(1, 200);

        let db = self.db.clone();
        let models = self
            .bounded_read(move || {
                let db = db.clone();
                let query = query.clone();
                async move {
                    query
                        .order_by_desc(alert::Column::CreatedAt)
                        .offset((page - 1) * page_size)
                        .limit(page_size)
                        .all(&*db)
                        .await
                }
            })
            .await?;

        let alerts = models
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Alert>>>()?;

        Ok((alerts, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::model::{AlertSeverity, ComparisonDirection};
    use sea_orm::Database;

    async fn create_test_store() -> MetricStore {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        init_schema(&db).await.unwrap();
        MetricStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_sample_roundtrip() {
        let store = create_test_store().await;

        let sample = MetricSample::new("srv_001", MetricType::CpuUsage, 85.5)
            .with_unit("percent");
        store.insert_sample(sample.clone()).await.unwrap();

        let now = Utc::now();
        let found = store
            .query_samples(
                "srv_001",
                MetricType::CpuUsage,
                now - chrono::Duration::hours(1),
                now + chrono::Duration::minutes(1),
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 85.5);
        assert_eq!(found[0].unit.as_deref(), Some("percent"));
    }

    #[tokio::test]
    async fn test_thresholds_for_includes_tenant_wide() {
        let store = create_test_store().await;

        // 租户级阈值（server_id 为空）
        let tenant_wide = MetricThreshold::new(
            "tenant_a",
            MetricType::CpuUsage,
            80.0,
            90.0,
            ComparisonDirection::Above,
        );
        store.insert_threshold(tenant_wide).await.unwrap();

        // 针对特定服务器的阈值
        let scoped = MetricThreshold::new(
            "tenant_a",
            MetricType::CpuUsage,
            70.0,
            85.0,
            ComparisonDirection::Above,
        )
        .with_server("srv_001");
        store.insert_threshold(scoped).await.unwrap();

        // 其他服务器的阈值不应命中
        let other = MetricThreshold::new(
            "tenant_a",
            MetricType::CpuUsage,
            60.0,
            75.0,
            ComparisonDirection::Above,
        )
        .with_server("srv_999");
        store.insert_threshold(other).await.unwrap();

        let matching = store
            .thresholds_for("tenant_a", "srv_001", MetricType::CpuUsage)
            .await
            .unwrap();
        assert_eq!(matching.len(), 2);
    }

    #[tokio::test]
    async fn test_thresholds_for_skips_disabled() {
        let store = create_test_store().await;

        let disabled = MetricThreshold::new(
            "tenant_a",
            MetricType::MemoryUsage,
            80.0,
            90.0,
            ComparisonDirection::Above,
        )
        .disabled();
        store.insert_threshold(disabled).await.unwrap();

        let matching = store
            .thresholds_for("tenant_a", "srv_001", MetricType::MemoryUsage)
            .await
            .unwrap();
        assert!(matching.is_empty());
    }

    #[tokio::test]
    async fn test_delete_threshold() {
        let store = create_test_store().await;

        let threshold = MetricThreshold::new(
            "tenant_a",
            MetricType::DiskUsage,
            80.0,
            95.0,
            ComparisonDirection::Above,
        );
        let id = threshold.id.clone();
        store.insert_threshold(threshold).await.unwrap();

        store.delete_threshold(&id).await.unwrap();
        assert!(store.get_threshold(&id).await.unwrap().is_none());

        // 再次删除返回 NotFound
        let err = store.delete_threshold(&id).await.unwrap_err();
        assert!(matches!(err, MonitorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_active_alert() {
        let store = create_test_store().await;

        let alert = Alert::new(
            "srv_001",
            MetricType::CpuUsage,
            AlertSeverity::Critical,
            "CPU usage critical",
            "value=95.0",
        );
        store.insert_alert(alert.clone()).await.unwrap();

        let found = store
            .find_active_alert("srv_001", MetricType::CpuUsage)
            .await
            .unwrap();
        assert!(found.is_some());

        // 其他指标无活跃告警
        let none = store
            .find_active_alert("srv_001", MetricType::MemoryUsage)
            .await
            .unwrap();
        assert!(none.is_none());

        // 解决后不再是活跃告警
        let mut resolved = alert;
        resolved.resolve("operator");
        store.update_alert(resolved).await.unwrap();

        let none = store
            .find_active_alert("srv_001", MetricType::CpuUsage)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_list_alerts_filtered_and_paginated() {
        let store = create_test_store().await;

        for i in 0..5 {
            let severity = if i % 2 == 0 {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Medium
            };
            let alert = Alert::new(
                "srv_001",
                MetricType::CpuUsage,
                severity,
                format!("alert {}", i),
                "test",
            );
            store.insert_alert(alert).await.unwrap();
        }

        let filter = AlertFilter {
            severity: Some(AlertSeverity::Critical),
            ..Default::default()
        };
        let (alerts, total) = store.list_alerts(&filter).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(alerts.len(), 3);

        let filter = AlertFilter {
            page: Some(1),
            page_size: Some(2),
            ..Default::default()
        };
        let (alerts, total) = store.list_alerts(&filter).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(alerts.len(), 2);
    }

    #[tokio::test]
    async fn test_list_alerts_scoped_to_server_set() {
        let store = create_test_store().await;

        for server_id in ["srv_001", "srv_002", "srv_003"] {
            let alert = Alert::new(
                server_id,
                MetricType::CpuUsage,
                AlertSeverity::Medium,
                "CPU elevated",
                "test",
            );
            store.insert_alert(alert).await.unwrap();
        }

        // 只返回集合内服务器的告警
        let filter = AlertFilter {
            server_ids: Some(vec!["srv_001".to_string(), "srv_003".to_string()]),
            ..Default::default()
        };
        let (alerts, total) = store.list_alerts(&filter).await.unwrap();
        assert_eq!(total, 2);
        assert!(alerts.iter().all(|a| a.server_id != "srv_002"));
    }
}
