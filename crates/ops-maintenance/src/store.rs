use crate::db::maintenance_window;
use crate::error::{MaintenanceError, Result};
use crate::model::{MaintenanceStatus, MaintenanceWindow, WindowFilter};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// 默认的存储调用超时
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// 维护窗口存储适配器
///
/// 与指标存储相同的超时策略：读取重试一次，写入绝不自动重试
pub struct MaintenanceStore {
    db: Arc<DatabaseConnection>,
    timeout: Duration,
}

impl MaintenanceStore {
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

    async fn bounded_write<T, Fut>(&self, fut: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, DbErr>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(MaintenanceError::Unavailable(
                "persistence store write timed out".to_string(),
            )),
        }
    }

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
                    Err(_) => Err(MaintenanceError::Unavailable(
                        "persistence store read timed out".to_string(),
                    )),
                }
            }
        }
    }

    /// 创建维护窗口
    pub async fn insert_window(&self, window: MaintenanceWindow) -> Result<MaintenanceWindow> {
        let active: maintenance_window::ActiveModel = window.clone().into();
        self.bounded_write(maintenance_window::Entity::insert(active).exec(&*self.db))
            .await?;

        debug!(window_id = %window.id, server_id = %window.server_id, "Maintenance window stored");
        Ok(window)
    }

    /// 更新维护窗口
    pub async fn update_window(&self, window: MaintenanceWindow) -> Result<MaintenanceWindow> {
        let active: maintenance_window::ActiveModel = window.clone().into();
        self.bounded_write(maintenance_window::Entity::update(active).exec(&*self.db))
            .await?;

        debug!(window_id = %window.id, status = %window.status.as_str(), "Maintenance window updated");
        Ok(window)
    }

    /// 获取维护窗口
    pub async fn get_window(&self, window_id: &str) -> Result<Option<MaintenanceWindow>> {
        let db = self.db.clone();
        let id = window_id.to_string();

        let model = self
            .bounded_read(move || {
                let db = db.clone();
                let id = id.clone();
                async move { maintenance_window::Entity::find_by_id(id).one(&*db).await }
            })
            .await?;

        model.map(TryInto::try_into).transpose()
    }

    /// 列出某服务器的全部非取消窗口
    ///
    /// 冲突检测只需按服务器范围查询，复杂度 O(k)
    pub async fn list_active_for_server(&self, server_id: &str) -> Result<Vec<MaintenanceWindow>> {
        let db = self.db.clone();
        let server_id = server_id.to_string();

        let models = self
            .bounded_read(move || {
                let db = db.clone();
                let server_id = server_id.clone();
                async move {
                    maintenance_window::Entity::find()
                        .filter(maintenance_window::Column::ServerId.eq(server_id))
                        .filter(maintenance_window::Column::Status.ne("CANCELLED"))
                        .order_by_asc(maintenance_window::Column::StartTime)
                        .all(&*db)
                        .await
                }
            })
            .await?;

        models.into_iter().map(TryInto::try_into).collect()
    }

    /// 查找某服务器在指定时刻生效的窗口
    ///
    /// 生效定义：已审批或进行中，且 start_time <= at < end_time
    pub async fn active_window_at(
        &self,
        server_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<MaintenanceWindow>> {
        let db = self.db.clone();
        let server_id = server_id.to_string();

        let model = self
            .bounded_read(move || {
                let db = db.clone();
                let server_id = server_id.clone();
                async move {
                    maintenance_window::Entity::find()
                        .filter(maintenance_window::Column::ServerId.eq(server_id))
                        .filter(
                            maintenance_window::Column::Status
                                .is_in(["APPROVED", "IN_PROGRESS"]),
                        )
                        .filter(maintenance_window::Column::StartTime.lte(at))
                        .filter(maintenance_window::Column::EndTime.gt(at))
                        .one(&*db)
                        .await
                }
            })
            .await?;

        model.map(TryInto::try_into).transpose()
    }

    /// 按过滤器分页查询窗口，返回（结果，总数）
    pub async fn list_windows(
        &self,
        filter: &WindowFilter,
    ) -> Result<(Vec<MaintenanceWindow>, u64)> {
        let mut query = maintenance_window::Entity::find();

        if let Some(server_id) = &filter.server_id {
            query = query.filter(maintenance_window::Column::ServerId.eq(server_id.clone()));
        }
        if let Some(server_ids) = &filter.server_ids {
            query = query.filter(maintenance_window::Column::ServerId.is_in(server_ids.clone()));
        }
        if let Some(status) = filter.status {
            query = query.filter(maintenance_window::Column::Status.eq(status.as_str()));
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
                        .order_by_asc(maintenance_window::Column::StartTime)
                        .offset((page - 1) * page_size)
                        .limit(page_size)
                        .all(&*db)
                        .await
                }
            })
            .await?;

        let windows = models
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<MaintenanceWindow>>>()?;

        Ok((windows, total))
    }
}
