use crate::error::{MaintenanceError, Result};
use crate::model::{MaintenanceStatus, MaintenanceWindow, WindowConflict, WindowFilter};
use crate::store::MaintenanceStore;
use chrono::{DateTime, Utc};
use ops_directory::ServerLocks;
use ops_notify::{EventDispatcher, NotifyLevel, OpsEvent};
use std::sync::Arc;
use tracing::{info, warn};

/// 维护调度器
///
/// 状态机：SCHEDULED → APPROVED → IN_PROGRESS → COMPLETED；
/// SCHEDULED|APPROVED → CANCELLED；IN_PROGRESS 仅可带原因强制取消。
/// 同一服务器上的"读取既有窗口 → 冲突检测 → 写入"序列由
/// 按服务器划分的锁串行执行，两个并发的重叠创建不可能同时成功
pub struct MaintenanceScheduler {
    store: Arc<MaintenanceStore>,
    locks: Arc<ServerLocks>,
    dispatcher: Arc<EventDispatcher>,
}

impl MaintenanceScheduler {
    pub fn new(
        store: Arc<MaintenanceStore>,
        locks: Arc<ServerLocks>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            store,
            locks,
            dispatcher,
        }
    }

    /// 创建维护窗口
    ///
    /// # 错误
    /// * `ValidationError` - 开始时间不早于结束时间
    /// * `Conflict` - 与既有非取消窗口重叠，错误中带冲突窗口明细
    pub async fn create(
        &self,
        server_id: &str,
        title: &str,
        description: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<MaintenanceWindow> {
        let window = MaintenanceWindow::new(server_id, title, description, start_time, end_time);
        window.validate()?;

        let _guard = self.locks.acquire(server_id).await;

        self.check_conflicts(server_id, start_time, end_time, None)
            .await?;

        let window = self.store.insert_window(window).await?;

        info!(
            window_id = %window.id,
            server_id = %server_id,
            start_time = %window.start_time,
            end_time = %window.end_time,
            "Maintenance window scheduled"
        );

        self.emit(&window, NotifyLevel::Info, "Maintenance window scheduled");
        Ok(window)
    }

    /// 改期维护窗口
    ///
    /// 冲突检测排除窗口自身；改期成功后已审批的窗口回到 SCHEDULED，
    /// 需要重新审批——这是刻意的安全策略
    pub async fn reschedule(
        &self,
        window_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<MaintenanceWindow> {
        if start_time >= end_time {
            return Err(MaintenanceError::validation(
                "Maintenance window start time must be before end time",
            ));
        }

        let window = self.require_window(window_id).await?;
        let _guard = self.locks.acquire(&window.server_id).await;

        // 持锁后重读，避免与并发转换竞争
        let mut window = self.require_window(window_id).await?;
        if !matches!(
            window.status,
            MaintenanceStatus::Scheduled | MaintenanceStatus::Approved
        ) {
            return Err(MaintenanceError::InvalidTransition {
                from: window.status,
                action: "reschedule",
            });
        }

        self.check_conflicts(&window.server_id, start_time, end_time, Some(window_id))
            .await?;

        let was_approved = window.status == MaintenanceStatus::Approved;
        window.reschedule(start_time, end_time);
        let window = self.store.update_window(window).await?;

        info!(
            window_id = %window.id,
            server_id = %window.server_id,
            re_approval_required = was_approved,
            "Maintenance window rescheduled"
        );

        self.emit(&window, NotifyLevel::Info, "Maintenance window rescheduled");
        Ok(window)
    }

    /// 审批维护窗口，仅允许从 SCHEDULED 转换
    pub async fn approve(&self, window_id: &str, approved_by: &str) -> Result<MaintenanceWindow> {
        let window = self.require_window(window_id).await?;
        let _guard = self.locks.acquire(&window.server_id).await;

        let mut window = self.require_window(window_id).await?;
        if window.status != MaintenanceStatus::Scheduled {
            return Err(MaintenanceError::InvalidTransition {
                from: window.status,
                action: "approve",
            });
        }

        window.approve(approved_by);
        let window = self.store.update_window(window).await?;

        info!(window_id = %window.id, approved_by = %approved_by, "Maintenance window approved");
        self.emit(&window, NotifyLevel::Info, "Maintenance window approved");
        Ok(window)
    }

    /// 进入执行中
    ///
    /// 由外部触发器在到达开始时间后调用，仅允许从 APPROVED 转换
    pub async fn begin(&self, window_id: &str) -> Result<MaintenanceWindow> {
        let window = self.require_window(window_id).await?;
        let _guard = self.locks.acquire(&window.server_id).await;

        let mut window = self.require_window(window_id).await?;
        if window.status != MaintenanceStatus::Approved {
            return Err(MaintenanceError::InvalidTransition {
                from: window.status,
                action: "begin",
            });
        }

        window.begin();
        let window = self.store.update_window(window).await?;

        info!(window_id = %window.id, server_id = %window.server_id, "Maintenance window started");
        self.emit(&window, NotifyLevel::Info, "Maintenance window started");
        Ok(window)
    }

    /// 完成维护窗口
    ///
    /// 允许从 IN_PROGRESS 转换；若开始时间已过，也允许从 APPROVED
    /// 直接完成（进入执行中的转换由墙钟驱动，属外部触发）
    pub async fn complete(
        &self,
        window_id: &str,
        completion_notes: &str,
    ) -> Result<MaintenanceWindow> {
        let window = self.require_window(window_id).await?;
        let _guard = self.locks.acquire(&window.server_id).await;

        let mut window = self.require_window(window_id).await?;
        let allowed = match window.status {
            MaintenanceStatus::InProgress => true,
            MaintenanceStatus::Approved => window.start_time <= Utc::now(),
            _ => false,
        };
        if !allowed {
            return Err(MaintenanceError::InvalidTransition {
                from: window.status,
                action: "complete",
            });
        }

        window.complete(completion_notes);
        let window = self.store.update_window(window).await?;

        info!(window_id = %window.id, server_id = %window.server_id, "Maintenance window completed");
        self.emit(&window, NotifyLevel::Info, "Maintenance window completed");
        Ok(window)
    }

    /// 取消维护窗口
    ///
    /// 允许从 SCHEDULED、APPROVED 取消；IN_PROGRESS 的取消是
    /// 带原因的强制中止，与开始前取消分别记录
    pub async fn cancel(&self, window_id: &str, reason: &str) -> Result<MaintenanceWindow> {
        let window = self.require_window(window_id).await?;
        let _guard = self.locks.acquire(&window.server_id).await;

        let mut window = self.require_window(window_id).await?;
        if window.status.is_terminal() {
            return Err(MaintenanceError::InvalidTransition {
                from: window.status,
                action: "cancel",
            });
        }

        let aborted_in_progress = window.status == MaintenanceStatus::InProgress;
        window.cancel(reason);
        let window = self.store.update_window(window).await?;

        if aborted_in_progress {
            warn!(
                window_id = %window.id,
                server_id = %window.server_id,
                reason = %reason,
                "Maintenance window aborted while in progress"
            );
            self.emit(&window, NotifyLevel::Warning, "Maintenance window aborted");
        } else {
            info!(
                window_id = %window.id,
                server_id = %window.server_id,
                reason = %reason,
                "Maintenance window cancelled"
            );
            self.emit(&window, NotifyLevel::Info, "Maintenance window cancelled");
        }

        Ok(window)
    }

    /// 获取维护窗口
    pub async fn get(&self, window_id: &str) -> Result<Option<MaintenanceWindow>> {
        self.store.get_window(window_id).await
    }

    /// 分页查询维护窗口
    pub async fn list(&self, filter: &WindowFilter) -> Result<(Vec<MaintenanceWindow>, u64)> {
        self.store.list_windows(filter).await
    }

    /// 冲突检测（调用方必须持有该服务器的锁）
    ///
    /// 只对该服务器的非取消窗口做逐一的半开区间重叠判定
    async fn check_conflicts(
        &self,
        server_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_id: Option<&str>,
    ) -> Result<()> {
        let existing = self.store.list_active_for_server(server_id).await?;

        let conflicts: Vec<WindowConflict> = existing
            .iter()
            .filter(|w| exclude_id != Some(w.id.as_str()))
            .filter(|w| w.overlaps(start_time, end_time))
            .map(WindowConflict::from)
            .collect();

        if conflicts.is_empty() {
            return Ok(());
        }

        warn!(
            server_id = %server_id,
            conflict_count = conflicts.len(),
            "Maintenance window rejected: overlapping windows exist"
        );

        let event = OpsEvent::maintenance(
            server_id,
            NotifyLevel::Warning,
            "Maintenance window rejected",
            format!(
                "Requested range {} - {} overlaps {} existing window(s)",
                start_time,
                end_time,
                conflicts.len()
            ),
        )
        .with_payload(serde_json::json!({ "conflicts": conflicts }));
        self.dispatcher.dispatch_detached(event);

        Err(MaintenanceError::Conflict { conflicts })
    }

    async fn require_window(&self, window_id: &str) -> Result<MaintenanceWindow> {
        self.store
            .get_window(window_id)
            .await?
            .ok_or_else(|| MaintenanceError::NotFound(format!("maintenance window {}", window_id)))
    }

    /// 发出通知事件，投递在后台进行
    fn emit(&self, window: &MaintenanceWindow, level: NotifyLevel, title: &str) {
        let event = OpsEvent::maintenance(
            window.server_id.clone(),
            level,
            title,
            format!(
                "{}: {} - {}",
                window.title, window.start_time, window.end_time
            ),
        )
        .with_payload(serde_json::json!({
            "window_id": window.id,
            "status": window.status.as_str(),
        }));

        self.dispatcher.dispatch_detached(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use crate::model::overlaps;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use ops_notify::InAppChannel;
    use sea_orm::Database;

    async fn create_test_scheduler() -> (MaintenanceScheduler, Arc<InAppChannel>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        init_schema(&db).await.unwrap();

        let store = Arc::new(MaintenanceStore::new(Arc::new(db)));
        let dispatcher = Arc::new(EventDispatcher::new(NotifyLevel::Info));
        let channel = Arc::new(InAppChannel::new(100));
        dispatcher.register(channel.clone()).await;

        (
            MaintenanceScheduler::new(store, Arc::new(ServerLocks::new()), dispatcher),
            channel,
        )
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_conflict_listing() {
        let (scheduler, _channel) = create_test_scheduler().await;

        // 10:00-11:00 创建成功
        let w1 = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();

        // 10:30-11:30 与 W1 重叠，冲突中列出 W1
        let err = scheduler
            .create("srv_001", "kernel upgrade", "", at(10, 30), at(11, 30))
            .await
            .unwrap_err();
        match err {
            MaintenanceError::Conflict { conflicts } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].id, w1.id);
                assert_eq!(conflicts[0].title, "patching");
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        // 相同时间段在另一台服务器上不冲突
        let w2 = scheduler
            .create("srv_002", "kernel upgrade", "", at(10, 30), at(11, 30))
            .await
            .unwrap();
        assert_eq!(w2.status, MaintenanceStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_adjacent_windows_do_not_conflict() {
        let (scheduler, _channel) = create_test_scheduler().await;

        scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();

        // [11:00, 12:00) 与 [10:00, 11:00) 只相接，不重叠
        let ok = scheduler
            .create("srv_001", "reboot", "", at(11, 0), at(12, 0))
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_time_range_rejected() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let err = scheduler
            .create("srv_001", "patching", "", at(11, 0), at(10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_reschedule_requires_re_approval() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let window = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();
        let approved = scheduler.approve(&window.id, "manager").await.unwrap();
        assert_eq!(approved.status, MaintenanceStatus::Approved);

        // 改期到无冲突的时间段后回到 SCHEDULED
        let rescheduled = scheduler
            .reschedule(&window.id, at(14, 0), at(15, 0))
            .await
            .unwrap();
        assert_eq!(rescheduled.status, MaintenanceStatus::Scheduled);
        assert!(rescheduled.approved_by.is_none());
    }

    #[tokio::test]
    async fn test_reschedule_excludes_own_window() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let window = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();

        // 改到与自身原时间段重叠的范围不应视为冲突
        let ok = scheduler.reschedule(&window.id, at(10, 30), at(11, 30)).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_window_does_not_block() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let window = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();
        let cancelled = scheduler.cancel(&window.id, "postponed").await.unwrap();
        assert_eq!(cancelled.status, MaintenanceStatus::Cancelled);

        // 取消后的时间段可以重新占用
        let ok = scheduler
            .create("srv_001", "patching retry", "", at(10, 0), at(11, 0))
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_state_machine_guards() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let window = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();

        // 未审批不能进入执行中
        let err = scheduler.begin(&window.id).await.unwrap_err();
        assert!(matches!(err, MaintenanceError::InvalidTransition { .. }));

        scheduler.approve(&window.id, "manager").await.unwrap();

        // 已审批不能再次审批
        let err = scheduler.approve(&window.id, "manager").await.unwrap_err();
        assert!(matches!(
            err,
            MaintenanceError::InvalidTransition {
                from: MaintenanceStatus::Approved,
                ..
            }
        ));

        let started = scheduler.begin(&window.id).await.unwrap();
        assert_eq!(started.status, MaintenanceStatus::InProgress);

        // 进行中不能改期
        let err = scheduler
            .reschedule(&window.id, at(14, 0), at(15, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, MaintenanceError::InvalidTransition { .. }));

        let completed = scheduler.complete(&window.id, "done").await.unwrap();
        assert_eq!(completed.status, MaintenanceStatus::Completed);
        assert_eq!(completed.completion_notes.as_deref(), Some("done"));

        // 终态不能取消
        let err = scheduler.cancel(&window.id, "too late").await.unwrap_err();
        assert!(matches!(err, MaintenanceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_complete_from_approved_after_start() {
        let (scheduler, _channel) = create_test_scheduler().await;

        // 开始时间已过的已审批窗口
        let start = Utc::now() - ChronoDuration::hours(1);
        let end = Utc::now() + ChronoDuration::hours(1);
        let window = scheduler
            .create("srv_001", "patching", "", start, end)
            .await
            .unwrap();
        scheduler.approve(&window.id, "manager").await.unwrap();

        let completed = scheduler.complete(&window.id, "done early").await.unwrap();
        assert_eq!(completed.status, MaintenanceStatus::Completed);
    }

    #[tokio::test]
    async fn test_complete_from_approved_before_start_rejected() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let start = Utc::now() + ChronoDuration::hours(1);
        let end = start + ChronoDuration::hours(1);
        let window = scheduler
            .create("srv_001", "patching", "", start, end)
            .await
            .unwrap();
        scheduler.approve(&window.id, "manager").await.unwrap();

        // 开始时间未到，不能直接完成
        let err = scheduler.complete(&window.id, "premature").await.unwrap_err();
        assert!(matches!(err, MaintenanceError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_abort_in_progress() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let window = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();
        scheduler.approve(&window.id, "manager").await.unwrap();
        scheduler.begin(&window.id).await.unwrap();

        // 进行中的取消是带原因的强制中止
        let aborted = scheduler
            .cancel(&window.id, "hardware failure")
            .await
            .unwrap();
        assert_eq!(aborted.status, MaintenanceStatus::Cancelled);
        assert_eq!(aborted.cancelled_reason.as_deref(), Some("hardware failure"));
    }

    #[tokio::test]
    async fn test_no_overlap_invariant_after_operations() {
        let (scheduler, _channel) = create_test_scheduler().await;

        // 一串创建/改期/取消后，非取消窗口两两不重叠
        let w1 = scheduler
            .create("srv_001", "a", "", at(8, 0), at(9, 0))
            .await
            .unwrap();
        let _w2 = scheduler
            .create("srv_001", "b", "", at(9, 0), at(10, 0))
            .await
            .unwrap();
        let w3 = scheduler
            .create("srv_001", "c", "", at(12, 0), at(13, 0))
            .await
            .unwrap();
        scheduler.cancel(&w1.id, "dropped").await.unwrap();
        scheduler.reschedule(&w3.id, at(10, 0), at(11, 0)).await.unwrap();
        let _ = scheduler
            .create("srv_001", "d", "", at(8, 0), at(9, 0))
            .await
            .unwrap();

        let filter = WindowFilter {
            server_id: Some("srv_001".to_string()),
            ..Default::default()
        };
        let (windows, _) = scheduler.list(&filter).await.unwrap();
        let active: Vec<_> = windows
            .iter()
            .filter(|w| w.status != MaintenanceStatus::Cancelled)
            .collect();

        for (i, a) in active.iter().enumerate() {
            for b in active.iter().skip(i + 1) {
                assert!(
                    !overlaps(a.start_time, a.end_time, b.start_time, b.end_time),
                    "windows {} and {} overlap",
                    a.id,
                    b.id
                );
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_creates() {
        let (scheduler, _channel) = create_test_scheduler().await;
        let scheduler = Arc::new(scheduler);

        // 两个并发的重叠创建，恰好一个成功
        let mut handles = Vec::new();
        for _ in 0..2 {
            let scheduler = scheduler.clone();
            handles.push(tokio::spawn(async move {
                scheduler
                    .create("srv_001", "patching", "", at(10, 0), at(11, 0))
                    .await
            }));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(MaintenanceError::Conflict { .. }) => conflicts += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn test_unknown_window_not_found() {
        let (scheduler, _channel) = create_test_scheduler().await;

        let err = scheduler.approve("mw_missing", "manager").await.unwrap_err();
        assert!(matches!(err, MaintenanceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transitions_emit_events() {
        let (scheduler, channel) = create_test_scheduler().await;

        let window = scheduler
            .create("srv_001", "patching", "", at(10, 0), at(11, 0))
            .await
            .unwrap();
        scheduler.approve(&window.id, "manager").await.unwrap();

        // 创建与审批各发出一条事件
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(channel.len().await, 2);
    }
}
