use crate::error::{MaintenanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 维护窗口状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceStatus {
    /// 已排期，待审批
    Scheduled,
    /// 已审批
    Approved,
    /// 进行中
    InProgress,
    /// 已完成
    Completed,
    /// 已取消
    Cancelled,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MaintenanceStatus::Scheduled => "SCHEDULED",
            MaintenanceStatus::Approved => "APPROVED",
            MaintenanceStatus::InProgress => "IN_PROGRESS",
            MaintenanceStatus::Completed => "COMPLETED",
            MaintenanceStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(MaintenanceStatus::Scheduled),
            "APPROVED" => Some(MaintenanceStatus::Approved),
            "IN_PROGRESS" => Some(MaintenanceStatus::InProgress),
            "COMPLETED" => Some(MaintenanceStatus::Completed),
            "CANCELLED" => Some(MaintenanceStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MaintenanceStatus::Completed | MaintenanceStatus::Cancelled)
    }
}

/// 维护窗口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// 窗口 ID
    pub id: String,

    /// 服务器 ID
    pub server_id: String,

    /// 标题
    pub title: String,

    /// 描述
    pub description: String,

    /// 开始时间
    pub start_time: DateTime<Utc>,

    /// 结束时间
    pub end_time: DateTime<Utc>,

    /// 状态
    pub status: MaintenanceStatus,

    /// 审批人
    pub approved_by: Option<String>,

    /// 审批时间
    pub approved_at: Option<DateTime<Utc>>,

    /// 取消原因
    pub cancelled_reason: Option<String>,

    /// 完成记录
    pub completion_notes: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl MaintenanceWindow {
    /// 创建新的待审批窗口
    pub fn new(
        server_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("mw_{}", uuid::Uuid::new_v4().simple()),
            server_id: server_id.into(),
            title: title.into(),
            description: description.into(),
            start_time,
            end_time,
            status: MaintenanceStatus::Scheduled,
            approved_by: None,
            approved_at: None,
            cancelled_reason: None,
            completion_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 校验时间范围
    pub fn validate(&self) -> Result<()> {
        if self.start_time >= self.end_time {
            return Err(MaintenanceError::validation(
                "Maintenance window start time must be before end time",
            ));
        }
        Ok(())
    }

    /// 审批窗口
    pub fn approve(&mut self, by: impl Into<String>) {
        let now = Utc::now();
        self.status = MaintenanceStatus::Approved;
        self.approved_by = Some(by.into());
        self.approved_at = Some(now);
        self.updated_at = now;
    }

    /// 进入执行中
    pub fn begin(&mut self) {
        self.status = MaintenanceStatus::InProgress;
        self.updated_at = Utc::now();
    }

    /// 完成窗口
    pub fn complete(&mut self, notes: impl Into<String>) {
        self.status = MaintenanceStatus::Completed;
        self.completion_notes = Some(notes.into());
        self.updated_at = Utc::now();
    }

    /// 取消窗口
    pub fn cancel(&mut self, reason: impl Into<String>) {
        self.status = MaintenanceStatus::Cancelled;
        self.cancelled_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// 改期：重新排期并要求重新审批
    pub fn reschedule(&mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) {
        self.start_time = start_time;
        self.end_time = end_time;
        self.status = MaintenanceStatus::Scheduled;
        self.approved_by = None;
        self.approved_at = None;
        self.updated_at = Utc::now();
    }

    /// 与另一时间范围是否重叠（半开区间 [start, end)）
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start_time, self.end_time, start, end)
    }

    /// 指定时刻是否落在窗口内
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }
}

/// 半开区间重叠判定：[s1, e1) 与 [s2, e2) 重叠当且仅当 s1 < e2 且 s2 < e1
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// 冲突窗口摘要，返回给调用方用于展示备选方案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConflict {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl From<&MaintenanceWindow> for WindowConflict {
    fn from(window: &MaintenanceWindow) -> Self {
        Self {
            id: window.id.clone(),
            title: window.title.clone(),
            start_time: window.start_time,
            end_time: window.end_time,
        }
    }
}

/// 维护窗口查询过滤器
#[derive(Debug, Clone, Default)]
pub struct WindowFilter {
    pub server_id: Option<String>,
    /// 限定结果属于指定服务器集合，用于按租户收窄查询范围
    pub server_ids: Option<Vec<String>>,
    pub status: Option<MaintenanceStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_overlap_predicate() {
        // 部分重叠
        assert!(overlaps(at(10, 0), at(11, 0), at(10, 30), at(11, 30)));
        // 包含
        assert!(overlaps(at(10, 0), at(12, 0), at(10, 30), at(11, 0)));
        // 相接不算重叠（半开区间）
        assert!(!overlaps(at(10, 0), at(11, 0), at(11, 0), at(12, 0)));
        assert!(!overlaps(at(11, 0), at(12, 0), at(10, 0), at(11, 0)));
        // 完全分离
        assert!(!overlaps(at(8, 0), at(9, 0), at(10, 0), at(11, 0)));
    }

    #[test]
    fn test_window_validation() {
        let ok = MaintenanceWindow::new("srv_001", "patching", "", at(10, 0), at(11, 0));
        assert!(ok.validate().is_ok());

        let reversed = MaintenanceWindow::new("srv_001", "patching", "", at(11, 0), at(10, 0));
        assert!(reversed.validate().is_err());

        let empty = MaintenanceWindow::new("srv_001", "patching", "", at(10, 0), at(10, 0));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_reschedule_resets_approval() {
        let mut window = MaintenanceWindow::new("srv_001", "patching", "", at(10, 0), at(11, 0));
        window.approve("manager");
        assert_eq!(window.status, MaintenanceStatus::Approved);

        window.reschedule(at(14, 0), at(15, 0));
        assert_eq!(window.status, MaintenanceStatus::Scheduled);
        assert!(window.approved_by.is_none());
        assert!(window.approved_at.is_none());
    }

    #[test]
    fn test_covers() {
        let window = MaintenanceWindow::new("srv_001", "patching", "", at(10, 0), at(11, 0));
        assert!(window.covers(at(10, 0)));
        assert!(window.covers(at(10, 30)));
        // 结束时刻不在窗口内
        assert!(!window.covers(at(11, 0)));
    }

    #[test]
    fn test_status_terminal() {
        assert!(!MaintenanceStatus::Scheduled.is_terminal());
        assert!(!MaintenanceStatus::InProgress.is_terminal());
        assert!(MaintenanceStatus::Completed.is_terminal());
        assert!(MaintenanceStatus::Cancelled.is_terminal());
    }
}
