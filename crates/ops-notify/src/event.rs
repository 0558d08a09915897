use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 事件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// 告警状态变更
    Alert,
    /// 维护窗口状态变更
    Maintenance,
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// 信息
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
    /// 严重
    Critical,
}

/// 统一事件信封
///
/// 告警与维护的生命周期变更都被翻译成该格式后再分发，
/// 渠道适配器不感知业务语义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsEvent {
    /// 事件类别
    pub kind: EventKind,

    /// 相关服务器 ID
    pub server_id: String,

    /// 级别
    pub level: NotifyLevel,

    /// 标题
    pub title: String,

    /// 内容
    pub body: String,

    /// 附加数据（如冲突窗口明细）
    pub payload: Option<serde_json::Value>,

    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl OpsEvent {
    pub fn new(
        kind: EventKind,
        server_id: impl Into<String>,
        level: NotifyLevel,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            server_id: server_id.into(),
            level,
            title: title.into(),
            body: body.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// 创建告警事件
    pub fn alert(
        server_id: impl Into<String>,
        level: NotifyLevel,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::Alert, server_id, level, title, body)
    }

    /// 创建维护事件
    pub fn maintenance(
        server_id: impl Into<String>,
        level: NotifyLevel,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::new(EventKind::Maintenance, server_id, level, title, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builders() {
        let event = OpsEvent::alert("srv_001", NotifyLevel::Critical, "CPU usage critical", "value=95")
            .with_payload(serde_json::json!({ "value": 95.0 }));

        assert_eq!(event.kind, EventKind::Alert);
        assert_eq!(event.server_id, "srv_001");
        assert!(event.payload.is_some());
    }

    #[test]
    fn test_level_ordering() {
        assert!(NotifyLevel::Critical > NotifyLevel::Warning);
        assert!(NotifyLevel::Warning > NotifyLevel::Info);
    }
}
