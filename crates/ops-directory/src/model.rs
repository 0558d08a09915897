use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 服务器清单记录
///
/// 由外部的服务器目录提供，运维引擎只读取，不拥有其生命周期
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    /// 服务器 ID（全局唯一）
    pub id: String,

    /// 所属租户 ID
    pub tenant_id: String,

    /// 服务器名称
    pub name: String,

    /// 服务器状态
    pub status: ServerStatus,

    /// 注册时间
    pub registered_at: DateTime<Utc>,
}

impl ServerRecord {
    /// 创建新的服务器记录
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            status: ServerStatus::Active,
            registered_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: ServerStatus) -> Self {
        self.status = status;
        self
    }
}

/// 服务器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    /// 正常运行
    Active,
    /// 已下线
    Retired,
    /// 维护中
    Maintenance,
}

impl ServerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ServerStatus::Active => "Active",
            ServerStatus::Retired => "Retired",
            ServerStatus::Maintenance => "Maintenance",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Retired" => ServerStatus::Retired,
            "Maintenance" => ServerStatus::Maintenance,
            _ => ServerStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_record() {
        let record = ServerRecord::new("srv_001", "tenant_a", "web-01");

        assert_eq!(record.id, "srv_001");
        assert_eq!(record.tenant_id, "tenant_a");
        assert_eq!(record.status, ServerStatus::Active);
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(ServerStatus::Retired.as_str(), "Retired");
        assert_eq!(ServerStatus::from_str("Maintenance"), ServerStatus::Maintenance);
        assert_eq!(ServerStatus::from_str("unknown"), ServerStatus::Active);
    }
}
