use crate::model::{MaintenanceStatus, WindowConflict};
use thiserror::Error;

/// 维护调度错误类型
#[derive(Error, Debug)]
pub enum MaintenanceError {
    /// 输入校验失败
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 与既有维护窗口冲突
    #[error("Maintenance window conflicts with {} existing window(s)", conflicts.len())]
    Conflict { conflicts: Vec<WindowConflict> },

    /// 记录未找到
    #[error("Not found: {0}")]
    NotFound(String),

    /// 非法的状态转换
    #[error("Invalid maintenance transition: cannot {action} a window in status {from:?}")]
    InvalidTransition {
        from: MaintenanceStatus,
        action: &'static str,
    },

    /// 持久化存储超时
    #[error("Persistence store unavailable: {0}")]
    Unavailable(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 维护调度结果类型
pub type Result<T> = std::result::Result<T, MaintenanceError>;

impl MaintenanceError {
    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        MaintenanceError::ValidationError(msg.into())
    }
}
