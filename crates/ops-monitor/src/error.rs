use crate::model::AlertStatus;
use thiserror::Error;

/// 监控子系统错误类型
#[derive(Error, Debug)]
pub enum MonitorError {
    /// 输入校验失败
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 记录未找到
    #[error("Not found: {0}")]
    NotFound(String),

    /// 非法的告警状态转换
    #[error("Invalid alert transition: cannot {action} an alert in status {from:?}")]
    InvalidTransition {
        from: AlertStatus,
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

/// 监控子系统结果类型
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// 创建校验错误
    pub fn validation(msg: impl Into<String>) -> Self {
        MonitorError::ValidationError(msg.into())
    }
}
