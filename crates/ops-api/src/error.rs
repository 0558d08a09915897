use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ops_maintenance::WindowConflict;
use serde_json::json;
use std::fmt;

/// API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 记录未找到
    NotFound(String),
    /// 与既有维护窗口冲突
    Conflict(Vec<WindowConflict>),
    /// 非法的状态转换
    InvalidTransition(String),
    /// 验证错误
    ValidationError(String),
    /// 持久化存储不可用
    Unavailable(String),
    /// 数据库错误
    DatabaseError(String),
    /// 内部错误
    InternalError(String),
    /// 请求错误
    BadRequest(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(conflicts) => {
                write!(f, "Conflicts with {} existing window(s)", conflicts.len())
            }
            ApiError::InvalidTransition(msg) => write!(f, "Invalid transition: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Unavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // 冲突响应额外携带冲突窗口明细，供调用方展示备选时段
        if let ApiError::Conflict(conflicts) = self {
            let body = Json(json!({
                "error": format!("Conflicts with {} existing window(s)", conflicts.len()),
                "status": StatusCode::CONFLICT.as_u16(),
                "conflicts": conflicts,
            }));
            return (StatusCode::CONFLICT, body).into_response();
        }

        let (status, error_message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(_) => unreachable!(),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

// 从 ops_monitor::MonitorError 转换
impl From<ops_monitor::MonitorError> for ApiError {
    fn from(err: ops_monitor::MonitorError) -> Self {
        use ops_monitor::MonitorError;
        match err {
            MonitorError::ValidationError(msg) => ApiError::ValidationError(msg),
            MonitorError::NotFound(msg) => ApiError::NotFound(msg),
            MonitorError::InvalidTransition { .. } => ApiError::InvalidTransition(err.to_string()),
            MonitorError::Unavailable(msg) => ApiError::Unavailable(msg),
            MonitorError::DatabaseError(e) => ApiError::DatabaseError(e.to_string()),
            MonitorError::SerializationError(e) => ApiError::InternalError(e.to_string()),
            MonitorError::Other(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

// 从 ops_maintenance::MaintenanceError 转换
impl From<ops_maintenance::MaintenanceError> for ApiError {
    fn from(err: ops_maintenance::MaintenanceError) -> Self {
        use ops_maintenance::MaintenanceError;
        match err {
            MaintenanceError::ValidationError(msg) => ApiError::ValidationError(msg),
            MaintenanceError::Conflict { conflicts } => ApiError::Conflict(conflicts),
            MaintenanceError::NotFound(msg) => ApiError::NotFound(msg),
            MaintenanceError::InvalidTransition { .. } => {
                ApiError::InvalidTransition(err.to_string())
            }
            MaintenanceError::Unavailable(msg) => ApiError::Unavailable(msg),
            MaintenanceError::DatabaseError(e) => ApiError::DatabaseError(e.to_string()),
            MaintenanceError::SerializationError(e) => ApiError::InternalError(e.to_string()),
            MaintenanceError::Other(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

// 从 ops_directory::DirectoryError 转换
impl From<ops_directory::DirectoryError> for ApiError {
    fn from(err: ops_directory::DirectoryError) -> Self {
        use ops_directory::DirectoryError;
        match err {
            DirectoryError::NotFound(id) => ApiError::NotFound(format!("server {}", id)),
            // 租户不匹配按未找到处理，不向调用方泄露其他租户的存在性
            DirectoryError::TenantMismatch { server_id, .. } => {
                ApiError::NotFound(format!("server {}", server_id))
            }
            DirectoryError::Unavailable(msg) => ApiError::Unavailable(msg),
            DirectoryError::Other(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
