pub mod alert;
pub mod maintenance;
pub mod metric;
pub mod notification;
pub mod threshold;

pub use alert::*;
pub use maintenance::*;
pub use metric::*;
pub use notification::*;
pub use threshold::*;

use crate::error::{ApiError, Result};
use axum::http::HeaderMap;

/// 从请求头提取租户 ID
///
/// 所有写入端点都要求 `X-Tenant-Id`，缺失即拒绝
pub(crate) fn tenant_id(headers: &HeaderMap) -> Result<String> {
    let value = headers
        .get("X-Tenant-Id")
        .ok_or_else(|| ApiError::BadRequest("Missing X-Tenant-Id header".to_string()))?;

    let tenant = value
        .to_str()
        .map_err(|_| ApiError::BadRequest("Invalid X-Tenant-Id header".to_string()))?;

    if tenant.is_empty() {
        return Err(ApiError::BadRequest("Empty X-Tenant-Id header".to_string()));
    }

    Ok(tenant.to_string())
}
