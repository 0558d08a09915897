use thiserror::Error;

/// 服务器目录错误类型
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// 服务器未找到
    #[error("Server not found: {0}")]
    NotFound(String),

    /// 服务器不属于该租户
    #[error("Server {server_id} does not belong to tenant {tenant_id}")]
    TenantMismatch {
        server_id: String,
        tenant_id: String,
    },

    /// 目录服务不可用
    #[error("Server directory unavailable: {0}")]
    Unavailable(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 服务器目录结果类型
pub type Result<T> = std::result::Result<T, DirectoryError>;
