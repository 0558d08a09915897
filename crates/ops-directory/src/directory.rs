use crate::error::{DirectoryError, Result};
use crate::model::ServerRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 服务器目录 trait
///
/// 运维引擎通过该接口确认服务器身份与租户归属，
/// 实际的清单 CRUD 属于外部系统
#[async_trait]
pub trait ServerDirectory: Send + Sync {
    /// 查询服务器记录，不存在时返回 None
    async fn get_server(&self, server_id: &str) -> Result<Option<ServerRecord>>;

    /// 列出指定租户的全部服务器
    async fn list_servers(&self, tenant_id: &str) -> Result<Vec<ServerRecord>>;

    /// 校验服务器属于指定租户
    ///
    /// # 错误
    /// * `NotFound` - 服务器不存在
    /// * `TenantMismatch` - 服务器属于其他租户
    async fn server_in_tenant(&self, server_id: &str, tenant_id: &str) -> Result<ServerRecord> {
        let record = self
            .get_server(server_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(server_id.to_string()))?;

        if record.tenant_id != tenant_id {
            return Err(DirectoryError::TenantMismatch {
                server_id: server_id.to_string(),
                tenant_id: tenant_id.to_string(),
            });
        }

        Ok(record)
    }
}

/// 内存实现的服务器目录
///
/// 用于测试和嵌入式部署，生产环境由外部目录服务替代
pub struct InMemoryDirectory {
    servers: Arc<RwLock<HashMap<String, ServerRecord>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            servers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册服务器记录
    pub async fn insert(&self, record: ServerRecord) {
        let mut servers = self.servers.write().await;
        info!(server_id = %record.id, tenant_id = %record.tenant_id, "Server registered in directory");
        servers.insert(record.id.clone(), record);
    }

    /// 移除服务器记录
    pub async fn remove(&self, server_id: &str) -> Option<ServerRecord> {
        let mut servers = self.servers.write().await;
        servers.remove(server_id)
    }

    /// 目录中的服务器数量
    pub async fn len(&self) -> usize {
        self.servers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.servers.read().await.is_empty()
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerDirectory for InMemoryDirectory {
    async fn get_server(&self, server_id: &str) -> Result<Option<ServerRecord>> {
        let servers = self.servers.read().await;
        let record = servers.get(server_id).cloned();
        debug!(server_id = %server_id, found = record.is_some(), "Directory lookup");
        Ok(record)
    }

    async fn list_servers(&self, tenant_id: &str) -> Result<Vec<ServerRecord>> {
        let servers = self.servers.read().await;
        Ok(servers
            .values()
            .filter(|record| record.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}
