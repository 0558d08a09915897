use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// 按服务器 ID 划分的互斥锁表
///
/// 同一服务器上的"读取现状 → 检查 → 写入"序列必须串行执行
/// （维护窗口冲突检测、告警去重），不同服务器之间完全并行。
/// 锁按需创建并常驻表中，键空间即受管服务器集合，规模可控
pub struct ServerLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl ServerLocks {
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// 获取指定服务器的锁，持有期间该服务器的其他操作会等待
    pub async fn acquire(&self, server_id: &str) -> OwnedMutexGuard<()> {
        // 先用读锁查找，绝大多数情况下锁已存在
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(server_id) {
                return lock.clone().lock_owned().await;
            }
        }

        let lock = {
            let mut locks = self.locks.write().await;
            locks
                .entry(server_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        debug!(server_id = %server_id, "Server lock created");
        lock.lock_owned().await
    }

    /// 当前锁表中的条目数量
    pub async fn len(&self) -> usize {
        self.locks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.read().await.is_empty()
    }
}

impl Default for ServerLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_server_serialized() {
        let locks = Arc::new(ServerLocks::new());
        let counter = Arc::new(Mutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("srv_001").await;
                // 临界区内读取-等待-写回，若未串行会丢失更新
                let current = *counter.lock().await;
                tokio::time::sleep(Duration::from_millis(2)).await;
                *counter.lock().await = current + 1;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*counter.lock().await, 8);
        assert_eq!(locks.len().await, 1);
    }

    #[tokio::test]
    async fn test_different_servers_independent() {
        let locks = ServerLocks::new();

        // 持有一台服务器的锁不阻塞另一台
        let _guard_a = locks.acquire("srv_001").await;
        let guard_b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("srv_002")).await;
        assert!(guard_b.is_ok());
    }
}
