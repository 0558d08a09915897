use crate::channel::NotifyChannel;
use crate::event::{NotifyLevel, OpsEvent};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// 事件分发器
///
/// 将生命周期事件扇出到所有已注册的渠道，
/// 每个事件在每个渠道上保证至少一次投递尝试；
/// 投递失败只记录日志，绝不影响触发操作本身
pub struct EventDispatcher {
    /// 渠道列表
    channels: RwLock<Vec<Arc<dyn NotifyChannel>>>,

    /// 最低分发级别
    min_level: NotifyLevel,
}

impl EventDispatcher {
    pub fn new(min_level: NotifyLevel) -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            min_level,
        }
    }

    /// 注册渠道
    pub async fn register(&self, channel: Arc<dyn NotifyChannel>) {
        let mut channels = self.channels.write().await;
        info!(channel = %channel.name(), "Notification channel registered");
        channels.push(channel);
    }

    /// 分发事件到所有渠道
    pub async fn dispatch(&self, event: OpsEvent) {
        if event.level < self.min_level {
            return;
        }

        let channels = self.channels.read().await;
        if channels.is_empty() {
            warn!(
                kind = ?event.kind,
                server_id = %event.server_id,
                "Event dropped: no notification channels registered"
            );
            return;
        }

        for channel in channels.iter() {
            if !channel.is_enabled() {
                continue;
            }

            match channel.deliver(&event).await {
                Ok(result) => {
                    if result.delivered {
                        info!(
                            channel = %channel.name(),
                            kind = ?event.kind,
                            server_id = %event.server_id,
                            "Event delivered: {}",
                            event.title
                        );
                    } else {
                        error!(
                            channel = %channel.name(),
                            server_id = %event.server_id,
                            "Event delivery failed: {}",
                            result.detail
                        );
                    }
                }
                Err(e) => {
                    error!(
                        channel = %channel.name(),
                        server_id = %event.server_id,
                        error = %e,
                        "Event delivery error"
                    );
                }
            }
        }
    }

    /// 在后台分发事件，调用方不等待投递完成
    pub fn dispatch_detached(self: &Arc<Self>, event: OpsEvent) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(event).await;
        });
    }

    /// 已注册的渠道数量
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(NotifyLevel::Info)
    }
}
