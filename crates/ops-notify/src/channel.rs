use crate::event::OpsEvent;
use anyhow::Result;
use async_trait::async_trait;

/// 单次投递结果
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub delivered: bool,
    pub detail: String,
}

impl DeliveryResult {
    pub fn delivered() -> Self {
        Self {
            delivered: true,
            detail: "Event delivered".to_string(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            delivered: false,
            detail: detail.into(),
        }
    }
}

/// 通知渠道适配器 trait
///
/// 投递语义为至少一次尝试，重试策略属于渠道外部，
/// 不保证跨渠道的顺序与恰好一次
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// 投递事件
    async fn deliver(&self, event: &OpsEvent) -> Result<DeliveryResult>;

    /// 渠道名称
    fn name(&self) -> &str;

    /// 是否启用
    fn is_enabled(&self) -> bool {
        true
    }
}
