use crate::channel::{DeliveryResult, NotifyChannel};
use crate::event::OpsEvent;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// 邮件渠道
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: Vec<String>,
}

pub struct EmailChannel {
    config: EmailConfig,
    enabled: bool,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            enabled: true,
        }
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    async fn deliver(&self, event: &OpsEvent) -> Result<DeliveryResult> {
        use lettre::message::header::ContentType;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

        if self.config.to.is_empty() {
            return Ok(DeliveryResult::failed("No email recipients configured"));
        }

        let mut builder = Message::builder()
            .from(self.config.from.parse()?)
            .subject(&event.title)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.config.to {
            builder = builder.to(recipient.parse()?);
        }
        let email = builder.body(format!(
            "{}\n\nServer: {}\nKind: {:?}\nLevel: {:?}\nTime: {}",
            event.body, event.server_id, event.kind, event.level, event.timestamp
        ))?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.clone(),
        );

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
                .credentials(creds)
                .port(self.config.smtp_port)
                .build();

        match mailer.send(email).await {
            Ok(_) => Ok(DeliveryResult::delivered()),
            Err(e) => Ok(DeliveryResult::failed(format!("Email send failed: {}", e))),
        }
    }

    fn name(&self) -> &str {
        "email"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// Webhook 渠道
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub headers: Option<std::collections::HashMap<String, String>>,
}

pub struct WebhookChannel {
    config: WebhookConfig,
    client: reqwest::Client,
    enabled: bool,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            enabled: true,
        }
    }
}

#[async_trait]
impl NotifyChannel for WebhookChannel {
    async fn deliver(&self, event: &OpsEvent) -> Result<DeliveryResult> {
        let mut request = self.client.post(&self.config.url);

        if let Some(headers) = &self.config.headers {
            for (key, value) in headers {
                request = request.header(key, value);
            }
        }

        let response = request.json(event).send().await?;

        if response.status().is_success() {
            Ok(DeliveryResult::delivered())
        } else {
            Ok(DeliveryResult::failed(format!(
                "Webhook failed with status: {}",
                response.status()
            )))
        }
    }

    fn name(&self) -> &str {
        "webhook"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

// ============================================================================
// 站内渠道
// ============================================================================

/// 站内通知渠道
///
/// 事件保留在内存中供查询接口拉取，超出容量时丢弃最旧的事件
pub struct InAppChannel {
    events: Arc<RwLock<Vec<OpsEvent>>>,
    max_events: usize,
}

impl InAppChannel {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events,
        }
    }

    /// 拉取最近的事件（新的在前）
    pub async fn recent(&self, limit: usize) -> Vec<OpsEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit).cloned().collect()
    }

    /// 当前缓存的事件数量
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl Default for InAppChannel {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl NotifyChannel for InAppChannel {
    async fn deliver(&self, event: &OpsEvent) -> Result<DeliveryResult> {
        let mut events = self.events.write().await;
        events.push(event.clone());

        if events.len() > self.max_events {
            let overflow = events.len() - self.max_events;
            events.drain(0..overflow);
        }

        Ok(DeliveryResult::delivered())
    }

    fn name(&self) -> &str {
        "in-app"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NotifyLevel;

    #[tokio::test]
    async fn test_email_channel_without_recipients() {
        let channel = EmailChannel::new(EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            username: "ops".to_string(),
            password: "secret".to_string(),
            from: "ops@example.com".to_string(),
            to: vec![],
        });

        let event = OpsEvent::alert("srv_001", NotifyLevel::Warning, "CPU high", "value=85");

        // 收件人为空时返回失败结果而不是错误
        let result = channel.deliver(&event).await.unwrap();
        assert!(!result.delivered);
        assert!(result.detail.contains("recipients"));
    }

    #[tokio::test]
    async fn test_in_app_channel() {
        let channel = InAppChannel::new(100);

        let event = OpsEvent::alert("srv_001", NotifyLevel::Warning, "CPU high", "value=85");
        let result = channel.deliver(&event).await.unwrap();
        assert!(result.delivered);

        let recent = channel.recent(10).await;
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].server_id, "srv_001");
    }

    #[tokio::test]
    async fn test_in_app_channel_overflow() {
        let channel = InAppChannel::new(3);

        for i in 0..5 {
            let event = OpsEvent::alert(
                format!("srv_{:03}", i),
                NotifyLevel::Info,
                "test",
                "test",
            );
            channel.deliver(&event).await.unwrap();
        }

        // 只保留最新的 3 条
        assert_eq!(channel.len().await, 3);
        let recent = channel.recent(10).await;
        assert_eq!(recent[0].server_id, "srv_004");
        assert_eq!(recent[2].server_id, "srv_002");
    }
}
