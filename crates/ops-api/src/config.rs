use anyhow::Context;
use ops_monitor::MaintenancePolicy;
use ops_notify::{EmailConfig, NotifyLevel, WebhookConfig};
use serde::Deserialize;
use std::path::Path;

/// 引擎配置
#[derive(Debug, Deserialize, Clone)]
pub struct OpsConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// 存储调用超时（秒）
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    /// 最低分发级别：info / warning / error / critical
    #[serde(default = "default_min_level")]
    pub min_level: String,

    /// 站内渠道缓存容量
    #[serde(default = "default_in_app_capacity")]
    pub in_app_capacity: usize,

    /// 维护窗口内的越限策略：annotate / suppress
    #[serde(default = "default_maintenance_policy")]
    pub maintenance_policy: String,

    /// 邮件渠道配置，缺省不启用
    #[serde(default)]
    pub email: Option<EmailConfig>,

    /// Webhook 渠道配置，缺省不启用
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// 默认值函数
fn default_store_timeout_secs() -> u64 {
    5
}

fn default_min_level() -> String {
    "info".to_string()
}

fn default_in_app_capacity() -> usize {
    1000
}

fn default_maintenance_policy() -> String {
    "annotate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            min_level: default_min_level(),
            in_app_capacity: default_in_app_capacity(),
            maintenance_policy: default_maintenance_policy(),
            email: None,
            webhook: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl OpsConfig {
    /// 从 TOML 文件加载配置
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: OpsConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

impl NotifyConfig {
    pub fn min_notify_level(&self) -> NotifyLevel {
        match self.min_level.as_str() {
            "warning" => NotifyLevel::Warning,
            "error" => NotifyLevel::Error,
            "critical" => NotifyLevel::Critical,
            _ => NotifyLevel::Info,
        }
    }

    pub fn policy(&self) -> MaintenancePolicy {
        match self.maintenance_policy.as_str() {
            "suppress" => MaintenancePolicy::Suppress,
            _ => MaintenancePolicy::Annotate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: OpsConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            url = "sqlite::memory:"
            "#,
        )
        .unwrap();

        // 省略的节使用默认值
        assert_eq!(config.store.timeout_secs, 5);
        assert_eq!(config.notify.min_notify_level(), NotifyLevel::Info);
        assert_eq!(config.notify.policy(), MaintenancePolicy::Annotate);
        assert!(config.notify.email.is_none());
    }

    #[test]
    fn test_full_config() {
        let config: OpsConfig = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9090

            [database]
            url = "postgres://localhost/ops"

            [store]
            timeout_secs = 10

            [notify]
            min_level = "warning"
            maintenance_policy = "suppress"

            [notify.webhook]
            url = "https://hooks.example.com/ops"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.timeout_secs, 10);
        assert_eq!(config.notify.min_notify_level(), NotifyLevel::Warning);
        assert_eq!(config.notify.policy(), MaintenancePolicy::Suppress);
        assert!(config.notify.webhook.is_some());
        assert_eq!(config.logging.level, "debug");
    }
}
