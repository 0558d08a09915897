use crate::error::{MonitorError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 指标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// CPU 使用率
    CpuUsage,
    /// 内存使用率
    MemoryUsage,
    /// 磁盘使用率
    DiskUsage,
    /// 入站流量
    NetworkIn,
    /// 出站流量
    NetworkOut,
    /// 响应时间
    ResponseTime,
    /// 运行时长
    Uptime,
    /// 温度
    Temperature,
    /// 功耗
    PowerConsumption,
}

impl MetricType {
    pub fn as_str(&self) -> &str {
        match self {
            MetricType::CpuUsage => "CPU_USAGE",
            MetricType::MemoryUsage => "MEMORY_USAGE",
            MetricType::DiskUsage => "DISK_USAGE",
            MetricType::NetworkIn => "NETWORK_IN",
            MetricType::NetworkOut => "NETWORK_OUT",
            MetricType::ResponseTime => "RESPONSE_TIME",
            MetricType::Uptime => "UPTIME",
            MetricType::Temperature => "TEMPERATURE",
            MetricType::PowerConsumption => "POWER_CONSUMPTION",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CPU_USAGE" => Some(MetricType::CpuUsage),
            "MEMORY_USAGE" => Some(MetricType::MemoryUsage),
            "DISK_USAGE" => Some(MetricType::DiskUsage),
            "NETWORK_IN" => Some(MetricType::NetworkIn),
            "NETWORK_OUT" => Some(MetricType::NetworkOut),
            "RESPONSE_TIME" => Some(MetricType::ResponseTime),
            "UPTIME" => Some(MetricType::Uptime),
            "TEMPERATURE" => Some(MetricType::Temperature),
            "POWER_CONSUMPTION" => Some(MetricType::PowerConsumption),
            _ => None,
        }
    }
}

/// 指标样本
///
/// 一经写入不可变，保留策略由外部负责
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    /// 样本 ID
    pub id: String,

    /// 服务器 ID
    pub server_id: String,

    /// 指标类型
    pub metric_type: MetricType,

    /// 指标值（≥ 0）
    pub value: f64,

    /// 单位
    pub unit: Option<String>,

    /// 采样时间
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// 创建新样本
    pub fn new(server_id: impl Into<String>, metric_type: MetricType, value: f64) -> Self {
        Self {
            id: format!("smp_{}", uuid::Uuid::new_v4().simple()),
            server_id: server_id.into(),
            metric_type,
            value,
            unit: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// 校验样本值
    pub fn validate(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(MonitorError::validation("Metric value must be finite"));
        }
        if self.value < 0.0 {
            return Err(MonitorError::validation(format!(
                "Metric value must be non-negative, got {}",
                self.value
            )));
        }
        Ok(())
    }
}

/// 阈值比较方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonDirection {
    /// 值高于阈值时告警
    Above,
    /// 值低于阈值时告警
    Below,
}

impl ComparisonDirection {
    pub fn as_str(&self) -> &str {
        match self {
            ComparisonDirection::Above => "above",
            ComparisonDirection::Below => "below",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "above" => Some(ComparisonDirection::Above),
            "below" => Some(ComparisonDirection::Below),
            _ => None,
        }
    }
}

/// 指标阈值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricThreshold {
    /// 阈值 ID
    pub id: String,

    /// 所属租户
    pub tenant_id: String,

    /// 服务器 ID，为 None 时对租户下所有服务器生效
    pub server_id: Option<String>,

    /// 指标类型
    pub metric_type: MetricType,

    /// 警告级别阈值
    pub warning_level: f64,

    /// 严重级别阈值
    pub critical_level: f64,

    /// 比较方向
    pub direction: ComparisonDirection,

    /// 是否启用
    pub enabled: bool,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl MetricThreshold {
    /// 创建新阈值
    pub fn new(
        tenant_id: impl Into<String>,
        metric_type: MetricType,
        warning_level: f64,
        critical_level: f64,
        direction: ComparisonDirection,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("thr_{}", uuid::Uuid::new_v4().simple()),
            tenant_id: tenant_id.into(),
            server_id: None,
            metric_type,
            warning_level,
            critical_level,
            direction,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_server(mut self, server_id: impl Into<String>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// 校验阈值配置
    ///
    /// 警告与严重阈值的相对顺序必须与比较方向一致
    pub fn validate(&self) -> Result<()> {
        if !self.warning_level.is_finite() || !self.critical_level.is_finite() {
            return Err(MonitorError::validation("Threshold levels must be finite"));
        }

        match self.direction {
            ComparisonDirection::Above if self.warning_level > self.critical_level => {
                Err(MonitorError::validation(
                    "For direction 'above' the warning level must not exceed the critical level",
                ))
            }
            ComparisonDirection::Below if self.warning_level < self.critical_level => {
                Err(MonitorError::validation(
                    "For direction 'below' the warning level must not be lower than the critical level",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// 告警严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &str {
        match self {
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(AlertSeverity::Low),
            "MEDIUM" => Some(AlertSeverity::Medium),
            "HIGH" => Some(AlertSeverity::High),
            "CRITICAL" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }
}

/// 告警状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// 活跃
    Active,
    /// 已确认
    Acknowledged,
    /// 已解决
    Resolved,
    /// 已忽略
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AlertStatus::Active => "ACTIVE",
            AlertStatus::Acknowledged => "ACKNOWLEDGED",
            AlertStatus::Resolved => "RESOLVED",
            AlertStatus::Dismissed => "DISMISSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(AlertStatus::Active),
            "ACKNOWLEDGED" => Some(AlertStatus::Acknowledged),
            "RESOLVED" => Some(AlertStatus::Resolved),
            "DISMISSED" => Some(AlertStatus::Dismissed),
            _ => None,
        }
    }

    /// 终态不可再转换，后续新的越限会产生新的告警记录
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }
}

/// 告警记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// 告警 ID
    pub id: String,

    /// 服务器 ID
    pub server_id: String,

    /// 触发告警的指标类型
    pub metric_type: MetricType,

    /// 严重程度
    pub severity: AlertSeverity,

    /// 标题
    pub title: String,

    /// 描述
    pub description: String,

    /// 状态
    pub status: AlertStatus,

    /// 确认时间
    pub acknowledged_at: Option<DateTime<Utc>>,

    /// 确认人
    pub acknowledged_by: Option<String>,

    /// 解决时间
    pub resolved_at: Option<DateTime<Utc>>,

    /// 解决人
    pub resolved_by: Option<String>,

    /// 忽略原因
    pub dismissed_reason: Option<String>,

    /// 创建时间
    pub created_at: DateTime<Utc>,

    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// 创建新的活跃告警
    pub fn new(
        server_id: impl Into<String>,
        metric_type: MetricType,
        severity: AlertSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("alr_{}", uuid::Uuid::new_v4().simple()),
            server_id: server_id.into(),
            metric_type,
            severity,
            title: title.into(),
            description: description.into(),
            status: AlertStatus::Active,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            dismissed_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 用新的越限信息更新活跃告警
    pub fn update_breach(&mut self, severity: AlertSeverity, description: impl Into<String>) {
        self.severity = severity;
        self.description = description.into();
        self.updated_at = Utc::now();
    }

    /// 确认告警
    pub fn acknowledge(&mut self, by: impl Into<String>) {
        let now = Utc::now();
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_at = Some(now);
        self.acknowledged_by = Some(by.into());
        self.updated_at = now;
    }

    /// 解决告警
    pub fn resolve(&mut self, by: impl Into<String>) {
        let now = Utc::now();
        self.status = AlertStatus::Resolved;
        self.resolved_at = Some(now);
        self.resolved_by = Some(by.into());
        self.updated_at = now;
    }

    /// 忽略告警
    pub fn dismiss(&mut self, by: impl Into<String>, reason: impl Into<String>) {
        let now = Utc::now();
        self.status = AlertStatus::Dismissed;
        self.resolved_by = Some(by.into());
        self.dismissed_reason = Some(reason.into());
        self.updated_at = now;
    }
}

/// 告警查询过滤器
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub server_id: Option<String>,
    /// 限定结果属于指定服务器集合，用于按租户收窄查询范围
    pub server_ids: Option<Vec<String>>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// 聚合时间间隔
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateInterval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl AggregateInterval {
    /// 时间桶宽度（秒）
    pub fn as_seconds(&self) -> i64 {
        match self {
            AggregateInterval::OneMinute => 60,
            AggregateInterval::FiveMinutes => 300,
            AggregateInterval::FifteenMinutes => 900,
            AggregateInterval::OneHour => 3600,
            AggregateInterval::OneDay => 86400,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AggregateInterval::OneMinute => "1m",
            AggregateInterval::FiveMinutes => "5m",
            AggregateInterval::FifteenMinutes => "15m",
            AggregateInterval::OneHour => "1h",
            AggregateInterval::OneDay => "1d",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(AggregateInterval::OneMinute),
            "5m" => Some(AggregateInterval::FiveMinutes),
            "15m" => Some(AggregateInterval::FifteenMinutes),
            "1h" => Some(AggregateInterval::OneHour),
            "1d" => Some(AggregateInterval::OneDay),
            _ => None,
        }
    }
}

/// 聚合结果（按需计算，不落库）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub server_id: String,
    pub metric_type: MetricType,
    pub interval: AggregateInterval,
    pub bucket_start: DateTime<Utc>,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub sample_count: u64,
}
