use chrono::{DateTime, Utc};
use ops_maintenance::{MaintenanceStatus, WindowFilter};
use ops_monitor::{
    AggregateInterval, Alert, AlertFilter, AlertSeverity, AlertStatus, ComparisonDirection,
    MetricSample, MetricType,
};
use serde::{Deserialize, Serialize};

/// 指标上报请求
///
/// 未知字段直接拒绝，防止拼写错误的字段被静默丢弃
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestMetricRequest {
    pub server_id: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub unit: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// 指标上报响应：已存储的样本与本次触发的告警变更
#[derive(Debug, Serialize)]
pub struct IngestMetricResponse {
    pub sample: MetricSample,
    pub alert: Option<Alert>,
}

/// 聚合查询请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateQuery {
    pub server_id: String,
    pub metric_type: MetricType,
    pub interval: AggregateInterval,
    pub lookback_hours: u32,
}

/// 阈值创建请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThresholdRequest {
    pub metric_type: MetricType,
    pub warning_level: f64,
    pub critical_level: f64,
    pub direction: ComparisonDirection,
    pub server_id: Option<String>,
    pub enabled: Option<bool>,
}

/// 阈值更新请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateThresholdRequest {
    pub warning_level: Option<f64>,
    pub critical_level: Option<f64>,
    pub direction: Option<ComparisonDirection>,
    pub enabled: Option<bool>,
}

/// 告警查询请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListAlertsQuery {
    pub status: Option<AlertStatus>,
    pub severity: Option<AlertSeverity>,
    pub server_id: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl From<ListAlertsQuery> for AlertFilter {
    fn from(query: ListAlertsQuery) -> Self {
        AlertFilter {
            status: query.status,
            severity: query.severity,
            server_id: query.server_id,
            // 租户范围由处理器按目录查询结果填充
            server_ids: None,
            page: query.page,
            page_size: query.page_size,
        }
    }
}

/// 告警确认请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcknowledgeAlertRequest {
    pub acknowledged_by: String,
}

/// 告警解决请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveAlertRequest {
    pub resolved_by: String,
}

/// 告警忽略请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DismissAlertRequest {
    pub dismissed_by: String,
    pub reason: String,
}

/// 维护窗口创建请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWindowRequest {
    pub server_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// 维护窗口审批请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveWindowRequest {
    pub approved_by: String,
}

/// 维护窗口取消请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelWindowRequest {
    pub reason: String,
}

/// 维护窗口完成请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteWindowRequest {
    pub completion_notes: Option<String>,
}

/// 维护窗口改期请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RescheduleWindowRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// 维护窗口查询请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListWindowsQuery {
    pub server_id: Option<String>,
    pub status: Option<MaintenanceStatus>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl From<ListWindowsQuery> for WindowFilter {
    fn from(query: ListWindowsQuery) -> Self {
        WindowFilter {
            server_id: query.server_id,
            // 租户范围由处理器按目录查询结果填充
            server_ids: None,
            status: query.status,
            page: query.page,
            page_size: query.page_size,
        }
    }
}

/// 通知查询请求
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListNotificationsQuery {
    pub limit: Option<usize>,
}

/// 分页响应
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}
