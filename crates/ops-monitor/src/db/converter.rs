use crate::error::MonitorError;
use crate::model::{
    Alert, AlertSeverity, AlertStatus, ComparisonDirection, MetricSample, MetricThreshold,
    MetricType,
};
use sea_orm::ActiveValue::Set;

/// MetricSample 模型与数据库实体的转换
impl From<MetricSample> for super::metric_sample::ActiveModel {
    fn from(sample: MetricSample) -> Self {
        Self {
            id: Set(sample.id),
            server_id: Set(sample.server_id),
            metric_type: Set(sample.metric_type.as_str().to_string()),
            value: Set(sample.value),
            unit: Set(sample.unit),
            timestamp: Set(sample.timestamp),
        }
    }
}

impl TryFrom<super::metric_sample::Model> for MetricSample {
    type Error = MonitorError;

    fn try_from(model: super::metric_sample::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            server_id: model.server_id,
            metric_type: parse_metric_type(&model.metric_type)?,
            value: model.value,
            unit: model.unit,
            timestamp: model.timestamp,
        })
    }
}

/// MetricThreshold 模型与数据库实体的转换
impl From<MetricThreshold> for super::metric_threshold::ActiveModel {
    fn from(threshold: MetricThreshold) -> Self {
        Self {
            id: Set(threshold.id),
            tenant_id: Set(threshold.tenant_id),
            server_id: Set(threshold.server_id),
            metric_type: Set(threshold.metric_type.as_str().to_string()),
            warning_level: Set(threshold.warning_level),
            critical_level: Set(threshold.critical_level),
            direction: Set(threshold.direction.as_str().to_string()),
            enabled: Set(threshold.enabled),
            created_at: Set(threshold.created_at),
            updated_at: Set(threshold.updated_at),
        }
    }
}

impl TryFrom<super::metric_threshold::Model> for MetricThreshold {
    type Error = MonitorError;

    fn try_from(model: super::metric_threshold::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            tenant_id: model.tenant_id,
            server_id: model.server_id,
            metric_type: parse_metric_type(&model.metric_type)?,
            warning_level: model.warning_level,
            critical_level: model.critical_level,
            direction: ComparisonDirection::from_str(&model.direction).ok_or_else(|| {
                MonitorError::validation(format!("Unknown comparison direction: {}", model.direction))
            })?,
            enabled: model.enabled,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Alert 模型与数据库实体的转换
impl From<Alert> for super::alert::ActiveModel {
    fn from(alert: Alert) -> Self {
        Self {
            id: Set(alert.id),
            server_id: Set(alert.server_id),
            metric_type: Set(alert.metric_type.as_str().to_string()),
            severity: Set(alert.severity.as_str().to_string()),
            title: Set(alert.title),
            description: Set(alert.description),
            status: Set(alert.status.as_str().to_string()),
            acknowledged_at: Set(alert.acknowledged_at),
            acknowledged_by: Set(alert.acknowledged_by),
            resolved_at: Set(alert.resolved_at),
            resolved_by: Set(alert.resolved_by),
            dismissed_reason: Set(alert.dismissed_reason),
            created_at: Set(alert.created_at),
            updated_at: Set(alert.updated_at),
        }
    }
}

impl TryFrom<super::alert::Model> for Alert {
    type Error = MonitorError;

    fn try_from(model: super::alert::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            server_id: model.server_id,
            metric_type: parse_metric_type(&model.metric_type)?,
            severity: AlertSeverity::from_str(&model.severity).ok_or_else(|| {
                MonitorError::validation(format!("Unknown alert severity: {}", model.severity))
            })?,
            title: model.title,
            description: model.description,
            status: AlertStatus::from_str(&model.status).ok_or_else(|| {
                MonitorError::validation(format!("Unknown alert status: {}", model.status))
            })?,
            acknowledged_at: model.acknowledged_at,
            acknowledged_by: model.acknowledged_by,
            resolved_at: model.resolved_at,
            resolved_by: model.resolved_by,
            dismissed_reason: model.dismissed_reason,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

fn parse_metric_type(s: &str) -> Result<MetricType, MonitorError> {
    MetricType::from_str(s)
        .ok_or_else(|| MonitorError::validation(format!("Unknown metric type: {}", s)))
}
