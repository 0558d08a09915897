use crate::model::{AlertSeverity, ComparisonDirection, MetricSample, MetricThreshold};
use tracing::debug;

/// 阈值评估结论
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    /// 发生越限，应开启或更新告警
    Breach {
        severity: AlertSeverity,
        threshold_id: String,
        message: String,
    },
    /// 未越限，若存在活跃告警应自动解决
    Clear,
}

/// 阈值评估器
///
/// 纯函数式组件，不产生副作用，结论交由告警生命周期管理器处理
pub struct ThresholdEvaluator;

impl ThresholdEvaluator {
    /// 评估单个样本
    ///
    /// 匹配规则：指标类型一致，且阈值作用于该服务器或为租户级（server_id 为空）；
    /// 禁用的阈值跳过。每个阈值先比较严重级别再比较警告级别，
    /// 多个阈值命中时取最严重的结论，每次评估至多产生一个结论。
    /// 恰好等于边界值视为越限（above 取 ≥，below 取 ≤），避免在阈值附近抖动
    pub fn evaluate(sample: &MetricSample, thresholds: &[MetricThreshold]) -> AlertDecision {
        let mut best: Option<(AlertSeverity, &MetricThreshold, f64)> = None;

        for threshold in thresholds {
            if !threshold.enabled || threshold.metric_type != sample.metric_type {
                continue;
            }
            if let Some(server_id) = &threshold.server_id {
                if server_id != &sample.server_id {
                    continue;
                }
            }

            let severity = if breaches(sample.value, threshold.critical_level, threshold.direction)
            {
                Some((AlertSeverity::Critical, threshold.critical_level))
            } else if breaches(sample.value, threshold.warning_level, threshold.direction) {
                Some((AlertSeverity::Medium, threshold.warning_level))
            } else {
                None
            };

            if let Some((severity, level)) = severity {
                match &best {
                    Some((current, _, _)) if *current >= severity => {}
                    _ => best = Some((severity, threshold, level)),
                }
            }
        }

        match best {
            Some((severity, threshold, level)) => {
                debug!(
                    server_id = %sample.server_id,
                    metric_type = %sample.metric_type.as_str(),
                    value = %sample.value,
                    level = %level,
                    severity = %severity.as_str(),
                    "Threshold breached"
                );

                AlertDecision::Breach {
                    severity,
                    threshold_id: threshold.id.clone(),
                    message: format!(
                        "{} is {} ({} threshold {} breached, direction {})",
                        sample.metric_type.as_str(),
                        sample.value,
                        severity.as_str(),
                        level,
                        threshold.direction.as_str(),
                    ),
                }
            }
            None => AlertDecision::Clear,
        }
    }
}

/// 边界包含式越限判定
fn breaches(value: f64, level: f64, direction: ComparisonDirection) -> bool {
    match direction {
        ComparisonDirection::Above => value >= level,
        ComparisonDirection::Below => value <= level,
    }
}
