use crate::{error::Result, handlers::tenant_id, models::*, state::AppState};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use ops_monitor::{AggregatedMetric, MetricSample};
use tracing::{debug, info};

/// 上报指标样本
///
/// 存储样本并同步完成阈值评估，响应中带回本次开启、
/// 更新或解决的告警
pub async fn ingest_metric(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IngestMetricRequest>,
) -> Result<(StatusCode, Json<IngestMetricResponse>)> {
    let tenant = tenant_id(&headers)?;
    state.directory.server_in_tenant(&req.server_id, &tenant).await?;

    info!(
        server_id = %req.server_id,
        metric_type = %req.metric_type.as_str(),
        value = %req.value,
        "Ingesting metric sample"
    );

    let mut sample = MetricSample::new(req.server_id, req.metric_type, req.value);
    if let Some(unit) = req.unit {
        sample = sample.with_unit(unit);
    }
    if let Some(timestamp) = req.timestamp {
        sample = sample.with_timestamp(timestamp);
    }

    let outcome = state.alert_manager.ingest(sample, &tenant).await?;

    Ok((
        StatusCode::CREATED,
        Json(IngestMetricResponse {
            sample: outcome.sample,
            alert: outcome.alert,
        }),
    ))
}

/// 查询窗口聚合
pub async fn aggregate_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AggregateQuery>,
) -> Result<Json<Vec<AggregatedMetric>>> {
    let tenant = tenant_id(&headers)?;
    state.directory.server_in_tenant(&query.server_id, &tenant).await?;

    debug!(
        server_id = %query.server_id,
        metric_type = %query.metric_type.as_str(),
        interval = %query.interval.as_str(),
        "Computing metric aggregation"
    );

    let buckets = state
        .aggregator
        .aggregate(
            &query.server_id,
            query.metric_type,
            query.interval,
            query.lookback_hours,
        )
        .await?;

    Ok(Json(buckets))
}
