use crate::{
    error::{ApiError, Result},
    handlers::tenant_id,
    models::*,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use ops_monitor::MetricThreshold;
use tracing::{debug, info};

/// 创建阈值
pub async fn create_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateThresholdRequest>,
) -> Result<(StatusCode, Json<MetricThreshold>)> {
    let tenant = tenant_id(&headers)?;

    let mut threshold = MetricThreshold::new(
        tenant.clone(),
        req.metric_type,
        req.warning_level,
        req.critical_level,
        req.direction,
    );
    if let Some(server_id) = req.server_id {
        // 针对具体服务器的阈值先验证归属
        state.directory.server_in_tenant(&server_id, &tenant).await?;
        threshold = threshold.with_server(server_id);
    }
    if req.enabled == Some(false) {
        threshold = threshold.disabled();
    }
    threshold.validate()?;

    info!(
        threshold_id = %threshold.id,
        metric_type = %threshold.metric_type.as_str(),
        "Creating threshold"
    );

    let threshold = state.metric_store.insert_threshold(threshold).await?;
    Ok((StatusCode::CREATED, Json(threshold)))
}

/// 更新阈值
pub async fn update_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(threshold_id): Path<String>,
    Json(req): Json<UpdateThresholdRequest>,
) -> Result<Json<MetricThreshold>> {
    let tenant = tenant_id(&headers)?;
    let mut threshold = require_threshold(&state, &threshold_id, &tenant).await?;

    if let Some(warning_level) = req.warning_level {
        threshold.warning_level = warning_level;
    }
    if let Some(critical_level) = req.critical_level {
        threshold.critical_level = critical_level;
    }
    if let Some(direction) = req.direction {
        threshold.direction = direction;
    }
    if let Some(enabled) = req.enabled {
        threshold.enabled = enabled;
    }
    threshold.updated_at = chrono::Utc::now();
    threshold.validate()?;

    info!(threshold_id = %threshold.id, "Updating threshold");

    let threshold = state.metric_store.update_threshold(threshold).await?;
    Ok(Json(threshold))
}

/// 删除阈值
///
/// 删除不回溯关闭由其触发的告警
pub async fn delete_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(threshold_id): Path<String>,
) -> Result<StatusCode> {
    let tenant = tenant_id(&headers)?;
    require_threshold(&state, &threshold_id, &tenant).await?;

    info!(threshold_id = %threshold_id, "Deleting threshold");

    state.metric_store.delete_threshold(&threshold_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 获取阈值
pub async fn get_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(threshold_id): Path<String>,
) -> Result<Json<MetricThreshold>> {
    let tenant = tenant_id(&headers)?;
    let threshold = require_threshold(&state, &threshold_id, &tenant).await?;
    Ok(Json(threshold))
}

/// 列出租户下的全部阈值
pub async fn list_thresholds(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MetricThreshold>>> {
    let tenant = tenant_id(&headers)?;

    debug!(tenant_id = %tenant, "Listing thresholds");

    let thresholds = state.metric_store.list_thresholds(&tenant).await?;
    Ok(Json(thresholds))
}

/// 按租户归属获取阈值，其他租户的阈值一律按未找到处理
async fn require_threshold(
    state: &AppState,
    threshold_id: &str,
    tenant: &str,
) -> Result<MetricThreshold> {
    let threshold = state
        .metric_store
        .get_threshold(threshold_id)
        .await?
        .filter(|t| t.tenant_id == tenant)
        .ok_or_else(|| ApiError::NotFound(format!("threshold {}", threshold_id)))?;

    Ok(threshold)
}
