use crate::{
    error::{ApiError, Result},
    handlers::tenant_id,
    models::*,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use ops_monitor::{Alert, AlertFilter};
use tracing::{debug, info};

/// 加载告警并校验其服务器属于指定租户
///
/// 其他租户的告警与不存在的告警同样返回 NotFound
async fn require_tenant_alert(state: &AppState, alert_id: &str, tenant: &str) -> Result<Alert> {
    let alert = state
        .alert_manager
        .get(alert_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("alert {}", alert_id)))?;

    state
        .directory
        .server_in_tenant(&alert.server_id, tenant)
        .await?;

    Ok(alert)
}

/// 分页查询告警
pub async fn list_alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<PaginatedResponse<Alert>>> {
    let tenant = tenant_id(&headers)?;
    debug!(tenant_id = %tenant, "Listing alerts with filter");

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    let mut filter: AlertFilter = query.into();
    match &filter.server_id {
        Some(server_id) => {
            state.directory.server_in_tenant(server_id, &tenant).await?;
        }
        None => {
            let servers = state.directory.list_servers(&tenant).await?;
            if servers.is_empty() {
                return Ok(Json(PaginatedResponse {
                    data: Vec::new(),
                    total: 0,
                    page,
                    page_size,
                }));
            }
            filter.server_ids = Some(servers.into_iter().map(|s| s.id).collect());
        }
    }

    let (alerts, total) = state.alert_manager.list(&filter).await?;

    Ok(Json(PaginatedResponse {
        data: alerts,
        total,
        page,
        page_size,
    }))
}

/// 获取告警
pub async fn get_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
) -> Result<Json<Alert>> {
    let tenant = tenant_id(&headers)?;
    let alert = require_tenant_alert(&state, &alert_id, &tenant).await?;

    Ok(Json(alert))
}

/// 确认告警
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
    Json(req): Json<AcknowledgeAlertRequest>,
) -> Result<Json<Alert>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_alert(&state, &alert_id, &tenant).await?;

    info!(alert_id = %alert_id, by = %req.acknowledged_by, "Acknowledging alert");

    let alert = state
        .alert_manager
        .acknowledge(&alert_id, &req.acknowledged_by)
        .await?;
    Ok(Json(alert))
}

/// 解决告警
pub async fn resolve_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
    Json(req): Json<ResolveAlertRequest>,
) -> Result<Json<Alert>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_alert(&state, &alert_id, &tenant).await?;

    info!(alert_id = %alert_id, by = %req.resolved_by, "Resolving alert");

    let alert = state
        .alert_manager
        .resolve(&alert_id, &req.resolved_by)
        .await?;
    Ok(Json(alert))
}

/// 忽略告警
pub async fn dismiss_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(alert_id): Path<String>,
    Json(req): Json<DismissAlertRequest>,
) -> Result<Json<Alert>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_alert(&state, &alert_id, &tenant).await?;

    info!(alert_id = %alert_id, by = %req.dismissed_by, "Dismissing alert");

    let alert = state
        .alert_manager
        .dismiss(&alert_id, &req.dismissed_by, &req.reason)
        .await?;
    Ok(Json(alert))
}
