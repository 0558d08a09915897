use crate::{
    error::{ApiError, Result},
    handlers::tenant_id,
    models::*,
    state::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use ops_maintenance::{MaintenanceWindow, WindowFilter};
use tracing::{debug, info};

/// 加载维护窗口并校验其服务器属于指定租户
///
/// 其他租户的窗口与不存在的窗口同样返回 NotFound
async fn require_tenant_window(
    state: &AppState,
    window_id: &str,
    tenant: &str,
) -> Result<MaintenanceWindow> {
    let window = state
        .scheduler
        .get(window_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("maintenance window {}", window_id)))?;

    state
        .directory
        .server_in_tenant(&window.server_id, tenant)
        .await?;

    Ok(window)
}

/// 创建维护窗口
pub async fn create_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateWindowRequest>,
) -> Result<(StatusCode, Json<MaintenanceWindow>)> {
    let tenant = tenant_id(&headers)?;
    state.directory.server_in_tenant(&req.server_id, &tenant).await?;

    info!(
        server_id = %req.server_id,
        start_time = %req.start_time,
        end_time = %req.end_time,
        "Creating maintenance window"
    );

    let window = state
        .scheduler
        .create(
            &req.server_id,
            &req.title,
            req.description.as_deref().unwrap_or(""),
            req.start_time,
            req.end_time,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(window)))
}

/// 审批维护窗口
pub async fn approve_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
    Json(req): Json<ApproveWindowRequest>,
) -> Result<Json<MaintenanceWindow>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_window(&state, &window_id, &tenant).await?;

    info!(window_id = %window_id, by = %req.approved_by, "Approving maintenance window");

    let window = state.scheduler.approve(&window_id, &req.approved_by).await?;
    Ok(Json(window))
}

/// 开始执行维护窗口
pub async fn begin_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
) -> Result<Json<MaintenanceWindow>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_window(&state, &window_id, &tenant).await?;

    info!(window_id = %window_id, "Starting maintenance window");

    let window = state.scheduler.begin(&window_id).await?;
    Ok(Json(window))
}

/// 完成维护窗口
pub async fn complete_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
    Json(req): Json<CompleteWindowRequest>,
) -> Result<Json<MaintenanceWindow>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_window(&state, &window_id, &tenant).await?;

    info!(window_id = %window_id, "Completing maintenance window");

    let window = state
        .scheduler
        .complete(&window_id, req.completion_notes.as_deref().unwrap_or(""))
        .await?;
    Ok(Json(window))
}

/// 取消维护窗口
pub async fn cancel_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
    Json(req): Json<CancelWindowRequest>,
) -> Result<Json<MaintenanceWindow>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_window(&state, &window_id, &tenant).await?;

    info!(window_id = %window_id, reason = %req.reason, "Cancelling maintenance window");

    let window = state.scheduler.cancel(&window_id, &req.reason).await?;
    Ok(Json(window))
}

/// 改期维护窗口
pub async fn reschedule_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
    Json(req): Json<RescheduleWindowRequest>,
) -> Result<Json<MaintenanceWindow>> {
    let tenant = tenant_id(&headers)?;
    require_tenant_window(&state, &window_id, &tenant).await?;

    info!(
        window_id = %window_id,
        start_time = %req.start_time,
        end_time = %req.end_time,
        "Rescheduling maintenance window"
    );

    let window = state
        .scheduler
        .reschedule(&window_id, req.start_time, req.end_time)
        .await?;
    Ok(Json(window))
}

/// 获取维护窗口
pub async fn get_window(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(window_id): Path<String>,
) -> Result<Json<MaintenanceWindow>> {
    let tenant = tenant_id(&headers)?;
    let window = require_tenant_window(&state, &window_id, &tenant).await?;

    Ok(Json(window))
}

/// 分页查询维护窗口
pub async fn list_windows(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListWindowsQuery>,
) -> Result<Json<PaginatedResponse<MaintenanceWindow>>> {
    let tenant = tenant_id(&headers)?;
    debug!(tenant_id = %tenant, "Listing maintenance windows with filter");

    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(20);

    let mut filter: WindowFilter = query.into();
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

    let (windows, total) = state.scheduler.list(&filter).await?;

    Ok(Json(PaginatedResponse {
        data: windows,
        total,
        page,
        page_size,
    }))
}
