use crate::{error::Result, models::ListNotificationsQuery, state::AppState};
use axum::{
    extract::{Query, State},
    Json,
};
use ops_notify::OpsEvent;
use tracing::debug;

/// 拉取最近的站内通知（新的在前）
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<OpsEvent>>> {
    let limit = query.limit.unwrap_or(50).min(500);

    debug!(limit = limit, "Listing recent notifications");

    let events = state.in_app.recent(limit).await;
    Ok(Json(events))
}
