use crate::{handlers, state::AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // 健康检查
        .route("/health", get(health_check))

        // 指标 API
        .route("/api/v1/metrics", post(handlers::ingest_metric))
        .route("/api/v1/metrics/aggregate", get(handlers::aggregate_metrics))

        // 阈值 API
        .route("/api/v1/thresholds", post(handlers::create_threshold))
        .route("/api/v1/thresholds", get(handlers::list_thresholds))
        .route("/api/v1/thresholds/:threshold_id", get(handlers::get_threshold))
        .route("/api/v1/thresholds/:threshold_id", put(handlers::update_threshold))
        .route("/api/v1/thresholds/:threshold_id", delete(handlers::delete_threshold))

        // 告警 API
        .route("/api/v1/alerts", get(handlers::list_alerts))
        .route("/api/v1/alerts/:alert_id", get(handlers::get_alert))
        .route("/api/v1/alerts/:alert_id/acknowledge", post(handlers::acknowledge_alert))
        .route("/api/v1/alerts/:alert_id/resolve", post(handlers::resolve_alert))
        .route("/api/v1/alerts/:alert_id/dismiss", post(handlers::dismiss_alert))

        // 维护窗口 API
        .route("/api/v1/maintenance", post(handlers::create_window))
        .route("/api/v1/maintenance", get(handlers::list_windows))
        .route("/api/v1/maintenance/:window_id", get(handlers::get_window))
        .route("/api/v1/maintenance/:window_id/approve", post(handlers::approve_window))
        .route("/api/v1/maintenance/:window_id/begin", post(handlers::begin_window))
        .route("/api/v1/maintenance/:window_id/complete", post(handlers::complete_window))
        .route("/api/v1/maintenance/:window_id/cancel", post(handlers::cancel_window))
        .route("/api/v1/maintenance/:window_id/reschedule", post(handlers::reschedule_window))

        // 通知 API
        .route("/api/v1/notifications", get(handlers::list_notifications))

        // 添加中间件
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 健康检查
async fn health_check() -> &'static str {
    "OK"
}
