use clap::Parser;
use ops_api::{create_router, AppState, OpsConfig, StoreMaintenanceChecker};
use ops_directory::{InMemoryDirectory, ServerLocks};
use ops_maintenance::{MaintenanceScheduler, MaintenanceStore};
use ops_monitor::{Aggregator, AlertManager, MetricStore};
use ops_notify::{EmailChannel, EventDispatcher, InAppChannel, WebhookChannel};
use sea_orm::Database;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = OpsConfig::load(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    info!("Starting server operations engine with config: {}", args.config);

    let db = Arc::new(Database::connect(&config.database.url).await?);
    ops_monitor::db::schema::init_schema(&db).await?;
    ops_maintenance::db::schema::init_schema(&db).await?;

    let timeout = Duration::from_secs(config.store.timeout_secs);
    let metric_store = Arc::new(MetricStore::new(db.clone()).with_timeout(timeout));
    let maintenance_store = Arc::new(MaintenanceStore::new(db.clone()).with_timeout(timeout));

    // 通知渠道
    let dispatcher = Arc::new(EventDispatcher::new(config.notify.min_notify_level()));
    let in_app = Arc::new(InAppChannel::new(config.notify.in_app_capacity));
    dispatcher.register(in_app.clone()).await;
    if let Some(email) = config.notify.email.clone() {
        dispatcher.register(Arc::new(EmailChannel::new(email))).await;
    }
    if let Some(webhook) = config.notify.webhook.clone() {
        dispatcher.register(Arc::new(WebhookChannel::new(webhook))).await;
    }

    let locks = Arc::new(ServerLocks::new());
    let directory = Arc::new(InMemoryDirectory::new());

    let scheduler = Arc::new(MaintenanceScheduler::new(
        maintenance_store.clone(),
        locks.clone(),
        dispatcher.clone(),
    ));

    let alert_manager = Arc::new(
        AlertManager::new(metric_store.clone(), locks, dispatcher).with_maintenance_checker(
            Arc::new(StoreMaintenanceChecker::new(maintenance_store)),
            config.notify.policy(),
        ),
    );

    let state = AppState {
        alert_manager,
        aggregator: Arc::new(Aggregator::new(metric_store.clone())),
        metric_store,
        scheduler,
        directory,
        in_app,
    };

    let app = create_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
