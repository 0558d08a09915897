use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use tracing::info;

/// 创建监控子系统的数据表
///
/// 供嵌入式部署与测试使用，生产环境的建表与超表配置由运维脚本负责
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS metric_samples (
            id TEXT PRIMARY KEY,
            server_id TEXT NOT NULL,
            metric_type TEXT NOT NULL,
            value REAL NOT NULL,
            unit TEXT,
            timestamp TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS metric_thresholds (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            server_id TEXT,
            metric_type TEXT NOT NULL,
            warning_level REAL NOT NULL,
            critical_level REAL NOT NULL,
            direction TEXT NOT NULL,
            enabled BOOLEAN NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id TEXT PRIMARY KEY,
            server_id TEXT NOT NULL,
            metric_type TEXT NOT NULL,
            severity TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            status TEXT NOT NULL,
            acknowledged_at TEXT,
            acknowledged_by TEXT,
            resolved_at TEXT,
            resolved_by TEXT,
            dismissed_reason TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    ];

    for sql in statements {
        db.execute(Statement::from_string(db.get_database_backend(), sql.to_string()))
            .await?;
    }

    info!("Monitor schema initialized");
    Ok(())
}
