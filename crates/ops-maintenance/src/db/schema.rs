use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use tracing::info;

/// 创建维护子系统的数据表
///
/// 供嵌入式部署与测试使用，生产建表由运维脚本负责
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    let sql = r#"
        CREATE TABLE IF NOT EXISTS maintenance_windows (
            id TEXT PRIMARY KEY,
            server_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            status TEXT NOT NULL,
            approved_by TEXT,
            approved_at TEXT,
            cancelled_reason TEXT,
            completion_notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
    "#;

    db.execute(Statement::from_string(db.get_database_backend(), sql.to_string()))
        .await?;

    info!("Maintenance schema initialized");
    Ok(())
}
