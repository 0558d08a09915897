use crate::error::MaintenanceError;
use crate::model::{MaintenanceStatus, MaintenanceWindow};
use sea_orm::ActiveValue::Set;

/// MaintenanceWindow 模型与数据库实体的转换
impl From<MaintenanceWindow> for super::maintenance_window::ActiveModel {
    fn from(window: MaintenanceWindow) -> Self {
        Self {
            id: Set(window.id),
            server_id: Set(window.server_id),
            title: Set(window.title),
            description: Set(window.description),
            start_time: Set(window.start_time),
            end_time: Set(window.end_time),
            status: Set(window.status.as_str().to_string()),
            approved_by: Set(window.approved_by),
            approved_at: Set(window.approved_at),
            cancelled_reason: Set(window.cancelled_reason),
            completion_notes: Set(window.completion_notes),
            created_at: Set(window.created_at),
            updated_at: Set(window.updated_at),
        }
    }
}

impl TryFrom<super::maintenance_window::Model> for MaintenanceWindow {
    type Error = MaintenanceError;

    fn try_from(model: super::maintenance_window::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            server_id: model.server_id,
            title: model.title,
            description: model.description,
            start_time: model.start_time,
            end_time: model.end_time,
            status: MaintenanceStatus::from_str(&model.status).ok_or_else(|| {
                MaintenanceError::validation(format!(
                    "Unknown maintenance status: {}",
                    model.status
                ))
            })?,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            cancelled_reason: model.cancelled_reason,
            completion_notes: model.completion_notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
