use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use chrono::{DateTime as ChronoDateTime, Utc};

/// 维护窗口实体
pub mod maintenance_window {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "maintenance_windows")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub server_id: String,
        pub title: String,
        pub description: String,
        pub start_time: ChronoDateTime<Utc>,
        pub end_time: ChronoDateTime<Utc>,
        pub status: String,
        pub approved_by: Option<String>,
        pub approved_at: Option<ChronoDateTime<Utc>>,
        pub cancelled_reason: Option<String>,
        pub completion_notes: Option<String>,
        pub created_at: ChronoDateTime<Utc>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
