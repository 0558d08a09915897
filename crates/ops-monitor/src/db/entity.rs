use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use chrono::{DateTime as ChronoDateTime, Utc};

/// 指标样本实体
pub mod metric_sample {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "metric_samples")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub server_id: String,
        pub metric_type: String,
        pub value: f64,
        pub unit: Option<String>,
        pub timestamp: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// 指标阈值实体
pub mod metric_threshold {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "metric_thresholds")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub tenant_id: String,
        pub server_id: Option<String>,
        pub metric_type: String,
        pub warning_level: f64,
        pub critical_level: f64,
        pub direction: String,
        pub enabled: bool,
        pub created_at: ChronoDateTime<Utc>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// 告警实体
pub mod alert {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "alerts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub server_id: String,
        pub metric_type: String,
        pub severity: String,
        pub title: String,
        pub description: String,
        pub status: String,
        pub acknowledged_at: Option<ChronoDateTime<Utc>>,
        pub acknowledged_by: Option<String>,
        pub resolved_at: Option<ChronoDateTime<Utc>>,
        pub resolved_by: Option<String>,
        pub dismissed_reason: Option<String>,
        pub created_at: ChronoDateTime<Utc>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
