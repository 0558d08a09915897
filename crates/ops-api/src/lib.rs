pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod maintenance_checker;
pub mod models;
pub mod state;

pub use api::create_router;
pub use config::OpsConfig;
pub use error::{ApiError, Result};
pub use maintenance_checker::StoreMaintenanceChecker;
pub use state::AppState;
