pub mod db;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod store;

pub use error::{MaintenanceError, Result};
pub use model::{MaintenanceStatus, MaintenanceWindow, WindowConflict, WindowFilter};
pub use scheduler::MaintenanceScheduler;
pub use store::MaintenanceStore;
