pub mod aggregate;
pub mod alert;
pub mod db;
pub mod error;
pub mod model;
pub mod store;
pub mod threshold;

pub use aggregate::Aggregator;
pub use alert::{AlertManager, MaintenanceChecker, MaintenancePolicy};
pub use error::{MonitorError, Result};
pub use model::{
    AggregateInterval, AggregatedMetric, Alert, AlertFilter, AlertSeverity, AlertStatus,
    ComparisonDirection, MetricSample, MetricThreshold, MetricType,
};
pub use store::MetricStore;
pub use threshold::{AlertDecision, ThresholdEvaluator};
