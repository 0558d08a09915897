pub mod converter;
pub mod entity;
pub mod schema;

pub use entity::{alert, metric_sample, metric_threshold};
