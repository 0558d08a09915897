pub mod converter;
pub mod entity;
pub mod schema;

pub use entity::maintenance_window;
