pub mod directory;
pub mod error;
pub mod lock;
pub mod model;

pub use directory::{InMemoryDirectory, ServerDirectory};
pub use error::{DirectoryError, Result};
pub use lock::ServerLocks;
pub use model::{ServerRecord, ServerStatus};
