pub mod api;
pub mod classify;
pub mod config;
pub mod egauge;
pub mod error;
pub mod models;
pub mod registry;
pub mod scheduler;

// Re-export commonly used items
pub use config::Config;
pub use egauge::{SnapshotClient, SnapshotSource};
pub use error::{AppError, FetchError, Result, ValidationError};
pub use registry::ProjectRegistry;
pub use scheduler::{PollScheduler, SchedulerConfig};
