//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod database;
pub mod logging;
pub mod rotation;

pub use database::{Database, DatabaseOptions, SaveReport, SetOutcome};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use rotation::RotationStep;
