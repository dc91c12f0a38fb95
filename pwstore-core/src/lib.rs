//! pwstore Core - encrypted flat-file credential database
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Records and the plaintext codec
//! - **ports**: Trait definitions for external dependencies (CryptoBackend)
//! - **services**: Database load/save orchestration, backup rotation, event log
//! - **adapters**: Concrete implementations (GnuPG)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

// Re-export commonly used types at crate root
pub use adapters::GpgBackend;
pub use config::Config;
pub use domain::result::{Error, Result};
pub use domain::{BackupMetadata, Record};
pub use ports::{CryptoBackend, Secret};
pub use services::{
    Database, DatabaseOptions, EntryPoint, LogEntry, LogEvent, LoggingService, SaveReport,
    SetOutcome,
};
