//! Backup domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Human-readable file size ("612 bytes", "1.5 KB", "2.0 MB")
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Metadata for one rotated backup generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Backup filename (e.g., "passwds.gpg.0")
    pub name: String,
    /// Numeric suffix; 0 is the most recent generation
    pub generation: u32,
    /// Last modification time, i.e. when this generation was the live file
    pub modified_at: DateTime<Utc>,
    /// File size in bytes
    pub size_bytes: u64,
}

impl BackupMetadata {
    pub fn new(
        name: impl Into<String>,
        generation: u32,
        modified_at: DateTime<Utc>,
        size_bytes: u64,
    ) -> Self {
        Self {
            name: name.into(),
            generation,
            modified_at,
            size_bytes,
        }
    }

    /// Format size for human display
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}
