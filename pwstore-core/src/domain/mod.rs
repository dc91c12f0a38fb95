//! Core domain entities
//!
//! Pure data structures and text encoding - no I/O or process spawning.

mod backup;
pub mod codec;
mod record;
pub mod result;

pub use backup::{format_size, BackupMetadata};
pub use codec::{parse_plaintext, render_plaintext};
pub use record::Record;
