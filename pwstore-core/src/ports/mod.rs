//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The database
//! service depends only on these traits, not on concrete implementations.

mod crypto_backend;

pub use crypto_backend::{CryptoBackend, Secret};
