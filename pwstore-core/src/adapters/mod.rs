//! Adapters - concrete implementations of ports
//!
//! - gpg: GnuPG process implementation of the crypto backend

pub mod gpg;

pub use gpg::GpgBackend;
