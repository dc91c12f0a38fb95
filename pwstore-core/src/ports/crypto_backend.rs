//! Crypto backend port - encryption at rest

use std::fmt;
use std::path::Path;

use zeroize::Zeroizing;

use crate::domain::result::Result;

/// The master passphrase
///
/// Held in memory only and wiped when dropped. It is never formatted by
/// `Debug` and has no `Display`, so it cannot leak into logs or errors.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(Zeroizing::new(passphrase.into()))
    }

    /// Borrow the passphrase for handing to a backend
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Public-key encryption and passphrase-gated decryption of opaque blobs
///
/// Each call is a single blocking operation. Implementations must not pass
/// the secret through process arguments or the environment.
pub trait CryptoBackend: Send + Sync {
    /// Encrypt `plaintext` to `recipient`, writing the ciphertext to `output`
    fn encrypt(&self, plaintext: &[u8], recipient: &str, output: &Path) -> Result<()>;

    /// Decrypt the file at `input` and return the plaintext
    fn decrypt(&self, input: &Path, secret: &Secret) -> Result<Vec<u8>>;
}
