//! GnuPG adapter - crypto backend backed by the `gpg` executable
//!
//! Every operation is one blocking child process. The passphrase travels over
//! the child's stdin (`--passphrase-fd 0`) so it never shows up in process
//! listings or the environment.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use crate::domain::result::{Error, Result};
use crate::ports::{CryptoBackend, Secret};

/// Default executable name, resolved through PATH
pub const DEFAULT_GPG_PROGRAM: &str = "gpg";

/// Crypto backend that shells out to GnuPG
#[derive(Debug, Clone)]
pub struct GpgBackend {
    program: PathBuf,
    homedir: Option<PathBuf>,
}

impl Default for GpgBackend {
    fn default() -> Self {
        Self::new(DEFAULT_GPG_PROGRAM)
    }
}

impl GpgBackend {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            homedir: None,
        }
    }

    /// Use a specific GnuPG home directory instead of the user's default
    pub fn with_homedir(mut self, homedir: impl Into<PathBuf>) -> Self {
        self.homedir = Some(homedir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn base_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--batch".into(), "--quiet".into()];
        if let Some(homedir) = &self.homedir {
            args.push("--homedir".into());
            args.push(homedir.into());
        }
        args
    }

    fn encrypt_args(&self, recipient: &str, output: &Path) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend([
            OsString::from("--yes"),
            "--recipient".into(),
            recipient.into(),
            "--output".into(),
            output.into(),
            "--encrypt".into(),
        ]);
        args
    }

    fn decrypt_args(&self, input: &Path) -> Vec<OsString> {
        let mut args = self.base_args();
        args.extend([
            OsString::from("--pinentry-mode"),
            "loopback".into(),
            "--passphrase-fd".into(),
            "0".into(),
            "--decrypt".into(),
            input.into(),
        ]);
        args
    }

    /// Run gpg with `stdin_data` fed to its standard input
    fn run(&self, args: Vec<OsString>, stdin_data: &[u8]) -> Result<Output> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!("failed to start {}: {}", self.program.display(), e),
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A broken pipe means gpg exited early; its status and stderr
            // below carry the real reason.
            match stdin.write_all(stdin_data) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                _ => {}
            }
        }

        Ok(child.wait_with_output()?)
    }
}

fn status_text(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => "terminated by signal".to_string(),
    }
}

fn diagnostics(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

impl CryptoBackend for GpgBackend {
    fn encrypt(&self, plaintext: &[u8], recipient: &str, output: &Path) -> Result<()> {
        let result = self.run(self.encrypt_args(recipient, output), plaintext)?;
        if !result.status.success() {
            return Err(Error::backend(
                "encrypt",
                status_text(result.status),
                diagnostics(&result),
            ));
        }
        Ok(())
    }

    fn decrypt(&self, input: &Path, secret: &Secret) -> Result<Vec<u8>> {
        let mut passphrase = zeroize::Zeroizing::new(secret.expose().as_bytes().to_vec());
        passphrase.push(b'\n');

        let result = self.run(self.decrypt_args(input), &passphrase)?;
        if !result.status.success() {
            return Err(Error::backend(
                "decrypt",
                status_text(result.status),
                diagnostics(&result),
            ));
        }
        Ok(result.stdout)
    }
}
