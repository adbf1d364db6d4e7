//! Secret retrieval through the 1Password CLI.
//!
//! `op read "op://vault/item/field"` prints the secret followed by a newline;
//! [`OpCli`] runs it and strips the newlines. The [`SecretReader`] trait is the
//! seam the config loader resolves passwords through, so tests can swap in a mock.

use std::process::Command;
use thiserror::Error;
use tracing::{debug, error};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

pub const OP_SCHEME: &str = "op://";

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("invalid secret reference {0:?}: must start with op://")]
    InvalidReference(String),

    #[error("1Password CLI `op` not found on PATH")]
    CliNotFound,

    #[error("failed to launch `op`: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("`op read` exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("secret is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Anything that can turn a secret reference into its value.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait SecretReader: Send + Sync {
    fn read(&self, reference: &str) -> Result<String, SecretError>;
}

/// The `op` command line tool.
#[derive(Debug, Clone)]
pub struct OpCli {
    program: String,
}

impl Default for OpCli {
    fn default() -> Self {
        Self {
            program: "op".to_string(),
        }
    }
}

impl OpCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable, e.g. an absolute path to `op`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl SecretReader for OpCli {
    fn read(&self, reference: &str) -> Result<String, SecretError> {
        validate_reference(reference)?;
        let program = which::which(&self.program).map_err(|_| SecretError::CliNotFound)?;

        debug!(reference = %reference, "Reading secret via op");
        let output = Command::new(program).arg("read").arg(reference).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(reference = %reference, status = %output.status, "op read failed");
            return Err(SecretError::CommandFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(strip_newlines(&String::from_utf8(output.stdout)?))
    }
}

/// Reads a secret with the default `op` binary.
pub fn get_op_secret(op_path: &str) -> Result<String, SecretError> {
    OpCli::new().read(op_path)
}

pub fn validate_reference(reference: &str) -> Result<(), SecretError> {
    if reference.starts_with(OP_SCHEME) && reference.len() > OP_SCHEME.len() {
        Ok(())
    } else {
        Err(SecretError::InvalidReference(reference.to_string()))
    }
}

fn strip_newlines(raw: &str) -> String {
    raw.replace('\n', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_need_the_op_scheme() {
        assert!(validate_reference("op://Vault/Item/password").is_ok());
        assert!(matches!(
            validate_reference("Vault/Item/password"),
            Err(SecretError::InvalidReference(_))
        ));
        assert!(validate_reference("op://").is_err());
    }

    #[test]
    fn every_newline_is_removed() {
        assert_eq!(strip_newlines("s3cr\net\n"), "s3cret");
    }

    #[test]
    fn invalid_reference_is_rejected_before_spawning() {
        let cli = OpCli::with_program("definitely-not-an-installed-binary");
        assert!(matches!(
            cli.read("not-a-reference"),
            Err(SecretError::InvalidReference(_))
        ));
    }

    #[test]
    fn missing_binary_is_reported() {
        let cli = OpCli::with_program("definitely-not-an-installed-binary");
        assert!(matches!(
            cli.read("op://Vault/Item/password"),
            Err(SecretError::CliNotFound)
        ));
    }
}
