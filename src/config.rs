use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::secrets::{SecretError, SecretReader};

pub const DEFAULT_BASE_URL: &str = "https://a.cms.omniupdate.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parsed `mc-utils.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl Config {
    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.cms.base_url,
            accounts_count = self.accounts.len(),
            "Loaded Config"
        );
        for account in &self.accounts {
            account.trace_loaded();
        }
    }

    pub fn account(&self, account: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.account == account)
    }
}

/// HTTP settings for the CMS client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CmsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl CmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountConfig {
    pub account: String,
    pub username: String,
    /// `{op: ...}` or `{env: ...}`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub password: PasswordSource,
}

impl AccountConfig {
    pub fn trace_loaded(&self) {
        debug!(
            account = %self.account,
            username = %self.username,
            password_source = self.password.kind(),
            "Loaded account"
        );
    }

    /// Resolves the password and returns the full login triple.
    pub fn credentials(&self, secrets: &dyn SecretReader) -> Result<Credentials, SecretError> {
        Ok(Credentials {
            account: self.account.clone(),
            username: self.username.clone(),
            password: self.password.resolve(secrets)?,
        })
    }
}

/// Where an account's password comes from. Never the password itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PasswordSource {
    /// A 1Password reference, `op://vault/item/field`.
    Op(String),
    /// Name of an environment variable.
    Env(String),
}

impl PasswordSource {
    pub fn kind(&self) -> &'static str {
        match self {
            PasswordSource::Op(_) => "op",
            PasswordSource::Env(_) => "env",
        }
    }

    pub fn resolve(&self, secrets: &dyn SecretReader) -> Result<String, SecretError> {
        match self {
            PasswordSource::Op(reference) => secrets.read(reference),
            PasswordSource::Env(var) => {
                std::env::var(var).map_err(|_| SecretError::MissingEnv(var.clone()))
            }
        }
    }
}

pub struct Credentials {
    pub account: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
