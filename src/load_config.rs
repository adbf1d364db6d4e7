use crate::config::Config;
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Overrides `cms.base_url` when set.
pub const BASE_URL_ENV: &str = "MC_CMS_BASE_URL";

/// Loads the static YAML config (secret references only, no secrets) and
/// applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: Config = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
        if !base_url.trim().is_empty() {
            info!(base_url = %base_url, "{BASE_URL_ENV} overrides cms.base_url");
            config.cms.base_url = base_url;
        }
    }

    if config.cms.timeout_secs == 0 {
        error!("cms.timeout_secs must be positive");
        anyhow::bail!("cms.timeout_secs must be positive");
    }

    let mut seen = std::collections::HashSet::new();
    for account in &config.accounts {
        if !seen.insert(account.account.as_str()) {
            error!(account = %account.account, "Duplicate account in config");
            anyhow::bail!("Duplicate account in config: {}", account.account);
        }
    }

    config.trace_loaded();
    Ok(config)
}
