//! # Configuration Settings
//!
//! Defines the configuration structures for secret resolution and logging.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

use crate::secrets::backends::file::default_secrets_file;
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::overrides::DEFAULT_ENV_PREFIX;
use crate::secrets::types::DEFAULT_ROOT_CATEGORY;
use crate::secrets::{MergePolicy, SecretBackendType, VaultBackendConfig};

/// Secret resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecretsConfig {
    /// Backends to query, in order
    #[validate(length(min = 1, message = "At least one secret backend mode is required"))]
    pub modes: Vec<SecretBackendType>,

    /// Category used when none is requested
    #[validate(length(min = 1, message = "Root category cannot be empty"))]
    pub root_category: String,

    /// Prefix of override and environment-backend variables
    #[validate(length(min = 1, message = "Environment prefix cannot be empty"))]
    pub env_prefix: String,

    /// Pattern applied to every requested category
    pub category_regexp: Option<String>,

    /// Replacement for the first match of `category_regexp`
    pub category_replace: Option<String>,

    /// How results from several backends are combined
    pub merge_policy: MergePolicy,

    /// Consult `<PREFIX>_<CATEGORY>_<NAME>` override variables
    pub allow_overrides: bool,

    /// File backend settings
    pub file: FileBackendConfig,

    /// Vault backend settings (present when an address is configured)
    pub vault: Option<VaultBackendConfig>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            modes: vec![SecretBackendType::File],
            root_category: DEFAULT_ROOT_CATEGORY.to_string(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            category_regexp: None,
            category_replace: None,
            merge_policy: MergePolicy::default(),
            allow_overrides: true,
            file: FileBackendConfig::default(),
            vault: None,
        }
    }
}

impl SecretsConfig {
    /// Load configuration from `SECRETARY_*` environment variables.
    ///
    /// Unset variables keep their defaults. The result is validated.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(modes) = env_var("SECRETARY_MODE") {
            config.modes = parse_modes(&modes)?;
        }
        if let Some(path) = env_var("SECRETARY_FILE") {
            config.file.path = PathBuf::from(path);
        }
        if let Some(root) = env_var("SECRETARY_ROOT_CATEGORY") {
            config.root_category = root;
        }
        if let Some(prefix) = env_var("SECRETARY_ENV_PREFIX") {
            config.env_prefix = prefix;
        }
        config.category_regexp = env_var("SECRETARY_CATEGORY_REGEXP");
        config.category_replace = env_var("SECRETARY_CATEGORY_REPLACE");
        if let Some(policy) = env_var("SECRETARY_MERGE_POLICY") {
            config.merge_policy = policy.parse()?;
        }
        if let Some(allow) = env_var("SECRETARY_ALLOW_OVERRIDES") {
            config.allow_overrides = parse_bool("SECRETARY_ALLOW_OVERRIDES", &allow)?;
        }
        config.vault = VaultBackendConfig::from_env()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)
            .map_err(|e| SecretsError::config_error(format!("Invalid configuration: {}", e)))?;

        self.validate_custom()
    }

    /// Checks the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if let Some(pattern) = &self.category_regexp {
            regex::Regex::new(pattern)?;
        }

        if self.category_replace.is_some() && self.category_regexp.is_none() {
            return Err(SecretsError::config_error(
                "SECRETARY_CATEGORY_REPLACE requires SECRETARY_CATEGORY_REGEXP",
            ));
        }

        if self.modes.contains(&SecretBackendType::Vault) && self.vault.is_none() {
            return Err(SecretsError::config_error(
                "Vault mode selected but no Vault address configured (SECRETARY_VAULT_ADDR)",
            ));
        }

        Ok(())
    }
}

/// File backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileBackendConfig {
    /// CSV file holding `category,name,value,notes` rows
    pub path: PathBuf,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self { path: default_secrets_file() }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "error".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    /// Load from `SECRETARY_LOG_LEVEL` and `SECRETARY_LOG_JSON`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env_var("SECRETARY_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: env_var("SECRETARY_LOG_JSON")
                .and_then(|v| parse_bool("SECRETARY_LOG_JSON", &v).ok())
                .unwrap_or(defaults.json_logging),
        }
    }
}

/// Non-empty value of an environment variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a comma separated list of backend modes, e.g. `file,env`.
pub fn parse_modes(raw: &str) -> Result<Vec<SecretBackendType>> {
    raw.split(',').map(str::trim).filter(|m| !m.is_empty()).map(str::parse).collect()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SecretsError::config_error(format!("Invalid boolean for {}: '{}'", name, other))),
    }
}
