//! Environment variable secret backend implementation.
//!
//! Secrets are variables of the form `<PREFIX>_<CATEGORY>_<NAME>`:
//!
//! ```bash
//! export SECRETARY_WEB_EXAMPLE_URL="https://localhost/foo"
//! ```
//!
//! is `EXAMPLE_URL` in category `WEB`. Names and categories are sanitized
//! (uppercased, non-alphanumerics become `_`), so `example_url` in `web`
//! resolves the same variable and `prod/data` maps to `SECRETARY_PROD_DATA_*`.
//! Listing a category reports the sanitized names.
//!
//! This backend is read-only.

use async_trait::async_trait;
use regex::Regex;
use std::env;
use tracing::debug;

use super::backend::{SecretBackend, SecretBackendType};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::overrides::sanitize_segment;
use crate::secrets::types::{SecretMap, SecretString};

/// Environment variable secrets backend.
#[derive(Debug, Clone)]
pub struct EnvSecretBackend {
    prefix: String,
}

impl EnvSecretBackend {
    pub fn new(prefix: &str) -> Result<Self> {
        let prefix = sanitize_segment(prefix);
        if prefix.is_empty() {
            return Err(SecretsError::config_error("Environment backend prefix cannot be empty"));
        }
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Variable holding `name` in `category`.
    fn key_to_env_var(&self, name: &str, category: &str) -> String {
        format!("{}_{}_{}", self.prefix, sanitize_segment(category), sanitize_segment(name))
    }

    /// Matches variables of `category`. Only names `lookup` can reach are captured.
    fn category_matcher(&self, category: &str) -> Result<Regex> {
        let head = format!("{}_{}_", self.prefix, sanitize_segment(category));
        Ok(Regex::new(&format!("^{}(?P<name>[A-Z0-9_]+)$", regex::escape(&head)))?)
    }
}

#[async_trait]
impl SecretBackend for EnvSecretBackend {
    async fn lookup(&self, name: &str, category: &str) -> Result<Option<SecretString>> {
        let var = self.key_to_env_var(name, category);
        debug!(env_var = %var, "Looking up secret in environment");
        Ok(env::var(&var).ok().map(SecretString::new))
    }

    async fn lookup_all(&self, category: &str) -> Result<SecretMap> {
        let matcher = self.category_matcher(category)?;
        let mut secrets = SecretMap::new();

        for (var, value) in env::vars_os() {
            let (Some(var), Some(value)) = (var.to_str(), value.to_str()) else {
                continue;
            };
            let Some(caps) = matcher.captures(var) else {
                continue;
            };
            secrets.insert(caps["name"].to_string(), SecretString::new(value));
        }

        debug!(category = %category, count = secrets.len(), "Collected secrets from environment");
        Ok(secrets)
    }

    async fn store(&self, _secrets: &SecretMap, category: &str) -> Result<()> {
        debug!(category = %category, "Refusing to store into environment backend");
        Err(SecretsError::not_writable(self.id()))
    }

    fn backend_type(&self) -> SecretBackendType {
        SecretBackendType::Env
    }

    fn listing_key(&self, name: &str) -> String {
        sanitize_segment(name)
    }
}
