//! Environment-variable overrides.
//!
//! Before the cache or any backend is consulted, the resolver looks for a
//! variable named `<PREFIX>_<CATEGORY>_<NAME>` built from the rewritten
//! category and the secret name:
//!
//! ```bash
//! export SECRETARY_PROD_DATA_DB_PASSWORD="local-only"
//! ```
//!
//! overrides `db_password` in category `prod/data`. The environment is read on
//! every request; override values never enter the cache.

use std::env;
use tracing::{debug, info};

use super::types::SecretString;

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "SECRETARY";

/// Uppercase ASCII letters and map every non-alphanumeric character to `_`.
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

/// Looks up operator-supplied override variables.
#[derive(Debug, Clone)]
pub struct OverrideLayer {
    prefix: String,
    enabled: bool,
}

impl Default for OverrideLayer {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl OverrideLayer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), enabled: true }
    }

    /// A layer that never reports an override.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Variable name consulted for `name` in `category`.
    pub fn env_var_name(&self, name: &str, category: &str) -> String {
        format!(
            "{}_{}_{}",
            sanitize_segment(&self.prefix),
            sanitize_segment(category),
            sanitize_segment(name)
        )
    }

    /// Return the override for `name` in the already rewritten `category`, if set.
    pub fn check(&self, name: &str, category: &str) -> Option<SecretString> {
        if !self.enabled {
            return None;
        }

        let var = self.env_var_name(name, category);
        match env::var(&var) {
            Ok(value) => {
                info!(env_var = %var, "Secret taken from override variable");
                Some(SecretString::new(value))
            }
            Err(env::VarError::NotUnicode(_)) => {
                debug!(env_var = %var, "Ignoring override variable with non-UTF-8 value");
                None
            }
            Err(env::VarError::NotPresent) => None,
        }
    }
}
