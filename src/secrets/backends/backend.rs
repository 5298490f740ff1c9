//! Secret backend trait and types
//!
//! Defines the capability every storage adapter provides to the resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::secrets::error::{Result, SecretsError};
use crate::secrets::types::{SecretMap, SecretString};

/// Kind of secret backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackendType {
    /// Local CSV file
    File,
    /// Process environment variables
    Env,
    /// HashiCorp Vault KV engine
    Vault,
}

impl SecretBackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Env => "env",
            Self::Vault => "vault",
        }
    }
}

impl FromStr for SecretBackendType {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "fss" => Ok(Self::File),
            "env" | "evs" => Ok(Self::Env),
            "vault" => Ok(Self::Vault),
            other => Err(SecretsError::config_error(format!("Invalid secret backend mode '{}'", other))),
        }
    }
}

impl fmt::Display for SecretBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage adapter consulted by the resolver.
///
/// Implementations do their own I/O and report failures as
/// [`SecretsError::BackendUnavailable`]; absence is `Ok(None)` / an empty map.
#[async_trait]
pub trait SecretBackend: Send + Sync + fmt::Debug {
    /// Look up one secret.
    async fn lookup(&self, name: &str, category: &str) -> Result<Option<SecretString>>;

    /// Every secret stored under `category`.
    async fn lookup_all(&self, category: &str) -> Result<SecretMap>;

    /// Persist `secrets` under `category`, replacing existing values of the same name.
    async fn store(&self, _secrets: &SecretMap, _category: &str) -> Result<()> {
        Err(SecretsError::not_writable(self.id()))
    }

    fn backend_type(&self) -> SecretBackendType;

    /// Identifier used in cache keys and log fields.
    fn id(&self) -> String {
        self.backend_type().as_str().to_string()
    }

    fn is_writable(&self) -> bool {
        false
    }

    /// Key under which `lookup_all` reports the secret `lookup(name, ..)` returns.
    fn listing_key(&self, name: &str) -> String {
        name.to_string()
    }
}
