//! Vault secret backend implementation
//!
//! Each category is one secret path inside a KV mount; the secret's data is the
//! name -> value map of that category. Both KV engines are supported:
//!
//! - `kv2` (default): `kv2::read`/`kv2::set`, versioned
//! - `kv1`: `kv1::get`/`kv1::set`
//!
//! Non-string values stored in Vault are returned as their JSON text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::{kv1, kv2};

use super::backend::{SecretBackend, SecretBackendType};
use crate::secrets::error::{Result, SecretsError};
use crate::secrets::types::{SecretMap, SecretString};

/// KV secrets engine version behind the mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultEngine {
    #[default]
    Kv2,
    Kv1,
}

impl VaultEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kv2 => "kv2",
            Self::Kv1 => "kv1",
        }
    }
}

impl FromStr for VaultEngine {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kv2" | "v2" => Ok(Self::Kv2),
            "kv1" | "v1" | "kv" => Ok(Self::Kv1),
            other => Err(SecretsError::config_error(format!("Invalid Vault engine '{}'", other))),
        }
    }
}

impl fmt::Display for VaultEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_kv_mount() -> String {
    "secret".to_string()
}

/// Configuration for the Vault backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultBackendConfig {
    /// Vault server address
    pub address: String,
    /// Vault authentication token
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Vault namespace (for Enterprise)
    pub namespace: Option<String>,
    /// KV mount path (default: "secret")
    #[serde(default = "default_kv_mount")]
    pub mount: String,
    #[serde(default)]
    pub engine: VaultEngine,
}

impl VaultBackendConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: None,
            namespace: None,
            mount: default_kv_mount(),
            engine: VaultEngine::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Uses:
    /// - `SECRETARY_VAULT_ADDR` or `VAULT_ADDR`
    /// - `SECRETARY_VAULT_TOKEN` or `VAULT_TOKEN`
    /// - `SECRETARY_VAULT_NAMESPACE` or `VAULT_NAMESPACE`
    /// - `SECRETARY_VAULT_MOUNT` (default: "secret")
    /// - `SECRETARY_VAULT_ENGINE` (default: "kv2")
    ///
    /// Returns `Ok(None)` when no address is set.
    pub fn from_env() -> Result<Option<Self>> {
        let address =
            std::env::var("SECRETARY_VAULT_ADDR").or_else(|_| std::env::var("VAULT_ADDR")).ok();

        let Some(address) = address else {
            return Ok(None);
        };

        let token =
            std::env::var("SECRETARY_VAULT_TOKEN").or_else(|_| std::env::var("VAULT_TOKEN")).ok();

        let namespace = std::env::var("SECRETARY_VAULT_NAMESPACE")
            .or_else(|_| std::env::var("VAULT_NAMESPACE"))
            .ok();

        let mount = std::env::var("SECRETARY_VAULT_MOUNT").unwrap_or_else(|_| default_kv_mount());

        let engine = match std::env::var("SECRETARY_VAULT_ENGINE") {
            Ok(raw) => raw.parse()?,
            Err(_) => VaultEngine::default(),
        };

        Ok(Some(Self { address, token, namespace, mount, engine }))
    }
}

/// HashiCorp Vault secret backend
pub struct VaultSecretBackend {
    client: VaultClient,
    address: String,
    mount: String,
    engine: VaultEngine,
    write_lock: Mutex<()>,
}

impl fmt::Debug for VaultSecretBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSecretBackend")
            .field("address", &self.address)
            .field("mount", &self.mount)
            .field("engine", &self.engine)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretBackend {
    /// Create a new Vault backend with the given configuration
    pub fn new(config: VaultBackendConfig) -> Result<Self> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token);
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault backend configuration: {}", e))
        })?;

        let client = VaultClient::new(settings)
            .map_err(|e| SecretsError::config_error(format!("Failed to create Vault client: {}", e)))?;

        info!(
            address = %config.address,
            mount = %config.mount,
            engine = %config.engine,
            "Initialized Vault secret backend"
        );

        Ok(Self {
            client,
            address: config.address,
            mount: config.mount,
            engine: config.engine,
            write_lock: Mutex::new(()),
        })
    }

    /// Create backend from environment configuration
    pub fn from_env() -> Result<Option<Self>> {
        match VaultBackendConfig::from_env()? {
            Some(config) => Ok(Some(Self::new(config)?)),
            None => Ok(None),
        }
    }

    pub fn engine(&self) -> VaultEngine {
        self.engine
    }

    /// Read the whole category map. A missing path is an empty category.
    async fn read_category(&self, category: &str) -> Result<HashMap<String, serde_json::Value>> {
        debug!(category = %category, mount = %self.mount, engine = %self.engine, "Reading category from Vault");

        let result = match self.engine {
            VaultEngine::Kv2 => kv2::read(&self.client, &self.mount, category).await,
            VaultEngine::Kv1 => kv1::get(&self.client, &self.mount, category).await,
        };

        match result {
            Ok(data) => Ok(data),
            Err(e) if is_missing(&e) => {
                debug!(category = %category, "Category path not present in Vault");
                Ok(HashMap::new())
            }
            Err(e) => {
                error!(category = %category, error = %e, "Failed to read secrets from Vault");
                Err(SecretsError::backend_unavailable(self.id(), e.to_string()))
            }
        }
    }
}

fn is_missing(error: &ClientError) -> bool {
    matches!(error, ClientError::APIError { code: 404, .. })
}

/// Vault values are arbitrary JSON; strings are returned verbatim.
fn value_to_secret(value: serde_json::Value) -> SecretString {
    match value {
        serde_json::Value::String(s) => SecretString::new(s),
        other => SecretString::new(other.to_string()),
    }
}

#[async_trait]
impl SecretBackend for VaultSecretBackend {
    async fn lookup(&self, name: &str, category: &str) -> Result<Option<SecretString>> {
        let mut data = self.read_category(category).await?;
        Ok(data.remove(name).map(value_to_secret))
    }

    async fn lookup_all(&self, category: &str) -> Result<SecretMap> {
        let data = self.read_category(category).await?;
        Ok(data.into_iter().map(|(name, value)| (name, value_to_secret(value))).collect())
    }

    async fn store(&self, secrets: &SecretMap, category: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        // Vault replaces the whole secret, so merge into what is there.
        let mut data: HashMap<String, String> = self
            .read_category(category)
            .await?
            .into_iter()
            .map(|(name, value)| (name, value_to_secret(value).expose_secret().to_string()))
            .collect();
        for (name, value) in secrets {
            data.insert(name.clone(), value.expose_secret().to_string());
        }

        let result = match self.engine {
            VaultEngine::Kv2 => {
                kv2::set(&self.client, &self.mount, category, &data).await.map(|_| ())
            }
            VaultEngine::Kv1 => {
                let borrowed: HashMap<&str, &str> =
                    data.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                kv1::set(&self.client, &self.mount, category, &borrowed).await
            }
        };

        result.map_err(|e| {
            error!(category = %category, error = %e, "Failed to write secrets to Vault");
            SecretsError::backend_unavailable(self.id(), e.to_string())
        })?;

        info!(category = %category, mount = %self.mount, count = secrets.len(), "Stored secrets in Vault");
        Ok(())
    }

    fn backend_type(&self) -> SecretBackendType {
        SecretBackendType::Vault
    }

    fn is_writable(&self) -> bool {
        true
    }
}
