//! Pluggable secret backends
//!
//! ## Supported Backends
//!
//! - **File**: local CSV file (`category,name,value,notes`), writable
//! - **Env**: `<PREFIX>_<CATEGORY>_<NAME>` environment variables, read-only
//! - **Vault**: HashiCorp Vault KV v1/v2, one path per category, writable

pub mod backend;
pub mod env;
pub mod file;
pub mod vault;

pub use backend::{SecretBackend, SecretBackendType};
pub use env::EnvSecretBackend;
pub use file::FileSecretBackend;
pub use vault::{VaultBackendConfig, VaultEngine, VaultSecretBackend};

use std::sync::Arc;
use tracing::info;

use crate::config::SecretsConfig;
use crate::secrets::error::{Result, SecretsError};

/// Instantiate the backend for one configured mode.
pub fn build_backend(
    backend_type: SecretBackendType,
    config: &SecretsConfig,
) -> Result<Arc<dyn SecretBackend>> {
    let backend: Arc<dyn SecretBackend> = match backend_type {
        SecretBackendType::File => Arc::new(FileSecretBackend::new(config.file.path.clone())),
        SecretBackendType::Env => Arc::new(EnvSecretBackend::new(&config.env_prefix)?),
        SecretBackendType::Vault => {
            let vault = config.vault.clone().ok_or_else(|| {
                SecretsError::config_error(
                    "Vault mode selected but no Vault address configured (SECRETARY_VAULT_ADDR)",
                )
            })?;
            Arc::new(VaultSecretBackend::new(vault)?)
        }
    };

    info!(backend_type = %backend_type, "Registered secret backend");
    Ok(backend)
}

/// Instantiate every configured backend, in configured order.
pub fn build_backends(config: &SecretsConfig) -> Result<Vec<Arc<dyn SecretBackend>>> {
    config.modes.iter().map(|mode| build_backend(*mode, config)).collect()
}
