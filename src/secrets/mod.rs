//! Secret resolution.
//!
//! A [`SecretResolver`] turns `(name, category)` into a value:
//!
//! ```text
//! category ─▶ CategoryRewriter ─▶ OverrideLayer ─▶ SecretCache ─▶ backends (file, env, vault)
//!                                     │ hit             │ hit          │
//!                                     ▼                 ▼              ▼ merge + cache fill
//!                                   value             value          value | NotFound
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use secretary::config::SecretsConfig;
//! use secretary::secrets::SecretResolver;
//!
//! let resolver = SecretResolver::from_config(&SecretsConfig::from_env()?)?;
//!
//! // Root category
//! let token = resolver.get_secret("api_token", None).await?;
//!
//! // Whole category, e.g. for a database connection
//! let db = resolver.get_secret_dict(Some("prod/data")).await?;
//!
//! // Redirect prod lookups to test without code changes:
//! //   SECRETARY_CATEGORY_REGEXP='^prod/' SECRETARY_CATEGORY_REPLACE='test/'
//! ```
//!
//! # Security Considerations
//!
//! - Values are wrapped in [`SecretString`] and never logged
//! - The cache has no TTL; call [`SecretResolver::forget_secrets`] after rotation

pub mod backends;
pub mod cache;
pub mod error;
pub mod overrides;
pub mod resolver;
pub mod rewrite;
pub mod types;

pub use backends::{
    EnvSecretBackend, FileSecretBackend, SecretBackend, SecretBackendType, VaultBackendConfig,
    VaultEngine, VaultSecretBackend,
};
pub use cache::{CacheKey, SecretCache};
pub use error::{Result, SecretsError};
pub use overrides::OverrideLayer;
pub use resolver::{MergePolicy, ResolverOptions, SecretResolver};
pub use rewrite::{CategoryRewriter, RewriteRule};
pub use types::{secret_map, SecretKey, SecretMap, SecretString};

/// Serialises unit tests that mutate the process environment.
#[cfg(test)]
pub(crate) fn test_env_lock() -> std::sync::MutexGuard<'static, ()> {
    static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
