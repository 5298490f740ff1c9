//! # Secretary
//!
//! Secretary resolves named secrets, grouped into categories, from pluggable
//! backends: a local CSV file, process environment variables, and HashiCorp
//! Vault. Application code asks for `(name, category)` and never needs to know
//! where the value lives.
//!
//! ## Architecture
//!
//! ```text
//! CLI / caller → SecretResolver → CategoryRewriter → OverrideLayer → SecretCache → backends
//!                      ↓
//!              SecretsConfig (SECRETARY_* env, .env)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use secretary::{Result, SecretResolver, SecretsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let resolver = SecretResolver::from_config(&SecretsConfig::from_env()?)?;
//!     let password = resolver.get_secret("example_pw", Some("prod/data")).await?;
//!     assert!(!password.is_empty());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod observability;
pub mod secrets;

// Re-export commonly used types and traits
pub use config::{ObservabilityConfig, SecretsConfig};
pub use secrets::{
    MergePolicy, Result, SecretBackend, SecretBackendType, SecretMap, SecretResolver,
    SecretString, SecretsError,
};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "secretary");
    }
}
