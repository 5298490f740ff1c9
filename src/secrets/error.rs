//! Error types for secret resolution.

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while resolving or storing secrets.
///
/// Messages never include secret values.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// No override, cache entry or backend produced a value.
    #[error("Secret not found: '{name}' in category '{category}'")]
    NotFound { name: String, category: String },

    /// A store was attempted against a read-only backend.
    #[error("Backend '{backend}' is read-only and cannot store secrets")]
    NotWritable { backend: String },

    /// The backend could not be reached or returned unusable data.
    #[error("Backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The category rewrite pattern does not compile.
    #[error("Invalid category pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SecretsError {
    /// Create a not found error.
    pub fn not_found(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self::NotFound { name: name.into(), category: category.into() }
    }

    /// Create a not writable error.
    pub fn not_writable(backend: impl Into<String>) -> Self {
        Self::NotWritable { backend: backend.into() }
    }

    /// Create a backend unavailable error.
    pub fn backend_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable { backend: backend.into(), message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// True for [`SecretsError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_constructors() {
        let err = SecretsError::not_found("db_password", "prod/data");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Secret not found: 'db_password' in category 'prod/data'");

        let err = SecretsError::not_writable("env");
        assert!(matches!(err, SecretsError::NotWritable { .. }));
        assert!(!err.is_not_found());

        let err = SecretsError::backend_unavailable("vault", "connection refused");
        assert!(matches!(err, SecretsError::BackendUnavailable { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = SecretsError::backend_unavailable("file", "permission denied");
        assert!(err.to_string().contains("file"));
        assert!(err.to_string().contains("permission denied"));

        let err = SecretsError::not_writable("env");
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_invalid_pattern_conversion() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        let err: SecretsError = regex_err.into();
        assert!(matches!(err, SecretsError::InvalidPattern(_)));
    }
}
