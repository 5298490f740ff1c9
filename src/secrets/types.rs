//! Value types shared by the resolver and its backends.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Category used when a caller does not name one.
pub const DEFAULT_ROOT_CATEGORY: &str = "root";

/// Resolved secrets of one category, ordered by name.
pub type SecretMap = BTreeMap<String, SecretString>;

/// A resolved secret value.
///
/// `Debug`, `Display` and `Serialize` all print `[REDACTED]`; the value is only
/// reachable through [`SecretString::expose_secret`]. The buffer is zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the underlying value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifies a secret by name within a category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKey {
    pub name: String,
    pub category: String,
}

impl SecretKey {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self { name: name.into(), category: category.into() }
    }

    /// Key in the root category.
    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_ROOT_CATEGORY)
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

/// Build a [`SecretMap`] from plain name/value pairs.
pub fn secret_map<I, K, V>(pairs: I) -> SecretMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<SecretString>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Expose every value of a map, for output surfaces that must print them.
pub fn expose_map(secrets: &SecretMap) -> BTreeMap<&str, &str> {
    secrets.iter().map(|(name, value)| (name.as_str(), value.expose_secret())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_redacts_debug_and_display() {
        let secret = SecretString::new("super-secret-value");
        assert_eq!(format!("{:?}", secret), "SecretString([REDACTED])");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose_secret(), "super-secret-value");
    }

    #[test]
    fn test_secret_map_serialization_redacts() {
        let map = secret_map([("db_password", "hunter2")]);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"db_password":"[REDACTED]"}"#);
    }

    #[test]
    fn test_secret_string_deserialization_accepts_values() {
        let secret: SecretString = serde_json::from_str("\"plain\"").unwrap();
        assert_eq!(secret.expose_secret(), "plain");
    }

    #[test]
    fn test_expose_map() {
        let map = secret_map([("b", "2"), ("a", "1")]);
        let exposed = expose_map(&map);
        assert_eq!(exposed.into_iter().collect::<Vec<_>>(), vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn test_secret_key_display() {
        assert_eq!(SecretKey::new("pw", "prod/data").to_string(), "prod/data/pw");
        assert_eq!(SecretKey::root("token").category, "root");
    }
}
