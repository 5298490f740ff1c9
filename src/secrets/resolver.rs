//! Secret resolver
//!
//! Resolution order for every request:
//!
//! 1. rewrite the category ([`CategoryRewriter`])
//! 2. override variable ([`OverrideLayer`]), re-read on every call
//! 3. cache ([`SecretCache`])
//! 4. configured backends, merged per [`MergePolicy`], then cache fill
//!
//! Backend errors abort the request and are never cached. Absence is never
//! cached either, so a secret added to a backend later is picked up on the
//! next miss.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::backends::{build_backends, SecretBackend};
use super::cache::{CacheKey, SecretCache};
use super::error::{Result, SecretsError};
use super::overrides::OverrideLayer;
use super::rewrite::CategoryRewriter;
use super::types::{SecretMap, SecretString, DEFAULT_ROOT_CATEGORY};
use crate::config::SecretsConfig;

/// How results from several backends are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Every backend is queried; later backends override earlier ones.
    #[default]
    LastWins,
    /// Backends are queried in order; the first value found wins.
    FirstMatch,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastWins => "last_wins",
            Self::FirstMatch => "first_match",
        }
    }
}

impl FromStr for MergePolicy {
    type Err = SecretsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "last_wins" | "merge" => Ok(Self::LastWins),
            "first_match" | "first" => Ok(Self::FirstMatch),
            other => Err(SecretsError::config_error(format!("Invalid merge policy '{}'", other))),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the resolver needs besides its backends.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub root_category: String,
    pub rewriter: CategoryRewriter,
    pub overrides: OverrideLayer,
    pub merge_policy: MergePolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            root_category: DEFAULT_ROOT_CATEGORY.to_string(),
            rewriter: CategoryRewriter::identity(),
            overrides: OverrideLayer::default(),
            merge_policy: MergePolicy::default(),
        }
    }
}

impl ResolverOptions {
    pub fn with_rewriter(mut self, rewriter: CategoryRewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn with_overrides(mut self, overrides: OverrideLayer) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_merge_policy(mut self, merge_policy: MergePolicy) -> Self {
        self.merge_policy = merge_policy;
        self
    }

    pub fn with_root_category(mut self, root_category: impl Into<String>) -> Self {
        self.root_category = root_category.into();
        self
    }
}

/// Resolves secrets against an ordered list of backends.
///
/// Owns its cache; construct one per process (or per test) and share it
/// behind an `Arc`.
pub struct SecretResolver {
    backends: Vec<Arc<dyn SecretBackend>>,
    source_id: String,
    cache: SecretCache,
    options: ResolverOptions,
}

impl fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResolver")
            .field("backends", &self.backends)
            .field("source_id", &self.source_id)
            .field("merge_policy", &self.options.merge_policy)
            .field("root_category", &self.options.root_category)
            .finish()
    }
}

impl SecretResolver {
    /// Create a resolver. `backends` is in precedence order per the merge policy
    /// and must not be empty.
    pub fn new(backends: Vec<Arc<dyn SecretBackend>>, options: ResolverOptions) -> Result<Self> {
        if backends.is_empty() {
            return Err(SecretsError::config_error("At least one secret backend is required"));
        }

        let source_id = backends.iter().map(|b| b.id()).collect::<Vec<_>>().join("+");
        info!(
            source = %source_id,
            merge_policy = %options.merge_policy,
            root_category = %options.root_category,
            rewrite = ?options.rewriter.rule().map(|r| r.pattern().to_string()),
            "Created secret resolver"
        );

        Ok(Self { backends, source_id, cache: SecretCache::new(), options })
    }

    /// Build backends and options from validated configuration.
    pub fn from_config(config: &SecretsConfig) -> Result<Self> {
        config.validate()?;

        let rewriter = CategoryRewriter::from_parts(
            config.category_regexp.as_deref(),
            config.category_replace.as_deref(),
        )?;
        let overrides =
            OverrideLayer::new(config.env_prefix.clone()).with_enabled(config.allow_overrides);
        let options = ResolverOptions {
            root_category: config.root_category.clone(),
            rewriter,
            overrides,
            merge_policy: config.merge_policy,
        };

        Self::new(build_backends(config)?, options)
    }

    /// Identifier of the configured backend set, used in cache keys.
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn root_category(&self) -> &str {
        &self.options.root_category
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.options.merge_policy
    }

    pub fn backends(&self) -> &[Arc<dyn SecretBackend>] {
        &self.backends
    }

    pub fn cache(&self) -> &SecretCache {
        &self.cache
    }

    /// Requested category after defaulting and rewriting.
    pub fn effective_category(&self, category: Option<&str>) -> String {
        self.options.rewriter.rewrite(category.unwrap_or(&self.options.root_category))
    }

    /// Resolve one secret. `None` selects the root category.
    pub async fn get_secret(&self, name: &str, category: Option<&str>) -> Result<SecretString> {
        let category = self.effective_category(category);

        if let Some(value) = self.options.overrides.check(name, &category) {
            return Ok(value);
        }

        let key = CacheKey::new(&self.source_id, name, &category);
        if let Some(value) = self.cache.get(&key).await {
            return Ok(value);
        }

        debug!(name = %name, category = %category, source = %self.source_id, "Secret cache miss");
        match self.lookup_backends(name, &category).await? {
            Some(value) => {
                self.cache.put(&key, value.clone()).await;
                Ok(value)
            }
            None => Err(SecretsError::not_found(name, category)),
        }
    }

    /// Resolve every secret of a category. `None` selects the root category.
    ///
    /// Override variables replace backend values for names the backends report.
    pub async fn get_secret_dict(&self, category: Option<&str>) -> Result<SecretMap> {
        let category = self.effective_category(category);

        let mut secrets = match self.cache.get_all(&self.source_id, &category).await {
            Some(cached) => cached,
            None => {
                let loaded = self.lookup_all_backends(&category).await?;
                self.cache.put_all(&self.source_id, &category, &loaded).await;
                loaded
            }
        };

        for (name, value) in secrets.iter_mut() {
            if let Some(overridden) = self.options.overrides.check(name, &category) {
                *value = overridden;
            }
        }

        Ok(secrets)
    }

    /// Write secrets to the highest-precedence backend and refresh the cache.
    pub async fn store_secrets(&self, secrets: &SecretMap, category: Option<&str>) -> Result<()> {
        let category = self.effective_category(category);
        let target = self.write_target();

        if !target.is_writable() {
            warn!(backend = %target.id(), category = %category, "Store rejected by read-only backend");
            return Err(SecretsError::not_writable(target.id()));
        }

        target.store(secrets, &category).await?;

        for (name, value) in secrets {
            let key = CacheKey::new(&self.source_id, name, &category);
            self.cache.put(&key, value.clone()).await;
        }

        info!(backend = %target.id(), category = %category, count = secrets.len(), "Stored secrets");
        Ok(())
    }

    /// Export a category into the process environment, one variable per name.
    ///
    /// Existing variables are left alone unless `force` is set. Names that are
    /// not valid variable names are skipped. Returns the names that were set.
    pub async fn setup_env_from_secrets(
        &self,
        category: Option<&str>,
        force: bool,
    ) -> Result<Vec<String>> {
        let secrets = self.get_secret_dict(category).await?;
        let mut exported = Vec::new();

        for (name, value) in &secrets {
            if !is_valid_env_name(name) {
                warn!(name = %name, "Skipping secret whose name is not a valid environment variable");
                continue;
            }
            if !force && std::env::var_os(name).is_some() {
                debug!(name = %name, "Environment variable already set; not overwriting");
                continue;
            }
            std::env::set_var(name, value.expose_secret());
            exported.push(name.clone());
        }

        info!(count = exported.len(), "Exported secrets to environment");
        Ok(exported)
    }

    /// Drop every cached secret.
    pub async fn forget_secrets(&self) {
        self.cache.forget_all().await;
    }

    fn write_target(&self) -> &Arc<dyn SecretBackend> {
        // `new` rejects an empty backend list.
        match self.options.merge_policy {
            MergePolicy::LastWins => &self.backends[self.backends.len() - 1],
            MergePolicy::FirstMatch => &self.backends[0],
        }
    }

    async fn lookup_backends(&self, name: &str, category: &str) -> Result<Option<SecretString>> {
        let mut found = None;

        for backend in &self.backends {
            if let Some(value) = backend.lookup(name, category).await? {
                debug!(backend = %backend.id(), name = %name, category = %category, "Backend returned secret");
                found = Some(value);
                if self.options.merge_policy == MergePolicy::FirstMatch {
                    break;
                }
            }
        }

        Ok(found)
    }

    /// Merge every backend's listing so each name carries the value
    /// `get_secret` would return for it.
    ///
    /// A backend that reports names under a normalised key (see
    /// [`SecretBackend::listing_key`]) does not add a second entry for a name
    /// another backend already reports; it answers for that name instead.
    async fn lookup_all_backends(&self, category: &str) -> Result<SecretMap> {
        let mut listings = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            let secrets = backend.lookup_all(category).await?;
            debug!(backend = %backend.id(), category = %category, count = secrets.len(), "Backend returned category");
            listings.push(secrets);
        }

        let mut names: BTreeSet<String> = BTreeSet::new();
        for (index, listing) in listings.iter().enumerate() {
            for reported in listing.keys() {
                let covered = listings.iter().enumerate().any(|(other, other_listing)| {
                    other != index
                        && other_listing.keys().any(|name| {
                            name != reported && self.backends[index].listing_key(name) == *reported
                        })
                });
                if !covered {
                    names.insert(reported.clone());
                }
            }
        }

        let mut merged = SecretMap::new();
        for name in names {
            let mut answers = self
                .backends
                .iter()
                .zip(&listings)
                .filter_map(|(backend, listing)| listing.get(&backend.listing_key(&name)));

            let value = match self.options.merge_policy {
                MergePolicy::LastWins => answers.last(),
                MergePolicy::FirstMatch => answers.next(),
            };
            if let Some(value) = value {
                merged.insert(name, value.clone());
            }
        }

        Ok(merged)
    }
}

fn is_valid_env_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}
