//! Category rewriting.
//!
//! A single optional regular expression is matched against every requested
//! category before any other step of resolution. The first match is replaced,
//! which lets code written against `prod/...` categories read `test/...`
//! secrets by setting two environment variables.

use regex::Regex;
use tracing::debug;

use super::error::Result;

/// A compiled pattern and its replacement.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    /// Compile a rule. Capture references such as `$1` in `replacement` are expanded.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self> {
        Ok(Self { pattern: Regex::new(pattern)?, replacement: replacement.into() })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Applies the configured [`RewriteRule`], if any.
#[derive(Debug, Clone, Default)]
pub struct CategoryRewriter {
    rule: Option<RewriteRule>,
}

impl CategoryRewriter {
    /// A rewriter that returns every category unchanged.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(rule: Option<RewriteRule>) -> Self {
        // An empty pattern matches everywhere; treat it as "no rule".
        let rule = rule.filter(|r| !r.pattern().is_empty());
        Self { rule }
    }

    /// Build from optional raw settings. A pattern without a replacement
    /// rewrites to the empty string.
    pub fn from_parts(pattern: Option<&str>, replacement: Option<&str>) -> Result<Self> {
        match pattern {
            Some(p) if !p.is_empty() => {
                Ok(Self::new(Some(RewriteRule::new(p, replacement.unwrap_or_default())?)))
            }
            _ => Ok(Self::identity()),
        }
    }

    pub fn rule(&self) -> Option<&RewriteRule> {
        self.rule.as_ref()
    }

    pub fn rewrite(&self, category: &str) -> String {
        let Some(rule) = &self.rule else {
            return category.to_string();
        };

        let rewritten = rule.pattern.replace(category, rule.replacement.as_str());
        if rewritten != category {
            debug!(from = %category, to = %rewritten, "Rewrote secret category");
        }
        rewritten.into_owned()
    }
}
