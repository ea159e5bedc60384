//! Exclusion rules
//!
//! Requests whose normalized path matches a pattern are served untouched
//! and bypass the cache. Patterns use glob syntax; `*` does not cross `/`.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled exclusion patterns
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    glob_set: GlobSet,
    patterns: Vec<String>,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self::empty()
    }
}

impl ExcludeRules {
    /// Rules excluding nothing
    #[must_use]
    pub fn empty() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Compile `patterns`
    ///
    /// # Errors
    /// Returns error for the first pattern that is not a valid glob
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
        }

        let glob_set = builder.build().map_err(|source| ConfigError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;

        Ok(Self {
            glob_set,
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        })
    }

    /// Whether `request_path` is excluded
    ///
    /// The path is normalized first, see [`normalize`].
    #[must_use]
    pub fn is_match(&self, request_path: &str) -> bool {
        !self.patterns.is_empty() && self.glob_set.is_match(normalize(request_path))
    }

    /// Source patterns
    #[inline]
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

/// Strip leading and trailing separators from a request path
#[must_use]
pub fn normalize(request_path: &str) -> &str {
    request_path.trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize("/vendor/lib.js"), "vendor/lib.js");
        assert_eq!(normalize("//vendor/"), "vendor");
        assert_eq!(normalize("a.js"), "a.js");
    }

    #[test]
    fn empty_rules_exclude_nothing() {
        let rules = ExcludeRules::empty();
        assert!(rules.patterns().is_empty());
        assert!(!rules.is_match("/anything.js"));
    }

    #[test]
    fn double_star_crosses_directories() {
        let rules = ExcludeRules::new(&["vendor/**"]).unwrap();
        assert!(rules.is_match("/vendor/a.js"));
        assert!(rules.is_match("/vendor/deep/b.js"));
        assert!(!rules.is_match("/src/vendor.js"));
    }

    #[test]
    fn single_star_stays_in_segment() {
        let rules = ExcludeRules::new(&["*.min.js"]).unwrap();
        assert!(rules.is_match("/jquery.min.js"));
        assert!(!rules.is_match("/lib/jquery.min.js"));
    }

    #[test]
    fn any_pattern_matches() {
        let rules = ExcludeRules::new(&["a.js", "lib/*.js"]).unwrap();
        assert!(rules.is_match("/a.js"));
        assert!(rules.is_match("/lib/b.js"));
        assert!(!rules.is_match("/b.js"));
        assert_eq!(rules.patterns().len(), 2);
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let result = ExcludeRules::new(&["a/[b"]);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidPattern { pattern, .. }) if pattern == "a/[b"
        ));
    }
}
