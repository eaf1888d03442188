//! Ignore pattern matching
//!
//! NAS appliances write thumbnails and recycle-bin copies inside the watched
//! trees; those paths are matched against glob patterns and dropped before
//! classification.

use glob::{Pattern, PatternError};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

/// Glob-based path filter
///
/// By default, ignores nothing.
#[derive(Clone, Default)]
pub struct IgnoreFilter {
    patterns: Arc<Vec<Pattern>>,
}

impl IgnoreFilter {
    /// Create a filter that ignores nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter from glob patterns
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let compiled = patterns
            .iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns: Arc::new(compiled),
        })
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        let ignored = self.patterns.iter().any(|p| p.matches(&path_str));
        if ignored {
            trace!("Path {path:?} matches ignore pattern");
        }
        ignored
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl std::fmt::Debug for IgnoreFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IgnoreFilter")
            .field(
                "patterns",
                &self.patterns.iter().map(Pattern::as_str).collect::<Vec<_>>(),
            )
            .finish()
    }
}
