//! Path classification
//!
//! Maps a filesystem path to the library that owns it, and decides whether
//! the path is a monitored media file at all.

use mediawatch_core::config::Config;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A configured directory tree and the library it feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRoot {
    pub path: PathBuf,
    pub library_id: String,
}

impl WatchRoot {
    pub fn new(path: impl Into<PathBuf>, library_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            library_id: library_id.into(),
        }
    }

    fn depth(&self) -> usize {
        self.path.components().count()
    }
}

/// Result of classifying one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_media_file: bool,
    /// Library of the most specific enclosing root, if any
    pub library_id: Option<String>,
}

/// Pure function of the configured roots and extensions
#[derive(Debug, Clone)]
pub struct PathClassifier {
    roots: Vec<WatchRoot>,
    extensions: HashSet<String>,
}

impl PathClassifier {
    /// Create a classifier; extensions are matched case-insensitively and may
    /// be given with or without a leading dot
    pub fn new<S: AsRef<str>>(roots: Vec<WatchRoot>, extensions: &[S]) -> Self {
        let extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self { roots, extensions }
    }

    pub fn from_config(config: &Config) -> Self {
        let roots = config
            .roots
            .iter()
            .map(|r| WatchRoot::new(r.path.clone(), r.library_id.clone()))
            .collect();
        Self::new(roots, &config.monitor.normalized_extensions())
    }

    pub fn classify(&self, path: &Path) -> Classification {
        Classification {
            is_media_file: self.is_media_file(path),
            library_id: self.resolve_library(path).map(str::to_string),
        }
    }

    pub fn is_media_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }

    /// Library of the deepest root containing `path`
    ///
    /// Containment is component-wise, so `/media/movies2/a.mkv` is not under
    /// `/media/movies`. Equal-depth matches keep the first configured root.
    pub fn resolve_library(&self, path: &Path) -> Option<&str> {
        let mut best: Option<&WatchRoot> = None;
        for root in self.roots.iter().filter(|r| path.starts_with(&r.path)) {
            match best {
                Some(current) if root.depth() <= current.depth() => {}
                _ => best = Some(root),
            }
        }
        best.map(|r| r.library_id.as_str())
    }

    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }
}
