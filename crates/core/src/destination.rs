//! Scan destinations and their human-readable labels

use std::collections::HashMap;
use std::fmt;

/// Marker string used for the full-scan sentinel in logs
pub const FULL_SCAN_MARKER: &str = "full_scan";

/// Where a rescan is directed
///
/// Destinations compare by identity only. The one ordering rule that exists is
/// that [`Destination::FullScan`] covers every library.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A concrete media library, identified by its server-side id
    Library(String),
    /// Rescan every library
    FullScan,
}

impl Destination {
    /// Creates a library destination
    pub fn library(id: impl Into<String>) -> Self {
        Self::Library(id.into())
    }

    /// Returns the library id, or `None` for the full-scan sentinel
    pub fn library_id(&self) -> Option<&str> {
        match self {
            Self::Library(id) => Some(id),
            Self::FullScan => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library(id) => write!(f, "{id}"),
            Self::FullScan => write!(f, "{FULL_SCAN_MARKER}"),
        }
    }
}

/// Display names for library ids
#[derive(Debug, Clone, Default)]
pub struct LibraryLabels {
    names: HashMap<String, String>,
}

impl LibraryLabels {
    /// Create labels from an id -> name map
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Name for a library id, falling back to `unknown(<id>)`
    pub fn name(&self, library_id: &str) -> String {
        self.names
            .get(library_id)
            .cloned()
            .unwrap_or_else(|| format!("unknown({library_id})"))
    }

    /// Name for any destination
    pub fn label(&self, destination: &Destination) -> String {
        match destination {
            Destination::Library(id) => self.name(id),
            Destination::FullScan => "all libraries".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_identity() {
        assert_eq!(Destination::library("1"), Destination::Library("1".into()));
        assert_ne!(Destination::library("1"), Destination::FullScan);
        assert_eq!(Destination::library("7").library_id(), Some("7"));
        assert_eq!(Destination::FullScan.library_id(), None);
        assert_eq!(Destination::FullScan.to_string(), FULL_SCAN_MARKER);
    }

    #[test]
    fn test_labels_fall_back_for_unknown_ids() {
        let labels = LibraryLabels::new(HashMap::from([("1".to_string(), "Movies".to_string())]));
        assert_eq!(labels.name("1"), "Movies");
        assert_eq!(labels.name("42"), "unknown(42)");
        assert_eq!(labels.label(&Destination::FullScan), "all libraries");
    }
}
