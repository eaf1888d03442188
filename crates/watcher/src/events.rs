//! Change event types
//!
//! Raw filesystem notifications come in as [`RawEvent`]s; every qualifying one
//! is recorded as an immutable [`ChangeEvent`] attributed to a destination.

use mediawatch_core::Destination;
use std::path::{Path, PathBuf};

/// Kind of filesystem change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File was created
    Created,
    /// File was deleted
    Deleted,
    /// Source side of a move/rename
    MovedFrom,
    /// Destination side of a move/rename
    MovedTo,
}

impl ChangeKind {
    /// All kinds, in the order they are reported
    pub const ALL: [ChangeKind; 4] = [
        ChangeKind::Created,
        ChangeKind::Deleted,
        ChangeKind::MovedFrom,
        ChangeKind::MovedTo,
    ];

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Deleted => "Deleted",
            Self::MovedFrom => "Moved (source)",
            Self::MovedTo => "Moved (target)",
        }
    }

    /// Icon used in chat messages
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Created => "🟢",
            Self::Deleted => "🔴",
            Self::MovedFrom => "🟡",
            Self::MovedTo => "🔵",
        }
    }
}

/// A recorded change
///
/// `destination` is `None` for changes that never trigger a rescan (deletions).
/// A path outside every watch root carries [`Destination::FullScan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub destination: Option<Destination>,
}

impl ChangeEvent {
    /// Create a change that requests a rescan of `destination`
    pub fn scanned(path: impl Into<PathBuf>, kind: ChangeKind, destination: Destination) -> Self {
        Self {
            path: path.into(),
            kind,
            destination: Some(destination),
        }
    }

    /// Create a change that is recorded but never rescanned
    pub fn unscanned(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            destination: None,
        }
    }

    /// Final path component, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// A filesystem notification as delivered by the watch source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl RawEvent {
    /// Notification for a regular file
    pub fn file(kind: ChangeKind, path: impl AsRef<Path>) -> Self {
        Self {
            kind,
            path: path.as_ref().to_path_buf(),
            is_directory: false,
        }
    }

    /// Notification for a directory
    pub fn directory(kind: ChangeKind, path: impl AsRef<Path>) -> Self {
        Self {
            kind,
            path: path.as_ref().to_path_buf(),
            is_directory: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_of_change() {
        let event = ChangeEvent::scanned(
            "/media/movies/Heat (1995).mkv",
            ChangeKind::Created,
            Destination::library("M"),
        );
        assert_eq!(event.file_name(), "Heat (1995).mkv");
    }

    #[test]
    fn test_unscanned_has_no_destination() {
        let event = ChangeEvent::unscanned("/media/movies/a.mkv", ChangeKind::Deleted);
        assert!(event.destination.is_none());
    }
}
