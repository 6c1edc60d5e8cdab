//! Filesystem change events observed on the shared directory
//!
//! The watcher reduces raw platform notifications to these four kinds; the
//! aggregator only cares whether a kind is significant enough to schedule a
//! gadget reconnect.

use std::path::PathBuf;

/// What happened to an entry under the watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new file or directory appeared.
    Created,
    /// File content or metadata changed.
    Modified,
    /// A file or directory was removed.
    Deleted,
    /// A file or directory was renamed or moved.
    Moved,
}

impl ChangeKind {
    /// Whether this kind of change marks the share as needing a reconnect.
    ///
    /// Creation alone is not significant: a brand-new entry only schedules a
    /// reconnect once a later modify/move/delete fires for it. Deletions,
    /// modifications and moves always qualify.
    pub fn is_significant(self) -> bool {
        match self {
            ChangeKind::Created => false,
            ChangeKind::Modified | ChangeKind::Deleted | ChangeKind::Moved => true,
        }
    }
}

/// A single change notification for one path under the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}
