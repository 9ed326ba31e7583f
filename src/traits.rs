use std::path::Path;
use std::time::SystemTime;

use crate::compare::Event;
use crate::entry::Entry;
use crate::error::TreesyncError;

/// Filesystem primitives the comparator and the dispatcher are built on.
///
/// Implement this to diff or sync anything that looks like a tree of
/// directories. [`LocalFs`](crate::LocalFs) is the implementation over the
/// local filesystem.
///
/// Every call is synchronous and blocking. Recursion is never delegated to the
/// provider: the dispatcher walks subtrees itself so every step is traced and
/// dummy mode can suppress each one individually.
///
/// # Error Handling
///
/// Entries that vanish between listing and stat are not errors. Yield them as
/// [`Entry::vanished`] from [`list_dir`](FileSystem::list_dir). Anything else
/// that goes wrong is returned as `Err` and aborts the run.
pub trait FileSystem {
    /// List the children of `dir`, fully stat'ed, in no particular order.
    ///
    /// With `follow_symlinks`, symlink entries carry their target's kind,
    /// size, mtime and device numbers.
    fn list_dir(&self, dir: &Path, follow_symlinks: bool) -> Result<Vec<Entry>, TreesyncError>;

    /// Stat a single path. `Ok(None)` if nothing exists there.
    fn stat(&self, path: &Path, follow_symlinks: bool) -> Result<Option<Entry>, TreesyncError>;

    /// Read the full content of a regular file.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, TreesyncError>;

    /// Create `dir` and any missing parents.
    fn create_dir_all(&self, dir: &Path) -> Result<(), TreesyncError>;

    /// Copy a single non-directory entry to `dst`.
    fn copy(&self, src: &Entry, dst: &Path, options: CopyOptions) -> Result<(), TreesyncError>;

    /// Remove a single entry. Directories must already be empty.
    fn remove(&self, path: &Path) -> Result<(), TreesyncError>;

    /// Set the modification time of `path`.
    fn set_mtime(&self, path: &Path, mtime: SystemTime) -> Result<(), TreesyncError>;
}

/// How [`FileSystem::copy`] treats symlinks and existing destinations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Replace an existing regular file at the destination.
    pub overwrite: bool,

    /// Copy what a symlink points at instead of recreating the link.
    pub follow_symlinks: bool,
}

/// Reacts to the classification events of a tree comparison.
///
/// [`Dispatcher`](crate::Dispatcher) is the implementation that prints diffs
/// and applies copies/deletes. Tests and embedders can implement it to collect
/// events instead.
pub trait Handler {
    /// Called once per event, in traversal order.
    ///
    /// Returning `Err` aborts the comparison.
    fn on_event(&mut self, event: Event<'_>) -> Result<(), TreesyncError>;
}
