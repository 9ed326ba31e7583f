//! # treesync
//!
//! Diff two directory trees and, optionally, make the second one look like
//! the first.
//!
//! treesync is built for links where timestamps lie and every read is
//! expensive. It never assumes mtimes are trustworthy unless told to, compares
//! sizes before it reads a single byte, and can skip content entirely.
//!
//! Two trees are walked side by side in filename order. Every name ends up as
//! exactly one classification (source-only, destination-only, match,
//! mismatch, type mismatch or ignored) and the configured modes decide what
//! happens to it:
//!
//! | mode     | source-only | destination-only | mismatch / type mismatch |
//! |----------|-------------|------------------|--------------------------|
//! | `diff`   | `+ ...`     | `- ...`          | `Diff: ...` / `Type mismatch: ...` |
//! | `new`    | copy        |                  |                          |
//! | `delete` |             | remove           |                          |
//! | `update` | copy        |                  | copy if SRC is newer     |
//!
//! SRCDIR is never modified.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use treesync::Preset;
//!
//! // Print what differs.
//! let summary = treesync::sync()
//!     .source("photos")
//!     .destination("/mnt/backup/photos")
//!     .run()
//!     .unwrap();
//! println!("{} differences", summary.differences());
//!
//! // Make the backup match, comparing names and sizes only.
//! treesync::sync()
//!     .source("photos")
//!     .destination("/mnt/backup/photos")
//!     .preset(Preset::SyncFast)
//!     .verbose(1)
//!     .run()
//!     .unwrap();
//! ```
//!
//! # Custom Filesystems and Handlers
//!
//! Implement [`FileSystem`] to diff or sync something other than the local
//! disk, and pass it to [`SyncBuilder::run_with`]. Implement [`Handler`] and
//! drive a [`TreeDiff`] directly to consume classification events yourself:
//!
//! ```rust,no_run
//! use treesync::{Config, Event, Handler, LocalFs, TreeDiff, TreesyncError};
//!
//! struct CountSrcOnly(usize);
//!
//! impl Handler for CountSrcOnly {
//!     fn on_event(&mut self, event: Event<'_>) -> Result<(), TreesyncError> {
//!         if let Event::SrcOnly { .. } = event {
//!             self.0 += 1;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let config = Config::new("a", "b");
//! let mut counter = CountSrcOnly(0);
//! let equal = TreeDiff::new(&config, &LocalFs).process(&mut counter).unwrap();
//! ```

#![forbid(unsafe_code)]

mod builder;
mod compare;
mod config;
mod dispatch;
mod engine;
mod entry;
mod error;
mod fs;
mod names;
mod report;
mod results;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::SyncBuilder;
pub use compare::{Event, TreeDiff};
pub use config::{Config, Modes, Preset};
pub use dispatch::Dispatcher;
pub use entry::{classify, DeviceId, Entry, EntryKind};
pub use error::TreesyncError;
pub use fs::LocalFs;
pub use names::{is_fork, name_key, FORK_PREFIX};
pub use report::{Diagnostics, MemorySink, Sink, StdoutSink, SyncStats};
pub use results::Summary;
pub use traits::{CopyOptions, FileSystem, Handler};

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`SyncBuilder`] to configure and run a diff or sync.
///
/// # Example
///
/// ```rust
/// use treesync::MemorySink;
///
/// let src = tempfile::tempdir().unwrap();
/// let dst = tempfile::tempdir().unwrap();
/// std::fs::write(src.path().join("a.txt"), "hello").unwrap();
///
/// let mut out = MemorySink::default();
/// let summary = treesync::sync()
///     .source(src.path())
///     .destination(dst.path())
///     .run_with(&treesync::LocalFs, &mut out)
///     .unwrap();
///
/// assert!(!summary.equal);
/// assert_eq!(out.lines, vec![format!("+ file {}", src.path().join("a.txt").display())]);
/// ```
pub fn sync() -> SyncBuilder {
    SyncBuilder::default()
}
