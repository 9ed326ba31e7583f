use std::path::PathBuf;

use crate::config::{Config, Modes, Preset};
use crate::engine::run;
use crate::error::TreesyncError;
use crate::fs::LocalFs;
use crate::report::{Sink, StdoutSink};
use crate::results::Summary;
use crate::traits::FileSystem;

// ---------------------------------------------------------------------------
// SyncBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring and executing a diff or sync.
///
/// Created via [`treesync::sync()`](crate::sync). Configure with chained
/// builder methods, then call [`run()`](SyncBuilder::run) to execute.
///
/// # Example
///
/// ```rust,ignore
/// let summary = treesync::sync()
///     .source("photos")
///     .destination("/mnt/backup/photos")
///     .preset(Preset::Sync)
///     .ignore_mtime(true)
///     .run()?;
/// ```
pub struct SyncBuilder {
    source:      Option<PathBuf>,
    destination: Option<PathBuf>,
    config:      Config,
}

impl Default for SyncBuilder {
    fn default() -> Self {
        Self {
            source:      None,
            destination: None,
            config:      Config {
                modes: Modes::default(),
                ..Config::new(PathBuf::new(), PathBuf::new())
            },
        }
    }
}

impl SyncBuilder {
    // ── Trees ─────────────────────────────────────────────────────────────

    /// SRCDIR. Never modified.
    pub fn source(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source = Some(dir.into());
        self
    }

    /// DSTDIR. Only modified by `new`, `delete` and `update`.
    pub fn destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination = Some(dir.into());
        self
    }

    // ── Modes ─────────────────────────────────────────────────────────────

    /// Report differences. The default when no other mode is set.
    pub fn diff(mut self, yes: bool) -> Self {
        self.config.modes.diff = yes;
        self
    }

    /// Copy entries that only exist in SRCDIR into DSTDIR.
    pub fn new_entries(mut self, yes: bool) -> Self {
        self.config.modes.new = yes;
        self
    }

    /// Delete entries that only exist in DSTDIR.
    pub fn delete(mut self, yes: bool) -> Self {
        self.config.modes.delete = yes;
        self
    }

    /// Copy newer, mismatched and type-mismatched entries over DSTDIR.
    /// Implies [`new_entries`](SyncBuilder::new_entries).
    pub fn update(mut self, yes: bool) -> Self {
        self.config.modes.update = yes;
        self
    }

    /// Apply a [`Preset`]. Presets only ever switch flags on.
    pub fn preset(mut self, preset: Preset) -> Self {
        let c = &mut self.config;
        match preset {
            Preset::Sync => {}
            Preset::SyncFast | Preset::DiffFast => {
                c.ignore_forks_src = true;
                c.ignore_content = true;
                c.ignore_mtime = true;
                c.normalize_filenames = true;
            }
        }
        match preset {
            Preset::Sync | Preset::SyncFast => {
                c.modes.new = true;
                c.modes.delete = true;
                c.modes.update = true;
            }
            Preset::DiffFast => c.modes.diff = true,
        }
        self
    }

    // ── Traversal ─────────────────────────────────────────────────────────

    /// Compare only the two given directories, treating subdirectories as
    /// opaque.
    pub fn ignore_dirs(mut self, yes: bool) -> Self {
        self.config.ignore_dirs = yes;
        self
    }

    /// Skip fifos, sockets and devices.
    pub fn ignore_special(mut self, yes: bool) -> Self {
        self.config.ignore_special = yes;
        self
    }

    /// Exclude `._*` entries in SRCDIR.
    pub fn ignore_forks(mut self, yes: bool) -> Self {
        self.config.ignore_forks_src = yes;
        self
    }

    /// Exclude `._*` entries in DSTDIR, so `delete` leaves them alone.
    pub fn ignore_forks_dst(mut self, yes: bool) -> Self {
        self.config.ignore_forks_dst = yes;
        self
    }

    /// Dereference symlinks before classifying and copying.
    pub fn follow_symlinks(mut self, yes: bool) -> Self {
        self.config.follow_symlinks = yes;
        self
    }

    /// Create DSTDIR if it does not exist, for `new`/`update`.
    pub fn create_missing_dst(mut self, yes: bool) -> Self {
        self.config.create_missing_dst = yes;
        self
    }

    // ── Matching ──────────────────────────────────────────────────────────

    /// Treat regular files of the same size as identical, without reading them.
    pub fn ignore_content(mut self, yes: bool) -> Self {
        self.config.ignore_content = yes;
        self
    }

    /// Assume SRCDIR is always newer: `update` overwrites every difference.
    pub fn ignore_mtime(mut self, yes: bool) -> Self {
        self.config.ignore_mtime = yes;
        self
    }

    /// Compare filenames after canonical decomposition (NFD).
    pub fn normalize_filenames(mut self, yes: bool) -> Self {
        self.config.normalize_filenames = yes;
        self
    }

    // ── Side effects ──────────────────────────────────────────────────────

    /// Copy source mtimes onto copied files and onto older matching files.
    pub fn preserve_mtime(mut self, yes: bool) -> Self {
        self.config.preserve_mtime = yes;
        self
    }

    /// During diff, export source-only entries to `dir`. DSTDIR is untouched.
    pub fn copy_ins(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.copy_ins = Some(dir.into());
        self
    }

    /// During diff, export destination-only entries to `dir`. DSTDIR is untouched.
    pub fn copy_del(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.copy_del = Some(dir.into());
        self
    }

    /// Log everything, change nothing.
    pub fn dummy_mode(mut self, yes: bool) -> Self {
        self.config.dummy_mode = yes;
        self
    }

    // ── Output ────────────────────────────────────────────────────────────

    /// Also print `=` lines for matching entries.
    pub fn show_matches(mut self, yes: bool) -> Self {
        self.config.show_matches = yes;
        self
    }

    /// Print every entry below new and deleted directories.
    pub fn show_subtree(mut self, yes: bool) -> Self {
        self.config.show_subtree = yes;
        self
    }

    /// `0` silent, `1` actions, `2` directories, `3` every compared pair.
    pub fn verbose(mut self, level: u8) -> Self {
        self.config.verbose = level;
        self
    }

    /// Colour `+`/`-` lines. Off by default.
    pub fn color(mut self, yes: bool) -> Self {
        self.config.color = yes;
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Resolve modes and produce the immutable [`Config`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if no source or destination was given.
    pub fn build(self) -> Result<Config, TreesyncError> {
        let source = self.source.ok_or(TreesyncError::NoSource)?;
        let destination = self.destination.ok_or(TreesyncError::NoDestination)?;

        Ok(Config {
            source,
            destination,
            modes: self.config.modes.resolve(),
            ..self.config
        })
    }

    /// Run against the local filesystem, printing to stdout.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before anything is traversed.
    /// Any failing filesystem mutation aborts the run and is returned as is.
    pub fn run(self) -> Result<Summary, TreesyncError> {
        self.run_with(&LocalFs, &mut StdoutSink)
    }

    /// Run against any [`FileSystem`], writing diagnostics to `sink`.
    pub fn run_with(self, fs: &dyn FileSystem, sink: &mut dyn Sink) -> Result<Summary, TreesyncError> {
        let config = self.build()?;
        run(&config, fs, sink)
    }
}
