use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// What a run does with the differences it finds. Modes combine additively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modes {
    /// Report differences. Never touches DSTDIR.
    pub diff: bool,

    /// Copy source-only entries into DSTDIR.
    pub new: bool,

    /// Remove destination-only entries from DSTDIR.
    pub delete: bool,

    /// Copy mismatched and type-mismatched entries over DSTDIR.
    pub update: bool,
}

impl Modes {
    /// Apply the implications between modes: `update` implies `new`, and
    /// `diff` is the default when nothing would change DSTDIR.
    pub fn resolve(mut self) -> Self {
        if self.update {
            self.new = true;
        }
        if !(self.new || self.delete || self.update) {
            self.diff = true;
        }
        self
    }

    /// Whether this run may mutate DSTDIR.
    pub fn mutates(&self) -> bool {
        self.new || self.delete || self.update
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Shortcuts for common flag combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// `new` + `delete` + `update`: make DSTDIR look like SRCDIR.
    Sync,

    /// [`Preset::Sync`] trusting only names and sizes: also ignores forks,
    /// content and mtimes, and normalizes filenames.
    SyncFast,

    /// `diff` with the same relaxations as [`Preset::SyncFast`].
    DiffFast,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Every policy flag of one run.
///
/// Built and validated by [`SyncBuilder`](crate::SyncBuilder), then only ever
/// read: the comparator and the dispatcher borrow it immutably for the whole
/// run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source:      PathBuf,
    pub destination: PathBuf,

    /// Resolved modes, see [`Modes::resolve`].
    pub modes: Modes,

    // Traversal
    /// Do not descend into subdirectories.
    pub ignore_dirs:        bool,
    /// Skip fifos, sockets and devices.
    pub ignore_special:     bool,
    /// Exclude `._*` entries in SRCDIR.
    pub ignore_forks_src:   bool,
    /// Exclude `._*` entries in DSTDIR.
    pub ignore_forks_dst:   bool,
    pub follow_symlinks:    bool,
    pub create_missing_dst: bool,

    // Matching
    /// Equal size means equal content.
    pub ignore_content:      bool,
    /// Treat the source as always newer on update.
    pub ignore_mtime:        bool,
    /// Compare filenames after canonical decomposition (NFD).
    pub normalize_filenames: bool,

    // Side effects
    /// Copy source mtimes onto DSTDIR: on copied files and on matching
    /// entries whose source is newer.
    pub preserve_mtime: bool,
    /// During diff, also export source-only entries here.
    pub copy_ins: Option<PathBuf>,
    /// During diff, also export destination-only entries here.
    pub copy_del: Option<PathBuf>,

    // Output
    pub show_matches: bool,
    pub show_subtree: bool,
    pub verbose:      u8,
    pub color:        bool,
    pub dummy_mode:   bool,
}

impl Config {
    /// A diff-only config for `source` and `destination`, everything else off.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source:              source.into(),
            destination:         destination.into(),
            modes:               Modes::default().resolve(),
            ignore_dirs:         false,
            ignore_special:      false,
            ignore_forks_src:    false,
            ignore_forks_dst:    false,
            follow_symlinks:     false,
            create_missing_dst:  false,
            ignore_content:      false,
            ignore_mtime:        false,
            normalize_filenames: false,
            preserve_mtime:      false,
            copy_ins:            None,
            copy_del:            None,
            show_matches:        false,
            show_subtree:        false,
            verbose:             0,
            color:               false,
            dummy_mode:          false,
        }
    }

    /// Whether `._*` entries are excluded on the given side.
    pub fn ignores_forks(&self, src_side: bool) -> bool {
        if src_side {
            self.ignore_forks_src
        } else {
            self.ignore_forks_dst
        }
    }
}
