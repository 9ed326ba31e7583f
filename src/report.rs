use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use colored::Colorize;

use crate::entry::EntryKind;
use crate::error::TreesyncError;
use crate::traits::FileSystem;

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receives the diagnostic output of a run, one finished line at a time.
///
/// This is the stable output contract (`+ file a.txt`, `Diff: ...`, verbose
/// action lines). It is kept apart from `tracing`, which only carries
/// internal debugging detail.
pub trait Sink {
    fn line(&mut self, line: &str);
}

/// Writes every line to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn line(&mut self, line: &str) {
        let mut out = std::io::stdout().lock();
        // Nowhere left to report a closed stdout.
        let _ = writeln!(out, "{line}");
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl Sink for MemorySink {
    fn line(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }
}

// ---------------------------------------------------------------------------
// SyncStats
// ---------------------------------------------------------------------------

/// What a run saw and did.
///
/// Action counters also count in dummy mode, where they mean "would have".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub src_only:        usize,
    pub dst_only:        usize,
    pub matches:         usize,
    pub mismatches:      usize,
    pub type_mismatches: usize,
    pub ignored:         usize,

    pub copied:          usize,
    pub deleted:         usize,
    pub dirs_created:    usize,
    pub mtimes_updated:  usize,

    /// Wall-clock time of the whole run.
    pub duration: Duration,
}

impl SyncStats {
    /// Number of reported differences.
    pub fn differences(&self) -> usize {
        self.src_only + self.dst_only + self.mismatches + self.type_mismatches
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// The mutable half of a run: output sink, counters and the dummy-mode ledger.
///
/// Passed alongside the immutable [`Config`](crate::Config), never global.
pub struct Diagnostics<'s> {
    sink:    &'s mut dyn Sink,
    verbose: u8,
    color:   bool,
    dummy:   bool,
    ledger:  DummyLedger,
    pub stats: SyncStats,
}

impl<'s> Diagnostics<'s> {
    pub fn new(sink: &'s mut dyn Sink, verbose: u8, color: bool, dummy: bool) -> Self {
        Self {
            sink,
            verbose,
            color,
            dummy,
            ledger: DummyLedger::default(),
            stats: SyncStats::default(),
        }
    }

    /// Whether lines of verbosity `level` are shown.
    pub fn at(&self, level: u8) -> bool {
        self.verbose >= level
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }

    /// Emit a plain line.
    pub fn line(&mut self, line: &str) {
        self.sink.line(line);
    }

    /// Emit a `+` line, green unless colour is off.
    pub fn inserted(&mut self, line: &str) {
        if self.color {
            self.sink.line(&line.green().to_string());
        } else {
            self.sink.line(line);
        }
    }

    /// Emit a `-` line, red unless colour is off.
    pub fn removed(&mut self, line: &str) {
        if self.color {
            self.sink.line(&line.red().to_string());
        } else {
            self.sink.line(line);
        }
    }

    /// Kind of whatever is at `path` as the run currently sees it.
    ///
    /// In dummy mode nothing is mutated, so the answer is the on-disk state
    /// patched by what this run pretended to create and remove. That keeps the
    /// dummy log identical to a real run's.
    pub(crate) fn kind_at(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        follow_symlinks: bool,
    ) -> Result<Option<EntryKind>, TreesyncError> {
        if self.dummy {
            if let Some(kind) = self.ledger.lookup(path) {
                return Ok(kind);
            }
        }
        Ok(fs.stat(path, follow_symlinks)?.map(|e| e.kind_with(follow_symlinks)))
    }

    pub(crate) fn note_created(&mut self, path: &Path, kind: EntryKind) {
        if self.dummy {
            self.ledger.created(path, kind);
        }
    }

    pub(crate) fn note_removed(&mut self, path: &Path) {
        if self.dummy {
            self.ledger.removed(path);
        }
    }
}

/// Paths a dummy run pretended to create or remove.
#[derive(Debug, Default)]
struct DummyLedger {
    created: HashMap<PathBuf, EntryKind>,
    removed: Vec<PathBuf>,
}

impl DummyLedger {
    fn created(&mut self, path: &Path, kind: EntryKind) {
        self.created.insert(path.to_path_buf(), kind);
    }

    fn removed(&mut self, path: &Path) {
        self.created.retain(|p, _| !p.starts_with(path));
        self.removed.push(path.to_path_buf());
    }

    /// `Some(answer)` if the ledger knows, `None` to fall through to disk.
    fn lookup(&self, path: &Path) -> Option<Option<EntryKind>> {
        if let Some(kind) = self.created.get(path) {
            return Some(Some(*kind));
        }
        self.removed
            .iter()
            .any(|r| path.starts_with(r))
            .then_some(None)
    }
}
