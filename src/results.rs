use crate::report::SyncStats;

/// The output of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// `true` if no difference was found anywhere in the two trees.
    ///
    /// Always describes the trees as they were before this run changed
    /// anything: a sync that copied files still reports `false`.
    pub equal: bool,

    /// Counters and timing.
    pub stats: SyncStats,
}

impl Summary {
    /// Number of src-only, dst-only, mismatched and type-mismatched entries.
    pub fn differences(&self) -> usize {
        self.stats.differences()
    }
}
