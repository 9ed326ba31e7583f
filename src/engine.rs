use std::time::Instant;

use tracing::{debug, info};

use crate::compare::TreeDiff;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::entry::EntryKind;
use crate::error::TreesyncError;
use crate::report::{Diagnostics, Sink};
use crate::results::Summary;
use crate::traits::FileSystem;

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Validate `config` against the filesystem, then diff and/or sync the trees.
///
/// Strictly sequential: one directory pair at a time, depth-first, in key
/// order. The first failing mutation aborts the whole run. Partial progress is
/// kept, and re-running picks up where it stopped.
///
/// Called by `SyncBuilder::run()` after the config is built.
pub(crate) fn run(
    config: &Config,
    fs: &dyn FileSystem,
    sink: &mut dyn Sink,
) -> Result<Summary, TreesyncError> {
    let start = Instant::now();

    check_flags(config)?;
    check_source(config, fs)?;

    let mut diag = Diagnostics::new(sink, config.verbose, config.color, config.dummy_mode);

    let equal = {
        let mut dispatcher = Dispatcher::new(config, fs, &mut diag);
        prepare_destination(config, fs, &mut dispatcher)?;
        debug!(
            src = %config.source.display(),
            dst = %config.destination.display(),
            modes = ?config.modes,
            dummy = config.dummy_mode,
            "starting traversal"
        );
        TreeDiff::new(config, fs).process(&mut dispatcher)?
    };

    let mut stats = std::mem::take(&mut diag.stats);
    stats.duration = start.elapsed();

    info!(
        equal,
        differences = stats.differences(),
        copied = stats.copied,
        deleted = stats.deleted,
        "done in {:.3}s",
        stats.duration.as_secs_f64()
    );

    Ok(Summary { equal, stats })
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

fn check_flags(config: &Config) -> Result<(), TreesyncError> {
    if !config.modes.diff {
        if config.copy_ins.is_some() {
            return Err(TreesyncError::ConflictingFlags(
                "--copy-ins only applies to --diff".into(),
            ));
        }
        if config.copy_del.is_some() {
            return Err(TreesyncError::ConflictingFlags(
                "--copy-del only applies to --diff".into(),
            ));
        }
    }
    Ok(())
}

fn check_source(config: &Config, fs: &dyn FileSystem) -> Result<(), TreesyncError> {
    let src = &config.source;
    match fs.stat(src, true)? {
        None => Err(TreesyncError::SourceMissing(src.clone())),
        Some(e) if e.kind_with(true) != EntryKind::Dir => Err(TreesyncError::SourceNotDir(src.clone())),
        Some(_) => Ok(()),
    }
}

/// Create a missing DSTDIR if asked to, then check it.
///
/// A dummy run that would have created DSTDIR cannot check it, and compares
/// against an empty tree instead.
fn prepare_destination(
    config: &Config,
    fs: &dyn FileSystem,
    dispatcher: &mut Dispatcher<'_, '_>,
) -> Result<(), TreesyncError> {
    let dst = &config.destination;

    let creates = config.modes.new && config.create_missing_dst;
    if creates && fs.stat(dst, true)?.is_none() {
        dispatcher.mk_dirs(dst, "Creating destination dir")?;
    }

    match fs.stat(dst, true)? {
        // Only virtually created
        None if creates && config.dummy_mode => Ok(()),
        None => Err(TreesyncError::DestinationMissing(dst.clone())),
        Some(e) if e.kind_with(true) != EntryKind::Dir => {
            Err(TreesyncError::DestinationNotDir(dst.clone()))
        }
        Some(_) => Ok(()),
    }
}
