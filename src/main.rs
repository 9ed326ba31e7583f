//! treesync command line.
//!
//! Parses flags into a [`SyncBuilder`](treesync::SyncBuilder) and runs it.
//! Diff output goes to stdout, tracing to stderr.

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use treesync::Preset;

/// Sync or diff two directory trees, recursively.
///
/// Compare SRCDIR with DSTDIR and print differences (--diff or no option) or
/// update DSTDIR in certain ways (--new, --delete or --update). SRCDIR is never
/// modified. Differences are printed in the view of going from DSTDIR to
/// SRCDIR, so usually `treesync NEW OLD` (unlike `diff OLD NEW`).
#[derive(Parser, Debug)]
#[command(name = "treesync")]
#[command(author, version, about)]
struct Cli {
    /// Source tree
    srcdir: PathBuf,

    /// Destination tree
    dstdir: PathBuf,

    // File/dir processing options
    /// Print differences and do not change anything (default if none of
    /// --new/--delete/--update are given)
    #[arg(long)]
    diff: bool,

    /// Like --diff, with --ignore-forks --ignore-content --ignore-mtime --normalize-filenames
    #[arg(long)]
    diff_fast: bool,

    /// Make DSTDIR look like SRCDIR, same as -NDU
    #[arg(short = 's', long)]
    sync: bool,

    /// Like --sync, with --ignore-forks --ignore-content --ignore-mtime --normalize-filenames
    #[arg(short = 'S', long)]
    sync_fast: bool,

    /// Copy files/dirs which only appear in SRCDIR into DSTDIR
    #[arg(short = 'N', long)]
    new: bool,

    /// Delete files/dirs in DSTDIR which do not appear in SRCDIR
    #[arg(short = 'D', long)]
    delete: bool,

    /// Also copy files/dirs which are newer in SRCDIR or differ in type. Implies --new
    #[arg(short = 'U', long)]
    update: bool,

    /// Just process the two given directories, ignore subdirectories
    #[arg(long)]
    ignore_dirs: bool,

    /// Ignore block/char devices, pipes and sockets
    #[arg(long)]
    ignore_special: bool,

    /// Ignore files and dirs in SRCDIR starting with '._' (resource forks)
    #[arg(short = 'F', long)]
    ignore_forks: bool,

    /// Ignore files and dirs in DSTDIR starting with '._', so -D keeps them
    #[arg(long)]
    ignore_forks_dst: bool,

    /// Follow symlinks instead of comparing them as links
    #[arg(long)]
    follow_symlinks: bool,

    /// Create DSTDIR if it does not exist, for --new/--update
    #[arg(short = 'c', long)]
    create_missing_dst: bool,

    /// Copy insertions to DIR during --diff. DSTDIR is not modified
    #[arg(long, value_name = "DIR")]
    copy_ins: Option<PathBuf>,

    /// Copy deletions to DIR during --diff. DSTDIR is not modified
    #[arg(long, value_name = "DIR")]
    copy_del: Option<PathBuf>,

    /// Copy mtimes from SRCDIR for --new and --update
    #[arg(short = 'p', long = "preserve-mtime")]
    preserve_mtime: bool,

    // Matching options
    /// Files of the same size are identical, do not read their content
    #[arg(short = 'C', long)]
    ignore_content: bool,

    /// Always treat SRCDIR as newer: --update overwrites every difference
    #[arg(short = 'T', long)]
    ignore_mtime: bool,

    /// Compare filenames after unicode canonical decomposition (NFD)
    #[arg(short = 'Z', long)]
    normalize_filenames: bool,

    // Verbose / common options
    /// Also show matching files for --diff
    #[arg(long)]
    show_matches: bool,

    /// Show every file/dir below new and deleted dirs
    #[arg(long)]
    show_subtree: bool,

    /// Increase verbosity, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Do not color output
    #[arg(short, long)]
    no_color: bool,

    /// Do not write, change or delete anything
    #[arg(short, long)]
    dummy_mode: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), treesync::TreesyncError> {
    let mut builder = treesync::sync()
        .source(cli.srcdir)
        .destination(cli.dstdir)
        .diff(cli.diff)
        .new_entries(cli.new)
        .delete(cli.delete)
        .update(cli.update)
        .ignore_dirs(cli.ignore_dirs)
        .ignore_special(cli.ignore_special)
        .ignore_forks(cli.ignore_forks)
        .ignore_forks_dst(cli.ignore_forks_dst)
        .follow_symlinks(cli.follow_symlinks)
        .create_missing_dst(cli.create_missing_dst)
        .ignore_content(cli.ignore_content)
        .ignore_mtime(cli.ignore_mtime)
        .normalize_filenames(cli.normalize_filenames)
        .preserve_mtime(cli.preserve_mtime)
        .show_matches(cli.show_matches)
        .show_subtree(cli.show_subtree)
        .verbose(cli.verbose)
        .color(!cli.no_color)
        .dummy_mode(cli.dummy_mode);

    if cli.sync {
        builder = builder.preset(Preset::Sync);
    }
    if cli.sync_fast {
        builder = builder.preset(Preset::SyncFast);
    }
    if cli.diff_fast {
        builder = builder.preset(Preset::DiffFast);
    }
    if let Some(dir) = cli.copy_ins {
        builder = builder.copy_ins(dir);
    }
    if let Some(dir) = cli.copy_del {
        builder = builder.copy_del(dir);
    }

    builder.run().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_flags_combine() {
        let cli = Cli::try_parse_from(["treesync", "-NDU", "-vvv", "-CTZ", "a", "b"]).unwrap();
        assert!(cli.new && cli.delete && cli.update);
        assert!(cli.ignore_content && cli.ignore_mtime && cli.normalize_filenames);
        assert_eq!(cli.verbose, 3);
        assert_eq!(cli.srcdir, PathBuf::from("a"));
    }

    #[test]
    fn both_dirs_required() {
        assert!(Cli::try_parse_from(["treesync", "only-one"]).is_err());
    }

    #[test]
    fn copy_ins_takes_a_dir() {
        let cli = Cli::try_parse_from(["treesync", "--copy-ins", "out", "a", "b"]).unwrap();
        assert_eq!(cli.copy_ins, Some(PathBuf::from("out")));
    }
}
