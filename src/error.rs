use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreesyncError {
    // Config
    #[error("no source directory given")]
    NoSource,

    #[error("no destination directory given")]
    NoDestination,

    #[error("SRCDIR \"{}\" does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("SRCDIR \"{}\" is not a directory", .0.display())]
    SourceNotDir(PathBuf),

    #[error("DSTDIR \"{}\" does not exist", .0.display())]
    DestinationMissing(PathBuf),

    #[error("DSTDIR \"{}\" is not a directory", .0.display())]
    DestinationNotDir(PathBuf),

    #[error("conflicting flags: {0}")]
    ConflictingFlags(String),

    // Traversal
    #[error(
        "names {first:?} and {second:?} in \"{}\" normalize to the same filename",
        .dir.display()
    )]
    NameCollision {
        dir: PathBuf,
        first: String,
        second: String,
    },

    // Mutation
    #[error("cannot create dir \"{}\" on existing non-dir", .0.display())]
    NotADirectory(PathBuf),

    #[error("\"{}\": {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TreesyncError {
    /// Wrap an I/O error with the path it happened at.
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::SourceMissing(p)
            | Self::SourceNotDir(p)
            | Self::DestinationMissing(p)
            | Self::DestinationNotDir(p)
            | Self::NotADirectory(p)
            | Self::NameCollision { dir: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether this error was raised while validating the configuration,
    /// i.e. before anything was traversed or touched.
    ///
    /// Everything else aborts a run midway. There is no skip/continue policy:
    /// fix the cause and re-run, the tool is idempotent.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::NoSource
                | Self::NoDestination
                | Self::SourceMissing(_)
                | Self::SourceNotDir(_)
                | Self::DestinationMissing(_)
                | Self::DestinationNotDir(_)
                | Self::ConflictingFlags(_)
        )
    }
}
