use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ignore::WalkBuilder;
use tracing::trace;

use crate::entry::{classify, DeviceId, Entry, EntryKind};
use crate::error::TreesyncError;
use crate::traits::{CopyOptions, FileSystem};

// ---------------------------------------------------------------------------
// LocalFs
// ---------------------------------------------------------------------------

/// [`FileSystem`] over the local filesystem.
///
/// Listing goes through `ignore`'s walker limited to one level, with every
/// filter switched off: nothing is hidden, `.gitignore` files mean nothing here.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list_dir(&self, dir: &Path, follow_symlinks: bool) -> Result<Vec<Entry>, TreesyncError> {
        trace!(dir = %dir.display(), "listing");

        let walker = WalkBuilder::new(dir)
            .standard_filters(false)
            .ignore(false)
            .parents(false)
            .hidden(false)
            .follow_links(false)
            .same_file_system(false)
            .max_depth(Some(1))
            .build();

        let mut entries = Vec::new();
        for res in walker {
            let child = match res {
                Ok(child) => child,
                Err(e) => match map_ignore_error(e) {
                    // Vanished while being listed
                    TreesyncError::Io { path, source }
                        if source.kind() == ErrorKind::NotFound && path.parent() == Some(dir) =>
                    {
                        let name = path.file_name().map(OsString::from).unwrap_or_default();
                        entries.push(Entry::vanished(path, name));
                        continue;
                    }
                    other => return Err(other),
                },
            };

            // Skip the directory itself
            if child.depth() == 0 {
                continue;
            }

            let name = child.file_name().to_os_string();
            entries.push(stat_entry(child.into_path(), name, follow_symlinks)?);
        }
        Ok(entries)
    }

    fn stat(&self, path: &Path, follow_symlinks: bool) -> Result<Option<Entry>, TreesyncError> {
        let name = path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| path.as_os_str().to_os_string());
        let entry = stat_entry(path.to_path_buf(), name, follow_symlinks)?;
        Ok((entry.kind != EntryKind::NonExisting).then_some(entry))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, TreesyncError> {
        trace!(path = %path.display(), "reading");
        fs::read(path).map_err(|e| TreesyncError::io(path, e))
    }

    fn create_dir_all(&self, dir: &Path) -> Result<(), TreesyncError> {
        trace!(dir = %dir.display(), "mkdir");
        fs::create_dir_all(dir).map_err(|e| TreesyncError::io(dir, e))
    }

    fn copy(&self, src: &Entry, dst: &Path, options: CopyOptions) -> Result<(), TreesyncError> {
        trace!(src = %src.path.display(), dst = %dst.display(), ?options, "copy");

        if !options.overwrite && fs::symlink_metadata(dst).is_ok() {
            return Err(TreesyncError::io(
                dst,
                std::io::Error::new(ErrorKind::AlreadyExists, "destination exists"),
            ));
        }

        match classify(src, options.follow_symlinks) {
            EntryKind::Regular => fs::copy(&src.path, dst)
                .map(|_| ())
                .map_err(|e| TreesyncError::io(&src.path, e)),

            EntryKind::Symlink => {
                let target = match &src.link_target {
                    Some(t) => t.clone(),
                    None => fs::read_link(&src.path).map_err(|e| TreesyncError::io(&src.path, e))?,
                };
                std::os::unix::fs::symlink(&target, dst).map_err(|e| TreesyncError::io(dst, e))
            }

            kind => Err(TreesyncError::io(
                &src.path,
                std::io::Error::new(ErrorKind::Unsupported, format!("cannot copy {kind}")),
            )),
        }
    }

    fn remove(&self, path: &Path) -> Result<(), TreesyncError> {
        trace!(path = %path.display(), "remove");
        let meta = fs::symlink_metadata(path).map_err(|e| TreesyncError::io(path, e))?;
        if meta.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        }
        .map_err(|e| TreesyncError::io(path, e))
    }

    fn set_mtime(&self, path: &Path, mtime: SystemTime) -> Result<(), TreesyncError> {
        trace!(path = %path.display(), "set mtime");
        fs::File::open(path)
            .and_then(|f| f.set_modified(mtime))
            .map_err(|e| TreesyncError::io(path, e))
    }
}

// ---------------------------------------------------------------------------
// Stat helpers
// ---------------------------------------------------------------------------

/// Stat `path` into an [`Entry`]. A path that no longer exists yields a
/// [`EntryKind::NonExisting`] entry instead of an error.
fn stat_entry(path: PathBuf, name: OsString, follow_symlinks: bool) -> Result<Entry, TreesyncError> {
    let meta = match fs::symlink_metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!(path = %path.display(), "vanished before stat");
            return Ok(Entry::vanished(path, name));
        }
        Err(e) => return Err(TreesyncError::io(&path, e)),
    };

    let kind = EntryKind::from_file_type(meta.file_type());
    let mut entry = Entry {
        device: device_of(kind, &meta),
        size: meta.len(),
        mtime: meta.modified().ok(),
        path,
        name,
        kind,
        target_kind: None,
        link_target: None,
    };

    if kind != EntryKind::Symlink {
        return Ok(entry);
    }

    entry.link_target = match fs::read_link(&entry.path) {
        Ok(t) => Some(t),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Entry::vanished(entry.path, entry.name));
        }
        Err(e) => return Err(TreesyncError::io(&entry.path, e)),
    };

    if follow_symlinks {
        // A dangling or looping link simply has no target kind.
        if let Ok(target) = fs::metadata(&entry.path) {
            let target_kind = EntryKind::from_file_type(target.file_type());
            entry.target_kind = Some(target_kind);
            entry.size = target.len();
            entry.mtime = target.modified().ok();
            entry.device = device_of(target_kind, &target);
        }
    }

    Ok(entry)
}

fn device_of(kind: EntryKind, meta: &fs::Metadata) -> Option<DeviceId> {
    matches!(kind, EntryKind::Block | EntryKind::Char).then(|| DeviceId::from_rdev(meta.rdev()))
}

// ---------------------------------------------------------------------------
// Map ignore::Error to TreesyncError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> TreesyncError {
    match e {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(source) => TreesyncError::Io { path, source },
            other => TreesyncError::Io {
                path,
                source: std::io::Error::other(other.to_string()),
            },
        },
        ignore::Error::WithDepth { err, .. } => map_ignore_error(*err),
        ignore::Error::Io(source) => TreesyncError::Io {
            path: PathBuf::new(),
            source,
        },
        other => TreesyncError::Io {
            path: PathBuf::new(),
            source: std::io::Error::other(other.to_string()),
        },
    }
}
