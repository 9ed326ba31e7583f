use std::cmp::Ordering;
use std::collections::btree_map::{BTreeMap, Entry as Slot};
use std::path::Path;

use tracing::{debug, trace};

use crate::config::Config;
use crate::entry::{classify, Entry, EntryKind};
use crate::error::TreesyncError;
use crate::names::{is_fork, name_key};
use crate::traits::{FileSystem, Handler};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// One classification made while walking two trees side by side.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// About to list and compare two directories.
    ProgressDirs { src: &'a Path, dst: &'a Path },

    /// About to compare two same-name, same-kind, non-directory entries.
    ProgressFiles { src: &'a Entry, dst: &'a Entry },

    /// The name exists in SRCDIR only. `dst_dir` is where it would go.
    SrcOnly { src: &'a Entry, dst_dir: &'a Path },

    /// The name exists in DSTDIR only. `src_dir` is where it is missing.
    DstOnly { src_dir: &'a Path, dst: &'a Entry },

    /// Same kind, and equal under the active policy.
    Match { src: &'a Entry, dst: &'a Entry },

    /// Same kind, but different content, size, link target or device.
    Mismatch { src: &'a Entry, dst: &'a Entry },

    /// Same name, different kind.
    TypeMismatch { src: &'a Entry, dst: &'a Entry },

    /// A directory left alone because subdirectories are ignored.
    IgnoredDir(&'a Entry),

    /// A special file left alone, or an entry that vanished mid-run.
    IgnoredFile(&'a Entry),
}

/// Normalized filename to entry, ordered by key.
type KeyedMap = BTreeMap<Vec<u8>, Entry>;

// ---------------------------------------------------------------------------
// TreeDiff
// ---------------------------------------------------------------------------

/// Merge-join comparison of two directory trees.
///
/// Walks SRCDIR and DSTDIR depth-first, one directory pair at a time, and
/// hands every classification to a [`Handler`] in key order. Never mutates
/// anything itself.
pub struct TreeDiff<'a> {
    config: &'a Config,
    fs:     &'a dyn FileSystem,
}

impl<'a> TreeDiff<'a> {
    pub fn new(config: &'a Config, fs: &'a dyn FileSystem) -> Self {
        Self { config, fs }
    }

    /// Compare the configured roots.
    ///
    /// Returns `true` if no difference was found anywhere in the trees.
    pub fn process(&self, handler: &mut dyn Handler) -> Result<bool, TreesyncError> {
        self.process_dir(&self.config.source, &self.config.destination, handler)
    }

    fn process_dir(
        &self,
        src: &Path,
        dst: &Path,
        handler: &mut dyn Handler,
    ) -> Result<bool, TreesyncError> {
        handler.on_event(Event::ProgressDirs { src, dst })?;

        let src_map = self.read_side(src, true)?;
        let dst_map = match self.fs.stat(dst, self.config.follow_symlinks)? {
            Some(_) => self.read_side(dst, false)?,
            None    => KeyedMap::new(),
        };
        debug!(
            src = %src.display(),
            dst = %dst.display(),
            src_entries = src_map.len(),
            dst_entries = dst_map.len(),
            "comparing dirs"
        );

        let mut srcs = src_map.iter().peekable();
        let mut dsts = dst_map.iter().peekable();
        let mut equal = true;

        loop {
            let order = match (srcs.peek(), dsts.peek()) {
                (None, None)                 => break,
                (Some(_), None)              => Ordering::Less,
                (None, Some(_))              => Ordering::Greater,
                (Some((sk, _)), Some((dk, _))) => sk.cmp(dk),
            };

            match order {
                Ordering::Less => {
                    let Some((_, s)) = srcs.next() else { break };
                    if self.vanished(s, handler)? {
                        continue;
                    }
                    handler.on_event(Event::SrcOnly { src: s, dst_dir: dst })?;
                    equal = false;
                }
                Ordering::Greater => {
                    let Some((_, d)) = dsts.next() else { break };
                    if self.vanished(d, handler)? {
                        continue;
                    }
                    handler.on_event(Event::DstOnly { src_dir: src, dst: d })?;
                    equal = false;
                }
                Ordering::Equal => {
                    let (Some((_, s)), Some((_, d))) = (srcs.next(), dsts.next()) else { break };
                    if !self.compare_pair(s, d, handler)? {
                        equal = false;
                    }
                }
            }
        }

        Ok(equal)
    }

    /// A one-sided entry that vanished after listing is ignored, not reported.
    fn vanished(&self, e: &Entry, handler: &mut dyn Handler) -> Result<bool, TreesyncError> {
        if classify(e, self.config.follow_symlinks) != EntryKind::NonExisting {
            return Ok(false);
        }
        trace!(path = %e.path.display(), "entry vanished");
        handler.on_event(Event::IgnoredFile(e))?;
        Ok(true)
    }

    /// Compare two entries of the same key. Returns `true` if they are equal.
    fn compare_pair(
        &self,
        s: &Entry,
        d: &Entry,
        handler: &mut dyn Handler,
    ) -> Result<bool, TreesyncError> {
        let follow = self.config.follow_symlinks;
        let kind = classify(s, follow);
        let dst_kind = classify(d, follow);

        // Vanished between listing and stat: not a difference.
        if kind == EntryKind::NonExisting || dst_kind == EntryKind::NonExisting {
            trace!(src = %s.path.display(), dst = %d.path.display(), "entry vanished");
            handler.on_event(Event::IgnoredFile(s))?;
            handler.on_event(Event::IgnoredFile(d))?;
            return Ok(true);
        }

        if kind != dst_kind {
            handler.on_event(Event::TypeMismatch { src: s, dst: d })?;
            return Ok(false);
        }

        if kind != EntryKind::Dir {
            handler.on_event(Event::ProgressFiles { src: s, dst: d })?;
        }

        let equal = match kind {
            EntryKind::Regular => {
                // Sizes first, content only when it can still matter.
                s.size == d.size
                    && (self.config.ignore_content
                        || self.fs.read_file(&s.path)? == self.fs.read_file(&d.path)?)
            }

            EntryKind::Dir => {
                if self.config.ignore_dirs {
                    handler.on_event(Event::IgnoredDir(s))?;
                    handler.on_event(Event::IgnoredDir(d))?;
                    return Ok(true);
                }
                return self.process_dir(&s.path, &d.path, handler);
            }

            EntryKind::Symlink => s.link_target == d.link_target,

            EntryKind::Fifo | EntryKind::Socket | EntryKind::Block | EntryKind::Char
                if self.config.ignore_special =>
            {
                handler.on_event(Event::IgnoredFile(s))?;
                handler.on_event(Event::IgnoredFile(d))?;
                return Ok(true);
            }

            // No content to compare.
            EntryKind::Fifo | EntryKind::Socket => true,

            EntryKind::Block | EntryKind::Char => s.device == d.device,

            EntryKind::NonExisting => true,
        };

        if equal {
            handler.on_event(Event::Match { src: s, dst: d })?;
        } else {
            handler.on_event(Event::Mismatch { src: s, dst: d })?;
        }
        Ok(equal)
    }

    /// List one side of a directory pair into a keyed map.
    fn read_side(&self, dir: &Path, src_side: bool) -> Result<KeyedMap, TreesyncError> {
        let skip_forks = self.config.ignores_forks(src_side);
        let normalize = self.config.normalize_filenames;

        let mut map = KeyedMap::new();
        for entry in self.fs.list_dir(dir, self.config.follow_symlinks)? {
            if skip_forks && is_fork(&entry.name) {
                continue;
            }
            match map.entry(name_key(&entry.name, normalize)) {
                Slot::Vacant(slot) => {
                    slot.insert(entry);
                }
                Slot::Occupied(slot) => {
                    return Err(TreesyncError::NameCollision {
                        dir:    dir.to_path_buf(),
                        first:  slot.get().name.to_string_lossy().into_owned(),
                        second: entry.name.to_string_lossy().into_owned(),
                    });
                }
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use crate::traits::CopyOptions;
    use std::fs;

    /// Records event tags and names in order.
    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Handler for Recorder {
        fn on_event(&mut self, event: Event<'_>) -> Result<(), TreesyncError> {
            let name = |e: &Entry| e.name.to_string_lossy().into_owned();
            let tag = match event {
                Event::ProgressDirs { .. } | Event::ProgressFiles { .. } => return Ok(()),
                Event::SrcOnly { src, .. }      => format!("src-only {}", name(src)),
                Event::DstOnly { dst, .. }      => format!("dst-only {}", name(dst)),
                Event::Match { src, .. }        => format!("match {}", name(src)),
                Event::Mismatch { src, .. }     => format!("mismatch {}", name(src)),
                Event::TypeMismatch { src, .. } => format!("type {}", name(src)),
                Event::IgnoredDir(e)            => format!("ignored-dir {}", name(e)),
                Event::IgnoredFile(e)           => format!("ignored {}", name(e)),
            };
            self.0.push(tag);
            Ok(())
        }
    }

    fn run(config: &Config) -> (bool, Vec<String>) {
        let mut rec = Recorder::default();
        let equal = TreeDiff::new(config, &LocalFs).process(&mut rec).unwrap();
        (equal, rec.0)
    }

    #[test]
    fn merge_join_is_ordered() {
        let (s, d) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        for n in ["a", "c", "e"] {
            fs::write(s.path().join(n), n).unwrap();
        }
        for n in ["b", "c", "d"] {
            fs::write(d.path().join(n), n).unwrap();
        }

        let (equal, events) = run(&Config::new(s.path(), d.path()));
        assert!(!equal);
        assert_eq!(
            events,
            vec!["src-only a", "dst-only b", "match c", "dst-only d", "src-only e"]
        );
    }

    #[test]
    fn missing_destination_is_empty() {
        let s = tempfile::tempdir().unwrap();
        fs::write(s.path().join("a"), "a").unwrap();

        let (equal, events) = run(&Config::new(s.path(), s.path().join("nope")));
        assert!(!equal);
        assert_eq!(events, vec!["src-only a"]);
    }

    #[test]
    fn subtree_difference_folds_into_parent() {
        let (s, d) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        fs::create_dir_all(s.path().join("x/y")).unwrap();
        fs::create_dir_all(d.path().join("x/y")).unwrap();
        fs::write(s.path().join("x/y/f"), "1").unwrap();
        fs::write(d.path().join("x/y/f"), "2").unwrap();

        let (equal, events) = run(&Config::new(s.path(), d.path()));
        assert!(!equal);
        assert_eq!(events, vec!["mismatch f"]);
    }

    #[test]
    fn ignored_dirs_are_opaque() {
        let (s, d) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        fs::create_dir(s.path().join("x")).unwrap();
        fs::create_dir(d.path().join("x")).unwrap();
        fs::write(s.path().join("x/only-src"), "1").unwrap();

        let config = Config { ignore_dirs: true, ..Config::new(s.path(), d.path()) };
        let (equal, events) = run(&config);
        assert!(equal);
        assert_eq!(events, vec!["ignored-dir x", "ignored-dir x"]);
    }

    #[test]
    fn forks_filtered_per_side() {
        let (s, d) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        fs::write(s.path().join("._a"), "fork").unwrap();
        fs::write(d.path().join("._b"), "fork").unwrap();

        let config = Config { ignore_forks_src: true, ..Config::new(s.path(), d.path()) };
        let (_, events) = run(&config);
        assert_eq!(events, vec!["dst-only ._b"]);

        let config = Config {
            ignore_forks_src: true,
            ignore_forks_dst: true,
            ..Config::new(s.path(), d.path())
        };
        let (equal, events) = run(&config);
        assert!(equal);
        assert!(events.is_empty());
    }

    #[test]
    fn symlinks_compare_by_target() {
        use std::os::unix::fs::symlink;

        let (s, d) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        symlink("same", s.path().join("l1")).unwrap();
        symlink("same", d.path().join("l1")).unwrap();
        symlink("one", s.path().join("l2")).unwrap();
        symlink("other", d.path().join("l2")).unwrap();

        let (_, events) = run(&Config::new(s.path(), d.path()));
        assert_eq!(events, vec!["match l1", "mismatch l2"]);
    }

    #[test]
    fn follow_symlinks_compares_targets() {
        use std::os::unix::fs::symlink;

        let (s, d) = (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap());
        fs::write(s.path().join("real"), "abc").unwrap();
        symlink(s.path().join("real"), s.path().join("f")).unwrap();
        fs::write(d.path().join("f"), "abc").unwrap();
        fs::write(d.path().join("real"), "abc").unwrap();

        let (_, events) = run(&Config::new(s.path(), d.path()));
        assert_eq!(events, vec!["type f", "match real"]);

        let config = Config { follow_symlinks: true, ..Config::new(s.path(), d.path()) };
        let (equal, events) = run(&config);
        assert!(equal);
        assert_eq!(events, vec!["match f", "match real"]);
    }

    /// Lists like [`LocalFs`] but reports `gone` as vanished on the chosen sides.
    struct Vanishing {
        gone: &'static str,
        dirs: Vec<std::path::PathBuf>,
    }

    impl FileSystem for Vanishing {
        fn list_dir(&self, dir: &Path, follow: bool) -> Result<Vec<Entry>, TreesyncError> {
            let mut entries = LocalFs.list_dir(dir, follow)?;
            if self.dirs.iter().any(|d| d == dir) {
                for e in entries.iter_mut().filter(|e| e.name == self.gone) {
                    *e = Entry::vanished(e.path.clone(), e.name.clone());
                }
            }
            Ok(entries)
        }
        fn stat(&self, path: &Path, follow: bool) -> Result<Option<Entry>, TreesyncError> {
            LocalFs.stat(path, follow)
        }
        fn read_file(&self, path: &Path) -> Result<Vec<u8>, TreesyncError> {
            LocalFs.read_file(path)
        }
        fn create_dir_all(&self, dir: &Path) -> Result<(), TreesyncError> {
            LocalFs.create_dir_all(dir)
        }
        fn copy(&self, src: &Entry, dst: &Path, options: CopyOptions) -> Result<(), TreesyncError> {
            LocalFs.copy(src, dst, options)
        }
        fn remove(&self, path: &Path) -> Result<(), TreesyncError> {
            LocalFs.remove(path)
        }
        fn set_mtime(&self, path: &Path, mtime: std::time::SystemTime) -> Result<(), TreesyncError> {
            LocalFs.set_mtime(path, mtime)
        }
    }

    fn run_vanishing(config: &Config, fs: &Vanishing) -> (bool, Vec<String>) {
        let mut rec = Recorder::default();
        let equal = TreeDiff::new(config, fs).process(&mut rec).unwrap();
        (equal, rec.0)
    }

    #[test]
    fn one_sided_vanished_entry_is_ignored() {
        let s = tempfile::tempdir().unwrap();
        let d = tempfile::tempdir().unwrap();
        fs::write(s.path().join("ghost"), "x").unwrap();
        fs::write(d.path().join("phantom"), "x").unwrap();
        let config = Config::new(s.path(), d.path());

        let src_side = Vanishing { gone: "ghost", dirs: vec![s.path().to_path_buf()] };
        assert_eq!(run_vanishing(&config, &src_side), (false, vec!["dst-only phantom".to_owned()]));

        let dst_side = Vanishing { gone: "phantom", dirs: vec![d.path().to_path_buf()] };
        assert_eq!(run_vanishing(&config, &dst_side), (false, vec!["src-only ghost".to_owned()]));

        fs::remove_file(d.path().join("phantom")).unwrap();
        assert_eq!(run_vanishing(&config, &src_side), (true, vec!["ignored ghost".to_owned()]));
    }

    #[test]
    fn vanished_pair_is_ignored() {
        let s = tempfile::tempdir().unwrap();
        let d = tempfile::tempdir().unwrap();
        fs::write(s.path().join("f"), "a").unwrap();
        fs::write(d.path().join("f"), "different").unwrap();
        let config = Config::new(s.path(), d.path());

        let dst_side = Vanishing { gone: "f", dirs: vec![d.path().to_path_buf()] };
        assert_eq!(
            run_vanishing(&config, &dst_side),
            (true, vec!["ignored f".to_owned(), "ignored f".to_owned()])
        );

        let both = Vanishing { gone: "f", dirs: vec![s.path().to_path_buf(), d.path().to_path_buf()] };
        assert_eq!(
            run_vanishing(&config, &both),
            (true, vec!["ignored f".to_owned(), "ignored f".to_owned()])
        );
    }

    #[test]
    fn sockets_match_unless_specials_ignored() {
        let s = tempfile::tempdir().unwrap();
        let d = tempfile::tempdir().unwrap();
        let _a = std::os::unix::net::UnixListener::bind(s.path().join("sock")).unwrap();
        let _b = std::os::unix::net::UnixListener::bind(d.path().join("sock")).unwrap();

        let config = Config::new(s.path(), d.path());
        assert_eq!(run(&config), (true, vec!["match sock".to_owned()]));

        let config = Config { ignore_special: true, ..config };
        assert_eq!(
            run(&config),
            (true, vec!["ignored sock".to_owned(), "ignored sock".to_owned()])
        );
    }

    #[test]
    fn normalization_collision_is_reported() {
        let s = tempfile::tempdir().unwrap();
        let d = tempfile::tempdir().unwrap();
        fs::write(s.path().join("caf\u{e9}"), "1").unwrap();
        fs::write(s.path().join("cafe\u{301}"), "2").unwrap();

        let config = Config { normalize_filenames: true, ..Config::new(s.path(), d.path()) };
        let err = TreeDiff::new(&config, &LocalFs)
            .process(&mut Recorder::default())
            .unwrap_err();
        assert!(matches!(err, TreesyncError::NameCollision { .. }));
    }
}
