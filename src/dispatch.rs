use std::path::Path;

use tracing::debug;

use crate::compare::Event;
use crate::config::Config;
use crate::entry::{classify, Entry, EntryKind};
use crate::error::TreesyncError;
use crate::names::is_fork;
use crate::report::Diagnostics;
use crate::traits::{CopyOptions, FileSystem, Handler};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Turns classification events into output lines and tree mutations,
/// according to the configured modes.
///
/// Every mutation goes through [`Diagnostics`], which suppresses it in dummy
/// mode while still logging exactly what a real run would log.
pub struct Dispatcher<'a, 's> {
    config: &'a Config,
    fs:     &'a dyn FileSystem,
    diag:   &'a mut Diagnostics<'s>,
}

/// How one recursive copy behaves.
#[derive(Clone, Copy)]
struct CopyPlan<'p> {
    /// Verbose line prefix, e.g. `Copying (new)`.
    action:    &'p str,
    /// Replace whatever is at the destination.
    overwrite: bool,
    /// Which side's fork filter applies to the copied subtree.
    src_side:  bool,
}

impl<'a, 's> Dispatcher<'a, 's> {
    pub fn new(config: &'a Config, fs: &'a dyn FileSystem, diag: &'a mut Diagnostics<'s>) -> Self {
        Self { config, fs, diag }
    }

    fn kind(&self, entry: &Entry) -> EntryKind {
        classify(entry, self.config.follow_symlinks)
    }

    // ── Event handlers ────────────────────────────────────────────────────

    fn src_only(&mut self, src: &Entry, dst_dir: &Path) -> Result<(), TreesyncError> {
        self.diag.stats.src_only += 1;
        let modes = self.config.modes;

        if modes.diff {
            self.print_entry(src, true)?;
            let config = self.config;
            if let Some(dir) = &config.copy_ins {
                let plan = CopyPlan { action: "Copying (--copy-ins)", overwrite: true, src_side: true };
                self.export(src, &config.source, dir, "Creating --copy-ins destination dir", plan)?;
            }
        }

        if modes.new {
            let plan = CopyPlan { action: "Copying (new)", overwrite: false, src_side: true };
            self.copy_recursive(src, &dst_dir.join(&src.name), plan)?;
        }
        Ok(())
    }

    fn dst_only(&mut self, dst: &Entry) -> Result<(), TreesyncError> {
        self.diag.stats.dst_only += 1;
        let modes = self.config.modes;

        if modes.diff {
            self.print_entry(dst, false)?;
            let config = self.config;
            if let Some(dir) = &config.copy_del {
                let plan = CopyPlan { action: "Copying (--copy-del)", overwrite: true, src_side: false };
                self.export(dst, &config.destination, dir, "Creating --copy-del destination dir", plan)?;
            }
        }

        if modes.delete {
            self.remove_recursive(dst, "Deleting")?;
        }
        Ok(())
    }

    fn matched(&mut self, src: &Entry, dst: &Entry) -> Result<(), TreesyncError> {
        self.diag.stats.matches += 1;
        let modes = self.config.modes;

        if modes.diff && self.config.show_matches {
            let line = format!(
                "= {} {} and {} {}",
                self.kind(src),
                src.path.display(),
                self.kind(dst),
                dst.path.display()
            );
            self.diag.line(&line);
        }

        // Content is equal, only the timestamp can be behind. A symlink's own
        // mtime cannot be set without touching its target.
        if modes.update
            && self.config.preserve_mtime
            && !self.config.ignore_mtime
            && self.kind(src) != EntryKind::Symlink
            && is_newer(src, dst)
        {
            if self.diag.at(1) {
                let line = format!(
                    "Updating mtime {} {} -> {}",
                    self.kind(src),
                    src.path.display(),
                    dst.path.display()
                );
                self.diag.line(&line);
            }
            self.diag.stats.mtimes_updated += 1;
            if !self.diag.is_dummy() {
                if let Some(mtime) = src.mtime {
                    self.fs.set_mtime(&dst.path, mtime)?;
                }
            }
        }
        Ok(())
    }

    fn mismatched(&mut self, src: &Entry, dst: &Entry) -> Result<(), TreesyncError> {
        self.diag.stats.mismatches += 1;
        let modes = self.config.modes;

        if modes.diff {
            let (src_info, dst_info) = mismatch_detail(self.kind(src), src, dst);
            let line = format!(
                "Diff: {} {}{} and {} {}{}",
                self.kind(src),
                src.path.display(),
                src_info,
                self.kind(dst),
                dst.path.display(),
                dst_info
            );
            self.diag.line(&line);
        }

        // Never clobber a destination that is legitimately newer.
        if modes.update && (self.config.ignore_mtime || is_newer(src, dst)) {
            let plan = CopyPlan { action: "Copying (update)", overwrite: true, src_side: true };
            self.copy_recursive(src, &dst.path, plan)?;
        } else if modes.update {
            debug!(dst = %dst.path.display(), "destination not older, keeping it");
        }
        Ok(())
    }

    fn type_mismatched(&mut self, src: &Entry, dst: &Entry) -> Result<(), TreesyncError> {
        self.diag.stats.type_mismatches += 1;
        let modes = self.config.modes;

        if modes.diff {
            let line = format!(
                "Type mismatch: {} {} and {} {}",
                self.kind(src),
                src.path.display(),
                self.kind(dst),
                dst.path.display()
            );
            self.diag.line(&line);
        }

        if modes.update {
            let plan = CopyPlan { action: "Copying (type mismatch)", overwrite: true, src_side: true };
            self.copy_recursive(src, &dst.path, plan)?;
        }
        Ok(())
    }

    fn ignored(&mut self, entry: &Entry, dir: bool) {
        self.diag.stats.ignored += 1;
        if self.config.modes.diff || self.diag.at(1) {
            let line = if dir {
                format!("Ignoring dir {}", entry.path.display())
            } else {
                format!("Ignoring {} {}", self.kind(entry), entry.path.display())
            };
            self.diag.line(&line);
        }
    }

    // ── Output ────────────────────────────────────────────────────────────

    /// Print a `+`/`-` line for `entry`, and for its whole subtree when
    /// `show_subtree` is set.
    fn print_entry(&mut self, entry: &Entry, src_side: bool) -> Result<(), TreesyncError> {
        let marker = if src_side { '+' } else { '-' };
        let line = format!("{marker} {} {}", self.kind(entry), entry.path.display());
        if src_side {
            self.diag.inserted(&line);
        } else {
            self.diag.removed(&line);
        }

        if self.config.show_subtree && self.kind(entry) == EntryKind::Dir {
            for child in self.children(&entry.path, src_side)? {
                self.print_entry(&child, src_side)?;
            }
        }
        Ok(())
    }

    // ── Primitives ────────────────────────────────────────────────────────

    /// Create `dir` and its missing parents, unless it already is a directory.
    pub(crate) fn mk_dirs(&mut self, dir: &Path, action: &str) -> Result<(), TreesyncError> {
        match self.diag.kind_at(self.fs, dir, false)? {
            Some(EntryKind::Dir) => return Ok(()),
            Some(_) => return Err(TreesyncError::NotADirectory(dir.to_path_buf())),
            None => {}
        }

        if self.diag.at(1) {
            let line = format!("{action} {}", dir.display());
            self.diag.line(&line);
        }
        self.diag.stats.dirs_created += 1;

        // Every ancestor that is missing now will exist afterwards.
        let mut missing = vec![dir];
        for parent in dir.ancestors().skip(1) {
            if parent.as_os_str().is_empty() || self.diag.kind_at(self.fs, parent, false)?.is_some() {
                break;
            }
            missing.push(parent);
        }

        if !self.diag.is_dummy() {
            self.fs.create_dir_all(dir)?;
        }
        for path in missing {
            self.diag.note_created(path, EntryKind::Dir);
        }
        Ok(())
    }

    /// Remove `entry` and everything below it, children before parents.
    fn remove_recursive(&mut self, entry: &Entry, action: &str) -> Result<(), TreesyncError> {
        if entry.kind == EntryKind::NonExisting {
            return Ok(());
        }

        // Never descend through a symlink.
        if entry.kind == EntryKind::Dir && self.physically_exists(&entry.path)? {
            let mut children = self.fs.list_dir(&entry.path, self.config.follow_symlinks)?;
            children.sort_by(|a, b| a.name.cmp(&b.name));
            for child in &children {
                self.remove_recursive(child, action)?;
            }
        }

        if self.diag.at(1) {
            let line = format!("{action} {} {}", self.kind(entry), entry.path.display());
            self.diag.line(&line);
        }
        self.diag.stats.deleted += 1;
        if !self.diag.is_dummy() {
            self.fs.remove(&entry.path)?;
        }
        self.diag.note_removed(&entry.path);
        Ok(())
    }

    /// Copy `src` to `dst`, recursing into directories.
    ///
    /// A plain overwrite can only replace a regular file with a regular file.
    /// Whenever either side is anything else, the destination is removed
    /// recursively first.
    fn copy_recursive(&mut self, src: &Entry, dst: &Path, plan: CopyPlan<'_>) -> Result<(), TreesyncError> {
        if src.kind == EntryKind::NonExisting
            || (self.config.ignores_forks(plan.src_side) && is_fork(&src.name))
        {
            return Ok(());
        }

        let follow = self.config.follow_symlinks;
        let src_kind = self.kind(src);

        if plan.overwrite {
            if let Some(existing) = self.diag.kind_at(self.fs, dst, false)? {
                if src_kind != EntryKind::Regular || existing != EntryKind::Regular {
                    let victim = match self.fs.stat(dst, false)? {
                        Some(e) => e,
                        // Only exists in this dummy run's imagination.
                        None => Entry { kind: existing, ..Entry::vanished(dst.to_path_buf(), src.name.clone()) },
                    };
                    self.remove_recursive(&victim, &format!("{}: Deleting", plan.action))?;
                }
            }
        }

        if src_kind == EntryKind::Dir {
            self.mk_dirs(dst, &format!("{}: Creating dir", plan.action))?;
            for child in self.children(&src.path, plan.src_side)? {
                self.copy_recursive(&child, &dst.join(&child.name), plan)?;
            }
            return Ok(());
        }

        if self.diag.at(1) {
            let line = format!(
                "{} {} {} -> {}",
                plan.action,
                src_kind,
                src.path.display(),
                dst.display()
            );
            self.diag.line(&line);
        }
        self.diag.stats.copied += 1;

        if !self.diag.is_dummy() {
            let options = CopyOptions { overwrite: plan.overwrite, follow_symlinks: follow };
            self.fs.copy(src, dst, options)?;
            if self.config.preserve_mtime && src_kind == EntryKind::Regular {
                if let Some(mtime) = src.mtime {
                    self.fs.set_mtime(dst, mtime)?;
                }
            }
        }
        self.diag.note_created(dst, src_kind);
        Ok(())
    }

    /// Copy `entry` into an export directory during diff, keeping its path
    /// relative to the tree it came from.
    fn export(
        &mut self,
        entry: &Entry,
        root: &Path,
        export_dir: &Path,
        create_action: &str,
        plan: CopyPlan<'_>,
    ) -> Result<(), TreesyncError> {
        let relative = entry
            .path
            .strip_prefix(root)
            .unwrap_or_else(|_| Path::new(&entry.name));
        let target = export_dir.join(relative);

        let parent = target.parent().unwrap_or(export_dir);
        self.mk_dirs(parent, create_action)?;
        self.copy_recursive(entry, &target, plan)
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    /// Children of `dir` in name order, minus forks filtered on that side.
    fn children(&self, dir: &Path, src_side: bool) -> Result<Vec<Entry>, TreesyncError> {
        let skip_forks = self.config.ignores_forks(src_side);
        let mut children: Vec<Entry> = self
            .fs
            .list_dir(dir, self.config.follow_symlinks)?
            .into_iter()
            .filter(|e| !(skip_forks && is_fork(&e.name)))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    fn physically_exists(&self, path: &Path) -> Result<bool, TreesyncError> {
        if !self.diag.is_dummy() {
            return Ok(true);
        }
        Ok(self.fs.stat(path, false)?.is_some())
    }
}

impl Handler for Dispatcher<'_, '_> {
    fn on_event(&mut self, event: Event<'_>) -> Result<(), TreesyncError> {
        match event {
            Event::ProgressDirs { src, dst } => {
                if self.diag.at(2) {
                    let line = format!("Processing dirs {} and {}", src.display(), dst.display());
                    self.diag.line(&line);
                }
                Ok(())
            }
            Event::ProgressFiles { src, dst } => {
                if self.diag.at(3) {
                    let line = format!(
                        "Processing {} {} and {} {}",
                        self.kind(src),
                        src.path.display(),
                        self.kind(dst),
                        dst.path.display()
                    );
                    self.diag.line(&line);
                }
                Ok(())
            }
            Event::SrcOnly { src, dst_dir }  => self.src_only(src, dst_dir),
            Event::DstOnly { dst, .. }       => self.dst_only(dst),
            Event::Match { src, dst }        => self.matched(src, dst),
            Event::Mismatch { src, dst }     => self.mismatched(src, dst),
            Event::TypeMismatch { src, dst } => self.type_mismatched(src, dst),
            Event::IgnoredDir(entry) => {
                self.ignored(entry, true);
                Ok(())
            }
            Event::IgnoredFile(entry) => {
                self.ignored(entry, false);
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Source strictly newer than destination. Unknown mtimes never count as newer.
fn is_newer(src: &Entry, dst: &Entry) -> bool {
    match (src.mtime, dst.mtime) {
        (Some(s), Some(d)) => s > d,
        _ => false,
    }
}

/// Trailing detail for the two halves of a `Diff:` line.
fn mismatch_detail(kind: EntryKind, src: &Entry, dst: &Entry) -> (String, String) {
    match kind {
        EntryKind::Symlink => (
            format!(" -> \"{}\"", link_target(src)),
            format!(" -> \"{}\"", link_target(dst)),
        ),
        EntryKind::Block | EntryKind::Char => match (src.device, dst.device) {
            (Some(s), Some(d)) => (
                String::new(),
                format!(" (device {}:{} != {}:{})", s.major, s.minor, d.major, d.minor),
            ),
            _ => (String::new(), String::new()),
        },
        _ if src.size != dst.size => (
            String::new(),
            format!(" (size {} != {})", src.size, dst.size),
        ),
        _ => (String::new(), " (same size, different content)".to_owned()),
    }
}

fn link_target(entry: &Entry) -> String {
    entry
        .link_target
        .as_deref()
        .map(|t| t.display().to_string())
        .unwrap_or_default()
}
