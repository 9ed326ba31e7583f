use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// A single directory child as seen by one listing scan.
///
/// Entries are produced fresh by [`FileSystem::list_dir`](crate::FileSystem::list_dir)
/// and never cached across runs. Size, mtime and device numbers describe the
/// symlink target when the listing followed symlinks and the target exists,
/// otherwise the entry itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Full path to the entry.
    pub path: PathBuf,

    /// Raw filename, exactly as listed.
    pub name: OsString,

    /// Kind of the entry itself, without following symlinks.
    pub kind: EntryKind,

    /// For symlinks: kind of what the link points at.
    /// `None` when the link is dangling or the listing did not follow links.
    pub target_kind: Option<EntryKind>,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time, when the platform reports one.
    pub mtime: Option<SystemTime>,

    /// Link target string, for symlinks.
    pub link_target: Option<PathBuf>,

    /// Device numbers, for block and char devices.
    pub device: Option<DeviceId>,
}

impl Entry {
    /// An entry that vanished between listing and stat.
    pub fn vanished(path: PathBuf, name: OsString) -> Self {
        Self {
            path,
            name,
            kind: EntryKind::NonExisting,
            target_kind: None,
            size: 0,
            mtime: None,
            link_target: None,
            device: None,
        }
    }

    /// Shorthand for [`classify`] on this entry.
    pub fn kind_with(&self, follow_symlinks: bool) -> EntryKind {
        classify(self, follow_symlinks)
    }
}

/// The kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file.
    Regular,

    /// A directory.
    Dir,

    /// A symbolic link.
    Symlink,

    /// A named pipe.
    Fifo,

    /// A unix domain socket.
    Socket,

    /// A block device.
    Block,

    /// A character device.
    Char,

    /// Listed, but gone by the time it was stat'ed.
    NonExisting,
}

impl EntryKind {
    /// Short name used in every output line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular     => "file",
            Self::Dir         => "dir",
            Self::Symlink     => "symlink",
            Self::Fifo        => "fifo",
            Self::Socket      => "socket",
            Self::Block       => "blockdev",
            Self::Char        => "chardev",
            Self::NonExisting => "nonexisting",
        }
    }

    /// Map a `std` file type to a kind.
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        use std::os::unix::fs::FileTypeExt;

        if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_dir() {
            Self::Dir
        } else if ft.is_file() {
            Self::Regular
        } else if ft.is_fifo() {
            Self::Fifo
        } else if ft.is_socket() {
            Self::Socket
        } else if ft.is_block_device() {
            Self::Block
        } else if ft.is_char_device() {
            Self::Char
        } else {
            Self::NonExisting
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Major/minor device numbers of a block or char device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub major: u32,
    pub minor: u32,
}

impl DeviceId {
    /// Split a raw `st_rdev` using the Linux/glibc encoding.
    pub fn from_rdev(rdev: u64) -> Self {
        let major = ((rdev >> 32) & 0xffff_f000) | ((rdev >> 8) & 0x0000_0fff);
        let minor = ((rdev >> 12) & 0xffff_ff00) | (rdev & 0x0000_00ff);
        Self {
            major: major as u32,
            minor: minor as u32,
        }
    }
}

/// Classify an entry.
///
/// With `follow_symlinks`, a symlink reports the kind of its target. A dangling
/// link cannot be dereferenced and stays [`EntryKind::Symlink`]. Without it, a
/// symlink is always [`EntryKind::Symlink`] whatever it points at.
pub fn classify(entry: &Entry, follow_symlinks: bool) -> EntryKind {
    match (entry.kind, follow_symlinks, entry.target_kind) {
        (EntryKind::Symlink, true, Some(target)) => target,
        (kind, _, _) => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symlink_to(target: Option<EntryKind>) -> Entry {
        Entry {
            kind: EntryKind::Symlink,
            target_kind: target,
            link_target: Some("elsewhere".into()),
            ..Entry::vanished("a/link".into(), "link".into())
        }
    }

    #[test]
    fn symlink_reported_as_symlink_without_follow() {
        let e = symlink_to(Some(EntryKind::Dir));
        assert_eq!(classify(&e, false), EntryKind::Symlink);
    }

    #[test]
    fn symlink_reports_target_kind_with_follow() {
        let e = symlink_to(Some(EntryKind::Dir));
        assert_eq!(classify(&e, true), EntryKind::Dir);
    }

    #[test]
    fn dangling_symlink_stays_symlink() {
        let e = symlink_to(None);
        assert_eq!(classify(&e, true), EntryKind::Symlink);
    }

    #[test]
    fn vanished_entry_is_non_existing() {
        let e = Entry::vanished("gone".into(), "gone".into());
        assert_eq!(classify(&e, true), EntryKind::NonExisting);
        assert_eq!(e.kind.as_str(), "nonexisting");
    }

    #[test]
    fn rdev_split() {
        // makedev(8, 1) == /dev/sda1
        let dev = DeviceId::from_rdev((8 << 8) | 1);
        assert_eq!(dev, DeviceId { major: 8, minor: 1 });

        // makedev(259, 0x12345): minor spills into the high bits
        let big = DeviceId::from_rdev(0x1231_0345);
        assert_eq!(big, DeviceId { major: 259, minor: 0x12345 });
    }
}
