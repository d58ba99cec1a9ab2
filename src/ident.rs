//! The emulated identity: effective uid/gid, umask and mode checks.

use crate::node::{Inode, S_ISVTX};

/// Requested right: read.
pub(crate) const R_OK: u32 = 4;
/// Requested right: write.
pub(crate) const W_OK: u32 = 2;
/// Requested right: execute / search.
pub(crate) const X_OK: u32 = 1;

/// The effective identity checks are made against.
///
/// Defaults to the host's real uid and gid so that files created by the
/// engine look owned by the test process, exactly as on a real filesystem.
#[derive(Debug, Clone)]
pub(crate) struct Identity {
    pub uid: u32,
    pub gid: u32,
    /// Supplementary groups consulted for the group-bits check.
    pub groups: Vec<u32>,
    /// Whether uid 0 bypasses mode checks the way POSIX root does.
    pub allow_root: bool,
}

impl Identity {
    pub(crate) fn host(allow_root: bool) -> Identity {
        Identity {
            uid: host_uid(),
            gid: host_gid(),
            groups: Vec::new(),
            allow_root,
        }
    }

    pub(crate) fn is_root(&self) -> bool {
        self.uid == 0 && self.allow_root
    }

    pub(crate) fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }

    /// Whether this identity holds the rights in `want` (an `R/W/X` mask)
    /// on the inode.
    ///
    /// Owner bits apply if the uid matches, group bits if the gid matches
    /// or appears in the supplementary list, other bits otherwise. Root
    /// bypasses read and write checks entirely and passes execute when any
    /// execute bit is set.
    pub(crate) fn check(&self, inode: &Inode, want: u32) -> bool {
        if self.is_root() {
            if want & X_OK != 0 && !inode.is_dir() {
                return inode.perm() & 0o111 != 0;
            }
            return true;
        }
        let perm = inode.perm();
        let granted = if self.uid == inode.uid {
            (perm >> 6) & 7
        } else if self.in_group(inode.gid) {
            (perm >> 3) & 7
        } else {
            perm & 7
        };
        granted & want == want
    }

    /// The sticky-bit deletion rule: removing an entry from a sticky
    /// directory requires owning either the directory or the entry.
    pub(crate) fn may_delete_from(&self, parent: &Inode, entry: &Inode) -> bool {
        if self.is_root() {
            return true;
        }
        if parent.perm() & S_ISVTX == 0 {
            return true;
        }
        self.uid == parent.uid || self.uid == entry.uid
    }
}

#[cfg(unix)]
pub(crate) fn host_uid() -> u32 {
    // SAFETY: getuid has no preconditions and cannot fail.
    unsafe { libc::getuid() }
}

#[cfg(unix)]
pub(crate) fn host_gid() -> u32 {
    // SAFETY: getgid has no preconditions and cannot fail.
    unsafe { libc::getgid() }
}

#[cfg(not(unix))]
pub(crate) fn host_uid() -> u32 {
    1
}

#[cfg(not(unix))]
pub(crate) fn host_gid() -> u32 {
    1
}
