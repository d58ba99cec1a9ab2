//! Mount points: device-id scopes with per-mount disk budgets.

use crate::error::{Fault, FsError, FsResult};
use crate::node::NodeId;
use crate::profile::Profile;

/// The total size reported for mounts created without an explicit budget.
pub(crate) const DEFAULT_TOTAL_SIZE: u64 = 1024 * 1024 * 1024 * 1024;

/// Disk usage of a mount, as returned by `disk_usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct Mount {
    /// Absolute, normalized mount path.
    pub path: String,
    /// The root directory inode of this mount.
    pub root: NodeId,
    pub dev: u64,
    /// Byte budget; `None` means effectively unlimited.
    pub total: Option<u64>,
    pub used: u64,
}

impl Mount {
    pub(crate) fn usage(&self) -> DiskUsage {
        let total = self.total.unwrap_or(DEFAULT_TOTAL_SIZE);
        DiskUsage {
            total,
            used: self.used,
            free: total.saturating_sub(self.used),
        }
    }
}

/// All mounts of one filesystem instance.
///
/// Lookup picks the mount with the longest matching path prefix, so nested
/// mounts shadow their parent.
#[derive(Debug, Clone)]
pub(crate) struct MountTable {
    mounts: Vec<Mount>,
    next_dev: u64,
}

impl MountTable {
    pub(crate) fn new() -> MountTable {
        MountTable {
            mounts: Vec::new(),
            next_dev: 1,
        }
    }

    /// Register a mount rooted at `root` and return its device id.
    pub(crate) fn add(&mut self, path: String, root: NodeId, total: Option<u64>) -> u64 {
        let dev = self.next_dev;
        self.next_dev += 1;
        self.mounts.push(Mount {
            path,
            root,
            dev,
            total,
            used: 0,
        });
        dev
    }

    /// The mount whose root directory is `node`, if any.
    pub(crate) fn index_of_root(&self, node: NodeId) -> Option<usize> {
        self.mounts.iter().position(|m| m.root == node)
    }

    pub(crate) fn index_of_dev(&self, dev: u64) -> Option<usize> {
        self.mounts.iter().position(|m| m.dev == dev)
    }

    pub(crate) fn get(&self, idx: usize) -> &Mount {
        &self.mounts[idx]
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> &mut Mount {
        &mut self.mounts[idx]
    }

    /// Reserve `delta` additional bytes on a mount, failing with the
    /// disk-full fault when the budget would be exceeded. Negative deltas
    /// always succeed and release bytes.
    pub(crate) fn change_used(&mut self, p: &Profile, idx: usize, delta: i64) -> FsResult<()> {
        let mount = &mut self.mounts[idx];
        if delta >= 0 {
            let delta = delta as u64;
            if let Some(total) = mount.total {
                if mount.used.saturating_add(delta) > total {
                    return Err(FsError::new(Fault::NoSpace, p.os, None));
                }
            }
            mount.used += delta;
        } else {
            mount.used = mount.used.saturating_sub((-delta) as u64);
        }
        Ok(())
    }
}
