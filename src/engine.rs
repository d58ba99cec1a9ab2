//! The filesystem engine: all state for one fake filesystem instance and
//! the operations the shims are built on.
//!
//! Every operation is synchronous and atomic at the engine boundary.
//! Callers reach the engine either through an [`FsHandle`] or through the
//! current-instance context; both serialize on the engine mutex.
//!
//! [`FsHandle`]: crate::FsHandle

use crate::config::Config;
use crate::error::{Fault, FsError, FsResult};
use crate::fd::{self, FdTable, OpenFile, TextMode};
use crate::ident::{Identity, R_OK, W_OK, X_OK};
use crate::mount::{DiskUsage, MountTable};
use crate::node::{
    DirEnt, DirNode, Encoding, FileContent, FileNode, NodeData, NodeId, NodeTable, SymlinkNode,
    PERM_DEF_DIR, PERM_DEF_FILE, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG,
};
use crate::path;
use crate::profile::Profile;
use crate::TRACING_TARGET;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::SeekFrom;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Windows file-attribute bits synthesized for stat results.
const FILE_ATTRIBUTE_READONLY: u32 = 0x0001;
const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x0010;
const FILE_ATTRIBUTE_NORMAL: u32 = 0x0080;
const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0400;
const IO_REPARSE_TAG_SYMLINK: u32 = 0xA000_000C;

/// A stat result with every field the fake filesystem tracks.
///
/// Timestamps are durations since the Unix epoch with nanosecond
/// precision; `file_attributes` and `reparse_tag` are synthesized on the
/// Windows profile only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    pub ino: u64,
    pub dev: u64,
    /// Full mode: type bits plus permission bits.
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub atime: Duration,
    pub mtime: Duration,
    pub ctime: Duration,
    /// Birth time.
    pub crtime: Duration,
    pub file_attributes: Option<u32>,
    pub reparse_tag: Option<u32>,
}

impl Stat {
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// Permission bits without the type flag.
    pub fn perm(&self) -> u32 {
        self.mode & 0o7777
    }
}

/// One entry yielded by a directory scan.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    /// Decoded entry name.
    pub name: String,
    /// The name in the profile's filesystem encoding.
    pub encoded: Vec<u8>,
    pub ino: u64,
    pub is_dir: bool,
    pub is_file: bool,
    pub is_symlink: bool,
}

/// How a file should be opened; consumed by [`Fs::open`].
#[derive(Debug, Clone, Default)]
pub(crate) struct OpenRequest {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
    /// Permission bits for a newly created file, before the umask.
    pub mode: u32,
    /// Fail instead of following a trailing symlink.
    pub nofollow: bool,
    pub text: Option<TextMode>,
}

/// The state of one fake filesystem instance.
#[derive(Clone)]
pub(crate) struct Fs {
    pub(crate) profile: Profile,
    pub(crate) config: Config,
    pub(crate) nodes: NodeTable,
    pub(crate) mounts: MountTable,
    pub(crate) fds: FdTable,
    pub(crate) ident: Identity,
    pub(crate) umask: u32,
    pub(crate) cwd: String,
    /// The directory all walks start from. On POSIX this is the root
    /// mount's root; on Windows it anchors the drive entries.
    pub(crate) super_root: NodeId,
    /// The shared null sink device.
    pub(crate) dev_null: NodeId,
    pub(crate) rng: SmallRng,
    pub(crate) paused: bool,
}

impl Fs {
    pub(crate) fn new(config: Config) -> Fs {
        let profile = Profile::new(
            config.os,
            config.case_sensitive,
            config.path_separator,
            config.alternative_path_separator,
        );
        let ident = {
            let mut ident = Identity::host(config.allow_root_user);
            if let Some(uid) = config.uid {
                ident.uid = uid;
            }
            if let Some(gid) = config.gid {
                ident.gid = gid;
            }
            ident
        };
        let rng = match config.rng_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let mut fs = Fs {
            profile,
            umask: config.umask,
            ident,
            rng,
            config,
            nodes: NodeTable::new(),
            mounts: MountTable::new(),
            fds: FdTable::new(),
            cwd: String::new(),
            super_root: NodeId(0),
            dev_null: NodeId(0),
            paused: false,
        };
        fs.reset();
        fs
    }

    /// Discard the whole tree and rebuild the initial state: fresh arena
    /// and mounts, the temp directory convention, and the null device.
    pub(crate) fn reset(&mut self) {
        self.nodes = NodeTable::new();
        self.mounts = MountTable::new();
        self.fds = FdTable::new();
        let now = self.now();

        let (uid, gid) = (self.ident.uid, self.ident.gid);
        if self.profile.is_windows() {
            // A synthetic anchor holding the drive roots; not itself part
            // of any mount.
            self.super_root = self.nodes.alloc(
                NodeData::Dir(DirNode::default()),
                PERM_DEF_DIR,
                uid,
                gid,
                0,
                now,
            );
            let drive = self.profile.default_drive();
            self.add_drive(&drive, self.config.root_total_size);
        } else {
            self.super_root = self.nodes.alloc(
                NodeData::Dir(DirNode::default()),
                PERM_DEF_DIR,
                uid,
                gid,
                0,
                now,
            );
            let dev = self
                .mounts
                .add(self.profile.root_path(), self.super_root, self.config.root_total_size);
            self.nodes.get_mut(self.super_root).dev = dev;
        }
        self.cwd = self.profile.root_path();

        self.dev_null = self.nodes.alloc(NodeData::Device, 0o666, uid, gid, 1, now);
        if !self.profile.is_windows() {
            // The null device is reachable as a real tree entry on POSIX.
            let _ = self.ensure_dirs("/dev");
            if let Ok(lookup) = self.lookup_path("/dev/null", false) {
                if lookup.existing.is_none() {
                    self.insert_entry(lookup.parent, "null", self.dev_null);
                }
            }
        }

        let temp = self.profile.temp_dir();
        let _ = self.ensure_dirs(&temp);

        tracing::trace!(target: TRACING_TARGET, os = ?self.profile.os, "filesystem reset");
    }

    /// Register a drive mount, e.g. `C:`, under the Windows anchor.
    pub(crate) fn add_drive(&mut self, drive: &str, total: Option<u64>) -> NodeId {
        let now = self.now();
        let root = self.nodes.alloc(
            NodeData::Dir(DirNode {
                entries: indexmap::IndexMap::new(),
                parent: Some(self.super_root),
            }),
            PERM_DEF_DIR,
            self.ident.uid,
            self.ident.gid,
            0,
            now,
        );
        let canonical = {
            let mut d = drive.to_uppercase();
            d.push(self.profile.sep);
            d
        };
        let dev = self.mounts.add(canonical, root, total);
        self.nodes.get_mut(root).dev = dev;
        let name = drive.to_uppercase();
        self.insert_entry(self.super_root, &name, root);
        tracing::trace!(target: TRACING_TARGET, drive = %name, "drive mounted");
        root
    }

    pub(crate) fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
    }

    pub(crate) fn err(&self, kind: Fault, path: impl Into<Option<String>>) -> FsError {
        FsError::new(kind, self.profile.os, path)
    }

    // --- entry bookkeeping -------------------------------------------------

    /// Add a directory entry, maintaining parent metadata.
    pub(crate) fn insert_entry(&mut self, parent: NodeId, name: &str, child: NodeId) {
        let encoded = path::encode(&self.profile, name);
        let now = self.now();
        let child_is_dir = self.nodes.get(child).is_dir();
        let parent_node = self.nodes.get_mut(parent);
        if let Some(dir) = parent_node.as_dir_mut() {
            dir.entries
                .insert(name.to_string(), DirEnt { node: child, encoded });
        }
        parent_node.times.mtime = now;
        parent_node.times.ctime = now;
        if child_is_dir {
            parent_node.nlink += 1;
            let dev = parent_node.dev;
            let child_node = self.nodes.get_mut(child);
            if let Some(dir) = child_node.as_dir_mut() {
                dir.parent = Some(parent);
            }
            if child_node.dev == 0 {
                child_node.dev = dev;
            }
        }
    }

    /// Remove a directory entry, maintaining parent metadata.
    pub(crate) fn remove_entry(&mut self, parent: NodeId, stored_name: &str) -> Option<NodeId> {
        let now = self.now();
        let parent_node = self.nodes.get_mut(parent);
        let removed = parent_node
            .as_dir_mut()
            .and_then(|d| d.entries.shift_remove(stored_name))?;
        parent_node.times.mtime = now;
        parent_node.times.ctime = now;
        if self.nodes.get(removed.node).is_dir() {
            self.nodes.get_mut(parent).nlink -= 1;
        }
        Some(removed.node)
    }

    /// Release an inode's storage once neither links nor descriptors hold
    /// it.
    pub(crate) fn maybe_free(&mut self, id: NodeId) {
        let node = self.nodes.get(id);
        if node.nlink > 0 || node.open_count > 0 {
            return;
        }
        let size = match &node.data {
            NodeData::File(f) => f.content.size(),
            _ => 0,
        };
        let dev = node.dev;
        if size > 0 {
            if let Some(idx) = self.mounts.index_of_dev(dev) {
                let _ = self.mounts.change_used(&self.profile, idx, -(size as i64));
            }
        }
        self.nodes.remove(id);
    }

    fn charge(&mut self, dev: u64, delta: i64, path: &str) -> FsResult<()> {
        if delta == 0 {
            return Ok(());
        }
        let Some(idx) = self.mounts.index_of_dev(dev) else {
            return Ok(());
        };
        let at = (!path.is_empty()).then(|| path.to_string());
        self.mounts
            .change_used(&self.profile, idx, delta)
            .map_err(|e| self.err(e.kind(), at))
    }

    fn require(&self, node: NodeId, want: u32, path: &str) -> FsResult<()> {
        if self.ident.check(self.nodes.get(node), want) {
            Ok(())
        } else {
            Err(self.err(Fault::PermissionDenied, path.to_string()))
        }
    }

    fn touch_atime(&mut self, id: NodeId) {
        if self.config.track_atime {
            let now = self.now();
            self.nodes.get_mut(id).times.atime = now;
        }
    }

    fn touch_mtime(&mut self, id: NodeId) {
        let now = self.now();
        let times = &mut self.nodes.get_mut(id).times;
        times.mtime = now;
        times.ctime = now;
    }

    fn touch_ctime(&mut self, id: NodeId) {
        let now = self.now();
        self.nodes.get_mut(id).times.ctime = now;
    }

    // --- filesystem-level creation helpers ---------------------------------

    /// Create a regular file, creating missing parent directories.
    ///
    /// With `mode == None` the default file permissions minus the umask
    /// apply; an explicit mode is used untouched.
    pub(crate) fn create_file(
        &mut self,
        p: &str,
        contents: &[u8],
        mode: Option<u32>,
        encoding: Option<Encoding>,
    ) -> FsResult<NodeId> {
        self.create_file_node(
            p,
            FileContent::Bytes(contents.to_vec()),
            contents.len() as u64,
            mode,
            encoding,
        )
    }

    /// Create a file that reports `size` bytes but holds no contents.
    pub(crate) fn create_file_with_size(&mut self, p: &str, size: u64) -> FsResult<NodeId> {
        self.create_file_node(p, FileContent::Phantom(size), size, None, None)
    }

    pub(crate) fn create_file_node(
        &mut self,
        p: &str,
        content: FileContent,
        size: u64,
        mode: Option<u32>,
        encoding: Option<Encoding>,
    ) -> FsResult<NodeId> {
        let abs = self.prepare(p)?;
        let parent_path = path::dirname(&self.profile, &abs);
        self.ensure_dirs(&parent_path)?;
        let lookup = self.lookup_path(&abs, false)?;
        if lookup.existing.is_some() {
            return Err(self.err(Fault::Exists, abs));
        }
        let perm = mode.unwrap_or(PERM_DEF_FILE & !self.umask);
        let dev = self.nodes.get(lookup.parent).dev;
        self.charge(dev, size as i64, &abs)?;
        let now = self.now();
        let id = self.nodes.alloc(
            NodeData::File(FileNode { content, encoding }),
            perm,
            self.ident.uid,
            self.ident.gid,
            dev,
            now,
        );
        self.insert_entry(lookup.parent, &lookup.name, id);
        Ok(id)
    }

    /// Create a directory and any missing ancestors, failing if the full
    /// path already exists.
    pub(crate) fn create_dir(&mut self, p: &str, mode: Option<u32>) -> FsResult<NodeId> {
        let abs = self.prepare(p)?;
        let parent_path = path::dirname(&self.profile, &abs);
        self.ensure_dirs(&parent_path)?;
        let lookup = self.lookup_path(&abs, false)?;
        if lookup.existing.is_some() || lookup.name.is_empty() {
            return Err(self.err(Fault::Exists, abs));
        }
        self.mkdir_in(lookup.parent, &lookup.name, mode, &abs)
    }

    /// Create any missing directories along `p`; existing ones are fine.
    pub(crate) fn ensure_dirs(&mut self, p: &str) -> FsResult<NodeId> {
        self.ensure_dirs_with_mode(p, PERM_DEF_DIR)
    }

    pub(crate) fn ensure_dirs_with_mode(&mut self, p: &str, mode: u32) -> FsResult<NodeId> {
        let abs = self.prepare(p)?;
        let comps = path::components(&self.profile, &abs);
        let mut built = self.root_anchor();
        let mut cur = self.super_root;
        for (i, comp) in comps.iter().enumerate() {
            if self.profile.is_windows() && i == 0 {
                // The drive root was ensured by prepare().
                built = format!("{comp}{}", self.profile.sep);
                let dir = self.nodes.get(cur).as_dir().expect("anchor is a directory");
                cur = dir
                    .lookup(&self.profile, comp)
                    .map(|(_, id)| id)
                    .ok_or_else(|| self.err(Fault::NotFound, abs.clone()))?;
                continue;
            }
            built = path::join(&self.profile, &built, comp);
            let node = self.nodes.get(cur);
            let dir = node
                .as_dir()
                .ok_or_else(|| self.err(Fault::NotADir, built.clone()))?;
            let found = dir.lookup(&self.profile, comp).map(|(_, id)| id);
            match found {
                Some(id) => {
                    cur = self.follow_to_dir(id, &built)?;
                }
                None => {
                    cur = self.mkdir_in(cur, comp, Some(mode), &built)?;
                }
            }
        }
        if !self.nodes.get(cur).is_dir() {
            return Err(self.err(Fault::Exists, abs));
        }
        Ok(cur)
    }

    /// Chase a symlink chain until a directory, for recursive creation.
    fn follow_to_dir(&self, mut id: NodeId, at: &str) -> FsResult<NodeId> {
        let mut depth = 0;
        loop {
            let node = self.nodes.get(id);
            match &node.data {
                NodeData::Dir(_) => return Ok(id),
                NodeData::Symlink(_) => {
                    depth += 1;
                    if depth > self.profile.max_link_depth {
                        return Err(self.err(Fault::LinkLoop, at.to_string()));
                    }
                    let resolved = self.resolve_path(at, true)?;
                    id = resolved.node;
                }
                _ => return Err(self.err(Fault::NotADir, at.to_string())),
            }
        }
    }

    fn mkdir_in(
        &mut self,
        parent: NodeId,
        name: &str,
        mode: Option<u32>,
        built: &str,
    ) -> FsResult<NodeId> {
        self.require(parent, W_OK | X_OK, built)?;
        let perm = mode.map(|m| m & !self.umask).unwrap_or(PERM_DEF_DIR & !self.umask);
        let dev = self.nodes.get(parent).dev;
        let now = self.now();
        let id = self.nodes.alloc(
            NodeData::Dir(DirNode::default()),
            perm,
            self.ident.uid,
            self.ident.gid,
            dev,
            now,
        );
        self.insert_entry(parent, name, id);
        Ok(id)
    }

    /// Create a symlink, creating missing parent directories.
    pub(crate) fn create_symlink(&mut self, link: &str, target: &str) -> FsResult<NodeId> {
        let abs = self.prepare(link)?;
        let parent_path = path::dirname(&self.profile, &abs);
        self.ensure_dirs(&parent_path)?;
        self.symlink(target, &abs)
    }

    /// Create a hard link, creating missing parent directories.
    pub(crate) fn create_link(&mut self, src: &str, dst: &str) -> FsResult<()> {
        let abs = self.prepare(dst)?;
        let parent_path = path::dirname(&self.profile, &abs);
        self.ensure_dirs(&parent_path)?;
        self.link(src, &abs)
    }

    // --- operation surface -------------------------------------------------

    /// `mkdir`: strict single-level directory creation.
    pub(crate) fn mkdir(&mut self, p: &str, mode: u32) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let lookup = self.lookup_path(&abs, false)?;
        if lookup.existing.is_some() || lookup.name.is_empty() {
            return Err(self.err(Fault::Exists, abs));
        }
        self.mkdir_in(lookup.parent, &lookup.name, Some(mode), &abs)?;
        Ok(())
    }

    /// `rmdir`: remove an empty directory.
    pub(crate) fn rmdir(&mut self, p: &str) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let lookup = self.lookup_path(&abs, false)?;
        let Some(target) = lookup.existing else {
            return Err(self.err(Fault::NotFound, abs));
        };
        if lookup.name.is_empty() || self.mounts.index_of_root(target).is_some() {
            return Err(self.err(Fault::NotPermitted, abs));
        }
        let node = self.nodes.get(target);
        if !node.is_dir() {
            return Err(self.err(Fault::NotADir, abs));
        }
        if node.as_dir().is_some_and(|d| !d.entries.is_empty()) {
            return Err(self.err(Fault::NotEmpty, abs));
        }
        self.require(lookup.parent, W_OK | X_OK, &abs)?;
        if !self
            .ident
            .may_delete_from(self.nodes.get(lookup.parent), self.nodes.get(target))
        {
            return Err(self.err(Fault::NotPermitted, abs));
        }
        let stored = lookup.stored_name.clone().unwrap_or(lookup.name.clone());
        self.remove_entry(lookup.parent, &stored);
        let node = self.nodes.get_mut(target);
        node.nlink = 0;
        self.maybe_free(target);
        Ok(())
    }

    /// Remove a directory and everything under it.
    pub(crate) fn remove_dir_all(&mut self, p: &str) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, false)?;
        if !self.nodes.get(resolved.node).is_dir() {
            return Err(self.err(Fault::NotADir, abs));
        }
        self.remove_tree(&abs)
    }

    fn remove_tree(&mut self, p: &str) -> FsResult<()> {
        let entries = self.scandir(p)?;
        for entry in entries {
            let child = path::join(&self.profile, p, &entry.name);
            if entry.is_dir && !entry.is_symlink {
                self.remove_tree(&child)?;
            } else {
                self.unlink(&child)?;
            }
        }
        self.rmdir(p)
    }

    /// `unlink`: remove a file or symlink entry.
    pub(crate) fn unlink(&mut self, p: &str) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let lookup = self.lookup_path(&abs, false)?;
        let Some(target) = lookup.existing else {
            return Err(self.err(Fault::NotFound, abs));
        };
        if target == self.dev_null {
            return Err(self.err(Fault::NotPermitted, abs));
        }
        if self.nodes.get(target).is_dir() {
            let fault = if self.profile.is_windows() {
                Fault::PermissionDenied
            } else {
                Fault::IsADir
            };
            return Err(self.err(fault, abs));
        }
        self.require(lookup.parent, W_OK | X_OK, &abs)?;
        if !self
            .ident
            .may_delete_from(self.nodes.get(lookup.parent), self.nodes.get(target))
        {
            return Err(self.err(Fault::NotPermitted, abs));
        }
        let stored = lookup.stored_name.clone().unwrap_or(lookup.name.clone());
        self.remove_entry(lookup.parent, &stored);
        let now = self.now();
        let node = self.nodes.get_mut(target);
        node.nlink -= 1;
        node.times.ctime = now;
        self.maybe_free(target);
        Ok(())
    }

    /// `link`: create a hard link to an existing file.
    pub(crate) fn link(&mut self, src: &str, dst: &str) -> FsResult<()> {
        let src_abs = self.prepare(src)?;
        let dst_abs = self.prepare(dst)?;
        let resolved = self.resolve_path(&src_abs, true)?;
        if self.nodes.get(resolved.node).is_dir() {
            return Err(self.err(Fault::NotPermitted, src_abs));
        }
        let lookup = self.lookup_path(&dst_abs, false)?;
        if lookup.existing.is_some() {
            return Err(self.err(Fault::Exists, dst_abs));
        }
        if lookup.parent_mount != resolved.mount {
            return Err(self.err(Fault::CrossDevice, dst_abs));
        }
        self.require(lookup.parent, W_OK | X_OK, &dst_abs)?;
        self.nodes.get_mut(resolved.node).nlink += 1;
        self.touch_ctime(resolved.node);
        self.insert_entry(lookup.parent, &lookup.name, resolved.node);
        Ok(())
    }

    /// `symlink`: create a symlink holding `target` verbatim.
    pub(crate) fn symlink(&mut self, target: &str, link: &str) -> FsResult<NodeId> {
        let abs = self.prepare(link)?;
        let lookup = self.lookup_path(&abs, false)?;
        if lookup.existing.is_some() || lookup.name.is_empty() {
            return Err(self.err(Fault::Exists, abs));
        }
        self.require(lookup.parent, W_OK | X_OK, &abs)?;
        let dev = self.nodes.get(lookup.parent).dev;
        let now = self.now();
        let id = self.nodes.alloc(
            NodeData::Symlink(SymlinkNode {
                target: target.to_string(),
            }),
            0o777,
            self.ident.uid,
            self.ident.gid,
            dev,
            now,
        );
        self.insert_entry(lookup.parent, &lookup.name, id);
        Ok(id)
    }

    /// `readlink`: the raw symlink target, never resolved.
    pub(crate) fn readlink(&mut self, p: &str) -> FsResult<String> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, false)?;
        match &self.nodes.get(resolved.node).data {
            NodeData::Symlink(s) => Ok(s.target.clone()),
            _ => Err(self.err(Fault::InvalidArgument, abs)),
        }
    }

    /// `rename`: move an entry, with the POSIX/Windows overwrite matrix.
    ///
    /// `replace` requests replace-style semantics; POSIX profiles always
    /// replace silently, the Windows profile refuses an existing
    /// destination without it.
    pub(crate) fn rename(&mut self, from: &str, to: &str, replace: bool) -> FsResult<()> {
        let from_abs = self.prepare(from)?;
        let to_abs = self.prepare(to)?;
        let src = self.lookup_path(&from_abs, false)?;
        let Some(moved) = src.existing else {
            return Err(self.err(Fault::NotFound, from_abs));
        };
        if self.mounts.index_of_root(moved).is_some() || moved == self.dev_null {
            return Err(self.err(Fault::NotPermitted, from_abs));
        }
        let dst = self.lookup_path(&to_abs, false)?;
        if src.existing_mount != dst.parent_mount {
            return Err(self.err(Fault::CrossDevice, to_abs));
        }
        if self.nodes.get(moved).is_dir() && self.is_ancestor(moved, dst.parent) {
            return Err(self.err(Fault::InvalidArgument, to_abs));
        }
        self.require(src.parent, W_OK | X_OK, &from_abs)?;
        self.require(dst.parent, W_OK | X_OK, &to_abs)?;
        if !self
            .ident
            .may_delete_from(self.nodes.get(src.parent), self.nodes.get(moved))
        {
            return Err(self.err(Fault::NotPermitted, from_abs));
        }

        let src_stored = src.stored_name.clone().unwrap_or(src.name.clone());
        if let Some(existing) = dst.existing {
            if existing == moved {
                let case_rename = src.parent == dst.parent
                    && src_stored != dst.name
                    && path::matches(&self.profile, &src_stored, &dst.name);
                if case_rename {
                    self.remove_entry(src.parent, &src_stored);
                    self.insert_entry(dst.parent, &dst.name, moved);
                    self.touch_ctime(moved);
                }
                // Renaming a file onto another hard link of itself is a
                // silent no-op.
                return Ok(());
            }
            let moved_is_dir = self.nodes.get(moved).is_dir();
            let existing_node = self.nodes.get(existing);
            if moved_is_dir && !existing_node.is_dir() {
                return Err(self.err(Fault::NotADir, to_abs));
            }
            if !moved_is_dir && existing_node.is_dir() {
                return Err(self.err(Fault::IsADir, to_abs));
            }
            if existing_node
                .as_dir()
                .is_some_and(|d| !d.entries.is_empty())
            {
                return Err(self.err(Fault::NotEmpty, to_abs));
            }
            if self.profile.is_windows() && !replace {
                return Err(self.err(Fault::Exists, to_abs));
            }
            if !self
                .ident
                .may_delete_from(self.nodes.get(dst.parent), existing_node)
            {
                return Err(self.err(Fault::NotPermitted, to_abs));
            }
            let stored = dst.stored_name.clone().unwrap_or(dst.name.clone());
            self.remove_entry(dst.parent, &stored);
            let node = self.nodes.get_mut(existing);
            if node.is_dir() {
                node.nlink = 0;
            } else {
                node.nlink -= 1;
            }
            self.maybe_free(existing);
        }

        self.remove_entry(src.parent, &src_stored);
        self.insert_entry(dst.parent, &dst.name, moved);
        self.touch_ctime(moved);
        Ok(())
    }

    /// `stat` / `lstat`.
    pub(crate) fn stat(&mut self, p: &str, follow: bool) -> FsResult<Stat> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, follow)?;
        Ok(self.stat_node(resolved.node))
    }

    pub(crate) fn fstat(&self, fd: i32) -> FsResult<Stat> {
        let file = self
            .fds
            .get(fd)
            .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
        Ok(self.stat_node(file.node))
    }

    pub(crate) fn stat_node(&self, id: NodeId) -> Stat {
        let node = self.nodes.get(id);
        let (file_attributes, reparse_tag) = if self.profile.is_windows() {
            let mut attrs = 0;
            if node.is_dir() {
                attrs |= FILE_ATTRIBUTE_DIRECTORY;
            }
            if node.perm() & 0o222 == 0 {
                attrs |= FILE_ATTRIBUTE_READONLY;
            }
            if node.is_symlink() {
                attrs |= FILE_ATTRIBUTE_REPARSE_POINT;
            }
            if attrs == 0 {
                attrs = FILE_ATTRIBUTE_NORMAL;
            }
            let tag = if node.is_symlink() {
                IO_REPARSE_TAG_SYMLINK
            } else {
                0
            };
            (Some(attrs), Some(tag))
        } else {
            (None, None)
        };
        Stat {
            ino: node.ino.0,
            dev: node.dev,
            mode: node.mode,
            nlink: node.nlink,
            uid: node.uid,
            gid: node.gid,
            size: node.size(),
            atime: node.times.atime,
            mtime: node.times.mtime,
            ctime: node.times.ctime,
            crtime: node.times.crtime,
            file_attributes,
            reparse_tag,
        }
    }

    /// `chmod`, optionally without following a trailing symlink.
    pub(crate) fn chmod(&mut self, p: &str, mode: u32, follow: bool) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, follow)?;
        self.chmod_node(resolved.node, mode, &abs)
    }

    /// `fchmod`: change permissions through an open descriptor.
    pub(crate) fn fchmod(&mut self, fd: i32, mode: u32) -> FsResult<()> {
        let node = self
            .fds
            .get(fd)
            .ok_or_else(|| self.err(Fault::BadDescriptor, None))?
            .node;
        self.chmod_node(node, mode, "")
    }

    fn chmod_node(&mut self, id: NodeId, mode: u32, at: &str) -> FsResult<()> {
        let node = self.nodes.get(id);
        if !self.ident.is_root() && self.ident.uid != node.uid {
            let at = (!at.is_empty()).then(|| at.to_string());
            return Err(self.err(Fault::NotPermitted, at));
        }
        let perm = if self.profile.is_windows() && !self.config.windows_unix_mode {
            // NTFS ACLs cannot be expressed through POSIX modes; only the
            // write bits are honored, readability is preserved.
            let writable = mode & 0o222 != 0;
            let x_bits = node.perm() & 0o111;
            if writable {
                0o666 | x_bits
            } else {
                0o444 | x_bits
            }
        } else {
            mode & 0o7777
        };
        let type_bits = node.mode & S_IFMT;
        let node = self.nodes.get_mut(id);
        node.mode = type_bits | perm;
        self.touch_ctime(id);
        Ok(())
    }

    /// `chown` / `lchown`. `None` keeps the current owner or group.
    pub(crate) fn chown(
        &mut self,
        p: &str,
        uid: Option<u32>,
        gid: Option<u32>,
        follow: bool,
    ) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, follow)?;
        if !self.ident.is_root() {
            let node = self.nodes.get(resolved.node);
            let changes_owner = uid.is_some_and(|u| u != node.uid);
            let changes_group = gid.is_some_and(|g| g != node.gid && !self.ident.in_group(g));
            if changes_owner || changes_group || self.ident.uid != node.uid {
                return Err(self.err(Fault::NotPermitted, abs));
            }
        }
        let node = self.nodes.get_mut(resolved.node);
        if let Some(uid) = uid {
            node.uid = uid;
        }
        if let Some(gid) = gid {
            node.gid = gid;
        }
        self.touch_ctime(resolved.node);
        Ok(())
    }

    /// `utime`: set access and modification times, nanosecond precision.
    pub(crate) fn utime(
        &mut self,
        p: &str,
        times: Option<(Duration, Duration)>,
        follow: bool,
    ) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, follow)?;
        let node = self.nodes.get(resolved.node);
        if !self.ident.is_root() && self.ident.uid != node.uid {
            // Without ownership, only a plain touch with write access is
            // allowed.
            if times.is_some() || !self.ident.check(node, W_OK) {
                return Err(self.err(Fault::NotPermitted, abs));
            }
        }
        let now = self.now();
        let (atime, mtime) = times.unwrap_or((now, now));
        let node = self.nodes.get_mut(resolved.node);
        node.times.atime = atime;
        node.times.mtime = mtime;
        node.times.ctime = now;
        Ok(())
    }

    /// `access`: silent rights probe against the effective identity.
    pub(crate) fn access(&mut self, p: &str, mode: u32) -> FsResult<bool> {
        let abs = self.prepare(p)?;
        let resolved = match self.resolve_path(&abs, true) {
            Ok(r) => r,
            Err(e) if e.kind() == Fault::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        if mode == 0 {
            return Ok(true);
        }
        Ok(self.ident.check(self.nodes.get(resolved.node), mode & 7))
    }

    /// `scandir`: entries in insertion order, or shuffled when configured.
    pub(crate) fn scandir(&mut self, p: &str) -> FsResult<Vec<ScanEntry>> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        let node = self.nodes.get(resolved.node);
        let dir = node
            .as_dir()
            .ok_or_else(|| self.err(Fault::NotADir, abs.clone()))?;
        self.require(resolved.node, R_OK, &abs)?;
        let mut entries: Vec<ScanEntry> = dir
            .entries
            .iter()
            .map(|(_, ent)| {
                let child = self.nodes.get(ent.node);
                ScanEntry {
                    // The encoded bytes are the stored form; the decoded
                    // name derives from them under the profile encoding.
                    name: path::decode(&self.profile, &ent.encoded),
                    encoded: ent.encoded.clone(),
                    ino: ent.node.0,
                    is_dir: child.is_dir(),
                    is_file: child.is_file() || child.is_device(),
                    is_symlink: child.is_symlink(),
                }
            })
            .collect();
        if self.config.shuffle_listdir_results {
            entries.shuffle(&mut self.rng);
        }
        self.touch_atime(resolved.node);
        Ok(entries)
    }

    /// `truncate` by path.
    pub(crate) fn truncate(&mut self, p: &str, size: u64) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        let node = self.nodes.get(resolved.node);
        if node.is_dir() {
            return Err(self.err(Fault::IsADir, abs));
        }
        self.require(resolved.node, W_OK, &abs)?;
        self.resize_file(resolved.node, size, &abs)
    }

    fn resize_file(&mut self, id: NodeId, size: u64, at: &str) -> FsResult<()> {
        self.materialize(id, at)?;
        let node = self.nodes.get(id);
        let dev = node.dev;
        let old = node.size();
        self.charge(dev, size as i64 - old as i64, at)?;
        let node = self.nodes.get_mut(id);
        if let Some(file) = node.as_file_mut() {
            if let FileContent::Lazy { cached, .. } = &mut file.content {
                // Resizing detaches the import from its backing file.
                let bytes = cached.take().expect("materialized above");
                file.content = FileContent::Bytes(bytes);
            }
            match &mut file.content {
                FileContent::Bytes(b) => b.resize(size as usize, 0),
                FileContent::Phantom(s) => *s = size,
                FileContent::Lazy { .. } => unreachable!("detached above"),
            }
        }
        self.touch_mtime(id);
        Ok(())
    }

    // --- descriptor I/O ----------------------------------------------------

    /// `open`: resolve or create, register a descriptor.
    pub(crate) fn open(&mut self, p: &str, req: &OpenRequest) -> FsResult<i32> {
        let abs = self.prepare(p)?;
        let lookup = self.lookup_path(&abs, !req.nofollow)?;
        let node = match lookup.existing {
            Some(id) => {
                if req.create_new {
                    return Err(self.err(Fault::Exists, abs));
                }
                if req.nofollow && self.nodes.get(id).is_symlink() {
                    return Err(self.err(Fault::LinkLoop, abs));
                }
                let node = self.nodes.get(id);
                if node.is_dir() {
                    return Err(self.err(Fault::IsADir, abs));
                }
                let mut want = 0;
                if req.read {
                    want |= R_OK;
                }
                if req.write || req.append {
                    want |= W_OK;
                }
                if want != 0 && !node.is_device() {
                    self.require(id, want, &abs)?;
                }
                if req.truncate && (req.write || req.append) && node.is_file() {
                    self.resize_file(id, 0, &abs)?;
                }
                id
            }
            None => {
                if !(req.create || req.create_new) {
                    return Err(self.err(Fault::NotFound, abs));
                }
                if lookup.name.is_empty() {
                    return Err(self.err(Fault::IsADir, abs));
                }
                self.require(lookup.parent, W_OK | X_OK, &abs)?;
                let perm = req.mode & !self.umask;
                let dev = self.nodes.get(lookup.parent).dev;
                let now = self.now();
                let id = self.nodes.alloc(
                    NodeData::File(FileNode {
                        content: FileContent::Bytes(Vec::new()),
                        encoding: None,
                    }),
                    perm,
                    self.ident.uid,
                    self.ident.gid,
                    dev,
                    now,
                );
                self.insert_entry(lookup.parent, &lookup.name, id);
                id
            }
        };

        let pos = if req.append {
            self.nodes.get(node).size()
        } else {
            0
        };
        let mut file = OpenFile::new(
            node,
            req.read,
            req.write || req.append,
            req.append,
            req.text,
        );
        file.pos = pos;
        self.nodes.get_mut(node).open_count += 1;
        Ok(self.fds.alloc(file))
    }

    /// Load a lazy file's bytes from its backing real path.
    pub(crate) fn materialize(&mut self, id: NodeId, at: &str) -> FsResult<()> {
        let node = self.nodes.get(id);
        let Some(file) = node.as_file() else {
            return Ok(());
        };
        let FileContent::Lazy {
            real_path, cached, ..
        } = &file.content
        else {
            return Ok(());
        };
        if cached.is_some() {
            return Ok(());
        }
        let real_path = real_path.clone();
        let at = (!at.is_empty()).then(|| at.to_string());
        let bytes = std::fs::read(&real_path).map_err(|_| self.err(Fault::Io, at))?;
        let node = self.nodes.get_mut(id);
        if let Some(file) = node.as_file_mut() {
            if let FileContent::Lazy { cached, size, .. } = &mut file.content {
                *size = bytes.len() as u64;
                *cached = Some(bytes);
            }
        }
        Ok(())
    }

    fn file_bytes(&mut self, id: NodeId, at: &str) -> FsResult<&[u8]> {
        self.materialize(id, at)?;
        let node = self.nodes.get(id);
        match &node.data {
            NodeData::File(f) => match &f.content {
                FileContent::Bytes(b) => Ok(b),
                FileContent::Lazy { cached, .. } => {
                    Ok(cached.as_deref().expect("materialized above"))
                }
                FileContent::Phantom(_) => {
                    let at = (!at.is_empty()).then(|| at.to_string());
                    Err(self.err(Fault::InvalidArgument, at))
                }
            },
            NodeData::Device => Ok(&[]),
            _ => Err(self.err(Fault::BadDescriptor, None)),
        }
    }

    /// Read from a descriptor at its cursor.
    pub(crate) fn read(&mut self, fd: i32, buf: &mut [u8]) -> FsResult<usize> {
        let (node, pos) = {
            let file = self
                .fds
                .get(fd)
                .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
            if !file.readable {
                return Err(self.err(Fault::BadDescriptor, None));
            }
            (file.node, file.pos)
        };
        let n = {
            let bytes = self.file_bytes(node, "")?;
            if pos >= bytes.len() as u64 {
                0
            } else {
                let start = pos as usize;
                let n = buf.len().min(bytes.len() - start);
                buf[..n].copy_from_slice(&bytes[start..start + n]);
                n
            }
        };
        if let Some(file) = self.fds.get_mut(fd) {
            file.pos += n as u64;
        }
        self.touch_atime(node);
        Ok(n)
    }

    /// Read a descriptor to end from its cursor.
    pub(crate) fn read_to_end(&mut self, fd: i32) -> FsResult<Vec<u8>> {
        let (node, pos) = {
            let file = self
                .fds
                .get(fd)
                .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
            if !file.readable {
                return Err(self.err(Fault::BadDescriptor, None));
            }
            (file.node, file.pos)
        };
        let out = {
            let bytes = self.file_bytes(node, "")?;
            bytes.get(pos as usize..).unwrap_or(&[]).to_vec()
        };
        if let Some(file) = self.fds.get_mut(fd) {
            file.pos += out.len() as u64;
        }
        self.touch_atime(node);
        Ok(out)
    }

    /// Write to a descriptor. In append mode the cursor is forced to EOF
    /// first; on a full mount nothing is persisted.
    pub(crate) fn write(&mut self, fd: i32, data: &[u8]) -> FsResult<usize> {
        let (node, pos, append) = {
            let file = self
                .fds
                .get(fd)
                .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
            if !file.writable {
                return Err(self.err(Fault::BadDescriptor, None));
            }
            (file.node, file.pos, file.append)
        };
        if self.nodes.get(node).is_device() {
            if let Some(file) = self.fds.get_mut(fd) {
                file.pos += data.len() as u64;
            }
            return Ok(data.len());
        }
        if matches!(
            self.nodes.get(node).as_file().map(|f| &f.content),
            Some(FileContent::Phantom(_))
        ) {
            return Err(self.err(Fault::InvalidArgument, None));
        }
        self.materialize(node, "")?;
        let size = self.nodes.get(node).size();
        let pos = if append { size } else { pos };
        let end = pos + data.len() as u64;
        let growth = end.saturating_sub(size);
        let dev = self.nodes.get(node).dev;
        self.charge(dev, growth as i64, "")?;

        let inode = self.nodes.get_mut(node);
        if let Some(file) = inode.as_file_mut() {
            if let FileContent::Lazy { cached, .. } = &mut file.content {
                // A modified import keeps its cache as the contents for
                // good; the real file is never written.
                let bytes = cached.take().expect("materialized above");
                file.content = FileContent::Bytes(bytes);
            }
            if let FileContent::Bytes(buf) = &mut file.content {
                if end as usize > buf.len() {
                    buf.resize(end as usize, 0);
                }
                buf[pos as usize..end as usize].copy_from_slice(data);
            }
        }
        if let Some(file) = self.fds.get_mut(fd) {
            file.pos = end;
            file.pending_write = true;
        }
        self.touch_mtime(node);
        Ok(data.len())
    }

    /// Positioned read that leaves the cursor alone.
    pub(crate) fn read_at(&mut self, fd: i32, buf: &mut [u8], offset: u64) -> FsResult<usize> {
        let saved = self.seek(fd, SeekFrom::Current(0))?;
        self.seek(fd, SeekFrom::Start(offset))?;
        let result = self.read(fd, buf);
        self.seek(fd, SeekFrom::Start(saved))?;
        result
    }

    /// Positioned write that leaves the cursor alone.
    pub(crate) fn write_at(&mut self, fd: i32, data: &[u8], offset: u64) -> FsResult<usize> {
        let saved = self.seek(fd, SeekFrom::Current(0))?;
        self.seek(fd, SeekFrom::Start(offset))?;
        let result = self.write(fd, data);
        self.seek(fd, SeekFrom::Start(saved))?;
        result
    }

    pub(crate) fn seek(&mut self, fd: i32, pos: SeekFrom) -> FsResult<u64> {
        let (node, cur) = {
            let file = self
                .fds
                .get(fd)
                .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
            (file.node, file.pos)
        };
        let size = self.nodes.get(node).size() as i64;
        let next = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(delta) => size + delta,
            SeekFrom::Current(delta) => cur as i64 + delta,
        };
        if next < 0 {
            return Err(self.err(Fault::InvalidArgument, None));
        }
        let file = self.fds.get_mut(fd).expect("descriptor checked above");
        file.pos = next as u64;
        Ok(next as u64)
    }

    /// `ftruncate`.
    pub(crate) fn truncate_fd(&mut self, fd: i32, size: u64) -> FsResult<()> {
        let node = {
            let file = self
                .fds
                .get(fd)
                .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
            if !file.writable {
                return Err(self.err(Fault::BadDescriptor, None));
            }
            file.node
        };
        if self.nodes.get(node).is_device() {
            return Ok(());
        }
        self.resize_file(node, size, "")
    }

    /// Flush settles timestamps for pending writes; contents need no
    /// flushing.
    pub(crate) fn flush(&mut self, fd: i32) -> FsResult<()> {
        let (node, pending) = {
            let file = self
                .fds
                .get(fd)
                .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
            (file.node, file.pending_write)
        };
        if pending {
            self.touch_mtime(node);
            if let Some(file) = self.fds.get_mut(fd) {
                file.pending_write = false;
            }
        }
        Ok(())
    }

    pub(crate) fn dup(&mut self, fd: i32) -> FsResult<i32> {
        let new = self
            .fds
            .dup(fd)
            .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
        let node = self.fds.get(new).expect("just duplicated").node;
        self.nodes.get_mut(node).open_count += 1;
        Ok(new)
    }

    pub(crate) fn close(&mut self, fd: i32) -> FsResult<()> {
        let (node, _last) = self
            .fds
            .close(fd)
            .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
        let inode = self.nodes.get_mut(node);
        inode.open_count -= 1;
        self.maybe_free(node);
        Ok(())
    }

    fn text_mode(&self, fd: i32) -> FsResult<TextMode> {
        let file = self
            .fds
            .get(fd)
            .ok_or_else(|| self.err(Fault::BadDescriptor, None))?;
        file.text
            .ok_or_else(|| self.err(Fault::InvalidArgument, None))
    }

    /// Text-mode read: decode, then translate newlines.
    pub(crate) fn read_text(&mut self, fd: i32) -> FsResult<String> {
        let text = self.text_mode(fd)?;
        let bytes = self.read_to_end(fd)?;
        let decoded = fd::decode_text(text.encoding, &bytes)
            .ok_or_else(|| self.err(Fault::InvalidArgument, None))?;
        Ok(fd::translate_read(text.newline, &decoded))
    }

    /// Text-mode write: translate newlines, then encode.
    pub(crate) fn write_text(&mut self, fd: i32, s: &str) -> FsResult<usize> {
        let text = self.text_mode(fd)?;
        let translated = fd::translate_write(text.newline, self.profile.is_windows(), s);
        let bytes = fd::encode_text(text.encoding, &translated)
            .ok_or_else(|| self.err(Fault::InvalidArgument, None))?;
        self.write(fd, &bytes)?;
        Ok(s.len())
    }

    // --- disk accounting ---------------------------------------------------

    /// `disk_usage`: totals for the mount enclosing `p`.
    pub(crate) fn disk_usage(&mut self, p: &str) -> FsResult<DiskUsage> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        Ok(self.mounts.get(resolved.mount).usage())
    }

    /// Change the total budget of the mount enclosing `p`.
    pub(crate) fn set_disk_usage(&mut self, total: u64, p: &str) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        if self.mounts.get(resolved.mount).used > total {
            return Err(self.err(Fault::NoSpace, abs));
        }
        self.mounts.get_mut(resolved.mount).total = Some(total);
        Ok(())
    }

    /// Adjust the used-bytes counter of the mount enclosing `p` directly.
    pub(crate) fn change_disk_usage(&mut self, delta: i64, p: &str) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        self.mounts
            .change_used(&self.profile, resolved.mount, delta)
            .map_err(|e| self.err(e.kind(), abs))
    }

    /// Mount a fresh device at `p`, which must not exist yet.
    pub(crate) fn add_mount_point(&mut self, p: &str, total: Option<u64>) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let lookup = self.lookup_path(&abs, false)?;
        if lookup.existing.is_some() || lookup.name.is_empty() {
            return Err(self.err(Fault::Exists, abs));
        }
        let root = self.mkdir_in(lookup.parent, &lookup.name, None, &abs)?;
        let dev = self.mounts.add(abs, root, total);
        self.nodes.get_mut(root).dev = dev;
        // Everything below the mount root inherits the new device id.
        tracing::trace!(target: TRACING_TARGET, dev, "mount point added");
        Ok(())
    }

    // --- extended attributes ----------------------------------------------

    pub(crate) fn getxattr(&mut self, p: &str, name: &str) -> FsResult<Option<Vec<u8>>> {
        let abs = self.xattr_target(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        Ok(self.nodes.get(resolved.node).xattrs.get(name).cloned())
    }

    pub(crate) fn setxattr(&mut self, p: &str, name: &str, value: &[u8]) -> FsResult<()> {
        let abs = self.xattr_target(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        self.require(resolved.node, W_OK, &abs)?;
        self.nodes
            .get_mut(resolved.node)
            .xattrs
            .insert(name.to_string(), value.to_vec());
        self.touch_ctime(resolved.node);
        Ok(())
    }

    pub(crate) fn listxattr(&mut self, p: &str) -> FsResult<Vec<String>> {
        let abs = self.xattr_target(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        Ok(self
            .nodes
            .get(resolved.node)
            .xattrs
            .keys()
            .cloned()
            .collect())
    }

    pub(crate) fn removexattr(&mut self, p: &str, name: &str) -> FsResult<()> {
        let abs = self.xattr_target(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        self.require(resolved.node, W_OK, &abs)?;
        self.nodes.get_mut(resolved.node).xattrs.shift_remove(name);
        self.touch_ctime(resolved.node);
        Ok(())
    }

    fn xattr_target(&mut self, p: &str) -> FsResult<String> {
        if !self.profile.is_linux() {
            return Err(self.err(Fault::InvalidArgument, p.to_string()));
        }
        self.prepare(p)
    }

    // --- lifecycle ---------------------------------------------------------

    pub(crate) fn pause(&mut self) {
        self.paused = true;
        tracing::trace!(target: TRACING_TARGET, "paused");
    }

    pub(crate) fn resume(&mut self) {
        self.paused = false;
        tracing::trace!(target: TRACING_TARGET, "resumed");
    }

    /// Drop cached contents of unmodified imports; they reload on demand.
    pub(crate) fn clear_cache(&mut self) {
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.ino).collect();
        for id in ids {
            if let Some(file) = self.nodes.get_mut(id).as_file_mut() {
                if let FileContent::Lazy { cached, .. } = &mut file.content {
                    *cached = None;
                }
            }
        }
    }

    pub(crate) fn getcwd(&self) -> String {
        self.cwd.clone()
    }

    pub(crate) fn chdir(&mut self, p: &str) -> FsResult<()> {
        let abs = self.prepare(p)?;
        let resolved = self.resolve_path(&abs, true)?;
        if !self.nodes.get(resolved.node).is_dir() {
            return Err(self.err(Fault::NotADir, abs));
        }
        self.require(resolved.node, X_OK, &abs)?;
        self.cwd = abs;
        Ok(())
    }

    /// Switch the emulated OS; the tree is rebuilt from scratch.
    pub(crate) fn set_os(&mut self, os: crate::profile::Os) {
        self.config.os = os;
        self.profile = Profile::new(
            os,
            self.config.case_sensitive,
            self.config.path_separator,
            self.config.alternative_path_separator,
        );
        self.reset();
    }

    pub(crate) fn set_ids(&mut self, uid: Option<u32>, gid: Option<u32>) {
        if let Some(uid) = uid {
            self.ident.uid = uid;
        }
        if let Some(gid) = gid {
            self.ident.gid = gid;
        }
    }

    /// Restore the host's real uid and gid as the effective identity.
    pub(crate) fn reset_ids(&mut self) {
        let allow_root = self.ident.allow_root;
        self.ident = Identity::host(allow_root);
    }

    pub(crate) fn set_umask(&mut self, umask: u32) -> u32 {
        std::mem::replace(&mut self.umask, umask & 0o777)
    }

    pub(crate) fn root_anchor(&self) -> String {
        if self.profile.is_windows() {
            String::new()
        } else {
            self.profile.root_path()
        }
    }
}
