//! The inode store: an arena of filesystem objects keyed by inode number.
//!
//! Directory entries hold `NodeId`s rather than references, which keeps the
//! graph cycle-free in Rust terms even though directories back-reference
//! their parent. Files may be hard-linked from several directories and so
//! carry no parent of their own.

use crate::path;
use crate::profile::Profile;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::time::Duration;

pub(crate) const S_IFMT: u32 = 0o170000;
pub(crate) const S_IFREG: u32 = 0o100000;
pub(crate) const S_IFDIR: u32 = 0o040000;
pub(crate) const S_IFLNK: u32 = 0o120000;
pub(crate) const S_IFCHR: u32 = 0o020000;
pub(crate) const S_ISVTX: u32 = 0o1000;

/// Default permission bits before the umask is applied.
pub(crate) const PERM_DEF_FILE: u32 = 0o666;
pub(crate) const PERM_DEF_DIR: u32 = 0o777;

/// A process-unique inode number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// The raw inode number.
    pub fn ino(self) -> u64 {
        self.0
    }
}

/// Text encoding hint attached to a file, used only by text-mode opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

/// The contents of a regular file.
#[derive(Debug, Clone)]
pub(crate) enum FileContent {
    /// Plain in-memory bytes.
    Bytes(Vec<u8>),
    /// Backed by a real file, loaded on first access and cached.
    Lazy {
        real_path: PathBuf,
        size: u64,
        writable: bool,
        cached: Option<Vec<u8>>,
    },
    /// A declared size with no contents; reads and writes are rejected.
    Phantom(u64),
}

impl FileContent {
    /// The size in bytes as reported by stat and the disk accounting.
    pub(crate) fn size(&self) -> u64 {
        match self {
            FileContent::Bytes(b) => b.len() as u64,
            FileContent::Lazy { size, cached, .. } => {
                cached.as_ref().map(|b| b.len() as u64).unwrap_or(*size)
            }
            FileContent::Phantom(size) => *size,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FileNode {
    pub content: FileContent,
    pub encoding: Option<Encoding>,
}

/// A directory entry: the target node plus the name's encoded form under
/// the profile's filesystem encoding.
#[derive(Debug, Clone)]
pub(crate) struct DirEnt {
    pub node: NodeId,
    pub encoded: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DirNode {
    /// Entries in insertion order. `.` and `..` are synthetic and never
    /// stored.
    pub entries: IndexMap<String, DirEnt>,
    pub parent: Option<NodeId>,
}

impl DirNode {
    /// Look up an entry under the profile's case policy.
    ///
    /// An exact match wins; otherwise the first-inserted case variant is
    /// returned on non-case-sensitive profiles.
    pub(crate) fn lookup(&self, p: &Profile, name: &str) -> Option<(&str, NodeId)> {
        if let Some(ent) = self.entries.get(name) {
            return Some((self.entries.get_key_value(name).unwrap().0, ent.node));
        }
        if !p.case_sensitive {
            let folded = path::fold(name);
            for (stored, ent) in &self.entries {
                if path::fold(stored) == folded {
                    return Some((stored, ent.node));
                }
            }
        }
        None
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SymlinkNode {
    /// The target path, stored verbatim and never resolved eagerly.
    pub target: String,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    File(FileNode),
    Dir(DirNode),
    Symlink(SymlinkNode),
    /// A null sink: reads are empty, writes are discarded.
    Device,
}

/// Nanosecond-resolution inode timestamps as durations since the epoch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timestamps {
    pub atime: Duration,
    pub mtime: Duration,
    pub ctime: Duration,
    pub crtime: Duration,
}

impl Timestamps {
    pub(crate) fn new(now: Duration) -> Timestamps {
        Timestamps {
            atime: now,
            mtime: now,
            ctime: now,
            crtime: now,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Inode {
    pub ino: NodeId,
    /// Full `st_mode`: type bits plus permission bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Device id inherited from the anchoring mount.
    pub dev: u64,
    pub nlink: u64,
    /// Live descriptors holding this inode open.
    pub open_count: u32,
    pub times: Timestamps,
    /// Extended attributes; populated on the Linux profile only.
    pub xattrs: IndexMap<String, Vec<u8>>,
    pub data: NodeData,
}

impl Inode {
    pub(crate) fn is_dir(&self) -> bool {
        matches!(self.data, NodeData::Dir(_))
    }

    pub(crate) fn is_file(&self) -> bool {
        matches!(self.data, NodeData::File(_))
    }

    pub(crate) fn is_symlink(&self) -> bool {
        matches!(self.data, NodeData::Symlink(_))
    }

    pub(crate) fn is_device(&self) -> bool {
        matches!(self.data, NodeData::Device)
    }

    /// Permission bits without the type flag.
    pub(crate) fn perm(&self) -> u32 {
        self.mode & 0o7777
    }

    pub(crate) fn as_dir(&self) -> Option<&DirNode> {
        match &self.data {
            NodeData::Dir(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn as_dir_mut(&mut self) -> Option<&mut DirNode> {
        match &mut self.data {
            NodeData::Dir(d) => Some(d),
            _ => None,
        }
    }

    pub(crate) fn as_file(&self) -> Option<&FileNode> {
        match &self.data {
            NodeData::File(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn as_file_mut(&mut self) -> Option<&mut FileNode> {
        match &mut self.data {
            NodeData::File(f) => Some(f),
            _ => None,
        }
    }

    /// The stat size: content length for files, target length for symlinks.
    pub(crate) fn size(&self) -> u64 {
        match &self.data {
            NodeData::File(f) => f.content.size(),
            NodeData::Symlink(s) => s.target.len() as u64,
            _ => 0,
        }
    }
}

/// The arena of all inodes in one filesystem instance.
#[derive(Debug, Clone)]
pub(crate) struct NodeTable {
    nodes: IndexMap<u64, Inode>,
    next_ino: u64,
}

impl NodeTable {
    pub(crate) fn new() -> NodeTable {
        NodeTable {
            nodes: IndexMap::new(),
            next_ino: 1,
        }
    }

    /// Allocate a fresh inode.
    pub(crate) fn alloc(
        &mut self,
        data: NodeData,
        perm: u32,
        uid: u32,
        gid: u32,
        dev: u64,
        now: Duration,
    ) -> NodeId {
        let type_bits = match &data {
            NodeData::File(_) => S_IFREG,
            NodeData::Dir(_) => S_IFDIR,
            NodeData::Symlink(_) => S_IFLNK,
            NodeData::Device => S_IFCHR,
        };
        let ino = NodeId(self.next_ino);
        self.next_ino += 1;
        let nlink = if matches!(data, NodeData::Dir(_)) { 2 } else { 1 };
        self.nodes.insert(
            ino.0,
            Inode {
                ino,
                mode: type_bits | (perm & 0o7777),
                uid,
                gid,
                dev,
                nlink,
                open_count: 0,
                times: Timestamps::new(now),
                xattrs: IndexMap::new(),
                data,
            },
        );
        ino
    }

    /// Fetch an inode that a directory entry or descriptor still refers to.
    ///
    /// # Panics
    ///
    /// Panics if the id is stale; live entries keep their target alive, so a
    /// miss is an engine bug.
    pub(crate) fn get(&self, id: NodeId) -> &Inode {
        self.nodes.get(&id.0).expect("inode missing from arena")
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Inode {
        self.nodes.get_mut(&id.0).expect("inode missing from arena")
    }

    /// Drop an inode from the arena once nothing refers to it.
    pub(crate) fn remove(&mut self, id: NodeId) {
        self.nodes.swap_remove(&id.0);
    }

    /// Iterate over all live inodes.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Inode> {
        self.nodes.values()
    }
}
