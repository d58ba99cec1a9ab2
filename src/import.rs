//! Mapping real files and directories into the fake tree.
//!
//! Imported files are placeholders that load their bytes from the real
//! disk on first access; the real filesystem is never written. Directory
//! imports enumerate entries eagerly but keep file bytes lazy.

use crate::engine::Fs;
use crate::error::{Fault, FsResult};
use crate::node::{FileContent, FileNode, NodeData, NodeId};
use crate::path;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

impl Fs {
    /// Map a real file into the fake tree as a lazy read-through.
    ///
    /// With `read_only` the fake file rejects writes like the real mode
    /// bits would; otherwise the first write detaches it from the real
    /// file for good.
    pub(crate) fn add_real_file(
        &mut self,
        real_path: &Path,
        read_only: bool,
        target_path: Option<&str>,
    ) -> FsResult<NodeId> {
        let meta = std::fs::metadata(real_path)
            .map_err(|_| self.err(Fault::NotFound, real_path.display().to_string()))?;
        if !meta.is_file() {
            return Err(self.err(Fault::IsADir, real_path.display().to_string()));
        }
        let target = match target_path {
            Some(t) => t.to_string(),
            None => real_path.to_string_lossy().into_owned(),
        };
        let abs = self.prepare(&target)?;
        let parent_path = path::dirname(&self.profile, &abs);
        self.ensure_dirs(&parent_path)?;
        let lookup = self.lookup_path(&abs, false)?;
        if lookup.existing.is_some() {
            return Err(self.err(Fault::Exists, abs));
        }

        let size = meta.len();
        let dev = self.nodes.get(lookup.parent).dev;
        self.charge_import(dev, size, &abs)?;
        let perm = if read_only {
            real_perm(&meta) & !0o222
        } else {
            real_perm(&meta)
        };
        let now = self.now();
        let id = self.nodes.alloc(
            NodeData::File(FileNode {
                content: FileContent::Lazy {
                    real_path: PathBuf::from(real_path),
                    size,
                    writable: !read_only,
                    cached: None,
                },
                encoding: None,
            }),
            perm,
            self.ident.uid,
            self.ident.gid,
            dev,
            now,
        );
        self.insert_entry(lookup.parent, &lookup.name, id);
        Ok(id)
    }

    /// Map a real directory tree into the fake tree.
    ///
    /// Subdirectories are created eagerly; file bytes stay lazy. When the
    /// target overlays an existing fake directory the contents merge, but
    /// a collision with an existing fake file is rejected.
    pub(crate) fn add_real_directory(
        &mut self,
        real_path: &Path,
        read_only: bool,
        target_path: Option<&str>,
    ) -> FsResult<NodeId> {
        let meta = std::fs::metadata(real_path)
            .map_err(|_| self.err(Fault::NotFound, real_path.display().to_string()))?;
        if !meta.is_dir() {
            return Err(self.err(Fault::NotADir, real_path.display().to_string()));
        }
        let target = match target_path {
            Some(t) => t.to_string(),
            None => real_path.to_string_lossy().into_owned(),
        };
        let abs = self.prepare(&target)?;
        let existing = match self.lookup_path(&abs, false) {
            Ok(lookup) => lookup.existing,
            Err(e) if e.kind() == Fault::NotFound => None,
            Err(e) => return Err(e),
        };
        let root = match existing {
            Some(existing) => {
                if !self.nodes.get(existing).is_dir() {
                    return Err(self.err(Fault::Exists, abs.clone()));
                }
                existing
            }
            None => self.ensure_dirs(&abs)?,
        };

        let entries = std::fs::read_dir(real_path)
            .map_err(|_| self.err(Fault::Io, real_path.display().to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|_| self.err(Fault::Io, abs.clone()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let child_target = path::join(&self.profile, &abs, &name);
            let file_type = entry
                .file_type()
                .map_err(|_| self.err(Fault::Io, child_target.clone()))?;
            if file_type.is_symlink() {
                self.add_real_symlink(&entry.path(), Some(&child_target))?;
            } else if file_type.is_dir() {
                self.add_real_directory(&entry.path(), read_only, Some(&child_target))?;
            } else {
                self.add_real_file(&entry.path(), read_only, Some(&child_target))?;
            }
        }
        Ok(root)
    }

    /// Map a real symlink into the fake tree with the same target.
    pub(crate) fn add_real_symlink(
        &mut self,
        real_path: &Path,
        target_path: Option<&str>,
    ) -> FsResult<NodeId> {
        let link_target = std::fs::read_link(real_path)
            .map_err(|_| self.err(Fault::NotFound, real_path.display().to_string()))?;
        let fake_path = match target_path {
            Some(t) => t.to_string(),
            None => real_path.to_string_lossy().into_owned(),
        };
        self.create_symlink(&fake_path, &link_target.to_string_lossy())
    }

    /// Map a list of real files or directories, each at its own path.
    pub(crate) fn add_real_paths(&mut self, real_paths: &[PathBuf], read_only: bool) -> FsResult<()> {
        for real in real_paths {
            let meta = std::fs::symlink_metadata(real)
                .map_err(|_| self.err(Fault::NotFound, real.display().to_string()))?;
            if meta.file_type().is_symlink() {
                self.add_real_symlink(real, None)?;
            } else if meta.is_dir() {
                self.add_real_directory(real, read_only, None)?;
            } else {
                self.add_real_file(real, read_only, None)?;
            }
        }
        Ok(())
    }

    fn charge_import(&mut self, dev: u64, size: u64, abs: &str) -> FsResult<()> {
        if size == 0 {
            return Ok(());
        }
        if let Some(idx) = self.mounts.index_of_dev(dev) {
            self.mounts
                .change_used(&self.profile, idx, size as i64)
                .map_err(|e| self.err(e.kind(), abs.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn real_perm(meta: &std::fs::Metadata) -> u32 {
    meta.mode() & 0o7777
}

#[cfg(not(unix))]
fn real_perm(meta: &std::fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
