//! Path resolution: walking component sequences to inodes.
//!
//! The walker starts at the instance's anchor directory, expands symlinks
//! up to the profile bound, applies the case policy per component, checks
//! the search bit on every traversed directory and tracks mount crossings.
//! `..` never reaches the walker; it is resolved lexically during
//! normalization, the way the emulated path modules do it.

use crate::engine::Fs;
use crate::error::{Fault, FsResult};
use crate::node::{NodeData, NodeId};
use crate::path;
use std::collections::VecDeque;

/// A fully resolved path.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolved {
    pub node: NodeId,
    /// Index of the mount the node lives on.
    pub mount: usize,
}

/// The result of a parent-directory lookup.
///
/// `existing` is the final entry if present; otherwise `parent` and `name`
/// tell the caller where the entry would be created.
#[derive(Debug, Clone)]
pub(crate) struct Lookup {
    pub parent: NodeId,
    pub parent_mount: usize,
    /// The requested final component; empty for the root itself.
    pub name: String,
    /// The stored key when the entry was found through case folding.
    pub stored_name: Option<String>,
    pub existing: Option<NodeId>,
    pub existing_mount: usize,
    /// The canonical path of the entry (or of where it would be), with
    /// every symlink expanded.
    pub resolved_path: String,
}

impl Fs {
    /// Absolutize a raw path, enforce length limits and make sure the
    /// drive mount exists on the Windows profile.
    pub(crate) fn prepare(&mut self, p: &str) -> FsResult<String> {
        if p.is_empty() {
            return Err(self.err(Fault::NotFound, String::new()));
        }
        let abs = path::absolutize(&self.profile, &self.cwd, p);
        if abs.len() > self.profile.max_path_len {
            return Err(self.err(Fault::NameTooLong, abs));
        }
        if self.profile.is_windows() {
            let (drive, _) = path::split_drive(&self.profile, &abs);
            if !drive.is_empty() {
                let name = if drive.starts_with(self.profile.sep) {
                    drive.to_string()
                } else {
                    drive.to_uppercase()
                };
                let known = self
                    .nodes
                    .get(self.super_root)
                    .as_dir()
                    .and_then(|d| d.lookup(&self.profile, &name))
                    .is_some();
                if !known {
                    // Touching a new drive letter (or share) mounts it with
                    // the default budget.
                    self.add_drive(&name, None);
                }
            }
        }
        Ok(abs)
    }

    /// Resolve a prepared path to its inode.
    pub(crate) fn resolve_path(&self, abs: &str, follow_last: bool) -> FsResult<Resolved> {
        let lookup = self.lookup_path(abs, follow_last)?;
        match lookup.existing {
            Some(node) => Ok(Resolved {
                node,
                mount: lookup.existing_mount,
            }),
            None => Err(self.err(Fault::NotFound, abs.to_string())),
        }
    }

    /// Walk a prepared path, returning the parent directory and the final
    /// entry if it exists.
    pub(crate) fn lookup_path(&self, abs: &str, follow_last: bool) -> FsResult<Lookup> {
        let p = self.profile.clone();

        if p.is_windows() {
            let base = path::basename(&p, abs);
            if p.is_reserved_name(&base) {
                // Reserved device names are valid anywhere and alias the
                // null sink.
                return Ok(Lookup {
                    parent: self.super_root,
                    parent_mount: 0,
                    name: base.clone(),
                    stored_name: None,
                    existing: Some(self.dev_null),
                    existing_mount: 0,
                    resolved_path: base,
                });
            }
        }

        let mut comps: VecDeque<String> = path::components(&p, abs).into();
        let mut cur = self.super_root;
        let mut cur_mount = 0usize;
        let mut cur_path = self.root_anchor();
        let mut depth = 0usize;

        if comps.is_empty() {
            return Ok(Lookup {
                parent: cur,
                parent_mount: 0,
                name: String::new(),
                stored_name: None,
                existing: Some(cur),
                existing_mount: 0,
                resolved_path: self.profile.root_path(),
            });
        }

        loop {
            let name = comps.pop_front().expect("loop exits before emptying");
            let is_last = comps.is_empty();
            let node = self.nodes.get(cur);
            let dir = node
                .as_dir()
                .ok_or_else(|| self.err(Fault::NotADir, abs.to_string()))?;
            if !self.ident.check(node, crate::ident::X_OK) {
                return Err(self.err(Fault::PermissionDenied, abs.to_string()));
            }
            // POSIX caps name bytes; Windows caps UTF-16 units.
            let name_len = if p.is_windows() {
                name.encode_utf16().count()
            } else {
                name.len()
            };
            if name_len > p.max_name_len {
                return Err(self.err(Fault::NameTooLong, abs.to_string()));
            }

            let Some((stored, id)) = dir.lookup(&p, &name) else {
                if is_last {
                    let resolved_path = if p.is_windows() && cur == self.super_root {
                        format!("{name}{}", p.sep)
                    } else {
                        path::join(&p, &cur_path, &name)
                    };
                    return Ok(Lookup {
                        parent: cur,
                        parent_mount: cur_mount,
                        name,
                        stored_name: None,
                        existing: None,
                        existing_mount: cur_mount,
                        resolved_path,
                    });
                }
                return Err(self.err(Fault::NotFound, abs.to_string()));
            };
            let stored = stored.to_string();
            let child = self.nodes.get(id);

            if child.is_symlink() && (!is_last || follow_last) {
                depth += 1;
                if depth > p.max_link_depth {
                    return Err(self.err(Fault::LinkLoop, abs.to_string()));
                }
                let target = match &child.data {
                    NodeData::Symlink(s) => path::norm_seps(&p, &s.target),
                    _ => unreachable!("checked is_symlink above"),
                };
                let mut rebased = path::absolutize(&p, &cur_path, &target);
                for rest in &comps {
                    rebased = path::join(&p, &rebased, rest);
                }
                let rebased = path::normpath(&p, &rebased);
                if rebased.len() > p.max_path_len {
                    return Err(self.err(Fault::NameTooLong, abs.to_string()));
                }
                comps = path::components(&p, &rebased).into();
                cur = self.super_root;
                cur_mount = 0;
                cur_path = self.root_anchor();
                if comps.is_empty() {
                    return Ok(Lookup {
                        parent: cur,
                        parent_mount: 0,
                        name: String::new(),
                        stored_name: None,
                        existing: Some(cur),
                        existing_mount: 0,
                        resolved_path: self.profile.root_path(),
                    });
                }
                continue;
            }

            let parent = cur;
            let parent_mount = cur_mount;
            cur_path = if p.is_windows() && cur == self.super_root {
                format!("{stored}{}", p.sep)
            } else {
                path::join(&p, &cur_path, &stored)
            };
            cur_mount = self.mounts.index_of_root(id).unwrap_or(cur_mount);
            cur = id;

            if is_last {
                return Ok(Lookup {
                    parent,
                    parent_mount,
                    name,
                    stored_name: Some(stored),
                    existing: Some(cur),
                    existing_mount: cur_mount,
                    resolved_path: cur_path,
                });
            }
        }
    }

    /// Whether `node` lies on the ancestor chain of `dir` (or is `dir`).
    pub(crate) fn is_ancestor(&self, node: NodeId, dir: NodeId) -> bool {
        let mut cur = dir;
        loop {
            if cur == node {
                return true;
            }
            match self.nodes.get(cur).as_dir().and_then(|d| d.parent) {
                Some(parent) if parent != cur => cur = parent,
                _ => return false,
            }
        }
    }
}
