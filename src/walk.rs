//! Depth-first directory traversal built on the shimmed directory scan.
//!
//! Mirrors the classic `os.walk` contract: each visited directory yields
//! its path plus the names of its subdirectories and files, with
//! configurable recursion order and symlink handling. Because it sits on
//! the shim layer, the same walk runs against the fake tree or, while the
//! engine is paused, against the real disk.

use crate::shim::std::fs::{metadata, read_dir};
use std::io;
use std::path::{Path, PathBuf};

/// One visited directory.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// The directory itself.
    pub dir: PathBuf,
    /// Names of subdirectories, in listing order. Symlinks to directories
    /// are listed here but only descended into when following links.
    pub dirs: Vec<String>,
    /// Names of non-directory entries, in listing order.
    pub files: Vec<String>,
}

/// Start a walk rooted at `top`, visiting parents before children.
///
/// ```
/// let fs = veneer::Builder::new().build();
/// let _guard = fs.enter();
/// fs.create_file("/tree/a/one.txt", b"1").unwrap();
/// fs.create_file("/tree/two.txt", b"2").unwrap();
///
/// for entry in veneer::walk::walk("/tree") {
///     let entry = entry.unwrap();
///     println!("{}: {:?}", entry.dir.display(), entry.files);
/// }
/// ```
pub fn walk(top: impl AsRef<Path>) -> Walk {
    Walk {
        topdown: true,
        followlinks: false,
        stack: vec![top.as_ref().to_path_buf()],
        collected: None,
    }
}

/// Iterator over [`WalkEntry`] items.
///
/// Unreadable directories surface as `Err` items and are not descended
/// into; callers that want best-effort traversal simply skip them.
pub struct Walk {
    topdown: bool,
    followlinks: bool,
    stack: Vec<PathBuf>,
    collected: Option<std::vec::IntoIter<io::Result<WalkEntry>>>,
}

impl Walk {
    /// Descend into symlinked directories as well. Off by default.
    pub fn followlinks(mut self, value: bool) -> Self {
        self.followlinks = value;
        self
    }

    /// Visit children before their parents.
    pub fn bottom_up(mut self) -> Self {
        self.topdown = false;
        self
    }

    fn scan_dir(&self, dir: &Path) -> io::Result<(WalkEntry, Vec<PathBuf>)> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut descend = Vec::new();
        for entry in read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let lmeta = entry.metadata()?;
            let is_symlink = lmeta.is_symlink();
            let is_dir = if is_symlink {
                metadata(entry.path()).map(|m| m.is_dir()).unwrap_or(false)
            } else {
                lmeta.is_dir()
            };
            if is_dir {
                if !is_symlink || self.followlinks {
                    descend.push(entry.path());
                }
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
        Ok((
            WalkEntry {
                dir: dir.to_path_buf(),
                dirs,
                files,
            },
            descend,
        ))
    }

    fn collect_bottom_up(&self, dir: &Path, out: &mut Vec<io::Result<WalkEntry>>) {
        match self.scan_dir(dir) {
            Ok((entry, descend)) => {
                for child in descend {
                    self.collect_bottom_up(&child, out);
                }
                out.push(Ok(entry));
            }
            Err(e) => out.push(Err(e)),
        }
    }
}

impl Iterator for Walk {
    type Item = io::Result<WalkEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.topdown {
            if self.collected.is_none() {
                let root = self.stack.pop()?;
                let mut out = Vec::new();
                self.collect_bottom_up(&root, &mut out);
                self.collected = Some(out.into_iter());
            }
            return self.collected.as_mut()?.next();
        }

        let dir = self.stack.pop()?;
        match self.scan_dir(&dir) {
            Ok((entry, descend)) => {
                // Depth-first: the first subdirectory is visited next.
                for child in descend.into_iter().rev() {
                    self.stack.push(child);
                }
                Some(Ok(entry))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
