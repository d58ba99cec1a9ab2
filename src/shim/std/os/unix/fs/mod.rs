//! Unix-specific filesystem extensions.
//!
//! Implements the real `std::os::unix::fs` traits for the shimmed
//! [`File`], [`OpenOptions`], [`Permissions`], [`DirBuilder`] and
//! [`Metadata`] types, so user code keeps importing the traits from `std`:
//!
//! ```ignore
//! use veneer::shim::std::fs::File;
//! use std::os::unix::fs::FileExt; // the real trait works with our type
//! ```
//!
//! Also provides the free functions `symlink`, `chown` and `lchown`,
//! answered by the fake engine (or the real OS when paused).

use crate::shim::std::fs::{DirBuilder, File, Metadata, OpenOptions, Permissions};
use crate::world::path_str;
use crate::FsContext;
use std::io::Result;
use std::path::Path;

#[cfg(unix)]
impl std::os::unix::fs::FileExt for File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.read_at_impl(buf, offset)
    }

    fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        self.write_at_impl(buf, offset)
    }
}

#[cfg(unix)]
impl std::os::unix::fs::OpenOptionsExt for OpenOptions {
    fn mode(&mut self, mode: u32) -> &mut Self {
        self.set_mode(mode);
        self
    }

    fn custom_flags(&mut self, flags: i32) -> &mut Self {
        self.set_custom_flags(flags);
        self
    }
}

#[cfg(unix)]
impl std::os::unix::fs::PermissionsExt for Permissions {
    fn mode(&self) -> u32 {
        self.mode_bits()
    }

    fn set_mode(&mut self, mode: u32) {
        self.set_mode_bits(mode);
    }

    fn from_mode(mode: u32) -> Permissions {
        Permissions::from_mode_bits(mode)
    }
}

#[cfg(unix)]
impl std::os::unix::fs::DirBuilderExt for DirBuilder {
    fn mode(&mut self, mode: u32) -> &mut Self {
        self.set_mode(mode);
        self
    }
}

#[cfg(unix)]
impl std::os::unix::fs::MetadataExt for Metadata {
    fn dev(&self) -> u64 {
        self.stat().dev
    }

    fn ino(&self) -> u64 {
        self.stat().ino
    }

    fn mode(&self) -> u32 {
        self.stat().mode
    }

    fn nlink(&self) -> u64 {
        self.stat().nlink
    }

    fn uid(&self) -> u32 {
        self.stat().uid
    }

    fn gid(&self) -> u32 {
        self.stat().gid
    }

    fn rdev(&self) -> u64 {
        0
    }

    fn size(&self) -> u64 {
        self.len()
    }

    fn atime(&self) -> i64 {
        self.stat().atime.as_secs() as i64
    }

    fn atime_nsec(&self) -> i64 {
        self.stat().atime.subsec_nanos() as i64
    }

    fn mtime(&self) -> i64 {
        self.stat().mtime.as_secs() as i64
    }

    fn mtime_nsec(&self) -> i64 {
        self.stat().mtime.subsec_nanos() as i64
    }

    fn ctime(&self) -> i64 {
        self.stat().ctime.as_secs() as i64
    }

    fn ctime_nsec(&self) -> i64 {
        self.stat().ctime.subsec_nanos() as i64
    }

    fn blksize(&self) -> u64 {
        4096
    }

    fn blocks(&self) -> u64 {
        self.len().div_ceil(512)
    }
}

/// Creates a new symbolic link on the fake filesystem.
pub fn symlink<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    let original = original.as_ref().to_path_buf();
    let link = link.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.symlink(&path_str(&original), &path_str(&link))
                .map(|_| ())
                .map_err(std::io::Error::from)
        },
        || real_symlink(&original, &link),
    )
}

/// Changes the owner and group of a path, following symlinks.
///
/// `None` keeps the current value. Without root, only the owner may
/// change the group, and only to one of their own groups.
pub fn chown<P: AsRef<Path>>(path: P, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.chown(&path_str(&path), uid, gid, true)
                .map_err(std::io::Error::from)
        },
        || real_chown(&path, uid, gid),
    )
}

/// Changes the owner and group of a symlink itself.
pub fn lchown<P: AsRef<Path>>(path: P, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.chown(&path_str(&path), uid, gid, false)
                .map_err(std::io::Error::from)
        },
        || real_lchown(&path, uid, gid),
    )
}

#[cfg(unix)]
fn real_symlink(original: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(unix)]
fn real_chown(path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
    std::os::unix::fs::chown(path, uid, gid)
}

#[cfg(unix)]
fn real_lchown(path: &Path, uid: Option<u32>, gid: Option<u32>) -> Result<()> {
    std::os::unix::fs::lchown(path, uid, gid)
}

#[cfg(not(unix))]
fn real_symlink(_original: &Path, _link: &Path) -> Result<()> {
    unsupported()
}

#[cfg(not(unix))]
fn real_chown(_path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<()> {
    unsupported()
}

#[cfg(not(unix))]
fn real_lchown(_path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> Result<()> {
    unsupported()
}

#[cfg(not(unix))]
fn unsupported() -> Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Unix filesystem calls need a Unix host when the engine is paused",
    ))
}
