//! Windows-specific filesystem extensions.
//!
//! Mirrors `std::os::windows::fs::{symlink_file, symlink_dir}`. Both work
//! against the Windows profile on any host; real-OS fallback requires a
//! Windows host.

use crate::world::path_str;
use crate::FsContext;
use std::io::Result;
use std::path::Path;

/// Creates a new symlink to a file.
pub fn symlink_file<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    symlink_any(original.as_ref(), link.as_ref())
}

/// Creates a new symlink to a directory.
pub fn symlink_dir<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    symlink_any(original.as_ref(), link.as_ref())
}

fn symlink_any(original: &Path, link: &Path) -> Result<()> {
    let original = original.to_path_buf();
    let link = link.to_path_buf();
    FsContext::route(
        |fs| {
            fs.symlink(&path_str(&original), &path_str(&link))
                .map(|_| ())
                .map_err(std::io::Error::from)
        },
        || real_symlink(&original, &link),
    )
}

#[cfg(windows)]
fn real_symlink(original: &Path, link: &Path) -> Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    }
}

#[cfg(not(windows))]
fn real_symlink(_original: &Path, _link: &Path) -> Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "Windows symlinks need a Windows host when the engine is paused",
    ))
}
