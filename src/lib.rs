//! In-memory emulation of POSIX and Windows filesystems for fast,
//! hermetic tests.
//!
//! Veneer keeps a whole filesystem - directories, files, symlinks, hard
//! links, mounts, permissions, timestamps - in memory and answers the
//! standard file APIs from it. Test code swaps its `std::fs` imports for
//! the [`shim`] types and runs unchanged, without touching the disk:
//!
//! ```
//! use veneer::shim::std::fs::{read_to_string, write};
//!
//! let fs = veneer::Builder::new().build();
//! let _guard = fs.enter();
//!
//! veneer::create_dir("/notes")?;
//! write("/notes/today.txt", "plan the week")?;
//! assert_eq!(read_to_string("/notes/today.txt")?, "plan the week");
//! # veneer::Result::Ok(())
//! ```
//!
//! The emulated OS is configurable independently of the host, so Windows
//! path handling is testable on Linux and vice versa:
//!
//! ```
//! use veneer::Os;
//! use veneer::shim::std::fs::read;
//!
//! let fs = veneer::Builder::new().os(Os::Windows).build();
//! let _guard = fs.enter();
//!
//! fs.create_file("C:\\Data\\Report.TXT", b"q3")?;
//! // Separators and case both fold on the Windows profile.
//! assert_eq!(read("c:/data/report.txt")?, b"q3");
//! # veneer::Result::Ok(())
//! ```
//!
//! While a handle is [paused](FsHandle::pause), the shims forward to the
//! real OS; [resume](FsHandle::resume) routes them back to the fake tree,
//! which is retained across pauses.

#![feature(io_error_more)]

mod builder;
pub use builder::Builder;

mod config;
pub use config::PatchMode;

mod engine;
pub use engine::{ScanEntry, Stat};

mod error;
pub use error::{Fault, FsError, Result};

mod fd;
pub use fd::Newline;

mod ident;

mod import;

mod mount;
pub use mount::DiskUsage;

mod node;
pub use node::{Encoding, NodeId};

mod path;

mod profile;
pub use profile::Os;

mod resolve;

mod world;
pub use world::{FsGuard, FsHandle};
pub(crate) use world::FsContext;

pub mod glob;
pub mod shim;
pub mod walk;

pub(crate) const TRACING_TARGET: &str = "veneer";

use std::path::{Path, PathBuf};
use std::time::Duration;

fn with_current<R>(f: impl FnOnce(&mut engine::Fs) -> R) -> R {
    FsContext::current(f)
}

/// Create a regular file on the current fake filesystem, creating missing
/// parent directories.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn create_file(path: impl AsRef<Path>, contents: &[u8]) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.create_file(&world::path_str(path.as_ref()), contents, None, None)
            .map(|_| ())
    })
}

/// Create a file that reports `size` bytes without holding contents.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn create_file_with_size(
    path: impl AsRef<Path>,
    size: u64,
) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.create_file_with_size(&world::path_str(path.as_ref()), size)
            .map(|_| ())
    })
}

/// Create a directory and any missing ancestors on the current fake
/// filesystem.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn create_dir(path: impl AsRef<Path>) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.create_dir(&world::path_str(path.as_ref()), None).map(|_| ()))
}

/// Create a symlink on the current fake filesystem.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn create_symlink(
    link: impl AsRef<Path>,
    target: impl AsRef<Path>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.create_symlink(
            &world::path_str(link.as_ref()),
            &world::path_str(target.as_ref()),
        )
        .map(|_| ())
    })
}

/// Create a hard link on the current fake filesystem.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn create_link(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.create_link(
            &world::path_str(src.as_ref()),
            &world::path_str(dst.as_ref()),
        )
    })
}

/// Map a real file into the current fake tree as a lazy read-through.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn add_real_file(
    real_path: impl AsRef<Path>,
    read_only: bool,
    target_path: Option<&str>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.add_real_file(real_path.as_ref(), read_only, target_path)
            .map(|_| ())
    })
}

/// Map a real directory tree into the current fake tree.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn add_real_directory(
    real_path: impl AsRef<Path>,
    read_only: bool,
    target_path: Option<&str>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.add_real_directory(real_path.as_ref(), read_only, target_path)
            .map(|_| ())
    })
}

/// Map a real symlink into the current fake tree.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn add_real_symlink(
    real_path: impl AsRef<Path>,
    target_path: Option<&str>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| {
        fs.add_real_symlink(real_path.as_ref(), target_path)
            .map(|_| ())
    })
}

/// Map several real paths into the current fake tree.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn add_real_paths(
    real_paths: &[PathBuf],
    read_only: bool,
) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.add_real_paths(real_paths, read_only))
}

/// Mount a fresh device at `path` on the current fake filesystem.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn add_mount_point(
    path: impl AsRef<Path>,
    total_size: Option<u64>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.add_mount_point(&world::path_str(path.as_ref()), total_size))
}

/// Set the byte budget of the mount enclosing `path`.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn set_disk_usage(total: u64, path: impl AsRef<Path>) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.set_disk_usage(total, &world::path_str(path.as_ref())))
}

/// Disk usage of the mount enclosing `path`.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn get_disk_usage(path: impl AsRef<Path>) -> std::result::Result<DiskUsage, FsError> {
    with_current(|fs| fs.disk_usage(&world::path_str(path.as_ref())))
}

/// Adjust the used-bytes counter of the mount enclosing `path`.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn change_disk_usage(delta: i64, path: impl AsRef<Path>) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.change_disk_usage(delta, &world::path_str(path.as_ref())))
}

/// Set access and modification times on the current fake filesystem.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn utime(
    path: impl AsRef<Path>,
    times: Option<(Duration, Duration)>,
) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.utime(&world::path_str(path.as_ref()), times, true))
}

/// Probe access rights against the effective identity; mode is an
/// `R_OK`/`W_OK`/`X_OK` style mask, 0 checks existence.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn access(path: impl AsRef<Path>, mode: u32) -> std::result::Result<bool, FsError> {
    with_current(|fs| fs.access(&world::path_str(path.as_ref()), mode))
}

/// Truncate or extend a file by path, padding with NUL bytes.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn truncate(path: impl AsRef<Path>, size: u64) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.truncate(&world::path_str(path.as_ref()), size))
}

/// Whether two paths resolve to the same inode on the same device.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn samefile(
    a: impl AsRef<Path>,
    b: impl AsRef<Path>,
) -> std::result::Result<bool, FsError> {
    with_current(|fs| {
        let sa = fs.stat(&world::path_str(a.as_ref()), true)?;
        let sb = fs.stat(&world::path_str(b.as_ref()), true)?;
        Ok(sa.ino == sb.ino && sa.dev == sb.dev)
    })
}

/// The fake working directory.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn cwd() -> String {
    with_current(|fs| fs.getcwd())
}

/// Change the fake working directory.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn set_cwd(path: impl AsRef<Path>) -> std::result::Result<(), FsError> {
    with_current(|fs| fs.chdir(&world::path_str(path.as_ref())))
}

/// Discard all state of the current fake filesystem and rebuild the
/// initial tree.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn reset() {
    with_current(|fs| fs.reset());
}

/// Route shim calls on the current fake filesystem back to the real OS.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn pause() {
    with_current(|fs| fs.pause());
}

/// Route shim calls to the current fake engine again.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn resume() {
    with_current(|fs| fs.resume());
}

/// Drop cached contents of unmodified lazy imports.
///
/// Must be called with a fake filesystem entered on this thread.
pub fn clear_cache() {
    with_current(|fs| fs.clear_cache());
}
