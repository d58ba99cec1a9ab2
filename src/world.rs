//! The process-wide current filesystem and the handle tests hold.
//!
//! A test builds an [`FsHandle`] and enters it; while the guard lives,
//! every shim call on that thread is answered by the fake engine. Entering
//! nests: re-entering the same handle shares the one engine instance
//! without re-initialization, and the state survives until the outermost
//! guard drops.

use crate::config::PatchMode;
use crate::engine::{Fs, Stat};
use crate::error::FsError;
use crate::mount::DiskUsage;
use crate::node::Encoding;
use crate::profile::Os;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

thread_local! {
    static CURRENT: RefCell<Vec<Arc<Mutex<Fs>>>> = const { RefCell::new(Vec::new()) };
}

/// Access to the current engine for shims and crate-level functions.
pub(crate) struct FsContext;

impl FsContext {
    /// Run `f` against the current engine.
    ///
    /// # Panics
    ///
    /// Panics if no fake filesystem has been entered on this thread.
    pub(crate) fn current<R>(f: impl FnOnce(&mut Fs) -> R) -> R {
        CURRENT.with(|stack| {
            let stack = stack.borrow();
            let fs = stack
                .last()
                .expect("no fake filesystem is active on this thread");
            let mut guard = fs.lock().unwrap();
            f(&mut guard)
        })
    }

    /// Run `f` if an engine is active; used in drop paths.
    pub(crate) fn current_if_set(f: impl FnOnce(&mut Fs)) {
        CURRENT.with(|stack| {
            let stack = stack.borrow();
            if let Some(fs) = stack.last() {
                let mut guard = fs.lock().unwrap();
                f(&mut guard);
            }
        });
    }

    /// Answer with the fake engine, or fall through to the real OS when
    /// no engine is active or the active engine is paused.
    pub(crate) fn route<R>(fake: impl FnOnce(&mut Fs) -> R, real: impl FnOnce() -> R) -> R {
        let active = CURRENT.with(|stack| stack.borrow().last().cloned());
        match active {
            Some(fs) => {
                let mut guard = fs.lock().unwrap();
                if guard.paused {
                    drop(guard);
                    real()
                } else {
                    fake(&mut guard)
                }
            }
            None => real(),
        }
    }
}

/// Guard keeping a fake filesystem current on this thread.
///
/// Dropping the guard restores whatever was current before.
#[must_use = "the fake filesystem is only active while this guard is held"]
pub struct FsGuard {
    _private: (),
}

impl Drop for FsGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// A handle to one fake filesystem instance.
///
/// The handle is cheap to clone and safe to send to other threads; all
/// operations serialize on the engine mutex. Most tests enter the handle
/// once and then use the crate-level functions or the shim types:
///
/// ```
/// use veneer::Builder;
///
/// let fs = Builder::new().build();
/// let _guard = fs.enter();
/// veneer::create_file("/data/hello.txt", b"hi").unwrap();
/// assert_eq!(veneer::shim::std::fs::read("/data/hello.txt").unwrap(), b"hi");
/// ```
#[derive(Clone)]
pub struct FsHandle {
    pub(crate) inner: Arc<Mutex<Fs>>,
}

impl FsHandle {
    pub(crate) fn new(fs: Fs) -> FsHandle {
        FsHandle {
            inner: Arc::new(Mutex::new(fs)),
        }
    }

    /// Deep-copy the instance: an independent filesystem with identical
    /// contents. There is no stable serialized form; the copy only makes
    /// sense within the process.
    pub fn fork(&self) -> FsHandle {
        FsHandle::new(self.with(|fs| fs.clone()))
    }

    /// Make this instance the current filesystem for the calling thread.
    pub fn enter(&self) -> FsGuard {
        CURRENT.with(|stack| {
            stack.borrow_mut().push(Arc::clone(&self.inner));
        });
        FsGuard { _private: () }
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut Fs) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        f(&mut guard)
    }

    /// Create a regular file with the given contents, creating missing
    /// parent directories.
    pub fn create_file(&self, path: impl AsRef<Path>, contents: &[u8]) -> Result<(), FsError> {
        self.with(|fs| {
            fs.create_file(&path_str(path.as_ref()), contents, None, None)
                .map(|_| ())
        })
    }

    /// Create a regular file with explicit permission bits and an optional
    /// encoding hint for text-mode opens.
    pub fn create_file_with(
        &self,
        path: impl AsRef<Path>,
        contents: &[u8],
        mode: u32,
        encoding: Option<Encoding>,
    ) -> Result<(), FsError> {
        self.with(|fs| {
            fs.create_file(&path_str(path.as_ref()), contents, Some(mode), encoding)
                .map(|_| ())
        })
    }

    /// Create a file that reports `size` bytes without holding contents.
    pub fn create_file_with_size(
        &self,
        path: impl AsRef<Path>,
        size: u64,
    ) -> Result<(), FsError> {
        self.with(|fs| fs.create_file_with_size(&path_str(path.as_ref()), size).map(|_| ()))
    }

    /// Create a directory and any missing ancestors.
    pub fn create_dir(&self, path: impl AsRef<Path>) -> Result<(), FsError> {
        self.with(|fs| fs.create_dir(&path_str(path.as_ref()), None).map(|_| ()))
    }

    /// Create a symlink to `target`, creating missing parent directories.
    pub fn create_symlink(
        &self,
        link: impl AsRef<Path>,
        target: impl AsRef<Path>,
    ) -> Result<(), FsError> {
        self.with(|fs| {
            fs.create_symlink(&path_str(link.as_ref()), &path_str(target.as_ref()))
                .map(|_| ())
        })
    }

    /// Create a hard link, creating missing parent directories.
    pub fn create_link(
        &self,
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
    ) -> Result<(), FsError> {
        self.with(|fs| fs.create_link(&path_str(src.as_ref()), &path_str(dst.as_ref())))
    }

    /// Map a real file into the fake tree as a lazy read-through.
    pub fn add_real_file(
        &self,
        real_path: impl AsRef<Path>,
        read_only: bool,
        target_path: Option<&str>,
    ) -> Result<(), FsError> {
        self.with(|fs| {
            fs.add_real_file(real_path.as_ref(), read_only, target_path)
                .map(|_| ())
        })
    }

    /// Map a real directory tree into the fake tree.
    pub fn add_real_directory(
        &self,
        real_path: impl AsRef<Path>,
        read_only: bool,
        target_path: Option<&str>,
    ) -> Result<(), FsError> {
        self.with(|fs| {
            fs.add_real_directory(real_path.as_ref(), read_only, target_path)
                .map(|_| ())
        })
    }

    /// Map a real symlink into the fake tree with the same target.
    pub fn add_real_symlink(
        &self,
        real_path: impl AsRef<Path>,
        target_path: Option<&str>,
    ) -> Result<(), FsError> {
        self.with(|fs| fs.add_real_symlink(real_path.as_ref(), target_path).map(|_| ()))
    }

    /// Map several real paths at once.
    pub fn add_real_paths(&self, real_paths: &[PathBuf], read_only: bool) -> Result<(), FsError> {
        self.with(|fs| fs.add_real_paths(real_paths, read_only))
    }

    /// Mount a fresh device at `path` with an optional byte budget.
    pub fn add_mount_point(
        &self,
        path: impl AsRef<Path>,
        total_size: Option<u64>,
    ) -> Result<(), FsError> {
        self.with(|fs| fs.add_mount_point(&path_str(path.as_ref()), total_size))
    }

    /// Set the byte budget of the mount enclosing `path`.
    pub fn set_disk_usage(&self, total: u64, path: impl AsRef<Path>) -> Result<(), FsError> {
        self.with(|fs| fs.set_disk_usage(total, &path_str(path.as_ref())))
    }

    /// Disk usage of the mount enclosing `path`.
    pub fn get_disk_usage(&self, path: impl AsRef<Path>) -> Result<DiskUsage, FsError> {
        self.with(|fs| fs.disk_usage(&path_str(path.as_ref())))
    }

    /// Adjust the used-bytes counter of the mount enclosing `path`.
    pub fn change_disk_usage(&self, delta: i64, path: impl AsRef<Path>) -> Result<(), FsError> {
        self.with(|fs| fs.change_disk_usage(delta, &path_str(path.as_ref())))
    }

    /// Stat through symlinks.
    pub fn stat(&self, path: impl AsRef<Path>) -> Result<Stat, FsError> {
        self.with(|fs| fs.stat(&path_str(path.as_ref()), true))
    }

    /// Stat without following a trailing symlink.
    pub fn lstat(&self, path: impl AsRef<Path>) -> Result<Stat, FsError> {
        self.with(|fs| fs.stat(&path_str(path.as_ref()), false))
    }

    /// Discard all state and rebuild the initial tree.
    pub fn reset(&self) {
        self.with(|fs| fs.reset());
    }

    /// Route shim calls back to the real OS until [`resume`].
    ///
    /// The fake tree is retained across pauses.
    ///
    /// [`resume`]: FsHandle::resume
    pub fn pause(&self) {
        self.with(|fs| fs.pause());
    }

    /// Route shim calls to the fake engine again.
    pub fn resume(&self) {
        self.with(|fs| fs.resume());
    }

    /// Drop cached contents of unmodified lazy imports.
    pub fn clear_cache(&self) {
        self.with(|fs| fs.clear_cache());
    }

    /// Switch the emulated OS. The tree is rebuilt from scratch.
    pub fn set_os(&self, os: Os) {
        self.with(|fs| fs.set_os(os));
    }

    /// The emulated OS.
    pub fn os(&self) -> Os {
        self.with(|fs| fs.profile.os)
    }

    /// Set the effective uid for permission checks.
    pub fn set_uid(&self, uid: u32) {
        self.with(|fs| fs.set_ids(Some(uid), None));
    }

    /// Set the effective gid for permission checks.
    pub fn set_gid(&self, gid: u32) {
        self.with(|fs| fs.set_ids(None, Some(gid)));
    }

    /// Restore the host's real uid and gid.
    pub fn reset_ids(&self) {
        self.with(|fs| fs.reset_ids());
    }

    /// Replace the umask, returning the previous value.
    pub fn set_umask(&self, umask: u32) -> u32 {
        self.with(|fs| fs.set_umask(umask))
    }

    /// The current working directory of the fake filesystem.
    pub fn cwd(&self) -> String {
        self.with(|fs| fs.getcwd())
    }

    /// The synthetic temp directory pre-created on every reset, following
    /// the emulated OS convention.
    pub fn temp_dir(&self) -> String {
        self.with(|fs| fs.profile.temp_dir())
    }

    /// Change the fake working directory.
    pub fn set_cwd(&self, path: impl AsRef<Path>) -> Result<(), FsError> {
        self.with(|fs| fs.chdir(&path_str(path.as_ref())))
    }

    /// Set access and modification times with nanosecond precision.
    pub fn utime(
        &self,
        path: impl AsRef<Path>,
        times: Option<(Duration, Duration)>,
    ) -> Result<(), FsError> {
        self.with(|fs| fs.utime(&path_str(path.as_ref()), times, true))
    }

    /// Change permission bits, following symlinks.
    ///
    /// On the Windows profile only the write bits are honored unless the
    /// instance was built with `windows_unix_mode`.
    pub fn chmod(&self, path: impl AsRef<Path>, mode: u32) -> Result<(), FsError> {
        self.with(|fs| fs.chmod(&path_str(path.as_ref()), mode, true))
    }

    /// Change permission bits of the entry itself, without following a
    /// trailing symlink.
    pub fn lchmod(&self, path: impl AsRef<Path>, mode: u32) -> Result<(), FsError> {
        self.with(|fs| fs.chmod(&path_str(path.as_ref()), mode, false))
    }

    /// Truncate or extend a file by path, padding with NUL bytes.
    pub fn truncate(&self, path: impl AsRef<Path>, size: u64) -> Result<(), FsError> {
        self.with(|fs| fs.truncate(&path_str(path.as_ref()), size))
    }

    /// Whether two paths resolve to the same inode on the same device.
    pub fn samefile(
        &self,
        a: impl AsRef<Path>,
        b: impl AsRef<Path>,
    ) -> Result<bool, FsError> {
        self.with(|fs| {
            let sa = fs.stat(&path_str(a.as_ref()), true)?;
            let sb = fs.stat(&path_str(b.as_ref()), true)?;
            Ok(sa.ino == sb.ino && sa.dev == sb.dev)
        })
    }

    /// Join two path fragments under the instance's profile.
    pub fn join(&self, base: impl AsRef<Path>, tail: impl AsRef<Path>) -> String {
        self.with(|fs| {
            crate::path::join(
                &fs.profile,
                &path_str(base.as_ref()),
                &path_str(tail.as_ref()),
            )
        })
    }

    /// Normalize a path lexically under the instance's profile.
    pub fn normpath(&self, path: impl AsRef<Path>) -> String {
        self.with(|fs| crate::path::normpath(&fs.profile, &path_str(path.as_ref())))
    }

    /// The longest common sub-path under the instance's profile, if the
    /// paths agree on drive and absoluteness.
    pub fn commonpath(&self, paths: &[&str]) -> Option<String> {
        self.with(|fs| crate::path::commonpath(&fs.profile, paths))
    }

    /// Change the owner and group; `None` keeps the current value.
    pub fn chown(
        &self,
        path: impl AsRef<Path>,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> Result<(), FsError> {
        self.with(|fs| fs.chown(&path_str(path.as_ref()), uid, gid, true))
    }

    /// Set an extended attribute. Linux profile only.
    pub fn setxattr(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        value: &[u8],
    ) -> Result<(), FsError> {
        self.with(|fs| fs.setxattr(&path_str(path.as_ref()), name, value))
    }

    /// Read an extended attribute. Linux profile only.
    pub fn getxattr(
        &self,
        path: impl AsRef<Path>,
        name: &str,
    ) -> Result<Option<Vec<u8>>, FsError> {
        self.with(|fs| fs.getxattr(&path_str(path.as_ref()), name))
    }

    /// List extended attribute names. Linux profile only.
    pub fn listxattr(&self, path: impl AsRef<Path>) -> Result<Vec<String>, FsError> {
        self.with(|fs| fs.listxattr(&path_str(path.as_ref())))
    }

    /// Remove an extended attribute. Linux profile only.
    pub fn removexattr(&self, path: impl AsRef<Path>, name: &str) -> Result<(), FsError> {
        self.with(|fs| fs.removexattr(&path_str(path.as_ref()), name))
    }

    /// The stored patch-mode choice for an external patching layer.
    pub fn patch_open_code(&self) -> PatchMode {
        self.with(|fs| fs.config.patch_open_code)
    }

    /// Stored for an external patching layer; the engine only records it.
    pub fn patch_default_args(&self) -> bool {
        self.with(|fs| fs.config.patch_default_args)
    }

    /// Stored for an external patching layer; the engine only records it.
    pub fn use_known_patches(&self) -> bool {
        self.with(|fs| fs.config.use_known_patches)
    }
}

pub(crate) fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
