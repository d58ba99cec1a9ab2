//! Async filesystem shims mirroring `tokio::fs`.
//!
//! Thin async wrappers around the [`std::fs`](crate::shim::std::fs) shims.
//! The fake filesystem is in-memory, so operations complete without ever
//! blocking; the wrappers exist so async code can swap its `tokio::fs`
//! imports the same way sync code swaps `std::fs`.
//!
//! ```ignore
//! use veneer::shim::tokio::fs;
//!
//! async fn example() -> std::io::Result<()> {
//!     fs::create_dir_all("/data").await?;
//!     fs::write("/data/file.txt", b"hello").await?;
//!     let contents = fs::read("/data/file.txt").await?;
//!     Ok(())
//! }
//! ```

use crate::shim::std::fs as sync_fs;
use std::io::{Result, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncSeek, AsyncWrite, ReadBuf};

pub use sync_fs::{DirBuilder, DirEntry, FileType, Metadata, OpenOptions, Permissions, ReadDir};

/// An async file handle over the fake filesystem.
///
/// Implements `AsyncRead`, `AsyncWrite` and `AsyncSeek`; all operations
/// complete immediately against the in-memory tree.
#[derive(Debug)]
pub struct File {
    inner: sync_fs::File,
    seek_result: Option<u64>,
}

impl File {
    /// Attempts to open a file in read-only mode.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<File> {
        Ok(File::from_sync(sync_fs::File::open(path)?))
    }

    /// Opens a file in write-only mode, creating or truncating it.
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<File> {
        Ok(File::from_sync(sync_fs::File::create(path)?))
    }

    fn from_sync(inner: sync_fs::File) -> File {
        File {
            inner,
            seek_result: None,
        }
    }

    /// Queries metadata about the underlying file.
    pub async fn metadata(&self) -> Result<Metadata> {
        self.inner.metadata()
    }

    /// Truncates or extends the file to `size`.
    pub async fn set_len(&self, size: u64) -> Result<()> {
        self.inner.set_len(size)
    }

    /// Settles pending timestamp updates; there is no kernel buffer.
    pub async fn sync_all(&self) -> Result<()> {
        self.inner.sync_all()
    }

    /// Identical to [`sync_all`](File::sync_all) for the fake filesystem.
    pub async fn sync_data(&self) -> Result<()> {
        self.inner.sync_data()
    }

    /// Creates a new handle sharing the same open-file state.
    pub async fn try_clone(&self) -> Result<File> {
        Ok(File::from_sync(self.inner.try_clone()?))
    }

    /// Changes the permissions of the underlying file.
    pub async fn set_permissions(&self, perm: Permissions) -> Result<()> {
        self.inner.set_permissions(perm)
    }
}

impl AsyncRead for File {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<Result<()>> {
        let this = self.get_mut();
        let n = std::io::Read::read(&mut this.inner, buf.initialize_unfilled())?;
        buf.advance(n);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for File {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize>> {
        let this = self.get_mut();
        Poll::Ready(std::io::Write::write(&mut this.inner, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        Poll::Ready(std::io::Write::flush(&mut this.inner))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.poll_flush(cx)
    }
}

impl AsyncSeek for File {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> Result<()> {
        let this = self.get_mut();
        let pos = std::io::Seek::seek(&mut this.inner, position)?;
        this.seek_result = Some(pos);
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<u64>> {
        let this = self.get_mut();
        match this.seek_result.take() {
            Some(pos) => Poll::Ready(Ok(pos)),
            None => {
                let pos = std::io::Seek::seek(&mut this.inner, SeekFrom::Current(0))?;
                Poll::Ready(Ok(pos))
            }
        }
    }
}

/// Async version of [`canonicalize`](sync_fs::canonicalize).
pub async fn canonicalize<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    sync_fs::canonicalize(path)
}

/// Async version of [`copy`](sync_fs::copy).
pub async fn copy<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<u64> {
    sync_fs::copy(from, to)
}

/// Async version of [`create_dir`](sync_fs::create_dir).
pub async fn create_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    sync_fs::create_dir(path)
}

/// Async version of [`create_dir_all`](sync_fs::create_dir_all).
pub async fn create_dir_all<P: AsRef<Path>>(path: P) -> Result<()> {
    sync_fs::create_dir_all(path)
}

/// Async version of [`hard_link`](sync_fs::hard_link).
pub async fn hard_link<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    sync_fs::hard_link(original, link)
}

/// Async version of [`metadata`](sync_fs::metadata).
pub async fn metadata<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    sync_fs::metadata(path)
}

/// Async version of [`read`](sync_fs::read).
pub async fn read<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    sync_fs::read(path)
}

/// Async version of [`read_dir`](sync_fs::read_dir).
pub async fn read_dir<P: AsRef<Path>>(path: P) -> Result<ReadDir> {
    sync_fs::read_dir(path)
}

/// Async version of [`read_link`](sync_fs::read_link).
pub async fn read_link<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    sync_fs::read_link(path)
}

/// Async version of [`read_to_string`](sync_fs::read_to_string).
pub async fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    sync_fs::read_to_string(path)
}

/// Async version of [`remove_dir`](sync_fs::remove_dir).
pub async fn remove_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    sync_fs::remove_dir(path)
}

/// Async version of [`remove_dir_all`](sync_fs::remove_dir_all).
pub async fn remove_dir_all<P: AsRef<Path>>(path: P) -> Result<()> {
    sync_fs::remove_dir_all(path)
}

/// Async version of [`remove_file`](sync_fs::remove_file).
pub async fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
    sync_fs::remove_file(path)
}

/// Async version of [`rename`](sync_fs::rename).
pub async fn rename<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    sync_fs::rename(from, to)
}

/// Async version of [`set_permissions`](sync_fs::set_permissions).
pub async fn set_permissions<P: AsRef<Path>>(path: P, perm: Permissions) -> Result<()> {
    sync_fs::set_permissions(path, perm)
}

/// Async version of [`symlink_metadata`](sync_fs::symlink_metadata).
pub async fn symlink_metadata<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    sync_fs::symlink_metadata(path)
}

/// Async version of [`try_exists`](sync_fs::try_exists).
pub async fn try_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    sync_fs::try_exists(path)
}

/// Async version of [`write`](sync_fs::write).
pub async fn write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    sync_fs::write(path, contents)
}
