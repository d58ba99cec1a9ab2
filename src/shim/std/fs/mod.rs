//! Simulated filesystem types mirroring `std::fs`.
//!
//! Every type and free function here behaves like its `std::fs` original,
//! answered from the current fake filesystem. When no fake filesystem is
//! entered on the thread, or the current one is paused, calls fall through
//! to the real `std::fs`.
//!
//! Two deliberate departures from `std::fs`, matching the emulated OS
//! semantics rather than the host's:
//!
//! - [`rename`] refuses an existing destination on the Windows profile;
//!   use [`replace`] for replace-style semantics.
//! - [`OpenOptions::text`] and [`OpenOptions::newline`] add a text mode
//!   with encoding and newline translation, available through
//!   [`File::read_text`] and [`File::write_text`].

use crate::engine::{OpenRequest, Stat};
use crate::error::Fault;
use crate::fd::{Newline, TextMode};
use crate::node::{Encoding, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};
use crate::path as fakepath;
use crate::world::path_str;
use crate::FsContext;
use std::io::{Error, ErrorKind, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// `O_NOFOLLOW` for [`OpenOptions::custom_flags`]; the Linux value is the
/// canonical constant across profiles.
pub const O_NOFOLLOW: i32 = 0o400000;

/// A file handle backed by the fake filesystem, or by a real file when
/// opened while the engine was paused or inactive.
#[derive(Debug)]
pub struct File {
    inner: FileInner,
}

#[derive(Debug)]
enum FileInner {
    Fake { fd: i32 },
    Real(std::fs::File),
}

impl File {
    /// Attempts to open a file in read-only mode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<File> {
        OpenOptions::new().read(true).open(path)
    }

    /// Opens a file in write-only mode, creating it if it doesn't exist
    /// and truncating it if it does.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
    }

    /// Opens a file in read-write mode, failing if it already exists.
    pub fn create_new<P: AsRef<Path>>(path: P) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
    }

    /// Queries metadata about the underlying file.
    pub fn metadata(&self) -> Result<Metadata> {
        match &self.inner {
            FileInner::Fake { fd } => FsContext::current(|fs| {
                let stat = fs.fstat(*fd)?;
                Ok(Metadata { stat })
            }),
            FileInner::Real(f) => f.metadata().map(Metadata::from_real),
        }
    }

    /// Truncates or extends the file to `size`.
    pub fn set_len(&self, size: u64) -> Result<()> {
        match &self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.truncate_fd(*fd, size).map_err(Error::from))
            }
            FileInner::Real(f) => f.set_len(size),
        }
    }

    /// Syncs all data and metadata. There is no kernel buffer in the
    /// fake filesystem; pending timestamp updates are settled.
    pub fn sync_all(&self) -> Result<()> {
        match &self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.flush(*fd).map_err(Error::from))
            }
            FileInner::Real(f) => f.sync_all(),
        }
    }

    /// Syncs file data; identical to [`sync_all`](File::sync_all) for the
    /// fake filesystem.
    pub fn sync_data(&self) -> Result<()> {
        match &self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.flush(*fd).map_err(Error::from))
            }
            FileInner::Real(f) => f.sync_data(),
        }
    }

    /// Creates a new `File` sharing the same open-file state, including
    /// the cursor, like `dup(2)`.
    pub fn try_clone(&self) -> Result<File> {
        match &self.inner {
            FileInner::Fake { fd } => FsContext::current(|fs| {
                let new_fd = fs.dup(*fd)?;
                Ok(File {
                    inner: FileInner::Fake { fd: new_fd },
                })
            }),
            FileInner::Real(f) => Ok(File {
                inner: FileInner::Real(f.try_clone()?),
            }),
        }
    }

    /// Changes the permissions of the underlying file.
    pub fn set_permissions(&self, perm: Permissions) -> Result<()> {
        match &self.inner {
            FileInner::Fake { fd } => FsContext::current(|fs| {
                fs.fchmod(*fd, perm.mode_bits()).map_err(Error::from)
            }),
            FileInner::Real(f) => {
                let mut real = f.metadata()?.permissions();
                apply_perm_bits(&mut real, &perm);
                f.set_permissions(real)
            }
        }
    }

    /// Reads the rest of the file as text, applying the open's encoding
    /// and newline policy.
    pub fn read_text(&mut self) -> Result<String> {
        match &mut self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.read_text(*fd).map_err(Error::from))
            }
            FileInner::Real(f) => {
                use std::io::Read;
                let mut s = String::new();
                f.read_to_string(&mut s)?;
                Ok(s)
            }
        }
    }

    /// Writes text, applying the open's encoding and newline policy.
    pub fn write_text(&mut self, s: &str) -> Result<usize> {
        match &mut self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.write_text(*fd, s).map_err(Error::from))
            }
            FileInner::Real(f) => {
                use std::io::Write;
                f.write_all(s.as_bytes())?;
                Ok(s.len())
            }
        }
    }

    pub(crate) fn read_at_impl(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        match &self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.read_at(*fd, buf, offset).map_err(Error::from))
            }
            FileInner::Real(f) => real_read_at(f, buf, offset),
        }
    }

    pub(crate) fn write_at_impl(&self, buf: &[u8], offset: u64) -> Result<usize> {
        match &self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.write_at(*fd, buf, offset).map_err(Error::from))
            }
            FileInner::Real(f) => real_write_at(f, buf, offset),
        }
    }
}

#[cfg(unix)]
fn real_read_at(f: &std::fs::File, buf: &mut [u8], offset: u64) -> Result<usize> {
    std::os::unix::fs::FileExt::read_at(f, buf, offset)
}

#[cfg(unix)]
fn real_write_at(f: &std::fs::File, buf: &[u8], offset: u64) -> Result<usize> {
    std::os::unix::fs::FileExt::write_at(f, buf, offset)
}

#[cfg(not(unix))]
fn real_read_at(_f: &std::fs::File, _buf: &mut [u8], _offset: u64) -> Result<usize> {
    Err(Error::new(
        ErrorKind::Unsupported,
        "positioned reads need a Unix host when the engine is paused",
    ))
}

#[cfg(not(unix))]
fn real_write_at(_f: &std::fs::File, _buf: &[u8], _offset: u64) -> Result<usize> {
    Err(Error::new(
        ErrorKind::Unsupported,
        "positioned writes need a Unix host when the engine is paused",
    ))
}

impl std::io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.read(*fd, buf).map_err(Error::from))
            }
            FileInner::Real(f) => std::io::Read::read(f, buf),
        }
    }
}

impl std::io::Write for File {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        match &mut self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.write(*fd, buf).map_err(Error::from))
            }
            FileInner::Real(f) => std::io::Write::write(f, buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match &mut self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.flush(*fd).map_err(Error::from))
            }
            FileInner::Real(f) => std::io::Write::flush(f),
        }
    }
}

impl std::io::Seek for File {
    fn seek(&mut self, pos: std::io::SeekFrom) -> Result<u64> {
        match &mut self.inner {
            FileInner::Fake { fd } => {
                FsContext::current(|fs| fs.seek(*fd, pos).map_err(Error::from))
            }
            FileInner::Real(f) => std::io::Seek::seek(f, pos),
        }
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if let FileInner::Fake { fd } = &self.inner {
            let fd = *fd;
            FsContext::current_if_set(|fs| {
                let _ = fs.close(fd);
            });
        }
    }
}

/// Options and flags for opening files, mirroring `std::fs::OpenOptions`.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    append: bool,
    truncate: bool,
    create: bool,
    create_new: bool,
    /// Permission bits for file creation (default `0o666`, before umask).
    mode: u32,
    custom_flags: i32,
    text: Option<Encoding>,
    newline: Newline,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    /// Creates a blank new set of options.
    pub fn new() -> OpenOptions {
        OpenOptions {
            read: false,
            write: false,
            append: false,
            truncate: false,
            create: false,
            create_new: false,
            mode: 0o666,
            custom_flags: 0,
            text: None,
            newline: Newline::Universal,
        }
    }

    /// Sets the option for read access.
    pub fn read(&mut self, read: bool) -> &mut Self {
        self.read = read;
        self
    }

    /// Sets the option for write access.
    pub fn write(&mut self, write: bool) -> &mut Self {
        self.write = write;
        self
    }

    /// Sets the option for append mode. The cursor is forced to the end
    /// of the file before every write, regardless of seeks.
    pub fn append(&mut self, append: bool) -> &mut Self {
        self.append = append;
        self
    }

    /// Sets the option for truncating the file on open.
    pub fn truncate(&mut self, truncate: bool) -> &mut Self {
        self.truncate = truncate;
        self
    }

    /// Sets the option for creating the file if missing.
    pub fn create(&mut self, create: bool) -> &mut Self {
        self.create = create;
        self
    }

    /// Sets the option for creating a new file, failing if it exists.
    pub fn create_new(&mut self, create_new: bool) -> &mut Self {
        self.create_new = create_new;
        self
    }

    /// Open in text mode with the given encoding.
    ///
    /// Text-mode files are read and written through
    /// [`File::read_text`]/[`File::write_text`], which decode and apply
    /// newline translation. Binary reads and writes stay available.
    pub fn text(&mut self, encoding: Encoding) -> &mut Self {
        self.text = Some(encoding);
        self
    }

    /// The newline policy for text mode. Defaults to universal newlines.
    pub fn newline(&mut self, newline: Newline) -> &mut Self {
        self.newline = newline;
        self
    }

    pub(crate) fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    pub(crate) fn set_custom_flags(&mut self, flags: i32) {
        self.custom_flags = flags;
    }

    /// Opens the file at `path` with these options.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<File> {
        let path = path.as_ref().to_path_buf();
        FsContext::route(
            |fs| {
                let req = OpenRequest {
                    read: self.read,
                    write: self.write,
                    append: self.append,
                    truncate: self.truncate,
                    create: self.create || self.create_new,
                    create_new: self.create_new,
                    mode: self.mode,
                    nofollow: self.custom_flags & O_NOFOLLOW != 0,
                    text: self.text.map(|encoding| TextMode {
                        encoding,
                        newline: self.newline,
                    }),
                };
                if !(self.read || self.write || self.append) {
                    return Err(Error::from(fs.err(Fault::InvalidArgument, None)));
                }
                let fd = fs.open(&path_str(&path), &req)?;
                Ok(File {
                    inner: FileInner::Fake { fd },
                })
            },
            || {
                let mut opts = std::fs::OpenOptions::new();
                opts.read(self.read)
                    .write(self.write)
                    .append(self.append)
                    .truncate(self.truncate)
                    .create(self.create)
                    .create_new(self.create_new);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    opts.mode(self.mode);
                    opts.custom_flags(self.custom_flags);
                }
                Ok(File {
                    inner: FileInner::Real(opts.open(&path)?),
                })
            },
        )
    }
}

/// Metadata information about a file, mirroring `std::fs::Metadata`.
#[derive(Debug, Clone)]
pub struct Metadata {
    stat: Stat,
}

impl Metadata {
    /// The size of the file in bytes.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.stat.size
    }

    pub fn is_file(&self) -> bool {
        self.stat.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.stat.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.stat.is_symlink()
    }

    pub fn file_type(&self) -> FileType {
        FileType {
            mode: self.stat.mode,
        }
    }

    /// The last modification time.
    pub fn modified(&self) -> Result<SystemTime> {
        Ok(UNIX_EPOCH + self.stat.mtime)
    }

    /// The last access time. Reads update it unless the instance was
    /// built with atime tracking disabled.
    pub fn accessed(&self) -> Result<SystemTime> {
        Ok(UNIX_EPOCH + self.stat.atime)
    }

    /// The creation (birth) time.
    pub fn created(&self) -> Result<SystemTime> {
        Ok(UNIX_EPOCH + self.stat.crtime)
    }

    pub fn permissions(&self) -> Permissions {
        Permissions {
            mode: self.stat.perm(),
        }
    }

    /// The full stat result, including inode and device numbers.
    pub fn stat(&self) -> Stat {
        self.stat
    }

    /// Windows file attributes; present on the Windows profile only.
    pub fn file_attributes(&self) -> Option<u32> {
        self.stat.file_attributes
    }

    /// Windows reparse tag; present on the Windows profile only.
    pub fn reparse_tag(&self) -> Option<u32> {
        self.stat.reparse_tag
    }

    pub(crate) fn from_stat(stat: Stat) -> Metadata {
        Metadata { stat }
    }

    pub(crate) fn from_real(meta: std::fs::Metadata) -> Metadata {
        let type_bits = if meta.is_dir() {
            S_IFDIR
        } else if meta.file_type().is_symlink() {
            S_IFLNK
        } else {
            S_IFREG
        };
        let to_dur = |t: std::result::Result<SystemTime, Error>| {
            t.ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .unwrap_or(Duration::ZERO)
        };
        #[cfg(unix)]
        let stat = {
            use std::os::unix::fs::MetadataExt;
            Stat {
                ino: meta.ino(),
                dev: meta.dev(),
                mode: meta.mode(),
                nlink: meta.nlink(),
                uid: meta.uid(),
                gid: meta.gid(),
                size: meta.len(),
                atime: Duration::new(meta.atime().max(0) as u64, meta.atime_nsec().max(0) as u32),
                mtime: Duration::new(meta.mtime().max(0) as u64, meta.mtime_nsec().max(0) as u32),
                ctime: Duration::new(meta.ctime().max(0) as u64, meta.ctime_nsec().max(0) as u32),
                crtime: to_dur(meta.created()),
                file_attributes: None,
                reparse_tag: None,
            }
        };
        #[cfg(not(unix))]
        let stat = Stat {
            ino: 0,
            dev: 0,
            mode: type_bits
                | if meta.permissions().readonly() {
                    0o444
                } else {
                    0o666
                },
            nlink: 1,
            uid: 0,
            gid: 0,
            size: meta.len(),
            atime: to_dur(meta.accessed()),
            mtime: to_dur(meta.modified()),
            ctime: to_dur(meta.modified()),
            crtime: to_dur(meta.created()),
            file_attributes: None,
            reparse_tag: None,
        };
        #[cfg(unix)]
        let _ = type_bits;
        Metadata { stat }
    }
}

/// Representation of a file type, mirroring `std::fs::FileType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileType {
    mode: u32,
}

impl FileType {
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }
}

/// Representation of file permissions, mirroring `std::fs::Permissions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    mode: u32,
}

impl Permissions {
    /// Whether the owner write bit is clear.
    pub fn readonly(&self) -> bool {
        self.mode & 0o222 == 0
    }

    /// Set or clear the write bits.
    pub fn set_readonly(&mut self, readonly: bool) {
        if readonly {
            self.mode &= !0o222;
        } else {
            self.mode |= 0o200;
        }
    }

    pub(crate) fn mode_bits(&self) -> u32 {
        self.mode
    }

    pub(crate) fn set_mode_bits(&mut self, mode: u32) {
        self.mode = mode;
    }

    pub(crate) fn from_mode_bits(mode: u32) -> Permissions {
        Permissions { mode }
    }
}

fn apply_perm_bits(real: &mut std::fs::Permissions, perm: &Permissions) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        real.set_mode(perm.mode_bits());
    }
    #[cfg(not(unix))]
    {
        // Only the readonly flag is expressible on non-Unix hosts.
        real.set_readonly(perm.readonly());
    }
}

/// Iterator over directory entries, mirroring `std::fs::ReadDir`.
#[derive(Debug)]
pub struct ReadDir {
    entries: std::vec::IntoIter<DirEntry>,
}

impl Iterator for ReadDir {
    type Item = Result<DirEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(Ok)
    }
}

/// An entry inside a directory, mirroring `std::fs::DirEntry`.
#[derive(Debug, Clone)]
pub struct DirEntry {
    path: String,
    name: String,
    ino: u64,
}

impl DirEntry {
    /// The full path to this entry.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    /// The entry's file name.
    pub fn file_name(&self) -> std::ffi::OsString {
        std::ffi::OsString::from(&self.name)
    }

    /// The entry's inode number.
    pub fn ino(&self) -> u64 {
        self.ino
    }

    /// Metadata for the entry itself; symlinks are not followed.
    pub fn metadata(&self) -> Result<Metadata> {
        symlink_metadata(&self.path)
    }

    /// The entry's file type, without following symlinks.
    pub fn file_type(&self) -> Result<FileType> {
        Ok(self.metadata()?.file_type())
    }
}

/// A builder for creating directories, mirroring `std::fs::DirBuilder`.
#[derive(Debug)]
pub struct DirBuilder {
    recursive: bool,
    mode: u32,
}

impl Default for DirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DirBuilder {
    pub fn new() -> DirBuilder {
        DirBuilder {
            recursive: false,
            mode: 0o777,
        }
    }

    /// Create all missing ancestors as well.
    pub fn recursive(&mut self, recursive: bool) -> &mut Self {
        self.recursive = recursive;
        self
    }

    pub(crate) fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    /// Creates the directory at `path`.
    pub fn create<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        FsContext::route(
            |fs| {
                if self.recursive {
                    create_dir_all_in(fs, &path_str(&path), self.mode)
                } else {
                    fs.mkdir(&path_str(&path), self.mode).map_err(Error::from)
                }
            },
            || {
                let mut builder = std::fs::DirBuilder::new();
                builder.recursive(self.recursive);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::DirBuilderExt;
                    builder.mode(self.mode);
                }
                builder.create(&path)
            },
        )
    }
}

// --- free functions --------------------------------------------------------

/// Creates a new, empty directory. The parent must already exist.
pub fn create_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| fs.mkdir(&path_str(&path), 0o777).map_err(Error::from),
        || std::fs::create_dir(&path),
    )
}

/// Creates a directory and all missing ancestors.
pub fn create_dir_all<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| create_dir_all_in(fs, &path_str(&path), 0o777),
        || std::fs::create_dir_all(&path),
    )
}

fn create_dir_all_in(fs: &mut crate::engine::Fs, path: &str, mode: u32) -> Result<()> {
    match fs.ensure_dirs_with_mode(path, mode) {
        Ok(_) => Ok(()),
        Err(e) => Err(Error::from(e)),
    }
}

/// Removes an empty directory.
pub fn remove_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| fs.rmdir(&path_str(&path)).map_err(Error::from),
        || std::fs::remove_dir(&path),
    )
}

/// Removes a directory and all of its contents.
pub fn remove_dir_all<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| fs.remove_dir_all(&path_str(&path)).map_err(Error::from),
        || std::fs::remove_dir_all(&path),
    )
}

/// Removes a file or symlink.
pub fn remove_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| fs.unlink(&path_str(&path)).map_err(Error::from),
        || std::fs::remove_file(&path),
    )
}

/// Renames a file or directory.
///
/// POSIX profiles silently replace an existing destination file; the
/// Windows profile refuses with an already-exists error. Use [`replace`]
/// for replace-style semantics on every profile.
pub fn rename<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let from = from.as_ref().to_path_buf();
    let to = to.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.rename(&path_str(&from), &path_str(&to), false)
                .map_err(Error::from)
        },
        || std::fs::rename(&from, &to),
    )
}

/// Renames a file or directory, replacing an existing destination on
/// every profile.
pub fn replace<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let from = from.as_ref().to_path_buf();
    let to = to.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.rename(&path_str(&from), &path_str(&to), true)
                .map_err(Error::from)
        },
        || std::fs::rename(&from, &to),
    )
}

/// Copies the contents and permissions of one file to another, returning
/// the number of bytes copied.
pub fn copy<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<u64> {
    let from = from.as_ref().to_path_buf();
    let to = to.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            let contents = read_in(fs, &path_str(&from))?;
            let perm = fs.stat(&path_str(&from), true)?.perm();
            write_in(fs, &path_str(&to), &contents)?;
            fs.chmod(&path_str(&to), perm, true)?;
            Ok(contents.len() as u64)
        },
        || std::fs::copy(&from, &to),
    )
}

/// Reads the entire contents of a file into a byte vector.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(|fs| read_in(fs, &path_str(&path)), || std::fs::read(&path))
}

fn read_in(fs: &mut crate::engine::Fs, path: &str) -> Result<Vec<u8>> {
    let req = OpenRequest {
        read: true,
        ..OpenRequest::default()
    };
    let fd = fs.open(path, &req)?;
    let result = fs.read_to_end(fd);
    let _ = fs.close(fd);
    result.map_err(Error::from)
}

/// Reads the entire contents of a file as UTF-8.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let bytes = read(path)?;
    String::from_utf8(bytes).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

/// Writes a slice as the entire contents of a file, creating it if
/// missing and truncating it otherwise.
pub fn write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    let contents = contents.as_ref();
    FsContext::route(
        |fs| write_in(fs, &path_str(&path), contents),
        || std::fs::write(&path, contents),
    )
}

fn write_in(fs: &mut crate::engine::Fs, path: &str, contents: &[u8]) -> Result<()> {
    let req = OpenRequest {
        write: true,
        create: true,
        truncate: true,
        mode: 0o666,
        ..OpenRequest::default()
    };
    let fd = fs.open(path, &req)?;
    let result = fs.write(fd, contents);
    let _ = fs.close(fd);
    result.map(|_| ()).map_err(Error::from)
}

/// Returns metadata for a path, following symlinks.
pub fn metadata<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            let stat = fs.stat(&path_str(&path), true)?;
            Ok(Metadata::from_stat(stat))
        },
        || std::fs::metadata(&path).map(Metadata::from_real),
    )
}

/// Returns metadata for a path without following a trailing symlink.
pub fn symlink_metadata<P: AsRef<Path>>(path: P) -> Result<Metadata> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            let stat = fs.stat(&path_str(&path), false)?;
            Ok(Metadata::from_stat(stat))
        },
        || std::fs::symlink_metadata(&path).map(Metadata::from_real),
    )
}

/// Reads the target of a symbolic link, verbatim.
pub fn read_link<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            let target = fs.readlink(&path_str(&path))?;
            Ok(PathBuf::from(target))
        },
        || std::fs::read_link(&path),
    )
}

/// Returns an iterator over the entries within a directory, in insertion
/// order unless the instance shuffles listings.
pub fn read_dir<P: AsRef<Path>>(path: P) -> Result<ReadDir> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            let raw = path_str(&path);
            let abs = fs.prepare(&raw)?;
            let entries = fs.scandir(&abs)?;
            let sep = fs.profile.sep;
            let entries: Vec<DirEntry> = entries
                .into_iter()
                .map(|e| DirEntry {
                    path: if abs.ends_with(sep) {
                        format!("{abs}{}", e.name)
                    } else {
                        format!("{abs}{sep}{}", e.name)
                    },
                    name: e.name,
                    ino: e.ino,
                })
                .collect();
            Ok(ReadDir {
                entries: entries.into_iter(),
            })
        },
        || {
            let real = std::fs::read_dir(&path)?;
            let mut entries = Vec::new();
            for entry in real {
                let entry = entry?;
                entries.push(DirEntry {
                    path: entry.path().to_string_lossy().into_owned(),
                    name: entry.file_name().to_string_lossy().into_owned(),
                    ino: 0,
                });
            }
            Ok(ReadDir {
                entries: entries.into_iter(),
            })
        },
    )
}

/// Whether the path points at an existing entity, following symlinks.
pub fn exists<P: AsRef<Path>>(path: P) -> bool {
    try_exists(path).unwrap_or(false)
}

/// Whether the path points at an existing entity, reporting errors other
/// than not-found instead of swallowing them.
pub fn try_exists<P: AsRef<Path>>(path: P) -> Result<bool> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| match fs.stat(&path_str(&path), true) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == Fault::NotFound => Ok(false),
            Err(e) => Err(Error::from(e)),
        },
        || std::fs::exists(&path),
    )
}

/// Creates a hard link to an existing file. Same-mount only; directories
/// are refused.
pub fn hard_link<P: AsRef<Path>, Q: AsRef<Path>>(original: P, link: Q) -> Result<()> {
    let original = original.as_ref().to_path_buf();
    let link = link.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.link(&path_str(&original), &path_str(&link))
                .map_err(Error::from)
        },
        || std::fs::hard_link(&original, &link),
    )
}

/// Sets the permissions of a file or directory.
pub fn set_permissions<P: AsRef<Path>>(path: P, perm: Permissions) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            fs.chmod(&path_str(&path), perm.mode_bits(), true)
                .map_err(Error::from)
        },
        || {
            let mut real = std::fs::metadata(&path)?.permissions();
            apply_perm_bits(&mut real, &perm);
            std::fs::set_permissions(&path, real)
        },
    )
}

/// Returns the canonical, absolute form of a path with all intermediate
/// components normalized and symbolic links resolved.
pub fn canonicalize<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    FsContext::route(
        |fs| {
            let raw = path_str(&path);
            let abs = fs.prepare(&raw)?;
            let lookup = fs.lookup_path(&abs, true)?;
            if lookup.existing.is_none() {
                return Err(Error::from(fs.err(Fault::NotFound, abs)));
            }
            Ok(PathBuf::from(lookup.resolved_path))
        },
        || std::fs::canonicalize(&path),
    )
}

/// Copy a directory tree, preserving permissions; built on the engine
/// primitives the way the other convenience functions are.
pub fn copy_tree<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<()> {
    let from = from.as_ref().to_path_buf();
    let to = to.as_ref().to_path_buf();
    let meta = symlink_metadata(&from)?;
    if meta.is_symlink() {
        let target = read_link(&from)?;
        return symlink_any(&target, &to);
    }
    if meta.is_file() {
        copy(&from, &to)?;
        return Ok(());
    }
    create_dir_all(&to)?;
    set_permissions(&to, meta.permissions())?;
    for entry in read_dir(&from)? {
        let entry = entry?;
        let name = entry.file_name();
        let src = entry.path();
        let dst = join_shim(&to, &name.to_string_lossy());
        copy_tree(src, dst)?;
    }
    Ok(())
}

fn symlink_any(target: &Path, link: &Path) -> Result<()> {
    let target = target.to_path_buf();
    let link = link.to_path_buf();
    FsContext::route(
        |fs| {
            fs.symlink(&path_str(&target), &path_str(&link))
                .map(|_| ())
                .map_err(Error::from)
        },
        || real_symlink(&target, &link),
    )
}

#[cfg(unix)]
fn real_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn real_symlink(target: &Path, link: &Path) -> Result<()> {
    if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    }
}

#[cfg(not(any(unix, windows)))]
fn real_symlink(_target: &Path, _link: &Path) -> Result<()> {
    Err(Error::new(
        ErrorKind::Unsupported,
        "symlinks need a Unix or Windows host when the engine is paused",
    ))
}

pub(crate) fn join_shim(base: &Path, name: &str) -> PathBuf {
    FsContext::route(
        |fs| {
            let profile = fs.profile.clone();
            PathBuf::from(fakepath::join(&profile, &path_str(base), name))
        },
        || base.join(name),
    )
}
