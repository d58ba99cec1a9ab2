//! Typed filesystem faults and their per-OS error-code mapping.
//!
//! Every operation in the engine fails with an [`FsError`] carrying a
//! [`Fault`] kind and the offending path. At the shim boundary the error is
//! converted into a [`std::io::Error`] whose `ErrorKind` matches what the
//! real standard library would produce, and whose message mirrors the
//! canonical C-library rendering (`[Errno 2] No such file or directory: 'p'`)
//! so tests asserting on message substrings keep passing.

use crate::profile::Os;
use std::io;

/// A specialized [`Result`] type for fallible test cases.
///
/// This type is generally useful where you want to use the `?` operator to
/// fail the test rather than writing unwrap everywhere.
///
/// [`Result`]: std::result::Result
pub type Result<T = ()> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Result type used throughout the engine internals.
pub(crate) type FsResult<T> = std::result::Result<T, FsError>;

/// The kind of fault an operation ran into.
///
/// Kinds are OS-independent; the active [`Os`] profile decides which errno
/// (and, for the Windows profile, which `WinError` code) a kind maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// A path component does not exist.
    NotFound,
    /// An intermediate path component is not a directory.
    NotADir,
    /// A directory was used where a file was expected.
    IsADir,
    /// Removal or replacement of a non-empty directory.
    NotEmpty,
    /// The entry already exists and the operation forbids that.
    Exists,
    /// A mode/ownership check failed.
    PermissionDenied,
    /// The operation is not permitted for the effective identity.
    NotPermitted,
    /// A hard link or rename across mount boundaries.
    CrossDevice,
    /// The symlink expansion bound was exceeded.
    LinkLoop,
    /// A component exceeded 255 bytes or the path exceeded 4096.
    NameTooLong,
    /// The write would exceed the mount budget.
    NoSpace,
    /// The file descriptor is closed or out of range.
    BadDescriptor,
    /// An argument is invalid for the target, e.g. readlink on a file.
    InvalidArgument,
    /// Reading the backing real file failed.
    Io,
}

impl Fault {
    /// The errno value for this fault under the given OS profile.
    pub fn errno(self, os: Os) -> i32 {
        match self {
            Fault::NotFound => 2,
            Fault::NotADir => 20,
            Fault::IsADir => 21,
            Fault::NotEmpty => match os {
                Os::Linux => 39,
                Os::MacOs => 66,
                Os::Windows => 41,
            },
            Fault::Exists => 17,
            Fault::PermissionDenied => 13,
            Fault::NotPermitted => 1,
            Fault::CrossDevice => 18,
            // Windows has no ELOOP; its C runtime reports EINVAL instead.
            Fault::LinkLoop => match os {
                Os::Linux => 40,
                Os::MacOs => 62,
                Os::Windows => 22,
            },
            Fault::NameTooLong => match os {
                Os::Linux => 36,
                Os::MacOs => 63,
                Os::Windows => 38,
            },
            Fault::NoSpace => 28,
            Fault::BadDescriptor => 9,
            Fault::InvalidArgument => 22,
            Fault::Io => 5,
        }
    }

    /// The `WinError` code for this fault, used on the Windows profile.
    pub fn win_error(self) -> u32 {
        match self {
            Fault::NotFound => 2,         // ERROR_FILE_NOT_FOUND
            Fault::NotADir => 267,        // ERROR_DIRECTORY
            Fault::IsADir => 5,           // ERROR_ACCESS_DENIED
            Fault::NotEmpty => 145,       // ERROR_DIR_NOT_EMPTY
            Fault::Exists => 183,         // ERROR_ALREADY_EXISTS
            Fault::PermissionDenied => 5, // ERROR_ACCESS_DENIED
            Fault::NotPermitted => 5,     // ERROR_ACCESS_DENIED
            Fault::CrossDevice => 17,     // ERROR_NOT_SAME_DEVICE
            Fault::LinkLoop => 1921,      // ERROR_CANT_RESOLVE_FILENAME
            Fault::NameTooLong => 206,    // ERROR_FILENAME_EXCED_RANGE
            Fault::NoSpace => 112,        // ERROR_DISK_FULL
            Fault::BadDescriptor => 6,    // ERROR_INVALID_HANDLE
            Fault::InvalidArgument => 87, // ERROR_INVALID_PARAMETER
            Fault::Io => 1117,            // ERROR_IO_DEVICE
        }
    }

    /// The canonical C-library message for this fault.
    pub fn message(self) -> &'static str {
        match self {
            Fault::NotFound => "No such file or directory",
            Fault::NotADir => "Not a directory",
            Fault::IsADir => "Is a directory",
            Fault::NotEmpty => "Directory not empty",
            Fault::Exists => "File exists",
            Fault::PermissionDenied => "Permission denied",
            Fault::NotPermitted => "Operation not permitted",
            Fault::CrossDevice => "Invalid cross-device link",
            Fault::LinkLoop => "Too many levels of symbolic links",
            Fault::NameTooLong => "File name too long",
            Fault::NoSpace => "No space left on device",
            Fault::BadDescriptor => "Bad file descriptor",
            Fault::InvalidArgument => "Invalid argument",
            Fault::Io => "Input/output error",
        }
    }

    /// The matching [`io::ErrorKind`].
    pub fn io_kind(self) -> io::ErrorKind {
        match self {
            Fault::NotFound => io::ErrorKind::NotFound,
            Fault::NotADir => io::ErrorKind::NotADirectory,
            Fault::IsADir => io::ErrorKind::IsADirectory,
            Fault::NotEmpty => io::ErrorKind::DirectoryNotEmpty,
            Fault::Exists => io::ErrorKind::AlreadyExists,
            Fault::PermissionDenied | Fault::NotPermitted => io::ErrorKind::PermissionDenied,
            Fault::CrossDevice => io::ErrorKind::CrossesDevices,
            Fault::LinkLoop => io::ErrorKind::FilesystemLoop,
            Fault::NameTooLong => io::ErrorKind::InvalidFilename,
            Fault::NoSpace => io::ErrorKind::StorageFull,
            Fault::BadDescriptor | Fault::InvalidArgument => io::ErrorKind::InvalidInput,
            Fault::Io => io::ErrorKind::Other,
        }
    }
}

/// An error raised by a fake filesystem operation.
///
/// Carries the fault kind, the errno under the profile that raised it, and
/// the path the operation was applied to, if any.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render(.kind, .errno, .path))]
pub struct FsError {
    kind: Fault,
    errno: i32,
    win_error: Option<u32>,
    path: Option<String>,
}

fn render(kind: &Fault, errno: &i32, path: &Option<String>) -> String {
    match path {
        Some(path) => format!("[Errno {errno}] {}: '{path}'", kind.message()),
        None => format!("[Errno {errno}] {}", kind.message()),
    }
}

impl FsError {
    pub(crate) fn new(kind: Fault, os: Os, path: impl Into<Option<String>>) -> Self {
        FsError {
            kind,
            errno: kind.errno(os),
            win_error: (os == Os::Windows).then(|| kind.win_error()),
            path: path.into(),
        }
    }

    /// The fault kind.
    pub fn kind(&self) -> Fault {
        self.kind
    }

    /// The errno under the profile that raised this error.
    pub fn errno(&self) -> i32 {
        self.errno
    }

    /// The `WinError` code, present when the Windows profile raised this.
    pub fn win_error(&self) -> Option<u32> {
        self.win_error
    }

    /// The path the failing operation was applied to.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> io::Error {
        io::Error::new(err.kind.io_kind(), err)
    }
}
