//! Drop-in replacements for the standard filesystem surface.
//!
//! The types here mirror their originals closely enough that swapping the
//! import is the only change a test needs:
//!
//! ```ignore
//! // Before
//! use std::fs::{File, OpenOptions};
//!
//! // After (types from veneer, traits from std)
//! use veneer::shim::std::fs::{File, OpenOptions};
//! use std::io::{Read, Write, Seek};
//! ```
//!
//! # What is shimmed
//!
//! ## `std::fs`
//!
//! [`File`], [`OpenOptions`], [`Metadata`], [`Permissions`], [`FileType`],
//! [`ReadDir`], [`DirEntry`], [`DirBuilder`] and the free functions
//! (`read`, `write`, `copy`, `rename`, `canonicalize`,
//! `create_dir(_all)`, `remove_dir(_all)`, `remove_file`, `read_dir`,
//! `metadata`, `symlink_metadata`, `read_link`, `hard_link`,
//! `set_permissions`, `exists`, `try_exists`).
//!
//! ## `std::os`
//!
//! The real `std::os::unix::fs` traits (`FileExt`, `OpenOptionsExt`,
//! `PermissionsExt`, `DirBuilderExt`, `MetadataExt`) are implemented for
//! the shim types on Unix hosts, plus `symlink`, `chown` and `lchown`.
//! `symlink_file` and `symlink_dir` mirror `std::os::windows::fs` and work
//! against the Windows profile on any host.
//!
//! ## `tokio::fs`
//!
//! Async wrappers delegating to the sync shims, with
//! `AsyncRead`/`AsyncWrite`/`AsyncSeek` on the async [`File`].
//!
//! # Routing
//!
//! Every call is answered by the current fake filesystem. With no fake
//! filesystem entered, or while the current one is paused, calls forward
//! to the real OS instead.
//!
//! [`File`]: self::std::fs::File
//! [`OpenOptions`]: self::std::fs::OpenOptions
//! [`Metadata`]: self::std::fs::Metadata
//! [`Permissions`]: self::std::fs::Permissions
//! [`FileType`]: self::std::fs::FileType
//! [`ReadDir`]: self::std::fs::ReadDir
//! [`DirEntry`]: self::std::fs::DirEntry
//! [`DirBuilder`]: self::std::fs::DirBuilder

pub mod std;
pub mod tokio;
