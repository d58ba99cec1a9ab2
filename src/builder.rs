//! Builder for fake filesystem instances.

use crate::config::{Config, PatchMode};
use crate::profile::Os;
use crate::world::FsHandle;
use crate::TRACING_TARGET;

/// A builder that can be used to configure the fake filesystem.
///
/// ## Examples
///
/// A filesystem emulating the host OS with default configuration:
///
/// ```
/// let fs = veneer::Builder::new().build();
/// ```
///
/// Emulating a specific OS and identity:
///
/// ```
/// use veneer::Os;
///
/// let fs = veneer::Builder::new()
///     .os(Os::Windows)
///     .umask(0o002)
///     .build();
/// ```
///
/// A builder can be kept around and `build` called repeatedly to get
/// independent instances with the same settings.
///
/// ## Determinism
///
/// The only random factor is the optional shuffling of directory listings.
/// Seed it through [`Builder::rng_seed`] to make such tests reproducible.
pub struct Builder {
    config: Config,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            config: Config::default(),
        }
    }

    /// Which operating system to emulate. Defaults to the host OS.
    pub fn os(&mut self, value: Os) -> &mut Self {
        self.config.os = value;
        self
    }

    /// Override the profile's case-sensitivity default.
    pub fn case_sensitive(&mut self, value: bool) -> &mut Self {
        self.config.case_sensitive = Some(value);
        self
    }

    /// Override the primary path separator.
    pub fn path_separator(&mut self, value: char) -> &mut Self {
        self.config.path_separator = Some(value);
        self
    }

    /// Override the alternative path separator; `None` disables it.
    pub fn alternative_path_separator(&mut self, value: Option<char>) -> &mut Self {
        self.config.alternative_path_separator = Some(value);
        self
    }

    /// Return directory listings in random order to flush out ordering
    /// assumptions. Defaults to false (insertion order).
    pub fn shuffle_listdir_results(&mut self, value: bool) -> &mut Self {
        self.config.shuffle_listdir_results = value;
        self
    }

    /// Whether uid 0 bypasses permission checks like POSIX root.
    /// Defaults to true.
    pub fn allow_root_user(&mut self, value: bool) -> &mut Self {
        self.config.allow_root_user = value;
        self
    }

    /// The umask applied to newly created files and directories.
    /// Defaults to `0o22`.
    pub fn umask(&mut self, value: u32) -> &mut Self {
        self.config.umask = value & 0o777;
        self
    }

    /// The effective uid. Defaults to the host's real uid.
    pub fn uid(&mut self, value: u32) -> &mut Self {
        self.config.uid = Some(value);
        self
    }

    /// The effective gid. Defaults to the host's real gid.
    pub fn gid(&mut self, value: u32) -> &mut Self {
        self.config.gid = Some(value);
        self
    }

    /// Allow full POSIX chmod semantics on the Windows profile instead of
    /// the read-only-bit clamp. Defaults to false.
    pub fn windows_unix_mode(&mut self, value: bool) -> &mut Self {
        self.config.windows_unix_mode = value;
        self
    }

    /// Track access times on reads. Defaults to true; disable for
    /// noatime-mount semantics.
    pub fn track_atime(&mut self, value: bool) -> &mut Self {
        self.config.track_atime = value;
        self
    }

    /// Stored for an external patching layer; the engine only records it.
    pub fn patch_open_code(&mut self, value: PatchMode) -> &mut Self {
        self.config.patch_open_code = value;
        self
    }

    /// Stored for an external patching layer; the engine only records it.
    pub fn patch_default_args(&mut self, value: bool) -> &mut Self {
        self.config.patch_default_args = value;
        self
    }

    /// Stored for an external patching layer; the engine only records it.
    pub fn use_known_patches(&mut self, value: bool) -> &mut Self {
        self.config.use_known_patches = value;
        self
    }

    /// Seed for the listing shuffle, for reproducible runs.
    pub fn rng_seed(&mut self, value: u64) -> &mut Self {
        self.config.rng_seed = Some(value);
        self
    }

    /// Byte budget of the initial root mount. Defaults to unlimited.
    pub fn total_size(&mut self, value: u64) -> &mut Self {
        self.config.root_total_size = Some(value);
        self
    }

    /// Build a fresh filesystem instance.
    ///
    /// When the `TEST_REAL_FS` environment variable is set to a non-empty
    /// value other than `0`, the instance starts paused so the whole suite
    /// runs against the real disk; `resume` re-engages the fake engine.
    pub fn build(&self) -> FsHandle {
        let mut fs = crate::engine::Fs::new(self.config.clone());
        if real_fs_requested() {
            fs.pause();
        }
        tracing::trace!(target: TRACING_TARGET, os = ?self.config.os, "filesystem built");
        FsHandle::new(fs)
    }
}

fn real_fs_requested() -> bool {
    std::env::var("TEST_REAL_FS")
        .map(|v| !v.is_empty() && v != "0")
        .unwrap_or(false)
}
