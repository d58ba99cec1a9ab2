//! Engine configuration, assembled by the builder.

use crate::profile::Os;

/// How `open`-by-code patching should behave in an external patching
/// layer. The engine stores the choice; acting on it is the patcher's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatchMode {
    Off,
    On,
    #[default]
    Auto,
}

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub os: Os,
    /// Override for the profile's case-sensitivity default.
    pub case_sensitive: Option<bool>,
    pub path_separator: Option<char>,
    pub alternative_path_separator: Option<Option<char>>,
    /// Return directory listings in random order instead of insertion
    /// order, to flush out ordering assumptions in tests.
    pub shuffle_listdir_results: bool,
    /// Whether uid 0 bypasses permission checks like POSIX root.
    pub allow_root_user: bool,
    pub umask: u32,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    /// Full POSIX chmod semantics on the Windows profile instead of the
    /// read-only-bit clamp.
    pub windows_unix_mode: bool,
    /// Update atime on reads.
    pub track_atime: bool,
    pub patch_open_code: PatchMode,
    pub patch_default_args: bool,
    pub use_known_patches: bool,
    pub rng_seed: Option<u64>,
    /// Byte budget of the initial root mount.
    pub root_total_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            os: Os::default(),
            case_sensitive: None,
            path_separator: None,
            alternative_path_separator: None,
            shuffle_listdir_results: false,
            allow_root_user: true,
            umask: 0o22,
            uid: None,
            gid: None,
            windows_unix_mode: false,
            track_atime: true,
            patch_open_code: PatchMode::default(),
            patch_default_args: false,
            use_known_patches: true,
            rng_seed: None,
            root_total_size: None,
        }
    }
}
