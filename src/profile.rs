//! The emulated OS profile: separators, case policy, limits, conventions.

/// Which operating system the fake filesystem emulates.
///
/// The profile decides path separators, case sensitivity, symlink expansion
/// bounds, reserved device names, errno values and the synthetic temp-dir
/// convention. It defaults to the host OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    /// The OS the test host is actually running.
    pub fn host() -> Os {
        if cfg!(windows) {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        }
    }
}

impl Default for Os {
    fn default() -> Self {
        Os::host()
    }
}

/// Reserved MS-DOS device names, valid in any directory on Windows.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Resolved per-profile behavior, computed once from the configuration.
#[derive(Debug, Clone)]
pub(crate) struct Profile {
    pub os: Os,
    /// Primary path separator.
    pub sep: char,
    /// Alternative separator, accepted on input and normalized away.
    pub alt_sep: Option<char>,
    pub case_sensitive: bool,
    /// Maximum symlink expansions before the walk fails.
    pub max_link_depth: usize,
    /// Maximum directory-entry name length in bytes.
    pub max_name_len: usize,
    /// Maximum total path length in bytes.
    pub max_path_len: usize,
}

impl Profile {
    pub(crate) fn new(
        os: Os,
        case_sensitive: Option<bool>,
        sep: Option<char>,
        alt_sep: Option<Option<char>>,
    ) -> Profile {
        let default_sep = if os == Os::Windows { '\\' } else { '/' };
        let default_alt = if os == Os::Windows { Some('/') } else { None };
        Profile {
            os,
            sep: sep.unwrap_or(default_sep),
            alt_sep: alt_sep.unwrap_or(default_alt),
            case_sensitive: case_sensitive.unwrap_or(os == Os::Linux),
            max_link_depth: if os == Os::Linux { 40 } else { 32 },
            max_name_len: 255,
            max_path_len: 4096,
        }
    }

    pub(crate) fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    pub(crate) fn is_linux(&self) -> bool {
        self.os == Os::Linux
    }

    /// The path of the null sink device.
    pub(crate) fn dev_null(&self) -> &'static str {
        if self.is_windows() {
            "NUL"
        } else {
            "/dev/null"
        }
    }

    /// The root path of the initial mount.
    pub(crate) fn root_path(&self) -> String {
        if self.is_windows() {
            let mut root = self.default_drive();
            root.push(self.sep);
            root
        } else {
            self.sep.to_string()
        }
    }

    /// The drive used for the initial mount on Windows, e.g. `C:`.
    pub(crate) fn default_drive(&self) -> String {
        "C:".to_string()
    }

    /// Whether `name` (with or without extension) is a reserved device name.
    pub(crate) fn is_reserved_name(&self, name: &str) -> bool {
        if !self.is_windows() {
            return false;
        }
        let stem = name.split('.').next().unwrap_or(name).trim_end();
        RESERVED_NAMES.iter().any(|r| stem.eq_ignore_ascii_case(r))
    }

    /// The synthetic temp directory pre-created on reset.
    ///
    /// Follows the host convention: `/tmp` under POSIX (overridable through
    /// `TMPDIR`/`TEMP`/`TMP`), the per-user AppData location on Windows.
    pub(crate) fn temp_dir(&self) -> String {
        if self.is_windows() {
            let user = std::env::var("USERNAME").unwrap_or_else(|_| "user".to_string());
            format!("C:{0}Users{0}{user}{0}AppData{0}Local{0}Temp", self.sep)
        } else {
            for var in ["TMPDIR", "TEMP", "TMP"] {
                if let Ok(dir) = std::env::var(var) {
                    if dir.starts_with(self.sep) {
                        return dir.trim_end_matches(self.sep).to_string();
                    }
                }
            }
            "/tmp".to_string()
        }
    }
}
