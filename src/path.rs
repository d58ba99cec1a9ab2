//! The path engine: parsing, normalizing and comparing paths under the
//! active OS profile, independent of the host's `std::path` rules.
//!
//! All functions are pure string manipulation; nothing here touches the
//! tree. The engine stores paths as `String` in the profile's decoded form
//! and keeps the encoded bytes alongside directory entries.

use crate::profile::Profile;

/// Replace the alternative separator with the primary one.
pub(crate) fn norm_seps(p: &Profile, path: &str) -> String {
    match p.alt_sep {
        Some(alt) => path.replace(alt, &p.sep.to_string()),
        None => path.to_string(),
    }
}

fn is_sep(p: &Profile, c: char) -> bool {
    c == p.sep || p.alt_sep == Some(c)
}

/// Split a path into a drive (or UNC share) prefix and the rest.
///
/// Recognizes `X:` and `\\server\share` only on the Windows profile; on
/// POSIX the drive is always empty.
pub(crate) fn split_drive<'a>(p: &Profile, path: &'a str) -> (&'a str, &'a str) {
    if !p.is_windows() {
        return ("", path);
    }
    let chars: Vec<char> = path.chars().collect();
    if chars.len() >= 2 && is_sep(p, chars[0]) && is_sep(p, chars[1]) {
        // UNC path: \\server\share\rest
        if chars.len() >= 3 && is_sep(p, chars[2]) {
            return ("", path);
        }
        let mut idx = None;
        for (i, &c) in chars.iter().enumerate().skip(2) {
            if is_sep(p, c) {
                idx = Some(i);
                break;
            }
        }
        let Some(server_end) = idx else {
            return ("", path);
        };
        let mut share_end = chars.len();
        for (i, &c) in chars.iter().enumerate().skip(server_end + 1) {
            if is_sep(p, c) {
                if i == server_end + 1 {
                    return ("", path);
                }
                share_end = i;
                break;
            }
        }
        let byte_end: usize = chars[..share_end].iter().map(|c| c.len_utf8()).sum();
        return (&path[..byte_end], &path[byte_end..]);
    }
    if chars.len() >= 2 && chars[1] == ':' && chars[0].is_ascii_alphabetic() {
        return (&path[..2], &path[2..]);
    }
    ("", path)
}

/// Whether the path is absolute under the profile.
///
/// On Windows a rooted path without a drive (`\foo`) counts as absolute;
/// a drive-relative path (`C:foo`) does not.
pub(crate) fn is_abs(p: &Profile, path: &str) -> bool {
    let (_, rest) = split_drive(p, path);
    rest.chars().next().is_some_and(|c| is_sep(p, c))
}

/// Join two path fragments the way the emulated OS would.
pub(crate) fn join(p: &Profile, base: &str, tail: &str) -> String {
    if tail.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return tail.to_string();
    }
    let (tail_drive, tail_rest) = split_drive(p, tail);
    if !tail_drive.is_empty() {
        return tail.to_string();
    }
    if tail_rest.chars().next().is_some_and(|c| is_sep(p, c)) {
        // Rooted tail keeps the base drive, if any.
        let (base_drive, _) = split_drive(p, base);
        return format!("{base_drive}{tail}");
    }
    if base.chars().last().is_some_and(|c| is_sep(p, c)) || base.ends_with(':') {
        format!("{base}{tail}")
    } else {
        format!("{base}{}{tail}", p.sep)
    }
}

/// Normalize a path lexically: collapse separators, resolve `.` and `..`.
pub(crate) fn normpath(p: &Profile, path: &str) -> String {
    let path = norm_seps(p, path);
    let (drive, rest) = split_drive(p, &path);
    let rooted = rest.starts_with(p.sep);
    // POSIX treats exactly two leading slashes as a distinct root.
    let double_root =
        !p.is_windows() && rest.starts_with("//") && !rest.starts_with("///") && drive.is_empty();

    let mut parts: Vec<&str> = Vec::new();
    for comp in rest.split(p.sep) {
        match comp {
            "" | "." => {}
            ".." => {
                if let Some(last) = parts.last() {
                    if *last == ".." {
                        parts.push("..");
                    } else {
                        parts.pop();
                    }
                } else if !rooted {
                    parts.push("..");
                }
            }
            name => parts.push(name),
        }
    }

    let mut out = String::from(drive);
    if double_root {
        out.push(p.sep);
    }
    if rooted {
        out.push(p.sep);
    }
    out.push_str(&parts.join(&p.sep.to_string()));
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Make `path` absolute against `cwd` and normalize it.
pub(crate) fn absolutize(p: &Profile, cwd: &str, path: &str) -> String {
    let path = norm_seps(p, path);
    let (drive, rest) = split_drive(p, &path);
    let joined = if rest.starts_with(p.sep) {
        if drive.is_empty() {
            // Rooted without a drive: inherit the cwd drive on Windows.
            let (cwd_drive, _) = split_drive(p, cwd);
            format!("{cwd_drive}{rest}")
        } else {
            path.clone()
        }
    } else if !drive.is_empty() {
        // Drive-relative, e.g. `C:file`: anchor at the drive root.
        format!("{drive}{}{rest}", p.sep)
    } else {
        join(p, cwd, &path)
    };
    normpath(p, &joined)
}

/// Split into `(head, tail)` like the host's `os.path.split`.
///
/// The head keeps the drive and root; trailing separators are stripped from
/// the head unless it is the root itself.
pub(crate) fn split(p: &Profile, path: &str) -> (String, String) {
    let (drive, rest) = split_drive(p, path);
    let sep_idx = rest.rfind(|c| is_sep(p, c));
    match sep_idx {
        Some(i) => {
            let head = &rest[..=i];
            let tail = &rest[i + p.sep.len_utf8()..];
            let trimmed = head.trim_end_matches(|c| is_sep(p, c));
            let head = if trimmed.is_empty() { &head[..1] } else { trimmed };
            (format!("{drive}{head}"), tail.to_string())
        }
        None => (drive.to_string(), rest.to_string()),
    }
}

pub(crate) fn dirname(p: &Profile, path: &str) -> String {
    split(p, path).0
}

pub(crate) fn basename(p: &Profile, path: &str) -> String {
    split(p, path).1
}

/// Decompose an absolute, normalized path into walkable components.
///
/// On Windows the drive (or UNC share) is the first component, matching the
/// drive entries anchored in the global root directory.
pub(crate) fn components(p: &Profile, abs: &str) -> Vec<String> {
    let (drive, rest) = split_drive(p, abs);
    let mut out = Vec::new();
    if !drive.is_empty() {
        out.push(drive.to_string());
    }
    for comp in rest.split(p.sep) {
        if !comp.is_empty() && comp != "." {
            out.push(comp.to_string());
        }
    }
    out
}

/// The longest common sub-path of the given paths.
///
/// Paths must agree on drive and on being absolute or relative; `None`
/// otherwise, or when the input is empty. Comparison follows the
/// profile's case policy while the returned path keeps the first path's
/// spelling.
pub(crate) fn commonpath(p: &Profile, paths: &[&str]) -> Option<String> {
    let first = paths.first()?;
    let (first_drive, _) = split_drive(p, first);
    let first_abs = is_abs(p, first);

    let mut split_paths = Vec::with_capacity(paths.len());
    for raw in paths {
        let (drive, _) = split_drive(p, raw);
        if !matches(p, drive, first_drive) || is_abs(p, raw) != first_abs {
            return None;
        }
        let normed = normpath(p, raw);
        split_paths.push(components(p, &normed));
    }

    let shortest = split_paths.iter().map(Vec::len).min()?;
    let skip = usize::from(!first_drive.is_empty());
    let reference = &split_paths[0];
    let mut common = skip;
    'outer: for i in skip..shortest {
        for other in &split_paths[1..] {
            if !matches(p, &reference[i], &other[i]) {
                break 'outer;
            }
        }
        common = i + 1;
    }

    let mut out = first_drive.to_string();
    if first_abs {
        out.push(p.sep);
    }
    out.push_str(&reference[skip..common].join(&p.sep.to_string()));
    if out.is_empty() {
        out.push('.');
    }
    Some(out)
}

/// Case-fold a name under the locale-independent Unicode lowercase
/// transform.
pub(crate) fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Whether two names refer to the same entry under the profile's case
/// policy.
pub(crate) fn matches(p: &Profile, a: &str, b: &str) -> bool {
    if p.case_sensitive {
        a == b
    } else {
        fold(a) == fold(b)
    }
}

/// Encode a decoded name into the profile's filesystem encoding.
pub(crate) fn encode(p: &Profile, name: &str) -> Vec<u8> {
    if p.is_windows() {
        name.encode_utf16().flat_map(u16::to_le_bytes).collect()
    } else {
        name.as_bytes().to_vec()
    }
}

/// Decode bytes from the profile's filesystem encoding.
pub(crate) fn decode(p: &Profile, bytes: &[u8]) -> String {
    if p.is_windows() {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}
