use crate::{CacheError, Result};
use std::path::{Component, Path, PathBuf};

/// Reserved name of the per-version cache manifest.
pub const CACHE_MANIFEST_NAME: &str = ".gixt-cache.json";

fn invalid(name: &str, reason: &'static str) -> CacheError {
    CacheError::InvalidFileName {
        name: name.to_string(),
        reason,
    }
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Normalize a remote file name into a safe relative path.
///
/// Rejects empty names, absolute paths, drive prefixes, any `..` segment, and
/// the reserved manifest name. `.` segments are dropped; the result is
/// `/`-joined.
pub fn sanitize_gist_path(name: &str) -> Result<String> {
    if has_drive_prefix(name) {
        return Err(invalid(name, "drive-prefixed paths are not allowed"));
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(invalid(name, "absolute paths are not allowed"));
    }

    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {
                return Err(invalid(name, "absolute paths are not allowed"));
            }
            Component::ParentDir => {
                return Err(invalid(name, "parent traversal is not allowed"));
            }
            Component::CurDir => {}
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => return Err(invalid(name, "file name is not valid UTF-8")),
            },
        }
    }

    if parts.is_empty() {
        return Err(invalid(name, "file name is empty"));
    }
    let joined = parts.join("/");
    if joined == CACHE_MANIFEST_NAME {
        return Err(invalid(name, "name is reserved for the cache manifest"));
    }
    Ok(joined)
}

pub(crate) fn single_segment(key: &str) -> Result<&str> {
    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !has_drive_prefix(key) => Ok(key),
        _ => Err(CacheError::InvalidCacheKey(key.to_string())),
    }
}

/// `<root>/<gist_id>/<sha>`; both keys must be plain single path segments.
pub fn cache_dir(root: &Path, gist_id: &str, sha: &str) -> Result<PathBuf> {
    Ok(root.join(single_segment(gist_id)?).join(single_segment(sha)?))
}

pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(CACHE_MANIFEST_NAME)
}

/// Every listed file exists under `dir`.
pub fn present_files(dir: &Path, files: &[String]) -> bool {
    files.iter().all(|f| dir.join(f).is_file())
}

/// First 12 characters, for display.
pub fn shorten(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((pos, _)) => &id[..pos],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitize_rejects_traversal_and_absolute_paths() {
        for bad in ["", ".", "./", "..", "../escape.sh", "a/../b", "/etc/passwd", "C:evil.bat", "c:\\x"] {
            assert!(
                matches!(sanitize_gist_path(bad), Err(CacheError::InvalidFileName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn sanitize_rejects_reserved_manifest_name() {
        assert!(sanitize_gist_path(CACHE_MANIFEST_NAME).is_err());
        assert!(sanitize_gist_path("./.gixt-cache.json").is_err());
    }

    #[test]
    fn sanitize_normalizes_current_dir_segments() {
        assert_eq!(sanitize_gist_path("./run.sh").unwrap(), "run.sh");
        assert_eq!(sanitize_gist_path("lib//util.py").unwrap(), "lib/util.py");
        assert_eq!(sanitize_gist_path(".bashrc").unwrap(), ".bashrc");
    }

    #[test]
    fn cache_dir_requires_single_segments() {
        let root = Path::new("/cache");
        assert_eq!(
            cache_dir(root, "abc123", "f00d").unwrap(),
            Path::new("/cache/abc123/f00d")
        );
        assert!(cache_dir(root, "../up", "f00d").is_err());
        assert!(cache_dir(root, "abc", "a/b").is_err());
        assert!(cache_dir(root, "..", "f00d").is_err());
        assert!(cache_dir(root, "", "f00d").is_err());
    }

    #[test]
    fn shorten_truncates_long_ids() {
        assert_eq!(shorten("aa5a315d61ae9438b18d"), "aa5a315d61ae");
        assert_eq!(shorten("short"), "short");
    }
}
