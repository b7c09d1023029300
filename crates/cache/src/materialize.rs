use crate::fetch::RawFetcher;
use crate::paths::{present_files, sanitize_gist_path};
use crate::{CacheError, CacheManifest, Result};
use gixt_protocol::{extension, GistFile, Platform};
use std::collections::BTreeMap;
use std::path::Path;

const EXECUTABLE_EXTENSIONS: &[&str] = &[
    ".sh", ".bash", ".zsh", ".py", ".rb", ".pl", ".php", ".js", ".ts",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    /// Sanitized relative paths, sorted.
    pub files: Vec<String>,
    pub reused_from_cache: bool,
}

/// Script files get the executable bit.
pub fn is_executable_name(name: &str) -> bool {
    let ext = extension(name);
    EXECUTABLE_EXTENSIONS.contains(&ext.as_str())
        || Platform::current().native_executable_extension() == Some(ext.as_str())
}

/// Sanitize every name, rejecting collisions, and sort by sanitized path.
fn plan_files(files: &BTreeMap<String, GistFile>) -> Result<Vec<(String, &GistFile)>> {
    let mut by_path: BTreeMap<String, (&str, &GistFile)> = BTreeMap::new();
    for (name, file) in files {
        let sanitized = sanitize_gist_path(name)?;
        if let Some((first, _)) = by_path.get(&sanitized) {
            return Err(CacheError::DuplicateFileName {
                sanitized,
                first: first.to_string(),
                second: name.clone(),
            });
        }
        by_path.insert(sanitized, (name.as_str(), file));
    }
    Ok(by_path
        .into_iter()
        .map(|(path, (_, file))| (path, file))
        .collect())
}

/// A complete earlier materialization in `dest`, if one exists.
fn reusable(dest: &Path) -> Option<Vec<String>> {
    let manifest = match CacheManifest::load(dest) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => return None,
        Err(err) => {
            log::debug!("ignoring cache manifest in {}: {err}", dest.display());
            return None;
        }
    };
    let valid = manifest
        .files
        .iter()
        .all(|f| sanitize_gist_path(f).is_ok());
    (valid && present_files(dest, &manifest.files)).then_some(manifest.files)
}

/// Write a gist's files into `dest`.
///
/// All names are validated before anything touches the disk, and all
/// content is gathered before the first write, so a bad name or failed
/// download leaves `dest` as it was. Unless `force_update` is set, a prior
/// complete materialization is reused without network access.
pub async fn materialize(
    files: &BTreeMap<String, GistFile>,
    dest: &Path,
    force_update: bool,
    fetcher: &dyn RawFetcher,
) -> Result<Materialized> {
    let planned = plan_files(files)?;

    if !force_update {
        if let Some(files) = reusable(dest) {
            log::debug!("reusing cached files in {}", dest.display());
            return Ok(Materialized {
                files,
                reused_from_cache: true,
            });
        }
    }

    let mut contents = Vec::with_capacity(planned.len());
    for (name, file) in &planned {
        let bytes = if file.has_inline_content() {
            file.content.as_bytes().to_vec()
        } else {
            log::debug!("downloading {name} from {}", file.raw_url);
            fetcher
                .fetch_raw(&file.raw_url)
                .await
                .map_err(|err| CacheError::Download {
                    name: name.clone(),
                    message: err.to_string(),
                })?
        };
        contents.push(bytes);
    }

    tokio::fs::create_dir_all(dest).await?;
    for ((name, _), bytes) in planned.iter().zip(contents) {
        let target = dest.join(name);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        set_mode(&target, is_executable_name(name)).await?;
    }

    Ok(Materialized {
        files: planned.into_iter().map(|(name, _)| name).collect(),
        reused_from_cache: false,
    })
}

#[cfg(unix)]
async fn set_mode(path: &Path, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if executable { 0o755 } else { 0o644 };
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _executable: bool) -> std::io::Result<()> {
    Ok(())
}
