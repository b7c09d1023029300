use crate::paths::{manifest_path, single_segment};
use crate::Result;
use gixt_protocol::{read_json_opt, unix_now_ms, write_json_atomic, Gist};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Record of one materialized `(gist_id, sha)` directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub gist_id: String,
    pub sha: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub files: Vec<String>,
    /// Web URL of the gist.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub created_at_unix_ms: u64,
}

impl CacheManifest {
    pub fn for_gist(gist: &Gist, sha: &str, owner: &str, files: Vec<String>) -> Self {
        Self {
            gist_id: gist.id.clone(),
            sha: sha.to_string(),
            description: gist.description.clone(),
            owner: owner.to_string(),
            files,
            source: gist.html_url.clone(),
            created_at_unix_ms: unix_now_ms(),
        }
    }

    pub fn load(dir: &Path) -> Result<Option<Self>> {
        Ok(read_json_opt(&manifest_path(dir))?)
    }

    /// Replaces any previous manifest in `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_json_atomic(&manifest_path(dir), self)?;
        Ok(())
    }
}

/// A cached manifest together with the directory it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedGist {
    pub manifest: CacheManifest,
    pub dir: PathBuf,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Most recently written manifest among the cached versions of `gist_id`.
/// Keys that are not a single path segment never match.
pub fn latest_manifest(root: &Path, gist_id: &str) -> Option<CachedGist> {
    let gist_id = single_segment(gist_id).ok()?;
    let versions = std::fs::read_dir(root.join(gist_id)).ok()?;
    let mut best: Option<(SystemTime, CachedGist)> = None;

    for version in versions.flatten() {
        let dir = version.path();
        if !dir.is_dir() {
            continue;
        }
        let manifest = match CacheManifest::load(&dir) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => continue,
            Err(err) => {
                log::debug!("skipping unreadable cache manifest in {}: {err}", dir.display());
                continue;
            }
        };
        let Some(mtime) = modified(&manifest_path(&dir)) else {
            continue;
        };
        if best.as_ref().map_or(true, |(t, _)| mtime > *t) {
            best = Some((mtime, CachedGist { manifest, dir }));
        }
    }

    best.map(|(_, cached)| cached)
}

/// Latest cached version of every gist under `root`, ordered by gist id.
pub fn cached_gists(root: &Path) -> Vec<CachedGist> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    ids.sort();
    ids.iter()
        .filter_map(|id| latest_manifest(root, id))
        .collect()
}

/// Delete every cached version of `gist_id`; returns whether anything existed.
pub fn remove_gist(root: &Path, gist_id: &str) -> Result<bool> {
    let dir = root.join(single_segment(gist_id)?);
    if !dir.is_dir() {
        return Ok(false);
    }
    std::fs::remove_dir_all(&dir)?;
    Ok(true)
}
