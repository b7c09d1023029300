use crate::api::GistApi;
use crate::config::Paths;
use crate::state::{management_lookup, LocalState};
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::{cached_gists, remove_gist};
use gixt_index::Index;
use gixt_protocol::extract_id;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct RemoveTargets {
    pub cache: Vec<String>,
    pub index: Vec<String>,
    /// Removed from both cache and index.
    pub both: Vec<String>,
    pub owners: Vec<String>,
}

impl RemoveTargets {
    fn is_empty(&self) -> bool {
        self.cache.is_empty() && self.index.is_empty() && self.both.is_empty() && self.owners.is_empty()
    }
}

pub async fn remove(paths: &Paths, api: &dyn GistApi, targets: &RemoveTargets) -> Result<()> {
    if targets.is_empty() {
        anyhow::bail!(
            "usage: gixt remove [--cache id/name ...] [--index id/name ...] [--cache-index id/name ...] [--owner owner ...]"
        );
    }
    paths.ensure_dirs()?;
    let state = LocalState::load(paths)?;

    let cache_ids = resolve_targets(&state, api, &targets.cache).await?;
    let index_ids = resolve_targets(&state, api, &targets.index).await?;
    let both_ids = resolve_targets(&state, api, &targets.both).await?;
    let owners: BTreeSet<String> = targets
        .owners
        .iter()
        .map(|o| o.trim().to_lowercase())
        .filter(|o| !o.is_empty())
        .collect();

    if !index_ids.is_empty() || !both_ids.is_empty() || !owners.is_empty() {
        let ids = index_ids.union(&both_ids).cloned().collect();
        remove_from_index(paths, &ids, &owners)?;
    }
    if !cache_ids.is_empty() || !both_ids.is_empty() || !owners.is_empty() {
        let ids = cache_ids.union(&both_ids).cloned().collect();
        let removed = remove_from_cache(&paths.cache_dir, &ids, &owners)?;
        if removed > 0 {
            println!("removed cache for {removed} gist(s)");
        } else {
            println!("no matching cache entries removed");
        }
    }
    Ok(())
}

/// Lowercased gist ids for the given ids, urls, aliases or names.
async fn resolve_targets(
    state: &LocalState,
    api: &dyn GistApi,
    items: &[String],
) -> Result<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    for item in items {
        let identity = state.resolve(item, &management_lookup(), api).await?;
        out.insert(extract_id(&identity.id).to_lowercase());
    }
    Ok(out)
}

fn remove_from_index(paths: &Paths, ids: &BTreeSet<String>, owners: &BTreeSet<String>) -> Result<()> {
    // Stored index, without description overrides folded in.
    let mut index = Index::load(&paths.index_file)?;
    let removed = index.remove_matching(ids, owners);
    if removed == 0 {
        println!("no matching entries removed from index");
        return Ok(());
    }
    index
        .save(&paths.index_file)
        .with_context(|| format!("Failed to save index {}", paths.index_file.display()))?;
    println!("removed {removed} entries from index");
    Ok(())
}

/// Drop cached gists whose id is listed or whose newest cached owner matches.
pub fn remove_from_cache(
    cache_root: &Path,
    ids: &BTreeSet<String>,
    owners: &BTreeSet<String>,
) -> Result<usize> {
    let mut doomed: BTreeSet<String> = BTreeSet::new();
    if let Ok(entries) = std::fs::read_dir(cache_root) {
        for entry in entries.flatten() {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if entry.path().is_dir() && ids.contains(&name.to_lowercase()) {
                doomed.insert(name);
            }
        }
    }
    if !owners.is_empty() {
        for cached in cached_gists(cache_root) {
            let owner = cached.manifest.owner.trim().to_lowercase();
            let dir_name = cached
                .dir
                .parent()
                .and_then(Path::file_name)
                .and_then(|n| n.to_str());
            if let (true, Some(name)) = (owners.contains(&owner), dir_name) {
                doomed.insert(name.to_string());
            }
        }
    }

    let mut removed = 0;
    for id in &doomed {
        if remove_gist(cache_root, id).with_context(|| format!("remove cache for {id}"))? {
            removed += 1;
        }
    }
    Ok(removed)
}
