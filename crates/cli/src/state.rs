//! Local state shared by the commands: aliases, the index with description
//! overrides, resolution, and keeping index and cache in step with remote
//! edits.

use crate::api::{ApiBridge, GistApi};
use crate::config::Paths;
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::{cache_dir, materialize, CacheManifest};
use gixt_index::{AliasTable, DescriptionOverrides, Index, IndexEntry};
use gixt_protocol::{Gist, GistIdentity};
use gixt_resolve::{ResolveOptions, Resolver};
use std::path::PathBuf;

pub struct LocalState {
    pub aliases: AliasTable,
    pub overrides: DescriptionOverrides,
    /// Index as stored, with overrides applied.
    pub index: Index,
}

impl LocalState {
    pub fn load(paths: &Paths) -> Result<Self> {
        let aliases = AliasTable::load(&paths.alias_file)
            .with_context(|| format!("Failed to load aliases {}", paths.alias_file.display()))?;
        let overrides = DescriptionOverrides::load(&paths.descriptions_file).with_context(|| {
            format!(
                "Failed to load description overrides {}",
                paths.descriptions_file.display()
            )
        })?;
        let mut index = Index::load(&paths.index_file)
            .with_context(|| format!("Failed to load index {}", paths.index_file.display()))?;
        overrides.apply(&mut index);
        Ok(Self {
            aliases,
            overrides,
            index,
        })
    }

    /// Resolve user input to a gist; the API is only consulted for live
    /// owner lookup.
    pub async fn resolve(
        &self,
        input: &str,
        options: &ResolveOptions,
        api: &dyn GistApi,
    ) -> Result<GistIdentity> {
        let bridge = ApiBridge(api);
        let resolver = Resolver::new(&self.aliases, &self.index).with_live_source(&bridge);
        Ok(resolver.resolve(input, options).await?)
    }
}

/// Options used by management commands that accept names as well as ids.
pub fn management_lookup() -> ResolveOptions {
    ResolveOptions {
        description_lookup: true,
        ..ResolveOptions::default()
    }
}

/// Version to materialize: the newest history entry, else the requested ref.
pub fn gist_version(gist: &Gist, git_ref: Option<&str>) -> Result<String> {
    gist.latest_version()
        .or(git_ref.filter(|r| !r.trim().is_empty()))
        .map(str::to_string)
        .context("could not determine gist version")
}

/// Materialize into the persistent cache and record the cache manifest.
pub async fn cache_gist(
    cache_root: &std::path::Path,
    gist: &Gist,
    sha: &str,
    owner: &str,
    force_update: bool,
    api: &dyn GistApi,
) -> Result<(PathBuf, CacheManifest)> {
    let dir = cache_dir(cache_root, &gist.id, sha)?;
    let materialized = materialize(&gist.files, &dir, force_update, &ApiBridge(api))
        .await
        .with_context(|| format!("Failed to materialize gist {}", gist.id))?;
    let manifest = CacheManifest::for_gist(gist, sha, owner, materialized.files);
    manifest
        .save(&dir)
        .with_context(|| format!("Failed to write cache manifest in {}", dir.display()))?;
    Ok((dir, manifest))
}

/// After a remote edit: upsert the index entry and rewrite the cached copy
/// when one exists (or when `force_update` asks for it).
pub async fn refresh_index_and_cache(
    paths: &Paths,
    gist: &Gist,
    force_update: bool,
    api: &dyn GistApi,
) -> Result<()> {
    let mut index = Index::load(&paths.index_file)?;
    index.upsert(IndexEntry::from_gist(gist));
    index
        .save(&paths.index_file)
        .with_context(|| format!("Failed to save index {}", paths.index_file.display()))?;

    let Some(sha) = gist.latest_version() else {
        return Ok(());
    };
    let dir = cache_dir(&paths.cache_dir, &gist.id, sha)?;
    if force_update || dir.exists() {
        let owner = gist.owner_login().unwrap_or_default();
        cache_gist(&paths.cache_dir, gist, sha, owner, true, api).await?;
    }
    Ok(())
}
