//! `gixt clone` and `gixt fork`: copy a gist somewhere else, addressed by
//! any name the resolver understands.

use crate::api::GistApi;
use crate::config::Paths;
use crate::state::{management_lookup, LocalState};
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::shorten;
use gixt_index::{Index, IndexEntry};
use gixt_protocol::Gist;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const GH_PROGRAM: &str = "gh";

async fn resolve_id(paths: &Paths, api: &dyn GistApi, target: &str) -> Result<String> {
    paths.ensure_dirs()?;
    let state = LocalState::load(paths)?;
    Ok(state.resolve(target, &management_lookup(), api).await?.id)
}

/// Destination of a clone: `dir` when given, else a directory named after the id.
pub fn clone_destination(cwd: &Path, id: &str, dir: Option<&Path>) -> PathBuf {
    match dir.filter(|d| !d.as_os_str().is_empty()) {
        Some(dir) => cwd.join(dir),
        None => cwd.join(id),
    }
}

/// Git clone of the gist through the GitHub CLI.
pub async fn clone_gist(
    paths: &Paths,
    api: &dyn GistApi,
    target: &str,
    dir: Option<&Path>,
    cwd: &Path,
) -> Result<()> {
    let target = target.trim();
    if target.is_empty() {
        anyhow::bail!("usage: gixt clone <gist-id|url|alias|name|owner/name> [--dir <path>]");
    }
    let id = resolve_id(paths, api, target).await?;
    let dest = clone_destination(cwd, &id, dir);
    if dest.exists() {
        anyhow::bail!("target path {} already exists", dest.display());
    }

    log::debug!("{GH_PROGRAM} gist clone {id} {}", dest.display());
    let status = tokio::process::Command::new(GH_PROGRAM)
        .args(["gist", "clone", &id])
        .arg(&dest)
        .current_dir(cwd)
        .status()
        .await
        .context("gh gist clone failed (is the GitHub CLI installed?)")?;
    if !status.success() {
        anyhow::bail!("gh gist clone failed: {status}");
    }
    println!("cloned gist {} into {}", shorten(&id), dest.display());
    Ok(())
}

/// Every file's content, downloading the ones the API left out.
pub async fn gist_contents(api: &dyn GistApi, gist: &Gist) -> Result<BTreeMap<String, String>> {
    let mut contents = BTreeMap::new();
    for (name, file) in &gist.files {
        let content = if file.has_inline_content() {
            file.content.clone()
        } else if file.raw_url.trim().is_empty() {
            anyhow::bail!("gist file {name} has no content or raw_url");
        } else {
            let bytes = api
                .fetch_raw(&file.raw_url)
                .await
                .with_context(|| format!("download {name}"))?;
            String::from_utf8_lossy(&bytes).into_owned()
        };
        contents.insert(name.clone(), content);
    }
    Ok(contents)
}

/// Copy a gist into a new gist owned by the current user and index it.
pub async fn fork_gist(
    paths: &Paths,
    api: &dyn GistApi,
    target: &str,
    public: bool,
    description: Option<&str>,
) -> Result<Gist> {
    let target = target.trim();
    if target.is_empty() {
        anyhow::bail!(
            "usage: gixt fork <gist-id|url|alias|name|owner/name> [--public] [--description <desc>]"
        );
    }
    let id = resolve_id(paths, api, target).await?;
    let gist = api
        .fetch(&id, None)
        .await
        .with_context(|| format!("Failed to fetch gist {id}"))?;
    let files = gist_contents(api, &gist).await?;
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(&gist.description);

    let forked = api
        .create(&files, description, public)
        .await
        .with_context(|| format!("Failed to fork gist {id}"))?;
    println!(
        "forked gist {} -> {} ({})",
        shorten(&id),
        shorten(&forked.id),
        forked.html_url
    );

    let mut index = Index::load(&paths.index_file)?;
    index.upsert(IndexEntry::from_gist(&forked));
    index
        .save(&paths.index_file)
        .with_context(|| format!("Failed to save index {}", paths.index_file.display()))?;
    Ok(forked)
}
