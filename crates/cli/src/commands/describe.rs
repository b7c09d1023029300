use crate::api::GistApi;
use crate::config::Paths;
use crate::state::LocalState;
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::latest_manifest;
use gixt_resolve::ResolveOptions;
use gixt_runner::{load_run_manifest, DEFAULT_DETAILS, DEFAULT_MANIFEST_NAME};
use std::path::{Path, PathBuf};

/// Run manifest names probed in a cached gist directory.
const MANIFEST_CANDIDATES: &[&str] = &[DEFAULT_MANIFEST_NAME, "manifest.json"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub id: String,
    pub owner: String,
    pub description: String,
    pub manifest_details: String,
    pub manifest_version: String,
}

impl Description {
    fn print(&self) {
        println!("ID: {}", self.id);
        if !self.owner.is_empty() {
            println!("Owner: {}", self.owner);
        }
        if !self.manifest_version.is_empty() {
            println!("Manifest version: {}", self.manifest_version);
        }
        println!("Manifest details: {}", self.manifest_details);
        println!("Description: {}", self.description);
    }
}

fn find_run_manifest(dir: &Path, files: &[String]) -> Option<PathBuf> {
    MANIFEST_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .or_else(|| {
            files
                .iter()
                .filter(|f| {
                    gixt_protocol::base_name(f).eq_ignore_ascii_case(DEFAULT_MANIFEST_NAME)
                })
                .map(|f| dir.join(f))
                .find(|p| p.is_file())
        })
}

/// Gather what is known locally, falling back to a live fetch only when
/// description or owner is still missing.
pub async fn describe_gist(paths: &Paths, api: &dyn GistApi, input: &str) -> Result<Description> {
    let target = input.trim();
    if target.is_empty() {
        anyhow::bail!("usage: gixt describe <gist-id|url|alias|name|owner/name>");
    }

    let state = LocalState::load(paths)?;
    let identity = state
        .resolve(target, &ResolveOptions::default(), api)
        .await?;

    let mut out = Description {
        id: identity.id.clone(),
        owner: identity.owner_hint.clone().unwrap_or_default(),
        ..Description::default()
    };

    if let Some(entry) = state.index.get(&identity.id) {
        out.description = entry.description.trim().to_string();
        if out.owner.is_empty() {
            out.owner = entry.owner.clone();
        }
    }
    if out.description.is_empty() {
        out.description = state.overrides.get(&identity.id).unwrap_or_default();
    }

    if let Some(cached) = latest_manifest(&paths.cache_dir, &identity.id) {
        if out.description.is_empty() {
            out.description = cached.manifest.description.trim().to_string();
        }
        if out.owner.is_empty() {
            out.owner = cached.manifest.owner.clone();
        }
        if let Some(path) = find_run_manifest(&cached.dir, &cached.manifest.files) {
            match load_run_manifest(&path) {
                Ok(run) => {
                    out.manifest_details = run.details.clone();
                    out.manifest_version = run.version.trim().to_string();
                    if out.description.is_empty() {
                        out.description = run.details.trim().to_string();
                    }
                }
                Err(err) => log::debug!("ignoring run manifest {}: {err}", path.display()),
            }
        }
    }

    if out.description.is_empty() || out.owner.is_empty() {
        let gist = api
            .fetch(&identity.id, None)
            .await
            .with_context(|| format!("Failed to fetch gist {}", identity.id))?;
        if out.description.is_empty() {
            out.description = gist.description.trim().to_string();
        }
        if out.owner.is_empty() {
            out.owner = gist.owner_login().unwrap_or_default().trim().to_string();
        }
    }

    if out.description.is_empty() {
        out.description = "(no description)".to_string();
    }
    if out.manifest_details.is_empty() {
        out.manifest_details = DEFAULT_DETAILS.to_string();
    }
    Ok(out)
}

pub async fn describe(paths: &Paths, api: &dyn GistApi, input: &str) -> Result<()> {
    paths.ensure_dirs()?;
    describe_gist(paths, api, input).await?.print();
    Ok(())
}
