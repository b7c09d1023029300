//! Description management: local overrides (`index-description`) and the
//! remote gist description (`set-description`).

use crate::api::GistApi;
use crate::config::Paths;
use crate::state::{management_lookup, refresh_index_and_cache, LocalState};
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::shorten;
use gixt_index::{normalize_description, DescriptionOverrides};

fn save_overrides(paths: &Paths, overrides: &DescriptionOverrides) -> Result<()> {
    overrides.save(&paths.descriptions_file).with_context(|| {
        format!(
            "Failed to save description overrides {}",
            paths.descriptions_file.display()
        )
    })
}

pub fn list_overrides(paths: &Paths) -> Result<()> {
    paths.ensure_dirs()?;
    let state = LocalState::load(paths)?;
    if state.overrides.is_empty() {
        println!("no description overrides set");
        return Ok(());
    }
    for (id, desc) in state.overrides.iter() {
        println!("{id} -> {desc}");
    }
    Ok(())
}

pub async fn add_override(
    paths: &Paths,
    api: &dyn GistApi,
    target: &str,
    words: &[String],
) -> Result<()> {
    let desc = normalize_description(&words.join(" "));
    if desc.is_empty() {
        anyhow::bail!("description cannot be empty");
    }
    paths.ensure_dirs()?;
    let mut state = LocalState::load(paths)?;
    let identity = state.resolve(target, &management_lookup(), api).await?;
    state.overrides.set(identity.id.clone(), &desc);
    save_overrides(paths, &state.overrides)?;
    println!("set description override for {}", identity.id);
    Ok(())
}

pub async fn remove_override(paths: &Paths, api: &dyn GistApi, target: &str) -> Result<()> {
    paths.ensure_dirs()?;
    let mut state = LocalState::load(paths)?;
    let identity = state.resolve(target, &management_lookup(), api).await?;
    if !state.overrides.remove(&identity.id) {
        log::debug!("no override stored for {}", identity.id);
    }
    save_overrides(paths, &state.overrides)?;
    println!("removed description override for {}", identity.id);
    Ok(())
}

/// Change the description on the hosting service; only the owner may.
pub async fn set_description(
    paths: &Paths,
    api: &dyn GistApi,
    target: &str,
    description: &str,
) -> Result<()> {
    let description = description.trim();
    if description.is_empty() {
        anyhow::bail!("description cannot be empty");
    }
    paths.ensure_dirs()?;
    let state = LocalState::load(paths)?;
    let identity = state.resolve(target, &management_lookup(), api).await?;
    let id = identity.id;

    let gist = api
        .fetch(&id, None)
        .await
        .with_context(|| format!("Failed to fetch gist {id}"))?;
    let owner = identity
        .owner_hint
        .filter(|o| !o.trim().is_empty())
        .or_else(|| gist.owner_login().map(str::to_string))
        .unwrap_or_default();
    if owner.trim().is_empty() {
        anyhow::bail!("could not determine gist owner");
    }

    let current_user = api.current_user().await.context("detect current user")?;
    if !owner.trim().eq_ignore_ascii_case(current_user.trim()) {
        anyhow::bail!(
            "gist {} is owned by {owner} (you are {current_user})",
            shorten(&id)
        );
    }

    let updated = api
        .update_description(&id, description)
        .await
        .with_context(|| format!("Failed to update description of gist {id}"))?;
    refresh_index_and_cache(paths, &updated, false, api)
        .await
        .context("refresh local cache/index")?;
    println!("updated description for gist {}", shorten(&id));
    Ok(())
}
