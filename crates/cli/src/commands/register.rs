use crate::api::GistApi;
use crate::config::Paths;
use crate::state::{cache_gist, gist_version};
use anyhow::{Context as AnyhowContext, Result};
use console::style;
use gixt_cache::shorten;
use gixt_protocol::extract_id;

/// Cache a gist without running it.
pub async fn register(
    paths: &Paths,
    api: &dyn GistApi,
    target: &str,
    git_ref: Option<&str>,
    force_update: bool,
) -> Result<()> {
    let id = extract_id(target);
    if id.is_empty() {
        anyhow::bail!("usage: gixt register <gist-id|url> [--ref <sha>]");
    }
    paths.ensure_dirs()?;

    let gist = api
        .fetch(&id, git_ref)
        .await
        .with_context(|| format!("Failed to fetch gist {id}"))?;
    let sha = gist_version(&gist, git_ref)?;
    let owner = gist.owner_login().unwrap_or_default().to_string();
    let (dir, _) = cache_gist(&paths.cache_dir, &gist, &sha, &owner, force_update, api).await?;
    println!(
        "{}",
        style(format!(
            "cached gist {} ({}) at {}",
            shorten(&id),
            shorten(&sha),
            dir.display()
        ))
        .green()
    );
    Ok(())
}
