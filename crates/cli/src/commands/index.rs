use crate::api::GistApi;
use crate::config::Paths;
use anyhow::{Context as AnyhowContext, Result};
use console::style;
use gixt_index::{refresh_entries, Index, IndexEntry};

/// Page size and page cap for bulk listings.
const LIST_PAGE_SIZE: u32 = 100;
const LIST_MAX_PAGES: u32 = 5;

fn load_index(paths: &Paths) -> Result<Index> {
    paths.ensure_dirs()?;
    Index::load(&paths.index_file)
        .with_context(|| format!("Failed to load index {}", paths.index_file.display()))
}

fn save_index(paths: &Paths, index: &Index) -> Result<()> {
    index
        .save(&paths.index_file)
        .with_context(|| format!("Failed to save index {}", paths.index_file.display()))
}

/// Re-fetch every indexed gist; gists that vanished are dropped.
pub async fn update_index(paths: &Paths, api: &dyn GistApi) -> Result<()> {
    let current = load_index(paths)?;
    if current.is_empty() {
        println!(
            "index is empty; nothing to refresh (add entries via index-mine, index-owner, or register)."
        );
        return Ok(());
    }

    println!("refreshing {} indexed gists...", current.entries.len());
    let outcome = refresh_entries(&current.entries, |id| async move {
        match api.fetch(&id, None).await {
            Ok(gist) => Ok(Some(gist)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    })
    .await
    .context("Failed to refresh index")?;

    save_index(paths, &outcome.index)?;
    if outcome.missing > 0 {
        println!(
            "{}",
            style(format!("removed {} missing gists from index", outcome.missing)).yellow()
        );
    }
    println!(
        "{}",
        style(format!(
            "stored {} gists in index {}",
            outcome.index.entries.len(),
            paths.index_file.display()
        ))
        .green()
    );
    Ok(())
}

/// Replace the authenticated user's entries with a fresh listing.
pub async fn index_mine(paths: &Paths, api: &dyn GistApi) -> Result<()> {
    println!("fetching your gists...");
    let mine = api
        .list_mine(LIST_PAGE_SIZE, LIST_MAX_PAGES)
        .await
        .context("Failed to list your gists")?;
    let fresh: Vec<IndexEntry> = mine.iter().map(IndexEntry::from_summary).collect();

    let mut index = load_index(paths)?;
    index.replace_owned(fresh);
    save_index(paths, &index)?;
    println!(
        "{}",
        style(format!(
            "stored {} gists in index {}",
            index.entries.len(),
            paths.index_file.display()
        ))
        .green()
    );
    Ok(())
}

/// Add an owner's gists that are not indexed yet.
pub async fn index_owner(paths: &Paths, api: &dyn GistApi, owner: &str) -> Result<()> {
    let owner = owner.trim();
    if owner.is_empty() {
        anyhow::bail!("usage: gixt index-owner --owner <login>");
    }

    println!("fetching gists for owner {owner}...");
    let listed = api
        .list_for_owner(owner, LIST_PAGE_SIZE, LIST_MAX_PAGES)
        .await
        .with_context(|| format!("Failed to list gists for {owner}"))?;
    let fresh: Vec<IndexEntry> = listed.iter().map(IndexEntry::from_summary).collect();

    let mut index = load_index(paths)?;
    let added = index.add_missing(fresh);
    save_index(paths, &index)?;
    println!(
        "indexed {} gists for owner {owner} ({added} new, total {} entries)",
        listed.len(),
        index.entries.len()
    );
    Ok(())
}

pub fn clear_index(paths: &Paths) -> Result<()> {
    match std::fs::remove_file(&paths.index_file) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| {
                format!("Failed to remove index {}", paths.index_file.display())
            })
        }
    }
    println!(
        "removed index file {} (cache untouched)",
        paths.index_file.display()
    );
    Ok(())
}

pub fn clean_cache(paths: &Paths) -> Result<()> {
    println!("removing cache at {}...", paths.cache_dir.display());
    match std::fs::remove_dir_all(&paths.cache_dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err)
            .with_context(|| format!("Failed to remove cache {}", paths.cache_dir.display())),
    }
}
