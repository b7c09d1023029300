use crate::config::Paths;
use anyhow::{Context as AnyhowContext, Result};
use console::style;
use gixt_index::AliasTable;
use gixt_protocol::extract_id;

fn load(paths: &Paths) -> Result<AliasTable> {
    paths.ensure_dirs()?;
    AliasTable::load(&paths.alias_file)
        .with_context(|| format!("Failed to load aliases {}", paths.alias_file.display()))
}

fn save(paths: &Paths, aliases: &AliasTable) -> Result<()> {
    aliases
        .save(&paths.alias_file)
        .with_context(|| format!("Failed to save aliases {}", paths.alias_file.display()))
}

pub fn add(paths: &Paths, name: &str, target: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("alias name cannot be empty");
    }
    let id = extract_id(target);
    if id.is_empty() {
        anyhow::bail!("cannot extract a gist id from {target:?}");
    }
    let mut aliases = load(paths)?;
    aliases.insert(name, id.clone());
    save(paths, &aliases)?;
    println!("alias {name} -> {id} saved");
    Ok(())
}

pub fn list(paths: &Paths) -> Result<()> {
    let aliases = load(paths)?;
    if aliases.is_empty() {
        println!("no aliases defined");
        return Ok(());
    }
    println!("{}", style("Aliases:").cyan().bold());
    for (name, id) in aliases.iter() {
        println!("  {name} -> {id}");
    }
    Ok(())
}

pub fn remove(paths: &Paths, name: &str) -> Result<()> {
    let mut aliases = load(paths)?;
    if aliases.remove(name).is_none() {
        anyhow::bail!("alias {name} not found");
    }
    save(paths, &aliases)?;
    println!("alias {name} removed");
    Ok(())
}
