//! `config-trust`, `config-cache` and `config-exec`.

use crate::config::{CacheMode, ExecMode, Paths, Settings, TrustMode};
use anyhow::Result;
use console::style;

#[derive(Debug, Clone, Default)]
pub struct TrustChanges {
    pub mode: Option<TrustMode>,
    pub add_owners: Vec<String>,
    pub remove_owners: Vec<String>,
    pub remove_gists: Vec<String>,
    pub clear_owners: bool,
    pub clear_gists: bool,
    pub reset: bool,
    pub show: bool,
}

impl TrustChanges {
    fn is_noop(&self) -> bool {
        self.mode.is_none()
            && self.add_owners.is_empty()
            && self.remove_owners.is_empty()
            && self.remove_gists.is_empty()
            && !self.clear_owners
            && !self.clear_gists
            && !self.reset
    }
}

/// Apply changes in a fixed order: reset, clears, additions, removals, mode.
pub fn apply_trust_changes(settings: &mut Settings, changes: &TrustChanges) {
    if changes.reset {
        settings.mode = TrustMode::Never;
        settings.trusted_owners.clear();
        settings.trusted_gists.clear();
    }
    if changes.clear_owners {
        settings.trusted_owners.clear();
    }
    if changes.clear_gists {
        settings.trusted_gists.clear();
    }
    for owner in &changes.add_owners {
        settings.trust_owner(owner);
    }
    for owner in &changes.remove_owners {
        settings.untrust_owner(owner);
    }
    for gist in &changes.remove_gists {
        let gist = gist.trim();
        if !settings.trusted_gists.remove(gist) {
            settings.trusted_gists.remove(&gist.to_lowercase());
        }
    }
    if let Some(mode) = changes.mode {
        settings.mode = mode;
    }
}

fn load(paths: &Paths) -> Result<Settings> {
    paths.ensure_dirs()?;
    Settings::load(&paths.settings_file)
}

pub fn config_trust(paths: &Paths, changes: &TrustChanges) -> Result<()> {
    let mut settings = load(paths)?;
    apply_trust_changes(&mut settings, changes);
    if changes.reset {
        println!(
            "{}",
            style("cleared stored trust decisions (mode=never).").yellow()
        );
    }
    settings.save(&paths.settings_file)?;

    if changes.show || !changes.is_noop() {
        println!("{}", style("Trust configuration:").cyan().bold());
        println!("  mode: {}", settings.mode);
        if settings.trusted_owners.is_empty() {
            println!("  trusted owners: (none)");
        } else {
            let owners: Vec<&str> = settings.trusted_owners.iter().map(String::as_str).collect();
            println!("  trusted owners: {}", owners.join(", "));
        }
        if settings.trusted_gists.is_empty() {
            println!("  trusted gists: (none)");
        } else {
            println!("  trusted gists: {} stored", settings.trusted_gists.len());
        }
    }
    Ok(())
}

pub fn config_cache(paths: &Paths, mode: Option<CacheMode>, show: bool) -> Result<()> {
    let mut settings = load(paths)?;
    if let Some(mode) = mode {
        settings.cache_mode = mode;
        settings.save(&paths.settings_file)?;
    }
    if show || mode.is_some() {
        println!("Cache mode: {}", settings.cache_mode);
    }
    Ok(())
}

pub fn config_exec(paths: &Paths, mode: Option<ExecMode>, show: bool) -> Result<()> {
    let mut settings = load(paths)?;
    if let Some(mode) = mode {
        settings.exec_mode = Some(mode);
        settings.save(&paths.settings_file)?;
    }
    if show || mode.is_some() {
        println!(
            "Execution mode: {}",
            settings.exec_mode.unwrap_or(ExecMode::Isolate)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    #[test]
    fn reset_runs_before_additions() {
        let mut settings = Settings {
            mode: TrustMode::All,
            ..Settings::default()
        };
        settings.trust_owner("old");
        settings.trusted_gists.insert("g1".into());

        apply_trust_changes(
            &mut settings,
            &TrustChanges {
                reset: true,
                add_owners: vec!["New".into()],
                ..TrustChanges::default()
            },
        );
        assert_eq!(settings.mode, TrustMode::Never);
        assert_eq!(settings.trusted_owners, BTreeSet::from(["new".to_string()]));
        assert!(settings.trusted_gists.is_empty());
    }

    #[test]
    fn removals_and_mode() {
        let mut settings = Settings::default();
        settings.trust_owner("alice");
        settings.trust_owner("bob");
        settings.trusted_gists.insert("abc".into());

        apply_trust_changes(
            &mut settings,
            &TrustChanges {
                mode: Some(TrustMode::Mine),
                remove_owners: vec!["ALICE".into()],
                remove_gists: vec!["abc".into()],
                ..TrustChanges::default()
            },
        );
        assert_eq!(settings.mode, TrustMode::Mine);
        assert_eq!(settings.trusted_owners, BTreeSet::from(["bob".to_string()]));
        assert!(settings.trusted_gists.is_empty());
    }
}
