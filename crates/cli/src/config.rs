use anyhow::{Context as AnyhowContext, Result};
use clap::ValueEnum;
use gixt_protocol::{read_json_opt, write_json_atomic};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_ENV: &str = "GIXT_CONFIG_DIR";
pub const CACHE_DIR_ENV: &str = "GIXT_CACHE_DIR";

const APP_DIR: &str = "gixt";

/// Where gixt keeps its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub alias_file: PathBuf,
    pub index_file: PathBuf,
    pub descriptions_file: PathBuf,
    pub settings_file: PathBuf,
}

impl Paths {
    /// Platform directories, overridable through `GIXT_CONFIG_DIR` and
    /// `GIXT_CACHE_DIR`. A relative `cache_override` lives under the cache root.
    pub fn discover(cache_override: Option<&Path>) -> Result<Self> {
        let config_dir = match env_dir(CONFIG_DIR_ENV) {
            Some(dir) => dir,
            None => dirs::config_dir()
                .context("Failed to detect config dir")?
                .join(APP_DIR),
        };
        let (cache_base, default_cache) = match env_dir(CACHE_DIR_ENV) {
            Some(dir) => (dir.clone(), dir),
            None => {
                let base = dirs::cache_dir().context("Failed to detect cache dir")?;
                let default = base.join(APP_DIR);
                (base, default)
            }
        };
        let cache_dir = match cache_override.filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) if dir.is_absolute() => dir.to_path_buf(),
            Some(dir) => cache_base.join(dir),
            None => default_cache,
        };
        Ok(Self::rooted(config_dir, cache_dir))
    }

    pub fn rooted(config_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            alias_file: config_dir.join("aliases.json"),
            index_file: config_dir.join("index.json"),
            descriptions_file: config_dir.join("index_descriptions.json"),
            settings_file: config_dir.join("settings.json"),
            config_dir,
            cache_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!("Failed to create config dir {}", self.config_dir.display())
        })?;
        std::fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create cache dir {}", self.cache_dir.display()))?;
        Ok(())
    }
}

fn env_dir(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrustMode {
    #[default]
    Never,
    /// Gists owned by the authenticated user.
    Mine,
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Ephemeral temp dir per run.
    #[default]
    Never,
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    /// Run inside the gist's work dir.
    Isolate,
    /// Run in the invoking directory.
    Cwd,
}

impl TrustMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Mine => "mine",
            Self::All => "all",
        }
    }
}

impl CacheMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Cache => "cache",
        }
    }
}

impl ExecMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isolate => "isolate",
            Self::Cwd => "cwd",
        }
    }
}

impl fmt::Display for TrustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted user preferences (`settings.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mode: TrustMode,
    /// Lowercased owner logins.
    #[serde(default)]
    pub trusted_owners: BTreeSet<String>,
    #[serde(default)]
    pub trusted_gists: BTreeSet<String>,
    #[serde(default)]
    pub cache_mode: CacheMode,
    #[serde(
        default,
        deserialize_with = "lenient_exec_mode",
        skip_serializing_if = "Option::is_none"
    )]
    pub exec_mode: Option<ExecMode>,
}

/// Unknown exec modes fall back to `isolate` instead of failing the load.
fn lenient_exec_mode<'de, D>(deserializer: D) -> std::result::Result<Option<ExecMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) if value.eq_ignore_ascii_case("cwd") => Some(ExecMode::Cwd),
        Some(_) => Some(ExecMode::Isolate),
    })
}

impl Settings {
    /// A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Option<Self> = read_json_opt(path)
            .with_context(|| format!("Failed to read settings {}", path.display()))?;
        let mut settings = settings.unwrap_or_default();
        settings.trusted_owners = settings
            .trusted_owners
            .into_iter()
            .map(|o| o.trim().to_lowercase())
            .filter(|o| !o.is_empty())
            .collect();
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
            .with_context(|| format!("Failed to write settings {}", path.display()))
    }

    pub fn trust_owner(&mut self, owner: &str) {
        let owner = owner.trim().to_lowercase();
        if !owner.is_empty() {
            self.trusted_owners.insert(owner);
        }
    }

    pub fn untrust_owner(&mut self, owner: &str) -> bool {
        self.trusted_owners.remove(&owner.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_load_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings.mode, TrustMode::Never);
        assert_eq!(settings.cache_mode, CacheMode::Never);
        assert_eq!(settings.exec_mode, None);
        assert!(settings.trusted_owners.is_empty());
    }

    #[test]
    fn settings_survive_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings {
            mode: TrustMode::Mine,
            cache_mode: CacheMode::Cache,
            exec_mode: Some(ExecMode::Cwd),
            ..Settings::default()
        };
        settings.trust_owner(" Alice ");
        settings.trusted_gists.insert("abc123".into());
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        assert!(loaded.trusted_owners.contains("alice"));
    }

    #[test]
    fn unknown_exec_mode_becomes_isolate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"mode":"all","exec_mode":"sideways"}"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.exec_mode, Some(ExecMode::Isolate));
        assert_eq!(settings.mode, TrustMode::All);
    }

    #[test]
    fn rooted_paths_layout() {
        let paths = Paths::rooted(PathBuf::from("/cfg"), PathBuf::from("/cache"));
        assert_eq!(paths.index_file, PathBuf::from("/cfg/index.json"));
        assert_eq!(
            paths.descriptions_file,
            PathBuf::from("/cfg/index_descriptions.json")
        );
    }
}
