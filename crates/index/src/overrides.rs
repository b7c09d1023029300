use crate::{Index, Result};
use gixt_protocol::{read_json_opt, write_json_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Local description replacements keyed by gist id (`index_descriptions.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptionOverrides(BTreeMap<String, String>);

pub fn normalize_description(desc: &str) -> String {
    desc.trim().to_string()
}

impl DescriptionOverrides {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(read_json_opt(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.0.get(id).map(|d| normalize_description(d))
    }

    pub fn set(&mut self, id: impl Into<String>, desc: &str) {
        self.0.insert(id.into(), normalize_description(desc));
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overrides sorted by gist id.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Overridden description when one exists, else `fallback` trimmed.
    pub fn describe(&self, id: &str, fallback: &str) -> String {
        self.get(id)
            .unwrap_or_else(|| fallback.trim().to_string())
    }

    /// Rewrite entry descriptions in place so lookups see the overrides.
    pub fn apply(&self, index: &mut Index) {
        if self.0.is_empty() {
            return;
        }
        for entry in &mut index.entries {
            if let Some(desc) = self.get(&entry.id) {
                entry.description = desc;
            }
        }
    }
}
