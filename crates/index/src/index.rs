use crate::Result;
use gixt_protocol::{
    filename_matches, read_json_opt, unix_now_ms, write_json_atomic, Gist, GistSummary,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub owner: String,
}

impl IndexEntry {
    pub fn from_gist(gist: &Gist) -> Self {
        Self {
            id: gist.id.clone(),
            description: gist.description.trim().to_string(),
            filenames: gist.filenames(),
            updated_at: gist.updated_at.clone(),
            owner: gist.owner_login().unwrap_or_default().to_string(),
        }
    }

    pub fn from_summary(summary: &GistSummary) -> Self {
        Self {
            id: summary.id.clone(),
            description: summary.description.trim().to_string(),
            filenames: summary.filenames(),
            updated_at: summary.updated_at.clone(),
            owner: summary.owner_login().unwrap_or_default().to_string(),
        }
    }

    /// Any file whose stem or full name equals `target` (trimmed, lowercased).
    pub fn matches_filename(&self, target: &str) -> bool {
        self.filenames.iter().any(|f| filename_matches(target, f))
    }

    /// Exact description match; `target` must be trimmed and lowercased.
    pub fn matches_description(&self, target: &str) -> bool {
        !target.is_empty() && self.description.trim().to_lowercase() == target
    }
}

/// Friendly-name index persisted as `index.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    #[serde(default)]
    pub generated_at_unix_ms: u64,
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        let mut index = Self {
            generated_at_unix_ms: unix_now_ms(),
            entries,
        };
        index.sort_entries();
        index
    }

    /// A missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(read_json_opt(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries with a file named `name` (stem or full base name, case-insensitive).
    pub fn lookup_name(&self, name: &str) -> Vec<&IndexEntry> {
        let target = name.trim().to_lowercase();
        if target.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.matches_filename(&target))
            .collect()
    }

    /// Entries whose description equals `desc`, ignoring case and outer whitespace.
    pub fn lookup_description(&self, desc: &str) -> Vec<&IndexEntry> {
        let target = desc.trim().to_lowercase();
        if target.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.matches_description(&target))
            .collect()
    }

    /// Order by owner, then description; id breaks ties.
    pub fn sort_entries(&mut self) {
        self.entries.sort_by(|a, b| {
            a.owner
                .cmp(&b.owner)
                .then_with(|| a.description.cmp(&b.description))
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    fn touch(&mut self) {
        self.generated_at_unix_ms = unix_now_ms();
        self.sort_entries();
    }

    /// Replace the entry with the same id, or append it.
    pub fn upsert(&mut self, entry: IndexEntry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.touch();
    }

    /// Replace every entry belonging to an owner present in `fresh`.
    ///
    /// Entries of other owners are kept. Used when re-listing the
    /// authenticated user's gists, so deleted gists disappear.
    pub fn replace_owned(&mut self, fresh: Vec<IndexEntry>) {
        let owners: BTreeSet<String> = fresh
            .iter()
            .map(|e| e.owner.trim().to_lowercase())
            .filter(|o| !o.is_empty())
            .collect();

        let mut merged: BTreeMap<String, IndexEntry> = BTreeMap::new();
        for entry in self.entries.drain(..) {
            if owners.contains(&entry.owner.trim().to_lowercase()) {
                continue;
            }
            merged.insert(entry.id.clone(), entry);
        }
        for entry in fresh {
            merged.insert(entry.id.clone(), entry);
        }
        self.entries = merged.into_values().collect();
        self.touch();
    }

    /// Append entries whose id is not indexed yet; returns how many were added.
    pub fn add_missing(&mut self, fresh: Vec<IndexEntry>) -> usize {
        let mut known: BTreeSet<String> = self.entries.iter().map(|e| e.id.clone()).collect();
        let mut added = 0;
        for entry in fresh {
            if known.insert(entry.id.clone()) {
                self.entries.push(entry);
                added += 1;
            }
        }
        self.touch();
        added
    }

    /// Drop entries by id (case-insensitive) or owner; returns how many were removed.
    pub fn remove_matching(&mut self, ids: &BTreeSet<String>, owners: &BTreeSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| {
            !ids.contains(&e.id.trim().to_lowercase())
                && !owners.contains(&e.owner.trim().to_lowercase())
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            self.touch();
        }
        removed
    }
}
