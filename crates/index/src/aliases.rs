use crate::Result;
use gixt_protocol::{read_json_opt, write_json_atomic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// User-chosen names for gist ids (`aliases.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable(BTreeMap<String, String>);

impl AliasTable {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(read_json_opt(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        Ok(())
    }

    /// Exact, case-sensitive lookup on the raw name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.0.insert(name.into(), id.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Alias names grouped by the id they point to.
    pub fn names_by_id(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut out: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (name, id) in &self.0 {
            out.entry(id.as_str()).or_default().push(name.as_str());
        }
        out
    }
}

impl FromIterator<(String, String)> for AliasTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn lookup_is_exact() {
        let table: AliasTable = [("Cool".to_string(), "deadbeef".to_string())]
            .into_iter()
            .collect();
        assert_eq!(table.get("Cool"), Some("deadbeef"));
        assert_eq!(table.get("cool"), None);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        let mut table = AliasTable::default();
        table.insert("a", "111");
        table.insert("b", "111");
        table.save(&path).unwrap();

        let loaded = AliasTable::load(&path).unwrap();
        assert_eq!(loaded.names_by_id()["111"], vec!["a", "b"]);
    }
}
