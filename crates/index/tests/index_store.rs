use gixt_index::{AliasTable, DescriptionOverrides, Index, IndexEntry};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn entry(id: &str, owner: &str, description: &str, files: &[&str]) -> IndexEntry {
    IndexEntry {
        id: id.to_string(),
        description: description.to_string(),
        filenames: files.iter().map(|f| f.to_string()).collect(),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
        owner: owner.to_string(),
    }
}

#[test]
fn lookups_see_description_and_filename_matches() {
    let index = Index::new(vec![
        entry("id1", "me", "my script", &["main.py"]),
        entry("id2", "you", "other", &["tool.sh"]),
    ]);

    let by_desc: Vec<&str> = index
        .lookup_description("my script")
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(by_desc, vec!["id1"]);

    let by_name: Vec<&str> = index
        .lookup_name("tool")
        .iter()
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(by_name, vec!["id2"]);

    assert!(index.lookup_name("missing").is_empty());
    assert!(index.lookup_description("missing").is_empty());
}

#[test]
fn stores_live_side_by_side_in_one_config_dir() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("gixt");

    let mut aliases = AliasTable::default();
    aliases.insert("cool", "deadbeef01");
    aliases.save(&config.join("aliases.json")).unwrap();

    let index = Index::new(vec![entry("deadbeef01", "me", "cool thing", &["cool.sh"])]);
    index.save(&config.join("index.json")).unwrap();

    let mut overrides = DescriptionOverrides::default();
    overrides.set("deadbeef01", "renamed");
    overrides
        .save(&config.join("index_descriptions.json"))
        .unwrap();

    let mut reloaded = Index::load(&config.join("index.json")).unwrap();
    DescriptionOverrides::load(&config.join("index_descriptions.json"))
        .unwrap()
        .apply(&mut reloaded);

    assert_eq!(
        AliasTable::load(&config.join("aliases.json"))
            .unwrap()
            .get("cool"),
        Some("deadbeef01")
    );
    assert_eq!(reloaded.entries[0].description, "renamed");
}

#[test]
fn corrupt_index_is_an_error_not_an_empty_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.json");
    std::fs::write(&path, "[").unwrap();
    assert!(Index::load(&path).is_err());
}
