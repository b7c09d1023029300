use crate::api::GistApi;
use crate::config::Paths;
use crate::state::LocalState;
use anyhow::{Context as AnyhowContext, Result};
use gixt_cache::{cached_gists, shorten};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRow {
    pub id: String,
    pub owner: String,
    pub description: String,
    pub files: Vec<String>,
    pub cached: bool,
    pub indexed: bool,
}

impl ListRow {
    pub fn source(&self) -> &'static str {
        source_label(self.cached, self.indexed)
    }
}

pub fn source_label(cached: bool, indexed: bool) -> &'static str {
    match (cached, indexed) {
        (true, true) => "cache+index",
        (true, false) => "cache",
        (false, true) => "index",
        (false, false) => "",
    }
}

/// Merge index entries with the newest cached manifest of each gist.
///
/// Cached data refreshes files, owner and description of an indexed row;
/// description overrides always win.
pub fn gather_rows(state: &LocalState, cache_root: &std::path::Path) -> Vec<ListRow> {
    let mut rows: BTreeMap<String, ListRow> = BTreeMap::new();
    for entry in &state.index.entries {
        rows.insert(
            entry.id.clone(),
            ListRow {
                id: entry.id.clone(),
                owner: entry.owner.clone(),
                description: entry.description.trim().to_string(),
                files: entry.filenames.clone(),
                cached: false,
                indexed: true,
            },
        );
    }

    for cached in cached_gists(cache_root) {
        let manifest = cached.manifest;
        let row = rows.entry(manifest.gist_id.clone()).or_insert_with(|| ListRow {
            id: manifest.gist_id.clone(),
            ..ListRow::default()
        });
        row.cached = true;
        if !manifest.files.is_empty() {
            row.files = manifest.files;
        }
        if !manifest.description.trim().is_empty() {
            row.description = manifest.description.trim().to_string();
        }
        if !manifest.owner.is_empty() {
            row.owner = manifest.owner;
        }
    }

    let mut rows: Vec<ListRow> = rows
        .into_values()
        .map(|mut row| {
            row.description = state.overrides.describe(&row.id, &row.description);
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        a.owner
            .cmp(&b.owner)
            .then_with(|| a.description.cmp(&b.description))
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}

pub async fn list(paths: &Paths, api: &dyn GistApi, cache_only: bool, mine: bool) -> Result<()> {
    paths.ensure_dirs()?;
    let state = LocalState::load(paths)?;

    let current_user = if mine {
        Some(
            api.current_user()
                .await
                .context("detect current user for --mine")?,
        )
    } else {
        None
    };

    let rows: Vec<ListRow> = gather_rows(&state, &paths.cache_dir)
        .into_iter()
        .filter(|row| !cache_only || row.cached)
        .filter(|row| {
            current_user
                .as_deref()
                .map_or(true, |login| row.owner.eq_ignore_ascii_case(login))
        })
        .collect();

    let aliases = state.aliases.names_by_id();
    print!("{}", render_table(&rows, &aliases));
    Ok(())
}

const ID_MAX: usize = 12;
const SOURCE_MAX: usize = 12;
const OWNER_MAX: usize = 18;
const FILES_MAX: usize = 24;
const ALIAS_MAX: usize = 18;
const DESC_MAX: usize = 36;

pub fn render_table(rows: &[ListRow], aliases: &BTreeMap<&str, Vec<&str>>) -> String {
    let mut table: Vec<[String; 6]> = vec![
        ["ID", "Source", "Owner", "Files", "Aliases", "Description"].map(String::from),
        ["--", "------", "-----", "-----", "-------", "-----------"].map(String::from),
    ];
    for row in rows {
        let alias_names = aliases
            .get(row.id.as_str())
            .map(|names| names.join(","))
            .unwrap_or_default();
        table.push([
            trim_cell(shorten(&row.id), ID_MAX),
            trim_cell(row.source(), SOURCE_MAX),
            trim_cell(&row.owner, OWNER_MAX),
            trim_cell(&row.files.join(","), FILES_MAX),
            trim_cell(&alias_names, ALIAS_MAX),
            trim_cell(&row.description, DESC_MAX),
        ]);
    }

    let mut widths = [0usize; 6];
    for line in &table {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in &table {
        let mut rendered = String::new();
        for (i, cell) in line.iter().enumerate() {
            if i + 1 == line.len() {
                rendered.push_str(cell);
            } else {
                rendered.push_str(&format!("{cell:<width$}  ", width = widths[i]));
            }
        }
        out.push_str(rendered.trim_end());
        out.push('\n');
    }
    out
}

/// Single-line cell no longer than `max - 1` chars, with `...` when cut.
fn trim_cell(value: &str, max: usize) -> String {
    let flat: String = value
        .chars()
        .map(|c| if c == '\n' || c == '\t' { ' ' } else { c })
        .collect();
    if flat.chars().count() < max {
        return flat;
    }
    if max <= 3 {
        return flat.chars().take(max).collect();
    }
    let mut cut: String = flat.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}
