use crate::{Candidate, ResolveError, Result, SourceError};
use async_trait::async_trait;
use gixt_index::{AliasTable, Index, IndexEntry};
use gixt_protocol::{
    extension, extract_id, filename_matches, is_likely_gist_id, is_shell_script_extension,
    GistIdentity, GistSummary, Platform,
};
use std::collections::BTreeSet;

pub const LIVE_PAGE_SIZE: u32 = 100;
pub const DEFAULT_USER_PAGES: u32 = 2;

/// Live listing of an owner's public gists.
#[async_trait]
pub trait OwnerGistSource: Send + Sync {
    async fn list_for_owner(
        &self,
        owner: &str,
        per_page: u32,
        max_pages: u32,
    ) -> std::result::Result<Vec<GistSummary>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Query the owner's gists remotely when the index has no match.
    pub live_lookup: bool,
    /// Also match exact gist descriptions, not only file names.
    pub description_lookup: bool,
    pub max_pages: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            live_lookup: false,
            description_lookup: false,
            max_pages: DEFAULT_USER_PAGES,
        }
    }
}

/// Turns user input into a gist id.
///
/// Stages run in a fixed order and the first hit wins: alias, direct id or
/// URL, `owner/name` in the index, bare name in the index, live owner
/// listing, and finally a hex-looking fallback.
pub struct Resolver<'a> {
    aliases: &'a AliasTable,
    index: &'a Index,
    platform: Platform,
    live: Option<&'a dyn OwnerGistSource>,
}

#[derive(Debug, Clone)]
struct Match {
    id: String,
    owner: String,
    description: String,
    /// Extensions of the files whose names matched.
    extensions: Vec<String>,
}

impl Match {
    fn into_identity(self, from_index: bool) -> GistIdentity {
        GistIdentity {
            id: self.id,
            owner_hint: Some(self.owner).filter(|o| !o.trim().is_empty()),
            from_index,
        }
    }

    fn candidate(&self) -> Candidate {
        Candidate {
            id: self.id.clone(),
            owner: self.owner.clone(),
            description: self.description.clone(),
        }
    }
}

impl<'a> Resolver<'a> {
    /// `index` is expected to have description overrides applied already.
    pub fn new(aliases: &'a AliasTable, index: &'a Index) -> Self {
        Self {
            aliases,
            index,
            platform: Platform::current(),
            live: None,
        }
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_live_source(mut self, source: &'a dyn OwnerGistSource) -> Self {
        self.live = Some(source);
        self
    }

    pub async fn resolve(&self, input: &str, options: &ResolveOptions) -> Result<GistIdentity> {
        let mut attempted = vec!["alias"];
        if let Some(id) = self.aliases.get(input) {
            log::debug!("resolved {input:?} via alias -> {id}");
            return Ok(GistIdentity::direct(id));
        }

        attempted.push("gist id or URL");
        let direct = extract_id(input);
        if is_likely_gist_id(&direct) {
            log::debug!("resolved {input:?} as direct id {direct}");
            return Ok(GistIdentity::direct(direct));
        }

        let owner_qualified = split_owner_name(input);

        if !self.index.is_empty() {
            if let Some((owner, name)) = &owner_qualified {
                attempted.push("indexed owner/name");
                let matches = self.index_owner_matches(owner, name, options);
                if let Some(identity) = self.settle(input, matches, name, true)? {
                    log::debug!("resolved {input:?} via index owner/name -> {}", identity.id);
                    return Ok(identity);
                }
            }

            attempted.push("indexed name");
            let target = input.trim().to_lowercase();
            let matches = self.index_name_matches(&target, options);
            if let Some(identity) = self.settle(input, matches, &target, true)? {
                log::debug!("resolved {input:?} via index name -> {}", identity.id);
                return Ok(identity);
            }
        }

        if options.live_lookup {
            if let (Some((owner, name)), Some(source)) = (&owner_qualified, self.live) {
                attempted.push("live owner lookup");
                let pages = options.max_pages.max(1);
                log::debug!("listing up to {pages} page(s) of gists for {owner}");
                let listed = source
                    .list_for_owner(owner, LIVE_PAGE_SIZE, pages)
                    .await
                    .map_err(|source| ResolveError::Live {
                        owner: owner.to_string(),
                        source,
                    })?;
                let matches = listed
                    .iter()
                    .filter_map(|summary| match_summary(summary, name, options))
                    .collect();
                if let Some(identity) = self.settle(input, matches, name, false)? {
                    log::debug!("resolved {input:?} via live lookup -> {}", identity.id);
                    return Ok(identity);
                }
            }
        }

        Err(ResolveError::Unresolved {
            input: input.to_string(),
            attempted,
        })
    }

    fn index_owner_matches(&self, owner: &str, name: &str, options: &ResolveOptions) -> Vec<Match> {
        self.index
            .entries
            .iter()
            .filter(|e| e.owner.eq_ignore_ascii_case(owner))
            .filter_map(|e| match_entry(e, name, options))
            .collect()
    }

    fn index_name_matches(&self, target: &str, options: &ResolveOptions) -> Vec<Match> {
        let by_name = self
            .index
            .lookup_name(target)
            .into_iter()
            .filter_map(|e| match_entry(e, target, &ResolveOptions::default()));
        let by_description = options
            .description_lookup
            .then(|| self.index.lookup_description(target))
            .unwrap_or_default()
            .into_iter()
            .map(|e| entry_match(e, target));

        let mut seen = BTreeSet::new();
        by_name
            .chain(by_description)
            .filter(|m| seen.insert(m.id.clone()))
            .collect()
    }

    /// Narrow, then turn 0/1/many matches into none/identity/ambiguity.
    fn settle(
        &self,
        input: &str,
        matches: Vec<Match>,
        target: &str,
        from_index: bool,
    ) -> Result<Option<GistIdentity>> {
        let mut matches = prefer_platform(matches, self.platform);
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop().map(|m| m.into_identity(from_index))),
            _ => {
                log::debug!("{} candidates remain for {target:?}", matches.len());
                Err(ResolveError::Ambiguous {
                    input: input.to_string(),
                    candidates: matches.iter().map(Match::candidate).collect(),
                })
            }
        }
    }
}

/// `owner/name` with a non-empty owner; URLs are excluded.
fn split_owner_name(input: &str) -> Option<(&str, String)> {
    if input.contains("://") {
        return None;
    }
    let (owner, name) = input.split_once('/')?;
    let owner = owner.trim();
    let name = name.trim().to_lowercase();
    if owner.is_empty() || name.is_empty() {
        return None;
    }
    Some((owner, name))
}

fn matched_extensions<'f>(target: &str, files: impl IntoIterator<Item = &'f String>) -> Vec<String> {
    files
        .into_iter()
        .filter(|f| filename_matches(target, f))
        .map(|f| extension(f))
        .collect()
}

fn entry_match(entry: &IndexEntry, target: &str) -> Match {
    Match {
        id: entry.id.clone(),
        owner: entry.owner.clone(),
        description: entry.description.clone(),
        extensions: matched_extensions(target, &entry.filenames),
    }
}

fn match_entry(entry: &IndexEntry, target: &str, options: &ResolveOptions) -> Option<Match> {
    let described = options.description_lookup && entry.matches_description(target);
    let m = entry_match(entry, target);
    (described || !m.extensions.is_empty()).then_some(m)
}

fn match_summary(summary: &GistSummary, target: &str, options: &ResolveOptions) -> Option<Match> {
    let described = options.description_lookup
        && !target.is_empty()
        && summary.description.trim().to_lowercase() == target;
    let extensions = matched_extensions(target, summary.files.keys());
    (described || !extensions.is_empty()).then(|| Match {
        id: summary.id.clone(),
        owner: summary.owner_login().unwrap_or_default().to_string(),
        description: summary.description.trim().to_string(),
        extensions,
    })
}

/// Pick the platform's variant among shell-script twins (`run.sh` vs `run.bat`).
///
/// Only applies when every file-name match is a shell script; any other
/// extension keeps the full ambiguity.
fn prefer_platform(matches: Vec<Match>, platform: Platform) -> Vec<Match> {
    if matches.len() <= 1 {
        return matches;
    }
    let all_shell = matches
        .iter()
        .flat_map(|m| m.extensions.iter())
        .all(|ext| is_shell_script_extension(ext));
    if !all_shell {
        return matches;
    }

    let preferred: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| m.extensions.iter().any(|ext| platform.prefers(ext)))
        .map(|(i, _)| i)
        .collect();
    match preferred.as_slice() {
        [only] => vec![matches[*only].clone()],
        _ => matches,
    }
}
