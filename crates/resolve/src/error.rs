use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

/// Error type surfaced by an [`OwnerGistSource`](crate::OwnerGistSource).
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// One gist that matched an ambiguous identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub owner: String,
    pub description: String,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(
        "{input:?} matches {} gists: {} (disambiguate with owner/name, the full file name with extension, or an alias)",
        .candidates.len(),
        format_candidates(.candidates)
    )]
    Ambiguous {
        input: String,
        candidates: Vec<Candidate>,
    },

    #[error(
        "could not resolve {input:?} (tried {}); run `gixt index-mine` or `gixt index-owner <login>`, or pass owner/name with --user-lookup",
        .attempted.join(", ")
    )]
    Unresolved {
        input: String,
        attempted: Vec<&'static str>,
    },

    #[error("live lookup for owner {owner} failed: {source}")]
    Live {
        owner: String,
        #[source]
        source: SourceError,
    },
}

fn format_candidates(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(|c| {
            let description = if c.description.trim().is_empty() {
                "no description"
            } else {
                c.description.trim()
            };
            if c.owner.is_empty() {
                format!("{} ({description})", c.id)
            } else {
                format!("{} ({}: {description})", c.id, c.owner)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
