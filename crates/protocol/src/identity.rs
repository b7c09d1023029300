use once_cell::sync::Lazy;
use regex::Regex;

static GIST_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"gist\.github\.com/[^/]+/([a-fA-F0-9]+)").expect("valid gist url regex")
});

static GENERIC_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^/?#]+([^?#]*)").expect("valid url regex")
});

/// Resolved gist reference handed from the resolver to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistIdentity {
    pub id: String,
    /// Owner login known at resolution time (index or live listing).
    pub owner_hint: Option<String>,
    pub from_index: bool,
}

impl GistIdentity {
    pub fn direct(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_hint: None,
            from_index: false,
        }
    }
}

/// Pull a candidate gist id out of a URL or bare token.
///
/// Gist URLs yield the hex path segment. Any other URL yields its last
/// path segment. Everything else is returned trimmed.
pub fn extract_id(input: &str) -> String {
    if let Some(caps) = GIST_URL_RE.captures(input) {
        return caps[1].to_string();
    }

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    if let Some(caps) = GENERIC_URL_RE.captures(trimmed) {
        let path = caps.get(1).map_or("", |m| m.as_str());
        if let Some(last) = path.trim_matches('/').rsplit('/').next() {
            if !last.is_empty() {
                return last.to_string();
            }
        }
    }

    trimmed.to_string()
}

/// Gist ids are hex strings; anything shorter than 8 chars is treated as a name.
pub fn is_likely_gist_id(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    trimmed.len() >= 8 && trimmed.chars().all(|c| c.is_ascii_hexdigit())
}
