use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A single file entry as returned by the gist API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub filename: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
}

impl GistFile {
    pub fn inline(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            size: content.len() as u64,
            content,
            ..Self::default()
        }
    }

    /// Inline content is usable when present and not cut short by the API.
    pub fn has_inline_content(&self) -> bool {
        !self.content.is_empty() && !self.truncated
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistOwner {
    #[serde(default, deserialize_with = "null_as_default")]
    pub login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default)]
    pub committed_at: Option<String>,
}

/// Full gist document (`GET /gists/{id}[/{sha}]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub owner: Option<GistOwner>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub html_url: String,
}

impl Gist {
    /// Revision of the newest history entry, if the API reported one.
    pub fn latest_version(&self) -> Option<&str> {
        self.history
            .first()
            .map(|entry| entry.version.trim())
            .filter(|version| !version.is_empty())
    }

    pub fn owner_login(&self) -> Option<&str> {
        owner_login(self.owner.as_ref())
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// Gist as it appears in list endpoints: no history, file content usually omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistSummary {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub owner: Option<GistOwner>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
}

impl GistSummary {
    pub fn owner_login(&self) -> Option<&str> {
        owner_login(self.owner.as_ref())
    }

    pub fn filenames(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

fn owner_login(owner: Option<&GistOwner>) -> Option<&str> {
    owner
        .map(|owner| owner.login.trim())
        .filter(|login| !login.is_empty())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_api_payload_with_nulls() {
        let raw = r#"{
            "id": "aa5a315d61ae9438b18d",
            "description": null,
            "html_url": "https://gist.github.com/aa5a315d61ae9438b18d",
            "files": {
                "hello.sh": {
                    "filename": "hello.sh",
                    "language": null,
                    "raw_url": "https://gist.githubusercontent.com/raw/hello.sh",
                    "size": 12,
                    "truncated": false,
                    "content": "echo hello\n"
                }
            },
            "owner": {"login": "octocat"},
            "history": [{"version": "57a7f021a713b1c5a6a199b54cc514735d2d462f", "committed_at": "2010-04-14T02:15:15Z"}],
            "updated_at": "2011-06-20T11:34:15Z"
        }"#;
        let gist: Gist = serde_json::from_str(raw).unwrap();
        assert_eq!(gist.description, "");
        assert_eq!(gist.owner_login(), Some("octocat"));
        assert_eq!(
            gist.latest_version(),
            Some("57a7f021a713b1c5a6a199b54cc514735d2d462f")
        );
        assert!(gist.files["hello.sh"].has_inline_content());
    }

    #[test]
    fn anonymous_gist_has_no_owner_and_no_version() {
        let gist: Gist = serde_json::from_str(r#"{"id":"abc","owner":null}"#).unwrap();
        assert_eq!(gist.owner_login(), None);
        assert_eq!(gist.latest_version(), None);
    }

    #[test]
    fn truncated_files_are_not_inline() {
        let mut file = GistFile::inline("partial");
        file.truncated = true;
        assert!(!file.has_inline_content());
        assert!(!GistFile::default().has_inline_content());
    }
}
