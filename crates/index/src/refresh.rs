use crate::{Index, IndexEntry};
use gixt_protocol::Gist;
use std::collections::BTreeMap;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub index: Index,
    /// Entries dropped because the gist no longer exists remotely.
    pub missing: usize,
}

/// Re-fetch every indexed gist one by one.
///
/// `fetch` returns `Ok(None)` for a gist that is gone; such entries are
/// dropped and counted. Any other error aborts the whole refresh.
pub async fn refresh_entries<F, Fut, E>(
    entries: &[IndexEntry],
    mut fetch: F,
) -> std::result::Result<RefreshOutcome, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<Option<Gist>, E>>,
{
    let mut fresh: BTreeMap<String, IndexEntry> = BTreeMap::new();
    let mut missing = 0;

    for entry in entries {
        log::debug!("refreshing gist {}", entry.id);
        match fetch(entry.id.clone()).await? {
            Some(gist) => {
                let refreshed = IndexEntry::from_gist(&gist);
                fresh.insert(refreshed.id.clone(), refreshed);
            }
            None => {
                log::warn!("gist {} no longer exists; dropping it from the index", entry.id);
                missing += 1;
            }
        }
    }

    Ok(RefreshOutcome {
        index: Index::new(fresh.into_values().collect()),
        missing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gixt_protocol::GistOwner;
    use pretty_assertions::assert_eq;

    fn entry(id: &str) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            ..IndexEntry::default()
        }
    }

    fn gist(id: &str, description: &str) -> Gist {
        Gist {
            id: id.to_string(),
            description: description.to_string(),
            owner: Some(GistOwner {
                login: "alice".to_string(),
            }),
            ..Gist::default()
        }
    }

    #[tokio::test]
    async fn missing_gists_are_skipped_and_counted() {
        let entries = vec![entry("a1"), entry("gone"), entry("b2")];
        let outcome = refresh_entries(&entries, |id| async move {
            if id == "gone" {
                Ok::<_, String>(None)
            } else {
                Ok(Some(gist(&id, &format!("desc {id}"))))
            }
        })
        .await
        .unwrap();

        assert_eq!(outcome.missing, 1);
        let ids: Vec<&str> = outcome.index.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
        assert_eq!(outcome.index.entries[0].owner, "alice");
    }

    #[tokio::test]
    async fn other_errors_abort_the_batch() {
        let entries = vec![entry("a1"), entry("boom"), entry("never")];
        let mut seen = Vec::new();
        let err = refresh_entries(&entries, |id| {
            seen.push(id.clone());
            async move {
                if id == "boom" {
                    Err("network down".to_string())
                } else {
                    Ok(Some(gist(&id, "")))
                }
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err, "network down");
        assert_eq!(seen, vec!["a1", "boom"]);
    }

    #[tokio::test]
    async fn duplicate_ids_collapse_to_one_entry() {
        let entries = vec![entry("a1"), entry("a1")];
        let outcome = refresh_entries(&entries, |id| async move {
            Ok::<_, String>(Some(gist(&id, "same")))
        })
        .await
        .unwrap();
        assert_eq!(outcome.index.entries.len(), 1);
    }
}
