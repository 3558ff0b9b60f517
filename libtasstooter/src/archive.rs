//! Toot archive: the queue of pre-written toots
//!
//! Toots are drawn at random, but never two in a row from the same source.

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TootError};
use crate::store::Store;
use crate::types::{Post, Source};

/// Collection holding toots and the last-published-source marker.
pub const ARCHIVE_COLLECTION: &str = "archive";

/// Reserved key of the record remembering the last published source.
pub const LAST_TOOT_KEY: &str = "LASTTOOT";

const ID_LENGTH: usize = 12;

/// On-disk shape of a toot. The id is the record key.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TootEntry {
    toot: String,
    #[serde(default)]
    source: Source,
    #[serde(default)]
    used: bool,
}

impl TootEntry {
    fn into_post(self, id: String) -> Post {
        Post {
            id,
            text: self.toot,
            source: self.source,
            used: self.used,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LastToot {
    #[serde(default)]
    source: Source,
}

/// Any record found in the archive collection.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArchiveRecord {
    Toot(TootEntry),
    Last(LastToot),
}

/// Snapshot of the archive, as shown by `tasstooter status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    pub total: usize,
    pub unused: usize,
    /// Unused toots that the next fetch could pick
    pub eligible: usize,
    /// `None` until the first toot has been fetched
    pub last_source: Option<Source>,
}

#[derive(Clone)]
pub struct PostArchive {
    store: Store,
}

impl PostArchive {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Add a toot, returning its id.
    ///
    /// An empty or `"0"` source is stored as "no source".
    pub async fn add(&self, text: &str, source: Option<&str>) -> Result<String> {
        let entry = new_entry(text, source)?;

        loop {
            let id = generate_id();
            if self
                .store
                .insert_new(ARCHIVE_COLLECTION, &id, &entry)
                .await?
            {
                debug!(id = %id, source = %entry.source, "Added toot to archive");
                return Ok(id);
            }
            debug!(id = %id, "Generated id already taken, retrying");
        }
    }

    /// Add one sourceless toot per non-blank line, all or nothing.
    ///
    /// Returns the number of toots inserted.
    pub async fn add_many<I, S>(&self, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: Vec<TootEntry> = lines
            .into_iter()
            .filter(|line| !line.as_ref().trim().is_empty())
            .map(|line| new_entry(line.as_ref(), None))
            .collect::<Result<_>>()?;

        let mut tx = self.store.transaction(ARCHIVE_COLLECTION).await?;
        for entry in &entries {
            while !tx.insert_new(&generate_id(), entry).await? {}
        }
        tx.commit().await?;

        info!("Inserted {} toots into the archive", entries.len());
        Ok(entries.len())
    }

    /// Draw the next toot to publish.
    ///
    /// Picks uniformly among unused toots whose source differs from the last
    /// published one, marks it used and remembers its source, all in one
    /// transaction. Before the first fetch every unused toot is eligible.
    /// Returns `None` when nothing is eligible, whether the archive is empty,
    /// exhausted, or only holds toots from the last source.
    pub async fn fetch_next(&self) -> Result<Option<Post>> {
        let mut tx = self.store.transaction(ARCHIVE_COLLECTION).await?;

        let (last_source, toots) = split_records(tx.list().await?);

        let eligible: Vec<&(String, TootEntry)> = toots
            .iter()
            .filter(|(_, entry)| is_eligible(entry, last_source.as_ref()))
            .collect();

        let picked = {
            let mut rng = rand::thread_rng();
            eligible.choose(&mut rng).map(|&pair| pair.clone())
        };

        let Some((id, mut entry)) = picked else {
            debug!(
                candidates = toots.len(),
                last_source = ?last_source,
                "No eligible toot in archive"
            );
            return Ok(None);
        };

        entry.used = true;
        tx.put(&id, &entry).await?;
        tx.put(
            LAST_TOOT_KEY,
            &LastToot {
                source: entry.source.clone(),
            },
        )
        .await?;
        tx.commit().await?;

        debug!(id = %id, source = %entry.source, "Fetched toot from archive");
        Ok(Some(entry.into_post(id)))
    }

    /// Look up a single toot by id.
    pub async fn get(&self, id: &str) -> Result<Option<Post>> {
        if id == LAST_TOOT_KEY {
            return Ok(None);
        }
        let entry: Option<TootEntry> = self.store.get(ARCHIVE_COLLECTION, id).await?;
        Ok(entry.map(|e| e.into_post(id.to_string())))
    }

    /// Source of the most recently fetched toot, `None` before the first fetch.
    pub async fn last_source(&self) -> Result<Option<Source>> {
        let last: Option<LastToot> = self.store.get(ARCHIVE_COLLECTION, LAST_TOOT_KEY).await?;
        Ok(last.map(|l| l.source))
    }

    pub async fn stats(&self) -> Result<ArchiveStats> {
        let (last_source, toots) = split_records(self.store.list(ARCHIVE_COLLECTION).await?);

        let unused: Vec<&TootEntry> = toots.iter().map(|(_, e)| e).filter(|e| !e.used).collect();
        let eligible = unused
            .iter()
            .filter(|e| is_eligible(e, last_source.as_ref()))
            .count();

        Ok(ArchiveStats {
            total: toots.len(),
            unused: unused.len(),
            eligible,
            last_source,
        })
    }
}

fn new_entry(text: &str, source: Option<&str>) -> Result<TootEntry> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TootError::InvalidInput("Toot text cannot be empty".to_string()));
    }

    Ok(TootEntry {
        toot: text.to_string(),
        source: Source::parse(source),
        used: false,
    })
}

fn is_eligible(entry: &TootEntry, last_source: Option<&Source>) -> bool {
    !entry.used && last_source != Some(&entry.source)
}

fn split_records(
    records: Vec<(String, ArchiveRecord)>,
) -> (Option<Source>, Vec<(String, TootEntry)>) {
    let mut last_source = None;
    let mut toots = Vec::with_capacity(records.len());

    for (key, record) in records {
        match record {
            ArchiveRecord::Last(last) if key == LAST_TOOT_KEY => last_source = Some(last.source),
            ArchiveRecord::Toot(entry) if key != LAST_TOOT_KEY => toots.push((key, entry)),
            _ => debug!(key = %key, "Skipping unexpected archive record"),
        }
    }

    (last_source, toots)
}

fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_archive() -> PostArchive {
        PostArchive::new(Store::open_in_memory().await.unwrap())
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id();
        assert_eq!(id.len(), ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_id());
    }

    #[tokio::test]
    async fn test_add_normalizes_source() {
        let archive = setup_archive().await;

        let a = archive.add("hello", Some("0")).await.unwrap();
        let b = archive.add("world", Some("http://x")).await.unwrap();
        let c = archive.add("again", None).await.unwrap();

        assert_eq!(archive.get(&a).await.unwrap().unwrap().source, Source::None);
        assert_eq!(
            archive.get(&b).await.unwrap().unwrap().source,
            Source::Url("http://x".to_string())
        );
        let c = archive.get(&c).await.unwrap().unwrap();
        assert_eq!(c.source, Source::None);
        assert!(!c.used);
    }

    #[tokio::test]
    async fn test_add_rejects_empty_text() {
        let archive = setup_archive().await;
        let result = archive.add("   ", None).await;
        assert!(matches!(result, Err(TootError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_many_skips_blank_lines() {
        let archive = setup_archive().await;
        let count = archive
            .add_many(["first toot", "", "  ", "second toot\n"])
            .await
            .unwrap();
        assert_eq!(count, 2);

        let stats = archive.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.unused, 2);
    }

    #[tokio::test]
    async fn test_fetch_from_empty_archive() {
        let archive = setup_archive().await;
        assert!(archive.fetch_next().await.unwrap().is_none());
        assert_eq!(archive.last_source().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_marks_used_and_records_source() {
        let archive = setup_archive().await;
        let id = archive.add("only one", Some("http://x")).await.unwrap();

        let post = archive.fetch_next().await.unwrap().unwrap();
        assert_eq!(post.id, id);
        assert!(post.used);
        assert_eq!(post.text, "only one");

        assert!(archive.get(&id).await.unwrap().unwrap().used);
        assert_eq!(
            archive.last_source().await.unwrap(),
            Some(Source::Url("http://x".to_string()))
        );

        // Exhausted
        assert!(archive.fetch_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sourceless_toots_alternate_with_sourced() {
        let archive = setup_archive().await;
        archive.add("no source here", None).await.unwrap();
        archive.add("nor here", Some("0")).await.unwrap();

        // Nothing fetched yet, so a sourceless toot may go first
        let first = archive.fetch_next().await.unwrap().unwrap();
        assert_eq!(first.source, Source::None);
        assert_eq!(archive.last_source().await.unwrap(), Some(Source::None));

        // ...but not twice in a row
        assert!(archive.fetch_next().await.unwrap().is_none());

        archive.add("sourced", Some("http://x")).await.unwrap();
        let second = archive.fetch_next().await.unwrap().unwrap();
        assert_eq!(second.text, "sourced");
        let third = archive.fetch_next().await.unwrap().unwrap();
        assert_eq!(third.source, Source::None);
    }

    #[tokio::test]
    async fn test_same_source_blocked_until_other_source_published() {
        let archive = setup_archive().await;
        archive.add("one", Some("http://a")).await.unwrap();
        archive.add("two", Some("http://a")).await.unwrap();

        let first = archive.fetch_next().await.unwrap().unwrap();
        assert_eq!(first.source.as_str(), "http://a");
        assert!(archive.fetch_next().await.unwrap().is_none());

        let stats = archive.stats().await.unwrap();
        assert_eq!(stats.unused, 1);
        assert_eq!(stats.eligible, 0);

        archive.add("three", Some("http://b")).await.unwrap();
        assert_eq!(
            archive.fetch_next().await.unwrap().unwrap().source.as_str(),
            "http://b"
        );
        assert_eq!(
            archive.fetch_next().await.unwrap().unwrap().source.as_str(),
            "http://a"
        );
    }

    #[tokio::test]
    async fn test_last_toot_key_is_not_a_post() {
        let archive = setup_archive().await;
        archive.add("x", Some("http://x")).await.unwrap();
        archive.fetch_next().await.unwrap();

        assert!(archive.get(LAST_TOOT_KEY).await.unwrap().is_none());
        assert_eq!(archive.stats().await.unwrap().total, 1);
    }
}
