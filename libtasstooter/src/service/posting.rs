//! Posting service: draw one toot from the archive and publish it

use tracing::{info, warn};

use crate::archive::PostArchive;
use crate::error::Result;
use crate::ledger::PublicationLedger;
use crate::platforms::Publisher;
use crate::types::Post;

/// Result of [`PostingService::publish_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { post: Post, external_id: String },
    /// Nothing eligible in the archive right now
    NothingToPublish,
}

#[derive(Clone)]
pub struct PostingService {
    archive: PostArchive,
    ledger: PublicationLedger,
}

impl PostingService {
    pub fn new(archive: PostArchive, ledger: PublicationLedger) -> Self {
        Self { archive, ledger }
    }

    /// Fetch the next eligible toot, publish it, and record its source.
    ///
    /// The toot is marked used before it is handed to the publisher. If
    /// publishing fails it stays used and the error is returned; nothing is
    /// retried.
    pub async fn publish_next(&self, publisher: &dyn Publisher) -> Result<PublishOutcome> {
        let Some(post) = self.archive.fetch_next().await? else {
            info!("No toots in the archive eligible for publishing");
            return Ok(PublishOutcome::NothingToPublish);
        };

        info!(id = %post.id, platform = publisher.name(), "Tooting: {}", post.text);

        let external_id = match publisher.publish(&post.text).await {
            Ok(id) => id,
            Err(e) => {
                warn!(id = %post.id, "Publishing failed, toot stays marked as used: {}", e);
                return Err(e);
            }
        };

        self.ledger.record(&external_id, &post.source).await?;
        info!(id = %post.id, external_id = %external_id, "Published toot");

        Ok(PublishOutcome::Published { post, external_id })
    }
}
