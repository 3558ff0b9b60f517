//! Service layer for tasstooter
//!
//! `TootService` opens the store once and hands out the pieces built on top
//! of it:
//!
//! - `PostArchive`: the queue of toots
//! - `PublicationLedger`: sources of toots that went out
//! - `PostingService`: fetch-and-publish of a single toot
//! - `ReplyMatcher`: answers replies asking for a source
//!
//! # Example
//!
//! ```no_run
//! use libtasstooter::platforms::mock::MockPublisher;
//! use libtasstooter::service::TootService;
//!
//! # async fn example() -> libtasstooter::Result<()> {
//! let service = TootService::new().await?;
//!
//! service.archive().add("Hello fediverse", Some("https://example.com")).await?;
//! let outcome = service.posting().publish_next(&MockPublisher::success()).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

pub mod posting;
pub mod replies;

use self::posting::PostingService;
use self::replies::ReplyMatcher;
use crate::archive::PostArchive;
use crate::ledger::PublicationLedger;
use crate::store::Store;
use crate::{Config, Result};

pub struct TootService {
    store: Store,
    config: Config,
    archive: PostArchive,
    ledger: PublicationLedger,
    posting: PostingService,
    replies: ReplyMatcher,
}

impl TootService {
    /// Create a service from the default configuration file
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(config).await
    }

    /// Create a service with a custom configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or migrated.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = Store::open(&config.database.path).await?;
        Ok(Self::with_store(store, config))
    }

    /// Build a service on an already opened store
    pub fn with_store(store: Store, config: Config) -> Self {
        let archive = PostArchive::new(store.clone());
        let ledger = PublicationLedger::new(store.clone());
        let posting = PostingService::new(archive.clone(), ledger.clone());
        let replies = ReplyMatcher::new(ledger.clone(), config.replies.keyword.clone());

        Self {
            store,
            config,
            archive,
            ledger,
            posting,
            replies,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn archive(&self) -> &PostArchive {
        &self.archive
    }

    pub fn ledger(&self) -> &PublicationLedger {
        &self.ledger
    }

    pub fn posting(&self) -> &PostingService {
        &self.posting
    }

    pub fn replies(&self) -> &ReplyMatcher {
        &self.replies
    }

    /// Checkpoint the store and close it
    pub async fn shutdown(&self) -> Result<()> {
        self.store.flush().await?;
        self.store.close().await;
        Ok(())
    }
}
