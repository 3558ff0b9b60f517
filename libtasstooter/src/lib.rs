//! tasstooter - organize toots and toot them later
//!
//! Keeps an archive of pre-written toots, publishes them one at a time
//! without repeating a source twice in a row, and answers replies that ask
//! where a toot came from.

pub mod archive;
pub mod config;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod normalize;
pub mod platforms;
pub mod service;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use archive::{ArchiveStats, PostArchive};
pub use config::Config;
pub use error::{Result, TootError};
pub use ledger::{Disclosure, MarkOutcome, PublicationLedger};
pub use store::Store;
pub use types::{NotificationEvent, NotificationKind, Post, PublicationRecord, Source};
