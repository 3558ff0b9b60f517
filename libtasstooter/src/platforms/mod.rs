//! Platform abstraction and implementations
//!
//! The archive and the reply listener never talk to a server directly. They
//! go through two seams:
//!
//! - [`Publisher`] puts statuses (and replies) on the network
//! - [`NotificationSource`] hands over inbound notifications one at a time
//!
//! [`mastodon::MastodonClient`] implements both against a real instance;
//! [`mock::MockPublisher`] and [`ChannelSource`] stand in for them in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libtasstooter::platforms::{Publisher, mastodon::MastodonClient};
//!
//! # async fn example() -> libtasstooter::Result<()> {
//! let client = MastodonClient::new(
//!     "https://botsin.space".to_string(),
//!     "your-access-token".to_string(),
//! )?;
//!
//! let id = client.publish("Hello from the archive").await?;
//! println!("Published as {}", id);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::NotificationEvent;

pub mod mastodon;

// Available for all builds (not just tests) to support integration tests
pub mod mock;

/// Publishes statuses to the remote network.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text` as a new status and return the id the server assigned.
    async fn publish(&self, text: &str) -> Result<String>;

    /// Publish `text` as a reply to the status `in_reply_to_id`.
    async fn reply_to(&self, in_reply_to_id: &str, text: &str) -> Result<String>;

    /// Lowercase platform identifier used in logs
    fn name(&self) -> &str;
}

/// Blocking source of inbound notifications.
#[async_trait]
pub trait NotificationSource: Send {
    /// Wait for the next notification.
    ///
    /// Returns `Ok(None)` once the source is exhausted and will never yield
    /// again.
    async fn next_event(&mut self) -> Result<Option<NotificationEvent>>;
}

/// Notification source fed through a tokio channel.
pub struct ChannelSource {
    receiver: mpsc::Receiver<NotificationEvent>,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<NotificationEvent>) -> Self {
        Self { receiver }
    }

    /// Create a source together with the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<NotificationEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self::new(receiver))
    }
}

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn next_event(&mut self) -> Result<Option<NotificationEvent>> {
        Ok(self.receiver.recv().await)
    }
}
