//! Mock publisher for testing
//!
//! Records every status and reply it is asked to publish and hands out
//! sequential ids, so tests can check exactly what would have gone out
//! without credentials or network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{PlatformError, Result};
use crate::platforms::Publisher;

/// Configuration for mock publisher behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// Whether publishing new statuses should succeed
    pub publish_succeeds: bool,

    /// Whether replies should succeed
    pub reply_succeeds: bool,

    /// Error message used for either failure
    pub error: Option<String>,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            publish_succeeds: true,
            reply_succeeds: true,
            error: None,
            delay: Duration::from_millis(0),
        }
    }
}

/// A reply the mock was asked to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub in_reply_to_id: String,
    pub text: String,
    pub id: String,
}

pub struct MockPublisher {
    config: MockConfig,
    next_id: AtomicU64,
    published: Arc<Mutex<Vec<(String, String)>>>,
    replies: Arc<Mutex<Vec<SentReply>>>,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            published: Arc::new(Mutex::new(Vec::new())),
            replies: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock publisher that always succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Create a mock publisher whose new statuses fail
    pub fn publish_failure(error: &str) -> Self {
        Self::new(MockConfig {
            publish_succeeds: false,
            error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock publisher whose replies fail
    pub fn reply_failure(error: &str) -> Self {
        Self::new(MockConfig {
            reply_succeeds: false,
            error: Some(error.to_string()),
            ..Default::default()
        })
    }

    /// Statuses published so far, as `(id, text)`
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    pub fn replies(&self) -> Vec<SentReply> {
        self.replies.lock().unwrap().clone()
    }

    fn issue_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }

    async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }
    }

    fn failure(&self, default: &str) -> PlatformError {
        PlatformError::Posting(
            self.config
                .error
                .clone()
                .unwrap_or_else(|| default.to_string()),
        )
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, text: &str) -> Result<String> {
        self.simulate_latency().await;

        if !self.config.publish_succeeds {
            return Err(self.failure("Mock publishing failed").into());
        }

        let id = self.issue_id();
        self.published
            .lock()
            .unwrap()
            .push((id.clone(), text.to_string()));
        Ok(id)
    }

    async fn reply_to(&self, in_reply_to_id: &str, text: &str) -> Result<String> {
        self.simulate_latency().await;

        if !self.config.reply_succeeds {
            return Err(self.failure("Mock reply failed").into());
        }

        let id = self.issue_id();
        self.replies.lock().unwrap().push(SentReply {
            in_reply_to_id: in_reply_to_id.to_string(),
            text: text.to_string(),
            id: id.clone(),
        });
        Ok(id)
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let publisher = MockPublisher::success();
        assert_eq!(publisher.name(), "mock");

        let first = publisher.publish("hello").await.unwrap();
        let reply = publisher.reply_to(&first, "@someone hi").await.unwrap();
        assert_ne!(first, reply);

        assert_eq!(publisher.published(), vec![(first.clone(), "hello".to_string())]);
        let replies = publisher.replies();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].in_reply_to_id, first);
        assert_eq!(replies[0].text, "@someone hi");
    }

    #[tokio::test]
    async fn test_mock_publish_failure() {
        let publisher = MockPublisher::publish_failure("instance down");

        let err = publisher.publish("hello").await.unwrap_err();
        assert!(err.to_string().contains("instance down"));
        assert!(publisher.published().is_empty());

        // Replies still work
        assert!(publisher.reply_to("1", "hi").await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_reply_failure() {
        let publisher = MockPublisher::reply_failure("rate limited");

        let err = publisher.reply_to("1", "hi").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert!(publisher.replies().is_empty());
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let publisher = MockPublisher::new(MockConfig {
            delay: Duration::from_millis(50),
            ..Default::default()
        });

        let start = std::time::Instant::now();
        publisher.publish("Test").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
