//! Mastodon platform implementation
//!
//! Publishes toots and replies through the megalodon library and polls the
//! notifications endpoint for mentions. Works with Mastodon and other
//! Fediverse servers that implement the Mastodon API.

use async_trait::async_trait;
use megalodon::entities::notification::NotificationType;
use megalodon::megalodon::{GetNotificationsInputOptions, PostStatusInputOptions, PostStatusOutput};
use megalodon::{Megalodon, SNS};
use secrecy::{ExposeSecret, SecretString};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::MastodonConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{NotificationSource, Publisher};
use crate::types::{NotificationEvent, NotificationKind, Reply};

/// Mastodon platform client
#[derive(Clone)]
pub struct MastodonClient {
    client: Arc<dyn Megalodon + Send + Sync>,

    /// The instance URL (e.g., "https://botsin.space")
    instance_url: String,
}

impl MastodonClient {
    /// Create a new Mastodon client
    ///
    /// # Arguments
    ///
    /// * `instance_url` - The base URL of the instance (e.g., "https://botsin.space")
    /// * `access_token` - OAuth access token for authentication
    pub fn new(instance_url: String, access_token: String) -> Result<Self> {
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token),
            None,
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        Ok(Self {
            client: Arc::from(client),
            instance_url,
        })
    }

    /// Create a Mastodon client from configuration
    ///
    /// Reads the access token from the configured token file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The token file cannot be read
    /// - The token file is empty
    pub fn from_config(config: &MastodonConfig) -> Result<Self> {
        let token_path = shellexpand::full(&config.token_file).map_err(|e| {
            PlatformError::Authentication(format!("Failed to expand token file path: {}", e))
        })?;

        let token = std::fs::read_to_string(token_path.as_ref()).map_err(|e| {
            PlatformError::Authentication(format!("Failed to read Mastodon token file: {}", e))
        })?;
        let token = SecretString::from(token.trim().to_string());

        if token.expose_secret().is_empty() {
            return Err(
                PlatformError::Authentication("Mastodon token file is empty".to_string()).into(),
            );
        }

        Self::new(normalize_instance_url(&config.instance), token.expose_secret().to_string())
    }

    /// Poll this account's notifications every `poll_interval`.
    pub fn notifications(&self, poll_interval: Duration) -> MastodonNotifications {
        debug!(instance = %self.instance_url, ?poll_interval, "Watching notifications");
        MastodonNotifications {
            client: Arc::clone(&self.client),
            poll_interval,
            cursor: None,
            pending: VecDeque::new(),
            polled: false,
        }
    }

    async fn post_status(
        &self,
        text: &str,
        options: Option<&PostStatusInputOptions>,
        context: &str,
    ) -> Result<String> {
        if text.trim().is_empty() {
            return Err(PlatformError::Validation("Content cannot be empty".to_string()).into());
        }

        let response = self
            .client
            .post_status(text.to_string(), options)
            .await
            .map_err(|e| map_megalodon_error(e, context))?;

        let id = match response.json {
            PostStatusOutput::Status(status) => status.id,
            PostStatusOutput::ScheduledStatus(scheduled) => scheduled.id,
        };

        Ok(id)
    }
}

#[async_trait]
impl Publisher for MastodonClient {
    async fn publish(&self, text: &str) -> Result<String> {
        self.post_status(text, None, "post status").await
    }

    async fn reply_to(&self, in_reply_to_id: &str, text: &str) -> Result<String> {
        let options = PostStatusInputOptions {
            in_reply_to_id: Some(in_reply_to_id.to_string()),
            ..Default::default()
        };
        self.post_status(text, Some(&options), "post reply").await
    }

    fn name(&self) -> &str {
        "mastodon"
    }
}

/// Largest page the Mastodon notifications endpoint hands out.
const PAGE_LIMIT: u32 = 40;

/// Polling notification source for one Mastodon account.
///
/// The first poll starts from the most recent page. Later polls walk
/// forward from the newest notification seen, page by page, so a burst
/// larger than one page between polls is still delivered in full.
pub struct MastodonNotifications {
    client: Arc<dyn Megalodon + Send + Sync>,
    poll_interval: Duration,
    /// Newest notification seen so far
    cursor: Option<String>,
    pending: VecDeque<NotificationEvent>,
    polled: bool,
}

impl MastodonNotifications {
    async fn poll(&mut self) -> Result<()> {
        loop {
            let options = page_options(self.cursor.as_deref());
            let response = self
                .client
                .get_notifications(Some(&options))
                .await
                .map_err(|e| map_megalodon_error(e, "get notifications"))?;

            let page = response.json;
            let count = page.len();
            debug!(count, cursor = ?self.cursor, "Polled notifications");

            // Newest first within a page; queue oldest first
            if let Some(newest) = page.first() {
                self.cursor = Some(newest.id.clone());
            }
            for notification in page.into_iter().rev() {
                let reply = notification.status.map(|status| Reply {
                    actor: status.account.acct,
                    text: status.content,
                    in_reply_to_id: status.in_reply_to_id,
                });
                self.pending.push_back(NotificationEvent {
                    kind: map_notification_type(&notification.r#type),
                    reply,
                });
            }

            if options.min_id.is_none() || count < PAGE_LIMIT as usize {
                return Ok(());
            }
        }
    }
}

fn page_options(cursor: Option<&str>) -> GetNotificationsInputOptions {
    GetNotificationsInputOptions {
        limit: Some(PAGE_LIMIT),
        min_id: cursor.map(str::to_string),
        ..Default::default()
    }
}

#[async_trait]
impl NotificationSource for MastodonNotifications {
    async fn next_event(&mut self) -> Result<Option<NotificationEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            if self.polled {
                tokio::time::sleep(self.poll_interval).await;
            }
            self.polled = true;
            self.poll().await?;
        }
    }
}

fn map_notification_type(kind: &NotificationType) -> NotificationKind {
    match kind {
        NotificationType::Mention => NotificationKind::Mention,
        NotificationType::Reblog => NotificationKind::Reblog,
        NotificationType::Favourite => NotificationKind::Favourite,
        NotificationType::Follow => NotificationKind::Follow,
        _ => NotificationKind::Other,
    }
}

/// Ensure instance URL has an http(s):// prefix
fn normalize_instance_url(instance: &str) -> String {
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_string()
    } else {
        format!("https://{}", instance)
    }
}

/// Map megalodon errors to PlatformError
///
/// - HTTP 401/403 → `PlatformError::Authentication`
/// - HTTP 422 → `PlatformError::Validation`
/// - HTTP 429 → `PlatformError::RateLimit`
/// - anything else → `PlatformError::Network`
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    let error_str = error.to_string();
    let error_lower = error_str.to_lowercase();

    match extract_http_status(&error_str) {
        Some(401) | Some(403) => PlatformError::Authentication(format!(
            "Mastodon authentication failed ({}): {}. \
                Suggestion: Verify your access token is valid and has not expired.",
            context, error_str
        )),
        Some(422) => PlatformError::Validation(format!(
            "Mastodon validation failed ({}): {}",
            context, error_str
        )),
        Some(429) => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}. \
                Suggestion: Wait a few minutes before retrying.",
            context, error_str
        )),
        Some(_) => {
            PlatformError::Network(format!("Mastodon HTTP error ({}): {}", context, error_str))
        }
        None if error_lower.contains("unauthorized") || error_lower.contains("forbidden") => {
            PlatformError::Authentication(format!(
                "Mastodon authentication failed ({}): {}",
                context, error_str
            ))
        }
        None if error_lower.contains("rate limit") || error_lower.contains("too many requests") => {
            PlatformError::RateLimit(format!(
                "Mastodon rate limit exceeded ({}): {}",
                context, error_str
            ))
        }
        None => PlatformError::Network(format!(
            "Mastodon error ({}): {}. \
                Suggestion: Check your network connection and instance availability.",
            context, error_str
        )),
    }
}

/// Extract an HTTP status code from an error message like "HTTP 401" or "status 429".
fn extract_http_status(error_str: &str) -> Option<u16> {
    let prefixes = ["HTTP ", "status ", "code: ", "status_code: "];

    for prefix in &prefixes {
        if let Some(pos) = error_str.find(prefix) {
            let after_prefix = &error_str[pos + prefix.len()..];
            if let Some(code) = after_prefix.get(0..3).and_then(|s| s.parse::<u16>().ok()) {
                if (100..=599).contains(&code) {
                    return Some(code);
                }
            }
        }
    }

    None
}
