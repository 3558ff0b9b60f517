//! Reply listener: answers "what's the source?" replies exactly once
//!
//! Every notification ends in one of three outcomes:
//!
//! - `Ignored`: not a mention, malformed, no keyword, or a status the
//!   ledger never heard of
//! - `Disclosed`: the source was sent as a reply and the ledger entry flagged
//! - `DisclosureSkipped`: the source for that status was already sent
//!
//! The ledger record is checked under the ledger lock, the reply goes out,
//! and the record is flagged before the lock is released. Listeners sharing
//! one database therefore answer each status at most once. A crash between
//! the reply and the flag can still cause one repeated answer after restart.

use std::future::Future;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::ledger::{Disclosure, PublicationLedger};
use crate::normalize::mentions_keyword;
use crate::platforms::{NotificationSource, Publisher};
use crate::types::{NotificationEvent, NotificationKind, Source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAMention(NotificationKind),
    /// Mention without a status, or a status that is not a reply
    Malformed,
    NoKeyword,
    /// The replied-to status is not in the ledger
    UnknownPost(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Ignored(IgnoreReason),
    Disclosed {
        external_id: String,
        reply_id: String,
    },
    DisclosureSkipped {
        external_id: String,
    },
}

/// Counts of outcomes over one listener run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenSummary {
    pub disclosed: usize,
    pub skipped: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl ListenSummary {
    fn record(&mut self, outcome: &ReplyOutcome) {
        match outcome {
            ReplyOutcome::Ignored(_) => self.ignored += 1,
            ReplyOutcome::Disclosed { .. } => self.disclosed += 1,
            ReplyOutcome::DisclosureSkipped { .. } => self.skipped += 1,
        }
    }
}

#[derive(Clone)]
pub struct ReplyMatcher {
    ledger: PublicationLedger,
    keyword: String,
}

impl ReplyMatcher {
    pub fn new(ledger: PublicationLedger, keyword: impl Into<String>) -> Self {
        Self {
            ledger,
            keyword: keyword.into(),
        }
    }

    /// Classify one notification and, if it asks for an undisclosed source,
    /// answer it.
    ///
    /// Errors from the publisher or the store are returned; the caller
    /// decides whether to keep going.
    pub async fn handle(
        &self,
        event: &NotificationEvent,
        publisher: &dyn Publisher,
    ) -> Result<ReplyOutcome> {
        if event.kind != NotificationKind::Mention {
            info!(kind = %event.kind, "Ignoring notification");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::NotAMention(event.kind)));
        }

        let Some((reply, in_reply_to_id)) = event
            .reply
            .as_ref()
            .and_then(|r| r.in_reply_to_id.as_deref().map(|id| (r, id)))
        else {
            warn!("Skipping mention without a replied-to status");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::Malformed));
        };

        if !mentions_keyword(&reply.text, &self.keyword) {
            debug!(actor = %reply.actor, "Mention does not ask for the source");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::NoKeyword));
        }

        let pending = match self.ledger.begin_disclosure(in_reply_to_id).await? {
            Disclosure::Unknown => {
                info!(
                    in_reply_to_id = %in_reply_to_id,
                    "Source requested for a status that is not in the ledger"
                );
                return Ok(ReplyOutcome::Ignored(IgnoreReason::UnknownPost(
                    in_reply_to_id.to_string(),
                )));
            }
            Disclosure::AlreadyDisclosed => {
                info!(
                    in_reply_to_id = %in_reply_to_id,
                    actor = %reply.actor,
                    "Source already disclosed, not answering again"
                );
                return Ok(ReplyOutcome::DisclosureSkipped {
                    external_id: in_reply_to_id.to_string(),
                });
            }
            Disclosure::Pending(pending) => pending,
        };

        // A failed reply drops the claim and leaves the record unused
        let text = compose_reply(&reply.actor, pending.source());
        let reply_id = publisher.reply_to(in_reply_to_id, &text).await?;
        pending.complete().await?;

        info!(
            in_reply_to_id = %in_reply_to_id,
            actor = %reply.actor,
            reply_id = %reply_id,
            "Disclosed source"
        );
        Ok(ReplyOutcome::Disclosed {
            external_id: in_reply_to_id.to_string(),
            reply_id,
        })
    }

    /// Handle notifications one at a time until the source is exhausted or
    /// `shutdown` resolves.
    ///
    /// Shutdown is only observed while waiting for the next notification, so
    /// a notification being handled always finishes. Store failures end the
    /// loop with an error; everything else is logged and skipped.
    pub async fn run<S, F>(
        &self,
        source: &mut S,
        publisher: &dyn Publisher,
        shutdown: F,
    ) -> Result<ListenSummary>
    where
        S: NotificationSource + ?Sized,
        F: Future<Output = ()>,
    {
        let mut summary = ListenSummary::default();
        tokio::pin!(shutdown);

        info!(keyword = %self.keyword, "Listening for replies");

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping reply listener");
                    break;
                }
                next = source.next_event() => next,
            };

            let event = match next {
                Ok(Some(event)) => event,
                Ok(None) => {
                    info!("Notification source closed");
                    break;
                }
                Err(e) if e.is_storage() => return Err(e),
                Err(e) => {
                    warn!("Failed to receive notifications: {}", e);
                    continue;
                }
            };

            match self.handle(&event, publisher).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) if e.is_storage() => {
                    error!("Store failure, stopping reply listener: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Failed to handle notification: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

fn compose_reply(actor: &str, source: &Source) -> String {
    match source {
        Source::Url(url) => format!("@{} {}", actor, url),
        Source::None => format!("@{} this toot has no recorded source", actor),
    }
}
