//! Core types for tasstooter

use serde::{Deserialize, Serialize};

/// Persisted sentinel meaning "this toot has no source".
pub const NO_SOURCE: &str = "0";

/// Where a toot's content came from.
///
/// Stored as a plain string; the empty string and `"0"` both read back as
/// [`Source::None`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Source {
    #[default]
    None,
    Url(String),
}

impl Source {
    /// Normalize an optional user-supplied source.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(NO_SOURCE) => Source::None,
            Some(url) => Source::Url(url.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Source::None => NO_SOURCE,
            Source::Url(url) => url,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Source::None)
    }
}

impl From<String> for Source {
    fn from(raw: String) -> Self {
        Source::parse(Some(&raw))
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        match source {
            Source::None => NO_SOURCE.to_string(),
            Source::Url(url) => url,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A toot waiting in (or already drawn from) the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub source: Source,
    pub used: bool,
}

/// Ledger entry for a toot that has actually been published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub source: Source,
    #[serde(default)]
    pub used: bool,
}

impl PublicationRecord {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            used: false,
        }
    }
}

/// Notification categories the reply listener distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Mention,
    Reblog,
    Favourite,
    Follow,
    Other,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationKind::Mention => "mention",
            NotificationKind::Reblog => "reblog",
            NotificationKind::Favourite => "favourite",
            NotificationKind::Follow => "follow",
            NotificationKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// The status attached to a mention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Account handle of the author, without the leading `@`
    pub actor: String,
    /// Raw status content as delivered by the server (HTML)
    pub text: String,
    /// Identifier of the status being replied to, if any
    pub in_reply_to_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub reply: Option<Reply>,
}

impl NotificationEvent {
    /// Build a mention event replying to `in_reply_to_id`.
    pub fn mention(actor: &str, text: &str, in_reply_to_id: &str) -> Self {
        Self {
            kind: NotificationKind::Mention,
            reply: Some(Reply {
                actor: actor.to_string(),
                text: text.to_string(),
                in_reply_to_id: Some(in_reply_to_id.to_string()),
            }),
        }
    }

    pub fn other(kind: NotificationKind) -> Self {
        Self { kind, reply: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse_normalizes_sentinel() {
        assert_eq!(Source::parse(None), Source::None);
        assert_eq!(Source::parse(Some("")), Source::None);
        assert_eq!(Source::parse(Some("0")), Source::None);
        assert_eq!(Source::parse(Some("  ")), Source::None);
        assert_eq!(
            Source::parse(Some("http://x")),
            Source::Url("http://x".to_string())
        );
    }

    #[test]
    fn test_source_serializes_as_string() {
        let json = serde_json::to_string(&Source::None).unwrap();
        assert_eq!(json, "\"0\"");

        let json = serde_json::to_string(&Source::Url("http://y".to_string())).unwrap();
        assert_eq!(json, "\"http://y\"");

        let back: Source = serde_json::from_str("\"0\"").unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn test_publication_record_defaults_unused() {
        let record: PublicationRecord = serde_json::from_str(r#"{"source":"http://y"}"#).unwrap();
        assert!(!record.used);
        assert_eq!(record.source.as_str(), "http://y");
    }
}
