//! Plain-text normalization of reply content
//!
//! Only used to decide whether a reply asks for a source. The output is
//! never shown to anyone.

/// Paragraph tags wrapping every status body.
const BLOCK_TAGS: [&str; 2] = ["<p>", "</p>"];

const ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // Last, so "&amp;lt;" becomes "&lt;" and not "<"
    ("&amp;", "&"),
];

/// Tokens containing any of these are mentions or leftover markup.
const DISALLOWED: [char; 6] = ['@', '<', '>', '=', '"', '/'];

/// Reduce status HTML to lowercase words separated by single spaces.
pub fn normalize(markup: &str) -> String {
    let mut text = markup.to_string();

    for tag in BLOCK_TAGS {
        text = text.replace(tag, " ");
    }
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }

    text.to_lowercase()
        .split_whitespace()
        .filter(|token| !token.contains(&DISALLOWED[..]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `markup`, once normalized, contains `keyword`.
pub fn mentions_keyword(markup: &str, keyword: &str) -> bool {
    normalize(markup).contains(&keyword.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_paragraphs_and_lowercases() {
        assert_eq!(normalize("<p>What&#39;s the SOURCE?</p>"), "what's the source?");
    }

    #[test]
    fn test_paragraph_boundaries_split_words() {
        assert_eq!(normalize("<p>one</p><p>two</p>"), "one two");
    }

    #[test]
    fn test_drops_mentions_and_markup() {
        let html = r#"<p><span class="h-card"><a href="https://botsin.space/@tass" class="u-url mention">@<span>tass</span></a></span> source please</p>"#;
        assert_eq!(normalize(html), "source please");
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(normalize("fish &amp; chips"), "fish & chips");
        assert_eq!(normalize("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
        assert_eq!(normalize("say &quot;hi&quot;"), "say");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  a \n\t b  "), "a b");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_mentions_keyword() {
        assert!(mentions_keyword("<p>what's the source?</p>", "source"));
        assert!(mentions_keyword("<p>Sources?</p>", "Source"));
        assert!(!mentions_keyword("<p>lol</p>", "source"));
        // Inside a link only
        assert!(!mentions_keyword(
            r#"<p><a href="https://example.com/source">link</a></p>"#,
            "source"
        ));
    }
}
