//! Mention token syntax: `@[[<card id>|<display title>]]`.
//!
//! Scanning is regex based and never fails. Anything that does not parse as a
//! token is plain text.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::models::CardId;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@\[\[(\d+)\|([^\]]*)\]\]").expect("mention token pattern is valid")
});

/// One mention token found in a text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionToken<'a> {
    pub card_id: CardId,
    /// Title captured when the token was inserted (may be stale)
    pub title: &'a str,
    /// Byte range of the whole token in the scanned text
    pub range: Range<usize>,
}

/// Strip characters that would end the token early.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '|'))
        .collect()
}

/// Render the token for a card. Always parses back to `card_id`.
pub fn format_token(card_id: CardId, title: &str) -> String {
    format!("@[[{}|{}]]", card_id, sanitize_title(title))
}

/// All well-formed tokens in `text`, in order.
pub fn scan(text: &str) -> Vec<MentionToken<'_>> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            // IDs that overflow are malformed: no link
            let id = caps.get(1)?.as_str().parse::<i64>().ok()?;
            Some(MentionToken {
                card_id: CardId(id),
                title: caps.get(2).map(|m| m.as_str()).unwrap_or_default(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Referenced card IDs, de-duplicated, in first-occurrence order.
pub fn outgoing_ids(text: &str) -> Vec<CardId> {
    let mut ids = Vec::new();
    for token in scan(text) {
        if !ids.contains(&token.card_id) {
            ids.push(token.card_id);
        }
    }
    ids
}

/// Whether `text` contains a token pointing at `card_id`.
pub fn references(text: &str, card_id: CardId) -> bool {
    scan(text).iter().any(|t| t.card_id == card_id)
}

/// A run of text ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link { card_id: CardId, title: &'a str },
}

/// Split `text` into plain runs and links. Tokens whose card no longer
/// exists degrade to their display title as plain text.
pub fn segments<'a>(text: &'a str, exists: impl Fn(CardId) -> bool) -> Vec<Segment<'a>> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for token in scan(text) {
        if token.range.start > cursor {
            out.push(Segment::Text(&text[cursor..token.range.start]));
        }
        if exists(token.card_id) {
            out.push(Segment::Link {
                card_id: token.card_id,
                title: token.title,
            });
        } else if !token.title.is_empty() {
            out.push(Segment::Text(token.title));
        }
        cursor = token.range.end;
    }
    if cursor < text.len() {
        out.push(Segment::Text(&text[cursor..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token() {
        assert_eq!(format_token(CardId(42), "Plan"), "@[[42|Plan]]");
    }

    #[test]
    fn test_format_token_sanitizes_title() {
        let token = format_token(CardId(3), "a|b]] [c]");
        assert_eq!(token, "@[[3|ab c]]");
        assert_eq!(outgoing_ids(&token), vec![CardId(3)]);
    }

    #[test]
    fn test_scan_finds_tokens_with_ranges() {
        let text = "See @[[5|Budget]] and @[[12|Q3 plan]].";
        let tokens = scan(text);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].card_id, CardId(5));
        assert_eq!(tokens[0].title, "Budget");
        assert_eq!(&text[tokens[0].range.clone()], "@[[5|Budget]]");
        assert_eq!(tokens[1].card_id, CardId(12));
    }

    #[test]
    fn test_malformed_tokens_are_not_links() {
        for text in [
            "@[[abc|Title]]",
            "@[[5 Title]]",
            "@[[5|Title]",
            "[[5|Title]]",
            "@[[99999999999999999999999|Huge]]",
        ] {
            assert!(scan(text).is_empty(), "{} should not parse", text);
        }
    }

    #[test]
    fn test_outgoing_ids_dedup_first_seen() {
        let text = "@[[2|B]] @[[1|A]] @[[2|B again]] @[[3|C]]";
        assert_eq!(outgoing_ids(text), vec![CardId(2), CardId(1), CardId(3)]);
    }

    #[test]
    fn test_empty_title_is_still_a_token() {
        assert_eq!(outgoing_ids("@[[9|]]"), vec![CardId(9)]);
    }

    #[test]
    fn test_references() {
        assert!(references("x @[[5|Budget]] y", CardId(5)));
        assert!(!references("x @[[50|Other]] y", CardId(5)));
    }

    #[test]
    fn test_segments_degrade_dangling_tokens() {
        let text = "See @[[5|Budget]] and @[[6|Gone]]!";
        let segs = segments(text, |id| id == CardId(5));
        assert_eq!(
            segs,
            vec![
                Segment::Text("See "),
                Segment::Link {
                    card_id: CardId(5),
                    title: "Budget"
                },
                Segment::Text(" and "),
                Segment::Text("Gone"),
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn test_segments_plain_text() {
        assert_eq!(segments("no links", |_| true), vec![Segment::Text("no links")]);
        assert!(segments("", |_| true).is_empty());
    }
}
