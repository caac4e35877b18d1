//! Live `@` autocomplete while editing a card.
//!
//! On every edit the caller hands the engine the full text and the caret
//! (a UTF-8 byte offset). If the caret sits at the end of an unterminated
//! `@query` run, a [`MentionSession`] is open; otherwise it is closed.
//! Selecting a candidate rewrites `[insertion_offset, caret)` into a token.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::token::format_token;
use crate::canvas::Size;
use crate::config::schema::{DEFAULT_BLUR_GRACE_MS, DEFAULT_MENTION_LIMIT, DEFAULT_POPUP_MARGIN_PX};
use crate::models::{Card, CardId};

// Start of text or whitespace, then `@`, then no whitespace and no second `@`,
// anchored at the caret.
static TRIGGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)@([^\s@]*)$").expect("mention trigger pattern is valid"));

/// Tunables for the mention engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MentionConfig {
    /// Maximum number of candidates offered
    pub limit: usize,
    /// Minimum gap between the popup and the viewport edge
    pub popup_margin: f64,
    /// How long the popup survives losing focus
    pub blur_grace: Duration,
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_MENTION_LIMIT,
            popup_margin: DEFAULT_POPUP_MARGIN_PX,
            blur_grace: Duration::from_millis(DEFAULT_BLUR_GRACE_MS),
        }
    }
}

/// Popup placement in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScreenPosition {
    pub top: f64,
    pub left: f64,
}

/// Caret box in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaretRect {
    pub left: f64,
    pub top: f64,
    pub height: f64,
}

/// Measures where a text offset is drawn. Implemented by the UI layer.
pub trait CaretMeasure {
    /// Screen box of the caret at byte `offset` of `text`.
    fn caret_rect(&self, text: &str, offset: usize) -> Option<CaretRect>;

    /// Size of the visible viewport
    fn viewport_size(&self) -> Size;

    /// Size of the candidate popup
    fn popup_size(&self) -> Size;
}

/// A card offered by the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub id: CardId,
    pub title: String,
}

/// An open autocomplete session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MentionSession {
    /// Text typed after the `@`
    pub query: String,
    /// Byte offset of the `@`
    pub insertion_offset: usize,
    /// Byte offset of the caret when the session was last updated
    pub caret: usize,
    pub screen_position: ScreenPosition,
    pub candidates: Vec<Candidate>,
    /// Index into `candidates`
    pub highlighted: usize,
}

impl MentionSession {
    pub fn highlighted_candidate(&self) -> Option<&Candidate> {
        self.candidates.get(self.highlighted)
    }
}

/// Result of choosing a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insertion {
    pub text: String,
    pub caret: usize,
}

/// Find an `@query` run ending at `caret`. Returns `(offset of '@', query)`.
pub fn detect_trigger(text: &str, caret: usize) -> Option<(usize, &str)> {
    let before = text.get(..caret)?;
    let caps = TRIGGER_RE.captures(before)?;
    let query = caps.get(1)?;
    // The `@` sits right before the captured query
    Some((query.start() - 1, query.as_str()))
}

/// Cards whose title contains `query` (case-insensitive), in the given
/// order, excluding `exclude`, at most `limit`.
pub fn find_candidates<'a>(
    query: &str,
    cards: &'a [Card],
    exclude: Option<CardId>,
    limit: usize,
) -> Vec<&'a Card> {
    let needle = query.to_lowercase();
    cards
        .iter()
        .filter(|c| Some(c.id) != exclude)
        .filter(|c| needle.is_empty() || c.title.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

/// Place the popup under the caret, flipped above it when there is no room
/// below, and clamped inside the viewport by `margin`.
pub fn place_popup(caret: CaretRect, popup: Size, viewport: Size, margin: f64) -> ScreenPosition {
    let max_left = (viewport.width - popup.width - margin).max(margin);
    let left = caret.left.clamp(margin, max_left);

    let below = caret.top + caret.height;
    let top = if below + popup.height + margin > viewport.height {
        caret.top - popup.height
    } else {
        below
    };
    let max_top = (viewport.height - popup.height - margin).max(margin);

    ScreenPosition {
        top: top.clamp(margin, max_top),
        left,
    }
}

/// Autocomplete state for one edited card.
#[derive(Debug, Clone, Default)]
pub struct MentionEngine {
    config: MentionConfig,
    /// The card being edited; never offered as its own candidate
    editing: Option<CardId>,
    session: Option<MentionSession>,
    blur_deadline: Option<Instant>,
}

impl MentionEngine {
    pub fn new(config: MentionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Start editing a different card. Closes any open session.
    pub fn set_editing(&mut self, card_id: Option<CardId>) {
        self.editing = card_id;
        self.close();
    }

    pub fn config(&self) -> &MentionConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&MentionSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("mention session closed");
        }
        self.blur_deadline = None;
    }

    /// Re-evaluate after a text mutation or caret move.
    pub fn update(
        &mut self,
        text: &str,
        caret: usize,
        cards: &[Card],
        measure: Option<&dyn CaretMeasure>,
    ) -> Option<&MentionSession> {
        let Some((insertion_offset, query)) = detect_trigger(text, caret) else {
            self.close();
            return None;
        };

        let candidates: Vec<Candidate> =
            find_candidates(query, cards, self.editing, self.config.limit)
                .into_iter()
                .map(|c| Candidate {
                    id: c.id,
                    title: c.title.clone(),
                })
                .collect();

        let screen_position = measure
            .and_then(|m| {
                let rect = m.caret_rect(text, caret)?;
                Some(place_popup(
                    rect,
                    m.popup_size(),
                    m.viewport_size(),
                    self.config.popup_margin,
                ))
            })
            .unwrap_or_default();

        // Keep the highlight where it was if the same query is refined
        let highlighted = match &self.session {
            Some(prev) if prev.insertion_offset == insertion_offset => {
                prev.highlighted.min(candidates.len().saturating_sub(1))
            }
            _ => 0,
        };

        if self.session.is_none() {
            debug!(offset = insertion_offset, "mention session opened");
        }
        self.blur_deadline = None;
        self.session = Some(MentionSession {
            query: query.to_string(),
            insertion_offset,
            caret,
            screen_position,
            candidates,
            highlighted,
        });
        self.session.as_ref()
    }

    pub fn highlight_next(&mut self) {
        if let Some(session) = &mut self.session {
            if session.highlighted + 1 < session.candidates.len() {
                session.highlighted += 1;
            }
        }
    }

    pub fn highlight_previous(&mut self) {
        if let Some(session) = &mut self.session {
            session.highlighted = session.highlighted.saturating_sub(1);
        }
    }

    /// Replace the `@query` run with a token for `card_id`/`title`.
    ///
    /// Returns `None` (and closes) if no session is open or the session no
    /// longer matches `text`.
    pub fn select(&mut self, text: &str, card_id: CardId, title: &str) -> Option<Insertion> {
        let session = self.session.take()?;
        self.blur_deadline = None;

        let start = session.insertion_offset;
        let end = session.caret;
        if end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return None;
        }

        let token = format_token(card_id, title);
        let mut out = String::with_capacity(text.len() + token.len() + 1);
        out.push_str(&text[..start]);
        out.push_str(&token);
        out.push(' ');
        let caret = out.len();
        out.push_str(&text[end..]);

        debug!(card = %card_id, "mention inserted");
        Some(Insertion { text: out, caret })
    }

    /// Insert the highlighted candidate.
    pub fn select_highlighted(&mut self, text: &str) -> Option<Insertion> {
        let candidate = self.session.as_ref()?.highlighted_candidate()?.clone();
        self.select(text, candidate.id, &candidate.title)
    }

    /// The editor lost focus. The session closes after the grace delay
    /// unless focus comes back or a candidate is chosen first.
    pub fn blur(&mut self, now: Instant) {
        if self.session.is_some() {
            self.blur_deadline = Some(now + self.config.blur_grace);
        }
    }

    pub fn focus(&mut self) {
        self.blur_deadline = None;
    }

    pub fn blur_deadline(&self) -> Option<Instant> {
        self.blur_deadline
    }

    /// Advance the clock; closes the session once the blur grace expired.
    pub fn tick(&mut self, now: Instant) {
        if self.blur_deadline.is_some_and(|deadline| now >= deadline) {
            self.close();
        }
    }
}
