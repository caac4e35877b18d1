//! One open card editor: autosave buffer, mention autocomplete and linked cards.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::autosave::{AutosaveController, EditMode, SaveRequest};
use crate::mentions::{
    CaretMeasure, Insertion, MentionConfig, MentionEngine, MentionSession, Segment, backlinks,
    segments,
};
use crate::models::{Card, CardId, CardText};
use crate::notices::NoticeBoard;
use crate::storage::Persistence;
use crate::{Error, Result};

/// Session-scoped state for editing one card at a time.
#[derive(Debug)]
pub struct CardEditor {
    autosave: AutosaveController,
    mentions: MentionEngine,
    /// Every card, as last loaded or saved
    cards: Vec<Card>,
    caret: usize,
    notices: NoticeBoard,
}

impl CardEditor {
    /// Load all cards and start editing `card_id`.
    pub fn open(
        persistence: &dyn Persistence,
        card_id: CardId,
        autosave_delay: Duration,
        mention_config: MentionConfig,
    ) -> Result<Self> {
        let mut editor = Self {
            autosave: AutosaveController::new(autosave_delay),
            mentions: MentionEngine::new(mention_config),
            cards: persistence.load_all_cards()?,
            caret: 0,
            notices: NoticeBoard::new(),
        };
        editor.switch_to(card_id)?;
        Ok(editor)
    }

    /// Edit a different card. Unsaved edits to the previous card are dropped,
    /// so callers flush with `save_now` first if they want them.
    pub fn switch_to(&mut self, card_id: CardId) -> Result<()> {
        let card = self
            .cards
            .iter()
            .find(|c| c.id == card_id)
            .ok_or_else(|| Error::NotFound(format!("Card not found: {}", card_id)))?;
        self.autosave.load(card);
        self.mentions.set_editing(Some(card_id));
        self.caret = card.content.len();
        Ok(())
    }

    pub fn card_id(&self) -> Option<CardId> {
        self.autosave.card_id()
    }

    /// The live buffer
    pub fn text(&self) -> &CardText {
        self.autosave.buffer()
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn autosave(&self) -> &AutosaveController {
        &self.autosave
    }

    pub fn mention_session(&self) -> Option<&MentionSession> {
        self.mentions.session()
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn edit_title(&mut self, title: impl Into<String>, now: Instant) {
        self.autosave.edit_title(title, now);
    }

    /// Replace the body and move the caret, re-evaluating the mention popup.
    pub fn edit_content(
        &mut self,
        content: impl Into<String>,
        caret: usize,
        now: Instant,
        measure: Option<&dyn CaretMeasure>,
    ) -> Option<&MentionSession> {
        self.autosave.edit_content(content, now);
        self.move_caret(caret, measure)
    }

    /// Move the caret without changing the text.
    pub fn move_caret(&mut self, caret: usize, measure: Option<&dyn CaretMeasure>) -> Option<&MentionSession> {
        self.caret = caret;
        let content = &self.autosave.buffer().content;
        self.mentions.update(content, caret, &self.cards, measure)
    }

    pub fn highlight_next(&mut self) {
        self.mentions.highlight_next();
    }

    pub fn highlight_previous(&mut self) {
        self.mentions.highlight_previous();
    }

    /// Insert a mention of `card_id` at the open `@` run.
    /// Returns false if no session was open or the card is unknown.
    pub fn select_mention(&mut self, card_id: CardId, now: Instant) -> bool {
        let Some(title) = self
            .cards
            .iter()
            .find(|c| c.id == card_id)
            .map(|c| c.title.clone())
        else {
            return false;
        };
        let inserted = self
            .mentions
            .select(&self.autosave.buffer().content, card_id, &title);
        self.apply_insertion(inserted, now)
    }

    /// Insert the highlighted candidate.
    pub fn select_highlighted(&mut self, now: Instant) -> bool {
        let inserted = self
            .mentions
            .select_highlighted(&self.autosave.buffer().content);
        self.apply_insertion(inserted, now)
    }

    fn apply_insertion(&mut self, inserted: Option<Insertion>, now: Instant) -> bool {
        match inserted {
            Some(insertion) => {
                self.autosave.edit_content(insertion.text, now);
                self.caret = insertion.caret;
                true
            }
            None => false,
        }
    }

    pub fn blur(&mut self, now: Instant) {
        self.mentions.blur(now);
    }

    pub fn focus(&mut self) {
        self.mentions.focus();
    }

    pub fn set_mode(&mut self, mode: EditMode, now: Instant) {
        if mode == EditMode::Preview {
            self.mentions.close();
        }
        self.autosave.set_mode(mode, now);
    }

    /// Advance timers: closes a blurred popup, expires old notices and
    /// returns a due autosave.
    pub fn tick(&mut self, now: Instant) -> Option<SaveRequest> {
        self.mentions.tick(now);
        self.notices.cleanup(now);
        self.autosave.poll(now)
    }

    pub fn save_now(&mut self) -> Option<SaveRequest> {
        self.autosave.save_now()
    }

    /// Persist a request and record the outcome. Failures become notices;
    /// an expired session is returned.
    pub fn execute(&mut self, request: SaveRequest, persistence: &mut dyn Persistence) -> Result<()> {
        match persistence.commit_card_text(request.card_id, &request.text) {
            Ok(card) => {
                info!(card = %card.id, trigger = ?request.trigger, "card text saved");
                self.autosave.on_saved(&request);
                if let Some(slot) = self.cards.iter_mut().find(|c| c.id == card.id) {
                    *slot = card;
                }
                Ok(())
            }
            Err(Error::SessionExpired) => Err(Error::SessionExpired),
            Err(e) => {
                warn!(card = %request.card_id, error = %e, "card text save failed");
                self.autosave.on_failed(&request);
                self.notices
                    .warning(format!("Could not save card {}: {}", request.card_id, e));
                Ok(())
            }
        }
    }

    /// Cards linked to the edited card, scanning the live buffer for
    /// outgoing mentions.
    pub fn linked_cards(&self) -> Vec<&Card> {
        match self.card_id() {
            Some(id) => backlinks::linked(id, &self.cards, &self.text().content),
            None => Vec::new(),
        }
    }

    /// The body split into display segments; dangling mentions become text.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        segments(&self.text().content, |id| self.cards.iter().any(|c| c.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Failure, MemoryStore};
    use crate::test_utils::card;

    const DELAY: Duration = Duration::from_millis(800);

    fn setup() -> (MemoryStore, CardId, CardId) {
        let mut store = MemoryStore::new();
        let a = store.insert_card(card(0, "A", ""));
        let budget = store.insert_card(card(0, "Budget", ""));
        (store, a.id, budget.id)
    }

    fn open(store: &MemoryStore, id: CardId) -> CardEditor {
        CardEditor::open(store, id, DELAY, MentionConfig::default()).unwrap()
    }

    #[test]
    fn test_typing_mention_and_saving() {
        let (mut store, a, budget) = setup();
        let mut editor = open(&store, a);
        let t0 = Instant::now();

        let session = editor.edit_content("See @Bud", 8, t0, None).unwrap();
        assert_eq!(session.candidates[0].id, budget);

        assert!(editor.select_highlighted(t0));
        assert_eq!(editor.text().content, format!("See @[[{}|Budget]] ", budget));
        assert_eq!(editor.caret(), editor.text().content.len());
        assert!(editor.mention_session().is_none());

        // Linked before the save lands
        let linked: Vec<_> = editor.linked_cards().iter().map(|c| c.id).collect();
        assert_eq!(linked, vec![budget]);

        let request = editor.tick(t0 + DELAY).unwrap();
        editor.execute(request, &mut store).unwrap();
        assert!(!editor.autosave().is_dirty());
        assert_eq!(store.text_commits().len(), 1);

        // From the other side, A is now a backlink of Budget
        let mut other = open(&store, budget);
        let linked: Vec<_> = other.linked_cards().iter().map(|c| c.id).collect();
        assert_eq!(linked, vec![a]);
        other.switch_to(a).unwrap();
        assert_eq!(other.card_id(), Some(a));
    }

    #[test]
    fn test_failed_save_posts_notice() {
        let (mut store, a, _) = setup();
        let mut editor = open(&store, a);
        let t0 = Instant::now();
        editor.edit_title("A2", t0);
        store.set_failure(Some(Failure::Unavailable("offline".into())));

        let request = editor.save_now().unwrap();
        editor.execute(request, &mut store).unwrap();
        assert!(editor.autosave().is_dirty());
        assert_eq!(editor.notices().active().count(), 1);

        editor.tick(t0 + Duration::from_secs(60));
        assert!(!editor.notices().has_notices());
    }

    #[test]
    fn test_expired_session_propagates() {
        let (mut store, a, _) = setup();
        let mut editor = open(&store, a);
        editor.edit_title("A2", Instant::now());
        store.set_failure(Some(Failure::SessionExpired));

        let request = editor.save_now().unwrap();
        assert!(editor.execute(request, &mut store).unwrap_err().is_session_expired());
    }

    #[test]
    fn test_dangling_mention_renders_as_text() {
        let (store, a, _) = setup();
        let mut editor = open(&store, a);
        editor.edit_content("x @[[99|Gone]]", 0, Instant::now(), None);
        assert_eq!(
            editor.segments(),
            vec![Segment::Text("x "), Segment::Text("Gone")]
        );
        assert!(editor.linked_cards().is_empty());
    }

    #[test]
    fn test_preview_closes_popup() {
        let (store, a, _) = setup();
        let mut editor = open(&store, a);
        let t0 = Instant::now();
        editor.edit_content("@", 1, t0, None);
        assert!(editor.mention_session().is_some());

        editor.set_mode(EditMode::Preview, t0);
        assert!(editor.mention_session().is_none());
        assert!(editor.tick(t0 + DELAY * 2).is_none());
    }

    #[test]
    fn test_open_unknown_card() {
        let (store, _, _) = setup();
        assert!(matches!(
            CardEditor::open(&store, CardId(404), DELAY, MentionConfig::default()),
            Err(Error::NotFound(_))
        ));
    }
}
