//! One open board: viewport, gestures, card positions and notices.

use tokio::time::Instant;
use tracing::{info, warn};

use crate::canvas::{
    CardPositionStore, GestureAction, GestureConfig, GestureController, GestureState,
    InteractionMode, Point, PointerEvent, Size, Viewport,
};
use crate::models::{Board, BoardId, Card, CardId, GridPosition};
use crate::notices::NoticeBoard;
use crate::storage::Persistence;
use crate::{Error, Result};

/// Title given to cards created by clicking the canvas.
pub const NEW_CARD_TITLE: &str = "Untitled";

/// Session-scoped state for one board view.
#[derive(Debug)]
pub struct BoardSession {
    board: Board,
    cards: Vec<Card>,
    viewport: Viewport,
    gestures: GestureController,
    positions: CardPositionStore,
    notices: NoticeBoard,
}

impl BoardSession {
    /// Load a board from persistence.
    pub fn load(
        persistence: &dyn Persistence,
        board_id: BoardId,
        config: GestureConfig,
    ) -> Result<Self> {
        let snapshot = persistence.load_board(board_id)?;
        info!(board = %board_id, cards = snapshot.cards.len(), "board loaded");
        Ok(Self {
            positions: CardPositionStore::from_snapshot(&snapshot),
            cards: snapshot.cards.into_iter().map(|p| p.card).collect(),
            board: snapshot.board,
            viewport: Viewport::default(),
            gestures: GestureController::new(config),
            notices: NoticeBoard::new(),
        })
    }

    /// Replace positions and cards with the authoritative values.
    pub fn reload(&mut self, persistence: &dyn Persistence) -> Result<()> {
        let snapshot = persistence.load_board(self.board.id)?;
        self.positions.load(&snapshot);
        self.cards = snapshot.cards.into_iter().map(|p| p.card).collect();
        self.board = snapshot.board;
        Ok(())
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Cards placed on this board
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn positions(&self) -> &CardPositionStore {
        &self.positions
    }

    pub fn gesture_state(&self) -> &GestureState {
        self.gestures.state()
    }

    pub fn mode(&self) -> InteractionMode {
        self.gestures.mode()
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.gestures.set_mode(mode);
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Current (possibly uncommitted) position of every placed card.
    pub fn placements(&self) -> Vec<(CardId, GridPosition)> {
        self.cards
            .iter()
            .map(|c| (c.id, self.positions.snapshot(c.id)))
            .collect()
    }

    /// Feed a pointer event and carry out the resulting actions.
    ///
    /// Persistence failures become warning notices; only an expired session
    /// is returned as an error.
    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        persistence: &mut dyn Persistence,
    ) -> Result<Vec<GestureAction>> {
        let actions = self
            .gestures
            .handle(event, &mut self.viewport, &mut self.positions);
        for action in &actions {
            self.execute(action, persistence)?;
        }
        Ok(actions)
    }

    /// Advance timers: expires old notices.
    pub fn tick(&mut self, now: Instant) {
        self.notices.cleanup(now);
    }

    pub fn handle_wheel(&mut self, screen: Point, delta_y: f64) -> Vec<GestureAction> {
        self.gestures.handle_wheel(screen, delta_y, &mut self.viewport)
    }

    fn execute(&mut self, action: &GestureAction, persistence: &mut dyn Persistence) -> Result<()> {
        match *action {
            GestureAction::ViewportChanged | GestureAction::CardMoved { .. } => Ok(()),
            GestureAction::CommitPosition { card_id, position } => {
                let result = self.positions.commit(card_id, persistence);
                if let Some(sent) =
                    self.absorb(result, || format!("Could not save position of card {}", card_id))?
                {
                    debug_assert_eq!(sent, position);
                }
                Ok(())
            }
            GestureAction::CreateAt { world } => {
                let spawn = world.round();
                let result = persistence
                    .create_card(NEW_CARD_TITLE, "")
                    .and_then(|card| {
                        persistence.add_card_to_board(self.board.id, card.id, Some(spawn))?;
                        Ok(card)
                    });
                if let Some(card) = self.absorb(result, || "Could not create card".to_string())? {
                    info!(board = %self.board.id, card = %card.id, %spawn, "card created on canvas");
                    self.notices
                        .success(format!("Created card #{} at {}", card.id, spawn));
                    self.positions.set(card.id, Point::from(spawn));
                    self.cards.push(card);
                }
                Ok(())
            }
        }
    }

    /// Turn a recoverable failure into a notice.
    fn absorb<T>(&mut self, result: Result<T>, what: impl FnOnce() -> String) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(Error::SessionExpired) => Err(Error::SessionExpired),
            Err(e) => {
                warn!(board = %self.board.id, error = %e, "persistence call failed");
                self.notices.warning(format!("{}: {}", what(), e));
                Ok(None)
            }
        }
    }

    /// Place an existing card on this board.
    pub fn add_card(
        &mut self,
        card: Card,
        spawn: Option<GridPosition>,
        persistence: &mut dyn Persistence,
    ) -> Result<()> {
        persistence.add_card_to_board(self.board.id, card.id, spawn)?;
        self.positions
            .set(card.id, Point::from(spawn.unwrap_or_default()));
        self.cards.push(card);
        Ok(())
    }

    /// Take a card off this board. The card itself is not deleted.
    pub fn remove_card(&mut self, card_id: CardId, persistence: &mut dyn Persistence) -> Result<()> {
        persistence.remove_card_from_board(self.board.id, card_id)?;
        self.positions.remove(card_id);
        self.cards.retain(|c| c.id != card_id);
        Ok(())
    }

    /// Centre the viewport on a card without changing the zoom.
    pub fn focus_card(&mut self, card_id: CardId, screen: Size) {
        self.viewport.center_on(self.positions.get(card_id), screen);
    }

    pub fn reset_viewport(&mut self) {
        self.viewport.reset();
    }
}
