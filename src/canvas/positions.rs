//! In-memory card positions for one board view.
//!
//! Positions are mutated optimistically while a card is dragged and are only
//! written to persistence on gesture end, rounded to integers.

use std::collections::HashMap;

use tracing::info;

use super::viewport::Point;
use crate::Result;
use crate::models::{BoardId, BoardSnapshot, CardId, GridPosition};
use crate::storage::Persistence;

/// World coordinates of every card placed on one board.
#[derive(Debug, Clone)]
pub struct CardPositionStore {
    board_id: BoardId,
    positions: HashMap<CardId, Point>,
}

impl CardPositionStore {
    /// Create an empty store for a board
    pub fn new(board_id: BoardId) -> Self {
        Self {
            board_id,
            positions: HashMap::new(),
        }
    }

    /// Build a store from a freshly loaded board
    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Self {
        let mut store = Self::new(snapshot.board.id);
        store.load(snapshot);
        store
    }

    /// Replace every entry with the authoritative values from persistence.
    pub fn load(&mut self, snapshot: &BoardSnapshot) {
        self.board_id = snapshot.board.id;
        self.positions = snapshot
            .cards
            .iter()
            .map(|placed| (placed.card.id, Point::from(placed.position())))
            .collect();
    }

    pub fn board_id(&self) -> BoardId {
        self.board_id
    }

    /// Current position of a card. Unknown cards sit at the origin.
    pub fn get(&self, card_id: CardId) -> Point {
        self.positions.get(&card_id).copied().unwrap_or_default()
    }

    pub fn contains(&self, card_id: CardId) -> bool {
        self.positions.contains_key(&card_id)
    }

    pub fn set(&mut self, card_id: CardId, position: Point) {
        self.positions.insert(card_id, position);
    }

    pub fn remove(&mut self, card_id: CardId) -> Option<Point> {
        self.positions.remove(&card_id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The rounded value a commit would send
    pub fn snapshot(&self, card_id: CardId) -> GridPosition {
        self.get(card_id).round()
    }

    /// Send the current rounded position of a card to persistence.
    ///
    /// Safe to retry: every call carries the full position, and the store on
    /// the other side is last-write-wins.
    pub fn commit(&self, card_id: CardId, persistence: &mut dyn Persistence) -> Result<GridPosition> {
        let position = self.snapshot(card_id);
        info!(board = %self.board_id, card = %card_id, %position, "committing card position");
        persistence.commit_card_position(self.board_id, card_id, position)?;
        Ok(position)
    }
}
