//! In-memory persistence with failure injection.
//!
//! Used by unit tests and by `board replay --dry-run`, where gesture scripts
//! run against a copy of the board without touching the database.

use chrono::Utc;
use std::collections::BTreeMap;

use super::Persistence;
use crate::models::{Board, BoardId, BoardSnapshot, Card, CardId, CardText, GridPosition, PlacedCard};
use crate::{Error, Result};

/// A failure mode to inject into every call until cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Calls fail with `Error::Persistence`
    Unavailable(String),
    /// Calls fail with `Error::SessionExpired`
    SessionExpired,
}

impl Failure {
    fn to_error(&self) -> Error {
        match self {
            Failure::Unavailable(msg) => Error::Persistence(msg.clone()),
            Failure::SessionExpired => Error::SessionExpired,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    cards: BTreeMap<CardId, Card>,
    boards: BTreeMap<BoardId, Board>,
    /// Placements per board, in insertion order
    placements: BTreeMap<BoardId, Vec<(CardId, GridPosition)>>,
    next_card_id: i64,
    next_board_id: i64,
    failure: Option<Failure>,
    position_commits: Vec<(BoardId, CardId, GridPosition)>,
    text_commits: Vec<(CardId, CardText)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_card_id: 1,
            next_board_id: 1,
            ..Default::default()
        }
    }

    /// Copy a board and all cards out of another collaborator.
    pub fn from_persistence(source: &dyn Persistence, board_id: BoardId) -> Result<Self> {
        let mut store = Self::new();
        for card in source.load_all_cards()? {
            store.next_card_id = store.next_card_id.max(card.id.0 + 1);
            store.cards.insert(card.id, card);
        }
        let snapshot = source.load_board(board_id)?;
        store.next_board_id = store.next_board_id.max(board_id.0 + 1);
        store.placements.insert(
            board_id,
            snapshot
                .cards
                .iter()
                .map(|p| (p.card.id, p.position()))
                .collect(),
        );
        store.boards.insert(board_id, snapshot.board);
        Ok(store)
    }

    /// Make every following call fail (or succeed again with `None`).
    pub fn set_failure(&mut self, failure: Option<Failure>) {
        self.failure = failure;
    }

    pub fn insert_board(&mut self, name: &str) -> Board {
        let board = Board::new(BoardId(self.next_board_id), name);
        self.next_board_id += 1;
        self.boards.insert(board.id, board.clone());
        self.placements.insert(board.id, Vec::new());
        board
    }

    /// Store a card under a fresh ID. The ID on `card` is ignored.
    pub fn insert_card(&mut self, mut card: Card) -> Card {
        card.id = CardId(self.next_card_id);
        self.next_card_id += 1;
        self.cards.insert(card.id, card.clone());
        card
    }

    pub fn card(&self, card_id: CardId) -> Option<&Card> {
        self.cards.get(&card_id)
    }

    /// Delete a card outright, leaving any mention tokens to it dangling.
    pub fn delete_card(&mut self, card_id: CardId) -> Option<Card> {
        for placed in self.placements.values_mut() {
            placed.retain(|(id, _)| *id != card_id);
        }
        self.cards.remove(&card_id)
    }

    pub fn position_of(&self, board_id: BoardId, card_id: CardId) -> Option<GridPosition> {
        self.placements
            .get(&board_id)?
            .iter()
            .find(|(id, _)| *id == card_id)
            .map(|(_, pos)| *pos)
    }

    /// Every successful position commit, in call order.
    pub fn position_commits(&self) -> &[(BoardId, CardId, GridPosition)] {
        &self.position_commits
    }

    /// Every successful text commit, in call order.
    pub fn text_commits(&self) -> &[(CardId, CardText)] {
        &self.text_commits
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn board_placements(&mut self, board_id: BoardId) -> Result<&mut Vec<(CardId, GridPosition)>> {
        self.placements
            .get_mut(&board_id)
            .ok_or_else(|| Error::NotFound(format!("Board not found: {}", board_id)))
    }
}

impl Persistence for MemoryStore {
    fn load_board(&self, board_id: BoardId) -> Result<BoardSnapshot> {
        self.check()?;
        let board = self
            .boards
            .get(&board_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Board not found: {}", board_id)))?;
        let mut cards: Vec<PlacedCard> = self
            .placements
            .get(&board_id)
            .map(|placed| {
                placed
                    .iter()
                    .filter_map(|(id, pos)| {
                        self.cards.get(id).map(|card| PlacedCard {
                            card: card.clone(),
                            x: pos.x,
                            y: pos.y,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        // Same order as the SQLite store
        cards.sort_by_key(|placed| placed.card.id);
        Ok(BoardSnapshot { board, cards })
    }

    fn load_all_cards(&self) -> Result<Vec<Card>> {
        self.check()?;
        Ok(self.cards.values().cloned().collect())
    }

    fn commit_card_position(
        &mut self,
        board_id: BoardId,
        card_id: CardId,
        position: GridPosition,
    ) -> Result<()> {
        self.check()?;
        let placed = self.board_placements(board_id)?;
        let entry = placed
            .iter_mut()
            .find(|(id, _)| *id == card_id)
            .ok_or_else(|| {
                Error::NotFound(format!("Card {} is not on board {}", card_id, board_id))
            })?;
        entry.1 = position;
        self.position_commits.push((board_id, card_id, position));
        Ok(())
    }

    fn commit_card_text(&mut self, card_id: CardId, text: &CardText) -> Result<Card> {
        self.check()?;
        let card = self
            .cards
            .get_mut(&card_id)
            .ok_or_else(|| Error::NotFound(format!("Card not found: {}", card_id)))?;
        card.title = text.title.clone();
        card.content = text.content.clone();
        card.updated_at = Utc::now();
        let updated = card.clone();
        self.text_commits.push((card_id, text.clone()));
        Ok(updated)
    }

    fn add_card_to_board(
        &mut self,
        board_id: BoardId,
        card_id: CardId,
        spawn: Option<GridPosition>,
    ) -> Result<()> {
        self.check()?;
        if !self.cards.contains_key(&card_id) {
            return Err(Error::NotFound(format!("Card not found: {}", card_id)));
        }
        let placed = self.board_placements(board_id)?;
        if placed.iter().any(|(id, _)| *id == card_id) {
            return Err(Error::InvalidInput(format!(
                "Card {} is already on board {}",
                card_id, board_id
            )));
        }
        placed.push((card_id, spawn.unwrap_or_default()));
        Ok(())
    }

    fn remove_card_from_board(&mut self, board_id: BoardId, card_id: CardId) -> Result<()> {
        self.check()?;
        let placed = self.board_placements(board_id)?;
        let before = placed.len();
        placed.retain(|(id, _)| *id != card_id);
        if placed.len() == before {
            return Err(Error::NotFound(format!(
                "Card {} is not on board {}",
                card_id, board_id
            )));
        }
        Ok(())
    }

    fn create_card(&mut self, title: &str, content: &str) -> Result<Card> {
        self.check()?;
        Ok(self.insert_card(Card::new(CardId(0), title).with_content(content)))
    }
}
