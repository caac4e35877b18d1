//! Data models for Corkboard entities.
//!
//! This module defines the core data structures:
//! - `Card` - A titled markdown body that can be placed on any number of boards
//! - `Board` - A named infinite canvas
//! - `PlacedCard` / `BoardSnapshot` - A board together with its card placements
//! - `GridPosition` - The integer position exchanged with persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Identifier of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

/// Identifier of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(pub i64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(CardId)
            .map_err(|_| Error::InvalidId(format!("Card ID must be an integer, got: {}", s)))
    }
}

impl FromStr for BoardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(BoardId)
            .map_err(|_| Error::InvalidId(format!("Board ID must be an integer, got: {}", s)))
    }
}

/// A content card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Unique identifier
    pub id: CardId,

    /// Card title (shown in mention tokens and candidate lists)
    pub title: String,

    /// Markdown body, may contain mention tokens
    #[serde(default)]
    pub content: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Create a new card with the given ID and title.
    pub fn new(id: CardId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            title: title.into(),
            content: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style setter for the body.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// The editable text of this card.
    pub fn text(&self) -> CardText {
        CardText {
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

/// The editable part of a card: what autosave buffers and commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardText {
    pub title: String,
    pub content: String,
}

impl CardText {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// A named infinite canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Unique identifier
    pub id: BoardId,

    /// Display name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Board {
    /// Create a new board with the given ID and name.
    pub fn new(id: BoardId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Integer world position as stored by persistence.
///
/// World coordinates are `f64` everywhere in the engine and are only rounded
/// into a `GridPosition` at the commit boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i64,
    pub y: i64,
}

impl GridPosition {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A card together with where it sits on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedCard {
    #[serde(flatten)]
    pub card: Card,
    pub x: i64,
    pub y: i64,
}

impl PlacedCard {
    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.x, self.y)
    }
}

/// Everything a board view needs on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board: Board,
    pub cards: Vec<PlacedCard>,
}

impl BoardSnapshot {
    /// Find a placement by card ID.
    pub fn placement(&self, card_id: CardId) -> Option<&PlacedCard> {
        self.cards.iter().find(|p| p.card.id == card_id)
    }
}
