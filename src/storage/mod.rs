//! Storage layer for Corkboard data.
//!
//! The engines never talk to a database directly; they go through the
//! [`Persistence`] trait. Two implementations live here:
//!
//! - [`Storage`] - SQLite database (`corkboard.db`) in a data directory,
//!   resolved from `--data-dir`, `CORK_DATA_DIR` or `~/.local/share/corkboard/`
//! - [`MemoryStore`] - in-memory store with failure injection, for tests and
//!   dry-run replays
//!
//! The data directory also holds the session-level `config.kdl`.

pub mod memory;

pub use memory::{Failure, MemoryStore};

use crate::config::CorkConfig;
use crate::models::{Board, BoardId, BoardSnapshot, Card, CardId, CardText, GridPosition, PlacedCard};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use kdl::KdlDocument;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CORK_DATA_DIR";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "CORK_CONFIG_DIR";

const DB_FILE: &str = "corkboard.db";
const CONFIG_FILE: &str = "config.kdl";

/// The persistence collaborator the canvas and editor sessions talk to.
///
/// Coordinates crossing this boundary are integers. Every write carries the
/// full value, so repeating a call is harmless (last write wins).
pub trait Persistence {
    /// Load a board and every card placed on it.
    fn load_board(&self, board_id: BoardId) -> Result<BoardSnapshot>;

    /// Load every card, in creation order.
    fn load_all_cards(&self) -> Result<Vec<Card>>;

    /// Store a card's position on a board.
    fn commit_card_position(
        &mut self,
        board_id: BoardId,
        card_id: CardId,
        position: GridPosition,
    ) -> Result<()>;

    /// Store a card's title and body, returning the updated card.
    fn commit_card_text(&mut self, card_id: CardId, text: &CardText) -> Result<Card>;

    /// Place a card on a board, at `spawn` or the origin.
    fn add_card_to_board(
        &mut self,
        board_id: BoardId,
        card_id: CardId,
        spawn: Option<GridPosition>,
    ) -> Result<()>;

    fn remove_card_from_board(&mut self, board_id: BoardId, card_id: CardId) -> Result<()>;

    fn create_card(&mut self, title: &str, content: &str) -> Result<Card>;
}

/// SQLite-backed storage in a single data directory.
pub struct Storage {
    /// Root directory for this installation's data
    pub root: PathBuf,
    /// SQLite connection
    conn: Connection,
}

impl Storage {
    /// Open existing storage in `root`.
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::exists(root)? {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(root.join(DB_FILE))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Initialize storage in `root`, creating the directory if needed.
    pub fn init(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;

        let conn = Connection::open(root.join(DB_FILE))?;
        Self::init_schema(&conn)?;

        Ok(Self {
            root: root.to_path_buf(),
            conn,
        })
    }

    /// Check if storage exists in `root`.
    pub fn exists(root: &Path) -> Result<bool> {
        Ok(root.exists() && root.join(DB_FILE).exists())
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS boards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS board_cards (
                board_id INTEGER NOT NULL,
                card_id INTEGER NOT NULL,
                x INTEGER NOT NULL DEFAULT 0,
                y INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (board_id, card_id),
                FOREIGN KEY (board_id) REFERENCES boards(id) ON DELETE CASCADE,
                FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_board_cards_card ON board_cards(card_id);
            "#,
        )?;

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // === Card Operations ===

    /// Get a card by ID.
    pub fn get_card(&self, id: CardId) -> Result<Card> {
        self.conn
            .query_row(
                "SELECT id, title, content, created_at, updated_at FROM cards WHERE id = ?1",
                [id.0],
                card_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Card not found: {}", id)))
    }

    /// List all cards in creation order.
    pub fn list_cards(&self) -> Result<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, content, created_at, updated_at FROM cards ORDER BY id")?;
        let cards = stmt
            .query_map([], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Delete a card and all of its placements.
    pub fn delete_card(&mut self, id: CardId) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM cards WHERE id = ?1", [id.0])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Card not found: {}", id)));
        }
        Ok(())
    }

    /// IDs of the boards a card is placed on.
    pub fn boards_for_card(&self, id: CardId) -> Result<Vec<BoardId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT board_id FROM board_cards WHERE card_id = ?1 ORDER BY board_id")?;
        let ids = stmt
            .query_map([id.0], |row| row.get(0).map(BoardId))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    // === Board Operations ===

    /// Create a new board.
    pub fn create_board(&mut self, name: &str) -> Result<Board> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Board name cannot be empty".to_string()));
        }
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO boards (name, created_at) VALUES (?1, ?2)",
            params![name, now.to_rfc3339()],
        )?;
        let id = BoardId(self.conn.last_insert_rowid());
        self.get_board(id)
    }

    /// Get a board by ID.
    pub fn get_board(&self, id: BoardId) -> Result<Board> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM boards WHERE id = ?1",
                [id.0],
                board_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Board not found: {}", id)))
    }

    /// List all boards in creation order.
    pub fn list_boards(&self) -> Result<Vec<Board>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM boards ORDER BY id")?;
        let boards = stmt
            .query_map([], board_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(boards)
    }

    /// Number of cards placed on a board.
    pub fn count_board_cards(&self, id: BoardId) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM board_cards WHERE board_id = ?1",
            [id.0],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn placement_exists(&self, board_id: BoardId, card_id: CardId) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM board_cards WHERE board_id = ?1 AND card_id = ?2",
            [board_id.0, card_id.0],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // === Config Operations ===

    /// Path of the session-level config file in the data directory.
    pub fn config_kdl_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// System-level config file: `$CORK_CONFIG_DIR/config.kdl`, else
    /// `~/.config/corkboard/config.kdl`.
    pub fn system_config_kdl_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                return Some(PathBuf::from(dir).join(CONFIG_FILE));
            }
        }
        dirs::config_dir().map(|d| d.join("corkboard").join(CONFIG_FILE))
    }

    /// Parse the session config file. Missing file reads as empty.
    pub fn read_config_kdl(&self) -> Result<KdlDocument> {
        read_kdl_file(&self.config_kdl_path())
    }

    /// Parse the system config file. Missing file reads as empty.
    pub fn read_system_config_kdl() -> Result<KdlDocument> {
        match Self::system_config_kdl_path() {
            Some(path) => read_kdl_file(&path),
            None => Ok(KdlDocument::new()),
        }
    }

    /// Session-level preferences.
    pub fn read_cork_config(&self) -> Result<CorkConfig> {
        Ok(CorkConfig::from_kdl(&self.read_config_kdl()?))
    }

    /// System-level preferences.
    pub fn read_system_cork_config() -> Result<CorkConfig> {
        Ok(CorkConfig::from_kdl(&Self::read_system_config_kdl()?))
    }

    /// Write session-level preferences, replacing the file.
    pub fn write_cork_config(&self, config: &CorkConfig) -> Result<()> {
        config.validate().map_err(Error::Config)?;
        fs::write(self.config_kdl_path(), config.to_kdl().to_string())?;
        Ok(())
    }
}

impl Persistence for Storage {
    fn load_board(&self, board_id: BoardId) -> Result<BoardSnapshot> {
        let board = self.get_board(board_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.title, c.content, c.created_at, c.updated_at, bc.x, bc.y
             FROM board_cards bc
             JOIN cards c ON c.id = bc.card_id
             WHERE bc.board_id = ?1
             ORDER BY c.id",
        )?;
        let cards = stmt
            .query_map([board_id.0], |row| {
                Ok(PlacedCard {
                    card: card_from_row(row)?,
                    x: row.get(5)?,
                    y: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(BoardSnapshot { board, cards })
    }

    fn load_all_cards(&self) -> Result<Vec<Card>> {
        self.list_cards()
    }

    fn commit_card_position(
        &mut self,
        board_id: BoardId,
        card_id: CardId,
        position: GridPosition,
    ) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE board_cards SET x = ?1, y = ?2 WHERE board_id = ?3 AND card_id = ?4",
            params![position.x, position.y, board_id.0, card_id.0],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!(
                "Card {} is not on board {}",
                card_id, board_id
            )));
        }
        Ok(())
    }

    fn commit_card_text(&mut self, card_id: CardId, text: &CardText) -> Result<Card> {
        let updated = self.conn.execute(
            "UPDATE cards SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
            params![text.title, text.content, Utc::now().to_rfc3339(), card_id.0],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Card not found: {}", card_id)));
        }
        self.get_card(card_id)
    }

    fn add_card_to_board(
        &mut self,
        board_id: BoardId,
        card_id: CardId,
        spawn: Option<GridPosition>,
    ) -> Result<()> {
        self.get_board(board_id)?;
        self.get_card(card_id)?;
        if self.placement_exists(board_id, card_id)? {
            return Err(Error::InvalidInput(format!(
                "Card {} is already on board {}",
                card_id, board_id
            )));
        }
        let position = spawn.unwrap_or_default();
        self.conn.execute(
            "INSERT INTO board_cards (board_id, card_id, x, y) VALUES (?1, ?2, ?3, ?4)",
            params![board_id.0, card_id.0, position.x, position.y],
        )?;
        Ok(())
    }

    fn remove_card_from_board(&mut self, board_id: BoardId, card_id: CardId) -> Result<()> {
        let deleted = self.conn.execute(
            "DELETE FROM board_cards WHERE board_id = ?1 AND card_id = ?2",
            [board_id.0, card_id.0],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!(
                "Card {} is not on board {}",
                card_id, board_id
            )));
        }
        Ok(())
    }

    fn create_card(&mut self, title: &str, content: &str) -> Result<Card> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO cards (title, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![title, content, now],
        )?;
        let id = CardId(self.conn.last_insert_rowid());
        self.get_card(id)
    }
}

/// Get the data directory: explicit override, then `CORK_DATA_DIR`, then
/// the platform data dir.
pub fn get_storage_dir(data_dir_override: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("corkboard"))
}

fn read_kdl_file(path: &Path) -> Result<KdlDocument> {
    if !path.exists() {
        return Ok(KdlDocument::new());
    }
    let text = fs::read_to_string(path)?;
    Ok(text.parse::<KdlDocument>()?)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: CardId(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_timestamp(row, 3)?,
        updated_at: parse_timestamp(row, 4)?,
    })
}

fn board_from_row(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: BoardId(row.get(0)?),
        name: row.get(1)?,
        created_at: parse_timestamp(row, 2)?,
    })
}
