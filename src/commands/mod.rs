//! Command implementations for the `cork` CLI.
//!
//! Each command opens the data directory, does its work through the library
//! (storage, sessions, mention engine) and returns a result struct that can be
//! printed as JSON or as human-readable text.
//! - `init` - create the data directory and database
//! - `card_*` - card CRUD, editing and links
//! - `board_*` - boards, placements and gesture replay
//! - `mention_complete` - one-shot `@` autocomplete
//! - `config_*` - resolved configuration

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::autosave::{AutosaveController, EditorEvent, drive_autosave};
use crate::canvas::{
    GestureAction, GestureConfig, InteractionMode, Point, PointerEvent, Size, Viewport,
};
use crate::config::{
    ConfigOverrides, CorkConfig, ValueSource, resolve_config, resolve_config_without_storage,
};
use crate::mentions::{Candidate, Insertion, backlinks};
use crate::models::{Board, BoardId, Card, CardId, GridPosition};
use crate::notices::Notice;
use crate::session::{BoardSession, CardEditor};
use crate::storage::{MemoryStore, Persistence, Storage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

macro_rules! json_result {
    ($ty:ty) => {
        fn to_json(&self) -> String {
            serde_json::to_string(self).unwrap_or_else(|e| {
                format!(r#"{{"error": "failed to serialize {}: {}"}}"#, stringify!($ty), e)
            })
        }
    };
}

fn preview(content: &str) -> String {
    let first = content.lines().next().unwrap_or("");
    if first.chars().count() > 60 {
        format!("{}...", first.chars().take(57).collect::<String>())
    } else {
        first.to_string()
    }
}

// === Init ===

#[derive(Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: PathBuf,
}

impl CommandResult for InitResult {
    json_result!(InitResult);

    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized corkboard at {}", self.path.display())
        } else {
            format!("Corkboard already initialized at {}", self.path.display())
        }
    }
}

/// Create the data directory and database. Safe to run twice.
pub fn init(data_dir: &Path) -> Result<InitResult> {
    let existed = Storage::exists(data_dir)?;
    let storage = Storage::init(data_dir)?;
    if !existed {
        info!(path = %storage.root().display(), "initialized data directory");
    }
    Ok(InitResult {
        initialized: !existed,
        path: storage.root().to_path_buf(),
    })
}

// === Cards ===

#[derive(Serialize)]
pub struct CardCreated {
    pub id: CardId,
    pub title: String,
}

impl CommandResult for CardCreated {
    json_result!(CardCreated);

    fn to_human(&self) -> String {
        format!("Created card #{} \"{}\"", self.id, self.title)
    }
}

pub fn card_create(data_dir: &Path, title: &str, content: Option<&str>) -> Result<CardCreated> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("Card title cannot be empty".to_string()));
    }
    let mut storage = Storage::open(data_dir)?;
    let card = storage.create_card(title, content.unwrap_or(""))?;
    Ok(CardCreated {
        id: card.id,
        title: card.title,
    })
}

/// A card reference used in link lists.
#[derive(Serialize)]
pub struct CardRef {
    pub id: CardId,
    pub title: String,
}

impl From<&Card> for CardRef {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            title: card.title.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct CardShowResult {
    #[serde(flatten)]
    pub card: Card,
    pub boards: Vec<BoardId>,
    pub linked: Vec<CardRef>,
}

impl CommandResult for CardShowResult {
    json_result!(CardShowResult);

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#{} {}", self.card.id, self.card.title);
        let _ = writeln!(
            out,
            "  updated {}",
            self.card.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !self.boards.is_empty() {
            let boards: Vec<_> = self.boards.iter().map(|b| format!("#{}", b)).collect();
            let _ = writeln!(out, "  on boards: {}", boards.join(", "));
        }
        if !self.card.content.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", self.card.content);
        }
        if !self.linked.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Linked cards:");
            for link in &self.linked {
                let _ = writeln!(out, "  #{} {}", link.id, link.title);
            }
        }
        out.trim_end().to_string()
    }
}

pub fn card_show(data_dir: &Path, id: CardId) -> Result<CardShowResult> {
    let storage = Storage::open(data_dir)?;
    let card = storage.get_card(id)?;
    let all = storage.load_all_cards()?;
    let linked = backlinks::linked(id, &all, &card.content)
        .into_iter()
        .map(CardRef::from)
        .collect();
    Ok(CardShowResult {
        boards: storage.boards_for_card(id)?,
        linked,
        card,
    })
}

#[derive(Serialize)]
pub struct CardList {
    pub cards: Vec<Card>,
    pub count: usize,
}

impl CommandResult for CardList {
    json_result!(CardList);

    fn to_human(&self) -> String {
        if self.cards.is_empty() {
            return "No cards.".to_string();
        }
        let mut lines = vec![format!("{} card(s):", self.count)];
        for card in &self.cards {
            let body = preview(&card.content);
            if body.is_empty() {
                lines.push(format!("  #{} {}", card.id, card.title));
            } else {
                lines.push(format!("  #{} {} - {}", card.id, card.title, body));
            }
        }
        lines.join("\n")
    }
}

pub fn card_list(data_dir: &Path) -> Result<CardList> {
    let storage = Storage::open(data_dir)?;
    let cards = storage.list_cards()?;
    Ok(CardList {
        count: cards.len(),
        cards,
    })
}

#[derive(Serialize)]
pub struct CardEdited {
    pub id: CardId,
    pub title: String,
    pub content: String,
    pub saved: bool,
}

impl CommandResult for CardEdited {
    json_result!(CardEdited);

    fn to_human(&self) -> String {
        if self.saved {
            format!("Saved card #{} \"{}\"", self.id, self.title)
        } else {
            format!("Card #{} unchanged", self.id)
        }
    }
}

/// Edit a card's title and/or body through the autosave driver.
///
/// The edits are fed as one burst and flushed when the edit stream closes,
/// so at most one commit reaches storage.
pub fn card_edit(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    id: CardId,
    title: Option<String>,
    content: Option<String>,
) -> Result<CardEdited> {
    if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(Error::InvalidInput("Card title cannot be empty".to_string()));
    }
    let storage = Storage::open(data_dir)?;
    let config = resolve_config(&storage, overrides)?;
    let card = storage.get_card(id)?;
    let before = card.text();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let storage = Arc::new(Mutex::new(storage));
    let mut events = vec![EditorEvent::Load(card)];
    events.extend(title.map(EditorEvent::Title));
    events.extend(content.map(EditorEvent::Content));

    let card = runtime.block_on(edit_with_autosave(
        storage,
        AutosaveController::new(config.autosave_delay()),
        events,
    ))?;
    Ok(CardEdited {
        saved: card.text() != before,
        id: card.id,
        title: card.title,
        content: card.content,
    })
}

async fn edit_with_autosave(
    storage: Arc<Mutex<Storage>>,
    controller: AutosaveController,
    events: Vec<EditorEvent>,
) -> Result<Card> {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.send(event)
            .await
            .map_err(|_| Error::Other("autosave driver stopped".to_string()))?;
    }
    drop(tx);

    let controller = drive_autosave(controller, storage.clone(), rx).await?;
    let Some(card_id) = controller.card_id() else {
        return Err(Error::Other("no card loaded".to_string()));
    };
    if controller.is_dirty() {
        return Err(Error::Persistence(format!("Card {} was not saved", card_id)));
    }
    storage.lock().await.get_card(card_id)
}

#[derive(Serialize)]
pub struct CardDeleted {
    pub id: CardId,
}

impl CommandResult for CardDeleted {
    json_result!(CardDeleted);

    fn to_human(&self) -> String {
        format!("Deleted card #{}", self.id)
    }
}

pub fn card_delete(data_dir: &Path, id: CardId) -> Result<CardDeleted> {
    let mut storage = Storage::open(data_dir)?;
    storage.delete_card(id)?;
    Ok(CardDeleted { id })
}

#[derive(Serialize)]
pub struct CardLinks {
    pub id: CardId,
    pub outgoing: Vec<CardRef>,
    pub incoming: Vec<CardRef>,
    pub linked: Vec<CardRef>,
}

impl CommandResult for CardLinks {
    json_result!(CardLinks);

    fn to_human(&self) -> String {
        if self.linked.is_empty() {
            return format!("Card #{} has no linked cards.", self.id);
        }
        let list = |refs: &[CardRef]| -> String {
            refs.iter()
                .map(|r| format!("#{} {}", r.id, r.title))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut lines = vec![format!("Card #{}:", self.id)];
        if !self.outgoing.is_empty() {
            lines.push(format!("  mentions: {}", list(&self.outgoing)));
        }
        if !self.incoming.is_empty() {
            lines.push(format!("  mentioned by: {}", list(&self.incoming)));
        }
        lines.join("\n")
    }
}

pub fn card_links(data_dir: &Path, id: CardId) -> Result<CardLinks> {
    let storage = Storage::open(data_dir)?;
    let card = storage.get_card(id)?;
    let all = storage.load_all_cards()?;
    let refs = |cards: Vec<&Card>| cards.into_iter().map(CardRef::from).collect::<Vec<_>>();
    Ok(CardLinks {
        id,
        outgoing: refs(backlinks::outgoing(id, &all, &card.content)),
        incoming: refs(backlinks::incoming(id, &all)),
        linked: refs(backlinks::linked(id, &all, &card.content)),
    })
}

// === Boards ===

#[derive(Serialize)]
pub struct BoardCreated {
    pub id: BoardId,
    pub name: String,
}

impl CommandResult for BoardCreated {
    json_result!(BoardCreated);

    fn to_human(&self) -> String {
        format!("Created board #{} \"{}\"", self.id, self.name)
    }
}

pub fn board_create(data_dir: &Path, name: &str) -> Result<BoardCreated> {
    let mut storage = Storage::open(data_dir)?;
    let board = storage.create_board(name)?;
    Ok(BoardCreated {
        id: board.id,
        name: board.name,
    })
}

#[derive(Serialize)]
pub struct BoardSummary {
    #[serde(flatten)]
    pub board: Board,
    pub card_count: usize,
}

#[derive(Serialize)]
pub struct BoardList {
    pub boards: Vec<BoardSummary>,
    pub count: usize,
}

impl CommandResult for BoardList {
    json_result!(BoardList);

    fn to_human(&self) -> String {
        if self.boards.is_empty() {
            return "No boards.".to_string();
        }
        let mut lines = vec![format!("{} board(s):", self.count)];
        for summary in &self.boards {
            lines.push(format!(
                "  #{} {} ({} card(s))",
                summary.board.id, summary.board.name, summary.card_count
            ));
        }
        lines.join("\n")
    }
}

pub fn board_list(data_dir: &Path) -> Result<BoardList> {
    let storage = Storage::open(data_dir)?;
    let boards = storage
        .list_boards()?
        .into_iter()
        .map(|board| {
            let card_count = storage.count_board_cards(board.id)?;
            Ok(BoardSummary { board, card_count })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BoardList {
        count: boards.len(),
        boards,
    })
}

/// One card placed on a board.
#[derive(Serialize)]
pub struct Placement {
    pub card_id: CardId,
    pub title: String,
    pub x: i64,
    pub y: i64,
}

fn placements_of(session: &BoardSession) -> Vec<Placement> {
    session
        .cards()
        .iter()
        .map(|card| {
            let position = session.positions().snapshot(card.id);
            Placement {
                card_id: card.id,
                title: card.title.clone(),
                x: position.x,
                y: position.y,
            }
        })
        .collect()
}

fn format_placements(out: &mut String, placements: &[Placement]) {
    for p in placements {
        let _ = writeln!(out, "  #{} {} at ({}, {})", p.card_id, p.title, p.x, p.y);
    }
}

#[derive(Serialize)]
pub struct BoardShowResult {
    pub board: Board,
    pub cards: Vec<Placement>,
}

impl CommandResult for BoardShowResult {
    json_result!(BoardShowResult);

    fn to_human(&self) -> String {
        let mut out = format!("Board #{} {}\n", self.board.id, self.board.name);
        if self.cards.is_empty() {
            out.push_str("  (no cards)");
        } else {
            format_placements(&mut out, &self.cards);
        }
        out.trim_end().to_string()
    }
}

pub fn board_show(data_dir: &Path, overrides: &ConfigOverrides, id: BoardId) -> Result<BoardShowResult> {
    let storage = Storage::open(data_dir)?;
    let config = resolve_config(&storage, overrides)?;
    let session = BoardSession::load(&storage, id, config.gesture_config()?)?;
    Ok(BoardShowResult {
        cards: placements_of(&session),
        board: session.board().clone(),
    })
}

#[derive(Serialize)]
pub struct PlacementChanged {
    pub board_id: BoardId,
    pub card_id: CardId,
    pub placed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<GridPosition>,
}

impl CommandResult for PlacementChanged {
    json_result!(PlacementChanged);

    fn to_human(&self) -> String {
        match (self.placed, self.position) {
            (true, Some(position)) => format!(
                "Placed card #{} on board #{} at {}",
                self.card_id, self.board_id, position
            ),
            _ => format!("Removed card #{} from board #{}", self.card_id, self.board_id),
        }
    }
}

pub fn board_add(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    board_id: BoardId,
    card_id: CardId,
    position: Option<GridPosition>,
) -> Result<PlacementChanged> {
    let mut storage = Storage::open(data_dir)?;
    let config = resolve_config(&storage, overrides)?;
    let mut session = BoardSession::load(&storage, board_id, config.gesture_config()?)?;
    let card = storage.get_card(card_id)?;
    session.add_card(card, position, &mut storage)?;
    Ok(PlacementChanged {
        board_id,
        card_id,
        placed: true,
        position: Some(session.positions().snapshot(card_id)),
    })
}

pub fn board_remove(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    board_id: BoardId,
    card_id: CardId,
) -> Result<PlacementChanged> {
    let mut storage = Storage::open(data_dir)?;
    let config = resolve_config(&storage, overrides)?;
    let mut session = BoardSession::load(&storage, board_id, config.gesture_config()?)?;
    session.remove_card(card_id, &mut storage)?;
    Ok(PlacementChanged {
        board_id,
        card_id,
        placed: false,
        position: None,
    })
}

// === Gesture replay ===

/// A recorded interaction to run against a board.
///
/// ```json
/// {
///   "mode": "add",
///   "steps": [
///     {"op": "pointer", "phase": "down", "pointer_id": 1, "screen": {"x": 60, "y": 90},
///      "kind": {"device": "mouse", "button": "primary"}, "target": {"type": "card", "id": 7}},
///     {"op": "pointer", "phase": "up", "pointer_id": 1, "screen": {"x": 90, "y": 80},
///      "kind": {"device": "mouse", "button": "primary"}}
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    /// Interaction mode at the start of the script
    #[serde(default)]
    pub mode: InteractionMode,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

/// One scripted input.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayStep {
    Pointer(PointerEvent),
    Wheel { screen: Point, delta_y: f64 },
    Mode { mode: InteractionMode },
    Focus { card_id: CardId, screen: Size },
    ResetViewport,
}

impl ReplayScript {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Serialize)]
pub struct ReplayResult {
    pub board_id: BoardId,
    pub dry_run: bool,
    pub steps: usize,
    pub actions: Vec<GestureAction>,
    pub created: Vec<CardRef>,
    pub cards: Vec<Placement>,
    pub viewport: Viewport,
    pub mode: InteractionMode,
    pub gesture_state: &'static str,
    /// Notices still on screen when the script ended, newest first
    pub notices: Vec<Notice>,
    /// Active notices beyond the visible cap
    pub hidden_notices: usize,
}

impl ReplayResult {
    fn commits(&self) -> impl Iterator<Item = (CardId, GridPosition)> + '_ {
        self.actions.iter().filter_map(|action| match *action {
            GestureAction::CommitPosition { card_id, position } => Some((card_id, position)),
            _ => None,
        })
    }
}

impl CommandResult for ReplayResult {
    json_result!(ReplayResult);

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Replayed {} step(s) on board #{}{}",
            self.steps,
            self.board_id,
            if self.dry_run { " (dry run)" } else { "" }
        );
        for (card_id, position) in self.commits() {
            let _ = writeln!(out, "  moved #{} to {}", card_id, position);
        }
        for card in &self.created {
            let _ = writeln!(out, "  created #{} {}", card.id, card.title);
        }
        let _ = writeln!(
            out,
            "Viewport: offset ({:.1}, {:.1}) scale {:.3}",
            self.viewport.offset.x, self.viewport.offset.y, self.viewport.scale
        );
        if self.gesture_state != "idle" {
            let _ = writeln!(out, "Gesture still in progress: {}", self.gesture_state);
        }
        for notice in &self.notices {
            let _ = writeln!(out, "{} {}", notice.level.icon(), notice.message);
        }
        if self.hidden_notices > 0 {
            let _ = writeln!(out, "(+{} more notices)", self.hidden_notices);
        }
        let _ = writeln!(out, "Cards:");
        format_placements(&mut out, &self.cards);
        out.trim_end().to_string()
    }
}

/// Feed every step of `script` into `session`, collecting gesture actions.
pub fn run_script(
    session: &mut BoardSession,
    script: &ReplayScript,
    persistence: &mut dyn Persistence,
) -> Result<Vec<GestureAction>> {
    session.set_mode(script.mode);
    let mut actions = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        debug!(step = index, ?step, "replaying step");
        session.tick(Instant::now());
        match step {
            ReplayStep::Pointer(event) => actions.extend(session.handle_pointer(event, persistence)?),
            ReplayStep::Wheel { screen, delta_y } => {
                actions.extend(session.handle_wheel(*screen, *delta_y))
            }
            ReplayStep::Mode { mode } => session.set_mode(*mode),
            ReplayStep::Focus { card_id, screen } => session.focus_card(*card_id, *screen),
            ReplayStep::ResetViewport => session.reset_viewport(),
        }
    }
    Ok(actions)
}

fn replay_into(
    persistence: &mut dyn Persistence,
    board_id: BoardId,
    gestures: GestureConfig,
    script: &ReplayScript,
) -> Result<(BoardSession, Vec<GestureAction>, Vec<CardId>)> {
    let mut session = BoardSession::load(&*persistence, board_id, gestures)?;
    let initial = session.cards().iter().map(|card| card.id).collect();
    let actions = run_script(&mut session, script, persistence)?;
    Ok((session, actions, initial))
}

/// Replay a gesture script against a board.
///
/// With `dry_run` the board is copied into memory first and storage is left
/// untouched.
pub fn board_replay(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    board_id: BoardId,
    script_path: &Path,
    dry_run: bool,
) -> Result<ReplayResult> {
    let script = ReplayScript::from_path(script_path)?;
    let mut storage = Storage::open(data_dir)?;
    let config = resolve_config(&storage, overrides)?;
    let gestures = config.gesture_config()?;

    let (session, actions, initial) = if dry_run {
        let mut memory = MemoryStore::from_persistence(&storage, board_id)?;
        replay_into(&mut memory, board_id, gestures, &script)?
    } else {
        replay_into(&mut storage, board_id, gestures, &script)?
    };
    info!(
        board = %board_id,
        steps = script.steps.len(),
        actions = actions.len(),
        dry_run,
        "replay finished"
    );

    let created = session
        .cards()
        .iter()
        .filter(|card| !initial.contains(&card.id))
        .map(CardRef::from)
        .collect();

    Ok(ReplayResult {
        board_id,
        dry_run,
        steps: script.steps.len(),
        created,
        cards: placements_of(&session),
        viewport: *session.viewport(),
        mode: session.mode(),
        gesture_state: session.gesture_state().name(),
        notices: session.notices().visible().cloned().collect(),
        hidden_notices: session.notices().overflow_count,
        actions,
    })
}

// === Mentions ===

#[derive(Debug, Serialize)]
pub struct MentionCompletion {
    pub card_id: CardId,
    /// Whether an `@` run is open at the caret
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insertion_offset: Option<usize>,
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<Insertion>,
}

impl CommandResult for MentionCompletion {
    json_result!(MentionCompletion);

    fn to_human(&self) -> String {
        if let Some(inserted) = &self.inserted {
            return format!("{}\n(caret at {})", inserted.text, inserted.caret);
        }
        if !self.active {
            return "No mention at the caret.".to_string();
        }
        if self.candidates.is_empty() {
            return format!("No cards match \"{}\".", self.query.as_deref().unwrap_or(""));
        }
        let mut lines = vec![format!(
            "Candidates for \"@{}\":",
            self.query.as_deref().unwrap_or("")
        )];
        for (i, candidate) in self.candidates.iter().enumerate() {
            let marker = if i == 0 { ">" } else { " " };
            lines.push(format!("{} #{} {}", marker, candidate.id, candidate.title));
        }
        lines.join("\n")
    }
}

/// Evaluate the `@` popup for `text` with the caret at byte `caret` while
/// editing `card_id`, optionally selecting a candidate.
///
/// Nothing is saved; the rewritten text is returned.
pub fn mention_complete(
    data_dir: &Path,
    overrides: &ConfigOverrides,
    card_id: CardId,
    text: &str,
    caret: Option<usize>,
    select: Option<CardId>,
) -> Result<MentionCompletion> {
    let caret = caret.unwrap_or(text.len());
    if caret > text.len() || !text.is_char_boundary(caret) {
        return Err(Error::InvalidInput(format!(
            "Caret {} is not a character boundary of the text",
            caret
        )));
    }
    let storage = Storage::open(data_dir)?;
    let config = resolve_config(&storage, overrides)?;
    let mut editor = CardEditor::open(
        &storage,
        card_id,
        config.autosave_delay(),
        config.mention_config(),
    )?;

    let now = Instant::now();
    let session = editor.edit_content(text, caret, now, None).cloned();

    let inserted = match select {
        None => None,
        Some(target) => {
            if target == card_id {
                return Err(Error::InvalidInput(
                    "A card cannot mention itself".to_string(),
                ));
            }
            if session.is_none() {
                return Err(Error::InvalidInput(
                    "No mention is being typed at the caret".to_string(),
                ));
            }
            if !editor.select_mention(target, now) {
                return Err(Error::NotFound(format!("Card not found: {}", target)));
            }
            Some(Insertion {
                text: editor.text().content.clone(),
                caret: editor.caret(),
            })
        }
    };

    Ok(MentionCompletion {
        card_id,
        active: session.is_some(),
        query: session.as_ref().map(|s| s.query.clone()),
        insertion_offset: session.as_ref().map(|s| s.insertion_offset),
        candidates: session.map(|s| s.candidates).unwrap_or_default(),
        inserted,
    })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: ValueSource,
}

#[derive(Serialize)]
pub struct ConfigShow {
    pub entries: Vec<ConfigEntry>,
}

impl CommandResult for ConfigShow {
    json_result!(ConfigShow);

    fn to_human(&self) -> String {
        let width = self.entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
        self.entries
            .iter()
            .map(|e| format!("{:width$}  {:<10} ({})", e.key, e.value, e.source, width = width))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Show every effective setting and where it came from. Works before
/// `init`, in which case the data-dir layer is empty.
pub fn config_show(data_dir: &Path, overrides: &ConfigOverrides) -> Result<ConfigShow> {
    let resolved = if Storage::exists(data_dir)? {
        resolve_config(&Storage::open(data_dir)?, overrides)?
    } else {
        resolve_config_without_storage(overrides)?
    };
    Ok(ConfigShow {
        entries: resolved
            .entries()
            .into_iter()
            .map(|(key, value, source)| ConfigEntry { key, value, source })
            .collect(),
    })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub path: PathBuf,
    pub assignment: String,
}

impl CommandResult for ConfigSet {
    json_result!(ConfigSet);

    fn to_human(&self) -> String {
        format!("Set {} in {}", self.assignment, self.path.display())
    }
}

/// Write a `key=value` setting into the data-dir `config.kdl`.
///
/// The merged result is validated before anything is written.
pub fn config_set(data_dir: &Path, assignment: &str) -> Result<ConfigSet> {
    let storage = Storage::open(data_dir)?;
    let update = ConfigOverrides::new().with(assignment)?;
    let mut config: CorkConfig = storage.read_cork_config()?;
    config.merge(&update.config);
    // The system layer can still make the pair invalid (min above max).
    resolve_config(&storage, &ConfigOverrides { config: config.clone() })?;
    storage.write_cork_config(&config)?;
    Ok(ConfigSet {
        path: storage.config_kdl_path(),
        assignment: assignment.trim().to_string(),
    })
}
