//! Debounced autosave of a card's title and body.
//!
//! [`AutosaveController`] is a clock-driven state machine: edits restart a
//! single trailing-edge deadline, [`AutosaveController::poll`] hands out a
//! [`SaveRequest`] once the deadline passes, and the caller reports the outcome
//! with `on_saved` / `on_failed`. The committed snapshot only moves on success.
//!
//! [`drive_autosave`] runs the controller on tokio time, the way an editor's
//! event loop would.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::schema::DEFAULT_AUTOSAVE_DELAY_MS;
use crate::models::{Card, CardId, CardText};
use crate::storage::Persistence;

/// Whether the editor is accepting edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    #[default]
    Edit,
    /// Rendered view: the buffer is kept but nothing is scheduled
    Preview,
}

/// What caused a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveTrigger {
    Debounce,
    Manual,
}

/// A snapshot to persist. Handed back to the controller with the outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub card_id: CardId,
    pub text: CardText,
    pub trigger: SaveTrigger,
    /// Issue order, so a late success never rolls `committed` back
    pub sequence: u64,
}

/// Buffered edits plus the last value known to be persisted.
#[derive(Debug, Clone)]
pub struct AutosaveController {
    delay: Duration,
    card_id: Option<CardId>,
    buffer: CardText,
    committed: CardText,
    deadline: Option<Instant>,
    mode: EditMode,
    next_sequence: u64,
    committed_sequence: u64,
}

impl Default for AutosaveController {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_AUTOSAVE_DELAY_MS))
    }
}

impl AutosaveController {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            card_id: None,
            buffer: CardText::default(),
            committed: CardText::default(),
            deadline: None,
            mode: EditMode::Edit,
            next_sequence: 1,
            committed_sequence: 0,
        }
    }

    /// Point the controller at `card`.
    ///
    /// A different card resets the buffer and cancels any pending save.
    /// Reloading the same card keeps unsaved edits. Returns whether a reset
    /// happened.
    pub fn load(&mut self, card: &Card) -> bool {
        if self.card_id == Some(card.id) {
            return false;
        }
        debug!(card = %card.id, "autosave target changed");
        self.card_id = Some(card.id);
        self.buffer = card.text();
        self.committed = card.text();
        self.deadline = None;
        self.committed_sequence = self.next_sequence.saturating_sub(1);
        true
    }

    pub fn card_id(&self) -> Option<CardId> {
        self.card_id
    }

    pub fn buffer(&self) -> &CardText {
        &self.buffer
    }

    pub fn committed(&self) -> &CardText {
        &self.committed
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer != self.committed
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn edit_title(&mut self, title: impl Into<String>, now: Instant) {
        self.buffer.title = title.into();
        self.after_mutation(now);
    }

    pub fn edit_content(&mut self, content: impl Into<String>, now: Instant) {
        self.buffer.content = content.into();
        self.after_mutation(now);
    }

    pub fn set_text(&mut self, text: CardText, now: Instant) {
        self.buffer = text;
        self.after_mutation(now);
    }

    /// Switch between editing and preview. Leaving preview with unsaved
    /// edits schedules a save.
    pub fn set_mode(&mut self, mode: EditMode, now: Instant) {
        self.mode = mode;
        match mode {
            EditMode::Preview => self.deadline = None,
            EditMode::Edit => self.after_mutation(now),
        }
    }

    fn after_mutation(&mut self, now: Instant) {
        if self.card_id.is_none() || self.mode == EditMode::Preview {
            return;
        }
        self.deadline = if self.is_dirty() {
            Some(now + self.delay)
        } else {
            None
        };
    }

    fn request(&mut self, trigger: SaveTrigger) -> Option<SaveRequest> {
        let card_id = self.card_id?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Some(SaveRequest {
            card_id,
            text: self.buffer.clone(),
            trigger,
            sequence,
        })
    }

    /// Emit the debounced save once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<SaveRequest> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.is_dirty() {
                    self.request(SaveTrigger::Debounce)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Save immediately, cancelling the pending timer. A clean buffer
    /// produces no request.
    pub fn save_now(&mut self) -> Option<SaveRequest> {
        self.deadline = None;
        if !self.is_dirty() {
            return None;
        }
        self.request(SaveTrigger::Manual)
    }

    /// Record a successful persist of `request`.
    pub fn on_saved(&mut self, request: &SaveRequest) {
        if self.card_id != Some(request.card_id) || request.sequence <= self.committed_sequence {
            return;
        }
        self.committed = request.text.clone();
        self.committed_sequence = request.sequence;
        if !self.is_dirty() {
            self.deadline = None;
        }
    }

    /// Record a failed persist. The buffer stays dirty; the next edit or a
    /// manual save tries again.
    pub fn on_failed(&mut self, request: &SaveRequest) {
        warn!(card = %request.card_id, trigger = ?request.trigger, "autosave failed");
    }
}

/// Input to [`drive_autosave`].
#[derive(Debug, Clone)]
pub enum EditorEvent {
    Title(String),
    Content(String),
    SaveNow,
    SetMode(EditMode),
    Load(Card),
}

/// Persist one request and feed the outcome back. Only an expired session
/// is returned as an error.
pub async fn execute_save<P: Persistence>(
    controller: &mut AutosaveController,
    persistence: &Mutex<P>,
    request: SaveRequest,
) -> Result<()> {
    let result = persistence
        .lock()
        .await
        .commit_card_text(request.card_id, &request.text);
    match result {
        Ok(_) => {
            info!(card = %request.card_id, trigger = ?request.trigger, "card text saved");
            controller.on_saved(&request);
            Ok(())
        }
        Err(e) if e.is_session_expired() => Err(e),
        Err(e) => {
            warn!(card = %request.card_id, error = %e, "card text save failed");
            controller.on_failed(&request);
            Ok(())
        }
    }
}

/// Run `controller` against an edit stream until the stream closes.
///
/// Any unsaved edits are flushed once when the stream ends. Returns the
/// controller so callers can inspect the final state.
pub async fn drive_autosave<P: Persistence>(
    mut controller: AutosaveController,
    persistence: Arc<Mutex<P>>,
    mut events: mpsc::Receiver<EditorEvent>,
) -> Result<AutosaveController> {
    loop {
        let deadline = controller.deadline();
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let now = Instant::now();
                match event {
                    EditorEvent::Title(title) => controller.edit_title(title, now),
                    EditorEvent::Content(content) => controller.edit_content(content, now),
                    EditorEvent::SetMode(mode) => controller.set_mode(mode, now),
                    EditorEvent::Load(card) => {
                        controller.load(&card);
                    }
                    EditorEvent::SaveNow => {
                        if let Some(request) = controller.save_now() {
                            execute_save(&mut controller, &persistence, request).await?;
                        }
                    }
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(request) = controller.poll(Instant::now()) {
                    execute_save(&mut controller, &persistence, request).await?;
                }
            }
        }
    }

    if let Some(request) = controller.save_now() {
        execute_save(&mut controller, &persistence, request).await?;
    }
    Ok(controller)
}
