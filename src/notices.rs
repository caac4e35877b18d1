//! Transient user-visible notices.
//!
//! Non-fatal outcomes (a position or text commit that did not go through, a
//! card created on the canvas) surface here instead of interrupting the
//! session. Notices auto-expire and only a few are visible at once.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Maximum number of notices displayed at once
const MAX_VISIBLE_NOTICES: usize = 3;

/// Default auto-dismiss duration in seconds
const DEFAULT_DISMISS_SECONDS: u64 = 5;

/// Notice level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
}

impl NoticeLevel {
    /// Get icon/prefix for this level
    pub fn icon(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "✓",
            NoticeLevel::Warning => "⚠",
        }
    }
}

/// A single notice
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip)]
    pub created_at: Instant,
    #[serde(skip)]
    pub duration: Duration,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.duration
    }
}

/// Active notices owned by one session.
#[derive(Debug)]
pub struct NoticeBoard {
    /// Active notices (newest first)
    notices: VecDeque<Notice>,
    next_id: u64,
    /// Count of notices not displayed because of the visible cap
    pub overflow_count: usize,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self {
            notices: VecDeque::new(),
            next_id: 1,
            overflow_count: 0,
        }
    }

    /// Post a notice that expires after the default duration. Returns its ID.
    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notices.push_front(Notice {
            id,
            level,
            message: message.into(),
            created_at: Instant::now(),
            duration: Duration::from_secs(DEFAULT_DISMISS_SECONDS),
        });
        self.update_overflow();
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.notify(NoticeLevel::Success, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> u64 {
        self.notify(NoticeLevel::Warning, message)
    }

    /// Drop expired notices
    pub fn cleanup(&mut self, now: Instant) {
        self.notices.retain(|n| !n.is_expired(now));
        self.update_overflow();
    }

    /// Notices to display, newest first
    pub fn visible(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().take(MAX_VISIBLE_NOTICES)
    }

    /// All active notices, newest first
    pub fn active(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn has_notices(&self) -> bool {
        !self.notices.is_empty()
    }

    fn update_overflow(&mut self) {
        self.overflow_count = self.notices.len().saturating_sub(MAX_VISIBLE_NOTICES);
    }
}
