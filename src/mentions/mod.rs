//! Inline mentions and backlinks.
//!
//! - `token` - the `@[[id|title]]` syntax: formatting, scanning, display segments
//! - `engine` - caret-driven `@` autocomplete sessions
//! - `backlinks` - outgoing/incoming/linked card queries

pub mod backlinks;
pub mod engine;
pub mod token;

pub use backlinks::{incoming, linked, outgoing};
pub use engine::{
    Candidate, CaretMeasure, CaretRect, Insertion, MentionConfig, MentionEngine, MentionSession,
    ScreenPosition, detect_trigger, find_candidates, place_popup,
};
pub use token::{MentionToken, Segment, format_token, outgoing_ids, scan, segments};
