//! Session-scoped owners of engine state.
//!
//! A [`BoardSession`] is created per open board and a [`CardEditor`] per open
//! editor; neither is global. Both execute their engines' requests against a
//! [`Persistence`](crate::storage::Persistence) collaborator and turn
//! recoverable failures into notices.

pub mod board;
pub mod editor;

pub use board::{BoardSession, NEW_CARD_TITLE};
pub use editor::CardEditor;
