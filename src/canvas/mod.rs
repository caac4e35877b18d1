//! Spatial canvas engine.
//!
//! - `viewport` - screen/world transform, anchored zoom, pan
//! - `gesture` - pointer/touch state machine (pan, pinch, drag, click-to-create)
//! - `positions` - optimistic per-card world positions for one board

pub mod gesture;
pub mod positions;
pub mod viewport;

pub use gesture::{
    GestureAction, GestureConfig, GestureController, GestureState, InteractionMode,
    PointerButton, PointerEvent, PointerKind, PointerPhase, PointerTarget,
};
pub use positions::CardPositionStore;
pub use viewport::{Point, ScaleBounds, Size, Viewport};
