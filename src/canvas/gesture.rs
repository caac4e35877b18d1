//! Pointer gesture state machine for the board canvas.
//!
//! A `GestureController` consumes pointer/touch events and classifies each
//! contact sequence as exactly one gesture: panning, pinch-zooming or dragging
//! a card. A down/up pair on empty canvas that never turned into a gesture is
//! reported as a click-to-create.
//!
//! The controller mutates the session's `Viewport` and `CardPositionStore`
//! directly (both are passed in by the caller) and returns `GestureAction`s for
//! everything that needs I/O. It never talks to persistence itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::positions::CardPositionStore;
use super::viewport::{Point, ScaleBounds, Viewport};
use crate::models::{CardId, GridPosition};

/// Default movement (in screen px) a press may wander and still count as a click.
pub const DEFAULT_CLICK_JITTER_PX: f64 = 4.0;

/// Default scale change per wheel delta unit.
pub const DEFAULT_WHEEL_ZOOM_STEP: f64 = 0.001;

/// Which tool the board is in. Chosen by the toolbar, not by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Primary button pans the canvas; cards are not draggable
    #[default]
    Pan,
    /// Primary button drags cards and clicks create cards; middle button pans
    Add,
}

/// Mouse button of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Input device behind a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "device", content = "button")]
pub enum PointerKind {
    Mouse(PointerButton),
    Touch,
}

/// What the pointer landed on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "id")]
pub enum PointerTarget {
    #[default]
    Canvas,
    Card(CardId),
}

/// Phase of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A single pointer or touch event in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub pointer_id: u32,
    pub screen: Point,
    pub kind: PointerKind,
    #[serde(default)]
    pub target: PointerTarget,
}

impl PointerEvent {
    pub fn down(pointer_id: u32, screen: Point, kind: PointerKind, target: PointerTarget) -> Self {
        Self {
            phase: PointerPhase::Down,
            pointer_id,
            screen,
            kind,
            target,
        }
    }

    pub fn moved(pointer_id: u32, screen: Point, kind: PointerKind) -> Self {
        Self {
            phase: PointerPhase::Move,
            pointer_id,
            screen,
            kind,
            target: PointerTarget::Canvas,
        }
    }

    pub fn up(pointer_id: u32, screen: Point, kind: PointerKind) -> Self {
        Self {
            phase: PointerPhase::Up,
            pointer_id,
            screen,
            kind,
            target: PointerTarget::Canvas,
        }
    }

    pub fn cancel(pointer_id: u32, kind: PointerKind) -> Self {
        Self {
            phase: PointerPhase::Cancel,
            pointer_id,
            screen: Point::default(),
            kind,
            target: PointerTarget::Canvas,
        }
    }

    fn is_touch(&self) -> bool {
        matches!(self.kind, PointerKind::Touch)
    }

    /// Touches behave as the primary button
    fn button(&self) -> PointerButton {
        match self.kind {
            PointerKind::Mouse(button) => button,
            PointerKind::Touch => PointerButton::Primary,
        }
    }
}

/// The one gesture currently in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    Panning {
        pointer_id: u32,
        anchor_screen: Point,
        anchor_offset: Point,
    },
    PinchZooming {
        pointers: (u32, u32),
        anchor_midpoint: Point,
        anchor_scale: f64,
        anchor_distance: f64,
        anchor_offset: Point,
    },
    DraggingCard {
        pointer_id: u32,
        card_id: CardId,
        anchor_world: Point,
        card_origin_world: Point,
    },
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, GestureState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Panning { .. } => "panning",
            GestureState::PinchZooming { .. } => "pinch-zooming",
            GestureState::DraggingCard { .. } => "dragging-card",
        }
    }
}

/// Side effects the session must carry out after an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GestureAction {
    /// Pan offset or scale changed; redraw
    ViewportChanged,
    /// A card's in-memory position changed (not yet persisted)
    CardMoved { card_id: CardId, position: Point },
    /// A drag ended; persist this rounded position
    CommitPosition {
        card_id: CardId,
        position: GridPosition,
    },
    /// A click on empty canvas in add mode; create a card here
    CreateAt { world: Point },
}

/// Tunables for the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    pub scale_bounds: ScaleBounds,
    pub click_jitter: f64,
    pub wheel_zoom_step: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            scale_bounds: ScaleBounds::default(),
            click_jitter: DEFAULT_CLICK_JITTER_PX,
            wheel_zoom_step: DEFAULT_WHEEL_ZOOM_STEP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingClick {
    pointer_id: u32,
    screen: Point,
}

/// Finite-state machine enforcing one active gesture at a time.
#[derive(Debug, Clone)]
pub struct GestureController {
    state: GestureState,
    mode: InteractionMode,
    config: GestureConfig,
    /// Touch contacts currently down, in arrival order
    touches: Vec<(u32, Point)>,
    pending_click: Option<PendingClick>,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            state: GestureState::Idle,
            mode: InteractionMode::default(),
            config,
            touches: Vec::new(),
            pending_click: None,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Switch tools. Takes effect for the next gesture.
    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
        self.pending_click = None;
    }

    /// Feed one pointer event through the state machine.
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        viewport: &mut Viewport,
        positions: &mut CardPositionStore,
    ) -> Vec<GestureAction> {
        match event.phase {
            PointerPhase::Down => self.on_down(event, viewport, positions),
            PointerPhase::Move => self.on_move(event, viewport, positions),
            PointerPhase::Up => self.on_up(event, viewport, positions),
            PointerPhase::Cancel => self.on_cancel(event, positions),
        }
    }

    /// Wheel zoom at the pointer. Ignored while a gesture is in progress.
    pub fn handle_wheel(
        &mut self,
        screen: Point,
        delta_y: f64,
        viewport: &mut Viewport,
    ) -> Vec<GestureAction> {
        if !self.state.is_idle() {
            return Vec::new();
        }
        let delta_scale = -delta_y * self.config.wheel_zoom_step;
        viewport.zoom_at(screen, delta_scale, &self.config.scale_bounds);
        vec![GestureAction::ViewportChanged]
    }

    fn transition(&mut self, next: GestureState) {
        debug!(from = self.state.name(), to = next.name(), "gesture transition");
        self.state = next;
    }

    fn on_down(
        &mut self,
        event: &PointerEvent,
        viewport: &Viewport,
        positions: &CardPositionStore,
    ) -> Vec<GestureAction> {
        if event.is_touch() {
            if !self.touches.iter().any(|(id, _)| *id == event.pointer_id) {
                self.touches.push((event.pointer_id, event.screen));
            }
            match self.touches.len() {
                1 => {}
                2 => {
                    self.try_start_pinch(viewport);
                    return Vec::new();
                }
                _ => return Vec::new(),
            }
        }

        if !self.state.is_idle() {
            debug!(
                state = self.state.name(),
                pointer = event.pointer_id,
                "ignoring pointer down during active gesture"
            );
            return Vec::new();
        }

        let button = event.button();
        match event.target {
            PointerTarget::Card(card_id) => {
                if self.mode == InteractionMode::Add && button == PointerButton::Primary {
                    self.pending_click = None;
                    self.transition(GestureState::DraggingCard {
                        pointer_id: event.pointer_id,
                        card_id,
                        anchor_world: viewport.screen_to_world(event.screen),
                        card_origin_world: positions.get(card_id),
                    });
                }
            }
            PointerTarget::Canvas => {
                let pans = match self.mode {
                    InteractionMode::Pan => button == PointerButton::Primary,
                    InteractionMode::Add => button == PointerButton::Middle,
                };
                if pans {
                    self.transition(GestureState::Panning {
                        pointer_id: event.pointer_id,
                        anchor_screen: event.screen,
                        anchor_offset: viewport.offset,
                    });
                } else if self.mode == InteractionMode::Add && button == PointerButton::Primary {
                    self.pending_click = Some(PendingClick {
                        pointer_id: event.pointer_id,
                        screen: event.screen,
                    });
                }
            }
        }
        Vec::new()
    }

    /// A second touch contact turns an idle or single-touch pan into a pinch.
    fn try_start_pinch(&mut self, viewport: &Viewport) {
        let can_supersede = match self.state {
            GestureState::Idle => true,
            GestureState::Panning { pointer_id, .. } => {
                self.touches.iter().any(|(id, _)| *id == pointer_id)
            }
            _ => false,
        };
        if !can_supersede {
            debug!(state = self.state.name(), "second touch ignored");
            return;
        }

        let (first_id, first) = self.touches[0];
        let (second_id, second) = self.touches[1];
        let distance = first.distance(&second);
        if distance <= f64::EPSILON {
            return;
        }

        self.pending_click = None;
        self.transition(GestureState::PinchZooming {
            pointers: (first_id, second_id),
            anchor_midpoint: first.midpoint(&second),
            anchor_scale: viewport.scale,
            anchor_distance: distance,
            anchor_offset: viewport.offset,
        });
    }

    fn on_move(
        &mut self,
        event: &PointerEvent,
        viewport: &mut Viewport,
        positions: &mut CardPositionStore,
    ) -> Vec<GestureAction> {
        if event.is_touch() {
            if let Some(contact) = self
                .touches
                .iter_mut()
                .find(|(id, _)| *id == event.pointer_id)
            {
                contact.1 = event.screen;
            }
        }

        if let Some(pending) = self.pending_click {
            if pending.pointer_id == event.pointer_id
                && pending.screen.distance(&event.screen) > self.config.click_jitter
            {
                self.pending_click = None;
            }
        }

        match self.state {
            GestureState::Idle => Vec::new(),
            GestureState::Panning {
                pointer_id,
                anchor_screen,
                anchor_offset,
            } => {
                if pointer_id != event.pointer_id {
                    return Vec::new();
                }
                viewport.offset = anchor_offset + (event.screen - anchor_screen);
                vec![GestureAction::ViewportChanged]
            }
            GestureState::DraggingCard {
                pointer_id,
                card_id,
                anchor_world,
                card_origin_world,
            } => {
                if pointer_id != event.pointer_id {
                    return Vec::new();
                }
                let world = viewport.screen_to_world(event.screen);
                let position = card_origin_world + (world - anchor_world);
                positions.set(card_id, position);
                vec![GestureAction::CardMoved { card_id, position }]
            }
            GestureState::PinchZooming {
                pointers,
                anchor_midpoint,
                anchor_scale,
                anchor_distance,
                anchor_offset,
            } => {
                if event.pointer_id != pointers.0 && event.pointer_id != pointers.1 {
                    return Vec::new();
                }
                let (Some(a), Some(b)) = (self.touch(pointers.0), self.touch(pointers.1)) else {
                    return Vec::new();
                };
                let ratio = a.distance(&b) / anchor_distance;

                // Re-derive from the pinch-start viewport every time so the
                // anchor never drifts.
                let mut next = Viewport {
                    offset: anchor_offset,
                    scale: anchor_scale,
                };
                next.zoom_to(
                    anchor_midpoint,
                    anchor_scale * ratio,
                    &self.config.scale_bounds,
                );
                *viewport = next;
                vec![GestureAction::ViewportChanged]
            }
        }
    }

    fn on_up(
        &mut self,
        event: &PointerEvent,
        viewport: &Viewport,
        positions: &CardPositionStore,
    ) -> Vec<GestureAction> {
        if event.is_touch() {
            self.touches.retain(|(id, _)| *id != event.pointer_id);
        }

        let mut actions = Vec::new();
        match self.state {
            GestureState::Idle => {}
            GestureState::Panning { pointer_id, .. } => {
                if pointer_id == event.pointer_id {
                    self.transition(GestureState::Idle);
                }
            }
            GestureState::DraggingCard {
                pointer_id,
                card_id,
                ..
            } => {
                if pointer_id == event.pointer_id {
                    self.transition(GestureState::Idle);
                    actions.push(GestureAction::CommitPosition {
                        card_id,
                        position: positions.snapshot(card_id),
                    });
                }
            }
            GestureState::PinchZooming { pointers, .. } => {
                // Lifting either finger ends the pinch; the remaining finger
                // does not resume panning.
                if event.pointer_id == pointers.0 || event.pointer_id == pointers.1 {
                    self.transition(GestureState::Idle);
                }
            }
        }

        if let Some(pending) = self.pending_click.take() {
            let still = pending.screen.distance(&event.screen) <= self.config.click_jitter;
            if pending.pointer_id == event.pointer_id && still && self.state.is_idle() {
                actions.push(GestureAction::CreateAt {
                    world: viewport.screen_to_world(pending.screen),
                });
            } else if pending.pointer_id != event.pointer_id {
                self.pending_click = Some(pending);
            }
        }

        actions
    }

    fn on_cancel(
        &mut self,
        event: &PointerEvent,
        positions: &mut CardPositionStore,
    ) -> Vec<GestureAction> {
        if event.is_touch() {
            self.touches.retain(|(id, _)| *id != event.pointer_id);
        }
        if self
            .pending_click
            .is_some_and(|p| p.pointer_id == event.pointer_id)
        {
            self.pending_click = None;
        }

        let mut actions = Vec::new();
        match self.state {
            GestureState::Idle => {}
            GestureState::Panning { pointer_id, .. } => {
                if pointer_id == event.pointer_id {
                    self.transition(GestureState::Idle);
                }
            }
            GestureState::DraggingCard {
                pointer_id,
                card_id,
                card_origin_world,
                ..
            } => {
                if pointer_id == event.pointer_id {
                    // Nothing will persist the optimistic value, so put the
                    // card back where persistence has it.
                    positions.set(card_id, card_origin_world);
                    actions.push(GestureAction::CardMoved {
                        card_id,
                        position: card_origin_world,
                    });
                    self.transition(GestureState::Idle);
                }
            }
            GestureState::PinchZooming { pointers, .. } => {
                if event.pointer_id == pointers.0 || event.pointer_id == pointers.1 {
                    self.transition(GestureState::Idle);
                }
            }
        }
        actions
    }

    fn touch(&self, pointer_id: u32) -> Option<Point> {
        self.touches
            .iter()
            .find(|(id, _)| *id == pointer_id)
            .map(|(_, p)| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoardId;

    const EPS: f64 = 1e-9;
    const MOUSE: PointerKind = PointerKind::Mouse(PointerButton::Primary);
    const MIDDLE: PointerKind = PointerKind::Mouse(PointerButton::Middle);
    const TOUCH: PointerKind = PointerKind::Touch;

    struct Rig {
        controller: GestureController,
        viewport: Viewport,
        positions: CardPositionStore,
    }

    impl Rig {
        fn new(mode: InteractionMode) -> Self {
            let mut controller = GestureController::default();
            controller.set_mode(mode);
            Self {
                controller,
                viewport: Viewport::default(),
                positions: CardPositionStore::new(BoardId(1)),
            }
        }

        fn send(&mut self, event: PointerEvent) -> Vec<GestureAction> {
            self.controller
                .handle(&event, &mut self.viewport, &mut self.positions)
        }
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn card_target(id: i64) -> PointerTarget {
        PointerTarget::Card(CardId(id))
    }

    #[test]
    fn test_pan_mode_primary_button_pans() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.viewport.offset = p(10.0, 10.0);

        rig.send(PointerEvent::down(1, p(100.0, 100.0), MOUSE, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "panning");

        let actions = rig.send(PointerEvent::moved(1, p(130.0, 80.0), MOUSE));
        assert_eq!(actions, vec![GestureAction::ViewportChanged]);
        assert_eq!(rig.viewport.offset, p(40.0, -10.0));

        // Offset is derived from the anchor, not accumulated per move.
        rig.send(PointerEvent::moved(1, p(130.0, 80.0), MOUSE));
        assert_eq!(rig.viewport.offset, p(40.0, -10.0));

        let actions = rig.send(PointerEvent::up(1, p(130.0, 80.0), MOUSE));
        assert!(actions.is_empty());
        assert!(rig.controller.state().is_idle());
    }

    #[test]
    fn test_add_mode_middle_button_pans() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MIDDLE, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "panning");
    }

    #[test]
    fn test_add_mode_primary_button_does_not_pan() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, PointerTarget::Canvas));
        assert!(rig.controller.state().is_idle());
        rig.send(PointerEvent::moved(1, p(50.0, 50.0), MOUSE));
        assert_eq!(rig.viewport, Viewport::default());
    }

    #[test]
    fn test_drag_card_commits_rounded_position() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.positions.set(CardId(7), p(50.0, 80.0));

        rig.send(PointerEvent::down(1, p(60.0, 90.0), MOUSE, card_target(7)));
        assert_eq!(rig.controller.state().name(), "dragging-card");

        let actions = rig.send(PointerEvent::moved(1, p(90.0, 80.0), MOUSE));
        assert_eq!(
            actions,
            vec![GestureAction::CardMoved {
                card_id: CardId(7),
                position: p(80.0, 70.0)
            }]
        );
        assert_eq!(rig.positions.get(CardId(7)), p(80.0, 70.0));

        let actions = rig.send(PointerEvent::up(1, p(90.0, 80.0), MOUSE));
        assert_eq!(
            actions,
            vec![GestureAction::CommitPosition {
                card_id: CardId(7),
                position: GridPosition::new(80, 70)
            }]
        );
        assert!(rig.controller.state().is_idle());
    }

    #[test]
    fn test_drag_uses_world_units_when_zoomed() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.viewport = Viewport::new(100.0, 50.0, 2.0);
        rig.positions.set(CardId(7), p(50.0, 80.0));

        rig.send(PointerEvent::down(1, p(300.0, 300.0), MOUSE, card_target(7)));
        rig.send(PointerEvent::moved(1, p(360.0, 280.0), MOUSE));

        let moved = rig.positions.get(CardId(7));
        assert!((moved.x - 80.0).abs() < EPS);
        assert!((moved.y - 70.0).abs() < EPS);
    }

    #[test]
    fn test_drag_there_and_back_restores_origin() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.positions.set(CardId(3), p(-20.0, 15.0));

        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, card_target(3)));
        rig.send(PointerEvent::moved(1, p(240.0, -75.0), MOUSE));
        rig.send(PointerEvent::moved(1, p(0.0, 0.0), MOUSE));
        let actions = rig.send(PointerEvent::up(1, p(0.0, 0.0), MOUSE));

        assert_eq!(rig.positions.get(CardId(3)), p(-20.0, 15.0));
        assert_eq!(
            actions,
            vec![GestureAction::CommitPosition {
                card_id: CardId(3),
                position: GridPosition::new(-20, 15)
            }]
        );
    }

    #[test]
    fn test_pan_mode_does_not_drag_cards() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, card_target(3)));
        assert!(rig.controller.state().is_idle());
    }

    #[test]
    fn test_second_pointer_is_ignored_while_dragging() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.positions.set(CardId(1), p(0.0, 0.0));

        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, card_target(1)));
        rig.send(PointerEvent::down(2, p(500.0, 500.0), MIDDLE, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "dragging-card");

        // Moves and ups from the intruder do nothing.
        assert!(rig.send(PointerEvent::moved(2, p(600.0, 600.0), MIDDLE)).is_empty());
        assert!(rig.send(PointerEvent::up(2, p(600.0, 600.0), MIDDLE)).is_empty());
        assert_eq!(rig.viewport, Viewport::default());
        assert_eq!(rig.controller.state().name(), "dragging-card");
    }

    #[test]
    fn test_cancel_drag_restores_origin_without_commit() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.positions.set(CardId(4), p(10.0, 10.0));

        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, card_target(4)));
        rig.send(PointerEvent::moved(1, p(100.0, 100.0), MOUSE));
        let actions = rig.send(PointerEvent::cancel(1, MOUSE));

        assert!(rig.controller.state().is_idle());
        assert!(!actions
            .iter()
            .any(|a| matches!(a, GestureAction::CommitPosition { .. })));
        assert_eq!(rig.positions.get(CardId(4)), p(10.0, 10.0));
    }

    #[test]
    fn test_click_on_empty_canvas_creates_in_add_mode() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.viewport = Viewport::new(100.0, 0.0, 2.0);

        rig.send(PointerEvent::down(1, p(300.0, 200.0), MOUSE, PointerTarget::Canvas));
        rig.send(PointerEvent::moved(1, p(302.0, 201.0), MOUSE));
        let actions = rig.send(PointerEvent::up(1, p(302.0, 201.0), MOUSE));

        assert_eq!(
            actions,
            vec![GestureAction::CreateAt {
                world: p(100.0, 100.0)
            }]
        );
    }

    #[test]
    fn test_click_beyond_jitter_does_not_create() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, PointerTarget::Canvas));
        rig.send(PointerEvent::moved(1, p(20.0, 0.0), MOUSE));
        let actions = rig.send(PointerEvent::up(1, p(0.0, 0.0), MOUSE));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_click_in_pan_mode_does_not_create() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, PointerTarget::Canvas));
        let actions = rig.send(PointerEvent::up(1, p(0.0, 0.0), MOUSE));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_pinch_zoom_scales_around_start_midpoint() {
        let mut rig = Rig::new(InteractionMode::Pan);

        rig.send(PointerEvent::down(1, p(100.0, 100.0), TOUCH, PointerTarget::Canvas));
        rig.send(PointerEvent::down(2, p(200.0, 100.0), TOUCH, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "pinch-zooming");

        let midpoint = p(150.0, 100.0);
        let world_before = rig.viewport.screen_to_world(midpoint);

        // Spread the fingers to 1.5x the distance.
        rig.send(PointerEvent::moved(1, p(75.0, 100.0), TOUCH));
        rig.send(PointerEvent::moved(2, p(225.0, 100.0), TOUCH));

        assert!((rig.viewport.scale - 1.5).abs() < EPS);
        let world_after = rig.viewport.screen_to_world(midpoint);
        assert!((world_before.x - world_after.x).abs() < EPS);
        assert!((world_before.y - world_after.y).abs() < EPS);
    }

    #[test]
    fn test_pinch_clamps_scale() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.send(PointerEvent::down(1, p(100.0, 100.0), TOUCH, PointerTarget::Canvas));
        rig.send(PointerEvent::down(2, p(110.0, 100.0), TOUCH, PointerTarget::Canvas));
        rig.send(PointerEvent::moved(2, p(1100.0, 100.0), TOUCH));
        assert!((rig.viewport.scale - 2.4).abs() < EPS);
    }

    #[test]
    fn test_pinch_supersedes_single_touch_pan() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), TOUCH, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "panning");
        rig.send(PointerEvent::down(2, p(100.0, 0.0), TOUCH, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "pinch-zooming");

        // Lifting one finger ends the pinch; the other does not resume panning.
        rig.send(PointerEvent::up(2, p(100.0, 0.0), TOUCH));
        assert!(rig.controller.state().is_idle());
        let before = rig.viewport;
        rig.send(PointerEvent::moved(1, p(50.0, 50.0), TOUCH));
        assert_eq!(rig.viewport, before);
    }

    #[test]
    fn test_touches_do_not_take_over_mouse_pan() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, PointerTarget::Canvas));
        rig.send(PointerEvent::down(2, p(10.0, 0.0), TOUCH, PointerTarget::Canvas));
        rig.send(PointerEvent::down(3, p(110.0, 0.0), TOUCH, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "panning");

        rig.send(PointerEvent::moved(1, p(20.0, 5.0), MOUSE));
        assert_eq!(rig.viewport.offset, p(20.0, 5.0));
    }

    #[test]
    fn test_second_touch_does_not_interrupt_card_drag() {
        let mut rig = Rig::new(InteractionMode::Add);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), TOUCH, card_target(9)));
        rig.send(PointerEvent::down(2, p(100.0, 0.0), TOUCH, PointerTarget::Canvas));
        assert_eq!(rig.controller.state().name(), "dragging-card");
    }

    #[test]
    fn test_wheel_zoom_in_keeps_point_under_cursor() {
        let mut rig = Rig::new(InteractionMode::Pan);
        let cursor = p(100.0, 100.0);
        let world_before = rig.viewport.screen_to_world(cursor);

        let actions = rig
            .controller
            .handle_wheel(cursor, -100.0, &mut rig.viewport);

        assert_eq!(actions, vec![GestureAction::ViewportChanged]);
        assert!(rig.viewport.scale > 1.0);
        let world_after = rig.viewport.screen_to_world(cursor);
        assert!((world_before.x - world_after.x).abs() < EPS);
        assert!((world_before.y - world_after.y).abs() < EPS);
    }

    #[test]
    fn test_wheel_ignored_during_gesture() {
        let mut rig = Rig::new(InteractionMode::Pan);
        rig.send(PointerEvent::down(1, p(0.0, 0.0), MOUSE, PointerTarget::Canvas));
        let actions = rig
            .controller
            .handle_wheel(p(0.0, 0.0), -100.0, &mut rig.viewport);
        assert!(actions.is_empty());
        assert!((rig.viewport.scale - 1.0).abs() < EPS);
    }

    #[test]
    fn test_pointer_event_deserializes_from_script_json() {
        let json = r#"{
            "phase": "down",
            "pointer_id": 1,
            "screen": {"x": 60.0, "y": 90.0},
            "kind": {"device": "mouse", "button": "primary"},
            "target": {"type": "card", "id": 7}
        }"#;
        let event: PointerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.phase, PointerPhase::Down);
        assert_eq!(event.kind, MOUSE);
        assert_eq!(event.target, card_target(7));

        let touch = r#"{"phase": "move", "pointer_id": 2, "screen": {"x": 0, "y": 0}, "kind": {"device": "touch"}}"#;
        let event: PointerEvent = serde_json::from_str(touch).unwrap();
        assert_eq!(event.kind, TOUCH);
        assert_eq!(event.target, PointerTarget::Canvas);
    }
}
