//! Control overlay: four on-screen direction buttons plus the narration line
//!
//! Presses are tracked per pointer in a `PressLedger`. Only the first press
//! and the last release of a direction reach the channel, so several fingers
//! on one button produce a single `pressed = true` / `pressed = false` pair.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;

use super::{Scene, SceneKey};
use crate::channel::{CityEvent, EventChannel, Subscription, Topic};
use crate::sim::{Direction, Ease, TaskId, TaskRegistry, Tween};

/// Layout constants (px, ms)
pub mod layout {
    pub const BUTTON_RADIUS: f32 = 44.0;
    /// Side of the square hit zone around each button
    pub const HIT_SIZE: f32 = BUTTON_RADIUS * 2.0 + 6.0;
    /// Pad center offset from the bottom-right corner
    pub const PAD_INSET: (f32, f32) = (120.0, 140.0);
    pub const ARM: f32 = 76.0;

    pub const BOB_OFFSET: f32 = 4.0;
    pub const BOB_MS: f32 = 1800.0;
    pub const PRESS_SCALE: f32 = 1.12;
    pub const PRESS_MS: f32 = 120.0;
    pub const RELEASE_MS: f32 = 160.0;
    pub const IDLE_ALPHA: f32 = 0.58;
    pub const HOVER_ALPHA: f32 = 0.78;
    pub const HOVER_MS: f32 = 140.0;
}

/// Pointer identity; pointers without an id share one default key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PointerId {
    Id(i32),
    Default,
}

impl PointerId {
    pub fn from_raw(id: Option<i32>) -> Self {
        id.map_or(PointerId::Default, PointerId::Id)
    }
}

/// A direction's pressed bit flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressEdge {
    pub direction: Direction,
    pub pressed: bool,
}

/// Which pointers hold which direction; a direction is pressed iff its set
/// is non-empty. A pointer holds at most one direction.
#[derive(Debug, Clone, Default)]
pub struct PressLedger {
    holders: [BTreeSet<PointerId>; 4],
}

impl PressLedger {
    /// Direction currently held by `pointer`
    pub fn held_by(&self, pointer: PointerId) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| self.holders[d.index()].contains(&pointer))
    }

    /// `pointer` presses `direction`, leaving whatever it held before
    pub fn press(&mut self, direction: Direction, pointer: PointerId) -> Vec<PressEdge> {
        let mut edges = Vec::new();
        match self.held_by(pointer) {
            Some(current) if current == direction => return edges,
            Some(_) => edges.extend(self.release(pointer)),
            None => {}
        }
        let set = &mut self.holders[direction.index()];
        set.insert(pointer);
        if set.len() == 1 {
            edges.push(PressEdge {
                direction,
                pressed: true,
            });
        }
        edges
    }

    /// `pointer` lets go; an edge only when it was the last holder
    pub fn release(&mut self, pointer: PointerId) -> Option<PressEdge> {
        let direction = self.held_by(pointer)?;
        let set = &mut self.holders[direction.index()];
        set.remove(&pointer);
        set.is_empty().then_some(PressEdge {
            direction,
            pressed: false,
        })
    }

    pub fn is_pressed(&self, direction: Direction) -> bool {
        !self.holders[direction.index()].is_empty()
    }

    pub fn holders(&self, direction: Direction) -> usize {
        self.holders[direction.index()].len()
    }

    pub fn clear(&mut self) {
        self.holders.iter_mut().for_each(BTreeSet::clear);
    }
}

/// Resting value plus the tween currently driving it, if any
#[derive(Debug, Clone, Copy)]
struct Animated {
    rest: f32,
    tween: Option<TaskId>,
}

#[derive(Debug)]
struct Button {
    direction: Direction,
    center: Vec2,
    bob: Option<TaskId>,
    scale: Animated,
    alpha: Animated,
    hovered: bool,
}

/// What the presenter needs to draw one button
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonView {
    pub direction: Direction,
    pub center: Vec2,
    pub radius: f32,
    pub scale: f32,
    pub alpha: f32,
    pub pressed: bool,
}

pub struct OverlayScene {
    channel: EventChannel,
    status_sub: Option<Subscription>,
    status_message: String,
    tasks: TaskRegistry<()>,
    ledger: PressLedger,
    buttons: [Button; 4],
    /// Button each pointer is currently over
    hover: BTreeMap<PointerId, Direction>,
    viewport: Vec2,
    shut_down: bool,
}

impl OverlayScene {
    pub fn new(viewport: Vec2, channel: EventChannel) -> Self {
        let status_sub = Some(channel.subscribe(Topic::Status));
        let mut overlay = Self {
            channel,
            status_sub,
            status_message: String::new(),
            tasks: TaskRegistry::new(),
            ledger: PressLedger::default(),
            buttons: Direction::ALL.map(|direction| Button {
                direction,
                center: Vec2::ZERO,
                bob: None,
                scale: Animated {
                    rest: 1.0,
                    tween: None,
                },
                alpha: Animated {
                    rest: layout::IDLE_ALPHA,
                    tween: None,
                },
                hovered: false,
            }),
            hover: BTreeMap::new(),
            viewport,
            shut_down: false,
        };
        overlay.layout_buttons();
        overlay
    }

    /// Latest narration text
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn ledger(&self) -> &PressLedger {
        &self.ledger
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    fn value(&self, animated: Animated) -> f32 {
        animated
            .tween
            .and_then(|id| self.tasks.tween_value(id))
            .unwrap_or(animated.rest)
    }

    pub fn buttons(&self) -> Vec<ButtonView> {
        self.buttons
            .iter()
            .map(|b| {
                let bob = b.bob.and_then(|id| self.tasks.tween_value(id)).unwrap_or(0.0);
                ButtonView {
                    direction: b.direction,
                    center: b.center + Vec2::new(0.0, bob),
                    radius: layout::BUTTON_RADIUS,
                    scale: self.value(b.scale),
                    alpha: self.value(b.alpha),
                    pressed: self.ledger.is_pressed(b.direction),
                }
            })
            .collect()
    }

    fn layout_buttons(&mut self) {
        let pad = Vec2::new(
            self.viewport.x - layout::PAD_INSET.0,
            self.viewport.y - layout::PAD_INSET.1,
        );
        for i in 0..self.buttons.len() {
            let direction = self.buttons[i].direction;
            if let Some(old) = self.buttons[i].bob.take() {
                self.tasks.cancel(old);
            }
            let bob = self.tasks.tween(
                Tween::new(0.0, layout::BOB_OFFSET, layout::BOB_MS)
                    .with_ease(Ease::SineInOut)
                    .yoyo()
                    .forever(),
                None,
            );
            self.tasks.set_paused(bob, self.ledger.is_pressed(direction));
            let button = &mut self.buttons[i];
            button.center = pad + direction.step() * layout::ARM;
            button.bob = Some(bob);
        }
    }

    /// Button whose hit square contains `pos`, nearest center first
    pub fn hit_test(&self, pos: Vec2) -> Option<Direction> {
        let half = layout::HIT_SIZE / 2.0;
        self.buttons
            .iter()
            .filter(|b| {
                let d = (pos - b.center).abs();
                d.x <= half && d.y <= half
            })
            .min_by(|a, b| {
                a.center
                    .distance_squared(pos)
                    .total_cmp(&b.center.distance_squared(pos))
            })
            .map(|b| b.direction)
    }

    // === Pointer input ===

    pub fn pointer_down(&mut self, pointer: PointerId, pos: Vec2) {
        if self.shut_down {
            return;
        }
        let over = self.track_hover(pointer, pos);
        if let Some(direction) = over {
            self.press(direction, pointer);
        }
    }

    /// Entering a button while held presses it (moving the pointer's press)
    pub fn pointer_move(&mut self, pointer: PointerId, pos: Vec2, is_down: bool) {
        if self.shut_down {
            return;
        }
        let before = self.hover.get(&pointer).copied();
        let over = self.track_hover(pointer, pos);
        if is_down && over.is_some() && over != before {
            if let Some(direction) = over {
                self.press(direction, pointer);
            }
        }
    }

    pub fn pointer_up(&mut self, pointer: PointerId) {
        self.release_pointer(pointer);
    }

    pub fn pointer_cancel(&mut self, pointer: PointerId) {
        self.release_pointer(pointer);
        self.set_hover(pointer, None);
    }

    /// Pointer left the game canvas
    pub fn pointer_leave(&mut self, pointer: PointerId) {
        self.release_pointer(pointer);
        self.set_hover(pointer, None);
    }

    fn press(&mut self, direction: Direction, pointer: PointerId) {
        for edge in self.ledger.press(direction, pointer) {
            self.apply_edge(edge);
        }
    }

    fn release_pointer(&mut self, pointer: PointerId) {
        if self.shut_down {
            return;
        }
        if let Some(edge) = self.ledger.release(pointer) {
            self.apply_edge(edge);
        }
    }

    fn apply_edge(&mut self, edge: PressEdge) {
        let (target, ms) = if edge.pressed {
            (layout::PRESS_SCALE, layout::PRESS_MS)
        } else {
            (1.0, layout::RELEASE_MS)
        };
        let i = edge.direction.index();
        let from = if edge.pressed {
            1.0
        } else {
            self.value(self.buttons[i].scale)
        };
        if let Some(bob) = self.buttons[i].bob {
            self.tasks.set_paused(bob, edge.pressed);
        }
        let current = self.buttons[i].scale;
        self.buttons[i].scale = self.animate(current, from, target, ms, Ease::SineOut);

        self.channel.publish(CityEvent::VirtualInput {
            direction: edge.direction,
            pressed: edge.pressed,
        });
    }

    fn animate(&mut self, current: Animated, from: f32, to: f32, ms: f32, ease: Ease) -> Animated {
        if let Some(old) = current.tween {
            self.tasks.cancel(old);
        }
        let tween = self
            .tasks
            .tween(Tween::new(from, to, ms).with_ease(ease), None);
        Animated {
            rest: to,
            tween: Some(tween),
        }
    }

    fn track_hover(&mut self, pointer: PointerId, pos: Vec2) -> Option<Direction> {
        let over = self.hit_test(pos);
        self.set_hover(pointer, over);
        over
    }

    fn set_hover(&mut self, pointer: PointerId, over: Option<Direction>) {
        match over {
            Some(direction) => self.hover.insert(pointer, direction),
            None => self.hover.remove(&pointer),
        };
        for i in 0..self.buttons.len() {
            let direction = self.buttons[i].direction;
            let hovered = self.hover.values().any(|&d| d == direction);
            if hovered == self.buttons[i].hovered {
                continue;
            }
            self.buttons[i].hovered = hovered;
            let (to, ease) = if hovered {
                (layout::HOVER_ALPHA, Ease::SineOut)
            } else {
                (layout::IDLE_ALPHA, Ease::SineIn)
            };
            let current = self.buttons[i].alpha;
            let from = self.value(current);
            self.buttons[i].alpha = self.animate(current, from, to, layout::HOVER_MS, ease);
        }
    }
}

impl Scene for OverlayScene {
    const KEY: SceneKey = SceneKey::Overlay;

    fn update(&mut self, dt_ms: f32) {
        if self.shut_down {
            return;
        }
        if let Some(sub) = &self.status_sub {
            for event in sub.drain() {
                if let CityEvent::Status(status) = event {
                    self.status_message = status.to_string();
                }
            }
        }
        self.tasks.advance(dt_ms);
    }

    fn resize(&mut self, viewport: Vec2) {
        self.viewport = viewport;
        if !self.shut_down {
            self.layout_buttons();
        }
    }

    /// Force every direction off, whatever the ledger holds
    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Some(sub) = self.status_sub.take() {
            sub.dispose();
        }
        for direction in Direction::ALL {
            self.channel.publish(CityEvent::VirtualInput {
                direction,
                pressed: false,
            });
        }
        self.ledger.clear();
        self.hover.clear();
        let cancelled = self.tasks.cancel_all();
        for button in &mut self.buttons {
            button.bob = None;
            button.scale = Animated {
                rest: 1.0,
                tween: None,
            };
            button.hovered = false;
        }
        log::debug!("overlay shut down ({cancelled} tasks cancelled)");
    }

    fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }
}
