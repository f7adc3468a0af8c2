//! Actors living in the world scene

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{Aabb, Bounds, Circle};
use super::tasks::TaskId;

/// The two persistent cat slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatKey {
    A,
    B,
}

impl CatKey {
    pub const ALL: [CatKey; 2] = [CatKey::A, CatKey::B];

    pub fn other(self) -> CatKey {
        match self {
            CatKey::A => CatKey::B,
            CatKey::B => CatKey::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            CatKey::A => 0,
            CatKey::B => 1,
        }
    }
}

impl fmt::Display for CatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatKey::A => write!(f, "A"),
            CatKey::B => write!(f, "B"),
        }
    }
}

/// Cat life cycle: hidden -> alive -> dead -> hidden -> ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatState {
    Hidden,
    Alive,
    Dead,
}

impl CatState {
    /// The only state reachable from `self`
    pub fn successor(self) -> CatState {
        match self {
            CatState::Hidden => CatState::Alive,
            CatState::Alive => CatState::Dead,
            CatState::Dead => CatState::Hidden,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cat {cat} cannot go from {from:?} to {to:?}")]
pub struct IllegalTransition {
    pub cat: CatKey,
    pub from: CatState,
    pub to: CatState,
}

/// One of the two cats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cat {
    pub key: CatKey,
    /// Street position the cat stands on (bottom-center anchor)
    pub position: Vec2,
    /// Index into the street position table, None before first placement
    pub position_index: Option<usize>,
    /// Proximity zone used to advance the narrative
    pub zone: Circle,
    state: CatState,
}

impl Cat {
    pub fn new(key: CatKey, position: Vec2, zone_radius: f32) -> Self {
        Self {
            key,
            position,
            position_index: None,
            zone: Circle::new(position, zone_radius),
            state: CatState::Hidden,
        }
    }

    pub fn state(&self) -> CatState {
        self.state
    }

    /// Move to `next`; re-entering the current state is a no-op (`Ok(false)`)
    pub fn set_state(&mut self, next: CatState) -> Result<bool, IllegalTransition> {
        if next == self.state {
            return Ok(false);
        }
        if self.state.successor() != next {
            return Err(IllegalTransition {
                cat: self.key,
                from: self.state,
                to: next,
            });
        }
        log::debug!("cat {}: {:?} -> {:?}", self.key, self.state, next);
        self.state = next;
        Ok(true)
    }

    /// Place on a street slot and rebuild the trigger zone around it
    pub fn place(&mut self, index: usize, position: Vec2) {
        self.position_index = Some(index);
        self.position = position;
        self.zone = Circle::new(position, self.zone.radius);
    }

    /// Physics body; only alive cats collide
    pub fn body(&self, size: Vec2) -> Option<Aabb> {
        (self.state == CatState::Alive).then(|| Aabb::from_bottom_center(self.position, size))
    }
}

/// Player avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub body: Vec2,
    /// Sprite mirrored (last horizontal input was leftward)
    pub facing_left: bool,
}

impl Player {
    pub fn new(pos: Vec2, body: Vec2) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            body,
            facing_left: false,
        }
    }

    /// Apply a walk velocity; facing only changes with horizontal input
    pub fn set_velocity(&mut self, vel: Vec2) {
        self.vel = vel;
        if vel.x != 0.0 {
            self.facing_left = vel.x < 0.0;
        }
    }

    /// Integrate and keep the body inside the world
    pub fn integrate(&mut self, dt_secs: f32, bounds: &Bounds) {
        self.pos = bounds.clamp_body(self.pos + self.vel * dt_secs, self.body);
    }
}

/// Side of the world a hazard enters from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// What the hazard is doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HazardPhase {
    /// Driving toward its target with an active collider
    Hunting,
    /// Collider removed; coasting off-screen while fading
    Exiting { tween: TaskId, start_x: f32, exit_x: f32 },
}

/// The car; at most one exists at a time
#[derive(Debug, Clone, PartialEq)]
pub struct Hazard {
    /// The cat this car's collider is bound to
    pub target: CatKey,
    pub from: Side,
    pub pos: Vec2,
    pub vel: Vec2,
    pub body: Vec2,
    pub alpha: f32,
    pub phase: HazardPhase,
}

impl Hazard {
    pub fn flip_x(&self) -> bool {
        self.from == Side::Right
    }

    /// Collider; gone once the hazard starts exiting
    pub fn collider(&self) -> Option<Aabb> {
        matches!(self.phase, HazardPhase::Hunting).then(|| Aabb::from_center(self.pos, self.body))
    }
}

/// Arrow pointing the player at the next cat
#[derive(Debug, Clone, Default)]
pub struct GuidanceArrow {
    pub target: Option<Vec2>,
    pub pos: Vec2,
    pub rotation: f32,
    pub alpha: f32,
    /// Opacity pulse tween while armed
    pub pulse: Option<TaskId>,
}

impl GuidanceArrow {
    pub fn visible(&self) -> bool {
        self.target.is_some()
    }
}

/// Camera following the player inside the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Top-left of the view in world coordinates
    pub scroll: Vec2,
    pub viewport: Vec2,
}

impl Camera {
    pub fn new(viewport: Vec2) -> Self {
        Self {
            scroll: Vec2::ZERO,
            viewport,
        }
    }

    /// Center on `target` with smoothing, never showing outside the world
    pub fn follow(&mut self, target: Vec2, lerp: f32, bounds: &Bounds) {
        let desired = target - self.viewport * 0.5;
        self.scroll += (desired - self.scroll) * lerp.clamp(0.0, 1.0);
        self.clamp(bounds);
    }

    /// Snap to `target` immediately
    pub fn center_on(&mut self, target: Vec2, bounds: &Bounds) {
        self.scroll = target - self.viewport * 0.5;
        self.clamp(bounds);
    }

    fn clamp(&mut self, bounds: &Bounds) {
        let max = (bounds.size() - self.viewport).max(Vec2::ZERO);
        self.scroll = self.scroll.clamp(Vec2::ZERO, max);
    }
}
