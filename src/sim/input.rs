//! Directional input: keyboard state plus the overlay's virtual buttons

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// One of the four walk directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Stable slot for fixed-size per-direction tables
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Unit step in screen space (y down)
    pub fn step(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Pressed state of the overlay's four buttons as seen by the world
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualInput {
    pressed: [bool; 4],
}

impl VirtualInput {
    /// Returns true when the stored state changed
    pub fn set(&mut self, direction: Direction, pressed: bool) -> bool {
        let slot = &mut self.pressed[direction.index()];
        if *slot == pressed {
            return false;
        }
        *slot = pressed;
        true
    }

    pub fn is_pressed(&self, direction: Direction) -> bool {
        self.pressed[direction.index()]
    }

    pub fn clear(&mut self) {
        self.pressed = [false; 4];
    }
}

/// Keys the world listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    W,
    A,
    S,
    D,
    Space,
    E,
}

impl Key {
    const COUNT: usize = 10;

    fn index(self) -> usize {
        self as usize
    }

    /// Map a DOM `KeyboardEvent.code`
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            "KeyW" => Key::W,
            "KeyA" => Key::A,
            "KeyS" => Key::S,
            "KeyD" => Key::D,
            "Space" => Key::Space,
            "KeyE" => Key::E,
            _ => return None,
        })
    }

    /// DOM `KeyboardEvent.code` of this key
    pub fn code(self) -> &'static str {
        match self {
            Key::ArrowUp => "ArrowUp",
            Key::ArrowDown => "ArrowDown",
            Key::ArrowLeft => "ArrowLeft",
            Key::ArrowRight => "ArrowRight",
            Key::W => "KeyW",
            Key::A => "KeyA",
            Key::S => "KeyS",
            Key::D => "KeyD",
            Key::Space => "Space",
            Key::E => "KeyE",
        }
    }

    /// Walk direction bound to this key (cursor keys and WASD)
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::ArrowUp | Key::W => Some(Direction::Up),
            Key::ArrowDown | Key::S => Some(Direction::Down),
            Key::ArrowLeft | Key::A => Some(Direction::Left),
            Key::ArrowRight | Key::D => Some(Direction::Right),
            Key::Space | Key::E => None,
        }
    }

    /// Space and E advance the narrative
    pub fn is_activation(self) -> bool {
        matches!(self, Key::Space | Key::E)
    }
}

/// Held keys plus "just pressed" edges since the last update
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    held: [bool; Key::COUNT],
    just_pressed: [bool; Key::COUNT],
}

impl KeyboardState {
    pub fn press(&mut self, key: Key) {
        let i = key.index();
        if !self.held[i] {
            self.just_pressed[i] = true;
        }
        self.held[i] = true;
    }

    pub fn release(&mut self, key: Key) {
        self.held[key.index()] = false;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    /// Whether any activation key went down since the last call; clears all edges
    pub fn take_activation(&mut self) -> bool {
        let hit = self.just_pressed[Key::Space.index()] || self.just_pressed[Key::E.index()];
        self.just_pressed = [false; Key::COUNT];
        hit
    }

    /// Whether a held key maps to `direction`
    fn holds(&self, direction: Direction) -> bool {
        [
            Key::ArrowUp,
            Key::ArrowDown,
            Key::ArrowLeft,
            Key::ArrowRight,
            Key::W,
            Key::A,
            Key::S,
            Key::D,
        ]
        .iter()
        .any(|&k| self.is_held(k) && k.direction() == Some(direction))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Sum of active directions; opposite inputs cancel out
pub fn input_vector(keys: &KeyboardState, virtual_input: &VirtualInput) -> Vec2 {
    Direction::ALL
        .iter()
        .filter(|&&d| keys.holds(d) || virtual_input.is_pressed(d))
        .map(|d| d.step())
        .sum()
}

/// Walk velocity: normalized input scaled by `walk_speed`, zero without input
pub fn walk_velocity(input: Vec2, walk_speed: f32) -> Vec2 {
    input.normalize_or_zero() * walk_speed
}
