//! Quantum City - a looping street micro-simulation for the browser
//!
//! Core modules:
//! - `sim`: Deterministic building blocks (geometry, input, actors, placement, tasks)
//! - `scene`: Boot, world and control-overlay scenes
//! - `channel`: Typed publish/subscribe channel shared by the scenes
//! - `lifecycle`: Mount, pause/resume/destroy and audio unlock
//! - `platform`: Host abstraction plus the browser implementation
//! - `config`: Tunables and mount options
//! - `demo`: Autopilot used by the headless binary

pub mod assets;
#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod channel;
pub mod config;
pub mod demo;
pub mod error;
pub mod lifecycle;
pub mod platform;
pub mod scene;
pub mod sim;

pub use assets::{AssetCatalog, AssetKey};
pub use channel::{CityEvent, EventChannel, Subscription, Topic};
pub use config::{CityConfig, MountOptions};
pub use error::{BootError, MountError};
pub use lifecycle::{CityHandle, mount};

use glam::Vec2;

/// Frame loop constants
pub mod consts {
    /// Fixed update step (60 Hz, in milliseconds)
    pub const FRAME_DT_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest wall-clock gap fed into the accumulator (tab switches etc.)
    pub const MAX_FRAME_GAP_MS: f32 = 100.0;

    /// Container size used when the host reports an empty element
    pub const DEFAULT_VIEWPORT_WIDTH: f32 = 960.0;
    pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 540.0;
}

/// Angle (radians) of the ray from `from` to `to`, screen coordinates (y down)
#[inline]
pub fn angle_between(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Linear interpolation between two scalars
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
