//! Scenes driven by the lifecycle manager
//!
//! - `boot`: loads the asset catalog, then hands over to the other two
//! - `world`: the street simulation
//! - `overlay`: on-screen direction buttons and narration mirror
//!
//! World and overlay never reference each other; they talk through the
//! `EventChannel` they are given at construction.

pub mod boot;
pub mod overlay;
pub mod world;

use glam::Vec2;

pub use boot::{BootProgress, BootSequence, BootState};
pub use overlay::{ButtonView, OverlayScene, PointerId, PressEdge, PressLedger};
pub use world::{LoopCounter, Narrative, WorldEffect, WorldScene, WorldSnapshot};

/// Scene identities, in update order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKey {
    Boot,
    World,
    Overlay,
}

/// Scene run state as seen by the lifecycle manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SceneStatus {
    /// Not created yet (boot still loading)
    Pending,
    /// Created; becomes running on the next frame
    Starting,
    Running,
    /// Frozen: no update, timers or tweens; still drawn
    Paused,
    ShutDown,
}

/// Common surface of the world and overlay scenes
pub trait Scene {
    const KEY: SceneKey;

    /// Advance one fixed step
    fn update(&mut self, dt_ms: f32);

    /// Viewport (container) size changed
    fn resize(&mut self, viewport: Vec2);

    /// Release subscriptions and cancel every pending task
    fn shutdown(&mut self);

    /// Timers and tweens still scheduled
    fn pending_tasks(&self) -> usize;
}
