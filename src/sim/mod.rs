//! Deterministic simulation building blocks
//!
//! Pure data and algorithms used by the scenes:
//! - Seeded RNG only (callers pass the generator in)
//! - Time advances only through explicit `dt`
//! - No rendering or platform dependencies

pub mod actors;
pub mod geometry;
pub mod input;
pub mod placement;
pub mod tasks;

pub use actors::{
    Camera, Cat, CatKey, CatState, GuidanceArrow, Hazard, HazardPhase, IllegalTransition, Player,
    Side,
};
pub use geometry::{Aabb, Bounds, Circle};
pub use input::{Direction, Key, KeyboardState, VirtualInput, input_vector, walk_velocity};
pub use placement::{Avoid, assign_position, choose_spawn_side, street_positions};
pub use tasks::{Ease, TaskId, TaskRegistry, Tween};
