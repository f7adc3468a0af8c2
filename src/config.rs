//! Simulation tunables and mount options
//!
//! Every number the narrative depends on lives in `CityConfig` so a host can
//! retune difficulty without touching the scenes.

use serde::{Deserialize, Serialize};

use crate::sim::CatKey;

/// Tunable simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    // === Player ===
    /// Walk speed (px/s)
    pub walk_speed: f32,
    /// Spawn point as a fraction of the world size
    pub player_start: (f32, f32),
    /// Physics body size (w, h)
    pub player_body: (f32, f32),
    /// Camera follow smoothing (0..1 per frame)
    pub camera_lerp: f32,

    // === Cats ===
    /// Minimum spread between the two cats when re-placing one of them
    pub min_cat_distance: f32,
    /// Trigger zone radius around cat A
    pub zone_radius_a: f32,
    /// Trigger zone radius around cat B
    pub zone_radius_b: f32,
    /// Alive cat body (w, h), anchored bottom-center on the street position
    pub cat_body: (f32, f32),

    // === Hazard ===
    /// Car speed (px/s)
    pub hazard_speed: f32,
    /// How far outside the world the car spawns
    pub hazard_spawn_margin: f32,
    /// How far outside the world the car coasts after a hit
    pub hazard_exit_margin: f32,
    /// Exit fade duration (ms)
    pub hazard_exit_ms: f32,
    /// Probability of spawning on the "unnatural" side
    pub hazard_flip_probability: f64,
    /// Car body (w, h), centered on the car position
    pub hazard_body: (f32, f32),

    // === Timing (ms) ===
    /// Delay between the world starting and the first cycle
    pub intro_delay_ms: f32,
    /// Delay before the very first hazard launch
    pub first_hazard_delay_ms: f32,
    /// Delay before later hazard launches
    pub hazard_delay_ms: f32,
    /// Delay between reviving a cat and beginning its cycle
    pub revive_delay_ms: f32,

    // === Guidance arrow ===
    /// Vertical offset of the arrow from the player
    pub arrow_offset_y: f32,
    /// Half-period of the opacity pulse (ms)
    pub arrow_pulse_ms: f32,
    /// Opacity range of the pulse
    pub arrow_alpha: (f32, f32),

    // === Audio ===
    /// Crash sound volume (0.0 - 1.0)
    pub crash_volume: f32,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            walk_speed: 180.0,
            player_start: (0.18, 0.65),
            player_body: (28.0, 32.0),
            camera_lerp: 0.18,

            min_cat_distance: 260.0,
            zone_radius_a: 80.0,
            zone_radius_b: 92.0,
            cat_body: (32.0, 32.0),

            hazard_speed: 280.0,
            hazard_spawn_margin: 160.0,
            hazard_exit_margin: 220.0,
            hazard_exit_ms: 640.0,
            hazard_flip_probability: 0.3,
            hazard_body: (40.0, 18.0),

            intro_delay_ms: 450.0,
            first_hazard_delay_ms: 200.0,
            hazard_delay_ms: 420.0,
            revive_delay_ms: 420.0,

            arrow_offset_y: -48.0,
            arrow_pulse_ms: 520.0,
            arrow_alpha: (0.3, 1.0),

            crash_volume: 0.7,
        }
    }
}

impl CityConfig {
    /// Trigger zone radius for a cat slot
    pub fn zone_radius(&self, cat: CatKey) -> f32 {
        match cat {
            CatKey::A => self.zone_radius_a,
            CatKey::B => self.zone_radius_b,
        }
    }

    /// Parse a partial JSON override; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Receives every status message published while mounted
pub type StatusCallback = Box<dyn FnMut(&str)>;

/// Options accepted by `mount`
#[derive(Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MountOptions {
    /// Nearest-neighbour sprite scaling
    pub pixel_art: bool,
    /// Start with audio muted
    pub mute: bool,
    /// Canvas clear color
    pub background_color: String,
    /// Sub-path the page is served from (e.g. `/site/`)
    pub base_path: String,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
    /// Simulation tunables
    pub config: CityConfig,
    #[serde(skip)]
    pub on_status_change: Option<StatusCallback>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            pixel_art: true,
            mute: true,
            background_color: "#0c1220".to_string(),
            base_path: "/".to_string(),
            seed: None,
            config: CityConfig::default(),
            on_status_change: None,
        }
    }
}

impl std::fmt::Debug for MountOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountOptions")
            .field("pixel_art", &self.pixel_art)
            .field("mute", &self.mute)
            .field("background_color", &self.background_color)
            .field("base_path", &self.base_path)
            .field("seed", &self.seed)
            .field("on_status_change", &self.on_status_change.is_some())
            .finish_non_exhaustive()
    }
}

impl MountOptions {
    /// Attach a status callback
    pub fn with_status(mut self, callback: impl FnMut(&str) + 'static) -> Self {
        self.on_status_change = Some(Box::new(callback));
        self
    }
}
