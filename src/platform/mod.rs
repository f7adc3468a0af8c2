//! Platform abstraction layer
//!
//! The lifecycle manager only talks to the outside world through `Host`:
//! - Event listener registration (visibility, audio unlock, resize)
//! - Asset fetching (results come back through the handle)
//! - Audio context resume and sound playback
//! - Seeding and final teardown
//!
//! `headless` backs native builds and tests; `web` is the browser host.

pub mod headless;
#[cfg(target_arch = "wasm32")]
pub mod web;

use glam::Vec2;

use crate::assets::{AssetKey, AssetRequest};
use crate::consts::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};

pub use headless::{HeadlessHost, HostLog};

/// Listeners the lifecycle manager registers on the host page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostListener {
    /// Document visibility (tab hidden/shown)
    PageVisibility,
    /// One-shot audio unlock on the first trusted gesture
    UnlockPointerDown,
    UnlockTouchStart,
    UnlockKeyDown,
    /// Container / window resize
    Resize,
    /// Window lost focus; held keys will never see their keyup
    Blur,
}

impl HostListener {
    pub const ALL: [HostListener; 6] = [
        HostListener::PageVisibility,
        HostListener::UnlockPointerDown,
        HostListener::UnlockTouchStart,
        HostListener::UnlockKeyDown,
        HostListener::Resize,
        HostListener::Blur,
    ];

    pub const UNLOCK: [HostListener; 3] = [
        HostListener::UnlockPointerDown,
        HostListener::UnlockTouchStart,
        HostListener::UnlockKeyDown,
    ];

    /// DOM event name
    pub fn event_name(self) -> &'static str {
        match self {
            HostListener::PageVisibility => "visibilitychange",
            HostListener::UnlockPointerDown => "pointerdown",
            HostListener::UnlockTouchStart => "touchstart",
            HostListener::UnlockKeyDown => "keydown",
            HostListener::Resize => "resize",
            HostListener::Blur => "blur",
        }
    }
}

/// Audio context state after a resume attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Running,
    Suspended,
    /// No audio context could be created
    Unavailable,
}

/// Size of the container the city is mounted into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size in pixels; an unlaid-out (zero-sized) container gets the default
    pub fn size(&self) -> Vec2 {
        if self.width > 0.0 && self.height > 0.0 {
            Vec2::new(self.width, self.height)
        } else {
            Vec2::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT)
        }
    }
}

/// Everything the engine needs from its embedding
pub trait Host {
    /// Start delivering events for `listener`
    fn attach(&mut self, listener: HostListener);

    /// Stop delivering events for `listener`; unknown listeners are ignored
    fn detach(&mut self, listener: HostListener);

    /// Page origin used to resolve asset URLs, if any
    fn origin(&self) -> Option<String> {
        None
    }

    /// Fetch every request; results are reported back asynchronously
    fn load_assets(&mut self, requests: Vec<AssetRequest>);

    /// Try to resume a suspended audio context. A resume that settles later
    /// is reported through `CityHandle::audio_resumed`.
    fn resume_audio(&mut self) -> AudioState;

    fn play_sound(&mut self, asset: AssetKey, volume: f32);

    /// Seed for a mount without a fixed seed
    fn random_seed(&mut self) -> u64;

    /// Drop rendering and audio resources; called once, last, by `destroy`
    fn release(&mut self);
}
