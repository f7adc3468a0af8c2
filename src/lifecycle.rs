//! Scene lifecycle manager
//!
//! `mount` wires a `Host` to a fresh engine and returns a `CityHandle`. The
//! handle owns pause/resume/destroy, the fixed-step frame loop, audio unlock
//! and the routing of host input to the scenes.
//!
//! Scene status flow:
//! ```text
//! Pending --boot complete--> Starting --next frame--> Running <--> Paused
//!                                                         \          /
//!                                                          ShutDown
//! ```
//! A pause that arrives while a scene is still Pending/Starting is parked in
//! `pause_on_start` and applied when the scene reaches Running.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

use glam::Vec2;

use crate::assets::{AssetCatalog, AssetKey};
use crate::channel::{CityEvent, EventChannel, Status, Subscription, Topic};
use crate::config::{CityConfig, MountOptions, StatusCallback};
use crate::consts::{FRAME_DT_MS, MAX_FRAME_GAP_MS, MAX_SUBSTEPS};
use crate::error::MountError;
use crate::platform::{AudioState, Host, HostListener, Viewport};
use crate::scene::{
    BootProgress, BootSequence, BootState, OverlayScene, PointerId, Scene, SceneKey, SceneStatus,
    WorldEffect, WorldScene,
};
use crate::sim::Key;

/// A scene plus its run status
#[derive(Debug)]
struct SceneSlot<S> {
    status: SceneStatus,
    pause_on_start: bool,
    scene: Option<S>,
}

impl<S: Scene> SceneSlot<S> {
    fn pending() -> Self {
        Self {
            status: SceneStatus::Pending,
            pause_on_start: false,
            scene: None,
        }
    }

    fn start(&mut self, scene: S) {
        self.scene = Some(scene);
        self.status = SceneStatus::Starting;
    }

    fn pause(&mut self) {
        match self.status {
            SceneStatus::Pending | SceneStatus::Starting => self.pause_on_start = true,
            SceneStatus::Running => self.status = SceneStatus::Paused,
            SceneStatus::Paused | SceneStatus::ShutDown => {}
        }
    }

    fn resume(&mut self) {
        match self.status {
            SceneStatus::Pending | SceneStatus::Starting => self.pause_on_start = false,
            SceneStatus::Paused => self.status = SceneStatus::Running,
            SceneStatus::Running | SceneStatus::ShutDown => {}
        }
    }

    /// Starting -> Running (or Paused when a pause was parked)
    fn promote(&mut self) {
        if self.status == SceneStatus::Starting {
            self.status = if self.pause_on_start {
                SceneStatus::Paused
            } else {
                SceneStatus::Running
            };
            self.pause_on_start = false;
            log::debug!("{:?} scene {:?}", S::KEY, self.status);
        }
    }

    fn running(&mut self) -> Option<&mut S> {
        match self.status {
            SceneStatus::Running => self.scene.as_mut(),
            _ => None,
        }
    }

    /// Scene that still accepts input (running or paused)
    fn live(&mut self) -> Option<&mut S> {
        match self.status {
            SceneStatus::Running | SceneStatus::Paused | SceneStatus::Starting => {
                self.scene.as_mut()
            }
            _ => None,
        }
    }

    fn shutdown(&mut self) {
        if let Some(scene) = self.scene.as_mut() {
            scene.shutdown();
        }
        self.status = SceneStatus::ShutDown;
        self.pause_on_start = false;
    }

    fn pending_tasks(&self) -> usize {
        self.scene.as_ref().map_or(0, Scene::pending_tasks)
    }
}

/// Engine state behind a `CityHandle`
pub struct CityEngine<H: Host> {
    host: H,
    config: CityConfig,
    seed: u64,
    channel: EventChannel,
    boot: BootSequence,
    world: SceneSlot<WorldScene>,
    overlay: SceneSlot<OverlayScene>,
    viewport: Vec2,
    muted: bool,
    paused: bool,
    destroyed: bool,
    audio_unlocked: bool,
    listeners: BTreeSet<HostListener>,
    status_sub: Option<Subscription>,
    accumulator: f32,
}

impl<H: Host> CityEngine<H> {
    fn attach(&mut self, listener: HostListener) {
        if self.listeners.insert(listener) {
            self.host.attach(listener);
        }
    }

    fn detach(&mut self, listener: HostListener) {
        if self.listeners.remove(&listener) {
            self.host.detach(listener);
        }
    }

    fn pause(&mut self) {
        if self.destroyed || self.paused {
            return;
        }
        self.paused = true;
        self.world.pause();
        self.overlay.pause();
        log::info!("paused");
    }

    fn resume(&mut self) {
        if self.destroyed || !self.paused {
            return;
        }
        self.paused = false;
        self.world.resume();
        self.overlay.resume();
        log::info!("resumed");
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let listeners: Vec<HostListener> = self.listeners.iter().copied().collect();
        for listener in listeners {
            self.detach(listener);
        }
        if let Some(sub) = self.status_sub.take() {
            sub.dispose();
        }
        self.overlay.shutdown();
        self.world.shutdown();
        self.host.release();
        log::info!("destroyed");
    }

    fn start_scenes(&mut self) {
        let world_size = self.boot.world_size().unwrap_or(self.viewport);
        let world = WorldScene::new(
            self.config.clone(),
            world_size,
            self.viewport,
            self.seed,
            self.channel.clone(),
        );
        let overlay = OverlayScene::new(self.viewport, self.channel.clone());
        self.world.start(world);
        self.overlay.start(overlay);
        self.channel.publish_status(Status::Ready);
        log::info!("scenes starting (world {}x{})", world_size.x, world_size.y);
    }

    fn asset_loaded(&mut self, key: AssetKey, size: Option<Vec2>) {
        if self.destroyed {
            return;
        }
        if self.boot.asset_loaded(key, size) == BootProgress::Complete {
            self.start_scenes();
        }
    }

    fn asset_failed(&mut self, key: AssetKey, reason: &str) {
        if self.destroyed {
            return;
        }
        self.boot.asset_failed(key, reason, &self.channel);
    }

    /// Run whole fixed steps for `elapsed_ms` of wall time
    fn frame(&mut self, elapsed_ms: f32) -> u32 {
        if self.destroyed {
            return 0;
        }
        self.accumulator += elapsed_ms.clamp(0.0, MAX_FRAME_GAP_MS);
        let mut substeps = 0;
        while self.accumulator >= FRAME_DT_MS && substeps < MAX_SUBSTEPS {
            self.step();
            self.accumulator -= FRAME_DT_MS;
            substeps += 1;
        }
        substeps
    }

    fn step(&mut self) {
        self.world.promote();
        self.overlay.promote();

        if let Some(world) = self.world.running() {
            world.update(FRAME_DT_MS);
            let effects = world.take_effects();
            for effect in effects {
                match effect {
                    WorldEffect::PlaySound { asset, volume } if !self.muted => {
                        self.host.play_sound(asset, volume)
                    }
                    WorldEffect::PlaySound { .. } => {}
                }
            }
        }
        if let Some(overlay) = self.overlay.running() {
            overlay.update(FRAME_DT_MS);
        }
    }

    fn user_gesture(&mut self, trusted: bool) {
        if !trusted || self.audio_unlocked || self.destroyed {
            return;
        }
        match self.host.resume_audio() {
            AudioState::Running => self.audio_running(),
            state => log::debug!("audio still {state:?}; will retry on next gesture"),
        }
    }

    /// The audio context is running; the unlock listeners are no longer needed
    fn audio_running(&mut self) {
        if self.audio_unlocked || self.destroyed {
            return;
        }
        self.audio_unlocked = true;
        for listener in HostListener::UNLOCK {
            self.detach(listener);
        }
        log::info!("audio unlocked");
    }

    /// Held keys lose their keyups while the page is hidden or unfocused
    fn release_keys(&mut self) {
        if let Some(world) = self.world.live() {
            world.release_keys();
        }
    }

    fn resize(&mut self, viewport: Viewport) {
        if self.destroyed {
            return;
        }
        self.viewport = viewport.size();
        if let Some(world) = self.world.live() {
            world.resize(self.viewport);
        }
        if let Some(overlay) = self.overlay.live() {
            overlay.resize(self.viewport);
        }
    }

    fn scene_status(&self, key: SceneKey) -> SceneStatus {
        match key {
            SceneKey::Boot => match self.boot.state() {
                BootState::Idle => SceneStatus::Pending,
                BootState::Loading { .. } => SceneStatus::Running,
                BootState::Complete | BootState::Failed(_) => SceneStatus::ShutDown,
            },
            SceneKey::World => self.world.status,
            SceneKey::Overlay => self.overlay.status,
        }
    }

    fn drain_status(&self) -> Vec<String> {
        self.status_sub
            .as_ref()
            .map(|sub| {
                sub.drain()
                    .into_iter()
                    .filter_map(|event| match event {
                        CityEvent::Status(status) => Some(status.to_string()),
                        CityEvent::VirtualInput { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Create an engine inside `container`.
///
/// Fails fast with `MountError::MissingContainer` when there is no container;
/// nothing is attached or loaded in that case.
pub fn mount<H: Host>(
    mut host: H,
    container: Option<Viewport>,
    mut options: MountOptions,
) -> Result<CityHandle<H>, MountError> {
    let Some(container) = container else {
        log::error!("mount called without a container");
        return Err(MountError::MissingContainer);
    };

    let callback = options.on_status_change.take();
    let seed = options.seed.unwrap_or_else(|| host.random_seed());
    let channel = EventChannel::new();
    let status_sub = callback
        .is_some()
        .then(|| channel.subscribe(Topic::Status));
    let catalog = AssetCatalog::new(host.origin().as_deref(), &options.base_path);

    let mut engine = CityEngine {
        host,
        config: options.config,
        seed,
        channel,
        boot: BootSequence::new(catalog),
        world: SceneSlot::pending(),
        overlay: SceneSlot::pending(),
        viewport: container.size(),
        muted: options.mute,
        paused: false,
        destroyed: false,
        audio_unlocked: false,
        listeners: BTreeSet::new(),
        status_sub,
        accumulator: 0.0,
    };
    for listener in HostListener::ALL {
        engine.attach(listener);
    }
    let requests = engine.boot.start(&engine.channel);
    engine.host.load_assets(requests);
    log::info!("mounted (seed {seed}, muted {})", engine.muted);

    let handle = CityHandle {
        engine: Rc::new(RefCell::new(engine)),
        status_callback: Rc::new(RefCell::new(callback)),
    };
    handle.flush_status();
    Ok(handle)
}

/// Handle returned by `mount`; clones share the same engine
pub struct CityHandle<H: Host> {
    engine: Rc<RefCell<CityEngine<H>>>,
    status_callback: Rc<RefCell<Option<StatusCallback>>>,
}

impl<H: Host> Clone for CityHandle<H> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
            status_callback: Rc::clone(&self.status_callback),
        }
    }
}

/// Non-owning handle for host callbacks
pub struct WeakCityHandle<H: Host> {
    engine: Weak<RefCell<CityEngine<H>>>,
    status_callback: Weak<RefCell<Option<StatusCallback>>>,
}

impl<H: Host> Clone for WeakCityHandle<H> {
    fn clone(&self) -> Self {
        Self {
            engine: Weak::clone(&self.engine),
            status_callback: Weak::clone(&self.status_callback),
        }
    }
}

impl<H: Host> WeakCityHandle<H> {
    pub fn upgrade(&self) -> Option<CityHandle<H>> {
        Some(CityHandle {
            engine: self.engine.upgrade()?,
            status_callback: self.status_callback.upgrade()?,
        })
    }
}

impl<H: Host> CityHandle<H> {
    /// Run `f` on the engine, then deliver queued status messages. Calls made
    /// while the engine is already borrowed (re-entrant host callbacks) are
    /// dropped.
    fn with_engine<R: Default>(&self, f: impl FnOnce(&mut CityEngine<H>) -> R) -> R {
        let result = match self.engine.try_borrow_mut() {
            Ok(mut engine) => f(&mut engine),
            Err(_) => {
                log::warn!("re-entrant engine call ignored");
                R::default()
            }
        };
        self.flush_status();
        result
    }

    /// Deliver queued status messages. A call made from inside the callback
    /// leaves its messages queued; the outer flush picks them up.
    fn flush_status(&self) {
        let Ok(mut callback) = self.status_callback.try_borrow_mut() else {
            return;
        };
        let Some(callback) = callback.as_mut() else {
            return;
        };
        loop {
            let messages = match self.engine.try_borrow() {
                Ok(engine) => engine.drain_status(),
                Err(_) => return,
            };
            if messages.is_empty() {
                return;
            }
            for message in &messages {
                callback(message);
            }
        }
    }

    pub fn downgrade(&self) -> WeakCityHandle<H> {
        WeakCityHandle {
            engine: Rc::downgrade(&self.engine),
            status_callback: Rc::downgrade(&self.status_callback),
        }
    }

    // === Lifecycle ===

    /// Freeze world and overlay (never the boot loader). Idempotent.
    pub fn pause(&self) {
        self.with_engine(CityEngine::pause);
    }

    /// Undo `pause` for scenes that were actually paused. Idempotent.
    pub fn resume(&self) {
        self.with_engine(CityEngine::resume);
    }

    /// Terminal: detach every listener, shut the scenes down, release the host
    pub fn destroy(&self) {
        self.with_engine(CityEngine::destroy);
    }

    pub fn is_destroyed(&self) -> bool {
        self.engine.try_borrow().map_or(true, |e| e.destroyed)
    }

    pub fn is_paused(&self) -> bool {
        self.engine.try_borrow().is_ok_and(|e| e.paused)
    }

    /// Document visibility changed
    pub fn page_visibility_changed(&self, hidden: bool) {
        if hidden {
            self.with_engine(CityEngine::release_keys);
            self.pause();
        } else {
            self.resume();
        }
    }

    /// The container scrolled in or out of view
    pub fn viewport_visibility_changed(&self, visible: bool) {
        if visible {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Advance by `elapsed_ms` of wall time; returns the fixed steps run
    pub fn frame(&self, elapsed_ms: f32) -> u32 {
        self.with_engine(|e| e.frame(elapsed_ms))
    }

    /// Any pointer/touch/key gesture; unlocks audio on the first trusted one
    pub fn user_gesture(&self, trusted: bool) {
        self.with_engine(|e| e.user_gesture(trusted));
    }

    /// The window lost focus
    pub fn focus_lost(&self) {
        self.with_engine(CityEngine::release_keys);
    }

    /// An earlier resume attempt finished with the context running
    pub fn audio_resumed(&self) {
        self.with_engine(CityEngine::audio_running);
    }

    pub fn resize(&self, viewport: Viewport) {
        self.with_engine(|e| e.resize(viewport));
    }

    pub fn set_muted(&self, muted: bool) {
        self.with_engine(|e| e.muted = muted);
    }

    // === Boot ===

    pub fn asset_loaded(&self, key: AssetKey, size: Option<Vec2>) {
        self.with_engine(|e| e.asset_loaded(key, size));
    }

    pub fn asset_failed(&self, key: AssetKey, reason: &str) {
        self.with_engine(|e| e.asset_failed(key, reason));
    }

    // === Input ===

    /// DOM `KeyboardEvent.code`; returns true when the key is one of ours
    pub fn key_down(&self, code: &str) -> bool {
        let Some(key) = Key::from_code(code) else {
            return false;
        };
        self.with_engine(|e| {
            if let Some(world) = e.world.live() {
                world.key_down(key);
            }
        });
        true
    }

    pub fn key_up(&self, code: &str) -> bool {
        let Some(key) = Key::from_code(code) else {
            return false;
        };
        self.with_engine(|e| {
            if let Some(world) = e.world.live() {
                world.key_up(key);
            }
        });
        true
    }

    /// Presses only land on a running overlay
    pub fn pointer_down(&self, pointer: PointerId, pos: Vec2) {
        self.with_engine(|e| {
            if let Some(overlay) = e.overlay.running() {
                overlay.pointer_down(pointer, pos);
            }
        });
    }

    pub fn pointer_move(&self, pointer: PointerId, pos: Vec2, is_down: bool) {
        self.with_engine(|e| {
            if let Some(overlay) = e.overlay.running() {
                overlay.pointer_move(pointer, pos, is_down);
            }
        });
    }

    /// Releases reach the overlay even while paused
    pub fn pointer_up(&self, pointer: PointerId) {
        self.with_engine(|e| {
            if let Some(overlay) = e.overlay.live() {
                overlay.pointer_up(pointer);
            }
        });
    }

    pub fn pointer_cancel(&self, pointer: PointerId) {
        self.with_engine(|e| {
            if let Some(overlay) = e.overlay.live() {
                overlay.pointer_cancel(pointer);
            }
        });
    }

    pub fn pointer_leave(&self, pointer: PointerId) {
        self.with_engine(|e| {
            if let Some(overlay) = e.overlay.live() {
                overlay.pointer_leave(pointer);
            }
        });
    }

    // === Inspection ===

    pub fn scene_status(&self, key: SceneKey) -> SceneStatus {
        self.engine
            .try_borrow()
            .map_or(SceneStatus::ShutDown, |e| e.scene_status(key))
    }

    /// Timers and tweens still scheduled across all scenes
    pub fn pending_tasks(&self) -> usize {
        self.engine
            .try_borrow()
            .map_or(0, |e| e.world.pending_tasks() + e.overlay.pending_tasks())
    }

    pub fn with_world<R>(&self, f: impl FnOnce(&WorldScene) -> R) -> Option<R> {
        let engine = self.engine.try_borrow().ok()?;
        engine.world.scene.as_ref().map(f)
    }

    pub fn with_overlay<R>(&self, f: impl FnOnce(&OverlayScene) -> R) -> Option<R> {
        let engine = self.engine.try_borrow().ok()?;
        engine.overlay.scene.as_ref().map(f)
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> Option<R> {
        let mut engine = self.engine.try_borrow_mut().ok()?;
        Some(f(&mut engine.host))
    }

    pub fn boot_state(&self) -> Option<BootState> {
        self.engine.try_borrow().ok().map(|e| e.boot.state().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HeadlessHost;

    fn mounted(options: MountOptions) -> (CityHandle<HeadlessHost>, HeadlessHost) {
        let host = HeadlessHost::new(7);
        let handle = mount(host.clone(), Some(Viewport::new(960.0, 540.0)), options).unwrap();
        (handle, host)
    }

    fn boot_all(handle: &CityHandle<HeadlessHost>) {
        for key in AssetKey::ALL {
            let size = (key == AssetKey::Backdrop).then(HeadlessHost::backdrop_size);
            handle.asset_loaded(key, size);
        }
    }

    #[test]
    fn test_mount_attaches_and_requests() {
        let (handle, host) = mounted(MountOptions::default());
        let log = host.log();
        assert_eq!(log.borrow().attached.len(), HostListener::ALL.len());
        assert_eq!(log.borrow().requests.len(), AssetKey::ALL.len());
        assert_eq!(handle.scene_status(SceneKey::Boot), SceneStatus::Running);
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Pending);
    }

    #[test]
    fn test_missing_container() {
        let err = mount(HeadlessHost::new(1), None, MountOptions::default()).err();
        assert_eq!(err, Some(MountError::MissingContainer));
    }

    #[test]
    fn test_starting_then_running() {
        let (handle, _) = mounted(MountOptions::default());
        boot_all(&handle);
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Starting);
        assert_eq!(handle.scene_status(SceneKey::Boot), SceneStatus::ShutDown);
        handle.frame(FRAME_DT_MS);
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Running);
        assert_eq!(handle.scene_status(SceneKey::Overlay), SceneStatus::Running);
        assert_eq!(
            handle.with_world(|w| w.bounds().size()),
            Some(HeadlessHost::backdrop_size())
        );
    }

    #[test]
    fn test_pause_parked_until_start() {
        let (handle, _) = mounted(MountOptions::default());
        handle.pause();
        boot_all(&handle);
        handle.frame(FRAME_DT_MS);
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Paused);
        handle.resume();
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Running);
    }

    #[test]
    fn test_pause_then_resume_same_frame_while_starting() {
        let (handle, _) = mounted(MountOptions::default());
        boot_all(&handle);
        handle.pause();
        handle.resume();
        handle.frame(FRAME_DT_MS);
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Running);
    }

    #[test]
    fn test_paused_world_does_not_advance() {
        let (handle, _) = mounted(MountOptions::default());
        boot_all(&handle);
        handle.frame(FRAME_DT_MS);
        handle.pause();
        let before = handle.with_world(|w| w.pending_tasks()).unwrap();
        for _ in 0..120 {
            handle.frame(FRAME_DT_MS);
        }
        assert_eq!(handle.with_world(|w| w.narrative()), Some(crate::scene::Narrative::Intro));
        assert_eq!(handle.with_world(|w| w.pending_tasks()), Some(before));
    }

    #[test]
    fn test_frame_caps_substeps() {
        let (handle, _) = mounted(MountOptions::default());
        boot_all(&handle);
        // The gap is clamped first, so a long stall runs a handful of steps
        let steps = handle.frame(5_000.0);
        assert!((5..=MAX_SUBSTEPS).contains(&steps));
        assert_eq!(handle.frame(-3.0), 0);
    }

    #[test]
    fn test_audio_unlock_retries_until_running() {
        let (handle, host) = mounted(MountOptions::default());
        let log = host.log();
        handle.user_gesture(false);
        assert_eq!(log.borrow().resume_calls, 0);
        handle.user_gesture(true);
        assert!(log.borrow().attached.contains(&HostListener::UnlockKeyDown));

        *host.audio_state().borrow_mut() = AudioState::Running;
        handle.user_gesture(true);
        let attached = log.borrow().attached.clone();
        for listener in HostListener::UNLOCK {
            assert!(!attached.contains(&listener));
        }
        assert!(attached.contains(&HostListener::PageVisibility));
        handle.user_gesture(true);
        assert_eq!(log.borrow().resume_calls, 2);
    }

    #[test]
    fn test_late_audio_resume_detaches_unlock_listeners() {
        let (handle, host) = mounted(MountOptions::default());
        let log = host.log();
        // Resume still pending when the gesture returns
        handle.user_gesture(true);
        assert!(log.borrow().attached.contains(&HostListener::UnlockPointerDown));

        handle.audio_resumed();
        let attached = log.borrow().attached.clone();
        for listener in HostListener::UNLOCK {
            assert!(!attached.contains(&listener));
        }
        handle.audio_resumed();
        handle.destroy();
        let detached = log.borrow().detached.len();
        assert_eq!(detached, HostListener::ALL.len());
    }

    #[test]
    fn test_status_from_nested_call_is_delivered() {
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let slot: Rc<RefCell<Option<WeakCityHandle<HeadlessHost>>>> = Rc::default();
        let (sink, inner) = (Rc::clone(&seen), Rc::clone(&slot));
        let options = MountOptions::default().with_status(move |m| {
            sink.borrow_mut().push(m.to_string());
            if m == Status::Ready.to_string() {
                let handle = inner.borrow().as_ref().and_then(WeakCityHandle::upgrade);
                if let Some(handle) = handle {
                    handle.with_engine(|e| {
                        e.channel.publish_status(Status::LoopCompleted { loops: 9 })
                    });
                }
            }
        });
        let (handle, _) = mounted(options);
        *slot.borrow_mut() = Some(handle.downgrade());
        boot_all(&handle);
        assert_eq!(
            seen.borrow().last(),
            Some(&Status::LoopCompleted { loops: 9 }.to_string())
        );
    }

    #[test]
    fn test_status_callback_receives_messages() {
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = Rc::clone(&seen);
        let (handle, _) =
            mounted(MountOptions::default().with_status(move |m| sink.borrow_mut().push(m.to_string())));
        assert_eq!(seen.borrow().as_slice(), [Status::Loading.to_string()]);
        boot_all(&handle);
        assert_eq!(seen.borrow().last(), Some(&Status::Ready.to_string()));
    }

    #[test]
    fn test_asset_failure_reported() {
        let seen = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = Rc::clone(&seen);
        let (handle, _) =
            mounted(MountOptions::default().with_status(move |m| sink.borrow_mut().push(m.to_string())));
        handle.asset_failed(AssetKey::Car, "network");
        assert_eq!(seen.borrow().last(), Some(&Status::LoadFailed.to_string()));
        assert!(matches!(handle.boot_state(), Some(BootState::Failed(_))));
        handle.asset_loaded(AssetKey::Backdrop, None);
        assert_eq!(handle.scene_status(SceneKey::World), SceneStatus::Pending);
    }

    #[test]
    fn test_muted_drops_sounds() {
        let (handle, host) = mounted(MountOptions {
            mute: true,
            ..MountOptions::default()
        });
        boot_all(&handle);
        for _ in 0..900 {
            handle.frame(FRAME_DT_MS);
        }
        assert!(handle.with_world(|w| w.completed_loops() == 0 && w.waiting_for_player().is_some()).unwrap());
        assert!(host.log().borrow().sounds.is_empty());
    }

    #[test]
    fn test_unmuted_plays_crash() {
        let (handle, host) = mounted(MountOptions {
            mute: false,
            ..MountOptions::default()
        });
        boot_all(&handle);
        for _ in 0..900 {
            handle.frame(FRAME_DT_MS);
        }
        assert_eq!(host.log().borrow().sounds, vec![(AssetKey::CrashSfx, 0.7)]);
    }
}
