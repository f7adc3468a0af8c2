//! End-to-end lifecycle scenarios against the headless host

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use quantum_city::channel::Status;
use quantum_city::consts::FRAME_DT_MS;
use quantum_city::demo::Autopilot;
use quantum_city::platform::{HeadlessHost, HostListener, Viewport};
use quantum_city::scene::{Narrative, PointerId, SceneKey, SceneStatus};
use quantum_city::sim::{CatKey, CatState, Direction, HazardPhase};
use quantum_city::{AssetKey, CityHandle, MountError, MountOptions, mount};

struct Harness {
    handle: CityHandle<HeadlessHost>,
    host: HeadlessHost,
    statuses: Rc<RefCell<Vec<String>>>,
}

fn harness(seed: u64) -> Harness {
    let statuses = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&statuses);
    let host = HeadlessHost::new(seed);
    let options = MountOptions {
        seed: Some(seed),
        ..MountOptions::default()
    }
    .with_status(move |m| sink.borrow_mut().push(m.to_string()));
    let handle = mount(host.clone(), Some(Viewport::new(960.0, 540.0)), options)
        .expect("mount with a container");
    Harness {
        handle,
        host,
        statuses,
    }
}

fn boot(handle: &CityHandle<HeadlessHost>) {
    for key in AssetKey::ALL {
        let size = (key == AssetKey::Backdrop).then(HeadlessHost::backdrop_size);
        handle.asset_loaded(key, size);
    }
}

/// Run frames until `done` or `max` frames pass
fn run_until(
    handle: &CityHandle<HeadlessHost>,
    max: usize,
    done: impl Fn(&CityHandle<HeadlessHost>) -> bool,
) -> bool {
    for _ in 0..max {
        if done(handle) {
            return true;
        }
        handle.frame(FRAME_DT_MS);
    }
    done(handle)
}

fn cat_state(handle: &CityHandle<HeadlessHost>, cat: CatKey) -> Option<CatState> {
    handle.with_world(|w| w.cat(cat).state())
}

#[test]
fn death_arrow_and_revive_cycle() {
    let h = harness(42);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);

    assert_eq!(cat_state(&h.handle, CatKey::A), Some(CatState::Alive));
    assert_eq!(cat_state(&h.handle, CatKey::B), Some(CatState::Hidden));
    let b_before = h.handle.with_world(|w| w.cat(CatKey::B).position).unwrap();

    // The car finds cat A on its own
    assert!(run_until(&h.handle, 1200, |h| cat_state(h, CatKey::A)
        == Some(CatState::Dead)));
    let (waiting, arrow_target, b_pos, b_index, a_index) = h
        .handle
        .with_world(|w| {
            (
                w.waiting_for_player(),
                w.arrow().target,
                w.cat(CatKey::B).position,
                w.cat(CatKey::B).position_index,
                w.cat(CatKey::A).position_index,
            )
        })
        .unwrap();
    assert_eq!(waiting, Some(CatKey::B));
    assert_eq!(arrow_target, Some(b_pos));
    assert_ne!(b_index, a_index);
    assert_ne!(b_pos, b_before, "B is re-placed after A's death");
    assert!(h.statuses.borrow().contains(
        &Status::CatDown {
            cat: CatKey::A,
            next: CatKey::B
        }
        .to_string()
    ));

    // Walk the player into B's zone
    let mut pilot = Autopilot::new();
    let reached = (0..2000).any(|_| {
        let changes = h.handle.with_world(|w| pilot.steer(w)).unwrap_or_default();
        for change in changes {
            if change.pressed {
                h.handle.key_down(change.key.code());
            } else {
                h.handle.key_up(change.key.code());
            }
        }
        h.handle.frame(FRAME_DT_MS);
        cat_state(&h.handle, CatKey::B) == Some(CatState::Alive)
    });
    assert!(reached);
    let (waiting, arrow_visible, narrative) = h
        .handle
        .with_world(|w| (w.waiting_for_player(), w.arrow().visible(), w.narrative()))
        .unwrap();
    assert_eq!(waiting, None);
    assert!(!arrow_visible);
    assert_eq!(narrative, Narrative::Reviving { cat: CatKey::B });

    // A new hazard is aimed at B
    assert!(run_until(&h.handle, 200, |h| {
        h.with_world(|w| {
            w.hazard()
                .is_some_and(|hz| hz.target == CatKey::B && hz.phase == HazardPhase::Hunting)
        })
        .unwrap_or(false)
    }));
}

#[test]
fn rapid_pause_resume_keeps_status() {
    let h = harness(1);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);
    for _ in 0..5 {
        h.handle.pause();
        h.handle.pause();
        h.handle.resume();
        h.handle.resume();
    }
    assert_eq!(h.handle.scene_status(SceneKey::World), SceneStatus::Running);
    assert_eq!(h.handle.scene_status(SceneKey::Overlay), SceneStatus::Running);

    h.handle.pause();
    h.handle.frame(FRAME_DT_MS);
    h.handle.resume();
    h.handle.pause();
    assert_eq!(h.handle.scene_status(SceneKey::World), SceneStatus::Paused);
    h.handle.resume();
    h.handle.frame(FRAME_DT_MS);
    assert_eq!(h.handle.scene_status(SceneKey::World), SceneStatus::Running);
}

#[test]
fn visibility_signals_pause_and_resume() {
    let h = harness(2);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);

    h.handle.page_visibility_changed(true);
    assert!(h.handle.is_paused());
    h.handle.page_visibility_changed(false);
    assert!(!h.handle.is_paused());

    h.handle.viewport_visibility_changed(false);
    assert_eq!(h.handle.scene_status(SceneKey::Overlay), SceneStatus::Paused);
    h.handle.viewport_visibility_changed(true);
    assert_eq!(h.handle.scene_status(SceneKey::Overlay), SceneStatus::Running);
}

#[test]
fn destroy_before_boot_leaves_nothing_behind() {
    let h = harness(3);
    h.handle.destroy();
    assert!(h.handle.is_destroyed());
    assert_eq!(h.handle.pending_tasks(), 0);

    // Late asset callbacks after destroy are ignored
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);
    assert_eq!(h.handle.pending_tasks(), 0);
    assert_eq!(h.handle.scene_status(SceneKey::World), SceneStatus::ShutDown);
    assert!(h.host.log().borrow().attached.is_empty());
}

#[test]
fn destroy_is_idempotent() {
    let h = harness(4);
    boot(&h.handle);
    for _ in 0..120 {
        h.handle.frame(FRAME_DT_MS);
    }
    h.handle.destroy();
    h.handle.destroy();
    h.handle.pause();
    h.handle.resume();

    let log = h.host.log();
    let log = log.borrow();
    assert_eq!(log.released, 1);
    assert_eq!(log.detached.len(), HostListener::ALL.len());
    assert!(log.attached.is_empty());
    assert_eq!(h.handle.pending_tasks(), 0);
    assert!(!h.handle.is_paused());
}

#[test]
fn destroy_after_audio_unlock_detaches_each_listener_once() {
    let h = harness(5);
    *h.host.audio_state().borrow_mut() = quantum_city::platform::AudioState::Running;
    h.handle.user_gesture(true);
    h.handle.destroy();
    let log = h.host.log();
    let log = log.borrow();
    let mut detached = log.detached.clone();
    detached.sort();
    detached.dedup();
    assert_eq!(detached.len(), log.detached.len());
    assert_eq!(detached.len(), HostListener::ALL.len());
}

#[test]
fn missing_container_creates_nothing() {
    let host = HeadlessHost::new(6);
    let log = host.log();
    let result = mount(host, None, MountOptions::default());
    assert!(matches!(result, Err(MountError::MissingContainer)));
    assert!(log.borrow().attached.is_empty());
    assert!(log.borrow().requests.is_empty());
}

#[test]
fn overlay_press_walks_and_release_survives_pause() {
    let h = harness(7);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);

    let right = h
        .handle
        .with_overlay(|o| {
            o.buttons()
                .into_iter()
                .find(|b| b.direction == Direction::Right)
                .map(|b| b.center)
        })
        .flatten()
        .unwrap();
    let start = h.handle.with_world(|w| w.player().pos).unwrap();
    h.handle.pointer_down(PointerId::Id(1), right);
    for _ in 0..30 {
        h.handle.frame(FRAME_DT_MS);
    }
    let moved = h.handle.with_world(|w| w.player().pos).unwrap() - start;
    assert!(moved.x > 0.0 && moved.y == 0.0);

    // Released while paused; nothing stays held after resume
    h.handle.pause();
    h.handle.pointer_up(PointerId::Id(1));
    h.handle.resume();
    h.handle.frame(FRAME_DT_MS);
    h.handle.frame(FRAME_DT_MS);
    let vel = h.handle.with_world(|w| w.player().vel).unwrap();
    assert_eq!(vel, Vec2::ZERO);
}

#[test]
fn destroy_while_pressed_leaves_world_idle() {
    let h = harness(8);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);
    let up = h
        .handle
        .with_overlay(|o| o.buttons()[Direction::Up.index()].center)
        .unwrap();
    h.handle.pointer_down(PointerId::Default, up);
    h.handle.frame(FRAME_DT_MS);
    h.handle.destroy();
    assert_eq!(
        h.handle.with_world(|w| w.virtual_input().is_pressed(Direction::Up)),
        Some(false)
    );
    assert_eq!(h.handle.pending_tasks(), 0);
}

#[test]
fn repeated_mounts_do_not_leak_listeners() {
    let host = HeadlessHost::new(9);
    let log = host.log();
    for _ in 0..3 {
        let handle = mount(
            host.clone(),
            Some(Viewport::new(640.0, 360.0)),
            MountOptions::default(),
        )
        .unwrap();
        boot(&handle);
        handle.frame(FRAME_DT_MS);
        handle.destroy();
        assert!(log.borrow().attached.is_empty());
    }
    assert_eq!(log.borrow().released, 3);
}

#[test]
fn asset_failure_is_narrated() {
    let h = harness(10);
    h.handle.asset_loaded(AssetKey::Backdrop, Some(Vec2::new(1200.0, 800.0)));
    h.handle.asset_failed(AssetKey::CrashSfx, "decode error");
    assert_eq!(
        h.statuses.borrow().last(),
        Some(&Status::LoadFailed.to_string())
    );
    assert_eq!(h.handle.scene_status(SceneKey::World), SceneStatus::Pending);
}

#[test]
fn hidden_page_forgets_held_keys() {
    let h = harness(11);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);

    assert!(h.handle.key_down("ArrowLeft"));
    h.handle.frame(FRAME_DT_MS);
    let vel = h.handle.with_world(|w| w.player().vel).unwrap();
    assert!(vel.x < 0.0);

    // The keyup lands in another tab
    h.handle.page_visibility_changed(true);
    h.handle.page_visibility_changed(false);
    let start = h.handle.with_world(|w| w.player().pos).unwrap();
    for _ in 0..60 {
        h.handle.frame(FRAME_DT_MS);
    }
    let (pos, vel) = h
        .handle
        .with_world(|w| (w.player().pos, w.player().vel))
        .unwrap();
    assert_eq!(vel, Vec2::ZERO);
    assert_eq!(pos, start);
}

#[test]
fn focus_loss_forgets_held_keys() {
    let h = harness(12);
    boot(&h.handle);
    h.handle.frame(FRAME_DT_MS);
    assert!(h.host.log().borrow().attached.contains(&HostListener::Blur));

    h.handle.key_down("KeyD");
    h.handle.frame(FRAME_DT_MS);
    h.handle.focus_lost();
    h.handle.frame(FRAME_DT_MS);
    let vel = h.handle.with_world(|w| w.player().vel).unwrap();
    assert_eq!(vel, Vec2::ZERO);

    // Pressing again after focus returns walks as usual
    h.handle.key_down("KeyD");
    h.handle.frame(FRAME_DT_MS);
    let vel = h.handle.with_world(|w| w.player().vel).unwrap();
    assert!(vel.x > 0.0);
}
