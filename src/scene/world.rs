//! World scene: the looping street cutscene
//!
//! Two cats take turns being hit by a car. After each hit the other cat is
//! re-placed on a random street slot, a guidance arrow points the player at
//! it, and the next cycle only starts once the player walks into that cat's
//! trigger zone.
//!
//! Per-step order: channel input, timers/tweens, player movement, hazard
//! motion and overlap, trigger zones, arrow, camera.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::{Scene, SceneKey};
use crate::assets::AssetKey;
use crate::channel::{CityEvent, EventChannel, Status, Subscription, Topic};
use crate::config::CityConfig;
use crate::sim::{
    Avoid, Bounds, Camera, Cat, CatKey, CatState, Ease, GuidanceArrow, Hazard, HazardPhase, Key,
    KeyboardState, Player, Side, TaskId, TaskRegistry, Tween, VirtualInput, assign_position,
    choose_spawn_side, input_vector, street_positions, walk_velocity,
};

/// Deferred world actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorldTask {
    BeginCycle { cat: CatKey, initial: bool },
    LaunchHazard(CatKey),
    ClearHazard,
}

/// Where the story currently is; exactly one variant at a time, so there is
/// never more than one cat the player is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Narrative {
    /// Scene just started, first cycle pending
    Intro,
    /// `cat`'s cycle began; its hazard launches after a delay
    Countdown { cat: CatKey },
    /// Hazard on the road, collider bound to `cat`
    HazardInbound { cat: CatKey },
    /// Waiting for the player to reach `cat`
    AwaitingPlayer { cat: CatKey },
    /// Player reached `cat`; its cycle begins after a delay
    Reviving { cat: CatKey },
}

impl Narrative {
    pub fn waiting_for_player(&self) -> Option<CatKey> {
        match *self {
            Narrative::AwaitingPlayer { cat } => Some(cat),
            _ => None,
        }
    }
}

/// Counts full loops: a death of B followed by a death of A
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopCounter {
    armed: bool,
    completed: u32,
}

impl LoopCounter {
    /// Record a death; returns true when it completed a loop
    pub fn record_death(&mut self, cat: CatKey) -> bool {
        match cat {
            CatKey::B => {
                self.armed = true;
                false
            }
            CatKey::A if self.armed => {
                self.completed += 1;
                self.armed = false;
                true
            }
            CatKey::A => false,
        }
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }
}

/// Side effects for the host to carry out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEffect {
    PlaySound { asset: AssetKey, volume: f32 },
}

/// Serializable summary for logging and the headless demo
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub narrative: Narrative,
    pub loops: u32,
    pub player: Vec2,
    pub cats: [(CatKey, CatState, Vec2); 2],
    pub hazard: Option<Vec2>,
}

pub struct WorldScene {
    config: CityConfig,
    bounds: Bounds,
    rng: Pcg32,
    channel: EventChannel,
    subscriptions: Vec<Subscription>,
    tasks: TaskRegistry<WorldTask>,
    /// Pending begin/launch timer for the current cycle
    cycle_task: Option<TaskId>,
    streets: Vec<Vec2>,
    cats: [Cat; 2],
    player: Player,
    hazard: Option<Hazard>,
    arrow: GuidanceArrow,
    camera: Camera,
    keys: KeyboardState,
    virtual_input: VirtualInput,
    narrative: Narrative,
    loops: LoopCounter,
    effects: Vec<WorldEffect>,
    shut_down: bool,
}

impl WorldScene {
    /// Build the world for a backdrop of `world_size`, shown in `viewport`
    pub fn new(
        config: CityConfig,
        world_size: Vec2,
        viewport: Vec2,
        seed: u64,
        channel: EventChannel,
    ) -> Self {
        let bounds = Bounds::new(world_size.x, world_size.y);
        let streets = street_positions(&bounds);
        let default_a = streets
            .first()
            .copied()
            .unwrap_or(Vec2::new(bounds.width * 0.32, bounds.height * 0.64));
        let default_b = streets
            .get(1)
            .copied()
            .unwrap_or(Vec2::new(bounds.width * 0.62, bounds.height * 0.28));

        let start = Vec2::new(
            bounds.width * config.player_start.0,
            bounds.height * config.player_start.1,
        );
        let player = Player::new(start, Vec2::from(config.player_body));
        let mut camera = Camera::new(viewport);
        camera.center_on(player.pos, &bounds);

        let subscriptions = vec![channel.subscribe(Topic::VirtualInput)];

        let mut world = Self {
            cats: [
                Cat::new(CatKey::A, default_a, config.zone_radius(CatKey::A)),
                Cat::new(CatKey::B, default_b, config.zone_radius(CatKey::B)),
            ],
            config,
            bounds,
            rng: Pcg32::seed_from_u64(seed),
            channel,
            subscriptions,
            tasks: TaskRegistry::new(),
            cycle_task: None,
            streets,
            player,
            hazard: None,
            arrow: GuidanceArrow::default(),
            camera,
            keys: KeyboardState::default(),
            virtual_input: VirtualInput::default(),
            narrative: Narrative::Intro,
            loops: LoopCounter::default(),
            effects: Vec::new(),
            shut_down: false,
        };

        world.assign_position(CatKey::A, false);
        world.assign_position(CatKey::B, true);
        world.set_cat_state(CatKey::A, CatState::Alive);
        world.set_cat_state(CatKey::B, CatState::Hidden);

        world.schedule_cycle(
            world.config.intro_delay_ms,
            WorldTask::BeginCycle {
                cat: CatKey::A,
                initial: true,
            },
        );
        log::info!(
            "world ready: {}x{}, seed {seed}",
            world.bounds.width,
            world.bounds.height
        );
        world
    }

    // === Accessors ===

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn config(&self) -> &CityConfig {
        &self.config
    }

    pub fn cat(&self, key: CatKey) -> &Cat {
        &self.cats[key.index()]
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn hazard(&self) -> Option<&Hazard> {
        self.hazard.as_ref()
    }

    pub fn arrow(&self) -> &GuidanceArrow {
        &self.arrow
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn narrative(&self) -> Narrative {
        self.narrative
    }

    pub fn waiting_for_player(&self) -> Option<CatKey> {
        self.narrative.waiting_for_player()
    }

    /// Full B-then-A loops completed so far
    pub fn completed_loops(&self) -> u32 {
        self.loops.completed()
    }

    pub fn virtual_input(&self) -> &VirtualInput {
        &self.virtual_input
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Take queued side effects (sounds)
    pub fn take_effects(&mut self) -> Vec<WorldEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            narrative: self.narrative,
            loops: self.completed_loops(),
            player: self.player.pos,
            cats: CatKey::ALL.map(|k| {
                let cat = self.cat(k);
                (k, cat.state(), cat.position)
            }),
            hazard: self.hazard.as_ref().map(|h| h.pos),
        }
    }

    // === Input ===

    pub fn key_down(&mut self, key: Key) {
        self.keys.press(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys.release(key);
    }

    /// Forget every held key; their keyups went to another window or tab
    pub fn release_keys(&mut self) {
        self.keys.clear();
    }

    fn drain_channel(&mut self) {
        let events: Vec<CityEvent> = self.subscriptions.iter().flat_map(|s| s.drain()).collect();
        for event in events {
            if let CityEvent::VirtualInput { direction, pressed } = event {
                if self.virtual_input.set(direction, pressed) {
                    log::trace!("virtual {} = {pressed}", direction.as_str());
                }
            }
        }
    }

    // === Cats ===

    fn set_cat_state(&mut self, key: CatKey, state: CatState) {
        if let Err(err) = self.cats[key.index()].set_state(state) {
            log::warn!("ignored: {err}");
        }
    }

    /// Move `key` to a fresh street slot (see `sim::placement::assign_position`)
    fn assign_position(&mut self, key: CatKey, avoid_other: bool) {
        let other = self.cat(key.other());
        let avoid = avoid_other.then(|| Avoid {
            index: other.position_index,
            position: other.position,
        });
        let own = self.cat(key).position_index;
        if let Some((index, pos)) = assign_position(
            &self.streets,
            own,
            avoid,
            self.config.min_cat_distance,
            &mut self.rng,
        ) {
            self.cats[key.index()].place(index, pos);
            log::debug!("cat {key} placed on slot {index} ({:.0}, {:.0})", pos.x, pos.y);
        }
    }

    // === Cycle ===

    /// Replace the pending cycle timer, if any
    fn schedule_cycle(&mut self, delay_ms: f32, task: WorldTask) {
        if let Some(old) = self.cycle_task.take() {
            self.tasks.cancel(old);
        }
        self.cycle_task = Some(self.tasks.delay(delay_ms, task));
    }

    fn begin_cycle(&mut self, cat: CatKey, initial: bool) {
        if self.cat(cat).state() != CatState::Alive {
            log::warn!("cycle for cat {cat} skipped: cat is {:?}", self.cat(cat).state());
            return;
        }
        self.narrative = Narrative::Countdown { cat };
        let delay = if initial {
            self.config.first_hazard_delay_ms
        } else {
            self.config.hazard_delay_ms
        };
        self.schedule_cycle(delay, WorldTask::LaunchHazard(cat));
    }

    fn launch_hazard(&mut self, cat: CatKey) {
        self.clear_hazard();

        let target = self.cat(cat);
        if target.state() != CatState::Alive {
            log::warn!("hazard launch for cat {cat} skipped: cat is {:?}", target.state());
            return;
        }
        let target_pos = target.position;

        let from = choose_spawn_side(
            target_pos.x,
            &self.bounds,
            self.config.hazard_flip_probability,
            &mut self.rng,
        );
        let margin = self.config.hazard_spawn_margin;
        let (x, vx) = match from {
            Side::Left => (-margin, self.config.hazard_speed),
            Side::Right => (self.bounds.width + margin, -self.config.hazard_speed),
        };

        self.hazard = Some(Hazard {
            target: cat,
            from,
            pos: Vec2::new(x, target_pos.y),
            vel: Vec2::new(vx, 0.0),
            body: Vec2::from(self.config.hazard_body),
            alpha: 1.0,
            phase: HazardPhase::Hunting,
        });
        self.narrative = Narrative::HazardInbound { cat };
        log::debug!("hazard launched at cat {cat} from {from:?}");
    }

    fn clear_hazard(&mut self) {
        if let Some(hazard) = self.hazard.take() {
            if let HazardPhase::Exiting { tween, .. } = hazard.phase {
                self.tasks.cancel(tween);
            }
        }
    }

    /// The hazard touched `key`. Ignored unless the cat is alive, so duplicate
    /// overlap callbacks for one death are harmless.
    pub fn handle_cat_death(&mut self, key: CatKey) -> bool {
        if self.cat(key).state() != CatState::Alive {
            log::debug!("duplicate hit on cat {key} ignored");
            return false;
        }
        self.set_cat_state(key, CatState::Dead);
        if let Some(pending) = self.cycle_task.take() {
            self.tasks.cancel(pending);
        }

        if let Some(hazard) = self.hazard.as_mut() {
            if hazard.phase == HazardPhase::Hunting {
                let exit_x = if hazard.vel.x >= 0.0 {
                    self.bounds.width + self.config.hazard_exit_margin
                } else {
                    -self.config.hazard_exit_margin
                };
                let tween = self.tasks.tween(
                    Tween::new(0.0, 1.0, self.config.hazard_exit_ms).with_ease(Ease::SineIn),
                    Some(WorldTask::ClearHazard),
                );
                hazard.phase = HazardPhase::Exiting {
                    tween,
                    start_x: hazard.pos.x,
                    exit_x,
                };
            }
        }

        self.effects.push(WorldEffect::PlaySound {
            asset: AssetKey::CrashSfx,
            volume: self.config.crash_volume,
        });

        if self.loops.record_death(key) {
            log::info!("loop {} complete", self.loops.completed());
            self.channel.publish_status(Status::LoopCompleted {
                loops: self.loops.completed(),
            });
        }

        self.prepare_next_step(key);
        true
    }

    fn prepare_next_step(&mut self, dead: CatKey) {
        let next = dead.other();
        self.narrative = Narrative::AwaitingPlayer { cat: next };
        self.assign_position(next, true);
        self.set_cat_state(next, CatState::Hidden);
        self.arm_arrow(self.cat(next).position);
        self.channel
            .publish_status(Status::CatDown { cat: dead, next });
    }

    /// The player reached `key` while it was the awaited cat
    fn trigger_next_cat(&mut self, key: CatKey) {
        if self.narrative.waiting_for_player() != Some(key) {
            return;
        }
        self.clear_arrow();
        self.set_cat_state(key, CatState::Alive);
        self.narrative = Narrative::Reviving { cat: key };
        self.schedule_cycle(
            self.config.revive_delay_ms,
            WorldTask::BeginCycle {
                cat: key,
                initial: false,
            },
        );
        self.channel.publish_status(Status::CatFound { cat: key });
    }

    fn is_player_inside_zone(&self, key: CatKey) -> bool {
        self.cat(key).zone.contains(self.player.pos)
    }

    // === Arrow ===

    fn arm_arrow(&mut self, target: Vec2) {
        if let Some(pulse) = self.arrow.pulse.take() {
            self.tasks.cancel(pulse);
        }
        let (lo, hi) = self.config.arrow_alpha;
        let pulse = self.tasks.tween(
            Tween::new(lo, hi, self.config.arrow_pulse_ms)
                .with_ease(Ease::SineInOut)
                .yoyo()
                .forever(),
            None,
        );
        self.arrow = GuidanceArrow {
            target: Some(target),
            pos: self.arrow_anchor(),
            rotation: crate::angle_between(self.player.pos, target),
            alpha: 0.0,
            pulse: Some(pulse),
        };
    }

    fn clear_arrow(&mut self) {
        if let Some(pulse) = self.arrow.pulse.take() {
            self.tasks.cancel(pulse);
        }
        self.arrow.target = None;
        self.arrow.alpha = 0.0;
    }

    fn arrow_anchor(&self) -> Vec2 {
        self.player.pos + Vec2::new(0.0, self.config.arrow_offset_y)
    }

    // === Per-step phases ===

    fn run_tasks(&mut self, dt_ms: f32) {
        for task in self.tasks.advance(dt_ms) {
            if matches!(task, WorldTask::BeginCycle { .. } | WorldTask::LaunchHazard(_)) {
                self.cycle_task = None;
            }
            match task {
                WorldTask::BeginCycle { cat, initial } => self.begin_cycle(cat, initial),
                WorldTask::LaunchHazard(cat) => self.launch_hazard(cat),
                WorldTask::ClearHazard => self.clear_hazard(),
            }
        }
    }

    fn update_player(&mut self, dt_secs: f32) {
        let input = input_vector(&self.keys, &self.virtual_input);
        self.player
            .set_velocity(walk_velocity(input, self.config.walk_speed));
        self.player.integrate(dt_secs, &self.bounds);

        // Activation key inside A's zone also counts as reaching B
        let activated = self.keys.take_activation();
        if activated
            && self.narrative.waiting_for_player() == Some(CatKey::B)
            && self.is_player_inside_zone(CatKey::A)
        {
            self.trigger_next_cat(CatKey::B);
        }
    }

    fn update_hazard(&mut self, dt_secs: f32) {
        let Some(hazard) = self.hazard.as_mut() else {
            return;
        };
        match hazard.phase {
            HazardPhase::Hunting => {
                hazard.pos += hazard.vel * dt_secs;
                let target = hazard.target;
                let cat_body = self.cats[target.index()].body(Vec2::from(self.config.cat_body));
                let hit = match (hazard.collider(), cat_body) {
                    (Some(car), Some(cat)) => car.overlaps(&cat),
                    _ => false,
                };
                let limit = self.config.hazard_spawn_margin + hazard.body.x;
                let gone = hazard.pos.x < -limit || hazard.pos.x > self.bounds.width + limit;
                if hit {
                    self.handle_cat_death(target);
                } else if gone {
                    log::warn!("hazard missed cat {target}; relaunching");
                    self.hazard = None;
                    self.schedule_cycle(self.config.hazard_delay_ms, WorldTask::LaunchHazard(target));
                    self.narrative = Narrative::Countdown { cat: target };
                }
            }
            HazardPhase::Exiting {
                tween,
                start_x,
                exit_x,
            } => {
                if let Some(t) = self.tasks.tween_value(tween) {
                    hazard.pos.x = crate::lerp(start_x, exit_x, t);
                    hazard.alpha = 1.0 - t;
                }
            }
        }
    }

    fn check_trigger_zones(&mut self) {
        if let Some(key) = self.narrative.waiting_for_player() {
            if self.is_player_inside_zone(key) {
                self.trigger_next_cat(key);
            }
        }
    }

    fn update_arrow(&mut self) {
        let Some(target) = self.arrow.target else {
            return;
        };
        self.arrow.pos = self.arrow_anchor();
        self.arrow.rotation = crate::angle_between(self.player.pos, target);
        if let Some(alpha) = self.arrow.pulse.and_then(|id| self.tasks.tween_value(id)) {
            self.arrow.alpha = alpha;
        }
    }
}

impl Scene for WorldScene {
    const KEY: SceneKey = SceneKey::World;

    fn update(&mut self, dt_ms: f32) {
        if self.shut_down {
            return;
        }
        let dt_secs = dt_ms / 1000.0;

        self.drain_channel();
        self.run_tasks(dt_ms);
        self.update_player(dt_secs);
        self.update_hazard(dt_secs);
        self.check_trigger_zones();
        self.update_arrow();
        self.camera
            .follow(self.player.pos, self.config.camera_lerp, &self.bounds);
    }

    fn resize(&mut self, viewport: Vec2) {
        self.camera.viewport = viewport;
        self.camera.center_on(self.player.pos, &self.bounds);
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.subscriptions.clear();
        let cancelled = self.tasks.cancel_all();
        self.cycle_task = None;
        self.arrow.pulse = None;
        self.arrow.target = None;
        self.hazard = None;
        self.virtual_input.clear();
        self.keys.clear();
        self.effects.clear();
        log::debug!("world shut down ({cancelled} tasks cancelled)");
    }

    fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FRAME_DT_MS;
    use crate::sim::Direction;
    use proptest::prelude::*;

    fn world(seed: u64) -> (WorldScene, EventChannel) {
        let channel = EventChannel::new();
        let world = WorldScene::new(
            CityConfig::default(),
            Vec2::new(1600.0, 900.0),
            Vec2::new(960.0, 540.0),
            seed,
            channel.clone(),
        );
        (world, channel)
    }

    /// Step until `done` holds or `max_steps` pass
    fn run_until(world: &mut WorldScene, max_steps: usize, done: impl Fn(&WorldScene) -> bool) -> bool {
        for _ in 0..max_steps {
            if done(world) {
                return true;
            }
            world.update(FRAME_DT_MS);
        }
        done(world)
    }

    #[test]
    fn test_initial_state() {
        let (world, _) = world(1);
        assert_eq!(world.cat(CatKey::A).state(), CatState::Alive);
        assert_eq!(world.cat(CatKey::B).state(), CatState::Hidden);
        assert_eq!(world.narrative(), Narrative::Intro);
        assert!(world.hazard().is_none());
        assert!(!world.arrow().visible());
        let a = world.cat(CatKey::A);
        let b = world.cat(CatKey::B);
        assert_ne!(a.position_index, b.position_index);
        assert!(a.position.distance(b.position) >= 260.0);
        assert_eq!(world.player().pos, Vec2::new(1600.0 * 0.18, 900.0 * 0.65));
    }

    #[test]
    fn test_hazard_launches_after_intro_delays() {
        let (mut world, _) = world(2);
        // 450 ms intro + 200 ms first hazard delay
        assert!(run_until(&mut world, 60, |w| w.hazard().is_some()));
        let hazard = world.hazard().unwrap();
        assert_eq!(hazard.target, CatKey::A);
        assert_eq!(hazard.pos.y, world.cat(CatKey::A).position.y);
        assert_eq!(world.narrative(), Narrative::HazardInbound { cat: CatKey::A });
    }

    #[test]
    fn test_hazard_kills_cat_a_and_arms_arrow() {
        let (mut world, channel) = world(3);
        let status = channel.subscribe(Topic::Status);
        assert!(run_until(&mut world, 2000, |w| w.cat(CatKey::A).state() == CatState::Dead));

        assert_eq!(world.waiting_for_player(), Some(CatKey::B));
        assert_eq!(world.cat(CatKey::B).state(), CatState::Hidden);
        assert!(world.arrow().visible());
        assert_eq!(world.arrow().target, Some(world.cat(CatKey::B).position));
        assert!(matches!(
            world.hazard().map(|h| h.phase),
            Some(HazardPhase::Exiting { .. })
        ));
        assert!(world.hazard().unwrap().collider().is_none());
        assert_eq!(
            world.take_effects(),
            vec![WorldEffect::PlaySound {
                asset: AssetKey::CrashSfx,
                volume: 0.7
            }]
        );
        assert!(status.drain().contains(&CityEvent::Status(Status::CatDown {
            cat: CatKey::A,
            next: CatKey::B
        })));

        // Exit tween despawns the car
        assert!(run_until(&mut world, 60, |w| w.hazard().is_none()));
    }

    #[test]
    fn test_duplicate_hit_ignored() {
        let (mut world, _) = world(4);
        assert!(world.handle_cat_death(CatKey::A));
        let after_first = world.cat(CatKey::B).position;
        assert!(!world.handle_cat_death(CatKey::A));
        assert_eq!(world.cat(CatKey::A).state(), CatState::Dead);
        assert_eq!(world.cat(CatKey::B).position, after_first);
        assert_eq!(world.take_effects().len(), 1);
        assert!(!world.handle_cat_death(CatKey::B));
    }

    #[test]
    fn test_player_reaching_zone_revives_cat() {
        let (mut world, _) = world(5);
        world.handle_cat_death(CatKey::A);
        let b = world.cat(CatKey::B).position;
        world.player.pos = b;
        world.update(FRAME_DT_MS);

        assert_eq!(world.waiting_for_player(), None);
        assert_eq!(world.cat(CatKey::B).state(), CatState::Alive);
        assert!(!world.arrow().visible());
        assert_eq!(world.narrative(), Narrative::Reviving { cat: CatKey::B });

        // revive delay + hazard delay, then the car targets B
        assert!(run_until(&mut world, 120, |w| w.hazard().is_some_and(|h| h.target == CatKey::B
            && h.phase == HazardPhase::Hunting)));
    }

    #[test]
    fn test_activation_key_in_zone_a_advances_to_b() {
        let (mut world, _) = world(6);
        world.handle_cat_death(CatKey::A);
        world.player.pos = world.cat(CatKey::A).position;
        world.key_down(Key::E);
        world.update(FRAME_DT_MS);
        assert_eq!(world.cat(CatKey::B).state(), CatState::Alive);
        assert_eq!(world.narrative(), Narrative::Reviving { cat: CatKey::B });
    }

    #[test]
    fn test_activation_key_only_applies_while_waiting_for_b() {
        let (mut world, _) = world(7);
        world.handle_cat_death(CatKey::A);
        world.player.pos = world.cat(CatKey::B).position;
        world.update(FRAME_DT_MS);
        assert!(run_until(&mut world, 2000, |w| w.cat(CatKey::B).state() == CatState::Dead));
        assert_eq!(world.waiting_for_player(), Some(CatKey::A));

        // Far from A and no B pending: the key does nothing
        world.player.pos = Vec2::new(5.0, 5.0);
        world.key_down(Key::Space);
        world.update(FRAME_DT_MS);
        assert_eq!(world.waiting_for_player(), Some(CatKey::A));
    }

    #[test]
    fn test_full_loop_counts_once() {
        let (mut world, channel) = world(8);
        let status = channel.subscribe(Topic::Status);
        for expected in [CatKey::A, CatKey::B, CatKey::A] {
            assert!(run_until(&mut world, 3000, |w| w.cat(expected).state() == CatState::Dead));
            let next = expected.other();
            world.player.pos = world.cat(next).position;
            world.update(FRAME_DT_MS);
        }
        assert_eq!(world.completed_loops(), 1);
        assert!(status
            .drain()
            .contains(&CityEvent::Status(Status::LoopCompleted { loops: 1 })));
    }

    #[test]
    fn test_loop_counter_orderings() {
        let mut counter = LoopCounter::default();
        assert!(!counter.record_death(CatKey::A));
        assert!(!counter.record_death(CatKey::A));
        assert!(!counter.record_death(CatKey::B));
        assert!(counter.record_death(CatKey::A));
        assert_eq!(counter.completed(), 1);

        let mut counter = LoopCounter::default();
        counter.record_death(CatKey::A);
        counter.record_death(CatKey::B);
        counter.record_death(CatKey::B);
        assert_eq!(counter.completed(), 0);
        counter.record_death(CatKey::A);
        counter.record_death(CatKey::A);
        assert_eq!(counter.completed(), 1);
    }

    #[test]
    fn test_virtual_input_moves_player() {
        let (mut world, channel) = world(9);
        let start = world.player().pos;
        channel.publish(CityEvent::VirtualInput {
            direction: Direction::Right,
            pressed: true,
        });
        for _ in 0..60 {
            world.update(FRAME_DT_MS);
        }
        let moved = world.player().pos - start;
        assert!((moved.x - 180.0).abs() < 1.0, "moved {moved:?}");
        assert_eq!(moved.y, 0.0);
        assert!(!world.player().facing_left);

        channel.publish(CityEvent::VirtualInput {
            direction: Direction::Right,
            pressed: false,
        });
        world.update(FRAME_DT_MS);
        assert_eq!(world.player().vel, Vec2::ZERO);
    }

    #[test]
    fn test_arrow_follows_player() {
        let (mut world, _) = world(10);
        world.handle_cat_death(CatKey::A);
        world.key_down(Key::ArrowDown);
        world.update(FRAME_DT_MS);
        let arrow = world.arrow();
        assert_eq!(arrow.pos, world.player().pos + Vec2::new(0.0, -48.0));
        let target = world.cat(CatKey::B).position;
        let expected = crate::angle_between(world.player().pos, target);
        assert!((arrow.rotation - expected).abs() < 1e-5);
        assert!(arrow.alpha >= 0.3 && arrow.alpha <= 1.0);
    }

    #[test]
    fn test_release_keys_stops_walking() {
        let (mut world, _channel) = world(12);
        world.key_down(Key::ArrowDown);
        world.update(FRAME_DT_MS);
        assert!(world.player().vel.y > 0.0);

        world.release_keys();
        let pos = world.player().pos;
        for _ in 0..30 {
            world.update(FRAME_DT_MS);
        }
        assert_eq!(world.player().vel, Vec2::ZERO);
        assert_eq!(world.player().pos, pos);
    }

    #[test]
    fn test_shutdown_leaves_no_tasks() {
        let (mut world, channel) = world(11);
        world.handle_cat_death(CatKey::A);
        assert!(world.pending_tasks() > 0);
        world.shutdown();
        assert_eq!(world.pending_tasks(), 0);
        assert_eq!(channel.subscriber_count(), 0);
        world.update(FRAME_DT_MS);
        assert_eq!(world.pending_tasks(), 0);
    }

    #[derive(Debug, Clone)]
    enum Event {
        Step(u8),
        Hit(CatKey),
        Visit(CatKey),
    }

    fn event() -> impl Strategy<Value = Event> {
        let cat = prop_oneof![Just(CatKey::A), Just(CatKey::B)];
        prop_oneof![
            (1u8..120).prop_map(Event::Step),
            cat.clone().prop_map(Event::Hit),
            cat.prop_map(Event::Visit),
        ]
    }

    proptest! {
        #[test]
        fn prop_cats_only_step_forward(seed in any::<u64>(), events in prop::collection::vec(event(), 1..80)) {
            let (mut world, _) = world(seed);
            let mut deaths = 0u32;
            let mut b_then_a = 0u32;
            let mut last_death = None;
            for ev in events {
                let before = CatKey::ALL.map(|k| world.cat(k).state());
                match ev {
                    Event::Step(n) => for _ in 0..n { world.update(FRAME_DT_MS) },
                    Event::Hit(k) => { world.handle_cat_death(k); }
                    Event::Visit(k) => {
                        world.player.pos = world.cat(k).position;
                        world.update(FRAME_DT_MS);
                    }
                }
                for k in CatKey::ALL {
                    let (was, now) = (before[k.index()], world.cat(k).state());
                    prop_assert!(now == was || now == was.successor(), "{k}: {was:?} -> {now:?}");
                    if was == CatState::Alive && now == CatState::Dead {
                        deaths += 1;
                        if k == CatKey::A && last_death == Some(CatKey::B) {
                            b_then_a += 1;
                        }
                        last_death = Some(k);
                    }
                }
                let a = world.cat(CatKey::A);
                let b = world.cat(CatKey::B);
                prop_assert_ne!(a.position_index, b.position_index);
                let alive = CatKey::ALL.iter().filter(|&&k| world.cat(k).state() == CatState::Alive).count();
                prop_assert!(alive <= 1);
            }
            prop_assert!(world.completed_loops() <= deaths);
            prop_assert_eq!(world.completed_loops(), b_then_a);
        }
    }
}
