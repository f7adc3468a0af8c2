//! Scene-scoped timers and tweens
//!
//! Each scene owns one `TaskRegistry`. Tasks are keyed by a monotonic id,
//! only advance when the owning scene updates (so they freeze while it is
//! paused) and are swept with `cancel_all` on shutdown. Completed delays and
//! finite tweens hand their action back to the scene from `advance`.

use std::collections::BTreeMap;
use std::f32::consts::FRAC_PI_2;

/// Handle to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// Easing curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    #[default]
    Linear,
    SineIn,
    SineOut,
    SineInOut,
}

impl Ease {
    /// Map linear progress `t` in [0, 1] through the curve
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Ease::SineOut => (t * FRAC_PI_2).sin(),
            Ease::SineInOut => 0.5 * (1.0 - (std::f32::consts::PI * t).cos()),
        }
    }
}

/// A scalar animated from `from` to `to`
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    pub from: f32,
    pub to: f32,
    pub duration_ms: f32,
    pub ease: Ease,
    /// Play back to `from` after reaching `to`
    pub yoyo: bool,
    /// Loop until cancelled
    pub forever: bool,
    elapsed_ms: f32,
    paused: bool,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration_ms: f32) -> Self {
        Self {
            from,
            to,
            duration_ms: duration_ms.max(1.0),
            ease: Ease::Linear,
            yoyo: false,
            forever: false,
            elapsed_ms: 0.0,
            paused: false,
        }
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn yoyo(mut self) -> Self {
        self.yoyo = true;
        self
    }

    pub fn forever(mut self) -> Self {
        self.forever = true;
        self
    }

    fn cycle_ms(&self) -> f32 {
        if self.yoyo {
            self.duration_ms * 2.0
        } else {
            self.duration_ms
        }
    }

    /// Linear progress within the current leg, 0..=1
    fn progress(&self) -> f32 {
        let cycle = self.cycle_ms();
        let phase = if self.forever {
            self.elapsed_ms % cycle
        } else {
            self.elapsed_ms.min(cycle)
        };
        if phase <= self.duration_ms {
            phase / self.duration_ms
        } else {
            (cycle - phase) / self.duration_ms
        }
    }

    /// Current eased value
    pub fn value(&self) -> f32 {
        crate::lerp(self.from, self.to, self.ease.apply(self.progress()))
    }

    pub fn is_finished(&self) -> bool {
        !self.forever && self.elapsed_ms >= self.cycle_ms()
    }

    fn advance(&mut self, dt_ms: f32) {
        if !self.paused {
            self.elapsed_ms += dt_ms;
        }
    }
}

#[derive(Debug)]
enum Task<A> {
    Delay { remaining_ms: f32, action: A },
    Tween { tween: Tween, on_complete: Option<A> },
}

/// Arena of pending timers and tweens for one scene
#[derive(Debug)]
pub struct TaskRegistry<A> {
    next_id: u64,
    tasks: BTreeMap<TaskId, Task<A>>,
}

impl<A> Default for TaskRegistry<A> {
    fn default() -> Self {
        Self {
            next_id: 1,
            tasks: BTreeMap::new(),
        }
    }
}

impl<A> TaskRegistry<A> {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Fire `action` after `delay_ms` of scene time
    pub fn delay(&mut self, delay_ms: f32, action: A) -> TaskId {
        let id = self.allocate();
        self.tasks.insert(
            id,
            Task::Delay {
                remaining_ms: delay_ms,
                action,
            },
        );
        id
    }

    /// Start a tween; `on_complete` fires when a finite tween ends
    pub fn tween(&mut self, tween: Tween, on_complete: Option<A>) -> TaskId {
        let id = self.allocate();
        self.tasks.insert(id, Task::Tween { tween, on_complete });
        id
    }

    /// Cancel one task; its action never fires
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Cancel everything; returns how many tasks were dropped
    pub fn cancel_all(&mut self) -> usize {
        let n = self.tasks.len();
        self.tasks.clear();
        n
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn tween_value(&self, id: TaskId) -> Option<f32> {
        match self.tasks.get(&id) {
            Some(Task::Tween { tween, .. }) => Some(tween.value()),
            _ => None,
        }
    }

    /// Freeze or unfreeze a single tween (delays ignore this)
    pub fn set_paused(&mut self, id: TaskId, paused: bool) {
        if let Some(Task::Tween { tween, .. }) = self.tasks.get_mut(&id) {
            tween.paused = paused;
        }
    }

    /// Advance every task by `dt_ms`; returns actions that came due, in scheduling order
    pub fn advance(&mut self, dt_ms: f32) -> Vec<A> {
        let mut done = Vec::new();
        for (id, task) in self.tasks.iter_mut() {
            match task {
                Task::Delay { remaining_ms, .. } => {
                    *remaining_ms -= dt_ms;
                    if *remaining_ms <= 0.0 {
                        done.push(*id);
                    }
                }
                Task::Tween { tween, .. } => {
                    tween.advance(dt_ms);
                    if tween.is_finished() {
                        done.push(*id);
                    }
                }
            }
        }

        done.into_iter()
            .filter_map(|id| match self.tasks.remove(&id)? {
                Task::Delay { action, .. } => Some(action),
                Task::Tween { on_complete, .. } => on_complete,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Action {
        Ping,
        Pong,
    }

    #[test]
    fn test_delay_fires_once() {
        let mut tasks = TaskRegistry::new();
        tasks.delay(100.0, Action::Ping);
        assert!(tasks.advance(60.0).is_empty());
        assert_eq!(tasks.advance(40.0), vec![Action::Ping]);
        assert!(tasks.advance(1000.0).is_empty());
        assert_eq!(tasks.pending(), 0);
    }

    #[test]
    fn test_fired_in_scheduling_order() {
        let mut tasks = TaskRegistry::new();
        tasks.delay(50.0, Action::Pong);
        tasks.delay(10.0, Action::Ping);
        assert_eq!(tasks.advance(60.0), vec![Action::Pong, Action::Ping]);
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut tasks = TaskRegistry::new();
        let id = tasks.delay(10.0, Action::Ping);
        tasks.delay(10.0, Action::Pong);
        assert!(tasks.cancel(id));
        assert!(!tasks.cancel(id));
        assert_eq!(tasks.advance(20.0), vec![Action::Pong]);
    }

    #[test]
    fn test_cancel_all_sweeps() {
        let mut tasks = TaskRegistry::new();
        tasks.delay(10.0, Action::Ping);
        tasks.tween(Tween::new(0.0, 1.0, 100.0).forever(), None);
        tasks.tween(Tween::new(0.0, 1.0, 100.0), Some(Action::Pong));
        assert_eq!(tasks.cancel_all(), 3);
        assert_eq!(tasks.pending(), 0);
        assert!(tasks.advance(500.0).is_empty());
    }

    #[test]
    fn test_tween_completion_action() {
        let mut tasks = TaskRegistry::new();
        let id = tasks.tween(
            Tween::new(0.0, 10.0, 100.0),
            Some(Action::Pong),
        );
        tasks.advance(50.0);
        assert!((tasks.tween_value(id).unwrap() - 5.0).abs() < 1e-4);
        assert_eq!(tasks.advance(50.0), vec![Action::Pong]);
        assert!(tasks.tween_value(id).is_none());
    }

    #[test]
    fn test_yoyo_forever_pulse() {
        let mut tasks: TaskRegistry<Action> = TaskRegistry::new();
        let id = tasks.tween(Tween::new(0.3, 1.0, 500.0).yoyo().forever(), None);
        tasks.advance(500.0);
        assert!((tasks.tween_value(id).unwrap() - 1.0).abs() < 1e-4);
        tasks.advance(500.0);
        assert!((tasks.tween_value(id).unwrap() - 0.3).abs() < 1e-4);
        tasks.advance(10_000.0);
        assert!(tasks.contains(id));
    }

    #[test]
    fn test_paused_tween_holds_value() {
        let mut tasks: TaskRegistry<Action> = TaskRegistry::new();
        let id = tasks.tween(Tween::new(0.0, 1.0, 100.0), None);
        tasks.advance(25.0);
        tasks.set_paused(id, true);
        tasks.advance(50.0);
        assert!((tasks.tween_value(id).unwrap() - 0.25).abs() < 1e-4);
        tasks.set_paused(id, false);
        tasks.advance(75.0);
        assert!(!tasks.contains(id));
    }

    #[test]
    fn test_ease_endpoints() {
        for ease in [Ease::Linear, Ease::SineIn, Ease::SineOut, Ease::SineInOut] {
            assert!(ease.apply(0.0).abs() < 1e-6);
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6);
        }
        assert!(Ease::SineIn.apply(0.5) < 0.5);
        assert!(Ease::SineOut.apply(0.5) > 0.5);
    }
}
