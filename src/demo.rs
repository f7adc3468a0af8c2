//! Autopilot for unattended runs
//!
//! Holds cursor keys toward whichever cat the world is waiting for and lets
//! go once the player is inside that cat's zone.

use std::collections::BTreeSet;

use crate::scene::WorldScene;
use crate::sim::Key;

/// Key transitions the autopilot wants this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChange {
    pub key: Key,
    pub pressed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    held: BTreeSet<Key>,
}

impl Autopilot {
    /// Dead band (px) per axis before a key is held
    const TOLERANCE: f32 = 6.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Diff between what is held and what should be held now
    pub fn steer(&mut self, world: &WorldScene) -> Vec<KeyChange> {
        let mut wanted = BTreeSet::new();
        if let Some(cat) = world.waiting_for_player() {
            let delta = world.cat(cat).position - world.player().pos;
            if delta.x > Self::TOLERANCE {
                wanted.insert(Key::ArrowRight);
            } else if delta.x < -Self::TOLERANCE {
                wanted.insert(Key::ArrowLeft);
            }
            if delta.y > Self::TOLERANCE {
                wanted.insert(Key::ArrowDown);
            } else if delta.y < -Self::TOLERANCE {
                wanted.insert(Key::ArrowUp);
            }
        }

        let released = self.held.difference(&wanted).map(|&key| KeyChange {
            key,
            pressed: false,
        });
        let pressed = wanted.difference(&self.held).map(|&key| KeyChange {
            key,
            pressed: true,
        });
        let changes: Vec<KeyChange> = released.chain(pressed).collect();
        self.held = wanted;
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::EventChannel;
    use crate::config::CityConfig;
    use crate::scene::Scene;
    use crate::sim::{CatKey, CatState};
    use glam::Vec2;

    #[test]
    fn test_idle_until_a_cat_is_awaited() {
        let world = WorldScene::new(
            CityConfig::default(),
            Vec2::new(1600.0, 900.0),
            Vec2::new(960.0, 540.0),
            3,
            EventChannel::new(),
        );
        assert!(Autopilot::new().steer(&world).is_empty());
    }

    #[test]
    fn test_walks_to_awaited_cat() {
        let mut world = WorldScene::new(
            CityConfig::default(),
            Vec2::new(1600.0, 900.0),
            Vec2::new(960.0, 540.0),
            3,
            EventChannel::new(),
        );
        world.handle_cat_death(CatKey::A);
        let mut pilot = Autopilot::new();
        for _ in 0..1200 {
            for change in pilot.steer(&world) {
                if change.pressed {
                    world.key_down(change.key);
                } else {
                    world.key_up(change.key);
                }
            }
            world.update(crate::consts::FRAME_DT_MS);
            if world.waiting_for_player().is_none() {
                break;
            }
        }
        assert_eq!(world.cat(CatKey::B).state(), CatState::Alive);
    }
}
