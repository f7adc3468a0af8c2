//! Street slot selection for the cats and hazard spawn sides

use glam::Vec2;
use rand::Rng;

use super::actors::Side;
use super::geometry::Bounds;

/// Street slots as fractions of the world size
const STREET_SLOTS: [(f32, f32); 12] = [
    (0.18, 0.78),
    (0.32, 0.66),
    (0.48, 0.74),
    (0.62, 0.68),
    (0.78, 0.60),
    (0.86, 0.44),
    (0.74, 0.28),
    (0.56, 0.22),
    (0.38, 0.26),
    (0.24, 0.38),
    (0.12, 0.54),
    (0.88, 0.72),
];

/// Candidate cat positions for a world of the given size
pub fn street_positions(bounds: &Bounds) -> Vec<Vec2> {
    STREET_SLOTS
        .iter()
        .map(|&(fx, fy)| Vec2::new(bounds.width * fx, bounds.height * fy))
        .collect()
}

/// The other cat, when the new position has to keep away from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Avoid {
    pub index: Option<usize>,
    pub position: Vec2,
}

/// Pick a new street slot for a cat currently on `own_index`.
///
/// The current slot is never re-picked while alternatives exist. With `avoid`,
/// the other cat's slot and every slot closer than `min_distance` to it are
/// excluded too. When nothing survives the filter, the slot farthest from the
/// other cat wins; without `avoid` the cat stays where it was (slot 0 if it
/// had none). Returns `None` only for an empty table.
pub fn assign_position<R: Rng + ?Sized>(
    positions: &[Vec2],
    own_index: Option<usize>,
    avoid: Option<Avoid>,
    min_distance: f32,
    rng: &mut R,
) -> Option<(usize, Vec2)> {
    if positions.is_empty() {
        return None;
    }

    let candidates: Vec<usize> = (0..positions.len())
        .filter(|&i| Some(i) != own_index)
        .filter(|&i| match avoid {
            Some(other) => {
                Some(i) != other.index && positions[i].distance(other.position) >= min_distance
            }
            None => true,
        })
        .collect();

    let choice = if !candidates.is_empty() {
        Some(candidates[rng.random_range(0..candidates.len())])
    } else {
        avoid.and_then(|other| farthest_from(positions, other))
    };

    let index = choice.unwrap_or_else(|| own_index.filter(|&i| i < positions.len()).unwrap_or(0));
    Some((index, positions[index]))
}

/// Slot maximizing distance to the other cat (first one wins ties)
fn farthest_from(positions: &[Vec2], other: Avoid) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, pos) in positions.iter().enumerate() {
        if Some(i) == other.index {
            continue;
        }
        let d = pos.distance(other.position);
        if best.is_none_or(|(_, best_d)| d > best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Enter from the half opposite the target, flipped with `flip_probability`
pub fn choose_spawn_side<R: Rng + ?Sized>(
    target_x: f32,
    bounds: &Bounds,
    flip_probability: f64,
    rng: &mut R,
) -> Side {
    let target_half = if target_x < bounds.mid_x() {
        Side::Left
    } else {
        Side::Right
    };
    let side = target_half.opposite();
    if rng.random_bool(flip_probability.clamp(0.0, 1.0)) {
        side.opposite()
    } else {
        side
    }
}
