//! Line Probes
//!
//! Single ray-cast queries used by interaction, melee, weapon fire and drop
//! placement. `Raycast` is the seam to whatever physics scene answers the
//! query; `SceneQuery` answers it against a flat floor, static boxes and
//! actor bounding spheres, which is all the gameplay layer needs.

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::game::events::GameEventData;
use crate::game::types::ActorId;

/// Result of a probe. Empty when nothing blocked the ray.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    /// Something blocked the ray
    pub blocking_hit: bool,
    /// Actor that blocked it; `None` for static geometry or no hit
    pub actor: Option<ActorId>,
    /// Impact location (zero when empty)
    pub impact_point: Vec3,
    /// Ray start
    pub trace_start: Vec3,
    /// Ray end
    pub trace_end: Vec3,
}

impl HitResult {
    /// A miss along the given segment.
    pub fn empty(trace_start: Vec3, trace_end: Vec3) -> Self {
        Self {
            blocking_hit: false,
            actor: None,
            impact_point: Vec3::ZERO,
            trace_start,
            trace_end,
        }
    }

    /// Result with no trace at all (e.g. fire refused).
    pub fn none() -> Self {
        Self::empty(Vec3::ZERO, Vec3::ZERO)
    }

    /// Did the ray hit an actor?
    pub fn hit_actor(&self) -> Option<ActorId> {
        self.actor
    }
}

/// First blocking intersection along a segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Actor hit, or `None` for static geometry
    pub actor: Option<ActorId>,
    /// Intersection point
    pub point: Vec3,
    /// Distance from the segment start
    pub distance: f32,
}

/// Physics query service.
pub trait Raycast {
    /// First blocking hit between `start` and `end`, skipping `ignore`.
    fn first_hit(&self, start: Vec3, end: Vec3, ignore: Option<ActorId>) -> Option<RayHit>;
}

// =============================================================================
// LINE PROBE
// =============================================================================

/// Stateless probe helper.
pub struct LineProbe;

impl LineProbe {
    /// Cast from `start` to `end`, excluding `ignore`.
    pub fn probe<R: Raycast + ?Sized>(scene: &R, start: Vec3, end: Vec3, ignore: Option<ActorId>) -> HitResult {
        match scene.first_hit(start, end, ignore) {
            Some(hit) => HitResult {
                blocking_hit: true,
                actor: hit.actor,
                impact_point: hit.point,
                trace_start: start,
                trace_end: end,
            },
            None => HitResult::empty(start, end),
        }
    }

    /// Same as [`LineProbe::probe`], also returning a debug line cue.
    pub fn probe_debug<R: Raycast + ?Sized>(
        scene: &R,
        start: Vec3,
        end: Vec3,
        ignore: Option<ActorId>,
    ) -> (HitResult, GameEventData) {
        let hit = Self::probe(scene, start, end, ignore);
        let line = GameEventData::DebugLine {
            start,
            end: if hit.blocking_hit { hit.impact_point } else { end },
            hit: hit.blocking_hit,
        };
        (hit, line)
    }
}

// =============================================================================
// SCENE GEOMETRY
// =============================================================================

/// Axis-aligned static box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Box from two corners in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    /// Slab test. Returns entry distance along `dir` within `[0, max_t]`.
    fn intersect(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = max_t;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Static level description.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Level {
    /// Height of the infinite floor plane, if any
    pub floor_z: Option<f32>,
    /// Static blocking boxes
    pub blocks: Vec<Aabb>,
    /// Spawn point locations placed in the level
    pub spawn_points: Vec<Vec3>,
}

impl Level {
    /// Flat level with a floor at `z` and nothing else.
    pub fn flat(z: f32) -> Self {
        Self {
            floor_z: Some(z),
            ..Default::default()
        }
    }
}

/// A collidable actor, approximated as a sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    /// Owner
    pub actor: ActorId,
    /// Centre
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

/// Raycast over a level and a snapshot of actor colliders.
pub struct SceneQuery<'a> {
    level: &'a Level,
    colliders: Vec<Collider>,
}

impl<'a> SceneQuery<'a> {
    /// Build a query scene.
    pub fn new(level: &'a Level, colliders: Vec<Collider>) -> Self {
        Self { level, colliders }
    }

    /// Colliders in the scene.
    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }
}

/// Entry distance of a ray into a sphere, within `[0, max_t]`.
fn ray_sphere(origin: Vec3, dir: Vec3, max_t: f32, center: Vec3, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(dir);
    let c = m.length_squared() - radius * radius;

    // Outside and pointing away
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()).max(0.0);
    (t <= max_t).then_some(t)
}

impl Raycast for SceneQuery<'_> {
    fn first_hit(&self, start: Vec3, end: Vec3, ignore: Option<ActorId>) -> Option<RayHit> {
        let segment = end - start;
        let length = segment.length();
        if length <= f32::EPSILON {
            return None;
        }
        let dir = segment / length;

        let mut best: Option<RayHit> = None;
        let mut consider = |actor: Option<ActorId>, t: f32| {
            let closer = match &best {
                None => true,
                // Ties favour actors, then lower ids
                Some(b) => t < b.distance || (t == b.distance && actor.is_some() && (b.actor.is_none() || actor < b.actor)),
            };
            if closer {
                best = Some(RayHit { actor, point: start + dir * t, distance: t });
            }
        };

        if let Some(floor) = self.level.floor_z {
            if dir.z.abs() > f32::EPSILON {
                let t = (floor - start.z) / dir.z;
                if (0.0..=length).contains(&t) {
                    consider(None, t);
                }
            }
        }

        for block in &self.level.blocks {
            if let Some(t) = block.intersect(start, dir, length) {
                consider(None, t);
            }
        }

        for collider in &self.colliders {
            if Some(collider.actor) == ignore {
                continue;
            }
            if let Some(t) = ray_sphere(start, dir, length, collider.center, collider.radius) {
                consider(Some(collider.actor), t);
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with(level: &Level, colliders: Vec<Collider>) -> SceneQuery<'_> {
        SceneQuery::new(level, colliders)
    }

    #[test]
    fn test_probe_hits_nearest_actor() {
        let level = Level::default();
        let scene = scene_with(&level, vec![
            Collider { actor: ActorId(2), center: Vec3::new(500.0, 0.0, 0.0), radius: 30.0 },
            Collider { actor: ActorId(1), center: Vec3::new(200.0, 0.0, 0.0), radius: 30.0 },
        ]);

        let hit = LineProbe::probe(&scene, Vec3::ZERO, Vec3::new(1000.0, 0.0, 0.0), None);
        assert!(hit.blocking_hit);
        assert_eq!(hit.actor, Some(ActorId(1)));
        assert!((hit.impact_point.x - 170.0).abs() < 1e-3);
        assert_eq!(hit.trace_end, Vec3::new(1000.0, 0.0, 0.0));
    }

    #[test]
    fn test_probe_ignores_caster() {
        let level = Level::default();
        let scene = scene_with(&level, vec![
            Collider { actor: ActorId(1), center: Vec3::ZERO, radius: 40.0 },
        ]);

        let hit = LineProbe::probe(&scene, Vec3::ZERO, Vec3::new(600.0, 0.0, 0.0), Some(ActorId(1)));
        assert!(!hit.blocking_hit);
        assert_eq!(hit.actor, None);
        assert_eq!(hit.impact_point, Vec3::ZERO);
    }

    #[test]
    fn test_probe_out_of_range() {
        let level = Level::default();
        let scene = scene_with(&level, vec![
            Collider { actor: ActorId(1), center: Vec3::new(700.0, 0.0, 0.0), radius: 30.0 },
        ]);

        let hit = LineProbe::probe(&scene, Vec3::ZERO, Vec3::new(600.0, 0.0, 0.0), None);
        assert!(!hit.blocking_hit);
    }

    #[test]
    fn test_floor_hit_has_no_actor() {
        let level = Level::flat(0.0);
        let scene = scene_with(&level, Vec::new());

        let hit = LineProbe::probe(&scene, Vec3::new(10.0, 20.0, 100.0), Vec3::new(10.0, 20.0, -1900.0), None);
        assert!(hit.blocking_hit);
        assert_eq!(hit.actor, None);
        assert_eq!(hit.impact_point, Vec3::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_wall_blocks_actor_behind_it() {
        let level = Level {
            blocks: vec![Aabb::new(Vec3::new(100.0, -50.0, -50.0), Vec3::new(120.0, 50.0, 50.0))],
            ..Default::default()
        };
        let scene = scene_with(&level, vec![
            Collider { actor: ActorId(3), center: Vec3::new(300.0, 0.0, 0.0), radius: 30.0 },
        ]);

        let hit = LineProbe::probe(&scene, Vec3::ZERO, Vec3::new(600.0, 0.0, 0.0), None);
        assert!(hit.blocking_hit);
        assert_eq!(hit.actor, None);
        assert!((hit.impact_point.x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_debug_line_ends_at_impact() {
        let level = Level::flat(0.0);
        let scene = scene_with(&level, Vec::new());

        let (hit, line) = LineProbe::probe_debug(&scene, Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -10.0), None);
        assert!(hit.blocking_hit);
        assert_eq!(line, GameEventData::DebugLine {
            start: Vec3::new(0.0, 0.0, 10.0),
            end: Vec3::ZERO,
            hit: true,
        });
    }

    #[test]
    fn test_zero_length_probe_is_empty() {
        let level = Level::flat(0.0);
        let scene = scene_with(&level, Vec::new());
        assert!(!LineProbe::probe(&scene, Vec3::ZERO, Vec3::ZERO, None).blocking_hit);
    }
}
