//! Weapons
//!
//! A firearm with a magazine, configured from a weapon table row.
//!
//! ## Fire protocol
//!
//! 1. The client fires locally with [`Weapon::fire_predicted`] for immediate
//!    feedback. This never touches the magazine.
//! 2. The client sends its hit and aim point to the authority.
//! 3. The authority runs [`Weapon::fire_authoritative`]: spends a round,
//!    re-probes the same ray and checks the client's trace with
//!    [`is_valid_shot`] before any damage is applied.

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::game::config::WeaponData;
use crate::game::error::{GameError, GameResult};
use crate::game::probe::{HitResult, LineProbe, Raycast};
use crate::game::stats::StatTracker;
use crate::game::types::{ActorId, AmmoType, Attachment};

/// Collision radius of a weapon lying in the world.
pub const WEAPON_RADIUS: f32 = 30.0;

/// Ray parameters for one shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShotParams {
    /// Muzzle location
    pub muzzle: Vec3,
    /// Muzzle forward direction
    pub forward: Vec3,
    /// Aim point, used only while aiming
    pub aim_point: Option<Vec3>,
    /// Ray length
    pub range: f32,
    /// Shooter, excluded from the probe
    pub shooter: Option<ActorId>,
}

impl ShotParams {
    /// Ray end point.
    pub fn trace_end(&self) -> Vec3 {
        let direction = match self.aim_point {
            Some(aim) => (aim - self.muzzle).try_normalize().unwrap_or(self.forward),
            None => self.forward,
        };
        self.muzzle + direction * self.range
    }
}

/// What the authority concluded about one shot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShotOutcome {
    /// Server-side probe
    pub server_hit: HitResult,
    /// Client trace matched the server trace
    pub valid: bool,
    /// Rounds left
    pub magazine: u32,
}

impl ShotOutcome {
    /// Actor that should take damage, if any.
    pub fn damage_target(&self) -> Option<ActorId> {
        if self.valid {
            self.server_hit.actor
        } else {
            None
        }
    }
}

/// Compare a client-reported trace with the server's.
///
/// Rejects when the server hit no actor. Otherwise both trace endpoints must
/// lie within `tolerance` of the server's; `None` skips that comparison.
pub fn is_valid_shot(client: &HitResult, server: &HitResult, tolerance: Option<f32>) -> bool {
    if server.actor.is_none() {
        return false;
    }
    match tolerance {
        Some(tolerance) => {
            client.trace_start.distance(server.trace_start) <= tolerance
                && client.trace_end.distance(server.trace_end) <= tolerance
        }
        None => true,
    }
}

/// A firearm actor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Weapon {
    /// Actor id
    pub id: ActorId,
    /// Weapon table row name
    pub name: String,
    /// Row contents
    pub data: WeaponData,
    /// Rounds loaded
    pub magazine: u32,
    /// Hand, back or world
    pub attachment: Attachment,
    /// Character carrying it
    pub holder: Option<ActorId>,
    /// World location (meaningful while in the world)
    pub position: Vec3,
}

impl Weapon {
    /// World weapon with a full magazine.
    pub fn new(id: ActorId, name: impl Into<String>, data: WeaponData, position: Vec3) -> Self {
        let magazine = data.magazine_size;
        Self {
            id,
            name: name.into(),
            data,
            magazine,
            attachment: Attachment::World,
            holder: None,
            position,
        }
    }

    /// Ammunition consumed.
    pub fn ammo_type(&self) -> AmmoType {
        self.data.ammo_type
    }

    /// Magazine capacity.
    pub fn max_magazine(&self) -> u32 {
        self.data.magazine_size
    }

    /// No rounds loaded.
    pub fn is_empty(&self) -> bool {
        self.magazine == 0
    }

    /// Magazine is not full.
    pub fn can_reload(&self) -> bool {
        self.magazine < self.data.magazine_size
    }

    /// Rounds needed to fill the magazine.
    pub fn deficit(&self) -> u32 {
        self.data.magazine_size.saturating_sub(self.magazine)
    }

    /// Lying in the world.
    pub fn is_in_world(&self) -> bool {
        self.attachment == Attachment::World
    }

    /// Client-side fire for local feedback. Leaves the magazine alone.
    pub fn fire_predicted<R: Raycast + ?Sized>(&self, scene: &R, shot: &ShotParams) -> HitResult {
        if self.is_empty() {
            return HitResult::none();
        }
        LineProbe::probe(scene, shot.muzzle, shot.trace_end(), shot.shooter)
    }

    /// Authoritative fire: spend a round, re-probe and validate.
    pub fn fire_authoritative<R: Raycast + ?Sized>(
        &mut self,
        scene: &R,
        shot: &ShotParams,
        client_hit: &HitResult,
        tolerance: Option<f32>,
    ) -> GameResult<ShotOutcome> {
        if self.is_empty() {
            return Err(GameError::ResourceExhausted(format!("{} is out of ammo", self.name)));
        }
        self.magazine -= 1;

        let server_hit = LineProbe::probe(scene, shot.muzzle, shot.trace_end(), shot.shooter);
        let valid = is_valid_shot(client_hit, &server_hit, tolerance);
        Ok(ShotOutcome {
            server_hit,
            valid,
            magazine: self.magazine,
        })
    }

    /// Refill from `stats`. Returns the rounds loaded.
    pub fn reload(&mut self, stats: &mut StatTracker) -> u32 {
        if !self.can_reload() {
            return 0;
        }
        let loaded = stats.subtract_reload_ammo(self.deficit(), self.ammo_type());
        self.magazine += loaded;
        loaded
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::{StatConfig, WeaponTable};
    use crate::game::probe::{Collider, Level, SceneQuery};
    use proptest::prelude::*;

    fn rifle() -> Weapon {
        let table = WeaponTable::default();
        Weapon::new(ActorId(5), "AR-15", table.get("AR-15").unwrap().clone(), Vec3::ZERO)
    }

    fn shot() -> ShotParams {
        ShotParams {
            muzzle: Vec3::ZERO,
            forward: Vec3::X,
            aim_point: None,
            range: 4000.0,
            shooter: Some(ActorId(1)),
        }
    }

    fn target_scene(level: &Level) -> SceneQuery<'_> {
        SceneQuery::new(level, vec![
            Collider { actor: ActorId(1), center: Vec3::ZERO, radius: 90.0 },
            Collider { actor: ActorId(2), center: Vec3::new(1000.0, 0.0, 0.0), radius: 90.0 },
        ])
    }

    #[test]
    fn test_trace_end_prefers_aim_point() {
        let mut params = shot();
        assert_eq!(params.trace_end(), Vec3::new(4000.0, 0.0, 0.0));

        params.aim_point = Some(Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(params.trace_end(), Vec3::new(0.0, 4000.0, 0.0));

        // Degenerate aim falls back to forward
        params.aim_point = Some(Vec3::ZERO);
        assert_eq!(params.trace_end(), Vec3::new(4000.0, 0.0, 0.0));
    }

    #[test]
    fn test_predicted_fire_keeps_magazine() {
        let level = Level::default();
        let scene = target_scene(&level);
        let weapon = rifle();

        let hit = weapon.fire_predicted(&scene, &shot());
        assert_eq!(hit.actor, Some(ActorId(2)));
        assert_eq!(weapon.magazine, 30);
    }

    #[test]
    fn test_predicted_fire_on_empty_returns_nothing() {
        let level = Level::default();
        let scene = target_scene(&level);
        let mut weapon = rifle();
        weapon.magazine = 0;

        let hit = weapon.fire_predicted(&scene, &shot());
        assert!(!hit.blocking_hit);
        assert_eq!(hit, HitResult::none());
    }

    #[test]
    fn test_fire_consumes_exactly_one_round() {
        let level = Level::default();
        let scene = target_scene(&level);
        let mut weapon = rifle();
        let client = weapon.fire_predicted(&scene, &shot());

        for expected in (0..30).rev() {
            let outcome = weapon.fire_authoritative(&scene, &shot(), &client, Some(15.0)).unwrap();
            assert_eq!(outcome.magazine, expected);
            assert_eq!(outcome.damage_target(), Some(ActorId(2)));
        }

        let exhausted = weapon.fire_authoritative(&scene, &shot(), &client, Some(15.0));
        assert!(matches!(exhausted, Err(GameError::ResourceExhausted(_))));
        assert_eq!(weapon.magazine, 0);
    }

    #[test]
    fn test_shot_validation_tolerance() {
        let server = HitResult {
            blocking_hit: true,
            actor: Some(ActorId(2)),
            impact_point: Vec3::new(910.0, 0.0, 0.0),
            trace_start: Vec3::ZERO,
            trace_end: Vec3::new(4000.0, 0.0, 0.0),
        };

        let mut client = server;
        client.trace_start = Vec3::new(10.0, 0.0, 0.0);
        assert!(is_valid_shot(&client, &server, Some(15.0)));

        client.trace_end = Vec3::new(4000.0, 20.0, 0.0);
        assert!(!is_valid_shot(&client, &server, Some(15.0)));
        assert!(is_valid_shot(&client, &server, None));

        // No server-side actor means no valid shot
        let mut miss = server;
        miss.actor = None;
        assert!(!is_valid_shot(&server, &miss, None));
    }

    #[test]
    fn test_reload_full_magazine_is_noop() {
        let mut weapon = rifle();
        let mut stats = StatTracker::new(&StatConfig::default());
        stats.add_ammo(AmmoType::Assault, 90).unwrap();

        assert_eq!(weapon.reload(&mut stats), 0);
        assert_eq!(stats.ammo(AmmoType::Assault), 90);
    }

    proptest! {
        #[test]
        fn prop_reload_conserves_rounds(reserve in 0u32..200, loaded in 0u32..=30) {
            let mut weapon = rifle();
            weapon.magazine = loaded;
            let mut stats = StatTracker::new(&StatConfig::default());
            stats.add_ammo(AmmoType::Assault, reserve).unwrap();

            let deficit = weapon.deficit();
            let moved = weapon.reload(&mut stats);

            prop_assert_eq!(moved, reserve.min(deficit));
            prop_assert_eq!(weapon.magazine, loaded + reserve.min(deficit));
            prop_assert_eq!(stats.ammo(AmmoType::Assault), reserve - reserve.min(deficit));
            prop_assert_eq!(weapon.magazine + stats.ammo(AmmoType::Assault), loaded + reserve);
        }
    }
}
