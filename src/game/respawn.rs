//! Respawn Coordinator
//!
//! Collects the level's spawn points at startup and turns a login or a death
//! into a freshly possessed character. A controller has at most one pending
//! respawn; asking again while one is pending returns the same timer.

use std::collections::BTreeMap;
use std::time::Duration;

use glam::Vec3;
use tracing::{debug, info};

use crate::core::rng::DeterministicRng;
use crate::core::timer::TimerHandle;
use crate::game::config::RespawnConfig;
use crate::game::error::{GameError, GameResult};
use crate::game::events::{EventPriority, EventScope, GameEventData};
use crate::game::probe::Level;
use crate::game::tick::TimerEvent;
use crate::game::types::{ActorId, ControllerId};
use crate::game::world::World;

/// Spawn point registry and pending respawn timers.
#[derive(Clone, Debug)]
pub struct RespawnCoordinator {
    spawn_points: Vec<Vec3>,
    default_spawn: Vec3,
    respawn_delay: Duration,
    pending: BTreeMap<ControllerId, TimerHandle>,
}

impl RespawnCoordinator {
    /// Gather spawn points from the level.
    pub fn begin_play(level: &Level, config: &RespawnConfig) -> Self {
        if level.spawn_points.is_empty() {
            debug!(default = ?config.default_spawn, "Level has no spawn points");
        }
        Self {
            spawn_points: level.spawn_points.clone(),
            default_spawn: config.default_spawn,
            respawn_delay: config.respawn_delay(),
            pending: BTreeMap::new(),
        }
    }

    /// Registered spawn points.
    pub fn spawn_points(&self) -> &[Vec3] {
        &self.spawn_points
    }

    /// Uniform choice among spawn points, or the default location.
    pub fn pick_spawn(&self, rng: &mut DeterministicRng) -> Vec3 {
        rng.choose(&self.spawn_points).copied().unwrap_or(self.default_spawn)
    }

    /// Is a respawn scheduled for `controller`?
    pub fn is_pending(&self, controller: ControllerId) -> bool {
        self.pending.contains_key(&controller)
    }

    /// Delay between death and respawn.
    pub fn respawn_delay(&self) -> Duration {
        self.respawn_delay
    }
}

impl World {
    /// First possession after login. Spawns immediately.
    pub fn post_login(&mut self, controller: ControllerId) -> GameResult<ActorId> {
        if !self.controllers.contains_key(&controller) {
            return Err(GameError::InvalidRequest(format!("unknown {controller}")));
        }
        if self.living_pawn(controller).is_ok() {
            return Err(GameError::InvalidRequest(format!("{controller} already has a pawn")));
        }
        self.spawn_for(controller)
    }

    /// Schedule a replacement pawn after the respawn delay.
    pub fn request_respawn(&mut self, controller: ControllerId) -> GameResult<TimerHandle> {
        if !self.controllers.contains_key(&controller) {
            return Err(GameError::InvalidRequest(format!("unknown {controller}")));
        }
        if let Some(handle) = self.respawn.pending.get(&controller) {
            return Ok(*handle);
        }

        let delay = self.respawn.respawn_delay;
        let handle = self.timers.schedule(delay, false, TimerEvent::Respawn(controller));
        self.respawn.pending.insert(controller, handle);
        debug!(%controller, ?delay, "Respawn scheduled");
        Ok(handle)
    }

    /// Drop a pending respawn. Returns whether one was pending.
    pub fn cancel_respawn(&mut self, controller: ControllerId) -> bool {
        match self.respawn.pending.remove(&controller) {
            Some(handle) => {
                self.timers.cancel(handle);
                true
            }
            None => false,
        }
    }

    /// Spawn a character at a random spawn point and hand it to `controller`.
    pub(crate) fn spawn_for(&mut self, controller: ControllerId) -> GameResult<ActorId> {
        self.respawn.pending.remove(&controller);
        if !self.controllers.contains_key(&controller) {
            return Err(GameError::InvalidRequest(format!("unknown {controller}")));
        }

        // The old body stays in the world unpossessed until it is destroyed
        if let Some(corpse) = self.pawn_of(controller).and_then(|p| self.characters.get_mut(&p)) {
            corpse.controller = None;
        }

        let location = self.respawn.pick_spawn(&mut self.rng);
        let character = self.spawn_character(location);
        if let Some(pawn) = self.characters.get_mut(&character) {
            pawn.controller = Some(controller);
            pawn.stats.start_timers(&mut self.timers, character);
        }
        if let Some(entry) = self.controllers.get_mut(&controller) {
            entry.pawn = Some(character);
        }

        self.push_event(
            EventPriority::Lifecycle,
            EventScope::All,
            GameEventData::CharacterSpawned { controller, character, location },
        );
        info!(%controller, %character, ?location, "Character spawned");
        Ok(character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::GameConfig;
    use crate::game::tick::tick;
    use crate::game::world::tests::test_world;

    fn level_with_spawns() -> Level {
        let mut level = Level::flat(0.0);
        level.spawn_points = vec![
            Vec3::new(100.0, 0.0, 90.0),
            Vec3::new(-100.0, 0.0, 90.0),
            Vec3::new(0.0, 500.0, 90.0),
        ];
        level
    }

    #[test]
    fn test_default_spawn_without_points() {
        let (world, player) = test_world();
        assert!(world.respawn.spawn_points().is_empty());
        assert_eq!(world.characters[&player].position, world.config.respawn.default_spawn);
    }

    #[test]
    fn test_pick_spawn_uses_level_points() {
        let level = level_with_spawns();
        let coordinator = RespawnCoordinator::begin_play(&level, &RespawnConfig::default());
        let mut rng = DeterministicRng::new(7);
        for _ in 0..32 {
            let at = coordinator.pick_spawn(&mut rng);
            assert!(level.spawn_points.contains(&at));
        }
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let spawn = |seed| {
            let mut world = World::new(GameConfig::default(), level_with_spawns(), seed);
            let controller = world.add_controller();
            let pawn = world.post_login(controller).unwrap();
            world.characters[&pawn].position
        };
        assert_eq!(spawn(99), spawn(99));
    }

    #[test]
    fn test_post_login_requires_no_living_pawn() {
        let (mut world, player) = test_world();
        let controller = world.controller_of(player).unwrap();
        assert!(world.post_login(controller).is_err());
        assert!(world.post_login(ControllerId(42)).is_err());
    }

    #[test]
    fn test_respawn_request_is_deduplicated() {
        let (mut world, player) = test_world();
        let controller = world.controller_of(player).unwrap();

        let first = world.request_respawn(controller).unwrap();
        let second = world.request_respawn(controller).unwrap();
        assert_eq!(first, second);
        assert!(world.respawn.is_pending(controller));

        assert!(world.cancel_respawn(controller));
        assert!(!world.respawn.is_pending(controller));
        assert!(!world.timers.is_active(first));
    }

    #[test]
    fn test_respawn_after_delay() {
        let (mut world, player) = test_world();
        let controller = world.controller_of(player).unwrap();
        world.die(player, None).unwrap();
        assert!(world.respawn.is_pending(controller));
        assert_eq!(world.pawn_of(controller), Some(player));

        tick(&mut world, &[], Duration::from_millis(4900));
        assert_eq!(world.pawn_of(controller), Some(player));

        let result = tick(&mut world, &[], Duration::from_millis(100));
        let pawn = world.pawn_of(controller).unwrap();
        assert_ne!(pawn, player);
        assert_eq!(world.controller_of(player), None);
        assert_eq!(world.controller_of(pawn), Some(controller));
        assert!(!world.respawn.is_pending(controller));
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::CharacterSpawned { character, .. } if character == pawn)));
    }
}
