//! Authoritative World
//!
//! All actors of one session, keyed by id. Uses BTreeMap for deterministic
//! iteration order, so probes, drops and hashes come out identical for the
//! same seed and the same request stream.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::rng::DeterministicRng;
use crate::core::timer::TimerService;
use crate::game::character::{Character, CHARACTER_RADIUS};
use crate::game::config::GameConfig;
use crate::game::container::{StorageContainer, CONTAINER_RADIUS};
use crate::game::error::{GameError, GameResult};
use crate::game::events::{EventPriority, EventScope, GameEvent, GameEventData};
use crate::game::inventory::Inventory;
use crate::game::pickup::{AmmoStack, Pickup, PICKUP_RADIUS};
use crate::game::probe::{Collider, Level, SceneQuery};
use crate::game::respawn::RespawnCoordinator;
use crate::game::tick::TimerEvent;
use crate::game::types::{ActorId, ActorKind, AmmoType, ControllerId, PickupType};
use crate::game::weapon::{Weapon, WEAPON_RADIUS};

// =============================================================================
// CONTROLLERS
// =============================================================================

/// A connected player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    /// Controller id
    pub id: ControllerId,
    /// Possessed character (may be a corpse until the respawn)
    pub pawn: Option<ActorId>,
}

/// Location and velocity as reported by the movement layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovementUpdate {
    /// Capsule centre
    pub position: Vec3,
    /// Current velocity
    pub velocity: Vec3,
    /// View yaw, degrees
    pub yaw: f32,
    /// Airborne
    pub is_falling: bool,
}

// =============================================================================
// WORLD
// =============================================================================

/// Complete authoritative state of a session.
#[derive(Clone, Debug)]
pub struct World {
    /// Gameplay tuning
    pub config: GameConfig,

    /// Static geometry and spawn points
    pub level: Level,

    /// Current tick
    pub tick: u64,

    /// Player characters, alive or dead
    pub characters: BTreeMap<ActorId, Character>,

    /// Consumables, in the world or held
    pub pickups: BTreeMap<ActorId, Pickup>,

    /// Ammo stacks in the world
    pub ammo: BTreeMap<ActorId, AmmoStack>,

    /// Weapons, in the world or carried
    pub weapons: BTreeMap<ActorId, Weapon>,

    /// Storage containers
    pub containers: BTreeMap<ActorId, StorageContainer>,

    /// Connected controllers
    pub controllers: BTreeMap<ControllerId, Controller>,

    /// Deferred callbacks (stat ticks, reload, respawn, corpse removal)
    pub timers: TimerService<TimerEvent>,

    /// Spawn point selection and pending respawns
    pub respawn: RespawnCoordinator,

    /// Deterministic RNG
    pub rng: DeterministicRng,

    next_actor_id: u32,
    next_controller_id: u32,
    pending_events: Vec<GameEvent>,
}

impl World {
    /// Create an empty world over `level`.
    pub fn new(config: GameConfig, level: Level, seed: u64) -> Self {
        let respawn = RespawnCoordinator::begin_play(&level, &config.respawn);
        Self {
            config,
            level,
            tick: 0,
            characters: BTreeMap::new(),
            pickups: BTreeMap::new(),
            ammo: BTreeMap::new(),
            weapons: BTreeMap::new(),
            containers: BTreeMap::new(),
            controllers: BTreeMap::new(),
            timers: TimerService::new(),
            respawn,
            rng: DeterministicRng::new(seed),
            next_actor_id: 1,
            next_controller_id: 1,
            pending_events: Vec::new(),
        }
    }

    fn allocate_actor_id(&mut self) -> ActorId {
        let id = ActorId(self.next_actor_id);
        self.next_actor_id += 1;
        id
    }

    // =========================================================================
    // Controllers
    // =========================================================================

    /// Register a new controller without a pawn.
    pub fn add_controller(&mut self) -> ControllerId {
        let id = ControllerId(self.next_controller_id);
        self.next_controller_id += 1;
        self.controllers.insert(id, Controller { id, pawn: None });
        id
    }

    /// Character possessed by `controller`, alive or not.
    pub fn pawn_of(&self, controller: ControllerId) -> Option<ActorId> {
        self.controllers.get(&controller).and_then(|c| c.pawn)
    }

    /// Living character possessed by `controller`.
    pub fn living_pawn(&self, controller: ControllerId) -> GameResult<ActorId> {
        self.pawn_of(controller)
            .filter(|pawn| self.characters.get(pawn).map(|c| c.is_alive()).unwrap_or(false))
            .ok_or_else(|| GameError::no_pawn(controller))
    }

    /// Controller possessing `character`.
    pub fn controller_of(&self, character: ActorId) -> Option<ControllerId> {
        self.characters.get(&character).and_then(|c| c.controller)
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    /// Place a new, unpossessed character.
    pub fn spawn_character(&mut self, position: Vec3) -> ActorId {
        let id = self.allocate_actor_id();
        let character = Character::new(id, position, &self.config);
        self.characters.insert(id, character);
        id
    }

    /// Place a consumable. `None` uses the configured default amount.
    pub fn spawn_pickup(&mut self, pickup_type: PickupType, amount: Option<f32>, position: Vec3) -> ActorId {
        let id = self.allocate_actor_id();
        let amount = amount.unwrap_or(self.config.inventory.default_pickup_amount);
        self.pickups.insert(id, Pickup::new(id, pickup_type, amount, position));
        id
    }

    /// Place an ammo stack.
    pub fn spawn_ammo(&mut self, ammo_type: AmmoType, amount: u32, position: Vec3) -> ActorId {
        let id = self.allocate_actor_id();
        self.ammo.insert(id, AmmoStack::new(id, ammo_type, amount, position));
        id
    }

    /// Place a world weapon from its table row, with a full magazine.
    pub fn spawn_weapon(&mut self, name: &str, position: Vec3) -> GameResult<ActorId> {
        let data = self
            .config
            .weapons
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::InvalidRequest(format!("unknown weapon {name}")))?;
        let id = self.allocate_actor_id();
        self.weapons.insert(id, Weapon::new(id, name, data, position));
        Ok(id)
    }

    /// Place a storage container. `None` uses the configured capacity.
    pub fn spawn_container(&mut self, position: Vec3, capacity: Option<usize>) -> ActorId {
        let id = self.allocate_actor_id();
        let capacity = capacity.unwrap_or(self.config.inventory.container_capacity);
        self.containers.insert(id, StorageContainer::new(id, position, capacity));
        id
    }

    /// Remove an actor from the world.
    ///
    /// Items still held by a character or container go back to the world.
    pub fn destroy_actor(&mut self, actor: ActorId) -> bool {
        let holds_items = self.inventory(actor).map(|inv| !inv.is_empty()).unwrap_or(false);
        if holds_items {
            if let Err(e) = self.drop_all_inventory(actor) {
                debug!(%actor, error = %e, "Could not release held items");
            }
        }

        let removed = match self.kind_of(actor) {
            Some(ActorKind::Character) => {
                if let Some(mut character) = self.characters.remove(&actor) {
                    character.stats.stop_timers(&mut self.timers);
                    if let Some(handle) = character.reload_timer.take() {
                        self.timers.cancel(handle);
                    }
                    if let Some(container) = character.opened_container {
                        if let Some(container) = self.containers.get_mut(&container) {
                            container.close(actor);
                        }
                    }
                    for controller in self.controllers.values_mut() {
                        if controller.pawn == Some(actor) {
                            controller.pawn = None;
                        }
                    }
                }
                true
            }
            Some(ActorKind::Pickup) => self.pickups.remove(&actor).is_some(),
            Some(ActorKind::Ammo) => self.ammo.remove(&actor).is_some(),
            Some(ActorKind::Weapon) => self.weapons.remove(&actor).is_some(),
            Some(ActorKind::Container) => self.containers.remove(&actor).is_some(),
            None => false,
        };

        if removed {
            debug!(%actor, "Actor destroyed");
            self.push_event(
                EventPriority::Lifecycle,
                EventScope::All,
                GameEventData::ActorDestroyed { actor },
            );
        }
        removed
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Which collection an id lives in.
    pub fn kind_of(&self, actor: ActorId) -> Option<ActorKind> {
        if self.characters.contains_key(&actor) {
            Some(ActorKind::Character)
        } else if self.pickups.contains_key(&actor) {
            Some(ActorKind::Pickup)
        } else if self.ammo.contains_key(&actor) {
            Some(ActorKind::Ammo)
        } else if self.weapons.contains_key(&actor) {
            Some(ActorKind::Weapon)
        } else if self.containers.contains_key(&actor) {
            Some(ActorKind::Container)
        } else {
            None
        }
    }

    /// World location of an actor. Carried weapons report their holder's.
    pub fn actor_position(&self, actor: ActorId) -> Option<Vec3> {
        match self.kind_of(actor)? {
            ActorKind::Character => self.characters.get(&actor).map(|c| c.position),
            ActorKind::Pickup => self.pickups.get(&actor).map(|p| p.position),
            ActorKind::Ammo => self.ammo.get(&actor).map(|a| a.position),
            ActorKind::Weapon => {
                let weapon = self.weapons.get(&actor)?;
                match weapon.holder {
                    Some(holder) => self.actor_position(holder),
                    None => Some(weapon.position),
                }
            }
            ActorKind::Container => self.containers.get(&actor).map(|c| c.position),
        }
    }

    /// Inventory of a character or container.
    pub fn inventory(&self, owner: ActorId) -> Option<&Inventory> {
        if let Some(character) = self.characters.get(&owner) {
            return Some(&character.inventory);
        }
        self.containers.get(&owner).map(|c| &c.inventory)
    }

    /// Mutable inventory of a character or container.
    pub fn inventory_mut(&mut self, owner: ActorId) -> Option<&mut Inventory> {
        if let Some(character) = self.characters.get_mut(&owner) {
            return Some(&mut character.inventory);
        }
        self.containers.get_mut(&owner).map(|c| &mut c.inventory)
    }

    // =========================================================================
    // Probing
    // =========================================================================

    /// Everything a ray can currently hit.
    pub fn colliders(&self) -> Vec<Collider> {
        let characters = self
            .characters
            .values()
            .filter(|c| c.collision_enabled)
            .map(|c| Collider { actor: c.id, center: c.position, radius: CHARACTER_RADIUS });
        let pickups = self
            .pickups
            .values()
            .filter(|p| p.is_collidable())
            .map(|p| Collider { actor: p.id, center: p.position, radius: PICKUP_RADIUS });
        let ammo = self
            .ammo
            .values()
            .map(|a| Collider { actor: a.id, center: a.position, radius: PICKUP_RADIUS });
        let weapons = self
            .weapons
            .values()
            .filter(|w| w.is_in_world())
            .map(|w| Collider { actor: w.id, center: w.position, radius: WEAPON_RADIUS });
        let containers = self
            .containers
            .values()
            .map(|c| Collider { actor: c.id, center: c.position, radius: CONTAINER_RADIUS });

        characters.chain(pickups).chain(ammo).chain(weapons).chain(containers).collect()
    }

    /// Probe scene over the level and current colliders.
    pub fn scene(&self) -> SceneQuery<'_> {
        SceneQuery::new(&self.level, self.colliders())
    }

    /// Apply a movement-layer update to a living, movable character.
    pub fn update_movement(&mut self, character: ActorId, update: MovementUpdate) -> GameResult<()> {
        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        if !pawn.is_alive() || !pawn.movement_enabled {
            return Err(GameError::InvalidRequest(format!("{character} cannot move")));
        }
        if !update.position.is_finite() || !update.velocity.is_finite() || !update.yaw.is_finite() {
            return Err(GameError::InvalidRequest("non-finite movement".into()));
        }
        pawn.position = update.position;
        pawn.velocity = update.velocity;
        pawn.yaw = update.yaw;
        pawn.is_falling = update.is_falling;
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Queue an event stamped with the current tick.
    pub fn push_event(&mut self, priority: EventPriority, scope: EventScope, data: GameEventData) {
        self.pending_events.push(GameEvent::new(self.tick, priority, scope, data));
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    /// Hash of all gameplay state, for divergence checks.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng.state(), |hasher| {
            for character in self.characters.values() {
                hasher.update_u32(character.id.0);
                hasher.update_opt_u32(character.controller.map(|c| c.0));
                hasher.update_vec3(character.position);
                hasher.update_f32(character.stats.health());
                hasher.update_f32(character.stats.hunger());
                hasher.update_f32(character.stats.thirst());
                hasher.update_f32(character.stats.stamina());
                for ammo_type in AmmoType::ALL {
                    hasher.update_u32(character.stats.ammo(ammo_type));
                }
                hasher.update_bool(character.is_dead);
                hasher.update_bool(character.is_reloading);
                hasher.update_opt_u32(character.active_weapon.map(|w| w.0));
                hasher.update_opt_u32(character.opened_container.map(|c| c.0));
                hasher.update_u32(character.inventory.count() as u32);
                for item in character.inventory.items() {
                    hasher.update_u32(item.0);
                }
            }

            for pickup in self.pickups.values() {
                hasher.update_u32(pickup.id.0);
                hasher.update_u8(pickup.pickup_type as u8);
                hasher.update_vec3(pickup.position);
                hasher.update_bool(pickup.held);
            }

            for stack in self.ammo.values() {
                hasher.update_u32(stack.id.0);
                hasher.update_u8(stack.ammo_type as u8);
                hasher.update_u32(stack.amount);
            }

            for weapon in self.weapons.values() {
                hasher.update_u32(weapon.id.0);
                hasher.update_u32(weapon.magazine);
                hasher.update_u8(weapon.attachment as u8);
                hasher.update_opt_u32(weapon.holder.map(|h| h.0));
            }

            for container in self.containers.values() {
                hasher.update_u32(container.id.0);
                hasher.update_opt_u32(container.opener().map(|o| o.0));
                for item in container.inventory.items() {
                    hasher.update_u32(item.0);
                }
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Flat world with one logged-in player at the default spawn.
    pub(crate) fn test_world() -> (World, ActorId) {
        let mut world = World::new(GameConfig::default(), Level::flat(0.0), 12345);
        let controller = world.add_controller();
        let player = world.post_login(controller).unwrap();
        (world, player)
    }

    #[test]
    fn test_spawn_ids_are_unique() {
        let (mut world, player) = test_world();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        let rifle = world.spawn_weapon("AR-15", Vec3::ZERO).unwrap();
        let chest = world.spawn_container(Vec3::ZERO, None);

        let ids = [player, food, rifle, chest];
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(world.kind_of(rifle), Some(ActorKind::Weapon));
        assert_eq!(world.kind_of(chest), Some(ActorKind::Container));
        assert_eq!(world.pickups[&food].amount, 30.0);
        assert_eq!(world.containers[&chest].inventory.capacity(), 16);
    }

    #[test]
    fn test_unknown_weapon_row() {
        let (mut world, _) = test_world();
        assert!(world.spawn_weapon("Crossbow", Vec3::ZERO).is_err());
    }

    #[test]
    fn test_held_pickups_are_not_collidable() {
        let (mut world, player) = test_world();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::new(100.0, 0.0, 0.0));
        assert!(world.colliders().iter().any(|c| c.actor == food));

        world.add_item(player, Some(food)).unwrap();
        assert!(!world.colliders().iter().any(|c| c.actor == food));
    }

    #[test]
    fn test_destroy_actor_emits_event() {
        let (mut world, _) = test_world();
        let stack = world.spawn_ammo(AmmoType::Sniper, 5, Vec3::ZERO);
        world.take_events();

        assert!(world.destroy_actor(stack));
        assert!(!world.destroy_actor(stack));
        let events = world.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, GameEventData::ActorDestroyed { actor: stack });
    }

    #[test]
    fn test_update_movement_rejects_dead() {
        let (mut world, player) = test_world();
        let update = MovementUpdate {
            position: Vec3::new(10.0, 20.0, 30.0),
            velocity: Vec3::X,
            yaw: 45.0,
            is_falling: false,
        };
        world.update_movement(player, update).unwrap();
        assert_eq!(world.actor_position(player), Some(update.position));

        world.characters.get_mut(&player).unwrap().is_dead = true;
        assert!(world.update_movement(player, update).is_err());
    }

    #[test]
    fn test_world_hash_determinism() {
        let (mut a, pa) = test_world();
        let (mut b, pb) = test_world();
        assert_eq!(a.compute_hash(), b.compute_hash());

        let fa = a.spawn_pickup(PickupType::Water, None, Vec3::ZERO);
        let fb = b.spawn_pickup(PickupType::Water, None, Vec3::ZERO);
        a.add_item(pa, Some(fa)).unwrap();
        b.add_item(pb, Some(fb)).unwrap();
        a.drop_item(pa, fa).unwrap();
        b.drop_item(pb, fb).unwrap();
        assert_eq!(a.compute_hash(), b.compute_hash());

        a.spawn_ammo(AmmoType::Assault, 1, Vec3::ZERO);
        assert_ne!(a.compute_hash(), b.compute_hash());
    }
}
