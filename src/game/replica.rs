//! Observer Replica
//!
//! Client-side copy of the world as one controller sees it. Applying a
//! replication update overwrites the cached state and reports what changed
//! as [`RepNotify`] values, which the presentation layer handles one way.
//!
//! Intents never mutate the replica. Each runs a local preflight against
//! cached state and, if it passes, yields the [`ServerRpc`] to send. The
//! authority validates again; the preflight only saves a round trip.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::hash::StateHash;
use crate::game::character::{direction_from_rotation, CHARACTER_RADIUS, PITCH_LIMIT};
use crate::game::config::GameConfig;
use crate::game::container::CONTAINER_RADIUS;
use crate::game::error::{GameError, GameResult};
use crate::game::interact::{ammo_hint, container_hint, pickup_hint, weapon_hint};
use crate::game::pickup::PICKUP_RADIUS;
use crate::game::probe::{Collider, HitResult, Level, LineProbe, SceneQuery};
use crate::game::replication::{AmmoState, CharacterState, ContainerState, PickupState, ReplicationUpdate, WeaponState};
use crate::game::rpc::ServerRpc;
use crate::game::stats::StatTracker;
use crate::game::types::{ActorId, AmmoType, Attachment, ControllerId};
use crate::game::weapon::{ShotParams, Weapon, WEAPON_RADIUS};

/// A replicated change, raised after an update is applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notify", rename_all = "snake_case")]
pub enum RepNotify {
    /// The observer possesses a different character.
    PawnChanged {
        /// New pawn
        pawn: Option<ActorId>,
    },
    /// Own health changed.
    HealthChanged {
        /// Pawn
        character: ActorId,
        /// New value
        health: f32,
    },
    /// A character died.
    Died {
        /// Victim
        character: ActorId,
    },
    /// A character started or stopped aiming.
    AimingChanged {
        /// Character
        character: ActorId,
        /// New flag
        aiming: bool,
    },
    /// A container was opened or closed.
    ContainerOpenChanged {
        /// Container
        container: ActorId,
        /// New flag
        is_open: bool,
    },
    /// Visible inventory contents changed.
    InventoryChanged {
        /// Character or container
        owner: ActorId,
    },
    /// Own weapon's magazine count changed.
    MagazineChanged {
        /// Weapon
        weapon: ActorId,
        /// Rounds loaded
        magazine: u32,
    },
    /// A pickup was collected or dropped.
    PickupHeldChanged {
        /// Pickup
        pickup: ActorId,
        /// New flag
        held: bool,
    },
    /// An actor left the world.
    ActorRemoved {
        /// Actor
        actor: ActorId,
    },
}

/// One controller's view of the world.
#[derive(Clone, Debug)]
pub struct ClientReplica {
    controller: ControllerId,
    config: GameConfig,
    level: Level,
    tick: u64,
    pawn: Option<ActorId>,
    characters: BTreeMap<ActorId, CharacterState>,
    pickups: BTreeMap<ActorId, PickupState>,
    ammo: BTreeMap<ActorId, AmmoState>,
    weapons: BTreeMap<ActorId, WeaponState>,
    containers: BTreeMap<ActorId, ContainerState>,
    stats: Option<StatTracker>,
    view_pitch: f32,
    interact_text: Option<String>,
    state_hash: Option<StateHash>,
}

fn keyed<T>(items: Vec<T>, id: impl Fn(&T) -> ActorId) -> BTreeMap<ActorId, T> {
    items.into_iter().map(|item| (id(&item), item)).collect()
}

impl ClientReplica {
    /// Empty replica for `controller`.
    pub fn new(controller: ControllerId, config: GameConfig, level: Level) -> Self {
        Self {
            controller,
            config,
            level,
            tick: 0,
            pawn: None,
            characters: BTreeMap::new(),
            pickups: BTreeMap::new(),
            ammo: BTreeMap::new(),
            weapons: BTreeMap::new(),
            containers: BTreeMap::new(),
            stats: None,
            view_pitch: 0.0,
            interact_text: None,
            state_hash: None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Owning controller.
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    /// Tick of the last applied update.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Possessed character.
    pub fn pawn(&self) -> Option<ActorId> {
        self.pawn
    }

    /// Replicated character.
    pub fn character(&self, id: ActorId) -> Option<&CharacterState> {
        self.characters.get(&id)
    }

    /// Replicated weapon.
    pub fn weapon(&self, id: ActorId) -> Option<&WeaponState> {
        self.weapons.get(&id)
    }

    /// Replicated container.
    pub fn container(&self, id: ActorId) -> Option<&ContainerState> {
        self.containers.get(&id)
    }

    /// Own vital stats.
    pub fn stats(&self) -> Option<&StatTracker> {
        self.stats.as_ref()
    }

    /// Own vital stats, for forwarding reductions to the authority.
    pub fn stats_mut(&mut self) -> Option<&mut StatTracker> {
        self.stats.as_mut()
    }

    /// Hint for whatever the pawn faces.
    pub fn interact_text(&self) -> Option<&str> {
        self.interact_text.as_deref()
    }

    /// Authoritative hash from the last update.
    pub fn state_hash(&self) -> Option<StateHash> {
        self.state_hash
    }

    /// HUD summary line, as on the authority.
    pub fn player_stats_string(&self) -> Option<String> {
        let stats = self.stats.as_ref()?;
        Some(format!(
            "Health: {},  Hunger: {},  Thirst: {},  Stamina: {}",
            stats.health(),
            stats.hunger(),
            stats.thirst(),
            stats.stamina()
        ))
    }

    // =========================================================================
    // Apply
    // =========================================================================

    /// Replace cached state with `update` and report the changes.
    pub fn apply(&mut self, update: ReplicationUpdate) -> Vec<RepNotify> {
        if update.observer != self.controller {
            debug!(observer = %update.observer, controller = %self.controller, "Ignored update for another observer");
            return Vec::new();
        }
        let mut notes = Vec::new();

        if update.pawn != self.pawn {
            notes.push(RepNotify::PawnChanged { pawn: update.pawn });
            self.view_pitch = 0.0;
        }

        let characters = keyed(update.characters, |c| c.id);
        let pickups = keyed(update.pickups, |p| p.id);
        let ammo = keyed(update.ammo, |a| a.id);
        let weapons = keyed(update.weapons, |w| w.id);
        let containers = keyed(update.containers, |c| c.id);

        for (id, new) in &characters {
            let old = self.characters.get(id);
            if new.is_dead && !old.map(|o| o.is_dead).unwrap_or(false) {
                notes.push(RepNotify::Died { character: *id });
            }
            if old.map(|o| o.is_aiming) != Some(new.is_aiming) && (old.is_some() || new.is_aiming) {
                notes.push(RepNotify::AimingChanged { character: *id, aiming: new.is_aiming });
            }
            if new.inventory.is_some() && old.and_then(|o| o.inventory.as_ref()) != new.inventory.as_ref() {
                notes.push(RepNotify::InventoryChanged { owner: *id });
            }
        }

        let own_stats = update.pawn.and_then(|p| characters.get(&p)).and_then(|c| c.stats.clone());
        match (own_stats, update.pawn) {
            (Some(snapshot), Some(pawn)) => {
                let health = snapshot.health;
                match self.stats.as_mut() {
                    Some(stats) if update.pawn == self.pawn => {
                        if stats.health() != health {
                            notes.push(RepNotify::HealthChanged { character: pawn, health });
                        }
                        stats.apply_snapshot(snapshot);
                    }
                    _ => {
                        self.stats = Some(StatTracker::replica(&self.config.stats, snapshot));
                        notes.push(RepNotify::HealthChanged { character: pawn, health });
                    }
                }
            }
            _ => self.stats = None,
        }

        for (id, new) in &containers {
            let old = self.containers.get(id);
            if old.map(|o| o.is_open) != Some(new.is_open) && (old.is_some() || new.is_open) {
                notes.push(RepNotify::ContainerOpenChanged { container: *id, is_open: new.is_open });
            }
            if new.items.is_some() && old.and_then(|o| o.items.as_ref()) != new.items.as_ref() {
                notes.push(RepNotify::InventoryChanged { owner: *id });
            }
        }

        for (id, new) in &weapons {
            if let Some(magazine) = new.magazine {
                if self.weapons.get(id).and_then(|o| o.magazine) != Some(magazine) {
                    notes.push(RepNotify::MagazineChanged { weapon: *id, magazine });
                }
            }
        }

        for (id, new) in &pickups {
            if let Some(old) = self.pickups.get(id) {
                if old.held != new.held {
                    notes.push(RepNotify::PickupHeldChanged { pickup: *id, held: new.held });
                }
            }
        }

        let known = self
            .characters
            .keys()
            .chain(self.pickups.keys())
            .chain(self.ammo.keys())
            .chain(self.weapons.keys())
            .chain(self.containers.keys());
        let mut removed: Vec<ActorId> = known
            .filter(|id| {
                !characters.contains_key(id)
                    && !pickups.contains_key(id)
                    && !ammo.contains_key(id)
                    && !weapons.contains_key(id)
                    && !containers.contains_key(id)
            })
            .copied()
            .collect();
        removed.sort();
        removed.dedup();
        notes.extend(removed.into_iter().map(|actor| RepNotify::ActorRemoved { actor }));

        self.tick = update.tick;
        self.pawn = update.pawn;
        self.characters = characters;
        self.pickups = pickups;
        self.ammo = ammo;
        self.weapons = weapons;
        self.containers = containers;
        self.state_hash = Some(update.state_hash);
        notes
    }

    // =========================================================================
    // Local probing
    // =========================================================================

    /// Probe scene over the replicated actors.
    pub fn scene(&self) -> SceneQuery<'_> {
        let characters = self
            .characters
            .values()
            .filter(|c| c.collision_enabled)
            .map(|c| Collider { actor: c.id, center: c.position, radius: CHARACTER_RADIUS });
        let pickups = self
            .pickups
            .values()
            .filter(|p| !p.held)
            .map(|p| Collider { actor: p.id, center: p.position, radius: PICKUP_RADIUS });
        let ammo = self
            .ammo
            .values()
            .map(|a| Collider { actor: a.id, center: a.position, radius: PICKUP_RADIUS });
        let weapons = self
            .weapons
            .values()
            .filter(|w| w.attachment == Attachment::World)
            .map(|w| Collider { actor: w.id, center: w.position, radius: WEAPON_RADIUS });
        let containers = self
            .containers
            .values()
            .map(|c| Collider { actor: c.id, center: c.position, radius: CONTAINER_RADIUS });

        let colliders = characters.chain(pickups).chain(ammo).chain(weapons).chain(containers).collect();
        SceneQuery::new(&self.level, colliders)
    }

    fn own(&self) -> GameResult<&CharacterState> {
        let pawn = self.pawn.ok_or_else(|| GameError::no_pawn(self.controller))?;
        let state = self.characters.get(&pawn).ok_or_else(|| GameError::missing(pawn))?;
        if state.is_dead {
            return Err(GameError::no_pawn(self.controller));
        }
        Ok(state)
    }

    fn eye_and_forward(&self, pawn: &CharacterState) -> (Vec3, Vec3) {
        let eye = pawn.position + Vec3::new(0.0, 0.0, self.config.combat.eye_height);
        (eye, direction_from_rotation(pawn.yaw, self.view_pitch))
    }

    fn forward_probe(&self, range: f32) -> GameResult<HitResult> {
        let pawn = self.own()?;
        let (eye, forward) = self.eye_and_forward(pawn);
        Ok(LineProbe::probe(&self.scene(), eye, eye + forward * range, Some(pawn.id)))
    }

    /// Recompute the interact hint from a forward probe.
    pub fn refresh_interact_text(&mut self) -> Option<&str> {
        let range = self.config.combat.interact_range;
        let opened = self.own().ok().and_then(|p| p.opened_container);
        self.interact_text = self
            .forward_probe(range)
            .ok()
            .and_then(|hit| hit.hit_actor())
            .and_then(|actor| self.hint_for(actor, opened));
        self.interact_text.as_deref()
    }

    fn hint_for(&self, actor: ActorId, opened: Option<ActorId>) -> Option<String> {
        if let Some(pickup) = self.pickups.get(&actor).filter(|p| !p.held) {
            return Some(pickup_hint(pickup.pickup_type));
        }
        if self.containers.contains_key(&actor) {
            return Some(container_hint(opened == Some(actor)));
        }
        if let Some(weapon) = self.weapons.get(&actor).filter(|w| w.attachment == Attachment::World) {
            return Some(weapon_hint(&weapon.name));
        }
        self.ammo.get(&actor).map(|a| ammo_hint(a.amount, a.ammo_type))
    }

    // =========================================================================
    // Intents
    // =========================================================================

    /// Interact with what the pawn faces.
    pub fn interact(&self) -> GameResult<ServerRpc> {
        let range = self.config.combat.interact_range;
        let opened = self.own()?.opened_container;
        let hit = self.forward_probe(range)?;
        match hit.hit_actor() {
            Some(actor) if self.hint_for(actor, opened).is_some() => Ok(ServerRpc::Interact),
            _ => Err(GameError::InvalidRequest("nothing to interact with".into())),
        }
    }

    /// Fire with local prediction, or melee without a weapon in hand.
    ///
    /// The predicted hit travels with the request for validation.
    pub fn attack(&self, aim_point: Option<Vec3>) -> GameResult<ServerRpc> {
        let pawn = self.own()?;
        let in_hand = pawn.active_weapon.filter(|_| !pawn.weapon_on_back);
        let Some(state) = in_hand.and_then(|w| self.weapons.get(&w)) else {
            return Ok(ServerRpc::Attack { client_hit: HitResult::none(), aim_point: None });
        };

        let data = self
            .config
            .weapons
            .get(&state.name)
            .cloned()
            .ok_or_else(|| GameError::InvalidRequest(format!("unknown weapon {}", state.name)))?;
        let mut weapon = Weapon::new(state.id, state.name.clone(), data, state.position);
        weapon.magazine = state.magazine.unwrap_or(0);
        weapon.attachment = state.attachment;
        weapon.holder = state.holder;

        let (eye, forward) = self.eye_and_forward(pawn);
        let aim_point = aim_point.filter(|_| pawn.is_aiming);
        let shot = ShotParams {
            muzzle: eye + forward * self.config.combat.muzzle_forward,
            forward,
            aim_point,
            range: self.config.combat.weapon_range,
            shooter: Some(pawn.id),
        };
        let client_hit = weapon.fire_predicted(&self.scene(), &shot);
        Ok(ServerRpc::Attack { client_hit, aim_point })
    }

    /// Start a reload.
    pub fn reload(&self) -> GameResult<ServerRpc> {
        let pawn = self.own()?;
        if pawn.is_reloading {
            return Err(GameError::InvalidRequest("already reloading".into()));
        }
        let weapon = pawn
            .active_weapon
            .filter(|_| !pawn.weapon_on_back)
            .and_then(|w| self.weapons.get(&w))
            .ok_or_else(|| GameError::InvalidRequest("no weapon in hand".into()))?;
        if weapon.magazine.unwrap_or(0) >= weapon.max_magazine {
            return Err(GameError::ResourceExhausted("magazine is full".into()));
        }
        let ammo_type = self
            .config
            .weapons
            .get(&weapon.name)
            .map(|d| d.ammo_type)
            .ok_or_else(|| GameError::InvalidRequest(format!("unknown weapon {}", weapon.name)))?;
        if self.reserve(ammo_type) == 0 {
            return Err(GameError::no_ammo(ammo_type));
        }
        Ok(ServerRpc::Reload)
    }

    /// Cancel a pending reload.
    pub fn cancel_reload(&self) -> GameResult<ServerRpc> {
        if self.own()?.is_reloading {
            Ok(ServerRpc::CancelReload)
        } else {
            Err(GameError::InvalidRequest("not reloading".into()))
        }
    }

    /// Aim down sights. Refused while sprinting.
    pub fn aim(&self, aiming: bool) -> GameResult<ServerRpc> {
        let pawn = self.own()?;
        if aiming && pawn.is_sprinting {
            return Err(GameError::InvalidRequest("cannot aim while sprinting".into()));
        }
        Ok(ServerRpc::Aim { aiming })
    }

    /// Look up or down. Stored locally; sent for non-owner visuals.
    pub fn set_pitch(&mut self, pitch: f32) -> GameResult<ServerRpc> {
        self.own()?;
        if !pitch.is_finite() {
            return Err(GameError::InvalidRequest("non-finite pitch".into()));
        }
        let pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.view_pitch = pitch;
        Ok(ServerRpc::SetPitch { pitch })
    }

    /// Start sprinting. Ends aiming first.
    pub fn start_sprint(&self) -> GameResult<Vec<ServerRpc>> {
        let pawn = self.own()?;
        if !self.stats.as_ref().map(|s| s.can_exert()).unwrap_or(false) {
            return Err(GameError::ResourceExhausted("too tired to sprint".into()));
        }
        let mut rpcs = Vec::with_capacity(2);
        if pawn.is_aiming {
            rpcs.push(ServerRpc::Aim { aiming: false });
        }
        rpcs.push(ServerRpc::SetSprinting { sprinting: true });
        Ok(rpcs)
    }

    /// Stop sprinting.
    pub fn stop_sprint(&self) -> GameResult<ServerRpc> {
        self.own()?;
        Ok(ServerRpc::SetSprinting { sprinting: false })
    }

    /// Jump.
    pub fn jump(&self) -> GameResult<ServerRpc> {
        let pawn = self.own()?;
        if pawn.is_falling {
            return Err(GameError::InvalidRequest("airborne".into()));
        }
        if !self.stats.as_ref().map(|s| s.can_exert()).unwrap_or(false) {
            return Err(GameError::ResourceExhausted("too tired to jump".into()));
        }
        Ok(ServerRpc::Jump)
    }

    /// Crouch or stand.
    pub fn crouch(&self, crouching: bool) -> GameResult<ServerRpc> {
        self.own()?;
        Ok(ServerRpc::Crouch { crouching })
    }

    fn carried(&self, item: ActorId) -> GameResult<&CharacterState> {
        let pawn = self.own()?;
        let holds = pawn.inventory.as_ref().map(|i| i.contains(&item)).unwrap_or(false);
        if holds {
            Ok(pawn)
        } else {
            Err(GameError::not_owner(pawn.id, item))
        }
    }

    /// Drop an inventory item.
    pub fn drop_item(&self, item: ActorId) -> GameResult<ServerRpc> {
        self.carried(item)?;
        Ok(ServerRpc::DropItem { item })
    }

    /// Consume an inventory item.
    pub fn use_item(&self, item: ActorId) -> GameResult<ServerRpc> {
        self.carried(item)?;
        Ok(ServerRpc::UseItem { item })
    }

    /// Move an inventory item elsewhere.
    pub fn transfer_item(&self, item: ActorId, destination: ActorId) -> GameResult<ServerRpc> {
        let pawn = self.carried(item)?;
        if destination == pawn.id {
            return Err(GameError::InvalidRequest("transfer to self".into()));
        }
        if !self.characters.contains_key(&destination) && !self.containers.contains_key(&destination) {
            return Err(GameError::InvalidRequest(format!("{destination} has no inventory")));
        }
        Ok(ServerRpc::TransferItem { item, destination })
    }

    /// Take an item from the opened container.
    pub fn receive_item(&self, item: ActorId) -> GameResult<ServerRpc> {
        let pawn = self.own()?;
        let container = pawn
            .opened_container
            .and_then(|c| self.containers.get(&c))
            .ok_or_else(|| GameError::InvalidRequest("no open container".into()))?;
        let present = container.items.as_ref().map(|i| i.contains(&item)).unwrap_or(false);
        if !present {
            return Err(GameError::InvalidRequest(format!("{item} is not in {}", container.id)));
        }
        Ok(ServerRpc::ReceiveItem { item })
    }

    /// Close the opened container.
    pub fn close_container(&self) -> GameResult<ServerRpc> {
        if self.own()?.opened_container.is_some() {
            Ok(ServerRpc::CloseContainer)
        } else {
            Err(GameError::InvalidRequest("no open container".into()))
        }
    }

    /// Drop the active weapon.
    pub fn drop_weapon(&self) -> GameResult<ServerRpc> {
        if self.own()?.active_weapon.is_some() {
            Ok(ServerRpc::DropWeapon)
        } else {
            Err(GameError::InvalidRequest("no weapon".into()))
        }
    }

    /// Sling or unsling the active weapon.
    pub fn unequip(&self) -> GameResult<ServerRpc> {
        if self.own()?.active_weapon.is_some() {
            Ok(ServerRpc::UnEquip)
        } else {
            Err(GameError::InvalidRequest("no weapon".into()))
        }
    }

    /// Drop reserve rounds.
    pub fn drop_ammo(&self, ammo_type: AmmoType, amount: u32) -> GameResult<ServerRpc> {
        self.own()?;
        let reserve = self.reserve(ammo_type);
        if amount == 0 || amount > reserve {
            return Err(GameError::ResourceExhausted(format!("cannot drop {amount} of {reserve} rounds")));
        }
        Ok(ServerRpc::DropAmmo { ammo_type, amount })
    }

    /// Toggle probe visualisation.
    pub fn toggle_debug(&self) -> GameResult<ServerRpc> {
        self.own()?;
        Ok(ServerRpc::ToggleDebug)
    }

    fn reserve(&self, ammo_type: AmmoType) -> u32 {
        self.stats.as_ref().map(|s| s.ammo(ammo_type)).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rpc::Dispatch;
    use crate::game::types::PickupType;
    use crate::game::world::tests::test_world;
    use crate::game::world::World;

    fn replica_for(world: &World, player: ActorId) -> ClientReplica {
        let controller = world.controller_of(player).unwrap();
        let mut replica = ClientReplica::new(controller, world.config.clone(), world.level.clone());
        replica.apply(world.replicate_for(controller));
        replica
    }

    fn sync(world: &World, replica: &mut ClientReplica) -> Vec<RepNotify> {
        replica.apply(world.replicate_for(replica.controller()))
    }

    fn ahead(world: &World, player: ActorId, distance: f32) -> Vec3 {
        let pawn = &world.characters[&player];
        pawn.eye_position(&world.config.combat) + pawn.view_forward() * distance
    }

    #[test]
    fn test_first_update_possesses() {
        let (world, player) = test_world();
        let controller = world.controller_of(player).unwrap();
        let mut replica = ClientReplica::new(controller, world.config.clone(), world.level.clone());

        let notes = replica.apply(world.replicate_for(controller));
        assert_eq!(notes[0], RepNotify::PawnChanged { pawn: Some(player) });
        assert!(notes.contains(&RepNotify::HealthChanged { character: player, health: 100.0 }));
        assert_eq!(replica.pawn(), Some(player));
        assert_eq!(replica.state_hash(), Some(world.compute_hash()));
        assert_eq!(
            replica.player_stats_string().unwrap(),
            "Health: 100,  Hunger: 100,  Thirst: 100,  Stamina: 100"
        );
    }

    #[test]
    fn test_update_for_other_observer_ignored() {
        let (mut world, player) = test_world();
        let other = world.add_controller();
        world.post_login(other).unwrap();
        let mut replica = replica_for(&world, player);

        assert!(replica.apply(world.replicate_for(other)).is_empty());
        assert_eq!(replica.pawn(), Some(player));
    }

    #[test]
    fn test_interact_text_and_pickup_notify() {
        let (mut world, player) = test_world();
        let food = world.spawn_pickup(PickupType::Food, None, ahead(&world, player, 300.0));
        let mut replica = replica_for(&world, player);

        assert_eq!(replica.refresh_interact_text(), Some("Pick up Food"));
        let rpc = replica.interact().unwrap();
        assert!(world.dispatch(replica.controller(), rpc));

        let notes = sync(&world, &mut replica);
        assert!(notes.contains(&RepNotify::PickupHeldChanged { pickup: food, held: true }));
        assert!(notes.contains(&RepNotify::InventoryChanged { owner: player }));
        assert_eq!(replica.refresh_interact_text(), None);
        assert_eq!(replica.use_item(food).unwrap(), ServerRpc::UseItem { item: food });
        assert!(replica.drop_item(ActorId(999)).is_err());
    }

    #[test]
    fn test_predicted_shot_is_accepted() {
        let (mut world, player) = test_world();
        let rifle = world.spawn_weapon("AR-15", Vec3::new(0.0, 3000.0, 0.0)).unwrap();
        world.equip_weapon(player, rifle).unwrap();
        let victim = world.spawn_character(ahead(&world, player, 1200.0));
        let mut replica = replica_for(&world, player);

        let rpc = replica.attack(None).unwrap();
        match &rpc {
            ServerRpc::Attack { client_hit, .. } => assert_eq!(client_hit.actor, Some(victim)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(world.dispatch(replica.controller(), rpc));
        assert_eq!(world.characters[&victim].stats.health(), 80.0);

        let notes = sync(&world, &mut replica);
        assert!(notes.contains(&RepNotify::MagazineChanged { weapon: rifle, magazine: 29 }));
    }

    #[test]
    fn test_unarmed_attack_sends_melee() {
        let (world, player) = test_world();
        let replica = replica_for(&world, player);
        assert_eq!(
            replica.attack(None).unwrap(),
            ServerRpc::Attack { client_hit: HitResult::none(), aim_point: None }
        );
    }

    #[test]
    fn test_sprint_ends_aim() {
        let (mut world, player) = test_world();
        world.set_aiming(player, true).unwrap();
        let mut replica = replica_for(&world, player);

        let rpcs = replica.start_sprint().unwrap();
        assert_eq!(rpcs, vec![ServerRpc::Aim { aiming: false }, ServerRpc::SetSprinting { sprinting: true }]);
        for rpc in rpcs {
            assert!(world.dispatch(replica.controller(), rpc));
        }

        let notes = sync(&world, &mut replica);
        assert!(notes.contains(&RepNotify::AimingChanged { character: player, aiming: false }));
        assert!(replica.aim(true).is_err());
    }

    #[test]
    fn test_reload_preflight() {
        let (mut world, player) = test_world();
        let rifle = world.spawn_weapon("AR-15", Vec3::new(0.0, 3000.0, 0.0)).unwrap();
        world.equip_weapon(player, rifle).unwrap();
        let mut replica = replica_for(&world, player);
        assert!(matches!(replica.reload(), Err(GameError::ResourceExhausted(_))));

        world.weapons.get_mut(&rifle).unwrap().magazine = 3;
        sync(&world, &mut replica);
        assert!(matches!(replica.reload(), Err(GameError::ResourceExhausted(_))));

        world.characters.get_mut(&player).unwrap().stats.add_ammo(AmmoType::Assault, 10).unwrap();
        sync(&world, &mut replica);
        assert_eq!(replica.reload().unwrap(), ServerRpc::Reload);
        assert_eq!(replica.drop_ammo(AmmoType::Assault, 10).unwrap(), ServerRpc::DropAmmo { ammo_type: AmmoType::Assault, amount: 10 });
        assert!(replica.drop_ammo(AmmoType::Assault, 11).is_err());
    }

    #[test]
    fn test_reductions_forward_to_authority() {
        let (mut world, player) = test_world();
        let mut replica = replica_for(&world, player);

        let dispatch = replica.stats_mut().unwrap().lower_stamina(25.0).unwrap();
        let Dispatch::Forward(rpc) = dispatch else {
            panic!("observer applied a reduction locally");
        };
        assert_eq!(replica.stats().unwrap().stamina(), 100.0);

        assert!(world.dispatch(replica.controller(), rpc));
        sync(&world, &mut replica);
        assert_eq!(replica.stats().unwrap().stamina(), 75.0);
    }

    #[test]
    fn test_container_flow() {
        let (mut world, player) = test_world();
        let chest = world.spawn_container(ahead(&world, player, 300.0), None);
        let bandage = world.spawn_pickup(PickupType::Bandage, None, Vec3::new(0.0, 3000.0, 0.0));
        world.add_item(chest, Some(bandage)).unwrap();
        let mut replica = replica_for(&world, player);

        assert_eq!(replica.refresh_interact_text(), Some("Open Container"));
        assert!(replica.receive_item(bandage).is_err());
        assert!(world.dispatch(replica.controller(), replica.interact().unwrap()));

        let notes = sync(&world, &mut replica);
        assert!(notes.contains(&RepNotify::ContainerOpenChanged { container: chest, is_open: true }));
        assert!(notes.contains(&RepNotify::InventoryChanged { owner: chest }));
        assert_eq!(replica.refresh_interact_text(), Some("Close Container"));

        assert!(world.dispatch(replica.controller(), replica.receive_item(bandage).unwrap()));
        sync(&world, &mut replica);
        assert!(replica.use_item(bandage).is_ok());
        assert!(world.dispatch(replica.controller(), replica.close_container().unwrap()));
    }

    #[test]
    fn test_death_and_respawn_notifies() {
        let (mut world, player) = test_world();
        let mut replica = replica_for(&world, player);
        world.die(player, None).unwrap();

        let notes = sync(&world, &mut replica);
        assert!(notes.contains(&RepNotify::Died { character: player }));
        assert!(replica.jump().is_err());

        crate::game::tick::tick(&mut world, &[], std::time::Duration::from_secs(10));
        let notes = sync(&world, &mut replica);
        let pawn = replica.pawn().unwrap();
        assert_ne!(pawn, player);
        assert!(notes.contains(&RepNotify::PawnChanged { pawn: Some(pawn) }));
        assert!(notes.contains(&RepNotify::ActorRemoved { actor: player }));
        assert_eq!(replica.jump().unwrap(), ServerRpc::Jump);
    }
}
