//! Character Controller
//!
//! Authoritative actions of one character. Flags on `Character` are
//! independent booleans rather than a single state: aiming, sprinting and
//! reloading may overlap, and only input policy on the client keeps some
//! combinations apart.
//!
//! ## Combat
//!
//! Attack fires the weapon in hand, or falls back to a melee probe when the
//! character has no weapon or carries it on the back. Any attack cancels a
//! pending reload.
//!
//! ## Death
//!
//! Health reaching zero runs one cascade: close the opened container, drop
//! every item, the weapon and each non-empty ammo reserve, ragdoll the body,
//! request a respawn and schedule the corpse for removal.

use glam::Vec3;
use tracing::{debug, info};

use crate::core::timer::TimerHandle;
use crate::game::character::{Character, PITCH_LIMIT};
use crate::game::error::{GameError, GameResult};
use crate::game::events::{CameraShakeKind, EventPriority, EventScope, GameEventData};
use crate::game::interact::Interactable;
use crate::game::probe::{HitResult, LineProbe, SceneQuery};
use crate::game::tick::TimerEvent;
use crate::game::types::{ActorId, AmmoType, Attachment, ControllerId};
use crate::game::weapon::{ShotParams, Weapon};
use crate::game::world::World;

impl World {
    fn living(&self, character: ActorId) -> GameResult<&Character> {
        let pawn = self.characters.get(&character).ok_or_else(|| GameError::missing(character))?;
        if pawn.is_alive() {
            Ok(pawn)
        } else {
            Err(GameError::InvalidRequest(format!("{character} is dead")))
        }
    }

    fn living_mut(&mut self, character: ActorId) -> GameResult<&mut Character> {
        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        if pawn.is_alive() {
            Ok(pawn)
        } else {
            Err(GameError::InvalidRequest(format!("{character} is dead")))
        }
    }

    /// Probe from the character's eye along its view, emitting a debug line
    /// when the character has debug drawing on.
    fn view_probe(&mut self, character: ActorId, range: f32) -> GameResult<HitResult> {
        let (start, end, debug_enabled) = {
            let pawn = self.living(character)?;
            let start = pawn.eye_position(&self.config.combat);
            (start, start + pawn.view_forward() * range, pawn.debug_enabled)
        };

        let scene = self.scene();
        if debug_enabled {
            let (hit, line) = LineProbe::probe_debug(&scene, start, end, Some(character));
            self.push_event(EventPriority::Presentation, EventScope::All, line);
            Ok(hit)
        } else {
            Ok(LineProbe::probe(&scene, start, end, Some(character)))
        }
    }

    // =========================================================================
    // Interaction
    // =========================================================================

    /// Re-probe forward and interact with whatever blocks the view.
    pub fn interact(&mut self, character: ActorId) -> GameResult<()> {
        let range = self.config.combat.interact_range;
        let hit = self.view_probe(character, range)?;
        let actor = hit
            .hit_actor()
            .ok_or_else(|| GameError::InvalidRequest("nothing in reach".into()))?;
        let target = Interactable::resolve(self, actor)
            .ok_or_else(|| GameError::InvalidRequest(format!("{actor} is not interactable")))?;
        target.on_interact(self, character)
    }

    /// Open `container`, or close it if this character already has it open.
    ///
    /// A character has at most one container open; opening another closes
    /// the first. Both sides of the relation change in this one step.
    pub fn toggle_container(&mut self, character: ActorId, container: ActorId) -> GameResult<()> {
        let current = self.living(character)?.opened_container;
        if current == Some(container) {
            return self.close_container(character);
        }

        let target = self.containers.get(&container).ok_or_else(|| GameError::missing(container))?;
        if let Some(opener) = target.opener().filter(|o| *o != character) {
            return Err(GameError::OwnershipConflict { container, opener });
        }

        if current.is_some() {
            self.close_container(character)?;
        }
        if let Some(target) = self.containers.get_mut(&container) {
            target.open(character)?;
        }
        self.living_mut(character)?.opened_container = Some(container);

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::ContainerOpened { container, character },
        );
        Ok(())
    }

    /// Release the container this character has open.
    pub fn close_container(&mut self, character: ActorId) -> GameResult<()> {
        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        let container = pawn
            .opened_container
            .take()
            .ok_or_else(|| GameError::InvalidRequest(format!("{character} has no open container")))?;
        if let Some(target) = self.containers.get_mut(&container) {
            target.close(character);
        }

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::ContainerClosed { container, character },
        );
        Ok(())
    }

    /// Take `item` out of the opened container.
    pub fn receive_item(&mut self, character: ActorId, item: ActorId) -> GameResult<()> {
        let container = self
            .living(character)?
            .opened_container
            .ok_or_else(|| GameError::InvalidRequest(format!("{character} has no open container")))?;
        let opener = self.containers.get(&container).and_then(|c| c.opener());
        if opener != Some(character) {
            return Err(GameError::PermissionDenied(format!("{character} did not open {container}")));
        }
        self.transfer_item(container, item, character)
    }

    /// Empty an ammo stack into the reserve.
    pub fn collect_ammo(&mut self, character: ActorId, stack: ActorId) -> GameResult<()> {
        let ammo = self.ammo.get(&stack).ok_or_else(|| GameError::missing(stack))?;
        let (ammo_type, amount) = (ammo.ammo_type, ammo.amount);

        self.living(character)?;
        if let (Some(pawn), Some(ammo)) = (self.characters.get_mut(&character), self.ammo.get(&stack)) {
            ammo.collect_into(&mut pawn.stats)?;
        }
        self.ammo.remove(&stack);

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::AmmoCollected { character, ammo_type, amount },
        );
        self.push_event(
            EventPriority::Lifecycle,
            EventScope::All,
            GameEventData::ActorDestroyed { actor: stack },
        );
        Ok(())
    }

    /// Reserve rounds matching the active weapon.
    pub fn ammo_for_active_weapon(&self, character: ActorId) -> Option<u32> {
        let pawn = self.characters.get(&character)?;
        let weapon = self.weapons.get(&pawn.active_weapon?)?;
        Some(pawn.stats.ammo(weapon.ammo_type()))
    }

    /// Rounds in the active weapon's magazine.
    pub fn magazine_count(&self, character: ActorId) -> Option<u32> {
        let pawn = self.characters.get(&character)?;
        self.weapons.get(&pawn.active_weapon?).map(|w| w.magazine)
    }

    // =========================================================================
    // Equipment
    // =========================================================================

    /// Pick up a world weapon, dropping the current one first.
    pub fn equip_weapon(&mut self, character: ActorId, weapon: ActorId) -> GameResult<()> {
        let in_world = self.weapons.get(&weapon).map(|w| w.is_in_world()).unwrap_or(false);
        if !in_world {
            return Err(GameError::InvalidRequest(format!("{weapon} cannot be picked up")));
        }
        if self.living(character)?.active_weapon.is_some() {
            self.drop_weapon(character)?;
        }

        let name = match self.weapons.get_mut(&weapon) {
            Some(w) => {
                w.attachment = Attachment::Hand;
                w.holder = Some(character);
                w.name.clone()
            }
            None => return Err(GameError::missing(weapon)),
        };
        let pawn = self.living_mut(character)?;
        pawn.active_weapon = Some(weapon);
        pawn.weapon_on_back = false;

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::WeaponEquipped { character, weapon, name },
        );
        Ok(())
    }

    /// Replace the held weapon with a world weapon of the same row near the
    /// character. The magazine count carries over. Returns the new actor.
    pub fn drop_weapon(&mut self, character: ActorId) -> GameResult<ActorId> {
        let (held, origin) = {
            let pawn = self.characters.get(&character).ok_or_else(|| GameError::missing(character))?;
            let held = pawn
                .active_weapon
                .ok_or_else(|| GameError::InvalidRequest(format!("{character} holds no weapon")))?;
            (held, pawn.position)
        };
        self.cancel_reload(character);

        let (name, magazine) = {
            let weapon = self.weapons.get(&held).ok_or_else(|| GameError::missing(held))?;
            (weapon.name.clone(), weapon.magazine)
        };
        let location = self.drop_location(origin, character);

        self.destroy_actor(held);
        let dropped = self.spawn_weapon(&name, location)?;
        if let Some(weapon) = self.weapons.get_mut(&dropped) {
            weapon.magazine = magazine;
        }
        if let Some(pawn) = self.characters.get_mut(&character) {
            pawn.active_weapon = None;
            pawn.weapon_on_back = false;
        }

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::WeaponDropped { character, weapon: dropped, name, location },
        );
        Ok(dropped)
    }

    /// Move the active weapon between hand and back.
    pub fn unequip(&mut self, character: ActorId) -> GameResult<()> {
        let pawn = self.living_mut(character)?;
        let weapon = pawn
            .active_weapon
            .ok_or_else(|| GameError::InvalidRequest(format!("{character} holds no weapon")))?;
        pawn.weapon_on_back = !pawn.weapon_on_back;
        let on_back = pawn.weapon_on_back;
        if on_back {
            pawn.is_aiming = false;
        }
        if let Some(w) = self.weapons.get_mut(&weapon) {
            w.attachment = if on_back { Attachment::Back } else { Attachment::Hand };
        }
        if on_back {
            self.cancel_reload(character);
        }

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::WeaponSlung { character, weapon, on_back },
        );
        Ok(())
    }

    /// Drop `amount` reserve rounds as a world stack. Returns the stack.
    pub fn drop_ammo(&mut self, character: ActorId, ammo_type: AmmoType, amount: u32) -> GameResult<ActorId> {
        let pawn = self.living_mut(character)?;
        pawn.stats.remove_ammo(ammo_type, amount)?;
        let origin = pawn.position;

        let location = self.drop_location(origin, character);
        let stack = self.spawn_ammo(ammo_type, amount, location);
        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::AmmoDropped { character, stack, ammo_type, amount },
        );
        Ok(stack)
    }

    // =========================================================================
    // Combat
    // =========================================================================

    /// Fire the weapon in hand or melee without one.
    pub fn attack(&mut self, character: ActorId, client_hit: HitResult, aim_point: Option<Vec3>) -> GameResult<()> {
        let armed = self.living(character)?.has_weapon_in_hand();
        self.cancel_reload(character);
        if armed {
            self.fire(character, client_hit, aim_point)
        } else {
            self.melee(character).map(|_| ())
        }
    }

    /// Authoritative shot with the active weapon.
    pub fn fire(&mut self, character: ActorId, client_hit: HitResult, aim_point: Option<Vec3>) -> GameResult<()> {
        let (weapon_id, controller, shot, debug_enabled) = {
            let pawn = self.living(character)?;
            let weapon = pawn
                .active_weapon
                .filter(|_| pawn.has_weapon_in_hand())
                .ok_or_else(|| GameError::InvalidRequest(format!("{character} has no weapon in hand")))?;
            let combat = &self.config.combat;
            let shot = ShotParams {
                muzzle: pawn.muzzle_location(combat),
                forward: pawn.view_forward(),
                aim_point: aim_point.filter(|_| pawn.is_aiming),
                range: combat.weapon_range,
                shooter: Some(character),
            };
            (weapon, pawn.controller, shot, pawn.debug_enabled)
        };
        let tolerance = self.config.combat.shot_tolerance;

        let scene = SceneQuery::new(&self.level, self.colliders());
        let weapon = self.weapons.get_mut(&weapon_id).ok_or_else(|| GameError::missing(weapon_id))?;
        let outcome = weapon.fire_authoritative(&scene, &shot, &client_hit, tolerance);
        let (damage, fire_sound, muzzle_effect, impact_effect) = (
            weapon.data.damage,
            weapon.data.fire_sound.clone(),
            weapon.data.muzzle_effect.clone(),
            weapon.data.impact_effect.clone(),
        );
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.push_event(
                    EventPriority::Combat,
                    controller.map(EventScope::Owner).unwrap_or(EventScope::All),
                    GameEventData::OutOfAmmo { character, weapon: weapon_id },
                );
                return Err(e);
            }
        };

        self.push_event(
            EventPriority::Combat,
            EventScope::All,
            GameEventData::WeaponFired {
                character,
                weapon: weapon_id,
                hit: outcome.damage_target(),
                magazine: outcome.magazine,
            },
        );

        // The shooter already played these locally
        let others = EventScope::skip(controller);
        self.push_event(EventPriority::Presentation, others, GameEventData::SoundAttached { sound: fire_sound, actor: weapon_id });
        self.push_event(EventPriority::Presentation, others, GameEventData::EmitterAttached { effect: muzzle_effect, actor: weapon_id });
        if outcome.server_hit.blocking_hit {
            self.push_event(
                EventPriority::Presentation,
                others,
                GameEventData::EmitterAtLocation { effect: impact_effect, location: outcome.server_hit.impact_point },
            );
        }
        if let Some(owner) = controller {
            self.push_event(
                EventPriority::Presentation,
                EventScope::Owner(owner),
                GameEventData::CameraShake { shake: CameraShakeKind::Fire },
            );
        }
        if debug_enabled {
            self.push_event(
                EventPriority::Presentation,
                EventScope::All,
                GameEventData::DebugLine {
                    start: outcome.server_hit.trace_start,
                    end: outcome.server_hit.trace_end,
                    hit: outcome.server_hit.blocking_hit,
                },
            );
        }

        if !outcome.valid {
            debug!(%character, client = ?client_hit.actor, server = ?outcome.server_hit.actor, "Shot failed validation");
            return Ok(());
        }
        if let Some(target) = outcome.damage_target().filter(|t| self.characters.contains_key(t)) {
            if let Err(e) = self.take_damage(target, damage, controller) {
                debug!(%character, %target, error = %e, "Shot damage not applied");
            }
        }
        Ok(())
    }

    /// Unarmed hit. Returns the character struck, if any.
    pub fn melee(&mut self, character: ActorId) -> GameResult<Option<ActorId>> {
        let (range, damage) = (self.config.combat.melee_range, self.config.combat.melee_damage);
        let controller = self.controller_of(character);
        let hit = self.view_probe(character, range)?;

        let Some(target) = hit.hit_actor().filter(|t| self.characters.contains_key(t)) else {
            return Ok(None);
        };
        self.take_damage(target, damage, controller)?;
        Ok(Some(target))
    }

    /// Apply damage from `instigator`. Returns health left.
    ///
    /// Rejected without an instigating controller, or when the victim has no
    /// health left.
    pub fn take_damage(&mut self, victim: ActorId, amount: f32, instigator: Option<ControllerId>) -> GameResult<f32> {
        let instigator = instigator.ok_or_else(|| GameError::PermissionDenied("damage without an instigator".into()))?;
        let pawn = self.characters.get_mut(&victim).ok_or_else(|| GameError::missing(victim))?;
        if pawn.is_dead || pawn.stats.health() <= 0.0 {
            return Err(GameError::InvalidRequest(format!("{victim} has no health left")));
        }
        pawn.stats.lower_health(amount)?;
        let health = pawn.stats.health();
        let victim_controller = pawn.controller;

        self.push_event(
            EventPriority::Damage,
            EventScope::All,
            GameEventData::DamageTaken { character: victim, amount, health },
        );
        if let Some(owner) = victim_controller {
            self.push_event(
                EventPriority::Presentation,
                EventScope::Owner(owner),
                GameEventData::CameraShake { shake: CameraShakeKind::Hit },
            );
        }

        if health <= 0.0 {
            let killer = self.pawn_of(instigator);
            self.die(victim, killer)?;
        }
        Ok(health)
    }

    /// Death cascade.
    pub fn die(&mut self, character: ActorId, killer: Option<ActorId>) -> GameResult<()> {
        self.living(character)?;
        let controller = match self.characters.get_mut(&character) {
            Some(pawn) => {
                pawn.is_dead = true;
                pawn.is_aiming = false;
                pawn.is_sprinting = false;
                pawn.stats.stop_timers(&mut self.timers);
                pawn.controller
            }
            None => return Err(GameError::missing(character)),
        };
        self.cancel_reload(character);

        if let Err(e) = self.close_container(character) {
            debug!(%character, error = %e, "No container to close on death");
        }
        self.drop_all_inventory(character)?;
        if self.characters.get(&character).and_then(|c| c.active_weapon).is_some() {
            self.drop_weapon(character)?;
        }
        self.drop_all_ammo(character)?;

        let destroy_delay = self.config.respawn.destroy_delay();
        let destroy = self.timers.schedule(destroy_delay, false, TimerEvent::DestroyActor(character));
        if let Some(pawn) = self.characters.get_mut(&character) {
            pawn.collision_enabled = false;
            pawn.movement_enabled = false;
            pawn.ragdoll = true;
            pawn.destroy_timer = Some(destroy);
        }
        self.push_event(EventPriority::Lifecycle, EventScope::All, GameEventData::Ragdoll { character });
        self.push_event(EventPriority::Lifecycle, EventScope::All, GameEventData::CharacterDied { character, killer });
        info!(%character, ?killer, "Character died");

        if let Some(controller) = controller {
            if self.controllers.contains_key(&controller) {
                self.request_respawn(controller)?;
            }
        }
        Ok(())
    }

    /// Spawn one world stack per non-empty reserve.
    fn drop_all_ammo(&mut self, character: ActorId) -> GameResult<Vec<ActorId>> {
        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        let origin = pawn.position;
        let reserves = pawn.stats.take_all_ammo();

        let mut stacks = Vec::with_capacity(reserves.len());
        for (ammo_type, amount) in reserves {
            let location = self.drop_location(origin, character);
            let stack = self.spawn_ammo(ammo_type, amount, location);
            self.push_event(
                EventPriority::Inventory,
                EventScope::All,
                GameEventData::AmmoDropped { character, stack, ammo_type, amount },
            );
            stacks.push(stack);
        }
        Ok(stacks)
    }

    // =========================================================================
    // Reload
    // =========================================================================

    /// Start the reload timer.
    pub fn reload(&mut self, character: ActorId) -> GameResult<()> {
        let pawn = self.living(character)?;
        if pawn.is_reloading {
            return Err(GameError::InvalidRequest(format!("{character} is already reloading")));
        }
        let weapon_id = pawn
            .active_weapon
            .filter(|_| pawn.has_weapon_in_hand())
            .ok_or_else(|| GameError::InvalidRequest(format!("{character} has no weapon in hand")))?;
        let weapon = self.weapons.get(&weapon_id).ok_or_else(|| GameError::missing(weapon_id))?;
        if !weapon.can_reload() {
            return Err(GameError::ResourceExhausted(format!("{} magazine is full", weapon.name)));
        }
        if pawn.stats.ammo(weapon.ammo_type()) == 0 {
            return Err(GameError::no_ammo(weapon.ammo_type()));
        }

        let delay = weapon.data.reload_time();
        let handle = self.timers.schedule(delay, false, TimerEvent::ReloadComplete(character));
        if let Some(pawn) = self.characters.get_mut(&character) {
            pawn.reload_timer = Some(handle);
            pawn.is_reloading = true;
        }
        self.push_event(
            EventPriority::Combat,
            EventScope::All,
            GameEventData::ReloadStarted { character, weapon: weapon_id },
        );
        Ok(())
    }

    /// Reload timer elapsed: refill from the reserve. Returns rounds loaded.
    pub fn finish_reload(&mut self, character: ActorId, handle: TimerHandle) -> GameResult<u32> {
        if !self.is_current_reload(character, handle) {
            return Err(GameError::InvalidRequest(format!("stale reload for {character}")));
        }
        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        pawn.reload_timer = None;
        pawn.is_reloading = false;

        let weapon_id = pawn
            .active_weapon
            .ok_or_else(|| GameError::InvalidRequest(format!("{character} holds no weapon")))?;
        let weapon: &mut Weapon = self.weapons.get_mut(&weapon_id).ok_or_else(|| GameError::missing(weapon_id))?;
        let loaded = weapon.reload(&mut pawn.stats);

        self.push_event(
            EventPriority::Combat,
            EventScope::All,
            GameEventData::ReloadFinished { character, weapon: weapon_id, loaded },
        );
        Ok(loaded)
    }

    /// Clear a pending reload. Returns whether one was pending.
    pub fn cancel_reload(&mut self, character: ActorId) -> bool {
        let Some(pawn) = self.characters.get_mut(&character) else {
            return false;
        };
        let Some(handle) = pawn.reload_timer.take() else {
            return false;
        };
        pawn.is_reloading = false;
        self.timers.cancel(handle);
        self.push_event(
            EventPriority::Combat,
            EventScope::All,
            GameEventData::ReloadCancelled { character },
        );
        true
    }

    /// Explicit cancel request; fails when nothing is pending.
    pub fn request_cancel_reload(&mut self, character: ActorId) -> GameResult<()> {
        if self.cancel_reload(character) {
            Ok(())
        } else {
            Err(GameError::InvalidRequest(format!("{character} is not reloading")))
        }
    }

    // =========================================================================
    // Movement flags
    // =========================================================================

    /// Aim down sights.
    pub fn set_aiming(&mut self, character: ActorId, aiming: bool) -> GameResult<()> {
        self.living_mut(character)?.is_aiming = aiming;
        Ok(())
    }

    /// Replicated view pitch.
    pub fn set_pitch(&mut self, character: ActorId, pitch: f32) -> GameResult<()> {
        if !pitch.is_finite() || pitch.abs() > PITCH_LIMIT {
            return Err(GameError::InvalidRequest(format!("pitch {pitch} out of range")));
        }
        self.living_mut(character)?.pitch = pitch;
        Ok(())
    }

    /// Start or stop sprinting. Starting needs stamina and cancels reload.
    pub fn set_sprinting(&mut self, character: ActorId, sprinting: bool) -> GameResult<()> {
        let pawn = self.living(character)?;
        if pawn.is_sprinting == sprinting {
            return Ok(());
        }
        if sprinting {
            if !pawn.stats.can_exert() {
                return Err(GameError::ResourceExhausted("too tired to sprint".into()));
            }
            self.cancel_reload(character);
        }

        if let Some(pawn) = self.characters.get_mut(&character) {
            pawn.is_sprinting = sprinting;
            pawn.stats.control_sprinting_timer(&mut self.timers, sprinting);
        }
        Ok(())
    }

    /// Sprint drain step; stops the sprint when stamina runs out.
    pub fn handle_sprint_drain(&mut self, character: ActorId) -> GameResult<()> {
        let pawn = self.living_mut(character)?;
        if !pawn.is_sprinting || !pawn.is_moving() {
            return Ok(());
        }
        let drain = pawn.stats.sprint_drain();
        pawn.stats.lower_stamina(drain)?;
        if pawn.stats.stamina() <= 0.0 {
            self.set_sprinting(character, false)?;
        }
        Ok(())
    }

    /// Jump. Needs stamina and solid ground; cancels reload.
    pub fn jump(&mut self, character: ActorId) -> GameResult<()> {
        let pawn = self.living(character)?;
        if pawn.is_falling {
            return Err(GameError::InvalidRequest(format!("{character} is airborne")));
        }
        if !pawn.stats.can_exert() {
            return Err(GameError::ResourceExhausted("too tired to jump".into()));
        }
        self.cancel_reload(character);

        let pawn = self.living_mut(character)?;
        let cost = pawn.stats.jump_cost();
        pawn.stats.lower_stamina(cost)?;
        pawn.is_falling = true;
        Ok(())
    }

    /// Crouch or stand. Crouching cancels reload.
    pub fn set_crouching(&mut self, character: ActorId, crouching: bool) -> GameResult<()> {
        self.living(character)?;
        if crouching {
            self.cancel_reload(character);
        }
        self.living_mut(character)?.is_crouching = crouching;
        Ok(())
    }

    /// Flip probe visualisation. Returns the new state.
    pub fn toggle_debug(&mut self, character: ActorId) -> GameResult<bool> {
        let pawn = self.living_mut(character)?;
        pawn.debug_enabled = !pawn.debug_enabled;
        Ok(pawn.debug_enabled)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Controller leaves: kill its pawn and forget it.
    pub fn logout(&mut self, controller: ControllerId) -> GameResult<()> {
        if !self.controllers.contains_key(&controller) {
            return Err(GameError::InvalidRequest(format!("unknown {controller}")));
        }
        self.cancel_respawn(controller);
        self.controllers.remove(&controller);

        if let Some(pawn) = self.characters.values().find(|c| c.controller == Some(controller)).map(|c| c.id) {
            if self.characters.get(&pawn).map(|c| c.is_alive()).unwrap_or(false) {
                self.die(pawn, None)?;
            }
            if let Some(pawn) = self.characters.get_mut(&pawn) {
                pawn.controller = None;
            }
        }
        info!(%controller, "Controller logged out");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
