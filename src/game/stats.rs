//! Vital Stats
//!
//! Health, hunger, thirst, stamina and reserve ammunition for one character.
//!
//! ## Timers
//!
//! Three periodic timers drive a tracker on the authority:
//! - decay: hunger and thirst fall every `decay_interval`
//! - regen: stamina climbs every `stamina_regen_interval`; paused while sprinting
//! - sprint: stamina drains while sprinting and moving
//!
//! Observer copies never schedule timers; their values come from replication.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::timer::{TimerHandle, TimerService};
use crate::game::config::StatConfig;
use crate::game::error::{GameError, GameResult};
use crate::game::rpc::{Dispatch, ServerRpc};
use crate::game::tick::TimerEvent;
use crate::game::types::{ActorId, AmmoType, NetRole};

/// Replicated stat values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    /// Health
    pub health: f32,
    /// Hunger
    pub hunger: f32,
    /// Thirst
    pub thirst: f32,
    /// Stamina
    pub stamina: f32,
    /// Reserve rounds per type
    pub ammo: BTreeMap<AmmoType, u32>,
}

#[derive(Clone, Debug, Default)]
struct StatTimers {
    decay: Option<TimerHandle>,
    regen: Option<TimerHandle>,
    sprint: Option<TimerHandle>,
}

/// Per-character vital resources.
#[derive(Clone, Debug)]
pub struct StatTracker {
    role: NetRole,
    config: StatConfig,
    health: f32,
    hunger: f32,
    thirst: f32,
    stamina: f32,
    ammo: BTreeMap<AmmoType, u32>,
    timers: StatTimers,
}

impl StatTracker {
    /// Authoritative tracker at the configured starting values.
    pub fn new(config: &StatConfig) -> Self {
        Self {
            role: NetRole::Authority,
            config: config.clone(),
            health: config.initial_health,
            hunger: config.initial_hunger,
            thirst: config.initial_thirst,
            stamina: config.initial_stamina,
            ammo: BTreeMap::new(),
            timers: StatTimers::default(),
        }
    }

    /// Observer copy seeded from a snapshot.
    pub fn replica(config: &StatConfig, snapshot: StatSnapshot) -> Self {
        let mut tracker = Self::new(config);
        tracker.role = NetRole::Observer;
        tracker.apply_snapshot(snapshot);
        tracker
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current health.
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Current hunger.
    pub fn hunger(&self) -> f32 {
        self.hunger
    }

    /// Current thirst.
    pub fn thirst(&self) -> f32 {
        self.thirst
    }

    /// Current stamina.
    pub fn stamina(&self) -> f32 {
        self.stamina
    }

    /// Shared upper bound.
    pub fn max_value(&self) -> f32 {
        self.config.max_value
    }

    /// Reserve rounds of one type.
    pub fn ammo(&self, ammo_type: AmmoType) -> u32 {
        self.ammo.get(&ammo_type).copied().unwrap_or(0)
    }

    /// Health as a fraction of max.
    pub fn health_fraction(&self) -> f32 {
        self.health / self.config.max_value
    }

    /// Hunger as a fraction of max.
    pub fn hunger_fraction(&self) -> f32 {
        self.hunger / self.config.max_value
    }

    /// Thirst as a fraction of max.
    pub fn thirst_fraction(&self) -> f32 {
        self.thirst / self.config.max_value
    }

    /// Stamina as a fraction of max.
    pub fn stamina_fraction(&self) -> f32 {
        self.stamina / self.config.max_value
    }

    /// Health has run out.
    pub fn is_depleted(&self) -> bool {
        self.health <= 0.0
    }

    /// Enough stamina for sprint or jump.
    pub fn can_exert(&self) -> bool {
        self.stamina > self.config.min_action_stamina
    }

    /// Side of the replication link.
    pub fn role(&self) -> NetRole {
        self.role
    }

    /// Replicated view.
    pub fn snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            health: self.health,
            hunger: self.hunger,
            thirst: self.thirst,
            stamina: self.stamina,
            ammo: self.ammo.clone(),
        }
    }

    /// Overwrite with replicated values (observers only).
    pub fn apply_snapshot(&mut self, snapshot: StatSnapshot) {
        self.health = snapshot.health;
        self.hunger = snapshot.hunger;
        self.thirst = snapshot.thirst;
        self.stamina = snapshot.stamina;
        self.ammo = snapshot.ammo;
    }

    // =========================================================================
    // Additions (authority only)
    // =========================================================================

    fn clamp(&self, value: f32) -> f32 {
        value.clamp(0.0, self.config.max_value)
    }

    fn check_amount(&self, value: f32) -> GameResult<()> {
        if !self.role.is_authority() {
            return Err(GameError::not_authority());
        }
        if !value.is_finite() || value < 0.0 {
            return Err(GameError::InvalidRequest(format!("bad stat amount {value}")));
        }
        Ok(())
    }

    /// Raise health toward max.
    pub fn add_health(&mut self, value: f32) -> GameResult<()> {
        self.check_amount(value)?;
        self.health = self.clamp(self.health + value);
        Ok(())
    }

    /// Raise hunger toward max.
    pub fn add_hunger(&mut self, value: f32) -> GameResult<()> {
        self.check_amount(value)?;
        self.hunger = self.clamp(self.hunger + value);
        Ok(())
    }

    /// Raise thirst toward max.
    pub fn add_thirst(&mut self, value: f32) -> GameResult<()> {
        self.check_amount(value)?;
        self.thirst = self.clamp(self.thirst + value);
        Ok(())
    }

    /// Add reserve rounds.
    pub fn add_ammo(&mut self, ammo_type: AmmoType, amount: u32) -> GameResult<()> {
        if !self.role.is_authority() {
            return Err(GameError::not_authority());
        }
        let slot = self.ammo.entry(ammo_type).or_insert(0);
        *slot = slot.saturating_add(amount);
        Ok(())
    }

    // =========================================================================
    // Reductions (forwarded from observers)
    // =========================================================================

    /// Lower health, saturating at zero.
    pub fn lower_health(&mut self, value: f32) -> GameResult<Dispatch> {
        if !self.role.is_authority() {
            return Ok(Dispatch::Forward(ServerRpc::LowerHealth { amount: value }));
        }
        self.check_amount(value)?;
        self.health = self.clamp(self.health - value);
        Ok(Dispatch::Applied)
    }

    /// Lower hunger. Starves at zero, heals while well fed.
    pub fn lower_hunger(&mut self, value: f32) -> GameResult<Dispatch> {
        if !self.role.is_authority() {
            return Ok(Dispatch::Forward(ServerRpc::LowerHunger { amount: value }));
        }
        self.check_amount(value)?;
        self.hunger = self.clamp(self.hunger - value);

        if self.hunger <= 0.0 {
            self.health = self.clamp(self.health - self.config.hunger_damage);
        } else if self.hunger >= self.config.hunger_healing_threshold {
            self.health = self.clamp(self.health + self.config.hunger_healing_amount);
        }
        Ok(Dispatch::Applied)
    }

    /// Lower thirst. Dehydrates at zero, heals while well watered.
    pub fn lower_thirst(&mut self, value: f32) -> GameResult<Dispatch> {
        if !self.role.is_authority() {
            return Ok(Dispatch::Forward(ServerRpc::LowerThirst { amount: value }));
        }
        self.check_amount(value)?;
        self.thirst = self.clamp(self.thirst - value);

        if self.thirst <= 0.0 {
            self.health = self.clamp(self.health - self.config.thirst_damage);
        } else if self.thirst >= self.config.thirst_healing_threshold {
            self.health = self.clamp(self.health + self.config.thirst_healing_amount);
        }
        Ok(Dispatch::Applied)
    }

    /// Lower stamina, saturating at zero.
    pub fn lower_stamina(&mut self, value: f32) -> GameResult<Dispatch> {
        if !self.role.is_authority() {
            return Ok(Dispatch::Forward(ServerRpc::LowerStamina { amount: value }));
        }
        self.check_amount(value)?;
        self.stamina = self.clamp(self.stamina - value);
        Ok(Dispatch::Applied)
    }

    // =========================================================================
    // Ammunition
    // =========================================================================

    /// Take up to `deficit` rounds of `ammo_type` for a reload.
    ///
    /// Returns the rounds taken: `min(available, deficit)`, zero when empty.
    pub fn subtract_reload_ammo(&mut self, deficit: u32, ammo_type: AmmoType) -> u32 {
        if !self.role.is_authority() {
            return 0;
        }
        let Some(available) = self.ammo.get_mut(&ammo_type) else {
            return 0;
        };
        let taken = (*available).min(deficit);
        *available -= taken;
        taken
    }

    /// Remove exactly `amount` reserve rounds.
    pub fn remove_ammo(&mut self, ammo_type: AmmoType, amount: u32) -> GameResult<()> {
        if !self.role.is_authority() {
            return Err(GameError::not_authority());
        }
        let available = self.ammo(ammo_type);
        if amount == 0 || amount > available {
            return Err(GameError::ResourceExhausted(format!(
                "cannot remove {amount} of {available} {} rounds",
                ammo_type.name()
            )));
        }
        self.ammo.insert(ammo_type, available - amount);
        Ok(())
    }

    /// Empty every reserve, returning the non-zero stacks.
    pub fn take_all_ammo(&mut self) -> Vec<(AmmoType, u32)> {
        let stacks = self
            .ammo
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(ammo_type, count)| (*ammo_type, *count))
            .collect();
        self.ammo.clear();
        stacks
    }

    // =========================================================================
    // Periodic handlers
    // =========================================================================

    /// One hunger/thirst decay step. Returns true once health has run out.
    ///
    /// Stops after the step that empties health, so a well-watered character
    /// cannot heal back from a starvation hit in the same step.
    pub fn decay(&mut self) -> GameResult<bool> {
        self.lower_hunger(self.config.hunger_decay)?;
        if self.is_depleted() {
            return Ok(true);
        }
        self.lower_thirst(self.config.thirst_decay)?;
        Ok(self.is_depleted())
    }

    /// One stamina regen step.
    pub fn regenerate_stamina(&mut self) {
        if self.role.is_authority() && self.stamina < self.config.max_value {
            self.stamina = self.clamp(self.stamina + self.config.stamina_regen);
        }
    }

    /// Stamina cost of one sprint drain step.
    pub fn sprint_drain(&self) -> f32 {
        self.config.sprint_drain
    }

    /// Stamina cost of a jump.
    pub fn jump_cost(&self) -> f32 {
        self.config.jump_cost
    }

    /// Arm decay, regen and sprint timers for `owner`.
    pub fn start_timers(&mut self, timers: &mut TimerService<TimerEvent>, owner: ActorId) {
        if !self.role.is_authority() {
            return;
        }
        self.stop_timers(timers);
        self.timers.decay = Some(timers.schedule(self.config.decay_interval(), true, TimerEvent::StatDecay(owner)));
        self.timers.regen = Some(timers.schedule(self.config.stamina_regen_interval(), true, TimerEvent::StaminaRegen(owner)));

        // Sprint drain only runs while sprinting
        let sprint = timers.schedule(self.config.sprint_drain_interval(), true, TimerEvent::SprintDrain(owner));
        timers.pause(sprint);
        self.timers.sprint = Some(sprint);
    }

    /// Cancel every timer this tracker owns.
    pub fn stop_timers(&mut self, timers: &mut TimerService<TimerEvent>) {
        for handle in [self.timers.decay.take(), self.timers.regen.take(), self.timers.sprint.take()]
            .into_iter()
            .flatten()
        {
            timers.cancel(handle);
        }
    }

    /// Pause stamina regen and run sprint drain while sprinting, and the reverse.
    pub fn control_sprinting_timer(
        &mut self,
        timers: &mut TimerService<TimerEvent>,
        sprinting: bool,
    ) -> Dispatch {
        if !self.role.is_authority() {
            return Dispatch::Forward(ServerRpc::SetSprinting { sprinting });
        }
        if let (Some(regen), Some(sprint)) = (self.timers.regen, self.timers.sprint) {
            if sprinting {
                timers.pause(regen);
                timers.unpause(sprint);
            } else {
                timers.unpause(regen);
                timers.pause(sprint);
            }
        } else {
            debug!("Sprint control on a tracker without timers");
        }
        Dispatch::Applied
    }

    /// Is stamina regen currently paused?
    pub fn is_regen_paused(&self, timers: &TimerService<TimerEvent>) -> bool {
        self.timers.regen.map(|h| timers.is_paused(h)).unwrap_or(false)
    }
}

// =============================================================================
// TESTS
// =============================================================================
