//! Player Characters
//!
//! The pawn a controller possesses. Location, velocity and view rotation are
//! owned by the movement layer and written through `World::update_movement`;
//! everything else here is gameplay state mutated by the controller logic.

use glam::Vec3;

use crate::core::timer::TimerHandle;
use crate::game::config::{CombatConfig, GameConfig};
use crate::game::inventory::Inventory;
use crate::game::stats::StatTracker;
use crate::game::types::{ActorId, ControllerId};

/// Bounding sphere radius used for probes.
pub const CHARACTER_RADIUS: f32 = 90.0;

/// Below this speed a character counts as standing still.
pub const MOVING_SPEED_EPSILON: f32 = 1.0;

/// Pitch limits accepted from clients, in degrees.
pub const PITCH_LIMIT: f32 = 90.0;

/// Unit direction from yaw and pitch in degrees (x forward, z up).
pub fn direction_from_rotation(yaw: f32, pitch: f32) -> Vec3 {
    let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());
    Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), pitch.sin())
}

/// A player character.
#[derive(Clone, Debug)]
pub struct Character {
    /// Actor id
    pub id: ActorId,
    /// Possessing controller
    pub controller: Option<ControllerId>,

    /// Capsule centre
    pub position: Vec3,
    /// Current velocity
    pub velocity: Vec3,
    /// View yaw, degrees
    pub yaw: f32,
    /// View pitch, degrees (replicated to non-owners)
    pub pitch: f32,
    /// Airborne
    pub is_falling: bool,

    /// Vital stats
    pub stats: StatTracker,
    /// Carried items
    pub inventory: Inventory,

    /// Dead and ragdolled
    pub is_dead: bool,
    /// Aiming down sights
    pub is_aiming: bool,
    /// Reload timer pending
    pub is_reloading: bool,
    /// Sprinting
    pub is_sprinting: bool,
    /// Crouched
    pub is_crouching: bool,
    /// Active weapon hangs on the back
    pub weapon_on_back: bool,

    /// Weapon attached to this character
    pub active_weapon: Option<ActorId>,
    /// Container this character has open (not owned)
    pub opened_container: Option<ActorId>,

    /// Capsule blocks probes
    pub collision_enabled: bool,
    /// Movement layer may move the character
    pub movement_enabled: bool,
    /// Mesh is physics-simulated
    pub ragdoll: bool,
    /// Probes emit debug lines
    pub debug_enabled: bool,

    /// Pending reload
    pub reload_timer: Option<TimerHandle>,
    /// Pending corpse removal
    pub destroy_timer: Option<TimerHandle>,
}

impl Character {
    /// Fresh character at `position`.
    pub fn new(id: ActorId, position: Vec3, config: &GameConfig) -> Self {
        Self {
            id,
            controller: None,
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            is_falling: false,
            stats: StatTracker::new(&config.stats),
            inventory: Inventory::new(config.inventory.character_capacity),
            is_dead: false,
            is_aiming: false,
            is_reloading: false,
            is_sprinting: false,
            is_crouching: false,
            weapon_on_back: false,
            active_weapon: None,
            opened_container: None,
            collision_enabled: true,
            movement_enabled: true,
            ragdoll: false,
            debug_enabled: false,
            reload_timer: None,
            destroy_timer: None,
        }
    }

    /// Not dead.
    pub fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Moving faster than the standing threshold.
    pub fn is_moving(&self) -> bool {
        self.velocity.length() > MOVING_SPEED_EPSILON
    }

    /// Camera view point.
    pub fn eye_position(&self, combat: &CombatConfig) -> Vec3 {
        self.position + Vec3::new(0.0, 0.0, combat.eye_height)
    }

    /// View direction.
    pub fn view_forward(&self) -> Vec3 {
        direction_from_rotation(self.yaw, self.pitch)
    }

    /// Muzzle location of a weapon held in hand.
    pub fn muzzle_location(&self, combat: &CombatConfig) -> Vec3 {
        self.eye_position(combat) + self.view_forward() * combat.muzzle_forward
    }

    /// Weapon in hand and ready to fire.
    pub fn has_weapon_in_hand(&self) -> bool {
        self.active_weapon.is_some() && !self.weapon_on_back
    }

    /// HUD summary line.
    pub fn player_stats_string(&self) -> String {
        format!(
            "Health: {},  Hunger: {},  Thirst: {},  Stamina: {}",
            self.stats.health(),
            self.stats.hunger(),
            self.stats.thirst(),
            self.stats.stamina()
        )
    }
}
