//! Pickups and Ammunition
//!
//! Consumables live in the world until collected into an inventory. While
//! held they are hidden and have no collision; dropping one puts it back.
//! Ammo stacks are never held: interacting with one empties it into the
//! collector's reserve and removes it from the world.

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::game::error::{GameError, GameResult};
use crate::game::stats::StatTracker;
use crate::game::types::{ActorId, AmmoType, PickupType};

/// Margin below max at which food and water are refused.
pub const NEARLY_FULL_MARGIN: f32 = 2.0;

/// Collision radius used for probes.
pub const PICKUP_RADIUS: f32 = 20.0;

/// A consumable item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    /// Actor id
    pub id: ActorId,
    /// Effect kind
    pub pickup_type: PickupType,
    /// Effect magnitude
    pub amount: f32,
    /// World location (meaningful while not held)
    pub position: Vec3,
    /// In some inventory
    pub held: bool,
}

impl Pickup {
    /// New world pickup.
    pub fn new(id: ActorId, pickup_type: PickupType, amount: f32, position: Vec3) -> Self {
        Self {
            id,
            pickup_type,
            amount,
            position,
            held: false,
        }
    }

    /// Visible and collidable only while in the world.
    pub fn is_collidable(&self) -> bool {
        !self.held
    }

    /// Apply the effect to `stats`.
    ///
    /// Fails without touching `stats` when the target stat is already
    /// (nearly) full, so the item is not wasted.
    pub fn apply_to(&self, stats: &mut StatTracker) -> GameResult<()> {
        let max = stats.max_value();
        match self.pickup_type {
            PickupType::Food => {
                if stats.hunger() > max - NEARLY_FULL_MARGIN {
                    return Err(GameError::ResourceExhausted("hunger is nearly full".into()));
                }
                stats.add_hunger(self.amount)
            }
            PickupType::Water => {
                if stats.thirst() > max - NEARLY_FULL_MARGIN {
                    return Err(GameError::ResourceExhausted("thirst is nearly full".into()));
                }
                stats.add_thirst(self.amount)
            }
            PickupType::Bandage => {
                if stats.health() >= max {
                    return Err(GameError::ResourceExhausted("health is full".into()));
                }
                stats.add_health(self.amount)
            }
        }
    }
}

/// A stack of rounds lying in the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmmoStack {
    /// Actor id
    pub id: ActorId,
    /// Family
    pub ammo_type: AmmoType,
    /// Rounds
    pub amount: u32,
    /// World location
    pub position: Vec3,
}

impl AmmoStack {
    /// New stack.
    pub fn new(id: ActorId, ammo_type: AmmoType, amount: u32, position: Vec3) -> Self {
        Self { id, ammo_type, amount, position }
    }

    /// Move every round into `stats`.
    pub fn collect_into(&self, stats: &mut StatTracker) -> GameResult<()> {
        if self.amount == 0 {
            return Err(GameError::ResourceExhausted("empty ammo stack".into()));
        }
        stats.add_ammo(self.ammo_type, self.amount)
    }
}
