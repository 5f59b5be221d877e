//! Shared Game Types
//!
//! Identifiers, network roles and the small enums every component uses.

use std::fmt;

use serde::{Serialize, Deserialize};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a spawned actor (character, pickup, ammo, weapon, container).
///
/// Allocated monotonically by the world and never reused, so a stale id held
/// by an inventory or a pending timer simply fails to resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u32);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// Identifier of a connected controller (one per client connection).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ControllerId(pub u32);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}", self.0)
    }
}

// =============================================================================
// NETWORK ROLE
// =============================================================================

/// Which side of the replication link a piece of state lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NetRole {
    /// Canonical server-side state.
    #[default]
    Authority,
    /// Replicated copy on a client.
    Observer,
}

impl NetRole {
    /// True on the server.
    #[inline]
    pub fn is_authority(self) -> bool {
        matches!(self, NetRole::Authority)
    }
}

// =============================================================================
// ITEM KINDS
// =============================================================================

/// Ammunition families. Each weapon consumes exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmmoType {
    /// Rifle rounds
    Assault,
    /// Long-range rounds
    Sniper,
    /// Shells
    Shotgun,
}

impl AmmoType {
    /// All ammo types in stable order.
    pub const ALL: [AmmoType; 3] = [AmmoType::Assault, AmmoType::Sniper, AmmoType::Shotgun];

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            AmmoType::Assault => "Assault",
            AmmoType::Sniper => "Sniper",
            AmmoType::Shotgun => "Shotgun",
        }
    }
}

/// Consumable kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupType {
    /// Restores thirst
    Water,
    /// Restores hunger
    Food,
    /// Restores health
    Bandage,
}

impl PickupType {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            PickupType::Water => "Water",
            PickupType::Food => "Food",
            PickupType::Bandage => "Bandage",
        }
    }
}

/// Where a weapon currently hangs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachment {
    /// Lying in the world, free to pick up
    World,
    /// In the holder's hand; can fire
    Hand,
    /// Slung on the holder's back; cannot fire
    Back,
}

/// Closed set of actor kinds the world stores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// Player character
    Character,
    /// Consumable item
    Pickup,
    /// Ammunition stack
    Ammo,
    /// Firearm
    Weapon,
    /// Storage container
    Container,
}
