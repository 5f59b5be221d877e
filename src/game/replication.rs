//! Replication Snapshots
//!
//! Builds the per-observer view of the authoritative world. Most fields go
//! to everyone; a few are scoped:
//! - owner only: stats, inventory contents, opened container, magazine count
//! - skip owner: view pitch (the owner drives its own camera)
//! - opener only: contents of an opened container

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::core::hash::StateHash;
use crate::game::stats::StatSnapshot;
use crate::game::types::{ActorId, AmmoType, Attachment, ControllerId, PickupType};
use crate::game::world::World;

/// Replicated character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Actor id
    pub id: ActorId,
    /// Possessing controller
    pub controller: Option<ControllerId>,
    /// Capsule centre
    pub position: Vec3,
    /// Velocity
    pub velocity: Vec3,
    /// View yaw
    pub yaw: f32,
    /// View pitch, withheld from the owner
    pub pitch: Option<f32>,
    /// Dead
    pub is_dead: bool,
    /// Aiming
    pub is_aiming: bool,
    /// Reloading
    pub is_reloading: bool,
    /// Sprinting
    pub is_sprinting: bool,
    /// Crouched
    pub is_crouching: bool,
    /// Airborne
    pub is_falling: bool,
    /// Weapon slung on the back
    pub weapon_on_back: bool,
    /// Ragdolled
    pub ragdoll: bool,
    /// Capsule blocks probes
    pub collision_enabled: bool,
    /// Attached weapon
    pub active_weapon: Option<ActorId>,
    /// Vital stats, owner only
    pub stats: Option<StatSnapshot>,
    /// Carried items, owner only
    pub inventory: Option<Vec<ActorId>>,
    /// Opened container, owner only
    pub opened_container: Option<ActorId>,
}

/// Replicated consumable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickupState {
    /// Actor id
    pub id: ActorId,
    /// Effect kind
    pub pickup_type: PickupType,
    /// Effect magnitude
    pub amount: f32,
    /// World location
    pub position: Vec3,
    /// Hidden in an inventory
    pub held: bool,
}

/// Replicated ammo stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AmmoState {
    /// Actor id
    pub id: ActorId,
    /// Family
    pub ammo_type: AmmoType,
    /// Rounds
    pub amount: u32,
    /// World location
    pub position: Vec3,
}

/// Replicated weapon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponState {
    /// Actor id
    pub id: ActorId,
    /// Weapon table row
    pub name: String,
    /// Hand, back or world
    pub attachment: Attachment,
    /// Carrying character
    pub holder: Option<ActorId>,
    /// Location (the holder's while carried)
    pub position: Vec3,
    /// Rounds loaded, shown to the holder's owner only
    pub magazine: Option<u32>,
    /// Capacity
    pub max_magazine: u32,
}

/// Replicated storage container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContainerState {
    /// Actor id
    pub id: ActorId,
    /// World location
    pub position: Vec3,
    /// Someone has it open
    pub is_open: bool,
    /// Contents, shown to the opener's owner only
    pub items: Option<Vec<ActorId>>,
}

/// Everything one observer may see after a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplicationUpdate {
    /// Tick the snapshot was taken at
    pub tick: u64,
    /// Receiving controller
    pub observer: ControllerId,
    /// Its pawn
    pub pawn: Option<ActorId>,
    /// Characters
    pub characters: Vec<CharacterState>,
    /// Consumables
    pub pickups: Vec<PickupState>,
    /// Ammo stacks
    pub ammo: Vec<AmmoState>,
    /// Weapons
    pub weapons: Vec<WeaponState>,
    /// Containers
    pub containers: Vec<ContainerState>,
    /// Hash of the full authoritative state
    pub state_hash: StateHash,
}

impl ReplicationUpdate {
    /// Look up a replicated character.
    pub fn character(&self, id: ActorId) -> Option<&CharacterState> {
        self.characters.iter().find(|c| c.id == id)
    }

    /// Short hex prefix of the state hash for logs.
    pub fn hash_prefix(&self) -> String {
        hex::encode(&self.state_hash[..4])
    }
}

impl World {
    /// Snapshot scoped to `observer`.
    pub fn replicate_for(&self, observer: ControllerId) -> ReplicationUpdate {
        let owns = |character: ActorId| {
            self.characters
                .get(&character)
                .map(|c| c.controller == Some(observer))
                .unwrap_or(false)
        };

        let characters = self
            .characters
            .values()
            .map(|c| {
                let owner = c.controller == Some(observer);
                CharacterState {
                    id: c.id,
                    controller: c.controller,
                    position: c.position,
                    velocity: c.velocity,
                    yaw: c.yaw,
                    pitch: (!owner).then_some(c.pitch),
                    is_dead: c.is_dead,
                    is_aiming: c.is_aiming,
                    is_reloading: c.is_reloading,
                    is_sprinting: c.is_sprinting,
                    is_crouching: c.is_crouching,
                    is_falling: c.is_falling,
                    weapon_on_back: c.weapon_on_back,
                    ragdoll: c.ragdoll,
                    collision_enabled: c.collision_enabled,
                    active_weapon: c.active_weapon,
                    stats: owner.then(|| c.stats.snapshot()),
                    inventory: owner.then(|| c.inventory.items().to_vec()),
                    opened_container: c.opened_container.filter(|_| owner),
                }
            })
            .collect();

        let pickups = self
            .pickups
            .values()
            .map(|p| PickupState {
                id: p.id,
                pickup_type: p.pickup_type,
                amount: p.amount,
                position: p.position,
                held: p.held,
            })
            .collect();

        let ammo = self
            .ammo
            .values()
            .map(|a| AmmoState {
                id: a.id,
                ammo_type: a.ammo_type,
                amount: a.amount,
                position: a.position,
            })
            .collect();

        let weapons = self
            .weapons
            .values()
            .map(|w| WeaponState {
                id: w.id,
                name: w.name.clone(),
                attachment: w.attachment,
                holder: w.holder,
                position: self.actor_position(w.id).unwrap_or(w.position),
                magazine: w.holder.filter(|h| owns(*h)).map(|_| w.magazine),
                max_magazine: w.max_magazine(),
            })
            .collect();

        let containers = self
            .containers
            .values()
            .map(|c| ContainerState {
                id: c.id,
                position: c.position,
                is_open: c.is_open(),
                items: c.opener().filter(|o| owns(*o)).map(|_| c.inventory.items().to_vec()),
            })
            .collect();

        ReplicationUpdate {
            tick: self.tick,
            observer,
            pawn: self.pawn_of(observer),
            characters,
            pickups,
            ammo,
            weapons,
            containers,
            state_hash: self.compute_hash(),
        }
    }
}
