//! Validated Remote Procedures
//!
//! Every client-initiated mutation arrives as a `ServerRpc`. The authority
//! runs it in two phases:
//!
//! 1. `can_perform` - a pure predicate over the world and the caller
//! 2. `perform` - the mutation, which may still fail on a resource check
//!
//! A false predicate or a failed perform drops the request silently. The
//! only trace is a debug log line on the server.

use glam::Vec3;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::game::character::PITCH_LIMIT;
use crate::game::error::{GameError, GameResult};
use crate::game::probe::HitResult;
use crate::game::types::{ActorId, AmmoType, ControllerId};
use crate::game::world::{MovementUpdate, World};

/// Outcome of a mutation attempted on either side of the link.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatch {
    /// Applied locally (authority)
    Applied,
    /// Must be sent to the authority instead (observer)
    Forward(ServerRpc),
}

/// Client-to-authority requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rpc", rename_all = "snake_case")]
pub enum ServerRpc {
    /// Interact with whatever the pawn faces
    Interact,
    /// Fire the weapon in hand, or melee without one
    Attack {
        /// Client-side probe result
        client_hit: HitResult,
        /// Client aim point, honoured while aiming
        aim_point: Option<Vec3>,
    },
    /// Start a reload
    Reload,
    /// Cancel a pending reload
    CancelReload,
    /// Close the opened container
    CloseContainer,
    /// Aim down sights
    Aim {
        /// New flag
        aiming: bool,
    },
    /// View pitch for non-owner aim visuals
    SetPitch {
        /// Degrees
        pitch: f32,
    },
    /// Start or stop sprinting
    SetSprinting {
        /// New flag
        sprinting: bool,
    },
    /// Movement-layer state, ordered with the sender's other requests
    Move {
        /// New kinematic state
        update: MovementUpdate,
    },
    /// Jump
    Jump,
    /// Crouch or stand
    Crouch {
        /// New flag
        crouching: bool,
    },
    /// Drop the active weapon
    DropWeapon,
    /// Move the active weapon between hand and back
    UnEquip,
    /// Drop reserve ammo as a world stack
    DropAmmo {
        /// Family
        ammo_type: AmmoType,
        /// Rounds
        amount: u32,
    },
    /// Drop an inventory item
    DropItem {
        /// Item
        item: ActorId,
    },
    /// Consume an inventory item
    UseItem {
        /// Item
        item: ActorId,
    },
    /// Move an inventory item to another inventory
    TransferItem {
        /// Item
        item: ActorId,
        /// Character or container
        destination: ActorId,
    },
    /// Take an item out of the opened container
    ReceiveItem {
        /// Item
        item: ActorId,
    },
    /// Forwarded stat reduction
    LowerHealth {
        /// Amount
        amount: f32,
    },
    /// Forwarded stat reduction
    LowerHunger {
        /// Amount
        amount: f32,
    },
    /// Forwarded stat reduction
    LowerThirst {
        /// Amount
        amount: f32,
    },
    /// Forwarded stat reduction
    LowerStamina {
        /// Amount
        amount: f32,
    },
    /// Toggle probe visualisation
    ToggleDebug,
}

/// A request tagged with its sender.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Sending controller
    pub caller: ControllerId,
    /// Request
    pub rpc: ServerRpc,
}

impl ServerRpc {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ServerRpc::Interact => "interact",
            ServerRpc::Attack { .. } => "attack",
            ServerRpc::Reload => "reload",
            ServerRpc::CancelReload => "cancel_reload",
            ServerRpc::CloseContainer => "close_container",
            ServerRpc::Aim { .. } => "aim",
            ServerRpc::SetPitch { .. } => "set_pitch",
            ServerRpc::SetSprinting { .. } => "set_sprinting",
            ServerRpc::Move { .. } => "move",
            ServerRpc::Jump => "jump",
            ServerRpc::Crouch { .. } => "crouch",
            ServerRpc::DropWeapon => "drop_weapon",
            ServerRpc::UnEquip => "unequip",
            ServerRpc::DropAmmo { .. } => "drop_ammo",
            ServerRpc::DropItem { .. } => "drop_item",
            ServerRpc::UseItem { .. } => "use_item",
            ServerRpc::TransferItem { .. } => "transfer_item",
            ServerRpc::ReceiveItem { .. } => "receive_item",
            ServerRpc::LowerHealth { .. } => "lower_health",
            ServerRpc::LowerHunger { .. } => "lower_hunger",
            ServerRpc::LowerThirst { .. } => "lower_thirst",
            ServerRpc::LowerStamina { .. } => "lower_stamina",
            ServerRpc::ToggleDebug => "toggle_debug",
        }
    }

    /// Validation predicate. Pure: never mutates the world.
    pub fn can_perform(&self, world: &World, caller: ControllerId) -> bool {
        let Ok(pawn) = world.living_pawn(caller) else {
            return false;
        };
        let Some(character) = world.characters.get(&pawn) else {
            return false;
        };

        match self {
            ServerRpc::DropItem { item } | ServerRpc::UseItem { item } => world.does_possess_item(pawn, *item),
            ServerRpc::TransferItem { item, destination } => {
                world.does_possess_item(pawn, *item)
                    && world.inventory(*destination).is_some()
                    && world.characters.get(destination).map(|c| c.is_alive()).unwrap_or(true)
            }
            ServerRpc::ReceiveItem { item } => character
                .opened_container
                .and_then(|c| world.containers.get(&c))
                .map(|c| c.opener() == Some(pawn) && c.inventory.contains(*item))
                .unwrap_or(false),
            ServerRpc::CloseContainer => character.opened_container.is_some(),
            ServerRpc::SetPitch { pitch } => pitch.is_finite() && pitch.abs() <= PITCH_LIMIT,
            ServerRpc::Move { update } => {
                character.movement_enabled
                    && update.position.is_finite()
                    && update.velocity.is_finite()
                    && update.yaw.is_finite()
            }
            ServerRpc::DropAmmo { ammo_type, amount } => {
                *amount > 0 && *amount <= character.stats.ammo(*ammo_type)
            }
            ServerRpc::DropWeapon | ServerRpc::UnEquip => character.active_weapon.is_some(),
            ServerRpc::Attack { client_hit, aim_point } => {
                client_hit.trace_start.is_finite()
                    && client_hit.trace_end.is_finite()
                    && aim_point.map(|p| p.is_finite()).unwrap_or(true)
            }
            ServerRpc::LowerHealth { amount }
            | ServerRpc::LowerHunger { amount }
            | ServerRpc::LowerThirst { amount }
            | ServerRpc::LowerStamina { amount } => amount.is_finite() && *amount >= 0.0,
            ServerRpc::Interact
            | ServerRpc::Reload
            | ServerRpc::CancelReload
            | ServerRpc::Aim { .. }
            | ServerRpc::SetSprinting { .. }
            | ServerRpc::Jump
            | ServerRpc::Crouch { .. }
            | ServerRpc::ToggleDebug => true,
        }
    }

    /// Run the request on the authority.
    pub fn perform(self, world: &mut World, caller: ControllerId) -> GameResult<()> {
        let pawn = world.living_pawn(caller)?;

        match self {
            ServerRpc::Interact => world.interact(pawn),
            ServerRpc::Attack { client_hit, aim_point } => world.attack(pawn, client_hit, aim_point),
            ServerRpc::Reload => world.reload(pawn),
            ServerRpc::CancelReload => world.request_cancel_reload(pawn),
            ServerRpc::CloseContainer => world.close_container(pawn),
            ServerRpc::Aim { aiming } => world.set_aiming(pawn, aiming),
            ServerRpc::SetPitch { pitch } => world.set_pitch(pawn, pitch),
            ServerRpc::SetSprinting { sprinting } => world.set_sprinting(pawn, sprinting),
            ServerRpc::Move { update } => world.update_movement(pawn, update),
            ServerRpc::Jump => world.jump(pawn),
            ServerRpc::Crouch { crouching } => world.set_crouching(pawn, crouching),
            ServerRpc::DropWeapon => world.drop_weapon(pawn).map(|_| ()),
            ServerRpc::UnEquip => world.unequip(pawn),
            ServerRpc::DropAmmo { ammo_type, amount } => world.drop_ammo(pawn, ammo_type, amount).map(|_| ()),
            ServerRpc::DropItem { item } => world.drop_item(pawn, item).map(|_| ()),
            ServerRpc::UseItem { item } => world.use_item(pawn, item),
            ServerRpc::TransferItem { item, destination } => world.transfer_item(pawn, item, destination),
            ServerRpc::ReceiveItem { item } => world.receive_item(pawn, item),
            ServerRpc::LowerHealth { amount } => world.lower_vital(pawn, Vital::Health, amount),
            ServerRpc::LowerHunger { amount } => world.lower_vital(pawn, Vital::Hunger, amount),
            ServerRpc::LowerThirst { amount } => world.lower_vital(pawn, Vital::Thirst, amount),
            ServerRpc::LowerStamina { amount } => world.lower_vital(pawn, Vital::Stamina, amount),
            ServerRpc::ToggleDebug => world.toggle_debug(pawn).map(|_| ()),
        }
    }
}

/// Stat targeted by a forwarded reduction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vital {
    /// Health
    Health,
    /// Hunger
    Hunger,
    /// Thirst
    Thirst,
    /// Stamina
    Stamina,
}

impl World {
    /// Validate and run one client request. Returns whether it took effect.
    pub fn dispatch(&mut self, caller: ControllerId, rpc: ServerRpc) -> bool {
        let name = rpc.name();
        if !rpc.can_perform(self, caller) {
            debug!(%caller, rpc = name, "Request failed validation");
            return false;
        }
        match rpc.perform(self, caller) {
            Ok(()) => true,
            Err(e) => {
                debug!(%caller, rpc = name, error = %e, "Request dropped");
                false
            }
        }
    }

    /// Apply a forwarded stat reduction; depletion kills.
    pub fn lower_vital(&mut self, character: ActorId, vital: Vital, amount: f32) -> GameResult<()> {
        let pawn = self
            .characters
            .get_mut(&character)
            .ok_or_else(|| GameError::missing(character))?;
        match vital {
            Vital::Health => pawn.stats.lower_health(amount)?,
            Vital::Hunger => pawn.stats.lower_hunger(amount)?,
            Vital::Thirst => pawn.stats.lower_thirst(amount)?,
            Vital::Stamina => pawn.stats.lower_stamina(amount)?,
        };
        if pawn.stats.is_depleted() && pawn.is_alive() {
            self.die(character, None)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::PickupType;
    use crate::game::world::tests::test_world;

    #[test]
    fn test_rpc_json_shape() {
        let rpc = ServerRpc::DropAmmo { ammo_type: AmmoType::Sniper, amount: 3 };
        let json = serde_json::to_string(&rpc).unwrap();
        assert!(json.contains("\"rpc\":\"drop_ammo\""));
        assert!(json.contains("\"ammo_type\":\"sniper\""));

        let parsed: ServerRpc = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rpc);
    }

    #[test]
    fn test_unknown_caller_rejected() {
        let (world, _) = test_world();
        assert!(!ServerRpc::Jump.can_perform(&world, ControllerId(42)));
    }

    #[test]
    fn test_item_requests_require_possession() {
        let (mut world, player) = test_world();
        let caller = world.controller_of(player).unwrap();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);

        let rpc = ServerRpc::UseItem { item: food };
        assert!(!rpc.can_perform(&world, caller));
        assert!(!world.dispatch(caller, rpc.clone()));
        assert!(world.pickups.contains_key(&food));

        world.add_item(player, Some(food)).unwrap();
        world.characters.get_mut(&player).unwrap().stats.lower_hunger(50.0).unwrap();
        assert!(rpc.can_perform(&world, caller));
        assert!(world.dispatch(caller, rpc));
        assert!(!world.pickups.contains_key(&food));
    }

    #[test]
    fn test_pitch_limits() {
        let (mut world, player) = test_world();
        let caller = world.controller_of(player).unwrap();

        assert!(!ServerRpc::SetPitch { pitch: 120.0 }.can_perform(&world, caller));
        assert!(!ServerRpc::SetPitch { pitch: f32::NAN }.can_perform(&world, caller));
        assert!(world.dispatch(caller, ServerRpc::SetPitch { pitch: -45.0 }));
        assert_eq!(world.characters[&player].pitch, -45.0);
    }

    #[test]
    fn test_move_request() {
        let (mut world, player) = test_world();
        let caller = world.controller_of(player).unwrap();
        let update = MovementUpdate {
            position: Vec3::new(120.0, -30.0, 90.0),
            velocity: Vec3::new(300.0, 0.0, 0.0),
            yaw: 90.0,
            is_falling: false,
        };

        let bad = ServerRpc::Move { update: MovementUpdate { yaw: f32::INFINITY, ..update } };
        assert!(!world.dispatch(caller, bad));

        assert!(world.dispatch(caller, ServerRpc::Move { update }));
        assert_eq!(world.characters[&player].position, update.position);
        assert_eq!(world.characters[&player].yaw, 90.0);
    }

    #[test]
    fn test_failed_perform_leaves_state() {
        let (mut world, player) = test_world();
        let caller = world.controller_of(player).unwrap();

        // Validation passes, but there is no weapon to reload
        assert!(ServerRpc::Reload.can_perform(&world, caller));
        let before = world.compute_hash();
        assert!(!world.dispatch(caller, ServerRpc::Reload));
        assert_eq!(world.compute_hash(), before);
    }

    #[test]
    fn test_forwarded_health_reduction_kills() {
        let (mut world, player) = test_world();
        let caller = world.controller_of(player).unwrap();

        assert!(world.dispatch(caller, ServerRpc::LowerHealth { amount: 500.0 }));
        assert!(world.characters[&player].is_dead);

        // Dead pawns cannot issue requests
        assert!(!world.dispatch(caller, ServerRpc::Jump));
    }
}
