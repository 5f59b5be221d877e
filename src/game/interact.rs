//! Interaction Dispatch
//!
//! Closed set of things a character can interact with. The authority
//! resolves a probe hit into an `Interactable` and runs its handler.

use serde::{Serialize, Deserialize};

use crate::game::error::{GameError, GameResult};
use crate::game::types::{ActorId, ActorKind, AmmoType, PickupType};
use crate::game::world::World;

/// A world actor that reacts to Interact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "actor", rename_all = "snake_case")]
pub enum Interactable {
    /// Collected into the inventory
    Pickup(ActorId),
    /// Toggled open or closed
    Container(ActorId),
    /// Equipped as the active weapon
    Weapon(ActorId),
    /// Emptied into the ammo reserve
    Ammo(ActorId),
}

impl Interactable {
    /// Classify a hit actor. Characters, held items and carried weapons are
    /// not interactable.
    pub fn resolve(world: &World, actor: ActorId) -> Option<Self> {
        match world.kind_of(actor)? {
            ActorKind::Pickup => world.pickups.get(&actor).filter(|p| !p.held).map(|_| Interactable::Pickup(actor)),
            ActorKind::Container => Some(Interactable::Container(actor)),
            ActorKind::Weapon => world.weapons.get(&actor).filter(|w| w.is_in_world()).map(|_| Interactable::Weapon(actor)),
            ActorKind::Ammo => Some(Interactable::Ammo(actor)),
            ActorKind::Character => None,
        }
    }

    /// Actor behind the variant.
    pub fn actor(self) -> ActorId {
        match self {
            Interactable::Pickup(id)
            | Interactable::Container(id)
            | Interactable::Weapon(id)
            | Interactable::Ammo(id) => id,
        }
    }

    /// Run the interaction for `character`.
    pub fn on_interact(self, world: &mut World, character: ActorId) -> GameResult<()> {
        match self {
            Interactable::Pickup(item) => world.add_item(character, Some(item)),
            Interactable::Container(container) => world.toggle_container(character, container),
            Interactable::Weapon(weapon) => world.equip_weapon(character, weapon),
            Interactable::Ammo(stack) => world.collect_ammo(character, stack),
        }
    }

    /// HUD hint shown to `character` while facing this actor.
    pub fn describe(self, world: &World, character: ActorId) -> GameResult<String> {
        let missing = || GameError::missing(self.actor());
        Ok(match self {
            Interactable::Pickup(id) => pickup_hint(world.pickups.get(&id).ok_or_else(missing)?.pickup_type),
            Interactable::Container(id) => {
                let container = world.containers.get(&id).ok_or_else(missing)?;
                container_hint(container.opener() == Some(character))
            }
            Interactable::Weapon(id) => weapon_hint(&world.weapons.get(&id).ok_or_else(missing)?.name),
            Interactable::Ammo(id) => {
                let stack = world.ammo.get(&id).ok_or_else(missing)?;
                ammo_hint(stack.amount, stack.ammo_type)
            }
        })
    }
}

pub(crate) fn pickup_hint(pickup_type: PickupType) -> String {
    format!("Pick up {}", pickup_type.name())
}

pub(crate) fn container_hint(opened_by_viewer: bool) -> String {
    if opened_by_viewer {
        "Close Container".to_string()
    } else {
        "Open Container".to_string()
    }
}

pub(crate) fn weapon_hint(name: &str) -> String {
    format!("Pick up {name}")
}

pub(crate) fn ammo_hint(amount: u32, ammo_type: AmmoType) -> String {
    format!("Pick up {amount} {} ammo", ammo_type.name())
}
