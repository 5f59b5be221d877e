//! Game Events
//!
//! One-way notifications the authority emits while processing a frame:
//! gameplay facts (death, pickups, shots) and presentation cues (emitters,
//! sounds, camera shake). Each event carries the set of observers it is
//! delivered to.

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::game::types::{ActorId, AmmoType, ControllerId, PickupType};

/// Priority for delivery order within a tick.
///
/// Lower value = delivered first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Deaths and respawns first
    Lifecycle = 0,
    /// Then damage
    Damage = 1,
    /// Then item movement
    Inventory = 2,
    /// Then weapon state
    Combat = 3,
    /// Cosmetic cues last
    Presentation = 4,
}

/// Which observers receive an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    /// Every connected observer
    All,
    /// Only the owning controller
    Owner(ControllerId),
    /// Everyone except the owning controller
    SkipOwner(ControllerId),
}

impl EventScope {
    /// Does `observer` receive events in this scope?
    pub fn includes(self, observer: ControllerId) -> bool {
        match self {
            EventScope::All => true,
            EventScope::Owner(owner) => owner == observer,
            EventScope::SkipOwner(owner) => owner != observer,
        }
    }

    /// `SkipOwner` when there is an owner, otherwise `All`.
    pub fn skip(owner: Option<ControllerId>) -> Self {
        owner.map(EventScope::SkipOwner).unwrap_or(EventScope::All)
    }
}

/// Camera feedback flavours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraShakeKind {
    /// Played for the victim of a hit
    Hit,
    /// Played for the shooter
    Fire,
}

/// Event payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEventData {
    /// A character died.
    CharacterDied {
        /// Victim
        character: ActorId,
        /// Character whose damage was fatal, if any
        killer: Option<ActorId>,
    },

    /// A controller took over a freshly spawned character.
    CharacterSpawned {
        /// Controller
        controller: ControllerId,
        /// New pawn
        character: ActorId,
        /// Spawn location
        location: Vec3,
    },

    /// Disable capsule and movement, simulate the mesh.
    Ragdoll {
        /// Dead character
        character: ActorId,
    },

    /// Health was reduced by damage.
    DamageTaken {
        /// Victim
        character: ActorId,
        /// Damage applied
        amount: f32,
        /// Health afterwards
        health: f32,
    },

    /// An actor left the world.
    ActorDestroyed {
        /// Removed actor
        actor: ActorId,
    },

    /// Item entered an inventory.
    ItemAdded {
        /// Inventory owner
        owner: ActorId,
        /// Item
        item: ActorId,
    },

    /// Item was consumed.
    ItemUsed {
        /// Consumer
        character: ActorId,
        /// Item
        item: ActorId,
        /// What it was
        pickup_type: PickupType,
    },

    /// Item was placed back in the world.
    ItemDropped {
        /// Former owner
        owner: ActorId,
        /// Item
        item: ActorId,
        /// Floor location
        location: Vec3,
    },

    /// Item moved between inventories.
    ItemTransferred {
        /// Item
        item: ActorId,
        /// Source owner
        from: ActorId,
        /// Destination owner
        to: ActorId,
    },

    /// Ammunition went into reserve.
    AmmoCollected {
        /// Collector
        character: ActorId,
        /// Family
        ammo_type: AmmoType,
        /// Rounds
        amount: u32,
    },

    /// Reserve ammunition was placed in the world.
    AmmoDropped {
        /// Former holder
        character: ActorId,
        /// New ammo stack
        stack: ActorId,
        /// Family
        ammo_type: AmmoType,
        /// Rounds
        amount: u32,
    },

    /// A weapon became the active weapon.
    WeaponEquipped {
        /// Holder
        character: ActorId,
        /// Weapon
        weapon: ActorId,
        /// Table row
        name: String,
    },

    /// The active weapon was dropped into the world.
    WeaponDropped {
        /// Former holder
        character: ActorId,
        /// New world weapon
        weapon: ActorId,
        /// Table row
        name: String,
        /// Floor location
        location: Vec3,
    },

    /// Weapon moved between hand and back.
    WeaponSlung {
        /// Holder
        character: ActorId,
        /// Weapon
        weapon: ActorId,
        /// True when now on the back
        on_back: bool,
    },

    /// An authoritative shot was taken.
    WeaponFired {
        /// Shooter
        character: ActorId,
        /// Weapon
        weapon: ActorId,
        /// Actor struck after validation, if any
        hit: Option<ActorId>,
        /// Rounds left
        magazine: u32,
    },

    /// Fire was requested with an empty magazine.
    OutOfAmmo {
        /// Shooter
        character: ActorId,
        /// Weapon
        weapon: ActorId,
    },

    /// A reload timer was started.
    ReloadStarted {
        /// Holder
        character: ActorId,
        /// Weapon
        weapon: ActorId,
    },

    /// A reload completed.
    ReloadFinished {
        /// Holder
        character: ActorId,
        /// Weapon
        weapon: ActorId,
        /// Rounds moved from reserve
        loaded: u32,
    },

    /// A pending reload was cancelled.
    ReloadCancelled {
        /// Holder
        character: ActorId,
    },

    /// A container gained its opener.
    ContainerOpened {
        /// Container
        container: ActorId,
        /// Opener
        character: ActorId,
    },

    /// A container lost its opener.
    ContainerClosed {
        /// Container
        container: ActorId,
        /// Former opener
        character: ActorId,
    },

    /// Particle effect attached to an actor.
    EmitterAttached {
        /// Effect asset
        effect: String,
        /// Parent actor
        actor: ActorId,
    },

    /// Particle effect at a location.
    EmitterAtLocation {
        /// Effect asset
        effect: String,
        /// Location
        location: Vec3,
    },

    /// Sound attached to an actor.
    SoundAttached {
        /// Sound asset
        sound: String,
        /// Parent actor
        actor: ActorId,
    },

    /// Camera feedback.
    CameraShake {
        /// Flavour
        shake: CameraShakeKind,
    },

    /// Visualised probe.
    DebugLine {
        /// Ray start
        start: Vec3,
        /// Ray end
        end: Vec3,
        /// Whether it hit something
        hit: bool,
    },
}

/// An event with timing, priority and audience.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Delivery priority
    pub priority: EventPriority,

    /// Audience
    pub scope: EventScope,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, priority: EventPriority, scope: EventScope, data: GameEventData) -> Self {
        Self { tick, priority, scope, data }
    }

    /// Death notice for everyone.
    pub fn character_died(tick: u64, character: ActorId, killer: Option<ActorId>) -> Self {
        Self::new(
            tick,
            EventPriority::Lifecycle,
            EventScope::All,
            GameEventData::CharacterDied { character, killer },
        )
    }

    /// Camera shake for one controller.
    pub fn camera_shake(tick: u64, owner: ControllerId, shake: CameraShakeKind) -> Self {
        Self::new(
            tick,
            EventPriority::Presentation,
            EventScope::Owner(owner),
            GameEventData::CameraShake { shake },
        )
    }

    /// Is this a cosmetic cue rather than a gameplay fact?
    pub fn is_presentation(&self) -> bool {
        self.priority == EventPriority::Presentation
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.priority == other.priority
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_includes() {
        let owner = ControllerId(1);
        let other = ControllerId(2);

        assert!(EventScope::All.includes(owner));
        assert!(EventScope::Owner(owner).includes(owner));
        assert!(!EventScope::Owner(owner).includes(other));
        assert!(!EventScope::SkipOwner(owner).includes(owner));
        assert!(EventScope::SkipOwner(owner).includes(other));
        assert_eq!(EventScope::skip(None), EventScope::All);
    }

    #[test]
    fn test_event_ordering() {
        let death = GameEvent::character_died(10, ActorId(1), None);
        let shake = GameEvent::camera_shake(10, ControllerId(1), CameraShakeKind::Hit);
        let later = GameEvent::character_died(11, ActorId(2), None);

        assert!(death < shake);
        assert!(shake < later);
        assert!(shake.is_presentation());
    }
}
