//! Storage Containers
//!
//! A world actor holding an inventory. At most one character has a given
//! container open; the container records that opener and the character
//! records the container, and both sides change in the same step.

use glam::Vec3;
use serde::{Serialize, Deserialize};

use crate::game::error::{GameError, GameResult};
use crate::game::inventory::Inventory;
use crate::game::types::ActorId;

/// Collision radius used for probes.
pub const CONTAINER_RADIUS: f32 = 50.0;

/// Chest-like storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageContainer {
    /// Actor id
    pub id: ActorId,
    /// World location
    pub position: Vec3,
    /// Contents
    pub inventory: Inventory,
    opener: Option<ActorId>,
}

impl StorageContainer {
    /// Empty, closed container.
    pub fn new(id: ActorId, position: Vec3, capacity: usize) -> Self {
        Self {
            id,
            position,
            inventory: Inventory::new(capacity),
            opener: None,
        }
    }

    /// Replicated open flag.
    pub fn is_open(&self) -> bool {
        self.opener.is_some()
    }

    /// Character that has it open.
    pub fn opener(&self) -> Option<ActorId> {
        self.opener
    }

    /// Claim for `character`. Fails if someone else holds it.
    pub fn open(&mut self, character: ActorId) -> GameResult<()> {
        match self.opener {
            Some(opener) if opener != character => Err(GameError::OwnershipConflict {
                container: self.id,
                opener,
            }),
            _ => {
                self.opener = Some(character);
                Ok(())
            }
        }
    }

    /// Release if `character` is the opener.
    pub fn close(&mut self, character: ActorId) -> bool {
        if self.opener == Some(character) {
            self.opener = None;
            true
        } else {
            false
        }
    }

    /// Force the replicated open state (observer copies).
    pub fn set_opener(&mut self, opener: Option<ActorId>) {
        self.opener = opener;
    }
}
