//! Inventory
//!
//! An ordered, bounded list of pickup references owned by a character or a
//! storage container. The list itself only stores ids; the world-level
//! operations below keep the referenced pickups' `held` flag and location in
//! step with membership.
//!
//! Every mutation runs on the authority. Client requests reach these through
//! validated remote procedures that first check the caller holds the item.

use glam::Vec3;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::game::error::{GameError, GameResult};
use crate::game::events::{EventPriority, EventScope, GameEventData};
use crate::game::probe::LineProbe;
use crate::game::types::ActorId;
use crate::game::world::World;

/// Bounded ordered item list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<ActorId>,
    capacity: usize,
}

impl Inventory {
    /// Empty inventory with room for `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[ActorId] {
        &self.items
    }

    /// Number of items held.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Maximum number of items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// No room left.
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Nothing held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ownership check used to validate item requests.
    pub fn contains(&self, item: ActorId) -> bool {
        self.items.contains(&item)
    }

    /// Append if there is room.
    pub fn push(&mut self, item: ActorId) -> GameResult<()> {
        if self.is_full() {
            return Err(GameError::ResourceExhausted(format!(
                "inventory full ({} items)",
                self.capacity
            )));
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove the first occurrence. Returns whether it was found.
    pub fn remove(&mut self, item: ActorId) -> bool {
        match self.items.iter().position(|i| *i == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empty the list, returning its former contents.
    pub fn take_all(&mut self) -> Vec<ActorId> {
        std::mem::take(&mut self.items)
    }

    /// Overwrite with replicated contents.
    pub fn set_items(&mut self, items: Vec<ActorId>) {
        self.items = items;
    }
}

// =============================================================================
// WORLD OPERATIONS
// =============================================================================

impl World {
    /// Collect a world pickup into `owner`'s inventory.
    ///
    /// `None` models a dangling reference and fails without side effects.
    pub fn add_item(&mut self, owner: ActorId, item: Option<ActorId>) -> GameResult<()> {
        let item = item.ok_or_else(|| GameError::InvalidRequest("no item".into()))?;
        let pickup = self.pickups.get(&item).ok_or_else(|| GameError::missing(item))?;
        if pickup.held {
            return Err(GameError::InvalidRequest(format!("{item} is already held")));
        }

        self.inventory_mut(owner)
            .ok_or_else(|| GameError::missing(owner))?
            .push(item)?;

        if let Some(pickup) = self.pickups.get_mut(&item) {
            pickup.held = true;
        }
        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::ItemAdded { owner, item },
        );
        Ok(())
    }

    /// Remove an item reference. Returns whether it was present.
    pub fn remove_item(&mut self, owner: ActorId, item: ActorId) -> GameResult<bool> {
        let inventory = self.inventory_mut(owner).ok_or_else(|| GameError::missing(owner))?;
        Ok(inventory.remove(item))
    }

    /// Does `owner` hold `item`?
    pub fn does_possess_item(&self, owner: ActorId, item: ActorId) -> bool {
        self.inventory(owner).map(|inv| inv.contains(item)).unwrap_or(false)
    }

    /// Find a floor point near `origin`, scattered by the configured offset.
    pub(crate) fn drop_location(&mut self, origin: Vec3, ignore: ActorId) -> Vec3 {
        let cfg = &self.config.inventory;
        let (lo, hi, depth) = (cfg.drop_offset_min, cfg.drop_offset_max, cfg.drop_probe_depth);

        let mut location = origin;
        location.x += self.rng.next_f32_range(lo, hi);
        location.y += self.rng.next_f32_range(lo, hi);
        let below = location - Vec3::new(0.0, 0.0, depth);

        let scene = self.scene();
        let hit = LineProbe::probe(&scene, location, below, Some(ignore));
        if hit.blocking_hit {
            hit.impact_point
        } else {
            location
        }
    }

    /// Put an item back in the world near its owner.
    pub fn drop_item(&mut self, owner: ActorId, item: ActorId) -> GameResult<Vec3> {
        if !self.does_possess_item(owner, item) {
            return Err(GameError::not_owner(owner, item));
        }
        let origin = self.actor_position(owner).ok_or_else(|| GameError::missing(owner))?;
        let location = self.drop_location(origin, owner);

        if let Some(pickup) = self.pickups.get_mut(&item) {
            pickup.position = location;
            pickup.held = false;
        }
        self.remove_item(owner, item)?;

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::ItemDropped { owner, item, location },
        );
        Ok(location)
    }

    /// Consume an item, applying its effect to `character`.
    ///
    /// A refused effect (stat already full) keeps the item.
    pub fn use_item(&mut self, character: ActorId, item: ActorId) -> GameResult<()> {
        if !self.does_possess_item(character, item) {
            return Err(GameError::not_owner(character, item));
        }
        let pickup = self.pickups.get(&item).ok_or_else(|| GameError::missing(item))?;
        let pickup_type = pickup.pickup_type;

        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        pickup.apply_to(&mut pawn.stats)?;
        pawn.inventory.remove(item);
        self.pickups.remove(&item);

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::ItemUsed { character, item, pickup_type },
        );
        self.push_event(
            EventPriority::Lifecycle,
            EventScope::All,
            GameEventData::ActorDestroyed { actor: item },
        );
        Ok(())
    }

    /// Move an item to another character's or container's inventory.
    ///
    /// The destination is checked for room before the source gives the item
    /// up, so a failed transfer leaves both sides unchanged.
    pub fn transfer_item(&mut self, owner: ActorId, item: ActorId, destination: ActorId) -> GameResult<()> {
        if !self.does_possess_item(owner, item) {
            return Err(GameError::not_owner(owner, item));
        }
        if owner == destination {
            return Err(GameError::InvalidRequest("transfer to self".into()));
        }
        if self.characters.get(&destination).map(|c| !c.is_alive()).unwrap_or(false) {
            return Err(GameError::InvalidRequest(format!("{destination} is dead")));
        }
        let target = self
            .inventory(destination)
            .ok_or_else(|| GameError::InvalidRequest(format!("{destination} has no inventory")))?;
        if target.is_full() {
            return Err(GameError::ResourceExhausted(format!("{destination} is full")));
        }

        self.remove_item(owner, item)?;
        self.inventory_mut(destination)
            .ok_or_else(|| GameError::missing(destination))?
            .push(item)?;

        self.push_event(
            EventPriority::Inventory,
            EventScope::All,
            GameEventData::ItemTransferred { item, from: owner, to: destination },
        );
        Ok(())
    }

    /// Drop every item `owner` holds.
    pub fn drop_all_inventory(&mut self, owner: ActorId) -> GameResult<Vec<ActorId>> {
        let items = self
            .inventory(owner)
            .ok_or_else(|| GameError::missing(owner))?
            .items()
            .to_vec();

        for item in &items {
            if let Err(e) = self.drop_item(owner, *item) {
                debug!(%owner, %item, error = %e, "Skipped item while emptying inventory");
            }
        }
        if let Some(inventory) = self.inventory_mut(owner) {
            inventory.take_all();
        }
        Ok(items)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::PickupType;
    use crate::game::rpc::ServerRpc;
    use crate::game::world::tests::test_world;

    #[test]
    fn test_add_remove_round_trip() {
        let mut inv = Inventory::new(4);
        inv.push(ActorId(7)).unwrap();
        let before = inv.clone();

        inv.push(ActorId(9)).unwrap();
        assert!(inv.remove(ActorId(9)));
        assert_eq!(inv, before);

        assert!(!inv.remove(ActorId(42)));
        assert_eq!(inv, before);
    }

    #[test]
    fn test_remove_first_match_only() {
        let mut inv = Inventory::new(4);
        inv.push(ActorId(1)).unwrap();
        inv.push(ActorId(2)).unwrap();
        inv.push(ActorId(1)).unwrap();

        assert!(inv.remove(ActorId(1)));
        assert_eq!(inv.items(), &[ActorId(2), ActorId(1)]);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut inv = Inventory::new(2);
        inv.push(ActorId(1)).unwrap();
        inv.push(ActorId(2)).unwrap();
        assert!(inv.is_full());
        assert!(matches!(inv.push(ActorId(3)), Err(GameError::ResourceExhausted(_))));
        assert_eq!(inv.count(), 2);
        assert_eq!(inv.capacity(), 2);
    }

    #[test]
    fn test_add_null_item_fails_cleanly() {
        let (mut world, player) = test_world();
        assert!(matches!(world.add_item(player, None), Err(GameError::InvalidRequest(_))));
        assert!(world.inventory(player).unwrap().is_empty());
    }

    #[test]
    fn test_add_marks_held() {
        let (mut world, player) = test_world();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::new(100.0, 0.0, 0.0));

        world.add_item(player, Some(food)).unwrap();
        assert!(world.pickups[&food].held);
        assert!(world.does_possess_item(player, food));

        // Held items cannot be collected twice
        assert!(world.add_item(player, Some(food)).is_err());
        assert_eq!(world.inventory(player).unwrap().count(), 1);
    }

    #[test]
    fn test_drop_relocates_to_floor() {
        let (mut world, player) = test_world();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        world.add_item(player, Some(food)).unwrap();

        let origin = world.actor_position(player).unwrap();
        let location = world.drop_item(player, food).unwrap();
        assert_eq!(location.z, 0.0);
        assert!(location.x >= origin.x - 50.0 && location.x < origin.x + 100.0);
        assert!(location.y >= origin.y - 50.0 && location.y < origin.y + 100.0);

        let pickup = &world.pickups[&food];
        assert!(!pickup.held);
        assert_eq!(pickup.position, location);
        assert!(!world.does_possess_item(player, food));
    }

    #[test]
    fn test_drop_without_floor_uses_offset_point() {
        let (mut world, player) = test_world();
        world.level.floor_z = None;
        let water = world.spawn_pickup(PickupType::Water, None, Vec3::ZERO);
        world.add_item(player, Some(water)).unwrap();

        let origin = world.actor_position(player).unwrap();
        let location = world.drop_item(player, water).unwrap();
        assert_eq!(location.z, origin.z);
    }

    #[test]
    fn test_drop_requires_possession() {
        let (mut world, player) = test_world();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        assert!(matches!(world.drop_item(player, food), Err(GameError::PermissionDenied(_))));
    }

    #[test]
    fn test_transfer_checks_destination_first() {
        let (mut world, player) = test_world();
        let chest = world.spawn_container(Vec3::new(200.0, 0.0, 0.0), Some(1));
        let filler = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        world.add_item(chest, Some(filler)).unwrap();

        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        world.add_item(player, Some(food)).unwrap();

        assert!(world.transfer_item(player, food, chest).is_err());
        assert!(world.does_possess_item(player, food));
        assert!(!world.does_possess_item(chest, food));
    }

    #[test]
    fn test_transfer_refuses_dead_character() {
        let (mut world, player) = test_world();
        let controller = world.add_controller();
        let other = world.post_login(controller).unwrap();
        world.die(other, None).unwrap();

        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        world.add_item(player, Some(food)).unwrap();
        let caller = world.controller_of(player).unwrap();

        assert!(!world.dispatch(caller, ServerRpc::TransferItem { item: food, destination: other }));
        assert!(world.transfer_item(player, food, other).is_err());
        assert!(world.does_possess_item(player, food));
        assert_eq!(world.inventory(other).map(|inv| inv.count()), Some(0));
    }

    #[test]
    fn test_destroyed_holder_releases_items() {
        let (mut world, player) = test_world();
        let chest = world.spawn_container(Vec3::new(200.0, 0.0, 0.0), None);
        let water = world.spawn_pickup(PickupType::Water, None, Vec3::ZERO);
        world.add_item(chest, Some(water)).unwrap();
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        world.add_item(player, Some(food)).unwrap();

        assert!(world.destroy_actor(chest));
        assert!(world.destroy_actor(player));

        let shelf = world.spawn_container(Vec3::new(-500.0, 0.0, 0.0), None);
        for item in [water, food] {
            assert!(!world.pickups[&item].held);
            world.add_item(shelf, Some(item)).unwrap();
        }
        assert_eq!(world.inventory(shelf).map(|inv| inv.count()), Some(2));
    }

    #[test]
    fn test_transfer_to_container() {
        let (mut world, player) = test_world();
        let chest = world.spawn_container(Vec3::new(200.0, 0.0, 0.0), None);
        let food = world.spawn_pickup(PickupType::Food, None, Vec3::ZERO);
        world.add_item(player, Some(food)).unwrap();

        world.transfer_item(player, food, chest).unwrap();
        assert!(world.does_possess_item(chest, food));
        assert!(!world.does_possess_item(player, food));
        assert!(world.pickups[&food].held);

        // Unknown destination
        assert!(world.transfer_item(chest, food, ActorId(9999)).is_err());
        assert!(world.does_possess_item(chest, food));
    }

    #[test]
    fn test_drop_all_inventory() {
        let (mut world, player) = test_world();
        let items: Vec<_> = (0..3)
            .map(|_| world.spawn_pickup(PickupType::Bandage, None, Vec3::ZERO))
            .collect();
        for item in &items {
            world.add_item(player, Some(*item)).unwrap();
        }

        let dropped = world.drop_all_inventory(player).unwrap();
        assert_eq!(dropped, items);
        assert!(world.inventory(player).unwrap().is_empty());
        assert!(items.iter().all(|i| !world.pickups[i].held));
    }
}
