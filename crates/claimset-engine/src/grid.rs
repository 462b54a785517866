//! The slot/item bijection and the item pool.
//!
//! [`GridState`] is plain data with no synchronization of its own; the
//! [`SharedGrid`](crate::table::SharedGrid) wraps it in the grid lock.
//! Every item is in exactly one of three places: on the grid, in the
//! pool, or retired. Retired items never come back.

use claimset_core::{GridError, ItemId, SlotId};
use indexmap::IndexSet;
use rand::Rng;

/// Grid contents, pool, and retired items.
///
/// # Invariant
///
/// `slot_to_item[s] == Some(i)` iff `item_to_slot[i] == Some(s)`, and an
/// item with a slot is neither pooled nor retired.
#[derive(Clone, Debug)]
pub struct GridState {
    slot_to_item: Vec<Option<ItemId>>,
    item_to_slot: Vec<Option<SlotId>>,
    pool: IndexSet<ItemId>,
    retired: Vec<ItemId>,
}

impl GridState {
    /// An empty grid of `slots` slots with every item of `0..pool_size`
    /// in the pool.
    pub fn new(slots: u32, pool_size: u32) -> Self {
        Self {
            slot_to_item: vec![None; slots as usize],
            item_to_slot: vec![None; pool_size as usize],
            pool: (0..pool_size).map(ItemId).collect(),
            retired: Vec::new(),
        }
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slot_to_item.len()
    }

    /// The item in `slot`, if any. Out-of-range slots hold nothing.
    pub fn item_at(&self, slot: SlotId) -> Option<ItemId> {
        self.slot_to_item.get(slot.index()).copied().flatten()
    }

    /// The slot holding `item`, if it is on the grid.
    pub fn slot_of(&self, item: ItemId) -> Option<SlotId> {
        self.item_to_slot.get(item.index()).copied().flatten()
    }

    /// Place a pooled `item` into the empty `slot`.
    pub fn place(&mut self, item: ItemId, slot: SlotId) -> Result<(), GridError> {
        self.check_placement(item, slot)?;
        if !self.pool.swap_remove(&item) {
            return Err(GridError::ItemUnavailable { item });
        }
        self.put(item, slot);
        Ok(())
    }

    /// Place an item previously taken out with [`draw`](Self::draw) or
    /// [`take`](Self::take) into the empty `slot`.
    pub fn place_drawn(&mut self, item: ItemId, slot: SlotId) -> Result<(), GridError> {
        self.check_placement(item, slot)?;
        if self.pool.contains(&item)
            || self.item_to_slot[item.index()].is_some()
            || self.retired.contains(&item)
        {
            return Err(GridError::ItemUnavailable { item });
        }
        self.put(item, slot);
        Ok(())
    }

    fn check_placement(&self, item: ItemId, slot: SlotId) -> Result<(), GridError> {
        self.check_slot(slot)?;
        if item.index() >= self.item_to_slot.len() {
            return Err(GridError::ItemOutOfRange { item });
        }
        if let Some(occupant) = self.slot_to_item[slot.index()] {
            return Err(GridError::SlotOccupied { slot, occupant });
        }
        Ok(())
    }

    fn put(&mut self, item: ItemId, slot: SlotId) {
        self.slot_to_item[slot.index()] = Some(item);
        self.item_to_slot[item.index()] = Some(slot);
    }

    /// Empty `slot`, returning its item to the pool or retiring it.
    pub fn remove(&mut self, slot: SlotId, retire: bool) -> Result<ItemId, GridError> {
        self.check_slot(slot)?;
        let item = self.slot_to_item[slot.index()]
            .take()
            .ok_or(GridError::SlotEmpty { slot })?;
        self.item_to_slot[item.index()] = None;
        if retire {
            self.retired.push(item);
        } else {
            self.pool.insert(item);
        }
        Ok(item)
    }

    /// Take one item out of the pool, uniformly at random.
    ///
    /// Returns `None` when the pool is exhausted.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ItemId> {
        if self.pool.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.pool.len());
        self.pool.swap_remove_index(index)
    }

    /// Take a specific item out of the pool. Returns `false` if it was
    /// not pooled.
    pub fn take(&mut self, item: ItemId) -> bool {
        self.pool.swap_remove(&item)
    }

    /// Put a drawn but unplaced item back into the pool.
    pub fn restore(&mut self, item: ItemId) {
        debug_assert!(self.slot_of(item).is_none(), "restoring an item on the grid");
        self.pool.insert(item);
    }

    /// Occupied slots with their items, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (SlotId, ItemId)> + '_ {
        self.slot_to_item
            .iter()
            .enumerate()
            .filter_map(|(s, item)| item.map(|i| (SlotId(s as u32), i)))
    }

    /// Empty slots, in slot order.
    pub fn empty_slots(&self) -> Vec<SlotId> {
        self.slot_to_item
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_none())
            .map(|(s, _)| SlotId(s as u32))
            .collect()
    }

    /// Items currently on the grid, in slot order.
    pub fn items_on_grid(&self) -> Vec<ItemId> {
        self.occupied().map(|(_, item)| item).collect()
    }

    /// Number of occupied slots.
    pub fn item_count(&self) -> usize {
        self.slot_to_item.iter().filter(|s| s.is_some()).count()
    }

    /// Pooled items, in pool order.
    pub fn pool(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.pool.iter().copied()
    }

    /// Number of pooled items.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Whether `item` is in the pool.
    pub fn is_pooled(&self, item: ItemId) -> bool {
        self.pool.contains(&item)
    }

    /// Items retired so far, in retirement order.
    pub fn retired(&self) -> &[ItemId] {
        &self.retired
    }

    /// Grid items followed by pooled items: every item still in play.
    pub fn items_in_play(&self) -> Vec<ItemId> {
        let mut items = self.items_on_grid();
        items.extend(self.pool());
        items
    }

    /// Verify the bijection and item conservation.
    ///
    /// Only meaningful at quiescent points: an item between `draw` and
    /// `place_drawn` is counted nowhere.
    pub fn is_consistent(&self) -> bool {
        let forward = self.occupied().all(|(s, i)| self.slot_of(i) == Some(s));
        let backward = self
            .item_to_slot
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|s| (ItemId(i as u32), s)))
            .all(|(i, s)| self.item_at(s) == Some(i) && !self.pool.contains(&i));
        let conserved =
            self.item_count() + self.pool.len() + self.retired.len() == self.item_to_slot.len();
        forward && backward && conserved
    }

    fn check_slot(&self, slot: SlotId) -> Result<(), GridError> {
        if slot.index() >= self.slot_to_item.len() {
            return Err(GridError::SlotOutOfRange { slot });
        }
        Ok(())
    }
}
