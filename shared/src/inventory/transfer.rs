use crate::{
    grid::Slot,
    inventory::{AddOutcome, AddPlan, InventoryError, InventoryResult, SpatialInventory},
    item::Item,
    types::ItemId,
};

/// What `move_or_swap` and `transfer_or_swap_at` ended up doing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOrSwapOutcome {
    Moved,
    /// Units merged into the stack already at the target
    Merged(u32),
    /// Swapped with the item that occupied the target
    Swapped(ItemId),
}

enum TargetCells {
    Empty,
    Merge(ItemId),
    Swap(ItemId),
}

impl SpatialInventory {
    /// Moves `item` into `destination`, merging into compatible stacks there
    /// first like `add` does
    pub fn transfer_to(
        &mut self,
        item: &ItemId,
        destination: &mut SpatialInventory,
    ) -> InventoryResult<AddOutcome> {
        self.ensure_authority()?;
        destination.ensure_authority()?;
        let plan = self.plan_transfer(item, destination)?;
        let moving = self.remove_committed(item)?;
        Ok(destination.apply_add(moving, plan))
    }

    /// Moves `item` into `destination` at exactly `(x, y)`
    pub fn transfer_to_at(
        &mut self,
        item: &ItemId,
        destination: &mut SpatialInventory,
        x: i32,
        y: i32,
    ) -> InventoryResult<()> {
        self.ensure_authority()?;
        destination.ensure_authority()?;
        let slot = self.plan_transfer_at(item, destination, x, y)?;
        let moving = self.remove_committed(item)?;
        destination.apply_add_in_slot(moving, slot);
        Ok(())
    }

    pub(crate) fn plan_transfer(
        &self,
        item: &ItemId,
        destination: &SpatialInventory,
    ) -> InventoryResult<AddPlan> {
        let moving = self.check_transfer(item, destination)?;
        destination.plan_add(moving)
    }

    pub(crate) fn plan_transfer_at(
        &self,
        item: &ItemId,
        destination: &SpatialInventory,
        x: i32,
        y: i32,
    ) -> InventoryResult<Slot> {
        let moving = self.check_transfer(item, destination)?;
        let (width, height) = destination.effective_size(moving);
        let slot = Slot::new(x, y, width, height);
        destination.plan_add_in_slot(moving, slot)?;
        Ok(slot)
    }

    pub(super) fn check_transfer(
        &self,
        item: &ItemId,
        destination: &SpatialInventory,
    ) -> InventoryResult<&dyn Item> {
        let moving = self.entry(item)?.item.as_ref();
        if !self.rules.can_transfer_out(self, moving, destination) {
            return Err(InventoryError::TransferNotAllowed);
        }
        if !destination.rules.can_receive(destination, moving, self) {
            return Err(InventoryError::ReceiveNotAllowed);
        }
        Ok(moving)
    }

    // Move or swap

    /// Moves `item` to `(x, y)` when the target cells are empty. A single
    /// stack-compatible occupant with room absorbs the item instead, and any
    /// other single occupant is swapped with it.
    pub fn move_or_swap(&mut self, item: &ItemId, x: i32, y: i32) -> InventoryResult<MoveOrSwapOutcome> {
        self.ensure_authority()?;
        match self.classify_move(item, x, y)? {
            TargetCells::Empty => {
                self.move_item(item, x, y)?;
                Ok(MoveOrSwapOutcome::Moved)
            }
            TargetCells::Merge(occupant) => {
                let moved = self.combine_stacks(item, &occupant, 0)?;
                Ok(MoveOrSwapOutcome::Merged(moved))
            }
            TargetCells::Swap(occupant) => {
                self.swap(item, &occupant)?;
                Ok(MoveOrSwapOutcome::Swapped(occupant))
            }
        }
    }

    pub fn can_move_or_swap(&self, item: &ItemId, x: i32, y: i32) -> bool {
        match self.classify_move(item, x, y) {
            Ok(TargetCells::Empty) => self.plan_move(item, x, y).is_ok(),
            Ok(TargetCells::Merge(occupant)) => self.plan_combine(item, &occupant, 0).is_ok(),
            Ok(TargetCells::Swap(occupant)) => self.plan_swap(item, &occupant).is_ok(),
            Err(_) => false,
        }
    }

    fn classify_move(&self, item: &ItemId, x: i32, y: i32) -> InventoryResult<TargetCells> {
        let entry = self.entry(item)?;
        let target = entry.slot.moved_to(x, y);
        self.check_bounds(target)?;
        let occupants: Vec<ItemId> = self
            .items_overlapping(target)
            .into_iter()
            .filter(|occupant| occupant != item)
            .collect();
        self.classify_occupants(entry.item.as_ref(), &occupants)
    }

    /// Cross-inventory counterpart of `move_or_swap`
    pub fn transfer_or_swap_at(
        &mut self,
        item: &ItemId,
        destination: &mut SpatialInventory,
        x: i32,
        y: i32,
    ) -> InventoryResult<MoveOrSwapOutcome> {
        self.ensure_authority()?;
        destination.ensure_authority()?;
        match self.classify_transfer(item, destination, x, y)? {
            TargetCells::Empty => {
                self.transfer_to_at(item, destination, x, y)?;
                Ok(MoveOrSwapOutcome::Moved)
            }
            TargetCells::Merge(occupant) => {
                let moved = self.combine_stacks_between(item, destination, &occupant, 0)?;
                Ok(MoveOrSwapOutcome::Merged(moved))
            }
            TargetCells::Swap(occupant) => {
                self.swap_between(item, destination, &occupant)?;
                Ok(MoveOrSwapOutcome::Swapped(occupant))
            }
        }
    }

    pub fn can_transfer_or_swap_to(
        &self,
        item: &ItemId,
        destination: &SpatialInventory,
        x: i32,
        y: i32,
    ) -> bool {
        match self.classify_transfer(item, destination, x, y) {
            Ok(TargetCells::Empty) => self.plan_transfer_at(item, destination, x, y).is_ok(),
            Ok(TargetCells::Merge(occupant)) => self
                .plan_combine_between(item, destination, &occupant, 0)
                .is_ok(),
            Ok(TargetCells::Swap(occupant)) => self
                .plan_swap_between(item, destination, &occupant)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn classify_transfer(
        &self,
        item: &ItemId,
        destination: &SpatialInventory,
        x: i32,
        y: i32,
    ) -> InventoryResult<TargetCells> {
        let moving = self.entry(item)?.item.as_ref();
        let (width, height) = destination.effective_size(moving);
        let target = Slot::new(x, y, width, height);
        destination.check_bounds(target)?;
        let occupants = destination.items_overlapping(target);
        destination.classify_occupants(moving, &occupants)
    }

    fn classify_occupants(&self, moving: &dyn Item, occupants: &[ItemId]) -> InventoryResult<TargetCells> {
        match occupants {
            [] => Ok(TargetCells::Empty),
            [occupant] => {
                let Some(resident) = self.item(occupant) else {
                    return Err(InventoryError::NotPresent);
                };
                if self.can_merge(resident, moving) {
                    Ok(TargetCells::Merge(*occupant))
                } else {
                    Ok(TargetCells::Swap(*occupant))
                }
            }
            _ => Err(InventoryError::Collision),
        }
    }

    pub(super) fn can_merge(&self, destination: &dyn Item, source: &dyn Item) -> bool {
        destination.core().is_stackable()
            && source.core().is_stackable()
            && destination.core().free_capacity() > 0
            && self.rules.can_stack(self, destination, source)
    }
}
