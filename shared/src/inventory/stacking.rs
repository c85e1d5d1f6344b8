use log::debug;

use crate::{
    grid::Slot,
    inventory::{
        spatial_inventory::JournalMark, AddError, AddOutcome, InventoryError, InventoryResult,
        SpatialInventory,
    },
    item::{Item, PendingMarks},
    types::ItemId,
};

// What a failed take-and-place needs to put the source back as it was
struct TakeRollback {
    slot: Slot,
    marks: PendingMarks,
    journal: JournalMark,
}

impl SpatialInventory {
    /// Splits `amount` units off `item`. Taking the whole stack removes the
    /// item and returns the original instance, otherwise a new unplaced
    /// instance is cloned from it.
    pub fn take(&mut self, item: &ItemId, amount: u32) -> InventoryResult<Box<dyn Item>> {
        self.ensure_authority()?;
        let entry = self.entry(item)?;
        if amount == 0 {
            return Err(InventoryError::AmountMustBePositive);
        }
        let count = entry.item.core().stack_count();
        if amount > count {
            return Err(InventoryError::AmountExceedsStack);
        }
        if amount == count {
            if !self.rules.can_remove(self, entry.item.as_ref()) {
                return Err(InventoryError::RemoveNotAllowed);
            }
            return self.remove_committed(item);
        }
        if !entry.item.core().is_stackable() {
            return Err(InventoryError::NotStackable);
        }

        let taken = entry.item.split_clone(entry.item.core().split(amount));
        self.shrink_stack(item, amount);
        Ok(taken)
    }

    /// Takes `amount` units and places them at `(x, y)` in this inventory
    pub fn take_and_place(
        &mut self,
        item: &ItemId,
        amount: u32,
        x: i32,
        y: i32,
    ) -> InventoryResult<ItemId> {
        self.ensure_authority()?;
        let rollback = self.take_rollback(item)?;
        let taken = self.take(item, amount)?;
        match self.add_at(taken, x, y) {
            Ok(placed) => Ok(placed),
            Err(AddError { error, item: taken }) => {
                self.restore_taken(item, taken, rollback);
                Err(error)
            }
        }
    }

    /// Takes `amount` units and adds them to `destination`
    pub fn take_and_transfer_to(
        &mut self,
        item: &ItemId,
        amount: u32,
        destination: &mut SpatialInventory,
    ) -> InventoryResult<AddOutcome> {
        self.ensure_authority()?;
        destination.ensure_authority()?;
        self.check_transfer(item, destination)?;
        let rollback = self.take_rollback(item)?;
        let taken = self.take(item, amount)?;
        match destination.add(taken) {
            Ok(outcome) => Ok(outcome),
            Err(AddError { error, item: taken }) => {
                self.restore_taken(item, taken, rollback);
                Err(error)
            }
        }
    }

    /// Takes `amount` units and places them at `(x, y)` in `destination`
    pub fn take_and_transfer_to_at(
        &mut self,
        item: &ItemId,
        amount: u32,
        destination: &mut SpatialInventory,
        x: i32,
        y: i32,
    ) -> InventoryResult<ItemId> {
        self.ensure_authority()?;
        destination.ensure_authority()?;
        self.check_transfer(item, destination)?;
        let rollback = self.take_rollback(item)?;
        let taken = self.take(item, amount)?;
        match destination.add_at(taken, x, y) {
            Ok(placed) => Ok(placed),
            Err(AddError { error, item: taken }) => {
                self.restore_taken(item, taken, rollback);
                Err(error)
            }
        }
    }

    fn take_rollback(&self, item: &ItemId) -> InventoryResult<TakeRollback> {
        let entry = self.entry(item)?;
        Ok(TakeRollback {
            slot: entry.slot,
            marks: entry.item.core().mutator().pending(),
            journal: self.mark(),
        })
    }

    // Puts taken units back: into the original stack if it is still here,
    // otherwise the taken instance is the original and returns to its slot.
    // Either way the original ends up with the marks it had before the take.
    fn restore_taken(&mut self, original: &ItemId, taken: Box<dyn Item>, rollback: TakeRollback) {
        let amount = taken.core().stack_count();
        if let Some(entry) = self.entries.get_mut(original) {
            let count = entry.item.core().stack_count() + amount;
            entry.item.core_mut().mirror_stack_count(count);
        } else {
            debug!("returning {} to {}", taken.id(), self.id);
            self.attach(taken, rollback.slot);
        }
        if let Some(entry) = self.entries.get(original) {
            entry.item.core().mutator().restore(rollback.marks);
        }
        self.rollback_journal(rollback.journal);
    }

    // Combine

    /// Moves units from `source` into `destination`. An `amount` of 0 moves
    /// as many as fit. A drained source is removed. Returns the units moved.
    pub fn combine_stacks(
        &mut self,
        source: &ItemId,
        destination: &ItemId,
        amount: u32,
    ) -> InventoryResult<u32> {
        self.ensure_authority()?;
        let moved = self.plan_combine(source, destination, amount)?;
        self.grow_stack(destination, moved);
        self.shrink_stack(source, moved);
        Ok(moved)
    }

    pub(crate) fn plan_combine(
        &self,
        source: &ItemId,
        destination: &ItemId,
        amount: u32,
    ) -> InventoryResult<u32> {
        if source.is_nil() || destination.is_nil() {
            return Err(InventoryError::NullItem);
        }
        if source == destination {
            return Err(InventoryError::CannotCombineWithSelf);
        }
        let from = self.entry(source)?.item.as_ref();
        let into = self.entry(destination)?.item.as_ref();
        self.stack_amount(into, from, amount)
    }

    /// Moves units from `source` in this inventory into `destination` in
    /// `other`
    pub fn combine_stacks_between(
        &mut self,
        source: &ItemId,
        other: &mut SpatialInventory,
        destination: &ItemId,
        amount: u32,
    ) -> InventoryResult<u32> {
        self.ensure_authority()?;
        other.ensure_authority()?;
        let moved = self.plan_combine_between(source, other, destination, amount)?;
        other.grow_stack(destination, moved);
        self.shrink_stack(source, moved);
        Ok(moved)
    }

    pub(crate) fn plan_combine_between(
        &self,
        source: &ItemId,
        other: &SpatialInventory,
        destination: &ItemId,
        amount: u32,
    ) -> InventoryResult<u32> {
        if source.is_nil() || destination.is_nil() {
            return Err(InventoryError::NullItem);
        }
        if source == destination {
            return Err(InventoryError::CannotCombineWithSelf);
        }
        let (Some(from), Some(into)) = (self.item(source), other.item(destination)) else {
            return Err(InventoryError::BothItemsMustBeResident);
        };
        if !self.rules.can_transfer_out(self, from, other) {
            return Err(InventoryError::TransferNotAllowed);
        }
        if !other.rules.can_receive(other, from, self) {
            return Err(InventoryError::ReceiveNotAllowed);
        }
        other.stack_amount(into, from, amount)
    }

    // Units that may move from `from` into `into` under this inventory's rules
    fn stack_amount(&self, into: &dyn Item, from: &dyn Item, amount: u32) -> InventoryResult<u32> {
        if !into.core().is_stackable() || !from.core().is_stackable() {
            return Err(InventoryError::NotStackable);
        }
        if !self.rules.can_stack(self, into, from) {
            return Err(InventoryError::StackingNotAllowed);
        }
        let free = into.core().free_capacity();
        if free == 0 {
            return Err(InventoryError::DestinationStackFull);
        }
        let requested = if amount == 0 { u32::MAX } else { amount };
        Ok(requested.min(from.core().stack_count()).min(free))
    }

    /// Drains under-full stacks into compatible, partially filled stacks that
    /// come earlier in reading order. Returns the units moved.
    pub fn consolidate_stacks(&mut self) -> InventoryResult<u32> {
        self.ensure_authority()?;
        let ids = self.ordered_ids();
        let mut total = 0;
        for (index, destination) in ids.iter().enumerate() {
            for source in &ids[index + 1..] {
                let Some(amount) = self.consolidation_amount(destination, source) else {
                    continue;
                };
                self.grow_stack(destination, amount);
                self.shrink_stack(source, amount);
                total += amount;
            }
        }
        Ok(total)
    }

    fn consolidation_amount(&self, destination: &ItemId, source: &ItemId) -> Option<u32> {
        let into = self.item(destination)?;
        let from = self.item(source)?;
        if from.core().free_capacity() == 0 || !self.can_merge(into, from) {
            return None;
        }
        Some(from.core().stack_count().min(into.core().free_capacity()))
    }
}
