use super::spatial_inventory::cells;
use crate::{
    grid::Slot,
    inventory::{
        events::InventoryChange, InventoryError, InventoryEvent, InventoryResult,
        SpatialInventory,
    },
    item::Item,
    types::ItemId,
};

pub(crate) struct SwapPlan {
    first: ItemId,
    first_to: Slot,
    second: ItemId,
    second_to: Slot,
}

impl SwapPlan {
    pub(super) fn new(first: ItemId, first_to: Slot, second: ItemId, second_to: Slot) -> Self {
        Self {
            first,
            first_to,
            second,
            second_to,
        }
    }
}

pub(crate) struct CrossSwapPlan {
    // lands in the other inventory
    first_to: Slot,
    // lands in this inventory
    second_to: Slot,
}

impl SpatialInventory {
    /// Exchanges the positions of two items. `first` lands on `second`'s
    /// origin. `second` lands on `first`'s origin, or when that placement
    /// fails for any reason, on the nearest free position to `first`'s
    /// vacated footprint. The fallback covers overlapping `first`'s new
    /// slot as well as running off the grid or into a third item.
    pub fn swap(&mut self, first: &ItemId, second: &ItemId) -> InventoryResult<()> {
        self.ensure_authority()?;
        if first == second {
            self.entry(first)?;
            return Ok(());
        }
        let plan = self.plan_swap(first, second)?;
        self.apply_swap(plan);
        Ok(())
    }

    pub(crate) fn plan_swap(&self, first: &ItemId, second: &ItemId) -> InventoryResult<SwapPlan> {
        let a = self.entry(first)?;
        let b = self.entry(second)?;
        if first == second {
            return Err(InventoryError::Collision);
        }
        let exclude = [*first, *second];

        let first_to = a.slot.moved_to(b.slot.x, b.slot.y);
        self.check_placement(a.item.as_ref(), first_to, &exclude)?;

        let direct = b.slot.moved_to(a.slot.x, a.slot.y);
        let second_to =
            self.place_or_search(b.item.as_ref(), direct, a.slot, Some(first_to), &exclude)?;

        Ok(SwapPlan {
            first: *first,
            first_to,
            second: *second,
            second_to,
        })
    }

    pub(crate) fn apply_swap(&mut self, plan: SwapPlan) {
        let (Some(first_from), Some(second_from)) =
            (self.slot_of(&plan.first), self.slot_of(&plan.second))
        else {
            return;
        };
        // free both before filling either, the targets may cover the sources
        let (x, y, w, h) = cells(first_from);
        self.occupancy.clear(x, y, w, h);
        let (x, y, w, h) = cells(second_from);
        self.occupancy.clear(x, y, w, h);
        for (id, to) in [(plan.first, plan.first_to), (plan.second, plan.second_to)] {
            let (x, y, w, h) = cells(to);
            self.occupancy.fill(x, y, w, h);
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.slot = to;
            }
        }

        self.emit(InventoryEvent::ItemsSwapped {
            first: plan.first,
            first_slot: plan.first_to,
            second: plan.second,
            second_slot: plan.second_to,
        });
        self.record(InventoryChange::Swapped {
            first: plan.first,
            first_at: (plan.first_to.x, plan.first_to.y),
            second: plan.second,
            second_at: (plan.second_to.x, plan.second_to.y),
        });
    }

    /// Exchanges `first` in this inventory with `second` in `other`. Each
    /// item takes the other's origin. Whenever that placement is rejected,
    /// whether by bounds, another item, the slot mode or a rule, it falls
    /// back to a search around the vacated footprint in the receiving
    /// inventory.
    pub fn swap_between(
        &mut self,
        first: &ItemId,
        other: &mut SpatialInventory,
        second: &ItemId,
    ) -> InventoryResult<()> {
        self.ensure_authority()?;
        other.ensure_authority()?;
        let plan = self.plan_swap_between(first, other, second)?;

        let Some(a) = self.detach(first) else {
            return Err(InventoryError::NotPresent);
        };
        let Some(b) = other.detach(second) else {
            self.attach(a.item, a.slot);
            return Err(InventoryError::NotPresent);
        };

        self.emit(InventoryEvent::ItemRemoved {
            item: *first,
            slot: a.slot,
        });
        self.record(InventoryChange::Removed(*first));
        other.emit(InventoryEvent::ItemRemoved {
            item: *second,
            slot: b.slot,
        });
        other.record(InventoryChange::Removed(*second));

        other.apply_add_in_slot(a.item, plan.first_to);
        self.apply_add_in_slot(b.item, plan.second_to);
        Ok(())
    }

    pub(crate) fn plan_swap_between(
        &self,
        first: &ItemId,
        other: &SpatialInventory,
        second: &ItemId,
    ) -> InventoryResult<CrossSwapPlan> {
        let a = self.entry(first)?;
        let b = other.entry(second)?;
        let a_item = a.item.as_ref();
        let b_item = b.item.as_ref();

        if other.contains(first) || self.contains(second) {
            return Err(InventoryError::AlreadyPresent);
        }
        if !self.rules.can_transfer_out(self, a_item, other)
            || !other.rules.can_transfer_out(other, b_item, self)
        {
            return Err(InventoryError::TransferNotAllowed);
        }
        if !other.rules.can_receive(other, a_item, self)
            || !self.rules.can_receive(self, b_item, other)
        {
            return Err(InventoryError::ReceiveNotAllowed);
        }
        if !other.rules.can_insert(other, a_item) || !self.rules.can_insert(self, b_item) {
            return Err(InventoryError::InsertNotAllowed);
        }

        let (width, height) = other.effective_size(a_item);
        let direct = Slot::new(b.slot.x, b.slot.y, width, height);
        let first_to = other.place_or_search(a_item, direct, b.slot, None, &[*second])?;

        let (width, height) = self.effective_size(b_item);
        let direct = Slot::new(a.slot.x, a.slot.y, width, height);
        let second_to = self.place_or_search(b_item, direct, a.slot, None, &[*first])?;

        Ok(CrossSwapPlan {
            first_to,
            second_to,
        })
    }

    // Uses `direct` when it is valid, otherwise searches outward from
    // `vacated` whatever the reason `direct` was rejected. The direct failure
    // is reported when the search finds nothing.
    fn place_or_search(
        &self,
        item: &dyn Item,
        direct: Slot,
        vacated: Slot,
        taken: Option<Slot>,
        exclude: &[ItemId],
    ) -> InventoryResult<Slot> {
        let direct_result = match taken {
            Some(taken) if taken.overlaps(&direct) => Err(InventoryError::Collision),
            _ => self.check_placement(item, direct, exclude),
        };
        let Err(error) = direct_result else {
            return Ok(direct);
        };
        self.search_vacated(item, direct.size(), vacated, taken, exclude)
            .ok_or(error)
    }

    /// Candidate origins are scanned row-major inside `vacated` first, then
    /// in rings widening one cell at a time until the whole grid is covered.
    /// Candidates overlapping `taken` or any item outside `exclude` are
    /// skipped.
    pub(crate) fn search_vacated(
        &self,
        item: &dyn Item,
        size: (i32, i32),
        vacated: Slot,
        taken: Option<Slot>,
        exclude: &[ItemId],
    ) -> Option<Slot> {
        let (width, height) = size;
        let accept = |x: i32, y: i32| -> Option<Slot> {
            let candidate = Slot::new(x, y, width, height);
            if taken.is_some_and(|taken| taken.overlaps(&candidate)) {
                return None;
            }
            self.check_placement(item, candidate, exclude)
                .ok()
                .map(|_| candidate)
        };

        for y in vacated.y..vacated.bottom() {
            for x in vacated.x..vacated.right() {
                if let Some(slot) = accept(x, y) {
                    return Some(slot);
                }
            }
        }

        let max_radius = self.width.max(self.height);
        for radius in 1..=max_radius {
            let left = vacated.x - radius;
            let right = vacated.right() - 1 + radius;
            let top = vacated.y - radius;
            let bottom = vacated.bottom() - 1 + radius;
            for y in top.max(0)..=bottom.min(self.height - 1) {
                for x in left.max(0)..=right.min(self.width - 1) {
                    let on_ring = x == left || x == right || y == top || y == bottom;
                    if !on_ring {
                        continue;
                    }
                    if let Some(slot) = accept(x, y) {
                        return Some(slot);
                    }
                }
            }
        }

        None
    }
}
