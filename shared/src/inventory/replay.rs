use std::collections::BTreeMap;

use log::warn;

use gridvault_serde::{BitReader, Serde};

use crate::{
    grid::Slot,
    inventory::{swap::SwapPlan, InventoryEvent, SpatialInventory},
    item::{Item, STACK_COUNT_PROPERTY},
    types::ItemId,
};

// Host changes applied to a mirror. The host already validated them, so no
// rule is consulted. Anything that does not fit the local state is logged
// and skipped.
impl SpatialInventory {
    pub(crate) fn replay_added(&mut self, item: Box<dyn Item>, slot: Slot) {
        self.with_bypass(|inventory| inventory.mirror_add(item, slot));
    }

    pub(crate) fn replay_removed(&mut self, item: &ItemId) {
        self.with_bypass(|inventory| {
            if inventory.remove_committed(item).is_err() {
                warn!("{} has no {} to remove", inventory.id, item);
            }
        });
    }

    pub(crate) fn replay_moved(&mut self, item: &ItemId, x: i32, y: i32) {
        self.with_bypass(|inventory| {
            let Some(slot) = inventory.slot_of(item) else {
                warn!("{} has no {} to move", inventory.id, item);
                return;
            };
            let target = slot.moved_to(x, y);
            if !target.fits_within(inventory.width, inventory.height)
                || !inventory.region_free(target, &[*item])
            {
                warn!("{} cannot mirror move of {} to {:?}", inventory.id, item, target);
                return;
            }
            inventory.apply_move(item, target);
        });
    }

    pub(crate) fn replay_swapped(
        &mut self,
        first: &ItemId,
        first_at: (i32, i32),
        second: &ItemId,
        second_at: (i32, i32),
    ) {
        self.with_bypass(|inventory| {
            let (Some(first_slot), Some(second_slot)) =
                (inventory.slot_of(first), inventory.slot_of(second))
            else {
                warn!("{} is missing {} or {} for a swap", inventory.id, first, second);
                return;
            };
            let first_to = first_slot.moved_to(first_at.0, first_at.1);
            let second_to = second_slot.moved_to(second_at.0, second_at.1);
            let exclude = [*first, *second];
            let valid = first_to.fits_within(inventory.width, inventory.height)
                && second_to.fits_within(inventory.width, inventory.height)
                && !first_to.overlaps(&second_to)
                && inventory.region_free(first_to, &exclude)
                && inventory.region_free(second_to, &exclude);
            if !valid {
                warn!("{} cannot mirror swap of {} and {}", inventory.id, first, second);
                return;
            }
            inventory.apply_swap(SwapPlan::new(*first, first_to, *second, second_to));
        });
    }

    pub(crate) fn replay_cleared(&mut self) {
        self.with_bypass(|inventory| {
            inventory.clear_committed();
        });
    }

    /// Replaces every entry with the given ones
    pub(crate) fn replay_snapshot(&mut self, entries: Vec<(Box<dyn Item>, Slot)>) {
        self.with_bypass(|inventory| {
            inventory.clear_committed();
            for (item, slot) in entries {
                inventory.mirror_add(item, slot);
            }
        });
    }

    pub(crate) fn replay_item_data(&mut self, item: &ItemId, properties: &BTreeMap<String, Vec<u8>>) {
        let Some(entry) = self.entries.get_mut(item) else {
            warn!("{} has no {} to update", self.id, item);
            return;
        };

        let mut count_change = None;
        for (name, bytes) in properties {
            if name == STACK_COUNT_PROPERTY {
                match u32::de(&mut BitReader::new(bytes)) {
                    Ok(count) if count > 0 => {
                        entry.item.core_mut().mirror_stack_count(count);
                        count_change = Some(entry.item.core().stack_count());
                    }
                    _ => warn!("ignoring invalid stack count for {}", item),
                }
                continue;
            }
            if let Err(error) = entry.item.set_property_bytes(name, bytes) {
                warn!("could not apply `{}` to {}: {}", name, item, error);
            }
        }

        if let Some(count) = count_change {
            self.emit(InventoryEvent::StackChanged { item: *item, count });
        }
    }

    fn mirror_add(&mut self, item: Box<dyn Item>, slot: Slot) {
        let id = item.id();
        if self.detach(&id).is_some() {
            warn!("{} already held {}, replacing it", self.id, id);
        }
        if !slot.fits_within(self.width, self.height) || !self.region_free(slot, &[]) {
            warn!("{} cannot mirror {} at {:?}", self.id, id, slot);
            return;
        }
        self.attach(item, slot);
        self.emit(InventoryEvent::ItemAdded { item: id, slot });
    }
}
