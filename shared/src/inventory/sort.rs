use std::cmp::Reverse;

use crate::{
    grid::{GridOccupancyIndex, Slot},
    inventory::{
        spatial_inventory::cells, InventoryError, InventoryEvent,
        InventoryResult, SpatialInventory,
    },
    types::ItemId,
};

impl SpatialInventory {
    /// Re-packs every item, largest first, each at the first free position.
    /// Nothing changes unless every item finds a place.
    pub fn auto_sort(&mut self) -> InventoryResult<()> {
        self.ensure_authority()?;
        let placements = self.plan_sort()?;

        let mut occupancy = GridOccupancyIndex::new(self.occupancy.width(), self.occupancy.height());
        for (id, to) in placements {
            let (x, y, w, h) = cells(to);
            occupancy.fill(x, y, w, h);
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            let from = entry.slot;
            entry.slot = to;
            if from != to {
                self.emit(InventoryEvent::ItemMoved { item: id, from, to });
            }
        }
        self.occupancy = occupancy;
        self.record_snapshot();
        Ok(())
    }

    fn plan_sort(&self) -> InventoryResult<Vec<(ItemId, Slot)>> {
        // stable sort over reading order keeps ties deterministic
        let mut order: Vec<(ItemId, Slot)> = self.items();
        order.sort_by_key(|(_, slot)| {
            (
                Reverse(slot.area()),
                Reverse(slot.width.max(slot.height)),
            )
        });

        for (id, _) in &order {
            let Some(item) = self.item(id) else {
                return Err(InventoryError::NotPresent);
            };
            if !self.rules.can_insert(self, item) {
                return Err(InventoryError::InsertNotAllowed);
            }
        }

        let mut scratch = GridOccupancyIndex::new(self.occupancy.width(), self.occupancy.height());
        let mut placements = Vec::with_capacity(order.len());
        for (id, current) in order {
            let Some(item) = self.item(&id) else {
                return Err(InventoryError::NotPresent);
            };
            let (width, height) = current.size();
            let mut found = None;
            'search: for y in 0..=self.height - height {
                for x in 0..=self.width - width {
                    let slot = Slot::new(x, y, width, height);
                    let (cx, cy, cw, ch) = cells(slot);
                    if scratch.is_free(cx, cy, cw, ch) && self.rules.can_place_at(self, item, slot) {
                        found = Some(slot);
                        break 'search;
                    }
                }
            }
            let Some(slot) = found else {
                return Err(InventoryError::NoSpaceAvailable);
            };
            let (x, y, w, h) = cells(slot);
            scratch.fill(x, y, w, h);
            placements.push((id, slot));
        }

        Ok(placements)
    }
}
