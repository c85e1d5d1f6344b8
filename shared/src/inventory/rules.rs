use crate::{grid::Slot, inventory::SpatialInventory, item::Item};

/// Domain validation consulted by every inventory mutator. Each hook
/// defaults to allowing the operation.
pub trait InventoryRules {
    fn can_insert(&self, _inventory: &SpatialInventory, _item: &dyn Item) -> bool {
        true
    }

    fn can_remove(&self, _inventory: &SpatialInventory, _item: &dyn Item) -> bool {
        true
    }

    fn can_transfer_out(
        &self,
        _inventory: &SpatialInventory,
        _item: &dyn Item,
        _destination: &SpatialInventory,
    ) -> bool {
        true
    }

    fn can_receive(
        &self,
        _inventory: &SpatialInventory,
        _item: &dyn Item,
        _source: &SpatialInventory,
    ) -> bool {
        true
    }

    fn can_place_at(&self, _inventory: &SpatialInventory, _item: &dyn Item, _slot: Slot) -> bool {
        true
    }

    /// Whether units of `source` may be merged into `destination`
    fn can_stack(
        &self,
        _inventory: &SpatialInventory,
        destination: &dyn Item,
        source: &dyn Item,
    ) -> bool {
        destination.can_stack_with(source)
    }
}

/// Rules with every hook left at its default
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRules;

impl InventoryRules for DefaultRules {}
