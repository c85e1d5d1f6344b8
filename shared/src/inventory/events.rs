use crate::{
    grid::Slot,
    messages::{SerializedEntry, StateSync},
    types::ItemId,
};

/// Notification fired by an inventory after a committed change. Replayed
/// host changes fire the same events a local mutation would.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryEvent {
    ItemAdded { item: ItemId, slot: Slot },
    ItemRemoved { item: ItemId, slot: Slot },
    ItemMoved { item: ItemId, from: Slot, to: Slot },
    ItemsSwapped {
        first: ItemId,
        first_slot: Slot,
        second: ItemId,
        second_slot: Slot,
    },
    StackChanged { item: ItemId, count: u32 },
    Cleared,
}

// Committed changes awaiting broadcast by the replication channel. Entries
// and snapshots are captured when the change happens, later changes follow
// as their own records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum InventoryChange {
    Added(SerializedEntry),
    Removed(ItemId),
    Moved {
        item: ItemId,
        x: i32,
        y: i32,
    },
    Swapped {
        first: ItemId,
        first_at: (i32, i32),
        second: ItemId,
        second_at: (i32, i32),
    },
    Cleared,
    Snapshot(StateSync),
}
