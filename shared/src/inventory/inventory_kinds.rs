use std::collections::HashMap;

use crate::{
    inventory::{SpatialInventory, DEFAULT_INVENTORY_KIND},
    protocol::ProtocolError,
    types::{InventoryId, SlotMode},
};

/// Builds an inventory of a kind from its id, size and slot mode
pub type SizedFactory = fn(InventoryId, i32, i32, SlotMode) -> SpatialInventory;
/// Builds an inventory of a kind that fixes its own size
pub type IdFactory = fn(InventoryId) -> SpatialInventory;

#[derive(Default)]
struct KindFactories {
    sized: Option<SizedFactory>,
    by_id: Option<IdFactory>,
}

fn default_inventory(id: InventoryId, width: i32, height: i32, slot_mode: SlotMode) -> SpatialInventory {
    SpatialInventory::new(id, width, height).with_slot_mode(slot_mode)
}

/// Maps inventory kind names to factories, so mirrors are built with the
/// same rules as the host's inventory
pub struct InventoryKinds {
    factories: HashMap<String, KindFactories>,
}

impl Default for InventoryKinds {
    fn default() -> Self {
        let mut kinds = Self {
            factories: HashMap::new(),
        };
        kinds.add_sized(DEFAULT_INVENTORY_KIND, default_inventory);
        kinds
    }
}

impl InventoryKinds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sized(&mut self, kind: &str, factory: SizedFactory) {
        self.factories.entry(kind.to_string()).or_default().sized = Some(factory);
    }

    pub fn add_by_id(&mut self, kind: &str, factory: IdFactory) {
        self.factories.entry(kind.to_string()).or_default().by_id = Some(factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Tries the sized factory first, then the id-only one
    pub fn create(
        &self,
        kind: &str,
        id: InventoryId,
        width: i32,
        height: i32,
        slot_mode: SlotMode,
    ) -> Result<SpatialInventory, ProtocolError> {
        let Some(factories) = self.factories.get(kind) else {
            return Err(ProtocolError::UnknownInventoryKind(kind.to_string()));
        };
        if let Some(sized) = factories.sized {
            if width < 1 || height < 1 {
                return Err(ProtocolError::InvalidDimensions { width, height });
            }
            return Ok(sized(id, width, height, slot_mode));
        }
        if let Some(by_id) = factories.by_id {
            return Ok(by_id(id));
        }
        Err(ProtocolError::UnknownInventoryKind(kind.to_string()))
    }
}
