use std::collections::BTreeMap;

use log::warn;

use gridvault_serde::{BitWriter, Serde};

use crate::{
    inventory::SpatialInventory,
    item::STACK_COUNT_PROPERTY,
    messages::{ItemDataChange, SerializedEntry, StateSync},
    types::ItemId,
};

// Host side serialization of an inventory's contents
impl SpatialInventory {
    pub(crate) fn serialized_entry(&self, item: &ItemId) -> Option<SerializedEntry> {
        let entry = self.entries.get(item)?;
        match SerializedEntry::from_item(entry.item.as_ref(), entry.slot) {
            Ok(serialized) => Some(serialized),
            Err(error) => {
                warn!("could not serialize {}: {}", item, error);
                None
            }
        }
    }

    pub(crate) fn state_sync(&self) -> StateSync {
        StateSync {
            kind: self.kind.clone(),
            width: self.width,
            height: self.height,
            slot_mode: self.slot_mode,
            entries: self
                .ordered_ids()
                .iter()
                .filter_map(|id| self.serialized_entry(id))
                .collect(),
        }
    }

    /// Collects the current value of every marked property and clears the
    /// marks
    pub(crate) fn take_item_data(&self) -> Vec<ItemDataChange> {
        let mut output = Vec::new();
        for id in self.ordered_ids() {
            let Some(entry) = self.entries.get(&id) else {
                continue;
            };
            let item = entry.item.as_ref();
            let mutator = item.core().mutator();
            if !mutator.is_dirty() {
                continue;
            }

            let (indices, count_dirty) = mutator.take_changes();
            let names = item.property_names();
            let mut properties = BTreeMap::new();
            for index in indices {
                let Some(name) = names.get(usize::from(index)) else {
                    warn!("{} marked unknown property {}", id, index);
                    continue;
                };
                match item.property_bytes(index) {
                    Ok(bytes) => {
                        properties.insert(name.to_string(), bytes);
                    }
                    Err(error) => warn!("could not read `{}` of {}: {}", name, id, error),
                }
            }
            if count_dirty {
                let mut writer = BitWriter::new();
                item.core().stack_count().ser(&mut writer);
                properties.insert(STACK_COUNT_PROPERTY.to_string(), writer.to_bytes());
            }

            if !properties.is_empty() {
                output.push(ItemDataChange {
                    item: id,
                    properties,
                });
            }
        }
        output
    }
}
