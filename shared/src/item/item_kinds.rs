use std::collections::HashMap;

use crate::{
    item::{Item, ItemCore, ReplicatedItem},
    messages::SerializedEntry,
    protocol::ProtocolError,
};

type ItemBuilder = fn(ItemCore) -> Box<dyn Item>;

fn build_boxed<T: ReplicatedItem>(core: ItemCore) -> Box<dyn Item> {
    Box::new(T::build(core))
}

/// Maps the kind names written on the wire to constructors
#[derive(Default)]
pub struct ItemKinds {
    builders: HashMap<String, ItemBuilder>,
}

impl ItemKinds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item<T: ReplicatedItem>(&mut self) {
        self.builders.insert(T::kind_name(), build_boxed::<T>);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.builders.contains_key(kind)
    }

    pub fn kind_count(&self) -> usize {
        self.builders.len()
    }

    /// Reconstructs an item from its serialized form. Property values are
    /// applied as mirrored state, so the new item has nothing dirty.
    pub fn instantiate(&self, entry: &SerializedEntry) -> Result<Box<dyn Item>, ProtocolError> {
        let Some(builder) = self.builders.get(&entry.kind) else {
            return Err(ProtocolError::UnknownItemKind(entry.kind.clone()));
        };
        let Some(core) = ItemCore::from_parts(
            entry.item,
            entry.width,
            entry.height,
            entry.max_stack_size,
            entry.stack_count,
        ) else {
            return Err(ProtocolError::InvalidEntry(entry.item));
        };

        let mut item = builder(core);
        for (name, bytes) in &entry.properties {
            item.set_property_bytes(name, bytes)?;
        }
        item.core().mutator().clear();

        Ok(item)
    }
}
