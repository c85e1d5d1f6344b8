use std::collections::BTreeMap;

use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

use crate::{
    grid::Slot,
    item::{Item, PropertyError},
    messages::{read_coord, write_coord},
    types::ItemId,
};

/// Everything needed to rebuild an item and its placement on another process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedEntry {
    pub item: ItemId,
    pub kind: String,
    pub slot: Slot,
    /// Intrinsic size, which differs from the slot under single-cell mode
    pub width: i32,
    pub height: i32,
    pub max_stack_size: u32,
    pub stack_count: u32,
    pub properties: BTreeMap<String, Vec<u8>>,
}

impl SerializedEntry {
    pub fn from_item(item: &dyn Item, slot: Slot) -> Result<Self, PropertyError> {
        let core = item.core();
        Ok(Self {
            item: core.id(),
            kind: item.kind(),
            slot,
            width: core.width(),
            height: core.height(),
            max_stack_size: core.max_stack_size(),
            stack_count: core.stack_count(),
            properties: item.properties()?,
        })
    }
}

fn write_count(value: u32, writer: &mut dyn BitWrite) {
    UnsignedVariableInteger::<7>::new(value).ser(writer);
}

fn read_count(reader: &mut BitReader) -> Result<u32, SerdeErr> {
    UnsignedVariableInteger::<7>::de(reader)?.try_to()
}

impl Serde for SerializedEntry {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.item.ser(writer);
        self.kind.ser(writer);
        self.slot.ser(writer);
        write_coord(self.width, writer);
        write_coord(self.height, writer);
        write_count(self.max_stack_size, writer);
        write_count(self.stack_count, writer);
        self.properties.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let item = ItemId::de(reader)?;
        let kind = String::de(reader)?;
        let slot = Slot::de(reader)?;
        Ok(Self {
            item,
            kind,
            slot,
            width: read_coord(reader)?,
            height: read_coord(reader)?,
            max_stack_size: read_count(reader)?,
            stack_count: read_count(reader)?,
            properties: BTreeMap::de(reader)?,
        })
    }
}
