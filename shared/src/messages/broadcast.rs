use std::collections::BTreeMap;

use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

use crate::{
    messages::{read_coord, read_point, write_coord, write_point, SerializedEntry},
    types::{ItemId, SlotMode},
};

/// Property values of one item that changed since the last sync
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemDataChange {
    pub item: ItemId,
    pub properties: BTreeMap<String, Vec<u8>>,
}

impl Serde for ItemDataChange {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.item.ser(writer);
        self.properties.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            item: ItemId::de(reader)?,
            properties: BTreeMap::de(reader)?,
        })
    }
}

/// Full state of an inventory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSync {
    pub kind: String,
    pub width: i32,
    pub height: i32,
    pub slot_mode: SlotMode,
    pub entries: Vec<SerializedEntry>,
}

impl Serde for StateSync {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.kind.ser(writer);
        write_coord(self.width, writer);
        write_coord(self.height, writer);
        self.slot_mode.ser(writer);
        self.entries.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            kind: String::de(reader)?,
            width: read_coord(reader)?,
            height: read_coord(reader)?,
            slot_mode: SlotMode::de(reader)?,
            entries: Vec::de(reader)?,
        })
    }
}

/// A committed change the host pushes to the inventory's observers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryMessage {
    ItemAdded(SerializedEntry),
    ItemRemoved {
        item: ItemId,
    },
    ItemMoved {
        item: ItemId,
        x: i32,
        y: i32,
    },
    ItemsSwapped {
        first: ItemId,
        first_at: (i32, i32),
        second: ItemId,
        second_at: (i32, i32),
    },
    ItemDataChangedList(Vec<ItemDataChange>),
    StateSync(StateSync),
    ClearAll,
}

impl Serde for InventoryMessage {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let tag: u8 = match self {
            InventoryMessage::ItemAdded(_) => 0,
            InventoryMessage::ItemRemoved { .. } => 1,
            InventoryMessage::ItemMoved { .. } => 2,
            InventoryMessage::ItemsSwapped { .. } => 3,
            InventoryMessage::ItemDataChangedList(_) => 4,
            InventoryMessage::StateSync(_) => 5,
            InventoryMessage::ClearAll => 6,
        };
        UnsignedInteger::<3>::new(tag).ser(writer);

        match self {
            InventoryMessage::ItemAdded(entry) => entry.ser(writer),
            InventoryMessage::ItemRemoved { item } => item.ser(writer),
            InventoryMessage::ItemMoved { item, x, y } => {
                item.ser(writer);
                write_coord(*x, writer);
                write_coord(*y, writer);
            }
            InventoryMessage::ItemsSwapped {
                first,
                first_at,
                second,
                second_at,
            } => {
                first.ser(writer);
                write_point(*first_at, writer);
                second.ser(writer);
                write_point(*second_at, writer);
            }
            InventoryMessage::ItemDataChangedList(changes) => changes.ser(writer),
            InventoryMessage::StateSync(state) => state.ser(writer),
            InventoryMessage::ClearAll => {}
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = UnsignedInteger::<3>::de(reader)?.try_to()?;
        let message = match tag {
            0 => InventoryMessage::ItemAdded(SerializedEntry::de(reader)?),
            1 => InventoryMessage::ItemRemoved {
                item: ItemId::de(reader)?,
            },
            2 => InventoryMessage::ItemMoved {
                item: ItemId::de(reader)?,
                x: read_coord(reader)?,
                y: read_coord(reader)?,
            },
            3 => InventoryMessage::ItemsSwapped {
                first: ItemId::de(reader)?,
                first_at: read_point(reader)?,
                second: ItemId::de(reader)?,
                second_at: read_point(reader)?,
            },
            4 => InventoryMessage::ItemDataChangedList(Vec::de(reader)?),
            5 => InventoryMessage::StateSync(StateSync::de(reader)?),
            6 => InventoryMessage::ClearAll,
            _ => {
                return Err(SerdeErr::InvalidValue {
                    type_name: "InventoryMessage",
                })
            }
        };
        Ok(message)
    }
}
