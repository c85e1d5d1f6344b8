use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger, UnsignedVariableInteger};

use crate::{
    messages::{read_coord, read_point, write_coord, write_point},
    types::{InventoryId, ItemId},
};

/// A mutation a client asks the host to perform on one inventory
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InventoryRequest {
    Move {
        item: ItemId,
        x: i32,
        y: i32,
    },
    Swap {
        first: ItemId,
        second: ItemId,
    },
    /// Without `at` the item is added to the destination with merging
    Transfer {
        item: ItemId,
        destination: InventoryId,
        at: Option<(i32, i32)>,
    },
    /// Splits `amount` units off `item` and places them at `(x, y)`
    Take {
        item: ItemId,
        amount: u32,
        x: i32,
        y: i32,
    },
    CombineStacks {
        source: ItemId,
        destination: ItemId,
        amount: u32,
    },
    AutoSort,
    Consolidate,
}

impl InventoryRequest {
    pub fn name(&self) -> &'static str {
        match self {
            InventoryRequest::Move { .. } => "Move",
            InventoryRequest::Swap { .. } => "Swap",
            InventoryRequest::Transfer { .. } => "Transfer",
            InventoryRequest::Take { .. } => "Take",
            InventoryRequest::CombineStacks { .. } => "CombineStacks",
            InventoryRequest::AutoSort => "AutoSort",
            InventoryRequest::Consolidate => "Consolidate",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            InventoryRequest::Move { .. } => 0,
            InventoryRequest::Swap { .. } => 1,
            InventoryRequest::Transfer { .. } => 2,
            InventoryRequest::Take { .. } => 3,
            InventoryRequest::CombineStacks { .. } => 4,
            InventoryRequest::AutoSort => 5,
            InventoryRequest::Consolidate => 6,
        }
    }
}

fn write_amount(amount: u32, writer: &mut dyn BitWrite) {
    UnsignedVariableInteger::<7>::new(amount).ser(writer);
}

fn read_amount(reader: &mut BitReader) -> Result<u32, SerdeErr> {
    UnsignedVariableInteger::<7>::de(reader)?.try_to()
}

impl Serde for InventoryRequest {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedInteger::<3>::new(self.tag()).ser(writer);
        match self {
            InventoryRequest::Move { item, x, y } => {
                item.ser(writer);
                write_coord(*x, writer);
                write_coord(*y, writer);
            }
            InventoryRequest::Swap { first, second } => {
                first.ser(writer);
                second.ser(writer);
            }
            InventoryRequest::Transfer {
                item,
                destination,
                at,
            } => {
                item.ser(writer);
                destination.ser(writer);
                writer.write_bit(at.is_some());
                if let Some(point) = at {
                    write_point(*point, writer);
                }
            }
            InventoryRequest::Take { item, amount, x, y } => {
                item.ser(writer);
                write_amount(*amount, writer);
                write_coord(*x, writer);
                write_coord(*y, writer);
            }
            InventoryRequest::CombineStacks {
                source,
                destination,
                amount,
            } => {
                source.ser(writer);
                destination.ser(writer);
                write_amount(*amount, writer);
            }
            InventoryRequest::AutoSort | InventoryRequest::Consolidate => {}
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let tag: u8 = UnsignedInteger::<3>::de(reader)?.try_to()?;
        let request = match tag {
            0 => InventoryRequest::Move {
                item: ItemId::de(reader)?,
                x: read_coord(reader)?,
                y: read_coord(reader)?,
            },
            1 => InventoryRequest::Swap {
                first: ItemId::de(reader)?,
                second: ItemId::de(reader)?,
            },
            2 => {
                let item = ItemId::de(reader)?;
                let destination = InventoryId::de(reader)?;
                let at = if reader.read_bit()? {
                    Some(read_point(reader)?)
                } else {
                    None
                };
                InventoryRequest::Transfer {
                    item,
                    destination,
                    at,
                }
            }
            3 => InventoryRequest::Take {
                item: ItemId::de(reader)?,
                amount: read_amount(reader)?,
                x: read_coord(reader)?,
                y: read_coord(reader)?,
            },
            4 => InventoryRequest::CombineStacks {
                source: ItemId::de(reader)?,
                destination: ItemId::de(reader)?,
                amount: read_amount(reader)?,
            },
            5 => InventoryRequest::AutoSort,
            6 => InventoryRequest::Consolidate,
            _ => {
                return Err(SerdeErr::InvalidValue {
                    type_name: "InventoryRequest",
                })
            }
        };
        Ok(request)
    }
}
