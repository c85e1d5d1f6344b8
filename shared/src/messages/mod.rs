mod broadcast;
mod packet;
mod request;
mod serialized_entry;

pub use broadcast::{InventoryMessage, ItemDataChange, StateSync};
pub use packet::{Packet, PacketHeader};
pub use request::InventoryRequest;
pub use serialized_entry::SerializedEntry;

use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr, SignedVariableInteger};

// Grid coordinates are small, so they travel as variable-width integers

pub(crate) fn write_coord(value: i32, writer: &mut dyn BitWrite) {
    SignedVariableInteger::<7>::new(value).ser(writer);
}

pub(crate) fn read_coord(reader: &mut BitReader) -> Result<i32, SerdeErr> {
    SignedVariableInteger::<7>::de(reader)?.try_to()
}

pub(crate) fn write_point(point: (i32, i32), writer: &mut dyn BitWrite) {
    write_coord(point.0, writer);
    write_coord(point.1, writer);
}

pub(crate) fn read_point(reader: &mut BitReader) -> Result<(i32, i32), SerdeErr> {
    Ok((read_coord(reader)?, read_coord(reader)?))
}
