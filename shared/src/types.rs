use std::fmt;

use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// Identifies an inventory across every process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InventoryId(pub u64);

impl fmt::Display for InventoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inventory#{}", self.0)
    }
}

impl Serde for InventoryId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u64::de(reader)?))
    }
}

/// Stable identifier of an item, assigned once at creation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    /// Never assigned to a real item
    pub const NIL: ItemId = ItemId(0);

    /// Generates a fresh random id. Ids are random rather than sequential so
    /// items created by different processes never collide in practice.
    pub fn generate() -> Self {
        Self(fastrand::u64(1..))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{:016x}", self.0)
    }
}

impl Serde for ItemId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u64::de(reader)?))
    }
}

/// A connection as seen by the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Correlates a client request with the host's response
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u32);

impl Serde for RequestId {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self(u32::de(reader)?))
    }
}

/// How an inventory sizes the items placed in it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SlotMode {
    /// Items occupy their intrinsic width and height
    #[default]
    Sized,
    /// Every item occupies a single cell
    SingleCell,
}

impl Serde for SlotMode {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(matches!(self, SlotMode::SingleCell));
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(SlotMode::SingleCell)
        } else {
            Ok(SlotMode::Sized)
        }
    }
}

/// Who receives an inventory's incremental changes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NetworkMode {
    /// Only peers in the inventory's subscriber set
    #[default]
    Subscribers,
    /// Every connected peer except the host itself
    Global,
}
