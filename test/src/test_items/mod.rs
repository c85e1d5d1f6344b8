/// Item kinds and protocol shared by the integration tests
use std::any::Any;

use gridvault_shared::{
    BitReader, BitWrite, DefaultRules, InventoryId, Item, ItemCore, Property, PropertyError,
    Protocol, ReplicatedItem, SlotMode, SpatialInventory,
};

// Ammo

/// 1x1, stacks to 64. Stacks only merge with the same caliber.
pub struct Ammo {
    core: ItemCore,
    pub caliber: Property<u16>,
}

impl Ammo {
    pub const MAX_STACK: u32 = 64;

    pub fn new(count: u32, caliber: u16) -> Self {
        let core = ItemCore::new(1, 1).with_stack(Self::MAX_STACK, count);
        let mut caliber = Property::new(caliber, 0);
        core.bind(&mut caliber);
        Ammo { core, caliber }
    }

    pub fn boxed(count: u32) -> Box<dyn Item> {
        Box::new(Self::new(count, 9))
    }
}

impl Item for Ammo {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn kind(&self) -> String {
        Self::kind_name()
    }

    fn split_clone(&self, core: ItemCore) -> Box<dyn Item> {
        let mut caliber = self.caliber.clone();
        core.bind(&mut caliber);
        Box::new(Ammo { core, caliber })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn property_names(&self) -> &'static [&'static str] {
        &["caliber"]
    }

    fn write_property(&self, index: u8, writer: &mut dyn BitWrite) -> Result<(), PropertyError> {
        match index {
            0 => {
                self.caliber.write(writer);
                Ok(())
            }
            _ => Err(PropertyError::UnknownIndex {
                kind: self.kind(),
                index,
            }),
        }
    }

    fn read_property(&mut self, index: u8, reader: &mut BitReader) -> Result<(), PropertyError> {
        match index {
            0 => Ok(self.caliber.read(reader)?),
            _ => Err(PropertyError::UnknownIndex {
                kind: self.kind(),
                index,
            }),
        }
    }
}

impl ReplicatedItem for Ammo {
    fn kind_name() -> String {
        "Ammo".to_string()
    }

    fn build(core: ItemCore) -> Self {
        let mut caliber = Property::new(0, 0);
        core.bind(&mut caliber);
        Ammo { core, caliber }
    }
}

// Rifle

/// 3x1, never stacks
pub struct Rifle {
    core: ItemCore,
    pub durability: Property<u8>,
}

impl Rifle {
    pub fn boxed(durability: u8) -> Box<dyn Item> {
        let core = ItemCore::new(3, 1);
        let mut durability = Property::new(durability, 0);
        core.bind(&mut durability);
        Box::new(Rifle { core, durability })
    }
}

impl Item for Rifle {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn kind(&self) -> String {
        Self::kind_name()
    }

    fn split_clone(&self, core: ItemCore) -> Box<dyn Item> {
        let mut durability = self.durability.clone();
        core.bind(&mut durability);
        Box::new(Rifle { core, durability })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn property_names(&self) -> &'static [&'static str] {
        &["durability"]
    }

    fn write_property(&self, index: u8, writer: &mut dyn BitWrite) -> Result<(), PropertyError> {
        match index {
            0 => {
                self.durability.write(writer);
                Ok(())
            }
            _ => Err(PropertyError::UnknownIndex {
                kind: self.kind(),
                index,
            }),
        }
    }

    fn read_property(&mut self, index: u8, reader: &mut BitReader) -> Result<(), PropertyError> {
        match index {
            0 => Ok(self.durability.read(reader)?),
            _ => Err(PropertyError::UnknownIndex {
                kind: self.kind(),
                index,
            }),
        }
    }
}

impl ReplicatedItem for Rifle {
    fn kind_name() -> String {
        "Rifle".to_string()
    }

    fn build(core: ItemCore) -> Self {
        let mut durability = Property::new(100, 0);
        core.bind(&mut durability);
        Rifle { core, durability }
    }
}

// Gem

/// Sized block without properties
pub struct Gem {
    core: ItemCore,
}

impl Gem {
    pub fn boxed(width: i32, height: i32) -> Box<dyn Item> {
        Box::new(Gem {
            core: ItemCore::new(width, height),
        })
    }
}

impl Item for Gem {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn kind(&self) -> String {
        Self::kind_name()
    }

    fn split_clone(&self, core: ItemCore) -> Box<dyn Item> {
        Box::new(Gem { core })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReplicatedItem for Gem {
    fn kind_name() -> String {
        "Gem".to_string()
    }

    fn build(core: ItemCore) -> Self {
        Gem { core }
    }
}

// Protocol

pub const POUCH_KIND: &str = "Pouch";

/// A fixed 2x2 inventory kind
pub fn pouch(id: InventoryId) -> SpatialInventory {
    SpatialInventory::new(id, 2, 2)
        .with_slot_mode(SlotMode::SingleCell)
        .with_rules(POUCH_KIND, DefaultRules)
}

pub fn protocol() -> Protocol {
    Protocol::builder()
        .add_item::<Ammo>()
        .add_item::<Rifle>()
        .add_item::<Gem>()
        .add_fixed_inventory_kind(POUCH_KIND, pouch)
        .build()
}
