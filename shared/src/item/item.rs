use std::{any::Any, collections::BTreeMap, fmt};

use gridvault_serde::{BitReader, BitWrite, BitWriter, Serde};

use crate::{
    item::{Property, PropertyError, PropertyMutator},
    types::{InventoryId, ItemId},
};

/// Name under which the stack count travels in property change lists
pub const STACK_COUNT_PROPERTY: &str = "stack_count";

/// State every item carries regardless of its kind
pub struct ItemCore {
    id: ItemId,
    width: i32,
    height: i32,
    max_stack_size: u32,
    stack_count: u32,
    container: Option<InventoryId>,
    mutator: PropertyMutator,
}

impl ItemCore {
    /// Creates a single, non-stackable item with a fresh id
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is less than 1.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_id(ItemId::generate(), width, height)
    }

    /// # Panics
    ///
    /// Panics if `width` or `height` is less than 1.
    pub fn with_id(id: ItemId, width: i32, height: i32) -> Self {
        if width < 1 || height < 1 {
            panic!("item size must be at least 1x1, got {}x{}", width, height);
        }
        Self {
            id,
            width,
            height,
            max_stack_size: 1,
            stack_count: 1,
            container: None,
            mutator: PropertyMutator::new(),
        }
    }

    /// Makes the item stackable. `stack_count` is clamped to `max_stack_size`.
    ///
    /// # Panics
    ///
    /// Panics if `max_stack_size` is 0.
    pub fn with_stack(mut self, max_stack_size: u32, stack_count: u32) -> Self {
        if max_stack_size == 0 {
            panic!("max_stack_size must be at least 1");
        }
        self.max_stack_size = max_stack_size;
        self.stack_count = stack_count.min(max_stack_size);
        self
    }

    /// Rebuilds a core from replicated values, `None` if they are unusable
    pub(crate) fn from_parts(
        id: ItemId,
        width: i32,
        height: i32,
        max_stack_size: u32,
        stack_count: u32,
    ) -> Option<Self> {
        if id.is_nil() || width < 1 || height < 1 || max_stack_size == 0 {
            return None;
        }
        Some(Self::with_id(id, width, height).with_stack(max_stack_size, stack_count))
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn max_stack_size(&self) -> u32 {
        self.max_stack_size
    }

    pub fn stack_count(&self) -> u32 {
        self.stack_count
    }

    pub fn free_capacity(&self) -> u32 {
        self.max_stack_size - self.stack_count
    }

    pub fn is_stackable(&self) -> bool {
        self.max_stack_size > 1
    }

    /// The inventory currently holding this item
    pub fn container(&self) -> Option<InventoryId> {
        self.container
    }

    pub fn mutator(&self) -> &PropertyMutator {
        &self.mutator
    }

    /// Routes writes to `property` into this item's diff mask
    pub fn bind<T: Serde>(&self, property: &mut Property<T>) {
        property.set_mutator(&self.mutator);
    }

    /// A core for `amount` units split off this one: fresh id, no container,
    /// nothing dirty
    pub fn split(&self, amount: u32) -> ItemCore {
        Self::with_id(ItemId::generate(), self.width, self.height)
            .with_stack(self.max_stack_size, amount)
    }

    pub(crate) fn set_stack_count(&mut self, count: u32) {
        let count = count.min(self.max_stack_size);
        if count != self.stack_count {
            self.stack_count = count;
            self.mutator.mutate_count();
        }
    }

    // Replicated counts are not local changes
    pub(crate) fn mirror_stack_count(&mut self, count: u32) {
        self.stack_count = count.min(self.max_stack_size);
    }

    pub(crate) fn set_container(&mut self, container: Option<InventoryId>) {
        self.container = container;
    }
}

impl fmt::Debug for ItemCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemCore")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("max_stack_size", &self.max_stack_size)
            .field("stack_count", &self.stack_count)
            .field("container", &self.container)
            .finish()
    }
}

/// An object that can be stored in a `SpatialInventory`
pub trait Item: Any + 'static {
    fn core(&self) -> &ItemCore;
    fn core_mut(&mut self) -> &mut ItemCore;

    /// Type identity recorded on the wire. Generic kinds embed their type
    /// arguments, e.g. `Crate<Gem>`.
    fn kind(&self) -> String;

    /// Builds a new instance of the same kind around `core`, carrying over
    /// this item's metadata. Used when a stack is split.
    fn split_clone(&self, core: ItemCore) -> Box<dyn Item>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Names of the replicated properties, in index order
    fn property_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn write_property(&self, index: u8, _writer: &mut dyn BitWrite) -> Result<(), PropertyError> {
        Err(PropertyError::UnknownIndex {
            kind: self.kind(),
            index,
        })
    }

    fn read_property(&mut self, index: u8, _reader: &mut BitReader) -> Result<(), PropertyError> {
        Err(PropertyError::UnknownIndex {
            kind: self.kind(),
            index,
        })
    }

    /// Same kind, both stackable, and equal property values
    fn can_stack_with(&self, other: &dyn Item) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        if !self.core().is_stackable() || !other.core().is_stackable() {
            return false;
        }
        if self.core().max_stack_size() != other.core().max_stack_size() {
            return false;
        }
        for index in 0..self.property_names().len() {
            let Ok(index) = u8::try_from(index) else {
                return false;
            };
            let mut mine = BitWriter::new();
            let mut theirs = BitWriter::new();
            if self.write_property(index, &mut mine).is_err()
                || other.write_property(index, &mut theirs).is_err()
            {
                return false;
            }
            if mine.to_bytes() != theirs.to_bytes() {
                return false;
            }
        }
        true
    }
}

impl dyn Item {
    pub fn id(&self) -> ItemId {
        self.core().id()
    }

    pub fn downcast_ref<T: Item>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Item>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn property_index(&self, name: &str) -> Option<u8> {
        let position = self.property_names().iter().position(|n| *n == name)?;
        u8::try_from(position).ok()
    }

    pub fn property_bytes(&self, index: u8) -> Result<Vec<u8>, PropertyError> {
        let mut writer = BitWriter::new();
        self.write_property(index, &mut writer)?;
        Ok(writer.to_bytes())
    }

    /// Every replicated property, by name
    pub fn properties(&self) -> Result<BTreeMap<String, Vec<u8>>, PropertyError> {
        let mut output = BTreeMap::new();
        for (index, name) in self.property_names().iter().enumerate() {
            let Ok(index) = u8::try_from(index) else {
                break;
            };
            output.insert(name.to_string(), self.property_bytes(index)?);
        }
        Ok(output)
    }

    pub fn set_property_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), PropertyError> {
        let Some(index) = self.property_index(name) else {
            return Err(PropertyError::UnknownName {
                kind: self.kind(),
                name: name.to_string(),
            });
        };
        let mut reader = BitReader::new(bytes);
        self.read_property(index, &mut reader)
    }
}

impl fmt::Debug for dyn Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("kind", &self.kind())
            .field("core", self.core())
            .finish()
    }
}

/// An item kind that can be rebuilt from its replicated form
pub trait ReplicatedItem: Item + Sized {
    fn kind_name() -> String;

    /// Builds an instance with default property values around `core`,
    /// binding every property to the core's mutator
    fn build(core: ItemCore) -> Self;
}
