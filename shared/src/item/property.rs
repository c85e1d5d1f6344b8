use std::ops::{Deref, DerefMut};

use thiserror::Error;

use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::item::PropertyMutator;

/// Errors that can occur while reading or writing item properties by index
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The item has no property at this index
    #[error("Item kind `{kind}` has no property at index {index}")]
    UnknownIndex { kind: String, index: u8 },

    /// The item has no property with this name
    #[error("Item kind `{kind}` has no property named `{name}`")]
    UnknownName { kind: String, name: String },

    /// The serialized value could not be decoded
    #[error("Property value could not be decoded: {0}")]
    Decode(#[from] SerdeErr),
}

/// An observed field of an Item. Writes through `DerefMut` or `set` record
/// the property's index in the owning item's diff mask so the value is
/// picked up by the next dirty sync.
pub struct Property<T: Serde> {
    inner: T,
    index: u8,
    mutator: Option<PropertyMutator>,
}

impl<T: Serde> Property<T> {
    /// Creates an unbound Property. Writes are not tracked until it is bound
    /// with `ItemCore::bind`.
    pub fn new(value: T, index: u8) -> Self {
        Self {
            inner: value,
            index,
            mutator: None,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn get(&self) -> &T {
        &self.inner
    }

    pub fn set(&mut self, value: T) {
        self.inner = value;
        self.mutate();
    }

    pub fn is_bound(&self) -> bool {
        self.mutator.is_some()
    }

    pub(crate) fn set_mutator(&mut self, mutator: &PropertyMutator) {
        self.mutator = Some(mutator.clone());
    }

    /// Writes the current value
    pub fn write(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    /// Overwrites the value with one read from the wire. Incoming values are
    /// not changes of our own, so the diff mask is left untouched.
    pub fn read(&mut self, reader: &mut BitReader) -> Result<(), SerdeErr> {
        self.inner = T::de(reader)?;
        Ok(())
    }

    fn mutate(&self) {
        if let Some(mutator) = &self.mutator {
            mutator.mutate(self.index);
        }
    }
}

// A clone belongs to no item until it is bound again
impl<T: Serde> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone(), self.index)
    }
}

impl<T: Serde> PartialEq for Property<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.inner == other.inner
    }
}

impl<T: Serde + std::fmt::Debug> std::fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.inner)
            .field("index", &self.index)
            .finish()
    }
}

impl<T: Serde> Deref for Property<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: Serde> DerefMut for Property<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.mutate();
        &mut self.inner
    }
}
