mod diff_mask;
mod item;
mod item_kinds;
mod property;
mod property_mutator;

pub use diff_mask::DiffMask;
pub use item::{Item, ItemCore, ReplicatedItem, STACK_COUNT_PROPERTY};
pub use item_kinds::ItemKinds;
pub use property::{Property, PropertyError};
pub use property_mutator::{DirtyFlag, PropertyMutator};
pub(crate) use property_mutator::PendingMarks;
