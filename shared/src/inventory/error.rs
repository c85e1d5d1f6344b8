use std::fmt;

use thiserror::Error;

use crate::item::Item;

/// Status returned by every inventory mutator that does not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InventoryError {
    #[error("Item reference is null")]
    NullItem,
    #[error("Item is already in this inventory")]
    AlreadyPresent,
    #[error("Item is not in this inventory")]
    NotPresent,
    #[error("Destination inventory does not exist")]
    DestinationNull,
    #[error("Inventory rules rejected the insert")]
    InsertNotAllowed,
    #[error("Inventory rules rejected the removal")]
    RemoveNotAllowed,
    #[error("Source inventory rules rejected the transfer")]
    TransferNotAllowed,
    #[error("Destination inventory rules rejected the item")]
    ReceiveNotAllowed,
    #[error("Inventory rules rejected the placement")]
    PlacementNotAllowed,
    #[error("Inventory rules rejected stacking these items")]
    StackingNotAllowed,
    #[error("Stack count is outside 1..=max_stack_size")]
    InvalidStackCount,
    #[error("No free space for the item")]
    NoSpaceAvailable,
    #[error("Slot size differs from the item's effective size")]
    SlotSizeMismatch,
    #[error("Slot lies outside the grid")]
    OutOfBounds,
    #[error("Slot collides with another item")]
    Collision,
    #[error("Amount must be positive")]
    AmountMustBePositive,
    #[error("Amount exceeds the stack count")]
    AmountExceedsStack,
    #[error("Item is not stackable")]
    NotStackable,
    #[error("Cannot combine a stack with itself")]
    CannotCombineWithSelf,
    #[error("Both items must be resident in their inventories")]
    BothItemsMustBeResident,
    #[error("Destination stack is full")]
    DestinationStackFull,
    #[error("This process has no authority over the inventory")]
    NoAuthority,
    #[error("Host did not answer before the request timed out")]
    RequestTimeout,
    #[error("Host rejected the request")]
    RequestRejected,
}

const ALL_ERRORS: [InventoryError; 24] = [
    InventoryError::NullItem,
    InventoryError::AlreadyPresent,
    InventoryError::NotPresent,
    InventoryError::DestinationNull,
    InventoryError::InsertNotAllowed,
    InventoryError::RemoveNotAllowed,
    InventoryError::TransferNotAllowed,
    InventoryError::ReceiveNotAllowed,
    InventoryError::PlacementNotAllowed,
    InventoryError::StackingNotAllowed,
    InventoryError::InvalidStackCount,
    InventoryError::NoSpaceAvailable,
    InventoryError::SlotSizeMismatch,
    InventoryError::OutOfBounds,
    InventoryError::Collision,
    InventoryError::AmountMustBePositive,
    InventoryError::AmountExceedsStack,
    InventoryError::NotStackable,
    InventoryError::CannotCombineWithSelf,
    InventoryError::BothItemsMustBeResident,
    InventoryError::DestinationStackFull,
    InventoryError::NoAuthority,
    InventoryError::RequestTimeout,
    InventoryError::RequestRejected,
];

impl InventoryError {
    /// Wire code of this status. 0 is reserved for success.
    pub fn code(&self) -> u8 {
        let position = ALL_ERRORS
            .iter()
            .position(|error| error == self)
            .unwrap_or(ALL_ERRORS.len() - 1);
        // ALL_ERRORS has 24 entries
        (position + 1) as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let index = usize::from(code).checked_sub(1)?;
        ALL_ERRORS.get(index).copied()
    }
}

pub type InventoryResult<T> = Result<T, InventoryError>;

/// Failed `add`. The item is handed back so the caller still owns it.
pub struct AddError {
    pub error: InventoryError,
    pub item: Box<dyn Item>,
}

impl AddError {
    pub(crate) fn new(error: InventoryError, item: Box<dyn Item>) -> Self {
        Self { error, item }
    }

    pub fn into_item(self) -> Box<dyn Item> {
        self.item
    }
}

impl fmt::Debug for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddError")
            .field("error", &self.error)
            .field("item", &self.item.id())
            .finish()
    }
}

impl fmt::Display for AddError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not add {}: {}", self.item.id(), self.error)
    }
}

impl std::error::Error for AddError {}

impl From<AddError> for InventoryError {
    fn from(error: AddError) -> Self {
        error.error
    }
}
