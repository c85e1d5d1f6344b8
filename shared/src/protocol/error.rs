use thiserror::Error;

use crate::{item::PropertyError, types::ItemId};

/// Errors that can occur while building a protocol or activating the kinds
/// it registers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Protocol is locked and cannot be modified
    #[error("Protocol is already locked and cannot be modified. Protocol.lock() has been called and no further changes are allowed")]
    AlreadyLocked,
    #[error("no item kind named `{0}` is registered")]
    UnknownItemKind(String),
    #[error("no inventory kind named `{0}` is registered")]
    UnknownInventoryKind(String),
    /// The serialized size or stack values cannot describe an item
    #[error("serialized entry for {0} is invalid")]
    InvalidEntry(ItemId),
    #[error("inventory dimensions must be at least 1x1, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error(transparent)]
    Property(#[from] PropertyError),
}
