//! # Gridvault Shared
//! Grid inventories and the host-authoritative replication that keeps their
//! copies consistent across processes.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

cfg_if! {
    if #[cfg(target_arch = "wasm32")]
    {
        compile_error!("the 'gridvault_shared' crate does not support wasm targets yet");
    }
}

pub use gridvault_serde::{
    BitCounter, BitReader, BitWrite, BitWriter, Serde, SerdeErr, SerdeIntegerConversion,
    SignedInteger, SignedVariableInteger, UnsignedInteger, UnsignedVariableInteger,
};

mod config;
mod grid;
mod inventory;
mod item;
mod messages;
mod protocol;
mod registry;
mod replication;
mod session;
mod timer;
mod types;

pub use config::ReplicationConfig;
pub use grid::{GridOccupancyIndex, Slot};
pub use inventory::{
    AddError, AddOutcome, DefaultRules, IdFactory, InventoryError, InventoryEvent,
    InventoryKinds, InventoryResult, InventoryRules, MoveOrSwapOutcome, SizedFactory,
    SpatialInventory, DEFAULT_INVENTORY_KIND,
};
pub use item::{
    DiffMask, DirtyFlag, Item, ItemCore, ItemKinds, Property, PropertyError, PropertyMutator,
    ReplicatedItem, STACK_COUNT_PROPERTY,
};
pub use messages::{
    InventoryMessage, InventoryRequest, ItemDataChange, Packet, PacketHeader, SerializedEntry,
    StateSync,
};
pub use protocol::{Protocol, ProtocolError, ProtocolPlugin};
pub use registry::{Registry, RegistryError};
pub use replication::{Dispatch, ReplicationChannel, ResponseReceiveKey, Transport};
pub use session::{new_session_channel, SessionAccessor, SessionMutator, SessionStatus};
pub use timer::Timer;
pub use types::{InventoryId, ItemId, NetworkMode, PeerId, RequestId, SlotMode};
