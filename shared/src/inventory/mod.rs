mod error;
mod events;
mod inventory_kinds;
mod replay;
mod rules;
mod snapshot;
mod sort;
mod spatial_inventory;
mod stacking;
mod swap;
mod transfer;


pub use error::{AddError, InventoryError, InventoryResult};
pub(crate) use events::InventoryChange;
pub use events::InventoryEvent;
pub use inventory_kinds::{IdFactory, InventoryKinds, SizedFactory};
pub use rules::{DefaultRules, InventoryRules};
pub(crate) use spatial_inventory::AddPlan;
pub use spatial_inventory::{AddOutcome, SpatialInventory, DEFAULT_INVENTORY_KIND};
pub use transfer::MoveOrSwapOutcome;
