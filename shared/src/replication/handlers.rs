use crate::{
    inventory::{InventoryError, InventoryResult, SpatialInventory},
    messages::InventoryRequest,
    registry::Registry,
    types::{InventoryId, ItemId},
};

/// Runs a request against the local copy of `inventory`. Each request kind
/// maps onto exactly one inventory operation.
pub(crate) fn execute(
    registry: &mut Registry,
    inventory: &InventoryId,
    request: &InventoryRequest,
) -> InventoryResult<()> {
    match request {
        InventoryRequest::Move { item, x, y } => {
            on_target(registry, inventory, |target| target.move_item(item, *x, *y))
        }
        InventoryRequest::Swap { first, second } => {
            on_target(registry, inventory, |target| target.swap(first, second))
        }
        InventoryRequest::Transfer {
            item,
            destination,
            at,
        } => transfer(registry, inventory, item, destination, *at),
        InventoryRequest::Take { item, amount, x, y } => on_target(registry, inventory, |target| {
            target.take_and_place(item, *amount, *x, *y).map(|_| ())
        }),
        InventoryRequest::CombineStacks {
            source,
            destination,
            amount,
        } => on_target(registry, inventory, |target| {
            target.combine_stacks(source, destination, *amount).map(|_| ())
        }),
        InventoryRequest::AutoSort => on_target(registry, inventory, |target| target.auto_sort()),
        InventoryRequest::Consolidate => on_target(registry, inventory, |target| {
            target.consolidate_stacks().map(|_| ())
        }),
    }
}

fn on_target(
    registry: &mut Registry,
    inventory: &InventoryId,
    operation: impl FnOnce(&mut SpatialInventory) -> InventoryResult<()>,
) -> InventoryResult<()> {
    match registry.get_mut(inventory) {
        Some(target) => operation(target),
        None => Err(InventoryError::RequestRejected),
    }
}

fn transfer(
    registry: &mut Registry,
    source: &InventoryId,
    item: &ItemId,
    destination: &InventoryId,
    at: Option<(i32, i32)>,
) -> InventoryResult<()> {
    if !registry.contains(source) {
        return Err(InventoryError::RequestRejected);
    }

    // A transfer into the owning inventory is a plain move
    if source == destination {
        return on_target(registry, source, |inventory| match at {
            Some((x, y)) => inventory.move_item(item, x, y),
            None => Err(InventoryError::AlreadyPresent),
        });
    }

    let outcome = registry.with_pair(source, destination, |source, destination| match at {
        Some((x, y)) => source.transfer_to_at(item, destination, x, y),
        None => source.transfer_to(item, destination).map(|_| ()),
    });
    outcome.unwrap_or(Err(InventoryError::DestinationNull))
}
