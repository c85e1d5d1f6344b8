use std::{collections::HashMap, time::Instant};

use log::{debug, info};
use thiserror::Error;

use crate::{
    inventory::SpatialInventory,
    item::Item,
    messages::SerializedEntry,
    protocol::{Protocol, ProtocolError},
    replication::ReplicationChannel,
    timer::Timer,
    types::{InventoryId, NetworkMode, SlotMode},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0} is already registered")]
    DuplicateInventory(InventoryId),
    #[error("{0} is not registered")]
    UnknownInventory(InventoryId),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Every inventory a process knows, by id. Passed explicitly to whatever
/// needs to resolve inventories.
pub struct Registry {
    protocol: Protocol,
    inventories: HashMap<InventoryId, SpatialInventory>,
    sync_timer: Option<Timer>,
}

impl Registry {
    pub fn new(mut protocol: Protocol) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }
        Self {
            protocol,
            inventories: HashMap::new(),
            sync_timer: None,
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub(crate) fn instantiate(&self, entry: &SerializedEntry) -> Result<Box<dyn Item>, ProtocolError> {
        self.protocol.item_kinds.instantiate(entry)
    }

    // Registration

    /// Registers an inventory that is not replicated
    pub fn register(&mut self, mut inventory: SpatialInventory) -> Result<(), RegistryError> {
        let id = inventory.id();
        if self.inventories.contains_key(&id) {
            return Err(RegistryError::DuplicateInventory(id));
        }
        inventory.bind_session(None);
        inventory.clear_dirty();
        debug!("registered {}", id);
        self.inventories.insert(id, inventory);
        Ok(())
    }

    /// Registers an inventory replicated through `channel`. A global
    /// inventory registered by the host is pushed to every connected peer.
    pub fn register_networked(
        &mut self,
        mut inventory: SpatialInventory,
        channel: &mut ReplicationChannel,
    ) -> Result<(), RegistryError> {
        let id = inventory.id();
        if self.inventories.contains_key(&id) {
            return Err(RegistryError::DuplicateInventory(id));
        }
        inventory.bind_session(Some(channel.session()));
        inventory.clear_dirty();
        if inventory.network_mode() == NetworkMode::Global && channel.is_host() {
            channel.send_snapshot_to_all(&inventory);
        }
        info!("registered networked {}", id);
        self.inventories.insert(id, inventory);
        Ok(())
    }

    pub fn unregister(&mut self, id: &InventoryId) -> Option<SpatialInventory> {
        let mut inventory = self.inventories.remove(id)?;
        inventory.clear_dirty();
        inventory.bind_session(None);
        info!("unregistered {}", id);
        Some(inventory)
    }

    /// Unregisters and drops the inventory with everything it holds
    pub fn dispose(&mut self, id: &InventoryId) -> bool {
        self.unregister(id).is_some()
    }

    // Lookup

    pub fn get(&self, id: &InventoryId) -> Option<&SpatialInventory> {
        self.inventories.get(id)
    }

    pub fn get_mut(&mut self, id: &InventoryId) -> Option<&mut SpatialInventory> {
        self.inventories.get_mut(id)
    }

    pub fn contains(&self, id: &InventoryId) -> bool {
        self.inventories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inventories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inventories.is_empty()
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<InventoryId> {
        let mut ids: Vec<InventoryId> = self.inventories.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Lends two distinct inventories out at once. Returns `None` if the ids
    /// are equal or either is not registered.
    pub fn with_pair<R>(
        &mut self,
        first: &InventoryId,
        second: &InventoryId,
        f: impl FnOnce(&mut SpatialInventory, &mut SpatialInventory) -> R,
    ) -> Option<R> {
        if first == second || !self.inventories.contains_key(second) {
            return None;
        }
        let mut taken = self.inventories.remove(first)?;
        let output = self.inventories.get_mut(second).map(|other| f(&mut taken, other));
        self.inventories.insert(*first, taken);
        output
    }

    /// Returns the registered inventory, or builds one of `kind` through
    /// the protocol's factories and registers it. With a channel the new
    /// inventory is registered as networked.
    pub fn get_or_create(
        &mut self,
        id: InventoryId,
        kind: &str,
        width: i32,
        height: i32,
        slot_mode: SlotMode,
        channel: Option<&mut ReplicationChannel>,
    ) -> Result<&mut SpatialInventory, RegistryError> {
        if !self.inventories.contains_key(&id) {
            let inventory = self
                .protocol
                .inventory_kinds
                .create(kind, id, width, height, slot_mode)?;
            match channel {
                Some(channel) => self.register_networked(inventory, channel)?,
                None => self.register(inventory)?,
            }
        }
        self.inventories
            .get_mut(&id)
            .ok_or(RegistryError::UnknownInventory(id))
    }

    // Tick

    /// Broadcasts committed changes, and on every sync interval sends the
    /// batched property changes. Dirty flags are cleared after each sync
    /// whether or not anyone observed them.
    pub fn tick(&mut self, now: Instant, channel: &mut ReplicationChannel) {
        channel.flush(self);

        let interval = self.protocol.config.dirty_sync_interval;
        let timer = self
            .sync_timer
            .get_or_insert_with(|| Timer::new(interval, now));
        if !timer.ringing(now) {
            return;
        }
        timer.reset(now);

        channel.sync_dirty(self);
        for inventory in self.inventories.values() {
            inventory.clear_dirty();
        }
    }
}
