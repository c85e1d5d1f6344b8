use crate::{
    config::ReplicationConfig,
    inventory::{IdFactory, InventoryKinds, SizedFactory},
    item::{ItemKinds, ReplicatedItem},
};

pub mod error;
pub use error::ProtocolError;

// Protocol Plugin
pub trait ProtocolPlugin {
    fn build(&self, protocol: &mut Protocol);
}

// Protocol
/// The item and inventory kinds every peer of a session agrees on
pub struct Protocol {
    pub item_kinds: ItemKinds,
    pub inventory_kinds: InventoryKinds,
    /// Timeouts and sync intervals of the replication layer
    pub config: ReplicationConfig,
    locked: bool,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            item_kinds: ItemKinds::new(),
            inventory_kinds: InventoryKinds::new(),
            config: ReplicationConfig::default(),
            locked: false,
        }
    }
}

impl Protocol {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn add_plugin<P: ProtocolPlugin>(&mut self, plugin: P) -> &mut Self {
        self.check_lock();
        plugin.build(self);
        self
    }

    pub fn add_item<T: ReplicatedItem>(&mut self) -> &mut Self {
        self.check_lock();
        self.item_kinds.add_item::<T>();
        self
    }

    /// Registers a kind whose inventories are built from id, size and slot
    /// mode
    pub fn add_inventory_kind(&mut self, kind: &str, factory: SizedFactory) -> &mut Self {
        self.check_lock();
        self.inventory_kinds.add_sized(kind, factory);
        self
    }

    /// Registers a kind whose inventories fix their own size
    pub fn add_fixed_inventory_kind(&mut self, kind: &str, factory: IdFactory) -> &mut Self {
        self.check_lock();
        self.inventory_kinds.add_by_id(kind, factory);
        self
    }

    pub fn replication_config(&mut self, config: ReplicationConfig) -> &mut Self {
        self.check_lock();
        self.config = config;
        self
    }

    // Non-panicking builder methods

    pub fn try_add_plugin<P: ProtocolPlugin>(&mut self, plugin: P) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        plugin.build(self);
        Ok(self)
    }

    pub fn try_add_item<T: ReplicatedItem>(&mut self) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.item_kinds.add_item::<T>();
        Ok(self)
    }

    pub fn try_add_inventory_kind(
        &mut self,
        kind: &str,
        factory: SizedFactory,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.inventory_kinds.add_sized(kind, factory);
        Ok(self)
    }

    pub fn try_add_fixed_inventory_kind(
        &mut self,
        kind: &str,
        factory: IdFactory,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.inventory_kinds.add_by_id(kind, factory);
        Ok(self)
    }

    pub fn try_replication_config(
        &mut self,
        config: ReplicationConfig,
    ) -> Result<&mut Self, ProtocolError> {
        self.try_check_lock()?;
        self.config = config;
        Ok(self)
    }

    pub fn try_lock(&mut self) -> Result<(), ProtocolError> {
        self.try_check_lock()?;
        self.locked = true;
        Ok(())
    }

    pub fn lock(&mut self) {
        self.check_lock();
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Checks if protocol is locked without panicking
    /// Returns Err if protocol is locked
    pub fn try_check_lock(&self) -> Result<(), ProtocolError> {
        if self.locked {
            Err(ProtocolError::AlreadyLocked)
        } else {
            Ok(())
        }
    }

    /// Checks if protocol is locked, panics if it is
    pub fn check_lock(&self) {
        if self.locked {
            panic!("Protocol already locked!");
        }
    }

    pub fn build(&mut self) -> Self {
        std::mem::take(self)
    }
}
