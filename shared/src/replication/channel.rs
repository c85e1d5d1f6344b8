use std::time::Instant;

use log::{debug, info, warn};

use gridvault_serde::{BitReader, Serde};

use crate::{
    config::ReplicationConfig,
    inventory::{InventoryChange, InventoryError, InventoryResult, SpatialInventory},
    messages::{InventoryMessage, InventoryRequest, Packet, PacketHeader, StateSync},
    registry::{Registry, RegistryError},
    replication::{
        handlers,
        request_manager::{RequestManager, ResponseReceiveKey},
        Transport,
    },
    session::SessionAccessor,
    types::{InventoryId, ItemId, NetworkMode, PeerId, RequestId},
};

/// How a request issued through the channel was carried out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The local process had authority and the operation already ran
    Applied,
    /// The request is on its way to the host
    Pending(ResponseReceiveKey),
}

/// Routes inventory operations between the host and its clients. The host
/// executes requests and broadcasts what changed, clients forward requests
/// and apply the host's broadcasts to their mirrors.
pub struct ReplicationChannel {
    transport: Box<dyn Transport>,
    requests: RequestManager,
    config: ReplicationConfig,
}

impl ReplicationChannel {
    pub fn new<T: Transport + 'static>(transport: T, config: ReplicationConfig) -> Self {
        Self {
            transport: Box::new(transport),
            requests: RequestManager::new(),
            config,
        }
    }

    pub fn session(&self) -> SessionAccessor {
        self.transport.session()
    }

    pub fn is_host(&self) -> bool {
        self.transport.session().status().is_host()
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    // Requests

    /// Runs `request` locally when this process has authority over
    /// `inventory`, otherwise sends it to the host. A pending request
    /// resolves through `receive_response` once the host answers or the
    /// request times out.
    pub fn request(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        request: InventoryRequest,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        let Some(target) = registry.get(inventory) else {
            return Err(InventoryError::RequestRejected);
        };

        if target.has_authority() {
            handlers::execute(registry, inventory, &request)?;
            self.flush(registry);
            return Ok(Dispatch::Applied);
        }

        let Some(host) = self.transport.host_peer() else {
            return Err(InventoryError::NoAuthority);
        };
        let request_id = self.requests.create_request_id(now);
        debug!("sending {} for {} as {:?}", request.name(), inventory, request_id);
        let packet = Packet::Request {
            request_id,
            inventory: *inventory,
            request,
        };
        self.transport.send(&host, &packet.to_bytes());

        Ok(Dispatch::Pending(ResponseReceiveKey::new(request_id)))
    }

    pub fn request_move(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        item: &ItemId,
        x: i32,
        y: i32,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        let request = InventoryRequest::Move { item: *item, x, y };
        self.request(registry, inventory, request, now)
    }

    pub fn request_swap(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        first: &ItemId,
        second: &ItemId,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        let request = InventoryRequest::Swap {
            first: *first,
            second: *second,
        };
        self.request(registry, inventory, request, now)
    }

    /// With `at` set the item lands exactly there, otherwise it merges into
    /// the destination like `add`
    pub fn request_transfer(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        item: &ItemId,
        destination: &InventoryId,
        at: Option<(i32, i32)>,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        let request = InventoryRequest::Transfer {
            item: *item,
            destination: *destination,
            at,
        };
        self.request(registry, inventory, request, now)
    }

    pub fn request_take(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        item: &ItemId,
        amount: u32,
        x: i32,
        y: i32,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        let request = InventoryRequest::Take {
            item: *item,
            amount,
            x,
            y,
        };
        self.request(registry, inventory, request, now)
    }

    pub fn request_combine_stacks(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        source: &ItemId,
        destination: &ItemId,
        amount: u32,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        let request = InventoryRequest::CombineStacks {
            source: *source,
            destination: *destination,
            amount,
        };
        self.request(registry, inventory, request, now)
    }

    pub fn request_auto_sort(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        self.request(registry, inventory, InventoryRequest::AutoSort, now)
    }

    pub fn request_consolidate(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        now: Instant,
    ) -> InventoryResult<Dispatch> {
        self.request(registry, inventory, InventoryRequest::Consolidate, now)
    }

    /// Takes the result of a request once it resolved. Returns `None` while
    /// the request is still in flight.
    pub fn receive_response(&mut self, key: &ResponseReceiveKey) -> Option<InventoryResult<()>> {
        self.requests.take(&key.request_id())
    }

    pub fn is_pending(&self, key: &ResponseReceiveKey) -> bool {
        self.requests.is_pending(&key.request_id())
    }

    // Incoming

    /// Processes everything the transport received, then times out requests
    /// the host never answered
    pub fn update(&mut self, registry: &mut Registry, now: Instant) {
        while let Some((peer, payload)) = self.transport.receive() {
            self.process_packet(registry, peer, &payload, now);
        }
        self.requests.expire(now, self.config.request_timeout);
    }

    fn process_packet(&mut self, registry: &mut Registry, peer: PeerId, payload: &[u8], now: Instant) {
        let mut reader = BitReader::new(payload);
        let header = match PacketHeader::de(&mut reader) {
            Ok(header) => header,
            Err(error) => {
                warn!("dropping malformed packet from {}: {}", peer, error);
                return;
            }
        };

        match Packet::read_body(header, &mut reader) {
            Ok(Packet::Request {
                request_id,
                inventory,
                request,
            }) => self.handle_request(registry, peer, request_id, inventory, request),
            Ok(Packet::Response { request_id, result }) => {
                self.requests.complete(request_id, result, now);
            }
            Ok(Packet::Broadcast { inventory, message }) => {
                self.apply_broadcast(registry, peer, inventory, message)
            }
            Err(error) => {
                warn!("malformed {:?} from {}: {}", header, peer, error);
                if let PacketHeader::Request { request_id, .. } = header {
                    if self.is_host() {
                        self.respond(&peer, request_id, Err(InventoryError::RequestRejected));
                    }
                }
            }
        }
    }

    fn handle_request(
        &mut self,
        registry: &mut Registry,
        peer: PeerId,
        request_id: RequestId,
        inventory: InventoryId,
        request: InventoryRequest,
    ) {
        if !self.is_host() {
            debug!("ignoring {} from {} while not hosting", request.name(), peer);
            return;
        }

        let Some(target) = registry.get(&inventory) else {
            self.respond(&peer, request_id, Err(InventoryError::RequestRejected));
            return;
        };
        // Unauthorized callers get no answer at all
        if target.network_mode() == NetworkMode::Subscribers && !target.is_subscribed(&peer) {
            info!(
                "dropping {} for {} from unsubscribed {}",
                request.name(),
                inventory,
                peer
            );
            return;
        }

        let result = handlers::execute(registry, &inventory, &request);
        debug!("{} from {} on {}: {:?}", request.name(), peer, inventory, result);
        self.flush(registry);
        self.respond(&peer, request_id, result);
    }

    fn respond(&mut self, peer: &PeerId, request_id: RequestId, result: InventoryResult<()>) {
        let packet = Packet::Response { request_id, result };
        self.transport.send(peer, &packet.to_bytes());
    }

    fn apply_broadcast(
        &mut self,
        registry: &mut Registry,
        peer: PeerId,
        inventory: InventoryId,
        message: InventoryMessage,
    ) {
        if self.is_host() || self.transport.host_peer() != Some(peer) {
            warn!("ignoring broadcast for {} from {}", inventory, peer);
            return;
        }

        match message {
            InventoryMessage::ItemAdded(entry) => {
                let item = match registry.instantiate(&entry) {
                    Ok(item) => item,
                    Err(error) => {
                        warn!("cannot rebuild {} for {}: {}", entry.item, inventory, error);
                        return;
                    }
                };
                if let Some(mirror) = mirror(registry, &inventory) {
                    mirror.replay_added(item, entry.slot);
                }
            }
            InventoryMessage::ItemRemoved { item } => {
                if let Some(mirror) = mirror(registry, &inventory) {
                    mirror.replay_removed(&item);
                }
            }
            InventoryMessage::ItemMoved { item, x, y } => {
                if let Some(mirror) = mirror(registry, &inventory) {
                    mirror.replay_moved(&item, x, y);
                }
            }
            InventoryMessage::ItemsSwapped {
                first,
                first_at,
                second,
                second_at,
            } => {
                if let Some(mirror) = mirror(registry, &inventory) {
                    mirror.replay_swapped(&first, first_at, &second, second_at);
                }
            }
            InventoryMessage::ItemDataChangedList(changes) => {
                if let Some(mirror) = mirror(registry, &inventory) {
                    for change in &changes {
                        mirror.replay_item_data(&change.item, &change.properties);
                    }
                }
            }
            InventoryMessage::StateSync(state) => self.apply_state_sync(registry, inventory, state),
            InventoryMessage::ClearAll => {
                if let Some(mirror) = mirror(registry, &inventory) {
                    mirror.replay_cleared();
                }
            }
        }
    }

    // A snapshot replaces the mirror's contents, creating the mirror first
    // when this process has not seen the inventory yet
    fn apply_state_sync(&mut self, registry: &mut Registry, inventory: InventoryId, state: StateSync) {
        let mismatched = registry.get(&inventory).is_some_and(|existing| {
            existing.kind() != state.kind
                || existing.width() != state.width
                || existing.height() != state.height
                || existing.slot_mode() != state.slot_mode
        });
        if mismatched {
            info!("rebuilding mirror of {} to match the host", inventory);
            registry.unregister(&inventory);
        }

        let mut entries = Vec::with_capacity(state.entries.len());
        for entry in &state.entries {
            match registry.instantiate(entry) {
                Ok(item) => entries.push((item, entry.slot)),
                Err(error) => warn!("cannot rebuild {} for {}: {}", entry.item, inventory, error),
            }
        }

        let mirror = match registry.get_or_create(
            inventory,
            &state.kind,
            state.width,
            state.height,
            state.slot_mode,
            Some(self),
        ) {
            Ok(mirror) => mirror,
            Err(error) => {
                warn!("cannot mirror {}: {}", inventory, error);
                return;
            }
        };
        mirror.replay_snapshot(entries);
    }

    // Outgoing

    /// Broadcasts every change committed since the last flush. Only the host
    /// broadcasts; anywhere else the recorded changes are discarded.
    pub fn flush(&mut self, registry: &mut Registry) {
        let hosting = self.is_host();
        for id in registry.ids() {
            let Some(inventory) = registry.get_mut(&id) else {
                continue;
            };
            if !inventory.has_pending_changes() {
                continue;
            }
            let changes = inventory.take_changes();
            if !hosting {
                continue;
            }
            for change in changes {
                self.send_to_observers(inventory, change_message(change));
            }
        }
    }

    /// Sends one batched list of changed item properties per dirty
    /// inventory. Clearing the inventories' dirty flags is left to the
    /// caller.
    pub fn sync_dirty(&mut self, registry: &Registry) {
        if !self.is_host() {
            return;
        }
        for id in registry.ids() {
            let Some(inventory) = registry.get(&id) else {
                continue;
            };
            if !inventory.is_networked() || !inventory.is_dirty() {
                continue;
            }
            let changes = inventory.take_item_data();
            if changes.is_empty() {
                continue;
            }
            debug!("syncing {} changed items of {}", changes.len(), id);
            self.send_to_observers(inventory, InventoryMessage::ItemDataChangedList(changes));
        }
    }

    fn send_to_observers(&mut self, inventory: &SpatialInventory, message: InventoryMessage) {
        let payload = Packet::Broadcast {
            inventory: inventory.id(),
            message,
        }
        .to_bytes();

        match inventory.network_mode() {
            NetworkMode::Global => self.transport.broadcast(&payload, &|_| true),
            NetworkMode::Subscribers => {
                let local = self.transport.local_peer();
                for peer in inventory.subscribers() {
                    if *peer != local {
                        self.transport.send(peer, &payload);
                    }
                }
            }
        }
    }

    fn send_snapshot(&mut self, inventory: &SpatialInventory, peer: &PeerId) {
        let packet = Packet::Broadcast {
            inventory: inventory.id(),
            message: InventoryMessage::StateSync(inventory.state_sync()),
        };
        self.transport.send(peer, &packet.to_bytes());
    }

    /// Pushes a full snapshot of `inventory` to every connected peer
    pub(crate) fn send_snapshot_to_all(&mut self, inventory: &SpatialInventory) {
        let packet = Packet::Broadcast {
            inventory: inventory.id(),
            message: InventoryMessage::StateSync(inventory.state_sync()),
        };
        info!("pushing snapshot of {} to all peers", inventory.id());
        self.transport.broadcast(&packet.to_bytes(), &|_| true);
    }

    // Subscribers

    /// Adds `peer` to the subscribers of `inventory`. On the host the peer
    /// immediately receives a full snapshot.
    pub fn subscribe(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        peer: PeerId,
    ) -> Result<(), RegistryError> {
        if !registry.contains(inventory) {
            return Err(RegistryError::UnknownInventory(*inventory));
        }
        self.flush(registry);

        let Some(target) = registry.get_mut(inventory) else {
            return Err(RegistryError::UnknownInventory(*inventory));
        };
        target.add_subscriber(peer);
        if self.is_host() {
            info!("{} subscribed to {}", peer, inventory);
            self.send_snapshot(target, &peer);
        }
        Ok(())
    }

    /// Returns whether `peer` was subscribed
    pub fn unsubscribe(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        peer: &PeerId,
    ) -> Result<bool, RegistryError> {
        let Some(target) = registry.get_mut(inventory) else {
            return Err(RegistryError::UnknownInventory(*inventory));
        };
        Ok(target.remove_subscriber(peer))
    }

    /// Switching to `Global` on the host pushes a snapshot to every peer
    pub fn set_network_mode(
        &mut self,
        registry: &mut Registry,
        inventory: &InventoryId,
        network_mode: NetworkMode,
    ) -> Result<(), RegistryError> {
        if !registry.contains(inventory) {
            return Err(RegistryError::UnknownInventory(*inventory));
        }
        self.flush(registry);

        let Some(target) = registry.get_mut(inventory) else {
            return Err(RegistryError::UnknownInventory(*inventory));
        };
        let previous = target.network_mode();
        target.set_network_mode(network_mode);
        if network_mode == NetworkMode::Global && previous != NetworkMode::Global && self.is_host() {
            self.send_snapshot_to_all(target);
        }
        Ok(())
    }

    /// Forgets `peer` as a subscriber of every inventory
    pub fn peer_disconnected(&mut self, registry: &mut Registry, peer: &PeerId) {
        for id in registry.ids() {
            if let Some(inventory) = registry.get_mut(&id) {
                if inventory.remove_subscriber(peer) {
                    debug!("{} no longer observes {}", peer, id);
                }
            }
        }
    }
}

fn mirror<'r>(registry: &'r mut Registry, inventory: &InventoryId) -> Option<&'r mut SpatialInventory> {
    let mirror = registry.get_mut(inventory);
    if mirror.is_none() {
        debug!("no mirror of {} to update", inventory);
    }
    mirror
}

fn change_message(change: InventoryChange) -> InventoryMessage {
    match change {
        InventoryChange::Added(entry) => InventoryMessage::ItemAdded(entry),
        InventoryChange::Removed(item) => InventoryMessage::ItemRemoved { item },
        InventoryChange::Moved { item, x, y } => InventoryMessage::ItemMoved { item, x, y },
        InventoryChange::Swapped {
            first,
            first_at,
            second,
            second_at,
        } => InventoryMessage::ItemsSwapped {
            first,
            first_at,
            second,
            second_at,
        },
        InventoryChange::Cleared => InventoryMessage::ClearAll,
        InventoryChange::Snapshot(state) => InventoryMessage::StateSync(state),
    }
}
