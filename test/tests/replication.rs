use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};

use gridvault_shared::{
    BitWriter, Dispatch, InventoryError, InventoryEvent, InventoryId, InventoryRules, Item,
    ItemId, NetworkMode, Packet, PacketHeader, PeerId, Protocol, RequestId, ResponseReceiveKey,
    Serde, SessionStatus, Slot, SlotMode, SpatialInventory, Transport, UnsignedInteger,
    DEFAULT_INVENTORY_KIND,
};
use gridvault_test::{check_invariants, pump, snapshot_of, Ammo, Gem, LocalHub, Node, Rifle};

const BAG: InventoryId = InventoryId(10);
const CHEST: InventoryId = InventoryId(11);
const HOST: PeerId = PeerId(1);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session(clients: u64) -> (LocalHub, Node, Vec<Node>) {
    init_logging();
    let hub = LocalHub::new();
    let host = Node::host(&hub, HOST);
    let clients = (0..clients)
        .map(|index| Node::client(&hub, PeerId(index + 2)))
        .collect();
    (hub, host, clients)
}

fn host_inventory(host: &mut Node, inventory: SpatialInventory) {
    host.registry
        .register_networked(inventory, &mut host.channel)
        .unwrap();
}

fn subscribe_all(hub: &LocalHub, host: &mut Node, clients: &mut [Node], inventory: InventoryId, now: Instant) {
    for client in clients.iter() {
        host.channel
            .subscribe(&mut host.registry, &inventory, client.peer)
            .unwrap();
    }
    settle(hub, host, clients, now);
}

fn settle(hub: &LocalHub, host: &mut Node, clients: &mut [Node], now: Instant) {
    let mut nodes: Vec<&mut Node> = vec![host];
    nodes.extend(clients.iter_mut());
    pump(hub, &mut nodes, now);
}

fn pending(dispatch: Dispatch) -> ResponseReceiveKey {
    match dispatch {
        Dispatch::Pending(key) => key,
        Dispatch::Applied => panic!("request should have gone to the host"),
    }
}

fn host_add_at(host: &mut Node, inventory: &InventoryId, item: Box<dyn Item>, x: i32, y: i32) -> ItemId {
    host.registry
        .get_mut(inventory)
        .unwrap()
        .add_at(item, x, y)
        .unwrap()
}

#[test]
fn client_request_round_trips_through_the_host() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);
    let client = &mut clients[0];
    assert_eq!(
        client.registry.get(&BAG).unwrap().slot_of(&gem),
        Some(Slot::new(0, 0, 1, 1))
    );

    let dispatch = client
        .channel
        .request_move(&mut client.registry, &BAG, &gem, 3, 3, now)
        .unwrap();
    let key = pending(dispatch);
    assert_eq!(client.channel.receive_response(&key), None);

    settle(&hub, &mut host, &mut clients, now);

    let client = &mut clients[0];
    assert_eq!(client.channel.receive_response(&key), Some(Ok(())));
    assert_eq!(
        client.registry.get(&BAG).unwrap().slot_of(&gem),
        Some(Slot::new(3, 3, 1, 1))
    );
    assert_eq!(
        snapshot_of(client.registry.get(&BAG).unwrap()),
        snapshot_of(host.registry.get(&BAG).unwrap())
    );
}

#[test]
fn host_failure_status_reaches_the_caller() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let first = host_add_at(&mut host, &BAG, Gem::boxed(2, 2), 0, 0);
    host_add_at(&mut host, &BAG, Gem::boxed(2, 2), 2, 0);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    let client = &mut clients[0];
    let key = pending(
        client
            .channel
            .request_move(&mut client.registry, &BAG, &first, 1, 0, now)
            .unwrap(),
    );
    settle(&hub, &mut host, &mut clients, now);

    assert_eq!(
        clients[0].channel.receive_response(&key),
        Some(Err(InventoryError::Collision))
    );
}

#[test]
fn direct_mutation_on_a_mirror_fails_without_traffic() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);
    let sent = hub.sent_count();

    let mirror = clients[0].registry.get_mut(&BAG).unwrap();
    assert!(!mirror.has_authority());
    assert_eq!(mirror.move_item(&gem, 1, 1), Err(InventoryError::NoAuthority));
    assert_eq!(mirror.slot_of(&gem), Some(Slot::new(0, 0, 1, 1)));
    assert_eq!(hub.sent_count(), sent);
}

static INSERT_CHECKS: AtomicUsize = AtomicUsize::new(0);

struct CountedRules;

impl InventoryRules for CountedRules {
    fn can_insert(&self, _: &SpatialInventory, _: &dyn Item) -> bool {
        INSERT_CHECKS.fetch_add(1, Ordering::SeqCst);
        true
    }
}

fn counted(id: InventoryId, width: i32, height: i32, slot_mode: SlotMode) -> SpatialInventory {
    SpatialInventory::new(id, width, height)
        .with_slot_mode(slot_mode)
        .with_rules("Counted", CountedRules)
}

fn counted_protocol() -> Protocol {
    let mut protocol = gridvault_test::protocol();
    protocol.add_inventory_kind("Counted", counted);
    protocol
}

#[test]
fn subscribers_replay_adds_without_running_rules() {
    let now = Instant::now();
    let hub = LocalHub::new();
    init_logging();
    let mut host = Node::with_protocol(&hub, HOST, SessionStatus::Host, counted_protocol());
    let mut clients: Vec<Node> = (2..5)
        .map(|peer| {
            Node::with_protocol(
                &hub,
                PeerId(peer),
                SessionStatus::Client,
                counted_protocol(),
            )
        })
        .collect();
    host_inventory(&mut host, counted(BAG, 4, 4, SlotMode::Sized));
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);
    for client in clients.iter_mut() {
        let mirror = client.registry.get_mut(&BAG).unwrap();
        assert_eq!(mirror.kind(), "Counted");
        mirror.take_events();
    }

    let gem = host_add_at(&mut host, &BAG, Gem::boxed(2, 1), 1, 1);
    let checks = INSERT_CHECKS.load(Ordering::SeqCst);
    let host_events = host.registry.get_mut(&BAG).unwrap().take_events();
    assert_eq!(
        host_events,
        vec![InventoryEvent::ItemAdded {
            item: gem,
            slot: Slot::new(1, 1, 2, 1)
        }]
    );

    host.tick(now);
    settle(&hub, &mut host, &mut clients, now);

    for client in clients.iter_mut() {
        let mirror = client.registry.get_mut(&BAG).unwrap();
        assert_eq!(mirror.take_events(), host_events);
        check_invariants(mirror);
    }
    assert_eq!(INSERT_CHECKS.load(Ordering::SeqCst), checks);
}

#[test]
fn late_subscriber_receives_full_state() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 5, 3).with_slot_mode(SlotMode::Sized));
    let ammo = host_add_at(&mut host, &BAG, Box::new(Ammo::new(33, 45)), 4, 2);
    let rifle = host_add_at(&mut host, &BAG, Rifle::boxed(12), 0, 0);
    host.tick(now);

    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    let mirror = clients[0].registry.get(&BAG).unwrap();
    assert_eq!((mirror.width(), mirror.height()), (5, 3));
    assert_eq!(snapshot_of(mirror), snapshot_of(host.registry.get(&BAG).unwrap()));
    assert_eq!(*mirror.get::<Ammo>(&ammo).unwrap().caliber, 45);
    assert_eq!(*mirror.get::<Rifle>(&rifle).unwrap().durability, 12);
    assert_eq!(mirror.item(&ammo).unwrap().core().container(), Some(BAG));
}

#[test]
fn unsubscribed_callers_get_no_answer() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    let client = &mut clients[0];
    client
        .registry
        .get_or_create(BAG, DEFAULT_INVENTORY_KIND, 4, 4, SlotMode::Sized, Some(&mut client.channel))
        .unwrap();

    let key = pending(
        client
            .channel
            .request_move(&mut client.registry, &BAG, &gem, 2, 2, now)
            .unwrap(),
    );
    settle(&hub, &mut host, &mut clients, now);

    assert!(clients[0].channel.is_pending(&key));
    assert_eq!(clients[0].channel.receive_response(&key), None);
    assert_eq!(
        host.registry.get(&BAG).unwrap().slot_of(&gem),
        Some(Slot::new(0, 0, 1, 1))
    );

    let later = now + Duration::from_millis(5000);
    clients[0].update(later);
    assert_eq!(
        clients[0].channel.receive_response(&key),
        Some(Err(InventoryError::RequestTimeout))
    );
}

#[test]
fn late_response_after_timeout_is_dropped() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    let client = &mut clients[0];
    let key = pending(
        client
            .channel
            .request_move(&mut client.registry, &BAG, &gem, 2, 2, now)
            .unwrap(),
    );

    // the host stalls past the timeout
    let timeout = client.config().request_timeout;
    client.update(now + timeout - Duration::from_millis(1));
    assert!(client.channel.is_pending(&key));
    client.update(now + timeout);
    assert_eq!(
        client.channel.receive_response(&key),
        Some(Err(InventoryError::RequestTimeout))
    );

    let later = now + timeout + Duration::from_millis(10);
    settle(&hub, &mut host, &mut clients, later);

    let client = &mut clients[0];
    assert_eq!(client.channel.receive_response(&key), None);
    // execution on the host could not be cancelled, and its broadcast still applies
    assert_eq!(
        client.registry.get(&BAG).unwrap().slot_of(&gem),
        Some(Slot::new(2, 2, 1, 1))
    );
}

#[test]
fn requests_for_unknown_inventories_are_rejected() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    let client = &mut clients[0];
    client
        .registry
        .get_or_create(InventoryId(99), DEFAULT_INVENTORY_KIND, 2, 2, SlotMode::Sized, Some(&mut client.channel))
        .unwrap();

    let key = pending(
        client
            .channel
            .request_auto_sort(&mut client.registry, &InventoryId(99), now)
            .unwrap(),
    );
    settle(&hub, &mut host, &mut clients, now);

    assert_eq!(
        clients[0].channel.receive_response(&key),
        Some(Err(InventoryError::RequestRejected))
    );
}

#[test]
fn malformed_requests_get_a_generic_rejection() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let client_peer = clients[0].peer;

    let mut writer = BitWriter::new();
    PacketHeader::Request {
        request_id: RequestId(77),
        inventory: BAG,
    }
    .ser(&mut writer);
    // no request kind uses tag 7
    UnsignedInteger::<3>::new(7).ser(&mut writer);
    hub.inject(client_peer, HOST, writer.to_bytes());

    host.update(now);

    let (from, payload) = clients[0].channel.transport_mut().receive().unwrap();
    assert_eq!(from, HOST);
    assert_eq!(
        Packet::read(&payload).unwrap(),
        Packet::Response {
            request_id: RequestId(77),
            result: Err(InventoryError::RequestRejected),
        }
    );
}

#[test]
fn transfer_request_moves_between_host_inventories() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    host_inventory(&mut host, SpatialInventory::new(CHEST, 6, 2));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(2, 2), 1, 1);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);
    subscribe_all(&hub, &mut host, &mut clients, CHEST, now);

    let client = &mut clients[0];
    let key = pending(
        client
            .channel
            .request_transfer(&mut client.registry, &BAG, &gem, &CHEST, Some((4, 0)), now)
            .unwrap(),
    );
    settle(&hub, &mut host, &mut clients, now);

    let client = &mut clients[0];
    assert_eq!(client.channel.receive_response(&key), Some(Ok(())));
    assert!(!client.registry.get(&BAG).unwrap().contains(&gem));
    assert_eq!(
        client.registry.get(&CHEST).unwrap().slot_of(&gem),
        Some(Slot::new(4, 0, 2, 2))
    );
    assert_eq!(
        client.registry.get(&CHEST).unwrap().item(&gem).unwrap().core().container(),
        Some(CHEST)
    );
}

#[test]
fn transfer_to_a_missing_destination_fails() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    let client = &mut clients[0];
    let key = pending(
        client
            .channel
            .request_transfer(&mut client.registry, &BAG, &gem, &InventoryId(404), None, now)
            .unwrap(),
    );
    settle(&hub, &mut host, &mut clients, now);

    assert_eq!(
        clients[0].channel.receive_response(&key),
        Some(Err(InventoryError::DestinationNull))
    );
    assert!(host.registry.get(&BAG).unwrap().contains(&gem));
}

#[test]
fn take_request_places_the_split_and_syncs_the_count() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let ammo = host_add_at(&mut host, &BAG, Box::new(Ammo::new(10, 45)), 0, 0);
    host.tick(now);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    let client = &mut clients[0];
    let key = pending(
        client
            .channel
            .request_take(&mut client.registry, &BAG, &ammo, 4, 3, 3, now)
            .unwrap(),
    );
    settle(&hub, &mut host, &mut clients, now);
    assert_eq!(clients[0].channel.receive_response(&key), Some(Ok(())));

    let mirror = clients[0].registry.get(&BAG).unwrap();
    let split = mirror.item_at(3, 3).unwrap();
    assert_eq!(mirror.item(&split).unwrap().core().stack_count(), 4);
    assert_eq!(*mirror.get::<Ammo>(&split).unwrap().caliber, 45);

    // the source count arrives with the next property sync
    let sync_at = now + host.config().dirty_sync_interval;
    host.tick(sync_at);
    settle(&hub, &mut host, &mut clients, sync_at);

    let mirror = clients[0].registry.get_mut(&BAG).unwrap();
    assert_eq!(mirror.item(&ammo).unwrap().core().stack_count(), 6);
    assert!(mirror
        .take_events()
        .contains(&InventoryEvent::StackChanged { item: ammo, count: 6 }));
    assert_eq!(snapshot_of(mirror), snapshot_of(host.registry.get(&BAG).unwrap()));
}

#[test]
fn property_changes_are_batched_per_interval() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(2);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let ammo = host_add_at(&mut host, &BAG, Box::new(Ammo::new(10, 45)), 0, 0);
    let rifle = host_add_at(&mut host, &BAG, Rifle::boxed(100), 0, 1);
    host.tick(now);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    {
        let inventory = host.registry.get_mut(&BAG).unwrap();
        inventory.get_mut::<Ammo>(&ammo).unwrap().caliber.set(9);
        *inventory.get_mut::<Rifle>(&rifle).unwrap().durability = 80;
        assert!(inventory.is_dirty());
    }

    let early = now + Duration::from_millis(50);
    host.tick(early);
    for client in &clients {
        assert_eq!(hub.queued_for(&client.peer), 0);
    }

    let sync_at = now + host.config().dirty_sync_interval;
    host.tick(sync_at);
    for client in &clients {
        assert_eq!(hub.queued_for(&client.peer), 1);
    }
    assert!(!host.registry.get(&BAG).unwrap().is_dirty());
    settle(&hub, &mut host, &mut clients, sync_at);

    for client in &clients {
        let mirror = client.registry.get(&BAG).unwrap();
        assert_eq!(*mirror.get::<Ammo>(&ammo).unwrap().caliber, 9);
        assert_eq!(*mirror.get::<Rifle>(&rifle).unwrap().durability, 80);
    }
}

#[test]
fn adds_replay_in_the_slot_they_were_made_in() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 2, 2));
    let resident = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 1, 0);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    let added = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    {
        let inventory = host.registry.get_mut(&BAG).unwrap();
        inventory.move_item(&resident, 0, 1).unwrap();
        inventory.move_item(&added, 1, 0).unwrap();
    }
    let passing = host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    host.registry.get_mut(&BAG).unwrap().remove(&passing).unwrap();
    host.tick(now);
    settle(&hub, &mut host, &mut clients, now);

    let mirror = clients[0].registry.get(&BAG).unwrap();
    assert_eq!(mirror.slot_of(&added), Some(Slot::new(1, 0, 1, 1)));
    assert_eq!(mirror.slot_of(&resident), Some(Slot::new(0, 1, 1, 1)));
    assert!(!mirror.contains(&passing));
    assert_eq!(snapshot_of(mirror), snapshot_of(host.registry.get(&BAG).unwrap()));
    check_invariants(mirror);
}

#[test]
fn dirty_flags_clear_without_observers() {
    let now = Instant::now();
    let (_hub, mut host, _clients) = session(0);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let rifle = host_add_at(&mut host, &BAG, Rifle::boxed(100), 0, 0);
    host.tick(now);

    *host
        .registry
        .get_mut(&BAG)
        .unwrap()
        .get_mut::<Rifle>(&rifle)
        .unwrap()
        .durability = 1;
    assert!(host.registry.get(&BAG).unwrap().is_dirty());

    host.tick(now + host.config().dirty_sync_interval);
    assert!(!host.registry.get(&BAG).unwrap().is_dirty());
}

#[test]
fn global_inventories_reach_every_peer() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(2);
    let mut stash = SpatialInventory::new(BAG, 3, 3).with_network_mode(NetworkMode::Global);
    let gem = stash.add_at(Gem::boxed(1, 1), 2, 2).unwrap();
    host_inventory(&mut host, stash);
    settle(&hub, &mut host, &mut clients, now);

    for client in &clients {
        let mirror = client.registry.get(&BAG).unwrap();
        assert_eq!(mirror.slot_of(&gem), Some(Slot::new(2, 2, 1, 1)));
    }

    let rifle = host_add_at(&mut host, &BAG, Rifle::boxed(5), 0, 0);
    host.tick(now);
    settle(&hub, &mut host, &mut clients, now);

    for client in &clients {
        assert!(client.registry.get(&BAG).unwrap().contains(&rifle));
    }
}

#[test]
fn switching_to_global_pushes_a_snapshot() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(2);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    let gem = host_add_at(&mut host, &BAG, Gem::boxed(2, 2), 0, 0);
    host.tick(now);
    settle(&hub, &mut host, &mut clients, now);
    assert!(clients.iter().all(|client| !client.registry.contains(&BAG)));

    host.channel
        .set_network_mode(&mut host.registry, &BAG, NetworkMode::Global)
        .unwrap();
    settle(&hub, &mut host, &mut clients, now);

    for client in &clients {
        assert!(client.registry.get(&BAG).unwrap().contains(&gem));
    }
}

#[test]
fn host_side_clear_and_sort_replicate() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(1);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    host_add_at(&mut host, &BAG, Gem::boxed(1, 1), 0, 0);
    host_add_at(&mut host, &BAG, Gem::boxed(2, 2), 2, 2);
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);

    host.registry.get_mut(&BAG).unwrap().auto_sort().unwrap();
    host.tick(now);
    settle(&hub, &mut host, &mut clients, now);
    assert_eq!(
        snapshot_of(clients[0].registry.get(&BAG).unwrap()),
        snapshot_of(host.registry.get(&BAG).unwrap())
    );

    let removed = host.registry.get_mut(&BAG).unwrap().clear_all().unwrap();
    assert_eq!(removed.len(), 2);
    host.tick(now);
    settle(&hub, &mut host, &mut clients, now);
    assert!(clients[0].registry.get(&BAG).unwrap().is_empty());
}

#[test]
fn disconnected_peers_stop_observing() {
    let now = Instant::now();
    let (hub, mut host, mut clients) = session(2);
    host_inventory(&mut host, SpatialInventory::new(BAG, 4, 4));
    subscribe_all(&hub, &mut host, &mut clients, BAG, now);
    let gone = clients[1].peer;

    hub.disconnect(&gone);
    host.channel.peer_disconnected(&mut host.registry, &gone);

    let inventory = host.registry.get(&BAG).unwrap();
    assert!(!inventory.is_subscribed(&gone));
    assert!(inventory.is_subscribed(&clients[0].peer));
}

#[test]
fn locally_owned_inventories_apply_immediately() {
    let now = Instant::now();
    let (hub, _host, mut clients) = session(1);
    let client = &mut clients[0];
    let mut local = SpatialInventory::new(InventoryId(5), 3, 3);
    let gem = local.add_at(Gem::boxed(1, 1), 0, 0).unwrap();
    client.registry.register(local).unwrap();
    let sent = hub.sent_count();

    let dispatch = client
        .channel
        .request_move(&mut client.registry, &InventoryId(5), &gem, 2, 2, now)
        .unwrap();

    assert_eq!(dispatch, Dispatch::Applied);
    assert_eq!(
        client.registry.get(&InventoryId(5)).unwrap().slot_of(&gem),
        Some(Slot::new(2, 2, 1, 1))
    );
    assert_eq!(hub.sent_count(), sent);
}
