use gridvault_shared::{
    InventoryError, InventoryEvent, InventoryId, InventoryRules, Item, MoveOrSwapOutcome, Slot,
    SlotMode, SpatialInventory,
};
use gridvault_test::{check_invariants, snapshot_of, Ammo, Gem, Rifle};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn placed(inventory: &mut SpatialInventory, item: Box<dyn Item>) -> gridvault_shared::ItemId {
    inventory
        .add(item)
        .expect("item should fit")
        .placed
        .expect("item should take a slot")
}

#[test]
fn four_blocks_fill_a_four_by_four_grid() {
    init_logging();
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);

    let mut slots = Vec::new();
    for _ in 0..4 {
        let id = placed(&mut inventory, Gem::boxed(2, 2));
        slots.push(inventory.slot_of(&id).unwrap());
    }
    assert_eq!(
        slots,
        vec![
            Slot::new(0, 0, 2, 2),
            Slot::new(2, 0, 2, 2),
            Slot::new(0, 2, 2, 2),
            Slot::new(2, 2, 2, 2),
        ]
    );

    let rejected = inventory.add(Gem::boxed(1, 1)).unwrap_err();
    assert_eq!(rejected.error, InventoryError::NoSpaceAvailable);
    let handed_back = rejected.into_item();
    assert_eq!(handed_back.core().container(), None);
    check_invariants(&inventory);
}

#[test]
fn swapping_neighbours_exchanges_origins() {
    init_logging();
    let mut inventory = SpatialInventory::new(InventoryId(1), 2, 2);
    let first = inventory.add_at(Gem::boxed(1, 1), 0, 0).unwrap();
    let second = inventory.add_at(Gem::boxed(1, 1), 1, 0).unwrap();
    let occupied = inventory.occupied_cell_count();

    inventory.swap(&first, &second).unwrap();

    assert_eq!(inventory.slot_of(&first), Some(Slot::new(1, 0, 1, 1)));
    assert_eq!(inventory.slot_of(&second), Some(Slot::new(0, 0, 1, 1)));
    assert_eq!(inventory.occupied_cell_count(), occupied);
    check_invariants(&inventory);
}

#[test]
fn add_tops_up_a_stack_then_places_the_rest() {
    init_logging();
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let existing = placed(&mut inventory, Ammo::boxed(40));

    let outcome = inventory.add(Ammo::boxed(30)).unwrap();

    assert_eq!(outcome.merged, 24);
    let remainder = outcome.placed.unwrap();
    assert_eq!(inventory.item(&existing).unwrap().core().stack_count(), 64);
    assert_eq!(inventory.item(&remainder).unwrap().core().stack_count(), 6);
    assert_eq!(inventory.slot_of(&remainder), Some(Slot::new(1, 0, 1, 1)));
    check_invariants(&inventory);
}

#[test]
fn different_calibers_never_merge() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    placed(&mut inventory, Box::new(Ammo::new(10, 9)));

    let outcome = inventory.add(Box::new(Ammo::new(10, 45))).unwrap();

    assert_eq!(outcome.merged, 0);
    assert_eq!(inventory.len(), 2);
}

#[test]
fn take_splits_off_an_unplaced_instance() {
    init_logging();
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let source = placed(&mut inventory, Box::new(Ammo::new(10, 45)));

    let taken = inventory.take(&source, 4).unwrap();

    assert_eq!(inventory.item(&source).unwrap().core().stack_count(), 6);
    assert!(inventory.contains(&source));
    assert_eq!(taken.core().stack_count(), 4);
    assert_eq!(taken.core().container(), None);
    assert_ne!(taken.id(), source);
    assert_eq!(*taken.downcast_ref::<Ammo>().unwrap().caliber, 45);
    check_invariants(&inventory);
}

#[test]
fn taking_a_whole_stack_removes_the_original() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let source = placed(&mut inventory, Ammo::boxed(10));

    let taken = inventory.take(&source, 10).unwrap();

    assert_eq!(taken.id(), source);
    assert!(!inventory.contains(&source));
}

#[test]
fn take_rejects_bad_amounts() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let ammo = placed(&mut inventory, Ammo::boxed(10));
    let rifle = placed(&mut inventory, Rifle::boxed(90));

    assert_eq!(inventory.take(&ammo, 0).err(), Some(InventoryError::AmountMustBePositive));
    assert_eq!(inventory.take(&ammo, 11).err(), Some(InventoryError::AmountExceedsStack));
    assert_eq!(inventory.take(&rifle, 2).err(), Some(InventoryError::AmountExceedsStack));
    assert_eq!(inventory.item(&ammo).unwrap().core().stack_count(), 10);
}

#[test]
fn failed_take_and_transfer_puts_units_back() {
    init_logging();
    let mut source = SpatialInventory::new(InventoryId(1), 4, 4);
    let mut destination = SpatialInventory::new(InventoryId(2), 1, 1);
    let ammo = placed(&mut source, Ammo::boxed(10));
    placed(&mut destination, Gem::boxed(1, 1));
    let before = (snapshot_of(&source), snapshot_of(&destination));
    source.take_events();

    let result = source.take_and_transfer_to_at(&ammo, 4, &mut destination, 0, 0);

    assert_eq!(result, Err(InventoryError::Collision));
    assert_eq!((snapshot_of(&source), snapshot_of(&destination)), before);
    assert!(source.take_events().is_empty());
    check_invariants(&source);
    check_invariants(&destination);
}

#[test]
fn take_and_place_lands_the_split_stack() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let ammo = placed(&mut inventory, Ammo::boxed(10));

    let split = inventory.take_and_place(&ammo, 3, 3, 3).unwrap();

    assert_eq!(inventory.slot_of(&split), Some(Slot::new(3, 3, 1, 1)));
    assert_eq!(inventory.item(&split).unwrap().core().stack_count(), 3);
    assert_eq!(inventory.item(&ammo).unwrap().core().stack_count(), 7);
}

struct Sealed;

impl InventoryRules for Sealed {
    fn can_receive(&self, _: &SpatialInventory, _: &dyn Item, _: &SpatialInventory) -> bool {
        false
    }
}

#[test]
fn refused_transfer_leaves_both_sides_untouched() {
    init_logging();
    let mut source = SpatialInventory::new(InventoryId(1), 4, 4);
    let mut destination = SpatialInventory::new(InventoryId(2), 4, 4).with_rules("Sealed", Sealed);
    let gem = placed(&mut source, Gem::boxed(2, 2));
    let before = snapshot_of(&source);

    assert_eq!(
        source.transfer_to(&gem, &mut destination).err(),
        Some(InventoryError::ReceiveNotAllowed)
    );
    assert_eq!(snapshot_of(&source), before);
    assert!(destination.is_empty());
    assert_eq!(
        source.item(&gem).unwrap().core().container(),
        Some(InventoryId(1))
    );
}

#[test]
fn transfer_moves_ownership() {
    let mut source = SpatialInventory::new(InventoryId(1), 4, 4);
    let mut destination = SpatialInventory::new(InventoryId(2), 4, 4);
    let rifle = placed(&mut source, Rifle::boxed(70));

    source.transfer_to_at(&rifle, &mut destination, 1, 3).unwrap();

    assert!(!source.contains(&rifle));
    assert_eq!(destination.slot_of(&rifle), Some(Slot::new(1, 3, 3, 1)));
    assert_eq!(
        destination.item(&rifle).unwrap().core().container(),
        Some(InventoryId(2))
    );
    let removed = source.take_events();
    assert!(matches!(removed.as_slice(), [.., InventoryEvent::ItemRemoved { .. }]));
}

#[test]
fn cross_inventory_swap_respects_each_slot_mode() {
    init_logging();
    let mut bag = SpatialInventory::new(InventoryId(1), 4, 4);
    let mut pouch = SpatialInventory::new(InventoryId(2), 2, 2).with_slot_mode(SlotMode::SingleCell);
    let rifle = bag.add_at(Rifle::boxed(50), 0, 0).unwrap();
    let gem = pouch.add_at(Gem::boxed(2, 2), 0, 0).unwrap();
    assert_eq!(pouch.slot_of(&gem), Some(Slot::new(0, 0, 1, 1)));

    bag.swap_between(&rifle, &mut pouch, &gem).unwrap();

    assert_eq!(bag.slot_of(&gem), Some(Slot::new(0, 0, 2, 2)));
    assert_eq!(pouch.slot_of(&rifle), Some(Slot::new(0, 0, 1, 1)));
    check_invariants(&bag);
    check_invariants(&pouch);
}

#[test]
fn move_or_swap_merges_into_a_compatible_stack() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let full = inventory.add_at(Ammo::boxed(60), 0, 0).unwrap();
    let loose = inventory.add_at(Ammo::boxed(10), 3, 3).unwrap();

    assert!(inventory.can_move_or_swap(&loose, 0, 0));
    let outcome = inventory.move_or_swap(&loose, 0, 0).unwrap();

    assert_eq!(outcome, MoveOrSwapOutcome::Merged(4));
    assert_eq!(inventory.item(&full).unwrap().core().stack_count(), 64);
    assert_eq!(inventory.item(&loose).unwrap().core().stack_count(), 6);
}

#[test]
fn move_or_swap_swaps_with_a_foreign_item() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let gem = inventory.add_at(Gem::boxed(1, 1), 0, 0).unwrap();
    let ammo = inventory.add_at(Ammo::boxed(10), 2, 2).unwrap();

    let outcome = inventory.move_or_swap(&ammo, 0, 0).unwrap();

    assert_eq!(outcome, MoveOrSwapOutcome::Swapped(gem));
    assert_eq!(inventory.slot_of(&ammo), Some(Slot::new(0, 0, 1, 1)));
    assert_eq!(inventory.slot_of(&gem), Some(Slot::new(2, 2, 1, 1)));
}

#[test]
fn auto_sort_packs_largest_first() {
    init_logging();
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    let small = inventory.add_at(Gem::boxed(1, 1), 0, 0).unwrap();
    let rifle = inventory.add_at(Rifle::boxed(10), 1, 3).unwrap();
    let big = inventory.add_at(Gem::boxed(2, 2), 2, 0).unwrap();

    inventory.auto_sort().unwrap();

    assert_eq!(inventory.slot_of(&big), Some(Slot::new(0, 0, 2, 2)));
    assert_eq!(inventory.slot_of(&rifle), Some(Slot::new(0, 2, 3, 1)));
    assert_eq!(inventory.slot_of(&small), Some(Slot::new(2, 0, 1, 1)));
    check_invariants(&inventory);
}

#[test]
fn consolidate_drains_partial_stacks() {
    let mut inventory = SpatialInventory::new(InventoryId(1), 4, 4);
    inventory.add_at(Ammo::boxed(30), 0, 0).unwrap();
    inventory.add_at(Ammo::boxed(30), 1, 0).unwrap();
    inventory.add_at(Ammo::boxed(30), 2, 0).unwrap();

    inventory.consolidate_stacks().unwrap();

    let counts: Vec<u32> = snapshot_of(&inventory).iter().map(|(_, _, count)| *count).collect();
    assert_eq!(counts.iter().sum::<u32>(), 90);
    assert_eq!(counts.len(), 2);
    check_invariants(&inventory);
}
