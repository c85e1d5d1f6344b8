use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    grid::{GridOccupancyIndex, Slot},
    inventory::{
        events::InventoryChange, AddError, DefaultRules, InventoryError, InventoryEvent,
        InventoryResult, InventoryRules,
    },
    item::{DirtyFlag, Item},
    protocol::ProtocolError,
    session::SessionAccessor,
    types::{InventoryId, ItemId, NetworkMode, PeerId, SlotMode},
};

/// Kind name of an inventory built without custom rules
pub const DEFAULT_INVENTORY_KIND: &str = "SpatialInventory";

pub(super) struct Entry {
    pub(super) item: Box<dyn Item>,
    pub(super) slot: Slot,
}

#[derive(Clone, Copy)]
pub(super) struct JournalMark {
    events: usize,
    changes: usize,
}

/// Result of a successful `add`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOutcome {
    /// Units merged into stacks already in the inventory
    pub merged: u32,
    /// The entry created for the unmerged remainder. `None` when the whole
    /// stack was merged and the incoming instance was consumed.
    pub placed: Option<ItemId>,
}

pub(crate) struct AddPlan {
    merges: Vec<(ItemId, u32)>,
    remainder: u32,
    slot: Option<Slot>,
}

/// A fixed-size grid holding non-overlapping rectangular items
pub struct SpatialInventory {
    pub(super) id: InventoryId,
    pub(super) kind: String,
    pub(super) width: i32,
    pub(super) height: i32,
    pub(super) slot_mode: SlotMode,
    pub(super) occupancy: GridOccupancyIndex,
    pub(super) entries: HashMap<ItemId, Entry>,
    pub(super) rules: Box<dyn InventoryRules>,
    session: Option<SessionAccessor>,
    bypass: bool,
    events: Vec<InventoryEvent>,
    changes: Vec<InventoryChange>,
    dirty: DirtyFlag,
    network_mode: NetworkMode,
    subscribers: HashSet<PeerId>,
}

impl SpatialInventory {
    /// # Panics
    ///
    /// Panics if `width` or `height` is less than 1. Consider using
    /// `try_new` for non-panicking construction.
    pub fn new(id: InventoryId, width: i32, height: i32) -> Self {
        Self::try_new(id, width, height).expect("inventory width and height must be at least 1")
    }

    pub fn try_new(id: InventoryId, width: i32, height: i32) -> Result<Self, ProtocolError> {
        if width < 1 || height < 1 {
            return Err(ProtocolError::InvalidDimensions { width, height });
        }
        // both dimensions are positive here
        let occupancy = GridOccupancyIndex::new(width as usize, height as usize);

        Ok(Self {
            id,
            kind: DEFAULT_INVENTORY_KIND.to_string(),
            width,
            height,
            slot_mode: SlotMode::default(),
            occupancy,
            entries: HashMap::new(),
            rules: Box::new(DefaultRules),
            session: None,
            bypass: false,
            events: Vec::new(),
            changes: Vec::new(),
            dirty: DirtyFlag::new(),
            network_mode: NetworkMode::default(),
            subscribers: HashSet::new(),
        })
    }

    pub fn with_slot_mode(mut self, slot_mode: SlotMode) -> Self {
        self.slot_mode = slot_mode;
        self
    }

    /// Installs domain rules. `kind` names them on the wire so mirrors are
    /// rebuilt with the same rules.
    pub fn with_rules<R: InventoryRules + 'static>(mut self, kind: &str, rules: R) -> Self {
        self.kind = kind.to_string();
        self.rules = Box::new(rules);
        self
    }

    pub fn with_network_mode(mut self, network_mode: NetworkMode) -> Self {
        self.network_mode = network_mode;
        self
    }

    // Accessors

    pub fn id(&self) -> InventoryId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn slot_mode(&self) -> SlotMode {
        self.slot_mode
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.network_mode
    }

    pub fn is_networked(&self) -> bool {
        self.session.is_some()
    }

    pub fn subscribers(&self) -> impl Iterator<Item = &PeerId> {
        self.subscribers.iter()
    }

    pub fn is_subscribed(&self, peer: &PeerId) -> bool {
        self.subscribers.contains(peer)
    }

    /// Resolved on every call, never stored
    pub fn has_authority(&self) -> bool {
        if self.bypass {
            return true;
        }
        match &self.session {
            None => true,
            Some(session) => session.status().has_authority(),
        }
    }

    /// Drains the notifications fired since the last call
    pub fn take_events(&mut self) -> Vec<InventoryEvent> {
        std::mem::take(&mut self.events)
    }

    // Queries

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.entries.contains_key(item)
    }

    pub fn slot_of(&self, item: &ItemId) -> Option<Slot> {
        self.entries.get(item).map(|entry| entry.slot)
    }

    pub fn item(&self, item: &ItemId) -> Option<&dyn Item> {
        self.entries.get(item).map(|entry| entry.item.as_ref())
    }

    pub fn item_mut(&mut self, item: &ItemId) -> Option<&mut dyn Item> {
        self.entries.get_mut(item).map(|entry| entry.item.as_mut())
    }

    pub fn get<T: Item>(&self, item: &ItemId) -> Option<&T> {
        self.item(item)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Item>(&mut self, item: &ItemId) -> Option<&mut T> {
        self.item_mut(item)?.downcast_mut::<T>()
    }

    /// Every entry, top row first then left to right
    pub fn items(&self) -> Vec<(ItemId, Slot)> {
        let mut output: Vec<(ItemId, Slot)> = self
            .entries
            .iter()
            .map(|(id, entry)| (*id, entry.slot))
            .collect();
        output.sort_by_key(|(_, slot)| slot.reading_order());
        output
    }

    pub(crate) fn ordered_ids(&self) -> Vec<ItemId> {
        self.items().into_iter().map(|(id, _)| id).collect()
    }

    pub fn item_at(&self, x: i32, y: i32) -> Option<ItemId> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        if !self.occupancy.is_occupied(x as usize, y as usize) {
            return None;
        }
        self.entries
            .iter()
            .find(|(_, entry)| entry.slot.contains_cell(x, y))
            .map(|(id, _)| *id)
    }

    /// Items whose slots intersect `area`, in reading order
    pub fn items_overlapping(&self, area: Slot) -> Vec<ItemId> {
        let mut output: Vec<(ItemId, Slot)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.slot.overlaps(&area))
            .map(|(id, entry)| (*id, entry.slot))
            .collect();
        output.sort_by_key(|(_, slot)| slot.reading_order());
        output.into_iter().map(|(id, _)| id).collect()
    }

    pub fn occupied_cell_count(&self) -> usize {
        self.occupancy.occupied_count()
    }

    pub fn free_cell_count(&self) -> usize {
        self.occupancy.width() * self.occupancy.height() - self.occupancy.occupied_count()
    }

    /// Size `item` takes up in this inventory
    pub fn effective_size(&self, item: &dyn Item) -> (i32, i32) {
        match self.slot_mode {
            SlotMode::Sized => item.core().size(),
            SlotMode::SingleCell => (1, 1),
        }
    }

    /// Whether `item` could sit at `(x, y)` if the items in `exclude` were
    /// not there
    pub fn can_place_at(&self, item: &dyn Item, x: i32, y: i32, exclude: &[ItemId]) -> bool {
        let (width, height) = self.effective_size(item);
        self.check_placement(item, Slot::new(x, y, width, height), exclude)
            .is_ok()
    }

    /// First free rectangle of the given size, ignoring rules
    pub fn find_space_for(&self, width: i32, height: i32) -> Option<Slot> {
        if width < 1 || height < 1 || width > self.width || height > self.height {
            return None;
        }
        for y in 0..=self.height - height {
            for x in 0..=self.width - width {
                let slot = Slot::new(x, y, width, height);
                if self.occupancy_free(slot) {
                    return Some(slot);
                }
            }
        }
        None
    }

    pub fn can_add(&self, item: &dyn Item) -> bool {
        self.has_authority() && self.plan_add(item).is_ok()
    }

    // Validation

    pub(super) fn ensure_authority(&self) -> InventoryResult<()> {
        if self.has_authority() {
            Ok(())
        } else {
            Err(InventoryError::NoAuthority)
        }
    }

    pub(super) fn entry(&self, item: &ItemId) -> InventoryResult<&Entry> {
        if item.is_nil() {
            return Err(InventoryError::NullItem);
        }
        self.entries.get(item).ok_or(InventoryError::NotPresent)
    }

    pub(super) fn check_bounds(&self, slot: Slot) -> InventoryResult<()> {
        if slot.fits_within(self.width, self.height) {
            Ok(())
        } else {
            Err(InventoryError::OutOfBounds)
        }
    }

    pub(super) fn region_free(&self, slot: Slot, exclude: &[ItemId]) -> bool {
        if exclude.is_empty() {
            return self.occupancy_free(slot);
        }
        !self
            .entries
            .iter()
            .any(|(id, entry)| !exclude.contains(id) && entry.slot.overlaps(&slot))
    }

    pub(super) fn check_placement(
        &self,
        item: &dyn Item,
        slot: Slot,
        exclude: &[ItemId],
    ) -> InventoryResult<()> {
        self.check_bounds(slot)?;
        if !self.region_free(slot, exclude) {
            return Err(InventoryError::Collision);
        }
        if !self.rules.can_place_at(self, item, slot) {
            return Err(InventoryError::PlacementNotAllowed);
        }
        Ok(())
    }

    // Identity, count range and insert rule
    pub(super) fn check_incoming(&self, item: &dyn Item) -> InventoryResult<()> {
        if item.id().is_nil() {
            return Err(InventoryError::NullItem);
        }
        if self.entries.contains_key(&item.id()) {
            return Err(InventoryError::AlreadyPresent);
        }
        let core = item.core();
        if core.stack_count() == 0 || core.stack_count() > core.max_stack_size() {
            return Err(InventoryError::InvalidStackCount);
        }
        if !self.rules.can_insert(self, item) {
            return Err(InventoryError::InsertNotAllowed);
        }
        Ok(())
    }

    // Row-major scan for the first free, rule-compliant rectangle
    pub(super) fn first_fit(&self, item: &dyn Item, size: (i32, i32)) -> Option<Slot> {
        let (width, height) = size;
        if width > self.width || height > self.height {
            return None;
        }
        for y in 0..=self.height - height {
            for x in 0..=self.width - width {
                let slot = Slot::new(x, y, width, height);
                if self.occupancy_free(slot) && self.rules.can_place_at(self, item, slot) {
                    return Some(slot);
                }
            }
        }
        None
    }

    fn occupancy_free(&self, slot: Slot) -> bool {
        let (x, y, w, h) = cells(slot);
        self.occupancy.is_free(x, y, w, h)
    }

    // Primitives. These assume validation already happened and never fire
    // events.

    pub(super) fn attach(&mut self, mut item: Box<dyn Item>, slot: Slot) {
        let (x, y, w, h) = cells(slot);
        self.occupancy.fill(x, y, w, h);
        item.core_mut().set_container(Some(self.id));
        item.core().mutator().attach(&self.dirty);
        self.entries.insert(item.id(), Entry { item, slot });
    }

    pub(super) fn detach(&mut self, item: &ItemId) -> Option<Entry> {
        let mut entry = self.entries.remove(item)?;
        let (x, y, w, h) = cells(entry.slot);
        self.occupancy.clear(x, y, w, h);
        entry.item.core_mut().set_container(None);
        entry.item.core().mutator().detach();
        Some(entry)
    }

    pub(super) fn relocate(&mut self, item: &ItemId, to: Slot) -> Option<Slot> {
        let entry = self.entries.get_mut(item)?;
        let from = entry.slot;
        entry.slot = to;
        let (x, y, w, h) = cells(from);
        self.occupancy.clear(x, y, w, h);
        let (x, y, w, h) = cells(to);
        self.occupancy.fill(x, y, w, h);
        Some(from)
    }

    pub(super) fn emit(&mut self, event: InventoryEvent) {
        self.events.push(event);
    }

    // Changes only matter to a networked inventory acting on its own
    fn is_recording(&self) -> bool {
        self.session.is_some() && !self.bypass
    }

    pub(super) fn record(&mut self, change: InventoryChange) {
        if self.is_recording() {
            self.changes.push(change);
        }
    }

    // The entry is serialized now, in the slot and state it was added with
    pub(super) fn record_added(&mut self, item: &ItemId) {
        if !self.is_recording() {
            return;
        }
        if let Some(entry) = self.serialized_entry(item) {
            self.changes.push(InventoryChange::Added(entry));
        }
    }

    pub(super) fn record_snapshot(&mut self) {
        if self.is_recording() {
            let state = self.state_sync();
            self.changes.push(InventoryChange::Snapshot(state));
        }
    }

    pub(super) fn mark(&self) -> JournalMark {
        JournalMark {
            events: self.events.len(),
            changes: self.changes.len(),
        }
    }

    pub(super) fn rollback_journal(&mut self, mark: JournalMark) {
        self.events.truncate(mark.events);
        self.changes.truncate(mark.changes);
    }

    pub(super) fn with_bypass<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.bypass;
        self.bypass = true;
        let output = f(self);
        self.bypass = previous;
        output
    }

    // Add

    pub(crate) fn plan_add(&self, item: &dyn Item) -> InventoryResult<AddPlan> {
        self.check_incoming(item)?;

        let mut remaining = item.core().stack_count();
        let mut merges = Vec::new();
        if item.core().is_stackable() {
            for id in self.ordered_ids() {
                if remaining == 0 {
                    break;
                }
                let Some(entry) = self.entries.get(&id) else {
                    continue;
                };
                let existing = entry.item.as_ref();
                let free = existing.core().free_capacity();
                if free == 0 || !existing.core().is_stackable() {
                    continue;
                }
                if !self.rules.can_stack(self, existing, item) {
                    continue;
                }
                let moved = free.min(remaining);
                merges.push((id, moved));
                remaining -= moved;
            }
        }

        let slot = if remaining > 0 {
            let size = self.effective_size(item);
            let Some(slot) = self.first_fit(item, size) else {
                return Err(InventoryError::NoSpaceAvailable);
            };
            Some(slot)
        } else {
            None
        };

        Ok(AddPlan {
            merges,
            remainder: remaining,
            slot,
        })
    }

    pub(crate) fn apply_add(&mut self, mut item: Box<dyn Item>, plan: AddPlan) -> AddOutcome {
        let mut merged = 0;
        for (id, amount) in plan.merges {
            self.grow_stack(&id, amount);
            merged += amount;
        }

        let placed = match plan.slot {
            Some(slot) => {
                item.core_mut().set_stack_count(plan.remainder);
                item.core().mutator().clear();
                let id = item.id();
                self.attach(item, slot);
                self.emit(InventoryEvent::ItemAdded { item: id, slot });
                self.record_added(&id);
                Some(id)
            }
            None => {
                debug!("{} fully merged into {}", item.id(), self.id);
                None
            }
        };

        AddOutcome { merged, placed }
    }

    /// Adds `item`, first topping up compatible stacks in reading order, then
    /// placing any remainder at the first free position. The remainder keeps
    /// the incoming instance and its id.
    pub fn add(&mut self, item: Box<dyn Item>) -> Result<AddOutcome, AddError> {
        if let Err(error) = self.ensure_authority() {
            return Err(AddError::new(error, item));
        }
        match self.plan_add(item.as_ref()) {
            Ok(plan) => Ok(self.apply_add(item, plan)),
            Err(error) => Err(AddError::new(error, item)),
        }
    }

    /// Places `item` at `(x, y)` without merging
    pub fn add_at(&mut self, item: Box<dyn Item>, x: i32, y: i32) -> Result<ItemId, AddError> {
        let (width, height) = self.effective_size(item.as_ref());
        self.add_in_slot(item, Slot::new(x, y, width, height))
    }

    /// Places `item` in exactly `slot`, whose size must match the item's
    /// effective size
    pub fn add_in_slot(&mut self, item: Box<dyn Item>, slot: Slot) -> Result<ItemId, AddError> {
        if let Err(error) = self.ensure_authority() {
            return Err(AddError::new(error, item));
        }
        if let Err(error) = self.plan_add_in_slot(item.as_ref(), slot) {
            return Err(AddError::new(error, item));
        }
        Ok(self.apply_add_in_slot(item, slot))
    }

    pub(crate) fn plan_add_in_slot(&self, item: &dyn Item, slot: Slot) -> InventoryResult<()> {
        self.check_incoming(item)?;
        if slot.size() != self.effective_size(item) {
            return Err(InventoryError::SlotSizeMismatch);
        }
        self.check_placement(item, slot, &[])
    }

    pub(crate) fn apply_add_in_slot(&mut self, item: Box<dyn Item>, slot: Slot) -> ItemId {
        item.core().mutator().clear();
        let id = item.id();
        self.attach(item, slot);
        self.emit(InventoryEvent::ItemAdded { item: id, slot });
        self.record_added(&id);
        id
    }

    // Remove

    pub fn remove(&mut self, item: &ItemId) -> InventoryResult<Box<dyn Item>> {
        self.ensure_authority()?;
        let entry = self.entry(item)?;
        if !self.rules.can_remove(self, entry.item.as_ref()) {
            return Err(InventoryError::RemoveNotAllowed);
        }
        self.remove_committed(item)
    }

    pub(super) fn remove_committed(&mut self, item: &ItemId) -> InventoryResult<Box<dyn Item>> {
        let Some(entry) = self.detach(item) else {
            return Err(InventoryError::NotPresent);
        };
        entry.item.core().mutator().clear();
        self.emit(InventoryEvent::ItemRemoved {
            item: *item,
            slot: entry.slot,
        });
        self.record(InventoryChange::Removed(*item));
        Ok(entry.item)
    }

    // Move

    pub fn move_item(&mut self, item: &ItemId, x: i32, y: i32) -> InventoryResult<()> {
        self.ensure_authority()?;
        let target = self.plan_move(item, x, y)?;
        self.apply_move(item, target);
        Ok(())
    }

    pub(super) fn plan_move(&self, item: &ItemId, x: i32, y: i32) -> InventoryResult<Slot> {
        let entry = self.entry(item)?;
        let target = entry.slot.moved_to(x, y);
        self.check_placement(entry.item.as_ref(), target, &[*item])?;
        Ok(target)
    }

    pub(super) fn apply_move(&mut self, item: &ItemId, target: Slot) {
        if self.slot_of(item) == Some(target) {
            return;
        }
        let Some(from) = self.relocate(item, target) else {
            return;
        };
        self.emit(InventoryEvent::ItemMoved {
            item: *item,
            from,
            to: target,
        });
        self.record(InventoryChange::Moved {
            item: *item,
            x: target.x,
            y: target.y,
        });
    }

    // Stack counts

    pub(super) fn grow_stack(&mut self, item: &ItemId, amount: u32) {
        let Some(entry) = self.entries.get_mut(item) else {
            return;
        };
        let count = entry.item.core().stack_count() + amount;
        entry.item.core_mut().set_stack_count(count);
        self.emit(InventoryEvent::StackChanged { item: *item, count });
    }

    // Removes the entry once it reaches zero
    pub(super) fn shrink_stack(&mut self, item: &ItemId, amount: u32) {
        let Some(entry) = self.entries.get_mut(item) else {
            return;
        };
        let count = entry.item.core().stack_count().saturating_sub(amount);
        if count == 0 {
            let _ = self.remove_committed(item);
            return;
        }
        entry.item.core_mut().set_stack_count(count);
        self.emit(InventoryEvent::StackChanged { item: *item, count });
    }

    // Clear

    /// Empties the inventory without consulting any rule, handing back every
    /// item it held
    pub fn clear_all(&mut self) -> InventoryResult<Vec<Box<dyn Item>>> {
        self.ensure_authority()?;
        Ok(self.clear_committed())
    }

    pub(super) fn clear_committed(&mut self) -> Vec<Box<dyn Item>> {
        let mut output = Vec::with_capacity(self.entries.len());
        for id in self.ordered_ids() {
            if let Some(entry) = self.entries.remove(&id) {
                let mut item = entry.item;
                item.core_mut().set_container(None);
                item.core().mutator().detach();
                item.core().mutator().clear();
                output.push(item);
            }
        }
        self.occupancy.clear_all();
        self.emit(InventoryEvent::Cleared);
        self.record(InventoryChange::Cleared);
        output
    }

    // Replication hooks

    pub(crate) fn bind_session(&mut self, session: Option<SessionAccessor>) {
        self.session = session;
    }

    pub(crate) fn set_network_mode(&mut self, network_mode: NetworkMode) {
        self.network_mode = network_mode;
    }

    pub(crate) fn add_subscriber(&mut self, peer: PeerId) -> bool {
        self.subscribers.insert(peer)
    }

    pub(crate) fn remove_subscriber(&mut self, peer: &PeerId) -> bool {
        self.subscribers.remove(peer)
    }

    pub(crate) fn take_changes(&mut self) -> Vec<InventoryChange> {
        std::mem::take(&mut self.changes)
    }

    pub(crate) fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_raised()
    }

    pub(crate) fn clear_dirty(&self) {
        self.dirty.lower();
    }
}

// Slots reaching here are validated, so every field is non-negative
pub(super) fn cells(slot: Slot) -> (usize, usize, usize, usize) {
    (
        slot.x as usize,
        slot.y as usize,
        slot.width as usize,
        slot.height as usize,
    )
}
