use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, PoisonError, RwLock,
};

use crate::item::DiffMask;

/// Shared flag raised whenever an item inside an inventory records a change
#[derive(Clone, Debug, Default)]
pub struct DirtyFlag {
    raised: Arc<AtomicBool>,
}

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }

    pub fn lower(&self) {
        self.raised.store(false, Ordering::Relaxed);
    }
}

/// The marks a mutator held at one point in time
#[derive(Clone, Debug)]
pub(crate) struct PendingMarks {
    mask: DiffMask,
    count_dirty: bool,
}

struct MutatorData {
    mask: DiffMask,
    count_dirty: bool,
    container: Option<DirtyFlag>,
}

/// Records which properties of one item changed. Cloned into every
/// `Property` the item binds, so a write through any of them lands in the
/// same mask.
#[derive(Clone)]
pub struct PropertyMutator {
    data: Arc<RwLock<MutatorData>>,
}

impl PropertyMutator {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(MutatorData {
                mask: DiffMask::new(),
                count_dirty: false,
                container: None,
            })),
        }
    }

    pub fn mutate(&self, property_index: u8) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.mask.set_bit(property_index, true);
        if let Some(flag) = &data.container {
            flag.raise();
        }
    }

    pub(crate) fn mutate_count(&self) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.count_dirty = true;
        if let Some(flag) = &data.container {
            flag.raise();
        }
    }

    pub fn is_dirty(&self) -> bool {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.count_dirty || !data.mask.is_clear()
    }

    pub fn diff_mask(&self) -> DiffMask {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .mask
            .clone()
    }

    /// Returns the pending property indices and the stack count mark, then
    /// clears both
    pub(crate) fn take_changes(&self) -> (Vec<u8>, bool) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let indices = data.mask.indices();
        let count_dirty = data.count_dirty;
        data.mask.clear();
        data.count_dirty = false;
        (indices, count_dirty)
    }

    pub(crate) fn pending(&self) -> PendingMarks {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        PendingMarks {
            mask: data.mask.clone(),
            count_dirty: data.count_dirty,
        }
    }

    /// Puts back marks captured by `pending`, dropping any made since
    pub(crate) fn restore(&self, marks: PendingMarks) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.mask = marks.mask;
        data.count_dirty = marks.count_dirty;
        if data.count_dirty || !data.mask.is_clear() {
            if let Some(flag) = &data.container {
                flag.raise();
            }
        }
    }

    pub(crate) fn clear(&self) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.mask.clear();
        data.count_dirty = false;
    }

    pub(crate) fn attach(&self, flag: &DirtyFlag) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.container = Some(flag.clone());
    }

    pub(crate) fn detach(&self) {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data.container = None;
    }
}

impl Default for PropertyMutator {
    fn default() -> Self {
        Self::new()
    }
}
