use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use log::{debug, warn};

use crate::{
    inventory::{InventoryError, InventoryResult},
    types::RequestId,
};

/// Handle to the eventual result of a request sent to the host
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResponseReceiveKey {
    request_id: RequestId,
}

impl ResponseReceiveKey {
    pub(crate) fn new(request_id: RequestId) -> Self {
        Self { request_id }
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

/// Tracks requests awaiting a response. A request resolves exactly once,
/// either with the host's answer or with a timeout. A result nobody takes
/// is dropped one timeout after it resolved.
#[derive(Default)]
pub(crate) struct RequestManager {
    next_id: u32,
    pending: HashMap<RequestId, Instant>,
    resolved: HashMap<RequestId, (Instant, InventoryResult<()>)>,
}

impl RequestManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_request_id(&mut self, now: Instant) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.insert(id, now);
        id
    }

    /// Returns false for an id that is not pending, which includes ids that
    /// already timed out
    pub fn complete(
        &mut self,
        request_id: RequestId,
        result: InventoryResult<()>,
        now: Instant,
    ) -> bool {
        if self.pending.remove(&request_id).is_none() {
            debug!("dropping late or unknown response for request {:?}", request_id);
            return false;
        }
        self.resolved.insert(request_id, (now, result));
        true
    }

    pub fn expire(&mut self, now: Instant, timeout: Duration) {
        self.resolved.retain(|id, (resolved_at, _)| {
            let keep = now.saturating_duration_since(*resolved_at) < timeout;
            if !keep {
                debug!("discarding unclaimed result of request {:?}", id);
            }
            keep
        });

        let expired: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, sent_at)| now.saturating_duration_since(**sent_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            warn!("request {:?} timed out", id);
            self.pending.remove(&id);
            self.resolved.insert(id, (now, Err(InventoryError::RequestTimeout)));
        }
    }

    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.pending.contains_key(request_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn take(&mut self, request_id: &RequestId) -> Option<InventoryResult<()>> {
        self.resolved.remove(request_id).map(|(_, result)| result)
    }

    #[cfg(test)]
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}
