use std::time::Duration;

/// Contains config properties which will be used by the replication layer
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// How long a client waits for the host to answer a request before
    /// resolving it as timed out
    pub request_timeout: Duration,
    /// Interval between batched property syncs on the host
    pub dirty_sync_interval: Duration,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(5000),
            dirty_sync_interval: Duration::from_millis(100),
        }
    }
}
