use std::sync::{Arc, PoisonError, RwLock};

/// Role of the local process in the current session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    /// No active session. Every inventory is locally authoritative.
    Offline,
    /// This process is the host and owns canonical state
    Host,
    /// This process mirrors the host's state
    Client,
}

impl SessionStatus {
    /// Authority with no active session fails open
    pub fn has_authority(&self) -> bool {
        match self {
            SessionStatus::Offline | SessionStatus::Host => true,
            SessionStatus::Client => false,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, SessionStatus::Host)
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, SessionStatus::Offline)
    }
}

// SessionChannel
#[derive(Clone)]
struct SessionChannel {
    data: Arc<RwLock<SessionStatus>>,
}

impl SessionChannel {
    fn status(&self) -> SessionStatus {
        *self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SessionStatus) {
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

/// Creates the writer/reader pair for a process's session status. The
/// transport keeps the mutator, inventories keep accessors.
pub fn new_session_channel(status: SessionStatus) -> (SessionMutator, SessionAccessor) {
    let channel = SessionChannel {
        data: Arc::new(RwLock::new(status)),
    };

    let mutator = SessionMutator {
        channel: channel.clone(),
    };
    let accessor = SessionAccessor { channel };

    (mutator, accessor)
}

// SessionAccessor
#[derive(Clone)]
pub struct SessionAccessor {
    channel: SessionChannel,
}

impl SessionAccessor {
    pub fn status(&self) -> SessionStatus {
        self.channel.status()
    }
}

// SessionMutator
// no Clone necessary
pub struct SessionMutator {
    channel: SessionChannel,
}

impl SessionMutator {
    pub fn set_status(&self, status: SessionStatus) {
        self.channel.set_status(status);
    }

    pub fn accessor(&self) -> SessionAccessor {
        SessionAccessor {
            channel: self.channel.clone(),
        }
    }
}
