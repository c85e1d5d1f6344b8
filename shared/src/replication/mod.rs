mod channel;
mod handlers;
mod request_manager;
mod transport;

pub use channel::{Dispatch, ReplicationChannel};
pub use request_manager::ResponseReceiveKey;
pub use transport::Transport;
