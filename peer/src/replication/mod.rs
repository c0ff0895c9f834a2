mod adapter;
mod memory_sync;
mod message_router;
mod transport;
mod waitlist;

pub use adapter::{PeerChanges, ReplicationAdapter};
pub use memory_sync::{MemorySyncQueue, MemorySyncStats, RateGate};
pub use message_router::{group_by_destination, MessageGroup, MessageRoute};
pub use transport::Transport;
pub use waitlist::HandleWaitlist;
