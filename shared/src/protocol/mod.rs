mod actor_message;
mod envelope;
mod error;
mod ordered_receiver;
mod reliable_sender;
mod rpc;

pub use actor_message::{ActorMessage, RemoteMessage};
pub use envelope::Envelope;
pub use error::{ProtocolError, ReceiverError};
pub use ordered_receiver::{OrderedReceiver, RECEIVE_WINDOW};
pub use reliable_sender::ReliableSender;
pub use rpc::Rpc;
