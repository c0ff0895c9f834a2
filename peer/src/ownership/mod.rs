mod lock_manager;
mod pending;
mod status;
mod transfer_policy;

pub use lock_manager::LockManager;
pub use pending::{OwnershipContinuation, PendingOwnershipRequests, PendingPoll};
pub use status::{LockStatus, OwnershipStatus};
pub use transfer_policy::{
    evaluate_transfer_request, is_local_resource, shareable_record, TransferContext,
    TransferDenial, NOT_AVAILABLE_URI,
};
