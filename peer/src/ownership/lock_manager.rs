use std::collections::HashMap;

use log::error;

use crate::{actor::ActorHandle, error::LockError};

/// Reference counts of local lock wants. While an actor's count is above
/// zero its owner refuses every transfer request.
#[derive(Default)]
pub struct LockManager {
    want_counts: HashMap<ActorHandle, u32>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true on the 0 to 1 transition
    pub fn want(&mut self, handle: ActorHandle) -> bool {
        let count = self.want_counts.entry(handle).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns true on the 1 to 0 transition. An unmatched call leaves the
    /// count unchanged.
    pub fn unwant(&mut self, handle: ActorHandle, actor: &str) -> Result<bool, LockError> {
        match self.want_counts.get_mut(&handle) {
            Some(count) if *count > 1 => {
                *count -= 1;
                Ok(false)
            }
            Some(_) => {
                self.want_counts.remove(&handle);
                Ok(true)
            }
            None => {
                error!("Unmatched unwant_lock on actor {}", actor);
                Err(LockError::UnmatchedUnwant {
                    actor: actor.to_string(),
                })
            }
        }
    }

    pub fn want_count(&self, handle: ActorHandle) -> u32 {
        self.want_counts.get(&handle).copied().unwrap_or(0)
    }

    pub fn is_wanted(&self, handle: ActorHandle) -> bool {
        self.want_count(handle) > 0
    }

    pub fn forget(&mut self, handle: ActorHandle) {
        self.want_counts.remove(&handle);
    }

    pub fn clear(&mut self) {
        self.want_counts.clear();
    }
}
