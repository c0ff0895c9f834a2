use std::{collections::VecDeque, time::Duration};

use crate::{types::MessageIndex, wrapping_number::sequence_less_than};

struct PendingSend<P> {
    index: MessageIndex,
    payload: P,
    last_sent: Option<Duration>,
}

/// Assigns sequence indices to outgoing payloads and keeps them until
/// acknowledged, handing them back out for resend when `resend_interval`
/// has passed.
pub struct ReliableSender<P> {
    next_index: MessageIndex,
    unacked: VecDeque<PendingSend<P>>,
    resend_interval: Duration,
}

impl<P> ReliableSender<P> {
    pub fn new(resend_interval: Duration) -> Self {
        Self {
            next_index: 0,
            unacked: VecDeque::new(),
            resend_interval,
        }
    }

    /// Queues a payload and returns the index it will travel with
    pub fn push(&mut self, payload: P) -> MessageIndex {
        let index = self.next_index;
        self.next_index = self.next_index.wrapping_add(1);
        self.unacked.push_back(PendingSend {
            index,
            payload,
            last_sent: None,
        });
        index
    }

    /// Indices that are waiting for an ack
    pub fn unacked_len(&self) -> usize {
        self.unacked.len()
    }

    /// Drops the payload with this index. Returns false for unknown or
    /// already acknowledged indices.
    pub fn ack(&mut self, index: MessageIndex) -> bool {
        let Some(position) = self.unacked.iter().position(|pending| pending.index == index) else {
            return false;
        };
        self.unacked.remove(position);
        true
    }

    /// Every payload never sent, or last sent at least `resend_interval`
    /// ago, oldest first. Marks them as sent at `now`.
    pub fn collect_due(&mut self, now: Duration) -> Vec<(MessageIndex, &P)> {
        let resend_interval = self.resend_interval;
        let mut output = Vec::new();
        for pending in self.unacked.iter_mut() {
            let due = match pending.last_sent {
                None => true,
                Some(last_sent) => now.saturating_sub(last_sent) >= resend_interval,
            };
            if due {
                pending.last_sent = Some(now);
                output.push((pending.index, &pending.payload));
            }
        }
        output
    }

    /// True when `index` was issued by this sender and not yet acked
    pub fn is_pending(&self, index: MessageIndex) -> bool {
        sequence_less_than(index, self.next_index)
            && self.unacked.iter().any(|pending| pending.index == index)
    }
}
