use std::collections::VecDeque;

use crate::{
    protocol::error::ReceiverError,
    types::MessageIndex,
    wrapping_number::{forward_distance, sequence_less_than},
};

/// Largest gap between the next expected index and a buffered one
pub const RECEIVE_WINDOW: u16 = 1024;

enum Slot<T> {
    NotReceived,
    Received(T),
}

/// Puts sequenced items back in send order, holding items that arrive
/// ahead of a gap until the gap is filled. Each index is delivered once.
pub struct OrderedReceiver<T> {
    buffer: VecDeque<(MessageIndex, Slot<T>)>,
    next_index: MessageIndex,
}

impl<T> OrderedReceiver<T> {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
            next_index: 0,
        }
    }

    /// Index of the next item that will be released
    pub fn next_index(&self) -> MessageIndex {
        self.next_index
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Received(_)))
            .count()
    }

    /// Accepts one item and returns every item now deliverable, in order.
    pub fn try_process(
        &mut self,
        index: MessageIndex,
        item: T,
    ) -> Result<Vec<T>, ReceiverError> {
        if sequence_less_than(index, self.next_index) {
            return Err(ReceiverError::DuplicateMessage { index });
        }

        let distance = forward_distance(self.next_index, index);
        if distance >= RECEIVE_WINDOW {
            return Err(ReceiverError::OutOfWindow {
                index,
                distance,
                window: RECEIVE_WINDOW,
            });
        }

        // Put item where it needs to go in buffer
        let position = usize::from(distance);
        while self.buffer.len() <= position {
            let filler_index = self
                .next_index
                .wrapping_add(self.buffer.len() as u16);
            self.buffer.push_back((filler_index, Slot::NotReceived));
        }
        let (slot_index, slot) = self.buffer.get_mut(position).ok_or(
            ReceiverError::BufferInconsistency {
                reason: "buffer slot not instantiated",
            },
        )?;
        if *slot_index != index {
            return Err(ReceiverError::BufferInconsistency {
                reason: "buffer slot holds a different index",
            });
        }
        if matches!(slot, Slot::Received(_)) {
            return Err(ReceiverError::DuplicateMessage { index });
        }
        *slot = Slot::Received(item);

        // Pop items out in order
        let mut output = Vec::new();
        while matches!(self.buffer.front(), Some((_, Slot::Received(_)))) {
            let Some((_, Slot::Received(item))) = self.buffer.pop_front() else {
                return Err(ReceiverError::BufferInconsistency {
                    reason: "item disappeared between check and pop",
                });
            };
            output.push(item);
            self.next_index = self.next_index.wrapping_add(1);
        }
        Ok(output)
    }
}

impl<T> Default for OrderedReceiver<T> {
    fn default() -> Self {
        Self::new()
    }
}
