// Index-based callback registry. Slots are reused through a free list and
// stamped with a generation so a stale key never removes a newer callback.

use super::control::{ChannelId, Readiness};
use super::Error;

pub type Callback = Box<dyn FnMut(ChannelId) + Send>;

/// Locates one registered callback inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    index: usize,
    generation: u32,
}

struct Slot {
    generation: u32,
    callback: Option<Callback>,
}

#[derive(Default)]
pub(crate) struct Registry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl Registry {
    pub(crate) fn insert(&mut self, callback: Callback) -> Key {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.callback = Some(callback);
            return Key {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            callback: Some(callback),
        });
        Key {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Returns false if `key` no longer names a live callback.
    pub(crate) fn remove(&mut self, key: Key) -> bool {
        let Some(slot) = self.slots.get_mut(key.index) else {
            return false;
        };
        if slot.generation != key.generation || slot.callback.is_none() {
            return false;
        }
        slot.callback = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.live -= 1;
        true
    }

    /// Invoke every live callback once, in slot order.
    pub(crate) fn fire(&mut self, channel: ChannelId) {
        if self.live == 0 {
            return;
        }
        for slot in &mut self.slots {
            if let Some(callback) = slot.callback.as_mut() {
                callback(channel);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}

/// The two callback lists of a channel, plus the pending-select markers.
#[derive(Default)]
pub(crate) struct Watchers {
    lists: [Registry; 2],
    select_pending: [bool; 2],
}

impl Watchers {
    pub(crate) fn register(&mut self, readiness: Readiness, callback: Callback) -> Key {
        self.lists[readiness.index()].insert(callback)
    }

    pub(crate) fn remove(&mut self, readiness: Readiness, key: Key) -> bool {
        self.lists[readiness.index()].remove(key)
    }

    pub(crate) fn fire(&mut self, readiness: Readiness, channel: ChannelId) {
        self.lists[readiness.index()].fire(channel)
    }

    pub(crate) fn count(&self, readiness: Readiness) -> usize {
        self.lists[readiness.index()].len()
    }

    pub(crate) fn select_pending(&self, readiness: Readiness) -> bool {
        self.select_pending[readiness.index()]
    }

    /// Register a transient select callback. One per channel and readiness.
    pub(crate) fn attach_select(
        &mut self,
        readiness: Readiness,
        callback: Callback,
    ) -> Result<Key, Error> {
        if self.select_pending(readiness) {
            return Err(Error::InvalidState(
                "channel already has a pending select for this readiness",
            ));
        }
        self.select_pending[readiness.index()] = true;
        Ok(self.register(readiness, callback))
    }

    pub(crate) fn detach_select(&mut self, readiness: Readiness, key: Key) {
        if self.remove(readiness, key) {
            self.select_pending[readiness.index()] = false;
        }
    }
}
