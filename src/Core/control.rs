// Per-channel synchronization: one mutex guarding the buffer and the callback
// lists, one condition per readiness.

use super::registry::{Callback, Key, Watchers};
use super::Error;
use crate::trace::trace;
use crossbeam_utils::CachePadded;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;
use std::time::{Duration, Instant};

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a channel. Also the lock order used by select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    fn next() -> Self {
        Self(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn for_tests(raw: u64) -> Self {
        Self(raw)
    }
}

/// The event a callback or select waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Readiness {
    /// The channel holds at least one element.
    NonEmpty,
    /// The channel has at least one free slot.
    NonFull,
}

impl Readiness {
    pub(crate) fn index(self) -> usize {
        match self {
            Readiness::NonEmpty => 0,
            Readiness::NonFull => 1,
        }
    }
}

/// Deadline for a timed operation, computed once at entry.
/// A timeout too large to represent waits forever.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

pub(crate) struct State<B> {
    pub(crate) buffer: B,
    pub(crate) watchers: Watchers,
}

pub(crate) struct Control<B> {
    pub(crate) id: ChannelId,
    pub(crate) label: Option<Box<str>>,
    state: CachePadded<Mutex<State<B>>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<B> Control<B> {
    pub(crate) fn new(buffer: B, label: Option<Box<str>>) -> Self {
        Self {
            id: ChannelId::next(),
            label,
            state: CachePadded::new(Mutex::new(State {
                buffer,
                watchers: Watchers::default(),
            })),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State<B>> {
        self.state.lock()
    }

    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, State<B>>> {
        self.state.try_lock()
    }

    /// Blocks for the lock unless `contend` is set, in which case a busy lock
    /// is reported as `Contended`.
    pub(crate) fn acquire(&self, contend: bool) -> Result<MutexGuard<'_, State<B>>, Error> {
        if contend {
            self.try_lock().ok_or(Error::Contended)
        } else {
            Ok(self.state.lock())
        }
    }

    fn condition(&self, readiness: Readiness) -> &Condvar {
        match readiness {
            Readiness::NonEmpty => &self.not_empty,
            Readiness::NonFull => &self.not_full,
        }
    }

    /// Broadcast `readiness`, then run its callbacks. Caller still holds the lock.
    pub(crate) fn signal(&self, state: &mut State<B>, readiness: Readiness) {
        self.condition(readiness).notify_all();
        state.watchers.fire(readiness, self.id);
    }

    /// Sleep until `readiness` is signalled, or until `deadline`.
    /// Wakeups may be spurious; callers re-check the buffer.
    pub(crate) fn wait(
        &self,
        state: &mut MutexGuard<'_, State<B>>,
        readiness: Readiness,
        deadline: Option<Instant>,
    ) -> Result<(), Error> {
        let condition = self.condition(readiness);
        match deadline {
            None => {
                condition.wait(state);
                Ok(())
            }
            Some(deadline) => {
                if condition.wait_until(state, deadline).timed_out() {
                    trace!(channel = self.id.as_u64(), ?readiness, "wait timed out");
                    Err(Error::Timeout)
                } else {
                    Ok(())
                }
            }
        }
    }

    pub(crate) fn register(&self, readiness: Readiness, callback: Callback) -> Key {
        let key = self.lock().watchers.register(readiness, callback);
        trace!(channel = self.id.as_u64(), ?readiness, "callback registered");
        key
    }
}

/// Type-erased removal path from a [`CallbackHandle`] back to its channel.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, readiness: Readiness, key: Key) -> bool;
}

impl<B: Send> Detach for Control<B> {
    fn detach(&self, readiness: Readiness, key: Key) -> bool {
        let removed = self.lock().watchers.remove(readiness, key);
        trace!(channel = self.id.as_u64(), ?readiness, removed, "callback removed");
        removed
    }
}

/// A registered notification callback.
///
/// Dropping the handle leaves the callback registered; call
/// [`CallbackHandle::remove`] to stop it.
#[must_use = "dropping the handle makes the callback impossible to remove"]
pub struct CallbackHandle {
    pub(crate) channel: Weak<dyn Detach>,
    pub(crate) channel_id: ChannelId,
    pub(crate) readiness: Readiness,
    pub(crate) key: Key,
}

impl CallbackHandle {
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Unregister the callback. Once this returns, the callback will not run
    /// again. Returns false if it was already gone (channel dropped).
    pub fn remove(self) -> bool {
        match self.channel.upgrade() {
            Some(channel) => channel.detach(self.readiness, self.key),
            None => false,
        }
    }
}
