// Readiness select over several channels.
//
// All candidate locks are taken in ChannelId order, the predicate is checked,
// and if nothing is ready one transient callback per channel is registered
// before any lock is released. A state change after the check therefore
// always fires a callback, so no wakeup is missed.

use super::Buffer::Buffer;
use super::Queue;
use crate::trace::trace;
use crate::Core::control::{deadline_after, State};
use crate::Core::registry::{Callback, Key};
use crate::Core::{ChannelId, Error, Readiness};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A channel that can take part in [`select_ready`]. Implemented by every
/// [`Queue`], so FIFO and priority channels of any element type can be mixed.
pub trait Selectable: Send + Sync + sealed::Watchable {}

impl<B: Buffer + 'static> Selectable for Queue<B> {}

pub(crate) mod sealed {
    use super::*;

    pub trait Watchable {
        fn channel_id(&self) -> ChannelId;
        fn lock_watch(&self) -> Box<dyn Watch + '_>;
    }

    /// A locked channel, seen only through its readiness and callback lists.
    pub trait Watch {
        fn is_ready(&self, readiness: Readiness) -> bool;
        fn attach(&mut self, readiness: Readiness, callback: Callback) -> Result<Key, Error>;
        fn detach(&mut self, readiness: Readiness, key: Key);
    }
}

use sealed::{Watch, Watchable};

impl<B: Buffer + 'static> Watchable for Queue<B> {
    fn channel_id(&self) -> ChannelId {
        self.control.id
    }

    fn lock_watch(&self) -> Box<dyn Watch + '_> {
        Box::new(self.control.lock())
    }
}

impl<B: Buffer> Watch for MutexGuard<'_, State<B>> {
    fn is_ready(&self, readiness: Readiness) -> bool {
        match readiness {
            Readiness::NonEmpty => !self.buffer.is_empty(),
            Readiness::NonFull => !self.buffer.is_full(),
        }
    }

    fn attach(&mut self, readiness: Readiness, callback: Callback) -> Result<Key, Error> {
        self.watchers.attach_select(readiness, callback)
    }

    fn detach(&mut self, readiness: Readiness, key: Key) {
        self.watchers.detach_select(readiness, key)
    }
}

/// Private wake state shared by the transient callbacks of one select.
#[derive(Default)]
struct Wake {
    fired: Mutex<Option<usize>>,
    condition: Condvar,
}

impl Wake {
    /// Runs under the firing channel's lock. Keeps the first channel recorded.
    fn record(&self, index: usize) {
        let mut fired = self.fired.lock();
        if fired.is_none() {
            *fired = Some(index);
        }
        self.condition.notify_all();
    }

    fn wait(&self, deadline: Option<Instant>) -> Option<usize> {
        let mut fired = self.fired.lock();
        while fired.is_none() {
            match deadline {
                None => self.condition.wait(&mut fired),
                Some(deadline) => {
                    if self.condition.wait_until(&mut fired, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        *fired
    }
}

/// Transient registrations; removed from every channel when dropped.
struct Registration<'a, 'c> {
    channels: &'a [&'c dyn Selectable],
    readiness: Readiness,
    entries: Vec<(usize, Key)>,
}

impl Drop for Registration<'_, '_> {
    fn drop(&mut self) {
        for (index, key) in self.entries.drain(..) {
            self.channels[index].lock_watch().detach(self.readiness, key);
        }
    }
}

/// Input indices in lock order: ascending `ChannelId`, first occurrence of
/// each channel only.
fn lock_order(channels: &[&dyn Selectable]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..channels.len()).collect();
    order.sort_by_key(|&index| channels[index].channel_id());
    order.dedup_by_key(|index| channels[*index].channel_id());
    order
}

fn select(
    channels: &[&dyn Selectable],
    readiness: Readiness,
    deadline: Option<Instant>,
) -> Result<Vec<usize>, Error> {
    if channels.is_empty() {
        return Err(Error::InvalidState("select over an empty channel set"));
    }

    let order = lock_order(channels);
    let mut guards: Vec<(usize, Box<dyn Watch + '_>)> = order
        .iter()
        .map(|&index| (index, channels[index].lock_watch()))
        .collect();

    let ready_ids: Vec<ChannelId> = guards
        .iter()
        .filter(|(_, guard)| guard.is_ready(readiness))
        .map(|(index, _)| channels[*index].channel_id())
        .collect();
    if !ready_ids.is_empty() {
        drop(guards);
        return Ok((0..channels.len())
            .filter(|&index| ready_ids.contains(&channels[index].channel_id()))
            .collect());
    }

    let wake = Arc::new(Wake::default());
    let mut entries = Vec::with_capacity(guards.len());
    let mut refused = None;
    for (index, guard) in guards.iter_mut() {
        let wake = Arc::clone(&wake);
        let index = *index;
        match guard.attach(readiness, Box::new(move |_| wake.record(index))) {
            Ok(key) => entries.push((index, key)),
            Err(err) => {
                refused = Some(err);
                break;
            }
        }
    }
    drop(guards);
    let registration = Registration {
        channels,
        readiness,
        entries,
    };
    if let Some(err) = refused {
        return Err(err);
    }
    trace!(channels = channels.len(), ?readiness, "select waiting");

    let fired = wake.wait(deadline);
    drop(registration);

    match fired {
        Some(index) => {
            trace!(index, ?readiness, "select woke");
            Ok(vec![index])
        }
        None => {
            trace!(?readiness, "select timed out");
            Err(Error::Timeout)
        }
    }
}

/// Wait until at least one of `channels` satisfies `readiness`.
///
/// Returns indices into `channels`, in input order. If some channels are
/// already ready, all of them are returned without waiting. Otherwise the
/// call sleeps and returns the single channel whose event woke it. The
/// channel is only guaranteed ready at the moment of the event; another
/// thread may have consumed it since.
///
/// A channel may take part in at most one pending select per readiness at a
/// time; a second one fails with [`Error::InvalidState`]. An empty slice is
/// also `InvalidState`. Duplicate entries are locked once.
pub fn select_ready(
    channels: &[&dyn Selectable],
    readiness: Readiness,
) -> Result<Vec<usize>, Error> {
    select(channels, readiness, None)
}

/// [`select_ready`] bounded by `timeout`; returns [`Error::Timeout`] if no
/// channel became ready in time.
pub fn timed_select_ready(
    channels: &[&dyn Selectable],
    readiness: Readiness,
    timeout: Duration,
) -> Result<Vec<usize>, Error> {
    select(channels, readiness, deadline_after(timeout))
}
