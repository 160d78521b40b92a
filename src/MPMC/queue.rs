// Channel API: put/take in four waiting modes over a shared Control.

use super::Buffer::{Buffer, HeapBuffer, Priority, RingBuffer};
use super::ChannelBuilder;
use crate::Core::control::{deadline_after, Control, Detach};
use crate::Core::{CallbackHandle, ChannelId, Error, Readiness, Rejected};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// How long an operation is willing to wait.
#[derive(Debug, Clone, Copy)]
enum Mode {
    /// Wait for the lock and for the buffer, without limit.
    Block,
    /// Wait for the lock, and for the buffer until the deadline.
    Until(Instant),
    /// Wait for the lock, try the buffer once.
    NoWait,
    /// Try the lock once, try the buffer once.
    Try,
}

impl Mode {
    fn timed(timeout: Duration) -> Self {
        match deadline_after(timeout) {
            Some(deadline) => Mode::Until(deadline),
            None => Mode::Block,
        }
    }

    /// `None` means the operation gives up instead of waiting.
    fn waits(self) -> Option<Option<Instant>> {
        match self {
            Mode::Block => Some(None),
            Mode::Until(deadline) => Some(Some(deadline)),
            Mode::NoWait | Mode::Try => None,
        }
    }
}

/// A bounded, thread-safe queue over the buffer engine `B`.
///
/// Handles are cheap to clone; every clone refers to the same channel. The
/// channel is released when the last handle is dropped.
pub struct Queue<B> {
    pub(crate) control: Arc<Control<B>>,
}

/// FIFO channel backed by a [`RingBuffer`].
pub type Channel<T> = Queue<RingBuffer<T>>;

/// Max-priority channel backed by a [`HeapBuffer`].
pub type PriorityChannel<T> = Queue<HeapBuffer<T>>;

impl<B> Clone for Queue<B> {
    fn clone(&self) -> Self {
        Self {
            control: Arc::clone(&self.control),
        }
    }
}

impl<B: Buffer> Queue<B> {
    pub(crate) fn from_buffer(buffer: B, label: Option<Box<str>>) -> Self {
        Self {
            control: Arc::new(Control::new(buffer, label)),
        }
    }

    /// Every successful write signals `NonEmpty` and fires its callbacks
    /// before the lock is released.
    fn put_entry(&self, entry: B::Entry, mode: Mode) -> Result<(), Rejected<B::Entry>> {
        let mut state = match self.control.acquire(matches!(mode, Mode::Try)) {
            Ok(state) => state,
            Err(kind) => return Err(Rejected::new(kind, entry)),
        };
        let mut entry = entry;
        loop {
            match state.buffer.write(entry) {
                Ok(()) => {
                    self.control.signal(&mut state, Readiness::NonEmpty);
                    return Ok(());
                }
                Err(back) => entry = back,
            }
            let Some(deadline) = mode.waits() else {
                return Err(Rejected::new(Error::WouldBlock, entry));
            };
            if let Err(kind) = self.control.wait(&mut state, Readiness::NonFull, deadline) {
                return Err(Rejected::new(kind, entry));
            }
        }
    }

    fn take_entry(&self, mode: Mode) -> Result<B::Item, Error> {
        let mut state = self.control.acquire(matches!(mode, Mode::Try))?;
        loop {
            if let Some(item) = state.buffer.take() {
                self.control.signal(&mut state, Readiness::NonFull);
                return Ok(item);
            }
            let Some(deadline) = mode.waits() else {
                return Err(Error::WouldBlock);
            };
            self.control.wait(&mut state, Readiness::NonEmpty, deadline)?;
        }
    }

    pub fn id(&self) -> ChannelId {
        self.control.id
    }

    pub fn label(&self) -> Option<&str> {
        self.control.label.as_deref()
    }

    pub fn capacity(&self) -> usize {
        self.control.lock().buffer.capacity()
    }

    /// Number of queued elements at the time of the call.
    pub fn len(&self) -> usize {
        self.control.lock().buffer.len()
    }

    /// Number of free slots at the time of the call.
    pub fn available(&self) -> usize {
        self.control.lock().buffer.available()
    }

    pub fn is_empty(&self) -> bool {
        self.control.lock().buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.control.lock().buffer.is_full()
    }

    /// Whether the channel currently satisfies `readiness`.
    pub fn is_ready(&self, readiness: Readiness) -> bool {
        let state = self.control.lock();
        match readiness {
            Readiness::NonEmpty => !state.buffer.is_empty(),
            Readiness::NonFull => !state.buffer.is_full(),
        }
    }
}

impl<B: Buffer + 'static> Queue<B> {
    /// Run `callback` after every successful operation that makes the channel
    /// `readiness`: each put for `NonEmpty`, each take for `NonFull`.
    ///
    /// The callback runs on the producing or consuming thread while the
    /// channel lock is held. It must be quick, must not block, and must not
    /// call back into this channel, which would deadlock.
    pub fn register_callback<F>(&self, readiness: Readiness, callback: F) -> CallbackHandle
    where
        F: FnMut(ChannelId) + Send + 'static,
    {
        let key = self.control.register(readiness, Box::new(callback));
        let weak: Weak<Control<B>> = Arc::downgrade(&self.control);
        let channel: Weak<dyn Detach> = weak;
        CallbackHandle {
            channel,
            channel_id: self.control.id,
            readiness,
            key,
        }
    }

    /// Same as [`CallbackHandle::remove`].
    pub fn remove_callback(&self, handle: CallbackHandle) -> bool {
        handle.remove()
    }

    /// Number of callbacks registered for `readiness`, including the
    /// transient ones of a pending select.
    pub fn callback_count(&self, readiness: Readiness) -> usize {
        self.control.lock().watchers.count(readiness)
    }
}

impl<T: Send> Queue<RingBuffer<T>> {
    /// FIFO channel with room for `capacity` elements.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        ChannelBuilder::new().with_capacity(capacity).build_fifo()
    }

    /// Put `value`, waiting as long as the channel is full.
    pub fn put(&self, value: T) -> Result<(), Rejected<T>> {
        self.put_entry(value, Mode::Block)
    }

    /// Put `value`, waiting at most `timeout` for room.
    pub fn timed_put(&self, value: T, timeout: Duration) -> Result<(), Rejected<T>> {
        self.put_entry(value, Mode::timed(timeout))
    }

    /// Put `value` only if the lock is free and there is room.
    pub fn try_put(&self, value: T) -> Result<(), Rejected<T>> {
        self.put_entry(value, Mode::Try)
    }

    /// Wait for the lock, then put `value` only if there is room.
    pub fn no_wait_put(&self, value: T) -> Result<(), Rejected<T>> {
        self.put_entry(value, Mode::NoWait)
    }

    /// Take the oldest element, waiting as long as the channel is empty.
    pub fn take(&self) -> Result<T, Error> {
        self.take_entry(Mode::Block)
    }

    pub fn timed_take(&self, timeout: Duration) -> Result<T, Error> {
        self.take_entry(Mode::timed(timeout))
    }

    pub fn try_take(&self) -> Result<T, Error> {
        self.take_entry(Mode::Try)
    }

    pub fn no_wait_take(&self) -> Result<T, Error> {
        self.take_entry(Mode::NoWait)
    }
}

impl<T: Send> Queue<HeapBuffer<T>> {
    /// Priority channel with room for `capacity` elements.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        ChannelBuilder::new().with_capacity(capacity).build_priority()
    }

    pub fn put(&self, priority: Priority, value: T) -> Result<(), Rejected<T>> {
        self.put_entry((priority, value), Mode::Block)
            .map_err(|rejected| rejected.map(|(_, value)| value))
    }

    pub fn timed_put(
        &self,
        priority: Priority,
        value: T,
        timeout: Duration,
    ) -> Result<(), Rejected<T>> {
        self.put_entry((priority, value), Mode::timed(timeout))
            .map_err(|rejected| rejected.map(|(_, value)| value))
    }

    pub fn try_put(&self, priority: Priority, value: T) -> Result<(), Rejected<T>> {
        self.put_entry((priority, value), Mode::Try)
            .map_err(|rejected| rejected.map(|(_, value)| value))
    }

    pub fn no_wait_put(&self, priority: Priority, value: T) -> Result<(), Rejected<T>> {
        self.put_entry((priority, value), Mode::NoWait)
            .map_err(|rejected| rejected.map(|(_, value)| value))
    }

    /// Take the highest-priority element, waiting as long as the channel is
    /// empty. Equal priorities come out in no particular order.
    pub fn take(&self) -> Result<T, Error> {
        self.take_entry(Mode::Block).map(|(_, value)| value)
    }

    pub fn timed_take(&self, timeout: Duration) -> Result<T, Error> {
        self.take_entry(Mode::timed(timeout)).map(|(_, value)| value)
    }

    pub fn try_take(&self) -> Result<T, Error> {
        self.take_entry(Mode::Try).map(|(_, value)| value)
    }

    pub fn no_wait_take(&self) -> Result<T, Error> {
        self.take_entry(Mode::NoWait).map(|(_, value)| value)
    }

    /// Like [`take`](Self::take), also returning the element's priority.
    pub fn take_with_priority(&self) -> Result<(Priority, T), Error> {
        self.take_entry(Mode::Block)
    }

    pub fn no_wait_take_with_priority(&self) -> Result<(Priority, T), Error> {
        self.take_entry(Mode::NoWait)
    }

    /// Priority of the element the next take would return.
    pub fn peek_priority(&self) -> Option<Priority> {
        self.control.lock().buffer.peek_priority()
    }
}
