// Storage engines behind a channel. No locking here: every method runs
// under the owning channel's mutex.

/// Priority attached to entries of a heap-backed channel. Larger is served first.
pub type Priority = i32;

/// Fixed-capacity element storage.
///
/// `write` never grows the storage. A full buffer hands the entry back so the
/// caller can wait and retry without losing it.
pub trait Buffer: Send {
    /// What a write consumes.
    type Entry;
    /// What a take produces.
    type Item;

    fn capacity(&self) -> usize;

    /// Number of occupied slots.
    fn len(&self) -> usize;

    fn write(&mut self, entry: Self::Entry) -> Result<(), Self::Entry>;

    fn take(&mut self) -> Option<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Number of free slots.
    fn available(&self) -> usize {
        self.capacity() - self.len()
    }
}

/// Reserve exactly `capacity` slots or report why not.
pub(crate) fn reserve_slots<E>(capacity: usize) -> Result<Vec<E>, crate::Core::Error> {
    if capacity == 0 {
        return Err(crate::Core::Error::InvalidState(
            "channel capacity must be greater than zero",
        ));
    }
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| crate::Core::Error::Allocation { slots: capacity })?;
    Ok(slots)
}
