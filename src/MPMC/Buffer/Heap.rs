use super::Engine::{reserve_slots, Buffer, Priority};
use crate::Core::Error;

/// Fixed-capacity binary max-heap keyed by [`Priority`].
///
/// Array encoded, 0-indexed: the children of `i` live at `2i + 1` and
/// `2i + 2`. Entries only move past each other on a strictly greater
/// priority, so the relative order of equal priorities is unspecified.
pub struct HeapBuffer<T> {
    pub(crate) slots: Vec<(Priority, T)>,
    pub(crate) capacity: usize,
}

impl<T> HeapBuffer<T> {
    /// Allocate room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Ok(Self {
            slots: reserve_slots(capacity)?,
            capacity,
        })
    }

    /// Priority of the entry the next take returns.
    pub fn peek_priority(&self) -> Option<Priority> {
        self.slots.first().map(|(priority, _)| *priority)
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.slots[parent].0 < self.slots[index].0 {
                self.slots.swap(parent, index);
                index = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.slots.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.slots[right].0 > self.slots[left].0 {
                right
            } else {
                left
            };
            if self.slots[child].0 > self.slots[index].0 {
                self.slots.swap(child, index);
                index = child;
            } else {
                break;
            }
        }
    }
}

impl<T: Send> Buffer for HeapBuffer<T> {
    type Entry = (Priority, T);
    type Item = (Priority, T);

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn write(&mut self, entry: (Priority, T)) -> Result<(), (Priority, T)> {
        if self.slots.len() == self.capacity {
            return Err(entry);
        }
        // Never reallocates: the full capacity was reserved up front.
        self.slots.push(entry);
        self.sift_up(self.slots.len() - 1);
        Ok(())
    }

    fn take(&mut self) -> Option<(Priority, T)> {
        if self.slots.is_empty() {
            return None;
        }
        // Last entry moves into the root, then sinks.
        let top = self.slots.swap_remove(0);
        self.sift_down(0);
        Some(top)
    }
}
