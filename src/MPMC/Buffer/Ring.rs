use super::Engine::{reserve_slots, Buffer};
use crate::Core::Error;

/// Fixed-capacity circular FIFO storage.
///
/// `start` is the next slot to write, `end` the next slot to read; both wrap
/// modulo the capacity. `used` disambiguates full from empty when they meet.
pub struct RingBuffer<T> {
    pub(crate) slots: Box<[Option<T>]>,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) used: usize,
}

impl<T> RingBuffer<T> {
    /// Allocate `capacity` empty slots.
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        let mut slots = reserve_slots(capacity)?;
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots: slots.into_boxed_slice(),
            start: 0,
            end: 0,
            used: 0,
        })
    }

    /// Index of the next slot a write lands in.
    pub fn write_cursor(&self) -> usize {
        self.start
    }

    /// Index of the next slot a take reads from.
    pub fn read_cursor(&self) -> usize {
        self.end
    }
}

impl<T: Send> Buffer for RingBuffer<T> {
    type Entry = T;
    type Item = T;

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn len(&self) -> usize {
        self.used
    }

    fn write(&mut self, value: T) -> Result<(), T> {
        if self.used == self.slots.len() {
            return Err(value);
        }
        self.slots[self.start] = Some(value);
        self.start = (self.start + 1) % self.slots.len();
        self.used += 1;
        Ok(())
    }

    fn take(&mut self) -> Option<T> {
        if self.used == 0 {
            return None;
        }
        let value = self.slots[self.end].take();
        self.end = (self.end + 1) % self.slots.len();
        self.used -= 1;
        value
    }
}
