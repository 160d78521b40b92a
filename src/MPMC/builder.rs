use super::Buffer::{HeapBuffer, RingBuffer};
use super::{Channel, PriorityChannel, Queue};
use crate::trace::debug;
use crate::Core::Error;

/// Configuration for a new channel.
pub struct ChannelBuilder {
    capacity: usize,
    label: Option<String>,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            capacity: 1024, // 1024 slots
            label: None,
        }
    }
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Name shown in `Debug` output and log events.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn build_fifo<T: Send>(self) -> Result<Channel<T>, Error> {
        let buffer = RingBuffer::with_capacity(self.capacity)?;
        let channel = Queue::from_buffer(buffer, self.label.map(String::into_boxed_str));
        debug!(
            channel = channel.id().as_u64(),
            capacity = self.capacity,
            "fifo channel created"
        );
        Ok(channel)
    }

    pub fn build_priority<T: Send>(self) -> Result<PriorityChannel<T>, Error> {
        let buffer = HeapBuffer::with_capacity(self.capacity)?;
        let channel = Queue::from_buffer(buffer, self.label.map(String::into_boxed_str));
        debug!(
            channel = channel.id().as_u64(),
            capacity = self.capacity,
            "priority channel created"
        );
        Ok(channel)
    }
}
