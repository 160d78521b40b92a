use super::Buffer::{Buffer, HeapBuffer, RingBuffer};
use super::Queue;
use crate::Core::CallbackHandle;
use std::fmt;

// Debug proxy implementations that call the standalone debug functions
impl<B: Buffer + fmt::Debug> fmt::Debug for Queue<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_control(&self.control, f)
    }
}

impl<T: Send> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_ring_buffer(self, f)
    }
}

impl<T: Send> fmt::Debug for HeapBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_heap_buffer(self, f)
    }
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_callback_handle(self, f)
    }
}
