use std::fmt;
use crate::Core::control::Control;
use crate::Core::CallbackHandle;
use crate::MPMC::Buffer::{Buffer, HeapBuffer, RingBuffer};

/// Debug function for a channel handle
///
/// Shows identity, label and the buffer. Never blocks: if another thread
/// holds the channel lock the buffer renders as `<locked>`.
pub(crate) fn debug_control<B: Buffer + fmt::Debug>(control: &Control<B>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut out = f.debug_struct("Channel");
    out.field("id", &control.id.as_u64())
        .field("label", &control.label.as_deref().unwrap_or("<unnamed>"));
    if let Some(state) = control.try_lock() {
        out.field("buffer", &state.buffer);
    } else {
        out.field("buffer", &format_args!("<locked>"));
    }
    out.finish()
}

/// Debug function for RingBuffer
///
/// Cursors and occupancy only; element values are never printed.
pub(crate) fn debug_ring_buffer<T: Send>(buffer: &RingBuffer<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RingBuffer")
        .field("capacity", &buffer.capacity())
        .field("used", &buffer.len())
        .field("start", &buffer.write_cursor())
        .field("end", &buffer.read_cursor())
        .finish_non_exhaustive()
}

/// Debug function for HeapBuffer
pub(crate) fn debug_heap_buffer<T: Send>(buffer: &HeapBuffer<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HeapBuffer")
        .field("capacity", &buffer.capacity())
        .field("used", &buffer.len())
        .field("top_priority", &buffer.peek_priority())
        .finish_non_exhaustive()
}

/// Debug function for CallbackHandle
pub(crate) fn debug_callback_handle(handle: &CallbackHandle, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CallbackHandle")
        .field("channel", &handle.channel_id.as_u64())
        .field("readiness", &handle.readiness)
        .field("attached", &(handle.channel.strong_count() > 0))
        .finish()
}
