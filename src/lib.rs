//! Bounded, thread-safe channels with backpressure.
//!
//! Two disciplines share one engine: [`Channel`] is strict FIFO over a ring
//! buffer, [`PriorityChannel`] serves the highest priority first from a binary
//! max-heap. Both offer blocking, timed, no-wait and try operations, readiness
//! callbacks, and take part in [`select_ready`] over any mix of channels.

// Module naming follows project convention (MPMC = Multi-Producer Multi-Consumer)
#[allow(non_snake_case)]
pub mod MPMC {
    pub mod Buffer {
        pub mod Engine;
        pub mod Heap;
        pub mod Ring;
        pub use Engine::{Buffer, Priority};
        pub use Heap::HeapBuffer;
        pub use Ring::RingBuffer;
    }
    mod builder;
    mod debug;
    mod queue;
    mod select;

    pub use builder::ChannelBuilder;
    pub use queue::{Channel, PriorityChannel, Queue};
    pub use select::{select_ready, timed_select_ready, Selectable};
}
#[allow(non_snake_case)]
pub mod Core {
    pub mod control;
    pub mod error;
    pub(crate) mod registry;
    pub use control::{CallbackHandle, ChannelId, Readiness};
    pub use error::{Error, Rejected};
}
#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}

pub mod ffi;
pub mod trace;

pub use trace::init_tracing;
pub use Core::{CallbackHandle, ChannelId, Error, Readiness, Rejected};
pub use MPMC::Buffer::{Buffer, HeapBuffer, Priority, RingBuffer};
pub use MPMC::{
    select_ready, timed_select_ready, Channel, ChannelBuilder, PriorityChannel, Queue, Selectable,
};
