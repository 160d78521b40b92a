use crate::trace::warn;
use crate::Core::{CallbackHandle, ChannelId, Error, Readiness, Rejected};
use crate::MPMC::{Channel, ChannelBuilder, PriorityChannel, Selectable};
use std::ffi::c_void;
use std::ptr;
use std::time::Duration;

// Error codes
pub const BQ_SUCCESS: i32 = 0;
pub const BQ_ERROR_NULL_POINTER: i32 = -1;
pub const BQ_ERROR_INVALID_ARG: i32 = -2;
pub const BQ_ERROR_ALLOCATION_FAILED: i32 = -3;
pub const BQ_ERROR_WOULD_BLOCK: i32 = -4;
pub const BQ_ERROR_TIMEOUT: i32 = -5;
pub const BQ_ERROR_CONTENDED: i32 = -6;
pub const BQ_ERROR_INVALID_STATE: i32 = -7;

/// Readiness codes for callbacks and select.
pub const BQ_NON_EMPTY: i32 = 0;
pub const BQ_NON_FULL: i32 = 1;

type Element = Box<[u8]>;

enum Inner {
    Fifo(Channel<Element>),
    Priority(PriorityChannel<Element>),
}

/// Handle to a byte channel (opaque pointer). Every element is exactly
/// `element_size` bytes.
pub struct BqChannel {
    inner: Inner,
    element_size: usize,
}

/// Handle to a registered callback (opaque pointer)
pub struct BqCallback {
    inner: CallbackHandle,
}

/// C callback: receives the context pointer given at registration.
pub type BqNotify = extern "C" fn(ctx: *mut c_void);

struct Context(*mut c_void);

// The caller owns the context and promises it may be used from any thread.
unsafe impl Send for Context {}

impl Context {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

fn status(err: Error) -> i32 {
    match err {
        Error::Allocation { .. } => BQ_ERROR_ALLOCATION_FAILED,
        Error::InvalidState(_) => BQ_ERROR_INVALID_STATE,
        Error::Timeout => BQ_ERROR_TIMEOUT,
        Error::WouldBlock => BQ_ERROR_WOULD_BLOCK,
        Error::Contended => BQ_ERROR_CONTENDED,
    }
}

fn readiness(code: i32) -> Option<Readiness> {
    match code {
        BQ_NON_EMPTY => Some(Readiness::NonEmpty),
        BQ_NON_FULL => Some(Readiness::NonFull),
        _ => None,
    }
}

fn new_handle(
    capacity: usize,
    element_size: usize,
    build: impl FnOnce(ChannelBuilder) -> Result<Inner, Error>,
) -> *mut BqChannel {
    if element_size == 0 {
        warn!("bq channel rejected: element_size is zero");
        return ptr::null_mut();
    }
    match build(ChannelBuilder::new().with_capacity(capacity)) {
        Ok(inner) => Box::into_raw(Box::new(BqChannel {
            inner,
            element_size,
        })),
        Err(e) => {
            warn!(error = %e, capacity, "bq channel creation failed");
            ptr::null_mut()
        }
    }
}

fn put_fifo(
    handle: *const BqChannel,
    data: *const u8,
    op: impl FnOnce(&Channel<Element>, Element) -> Result<(), Rejected<Element>>,
) -> i32 {
    if handle.is_null() || data.is_null() {
        return BQ_ERROR_NULL_POINTER;
    }
    let channel = unsafe { &*handle };
    let Inner::Fifo(fifo) = &channel.inner else {
        return BQ_ERROR_INVALID_STATE;
    };
    let element = unsafe { std::slice::from_raw_parts(data, channel.element_size) };
    match op(fifo, element.into()) {
        Ok(()) => BQ_SUCCESS,
        Err(rejected) => status(rejected.kind()),
    }
}

fn put_priority(
    handle: *const BqChannel,
    data: *const u8,
    op: impl FnOnce(&PriorityChannel<Element>, Element) -> Result<(), Rejected<Element>>,
) -> i32 {
    if handle.is_null() || data.is_null() {
        return BQ_ERROR_NULL_POINTER;
    }
    let channel = unsafe { &*handle };
    let Inner::Priority(heap) = &channel.inner else {
        return BQ_ERROR_INVALID_STATE;
    };
    let element = unsafe { std::slice::from_raw_parts(data, channel.element_size) };
    match op(heap, element.into()) {
        Ok(()) => BQ_SUCCESS,
        Err(rejected) => status(rejected.kind()),
    }
}

fn copy_out(result: Result<Element, Error>, out: *mut u8) -> i32 {
    match result {
        Ok(element) => {
            unsafe { ptr::copy_nonoverlapping(element.as_ptr(), out, element.len()) };
            BQ_SUCCESS
        }
        Err(e) => status(e),
    }
}

fn take_fifo(
    handle: *const BqChannel,
    out: *mut u8,
    op: impl FnOnce(&Channel<Element>) -> Result<Element, Error>,
) -> i32 {
    if handle.is_null() || out.is_null() {
        return BQ_ERROR_NULL_POINTER;
    }
    match unsafe { &(*handle).inner } {
        Inner::Fifo(fifo) => copy_out(op(fifo), out),
        Inner::Priority(_) => BQ_ERROR_INVALID_STATE,
    }
}

fn take_priority(
    handle: *const BqChannel,
    out: *mut u8,
    op: impl FnOnce(&PriorityChannel<Element>) -> Result<Element, Error>,
) -> i32 {
    if handle.is_null() || out.is_null() {
        return BQ_ERROR_NULL_POINTER;
    }
    match unsafe { &(*handle).inner } {
        Inner::Priority(heap) => copy_out(op(heap), out),
        Inner::Fifo(_) => BQ_ERROR_INVALID_STATE,
    }
}

// -----------------------------------------------------------------------------
// Lifecycle
// -----------------------------------------------------------------------------

/// Create a FIFO channel of `capacity` elements of `element_size` bytes.
///
/// # Returns
/// * Pointer to `BqChannel`, or NULL on failure.
#[no_mangle]
pub extern "C" fn bq_channel_new(capacity: usize, element_size: usize) -> *mut BqChannel {
    new_handle(capacity, element_size, |builder| {
        builder.build_fifo().map(Inner::Fifo)
    })
}

/// Create a priority channel of `capacity` elements of `element_size` bytes.
#[no_mangle]
pub extern "C" fn bq_priority_channel_new(capacity: usize, element_size: usize) -> *mut BqChannel {
    new_handle(capacity, element_size, |builder| {
        builder.build_priority().map(Inner::Priority)
    })
}

/// Free a channel handle. Callbacks still registered are dropped with it.
#[no_mangle]
pub extern "C" fn bq_channel_free(handle: *mut BqChannel) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle); // Dropped automatically
        }
    }
}

/// Number of elements currently queued, or a negative error code.
#[no_mangle]
pub extern "C" fn bq_channel_len(handle: *const BqChannel) -> i64 {
    if handle.is_null() {
        return BQ_ERROR_NULL_POINTER as i64;
    }
    let len = match unsafe { &(*handle).inner } {
        Inner::Fifo(fifo) => fifo.len(),
        Inner::Priority(heap) => heap.len(),
    };
    len as i64
}

// -----------------------------------------------------------------------------
// FIFO put / take
// -----------------------------------------------------------------------------

/// Copy `element_size` bytes from `data` into the channel, waiting for room.
///
/// # Returns
/// * 0 on success, negative error code otherwise.
#[no_mangle]
pub extern "C" fn bq_put(handle: *const BqChannel, data: *const u8) -> i32 {
    put_fifo(handle, data, |ch, element| ch.put(element))
}

#[no_mangle]
pub extern "C" fn bq_timed_put(handle: *const BqChannel, data: *const u8, timeout_ms: u64) -> i32 {
    put_fifo(handle, data, |ch, element| {
        ch.timed_put(element, Duration::from_millis(timeout_ms))
    })
}

#[no_mangle]
pub extern "C" fn bq_try_put(handle: *const BqChannel, data: *const u8) -> i32 {
    put_fifo(handle, data, |ch, element| ch.try_put(element))
}

#[no_mangle]
pub extern "C" fn bq_no_wait_put(handle: *const BqChannel, data: *const u8) -> i32 {
    put_fifo(handle, data, |ch, element| ch.no_wait_put(element))
}

/// Copy the oldest element into `out`, which must hold `element_size` bytes.
#[no_mangle]
pub extern "C" fn bq_take(handle: *const BqChannel, out: *mut u8) -> i32 {
    take_fifo(handle, out, |ch| ch.take())
}

#[no_mangle]
pub extern "C" fn bq_timed_take(handle: *const BqChannel, out: *mut u8, timeout_ms: u64) -> i32 {
    take_fifo(handle, out, |ch| ch.timed_take(Duration::from_millis(timeout_ms)))
}

#[no_mangle]
pub extern "C" fn bq_try_take(handle: *const BqChannel, out: *mut u8) -> i32 {
    take_fifo(handle, out, |ch| ch.try_take())
}

#[no_mangle]
pub extern "C" fn bq_no_wait_take(handle: *const BqChannel, out: *mut u8) -> i32 {
    take_fifo(handle, out, |ch| ch.no_wait_take())
}

// -----------------------------------------------------------------------------
// Priority put / take
// -----------------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn bq_priority_put(handle: *const BqChannel, data: *const u8, priority: i32) -> i32 {
    put_priority(handle, data, |ch, element| ch.put(priority, element))
}

#[no_mangle]
pub extern "C" fn bq_priority_timed_put(
    handle: *const BqChannel,
    data: *const u8,
    priority: i32,
    timeout_ms: u64,
) -> i32 {
    put_priority(handle, data, |ch, element| {
        ch.timed_put(priority, element, Duration::from_millis(timeout_ms))
    })
}

#[no_mangle]
pub extern "C" fn bq_priority_try_put(handle: *const BqChannel, data: *const u8, priority: i32) -> i32 {
    put_priority(handle, data, |ch, element| ch.try_put(priority, element))
}

#[no_mangle]
pub extern "C" fn bq_priority_no_wait_put(
    handle: *const BqChannel,
    data: *const u8,
    priority: i32,
) -> i32 {
    put_priority(handle, data, |ch, element| ch.no_wait_put(priority, element))
}

/// Copy the highest-priority element into `out`.
#[no_mangle]
pub extern "C" fn bq_priority_take(handle: *const BqChannel, out: *mut u8) -> i32 {
    take_priority(handle, out, |ch| ch.take())
}

#[no_mangle]
pub extern "C" fn bq_priority_timed_take(
    handle: *const BqChannel,
    out: *mut u8,
    timeout_ms: u64,
) -> i32 {
    take_priority(handle, out, |ch| ch.timed_take(Duration::from_millis(timeout_ms)))
}

#[no_mangle]
pub extern "C" fn bq_priority_try_take(handle: *const BqChannel, out: *mut u8) -> i32 {
    take_priority(handle, out, |ch| ch.try_take())
}

#[no_mangle]
pub extern "C" fn bq_priority_no_wait_take(handle: *const BqChannel, out: *mut u8) -> i32 {
    take_priority(handle, out, |ch| ch.no_wait_take())
}

// -----------------------------------------------------------------------------
// Callbacks and select
// -----------------------------------------------------------------------------

/// Register `notify(ctx)` for `readiness` (`BQ_NON_EMPTY` / `BQ_NON_FULL`).
///
/// `notify` runs with the channel locked: it must return quickly and must not
/// call back into the same channel.
///
/// # Returns
/// * Pointer to `BqCallback`, or NULL on failure.
#[no_mangle]
pub extern "C" fn bq_register_callback(
    handle: *const BqChannel,
    readiness_code: i32,
    notify: Option<BqNotify>,
    ctx: *mut c_void,
) -> *mut BqCallback {
    let (Some(notify), Some(readiness)) = (notify, readiness(readiness_code)) else {
        return ptr::null_mut();
    };
    if handle.is_null() {
        return ptr::null_mut();
    }
    let ctx = Context(ctx);
    let callback = move |_: ChannelId| notify(ctx.get());
    let inner = match unsafe { &(*handle).inner } {
        Inner::Fifo(fifo) => fifo.register_callback(readiness, callback),
        Inner::Priority(heap) => heap.register_callback(readiness, callback),
    };
    Box::into_raw(Box::new(BqCallback { inner }))
}

/// Remove and free a callback handle.
///
/// # Returns
/// * 1 if the callback was registered, 0 if its channel was already freed.
#[no_mangle]
pub extern "C" fn bq_remove_callback(callback: *mut BqCallback) -> i32 {
    if callback.is_null() {
        return BQ_ERROR_NULL_POINTER;
    }
    let BqCallback { inner } = *unsafe { Box::from_raw(callback) };
    inner.remove() as i32
}

/// Wait until one of `count` channels satisfies `readiness_code`.
///
/// # Arguments
/// * `timeout_ms` - Negative waits without limit.
/// * `out_ready` - `count` bytes; set to 1 for each ready channel, 0 otherwise.
///
/// # Returns
/// * Number of ready channels, or a negative error code.
#[no_mangle]
pub extern "C" fn bq_select_ready(
    channels: *const *const BqChannel,
    count: usize,
    readiness_code: i32,
    timeout_ms: i64,
    out_ready: *mut u8,
) -> i32 {
    if channels.is_null() || out_ready.is_null() {
        return BQ_ERROR_NULL_POINTER;
    }
    let Some(readiness) = readiness(readiness_code) else {
        return BQ_ERROR_INVALID_ARG;
    };
    let handles = unsafe { std::slice::from_raw_parts(channels, count) };
    let mut set: Vec<&dyn Selectable> = Vec::with_capacity(count);
    for &handle in handles {
        if handle.is_null() {
            return BQ_ERROR_NULL_POINTER;
        }
        set.push(match unsafe { &(*handle).inner } {
            Inner::Fifo(fifo) => fifo as &dyn Selectable,
            Inner::Priority(heap) => heap as &dyn Selectable,
        });
    }

    let result = if timeout_ms < 0 {
        crate::MPMC::select_ready(&set, readiness)
    } else {
        crate::MPMC::timed_select_ready(&set, readiness, Duration::from_millis(timeout_ms as u64))
    };

    let flags = unsafe { std::slice::from_raw_parts_mut(out_ready, count) };
    flags.fill(0);
    match result {
        Ok(ready) => {
            for &index in &ready {
                flags[index] = 1;
            }
            ready.len() as i32
        }
        Err(e) => status(e),
    }
}
