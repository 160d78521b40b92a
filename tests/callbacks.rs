use bq_select::{Channel, ChannelId, PriorityChannel, Readiness};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

fn counter() -> (Arc<AtomicUsize>, impl FnMut(ChannelId) + Send + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    (hits, move |_: ChannelId| {
        seen.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn fires_once_per_event_under_concurrent_producers() {
    let ch: Channel<u32> = Channel::new(16).unwrap();
    let (puts, on_put) = counter();
    let (takes, on_take) = counter();
    let put_handle = ch.register_callback(Readiness::NonEmpty, on_put);
    let take_handle = ch.register_callback(Readiness::NonFull, on_take);
    assert_eq!(ch.callback_count(Readiness::NonEmpty), 1);
    assert_eq!(ch.callback_count(Readiness::NonFull), 1);

    let producers = 4;
    let per_producer = 500;
    let mut handles = Vec::new();
    for _ in 0..producers {
        let ch = ch.clone();
        handles.push(thread::spawn(move || {
            for i in 0..per_producer {
                ch.put(i).unwrap();
            }
        }));
    }
    let consumer = {
        let ch = ch.clone();
        thread::spawn(move || {
            for _ in 0..producers * per_producer {
                ch.take().unwrap();
            }
        })
    };
    for h in handles {
        h.join().unwrap();
    }
    consumer.join().unwrap();

    let total = (producers * per_producer) as usize;
    assert_eq!(puts.load(Ordering::SeqCst), total);
    assert_eq!(takes.load(Ordering::SeqCst), total);

    assert!(put_handle.remove());
    assert!(take_handle.remove());
    ch.put(1).unwrap();
    ch.take().unwrap();
    assert_eq!(puts.load(Ordering::SeqCst), total);
    assert_eq!(takes.load(Ordering::SeqCst), total);
    assert_eq!(ch.callback_count(Readiness::NonEmpty), 0);
}

#[test]
fn no_firing_after_removal_returns() {
    let ch: Channel<u64> = Channel::new(4).unwrap();
    let (hits, on_put) = counter();
    let handle = ch.register_callback(Readiness::NonEmpty, on_put);

    let worker = {
        let ch = ch.clone();
        thread::spawn(move || {
            for i in 0..5_000 {
                ch.put(i).unwrap();
                ch.take().unwrap();
            }
        })
    };
    thread::yield_now();
    assert!(handle.remove());
    let at_removal = hits.load(Ordering::SeqCst);
    worker.join().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), at_removal);
}

#[test]
fn callback_receives_owning_channel_id() {
    let ch: PriorityChannel<u8> = PriorityChannel::new(2).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let handle = {
        let seen = Arc::clone(&seen);
        ch.register_callback(Readiness::NonEmpty, move |id| seen.lock().unwrap().push(id))
    };
    assert_eq!(handle.channel_id(), ch.id());
    assert_eq!(handle.readiness(), Readiness::NonEmpty);

    ch.put(1, 10).unwrap();
    ch.put(2, 20).unwrap();
    // A failed put is not an event.
    assert!(ch.try_put(3, 30).is_err());
    assert_eq!(*seen.lock().unwrap(), vec![ch.id(), ch.id()]);
    assert!(ch.remove_callback(handle));
}

#[test]
fn removal_after_channel_drop_is_a_no_op() {
    let ch: Channel<u8> = Channel::new(1).unwrap();
    let (_, on_put) = counter();
    let handle = ch.register_callback(Readiness::NonEmpty, on_put);
    assert!(format!("{:?}", handle).contains("attached: true"));
    drop(ch);
    assert!(format!("{:?}", handle).contains("attached: false"));
    assert!(!handle.remove());
}

#[test]
fn slots_are_reused_without_cross_talk() {
    let ch: Channel<u8> = Channel::new(8).unwrap();
    let (first_hits, first) = counter();
    let first_handle = ch.register_callback(Readiness::NonEmpty, first);
    assert!(first_handle.remove());

    let (second_hits, second) = counter();
    let second_handle = ch.register_callback(Readiness::NonEmpty, second);
    ch.put(0).unwrap();
    assert_eq!(first_hits.load(Ordering::SeqCst), 0);
    assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    assert!(second_handle.remove());
}
