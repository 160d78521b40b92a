use bq_select::{
    select_ready, timed_select_ready, Channel, Error, PriorityChannel, Readiness, Selectable,
};
use serial_test::serial;
use std::thread;
use std::time::{Duration, Instant};

#[test]
#[serial]
fn idle_channels_time_out() {
    let channels: Vec<Channel<u32>> = (0..4).map(|_| Channel::new(2).unwrap()).collect();
    let set: Vec<&dyn Selectable> = channels.iter().map(|c| c as &dyn Selectable).collect();

    let start = Instant::now();
    assert_eq!(
        timed_select_ready(&set, Readiness::NonEmpty, Duration::from_secs(1)),
        Err(Error::Timeout)
    );
    assert!(start.elapsed() >= Duration::from_secs(1));

    // Transient registrations are gone after the timeout.
    for ch in &channels {
        assert_eq!(ch.callback_count(Readiness::NonEmpty), 0);
    }
}

#[test]
fn already_ready_channels_are_all_returned_in_input_order() {
    let a: Channel<u8> = Channel::new(1).unwrap();
    let b: PriorityChannel<String> = PriorityChannel::new(1).unwrap();
    let c: Channel<u8> = Channel::new(1).unwrap();
    b.put(1, "x".to_string()).unwrap();
    c.put(3).unwrap();

    let set: [&dyn Selectable; 3] = [&a, &b, &c];
    assert_eq!(select_ready(&set, Readiness::NonEmpty), Ok(vec![1, 2]));
    assert_eq!(select_ready(&set, Readiness::NonFull), Ok(vec![0]));
    // A ready scan registers nothing.
    assert_eq!(a.callback_count(Readiness::NonEmpty), 0);
}

#[test]
fn wakes_on_put_into_one_channel() {
    let a: Channel<u8> = Channel::new(1).unwrap();
    let b: Channel<u8> = Channel::new(1).unwrap();
    let c: PriorityChannel<u8> = PriorityChannel::new(1).unwrap();

    let producer = {
        let b = b.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            b.put(42).unwrap();
        })
    };
    let set: [&dyn Selectable; 3] = [&a, &b, &c];
    assert_eq!(select_ready(&set, Readiness::NonEmpty), Ok(vec![1]));
    producer.join().unwrap();
    assert_eq!(b.try_take(), Ok(42));
    for count in [
        a.callback_count(Readiness::NonEmpty),
        b.callback_count(Readiness::NonEmpty),
        c.callback_count(Readiness::NonEmpty),
    ] {
        assert_eq!(count, 0);
    }
}

#[test]
fn wakes_when_room_appears() {
    let a: Channel<u8> = Channel::new(1).unwrap();
    let b: Channel<u8> = Channel::new(1).unwrap();
    a.put(1).unwrap();
    b.put(2).unwrap();

    let consumer = {
        let a = a.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            a.take().unwrap()
        })
    };
    let set: [&dyn Selectable; 2] = [&a, &b];
    assert_eq!(
        timed_select_ready(&set, Readiness::NonFull, Duration::from_secs(10)),
        Ok(vec![0])
    );
    assert_eq!(consumer.join().unwrap(), 1);
}

#[test]
fn duplicate_entries_are_locked_once() {
    let a: Channel<u8> = Channel::new(1).unwrap();
    let set: [&dyn Selectable; 2] = [&a, &a];
    assert_eq!(
        timed_select_ready(&set, Readiness::NonEmpty, Duration::from_millis(50)),
        Err(Error::Timeout)
    );
    a.put(1).unwrap();
    assert_eq!(select_ready(&set, Readiness::NonEmpty), Ok(vec![0, 1]));
}

#[test]
fn empty_set_is_invalid() {
    assert!(matches!(
        select_ready(&[], Readiness::NonEmpty),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn overlapping_select_on_same_readiness_is_refused() {
    let a: Channel<u8> = Channel::new(1).unwrap();
    let b: Channel<u8> = Channel::new(1).unwrap();

    let waiter = {
        let a = a.clone();
        thread::spawn(move || select_ready(&[&a as &dyn Selectable], Readiness::NonEmpty))
    };
    while a.callback_count(Readiness::NonEmpty) == 0 {
        thread::sleep(Duration::from_millis(5));
    }

    let set: [&dyn Selectable; 2] = [&b, &a];
    assert!(matches!(
        timed_select_ready(&set, Readiness::NonEmpty, Duration::from_millis(10)),
        Err(Error::InvalidState(_))
    ));
    // The refused select left nothing behind on either channel.
    assert_eq!(b.callback_count(Readiness::NonEmpty), 0);
    assert_eq!(a.callback_count(Readiness::NonEmpty), 1);
    // Other readiness kinds are independent.
    assert_eq!(select_ready(&set, Readiness::NonFull), Ok(vec![0, 1]));

    a.put(7).unwrap();
    assert_eq!(waiter.join().unwrap(), Ok(vec![0]));
    assert_eq!(a.callback_count(Readiness::NonEmpty), 0);
}

#[test]
#[serial]
fn opposite_orders_do_not_deadlock() {
    const ITEMS: usize = 2_000;
    let c1: Channel<usize> = Channel::new(2).unwrap();
    let c2: Channel<usize> = Channel::new(2).unwrap();

    let producer = {
        let (c1, c2) = (c1.clone(), c2.clone());
        thread::spawn(move || {
            let set: [&dyn Selectable; 2] = [&c2, &c1];
            let targets = [&c2, &c1];
            let mut produced = 0;
            while produced < ITEMS {
                match timed_select_ready(&set, Readiness::NonFull, Duration::from_millis(100)) {
                    Ok(ready) => {
                        for index in ready {
                            if produced < ITEMS && targets[index].no_wait_put(produced).is_ok() {
                                produced += 1;
                            }
                        }
                    }
                    Err(Error::Timeout) => {}
                    Err(e) => panic!("producer select failed: {e}"),
                }
            }
        })
    };
    let consumer = {
        let (c1, c2) = (c1.clone(), c2.clone());
        thread::spawn(move || {
            let set: [&dyn Selectable; 2] = [&c1, &c2];
            let sources = [&c1, &c2];
            let mut taken = Vec::with_capacity(ITEMS);
            while taken.len() < ITEMS {
                match timed_select_ready(&set, Readiness::NonEmpty, Duration::from_millis(100)) {
                    Ok(ready) => {
                        for index in ready {
                            if let Ok(value) = sources[index].no_wait_take() {
                                taken.push(value);
                            }
                        }
                    }
                    Err(Error::Timeout) => {}
                    Err(e) => panic!("consumer select failed: {e}"),
                }
            }
            taken
        })
    };

    let deadline = Instant::now() + Duration::from_secs(60);
    while !(producer.is_finished() && consumer.is_finished()) {
        assert!(
            parking_lot::deadlock::check_deadlock().is_empty(),
            "lock cycle detected"
        );
        assert!(Instant::now() < deadline, "select stress did not finish");
        thread::sleep(Duration::from_millis(50));
    }
    producer.join().unwrap();
    let mut taken = consumer.join().unwrap();
    taken.sort_unstable();
    assert_eq!(taken, (0..ITEMS).collect::<Vec<_>>());
}
