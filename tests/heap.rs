use bq_select::{Buffer, HeapBuffer, Priority};

fn drain<T: Send>(heap: &mut HeapBuffer<T>) -> Vec<(Priority, T)> {
    std::iter::from_fn(|| heap.take()).collect()
}

#[test]
fn takes_highest_priority_first() {
    let mut heap = HeapBuffer::with_capacity(7).unwrap();
    for (priority, value) in [(1, 3), (2, 4), (0, 4), (5, 5), (3, 8), (6, 7), (8, 9)] {
        heap.write((priority, value)).unwrap();
    }
    assert!(heap.is_full());
    assert_eq!(heap.write((10, 10)), Err((10, 10)));
    assert_eq!(heap.peek_priority(), Some(8));

    let (priorities, values): (Vec<Priority>, Vec<i32>) = drain(&mut heap).into_iter().unzip();
    assert_eq!(priorities, vec![8, 6, 5, 3, 2, 1, 0]);
    assert_eq!(values, vec![9, 7, 5, 8, 4, 3, 4]);
    assert!(heap.is_empty());
    assert_eq!(heap.peek_priority(), None);
}

#[test]
fn random_sequences_come_out_non_increasing() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..200 {
        let capacity = rng.usize(1..64);
        let mut heap = HeapBuffer::with_capacity(capacity).unwrap();
        let mut inserted = Vec::new();
        for value in 0..capacity {
            let priority = rng.i32(-20..20);
            heap.write((priority, value)).unwrap();
            inserted.push((priority, value));
        }

        let taken = drain(&mut heap);
        assert!(taken.windows(2).all(|pair| pair[0].0 >= pair[1].0));

        let mut taken_sorted = taken.clone();
        taken_sorted.sort();
        inserted.sort();
        assert_eq!(taken_sorted, inserted);
    }
}

#[test]
fn interleaved_writes_and_takes_keep_heap_order() {
    let mut rng = fastrand::Rng::with_seed(42);
    let mut heap = HeapBuffer::with_capacity(16).unwrap();
    let mut shadow: Vec<Priority> = Vec::new();
    for _ in 0..2_000 {
        if rng.bool() && !heap.is_full() {
            let priority = rng.i32(0..8);
            heap.write((priority, ())).unwrap();
            shadow.push(priority);
        } else if let Some((priority, ())) = heap.take() {
            let max = *shadow.iter().max().unwrap();
            assert_eq!(priority, max);
            let at = shadow.iter().position(|&p| p == max).unwrap();
            shadow.swap_remove(at);
        }
        assert_eq!(heap.len(), shadow.len());
    }
}
