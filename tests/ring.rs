use std::sync::Arc;
use std::thread;

use flipring::sync::{RingOverwriteBuffer, MAX_RING_CAPACITY, MIN_RING_CAPACITY};
use flipring::Error;

#[test]
fn capacity_is_rounded_to_power_of_two() {
    for requested in [2usize, 3, 5, 8, 17, 1000] {
        let ring: RingOverwriteBuffer<u64> = RingOverwriteBuffer::new(requested).unwrap();
        let capacity = ring.capacity();
        assert!(capacity >= requested);
        assert!(capacity.is_power_of_two());
    }
}

#[test]
fn capacity_below_minimum_is_rejected() {
    for requested in [0usize, 1] {
        let err = RingOverwriteBuffer::<u64>::new(requested).unwrap_err();
        match err {
            Error::InvalidCapacity { requested: r, min, .. } => {
                assert_eq!(r, requested);
                assert_eq!(min, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

#[test]
fn capacity_above_maximum_is_rejected_with_ring_bounds() {
    // Rounding these up to a power of two would overflow; the error still
    // reports the ring's own bounds, not the rounding helper's.
    for requested in [MAX_RING_CAPACITY + 1, usize::MAX] {
        let err = RingOverwriteBuffer::<u64>::new(requested).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidCapacity {
                requested,
                min: MIN_RING_CAPACITY,
                max: MAX_RING_CAPACITY,
            }
        );
    }
}

#[test]
fn single_threaded_fifo() {
    let ring = RingOverwriteBuffer::new(8).unwrap();
    for v in 1..=8u64 {
        ring.write(v);
    }
    assert_eq!(ring.len(), 8);
    for v in 1..=8u64 {
        assert_eq!(ring.read().unwrap(), v);
    }
    assert!(ring.is_empty());
}

#[test]
fn overwrite_keeps_the_newest_entries_in_order() {
    let ring = RingOverwriteBuffer::new(4).unwrap();
    for v in 1..=6u64 {
        ring.write(v);
    }
    // Two oldest entries were overwritten; count saturated at capacity.
    assert_eq!(ring.len(), 4);
    for expected in [3u64, 4, 5, 6] {
        assert_eq!(ring.read().unwrap(), expected);
    }
    assert_eq!(ring.read(), Err(Error::Empty));
}

#[test]
fn reads_on_empty_buffer() {
    let ring: RingOverwriteBuffer<u32> = RingOverwriteBuffer::new(4).unwrap();
    assert_eq!(ring.read(), Err(Error::Empty));
    assert_eq!(ring.try_read(), None);

    ring.write(7);
    assert_eq!(ring.try_read(), Some(7));
    assert_eq!(ring.try_read(), None);
}

#[test]
fn copy_to_dumps_the_whole_backing_array() {
    let ring = RingOverwriteBuffer::new(4).unwrap();
    ring.write(1u32);
    ring.write(2);
    ring.write(3);

    let mut dest = [99u32; 10];
    ring.copy_to(&mut dest, 2).unwrap();
    // Raw physical dump: written slots plus the untouched default slot.
    assert_eq!(&dest[2..6], &[1, 2, 3, 0]);
    // Cursors unaffected.
    assert_eq!(ring.len(), 3);
    assert_eq!(ring.read().unwrap(), 1);
}

#[test]
fn copy_to_rejects_short_destinations() {
    let ring: RingOverwriteBuffer<u32> = RingOverwriteBuffer::new(4).unwrap();
    let mut dest = [0u32; 5];
    let err = ring.copy_to(&mut dest, 2).unwrap_err();
    assert_eq!(
        err,
        Error::DestinationTooSmall {
            needed: 4,
            available: 3
        }
    );
}

#[test]
fn concurrent_writers_leave_exactly_capacity_survivors() {
    const WRITERS: u64 = 4;
    const PER_WRITER: u64 = 1_000;

    let ring = Arc::new(RingOverwriteBuffer::new(64).unwrap());
    let capacity = ring.capacity() as u64;

    let mut handles = Vec::new();
    for id in 0..WRITERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for seq in 0..PER_WRITER {
                ring.write(id * 1_000_000 + seq);
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(ring.len() as u64, capacity.min(WRITERS * PER_WRITER));

    let mut drained = 0u64;
    while let Some(v) = ring.try_read() {
        let id = v / 1_000_000;
        let seq = v % 1_000_000;
        assert!(id < WRITERS, "value {v} was never written");
        assert!(seq < PER_WRITER, "value {v} was never written");
        drained += 1;
    }
    assert_eq!(drained, capacity);
}

#[test]
fn concurrent_readers_and_writers_only_observe_written_values() {
    const WRITERS: u64 = 2;
    const READERS: usize = 2;
    const PER_WRITER: u64 = 5_000;

    let ring = Arc::new(RingOverwriteBuffer::new(32).unwrap());

    let mut handles = Vec::new();
    for id in 0..WRITERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for seq in 0..PER_WRITER {
                ring.write(id * 1_000_000 + seq);
            }
        }));
    }
    for _ in 0..READERS {
        let ring = Arc::clone(&ring);
        handles.push(thread::spawn(move || {
            for _ in 0..PER_WRITER {
                if let Some(v) = ring.try_read() {
                    assert!(v / 1_000_000 < WRITERS, "value {v} was never written");
                    assert!(v % 1_000_000 < PER_WRITER, "value {v} was never written");
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}
