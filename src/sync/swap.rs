//! Multi-producer/single-consumer double-buffered queue.
//!
//! Producers append into whichever buffer is currently *active*; the single
//! consumer atomically swaps the active and idle buffers and reads the frozen
//! snapshot while producers keep writing into the other one. Every accepted
//! value is visible in exactly one snapshot, never lost and never duplicated.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr;
use std::slice;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;

use crossbeam_utils::{Backoff, CachePadded};
use tracing::{debug, trace};

use super::header::{Header, MAX_CAPACITY};
use super::pool::{BufferPool, RawBuffer};
use crate::error::{Error, Result};

/// An MPSC queue built around two fixed-capacity buffers and one packed
/// atomic header word.
///
/// ### Concurrency Design
/// - **Producers (`try_push`)**: a single CAS on the header reserves the next
///   write index *and* raises the in-flight writer count, so a reservation and
///   its epoch membership are indivisible. The value is then stored into the
///   uniquely owned slot, and a second CAS lowers the writer count. The
///   decrement runs from a drop guard, so a panicking store can never leak the
///   count and wedge the consumer.
/// - **Consumer (`snapshot`)**: spins until it can CAS a header with zero
///   in-flight writers into one with the active bit flipped and the index
///   reset. At that instant every write accepted into the old buffer has been
///   published, and the old buffer's valid prefix becomes the read snapshot.
///
/// Because every transition funnels through one word, capacity is bounded by
/// the header's 32-bit index field and at most 255 producers may be mid-store
/// at once; a 256th writer spins until one of them finishes.
///
/// Entries from different producers within one epoch have no defined relative
/// order. A single producer's consecutive pushes reserve increasing indices.
pub struct MpscSwapQueue<T> {
    /// Packed state word: active-buffer bit, write index, in-flight writers.
    header: CachePadded<AtomicU64>,

    /// The two swap buffers, indexed by the header's active bit.
    buffers: [RawBuffer<T>; 2],

    capacity: usize,

    /// At most one outstanding [`Snapshot`] guard.
    reading: AtomicBool,

    /// Pool the buffers came from, if any; they return there on drop.
    pool: Option<Arc<BufferPool<T>>>,
}

// SAFETY: Values are moved in by producers and moved out (dropped) through
// snapshot guards. Slot access is arbitrated by the header CAS protocol: a
// slot is written only by the producer that reserved it and read only after a
// swap proved no writer is in flight. `T: Send` is all that crossing threads
// requires here: the only path handing out `&T` is the [`Snapshot`] guard,
// and the guard is `Sync` only for `T: Sync` (see its impls below), so a
// shared `&T` can never reach two threads unless `T` allows it.
unsafe impl<T: Send> Send for MpscSwapQueue<T> {}
unsafe impl<T: Send> Sync for MpscSwapQueue<T> {}

impl<T> fmt::Debug for MpscSwapQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpscSwapQueue")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl<T> MpscSwapQueue<T> {
    /// Creates a queue with two freshly allocated buffers of `capacity` slots.
    ///
    /// # Returns
    /// * `Err(Error::InvalidCapacity)` when `capacity` is zero or exceeds the
    ///   header's representable write-index range.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::build(capacity, None)
    }

    /// Like [`new`](Self::new), but rents both buffers from `pool` and
    /// returns them there when the queue is dropped.
    pub fn with_pool(capacity: usize, pool: Arc<BufferPool<T>>) -> Result<Self> {
        Self::build(capacity, Some(pool))
    }

    fn build(capacity: usize, pool: Option<Arc<BufferPool<T>>>) -> Result<Self> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                min: 1,
                max: MAX_CAPACITY,
            });
        }

        let buffers = match &pool {
            Some(pool) => [pool.rent(capacity), pool.rent(capacity)],
            None => [
                RawBuffer::with_capacity(capacity),
                RawBuffer::with_capacity(capacity),
            ],
        };
        debug!(capacity, pooled = pool.is_some(), "swap queue created");

        Ok(Self {
            header: CachePadded::new(AtomicU64::new(Header::INITIAL.raw())),
            buffers,
            capacity,
            reading: AtomicBool::new(false),
            pool,
        })
    }

    /// Slots per buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries accepted into the current epoch so far. Best-effort.
    #[inline]
    pub fn pending(&self) -> usize {
        Header::from_raw(self.header.load(Relaxed))
            .index()
            .min(self.capacity)
    }

    /// Appends `value` to the active buffer.
    ///
    /// Returns `false` when the active buffer is full; the value is dropped
    /// and queue state is untouched. The caller decides whether to retry
    /// after the consumer's next [`snapshot`](Self::snapshot) empties it.
    pub fn try_push(&self, value: T) -> bool {
        // Fast path: a full active buffer fails without joining the CAS
        // contention at all.
        let current = Header::from_raw(self.header.load(Acquire));
        if current.index() >= self.capacity {
            return false;
        }

        let Some(reserved) = self.begin_write() else {
            return false;
        };

        // The decrement must run even if the store below panics, otherwise
        // the consumer would wait forever for a writer that no longer exists.
        let _end = EndWrite {
            header: &self.header,
        };

        // SAFETY: `begin_write` reserved index `reserved.index()` in buffer
        // `reserved.active()` exclusively for this call: no other producer
        // holds the same index in this epoch, and the consumer cannot swap
        // this buffer while our in-flight increment is outstanding. The slot
        // is uninitialized (fresh or drained by a previous snapshot), so a
        // plain write without dropping is correct.
        unsafe {
            self.buffers[reserved.active()]
                .slot(reserved.index())
                .write(value);
        }
        true
    }

    /// Swaps the buffers and returns a read guard over everything accepted
    /// since the previous snapshot.
    ///
    /// Producers keep writing into the freshly activated buffer while the
    /// guard is alive. Dropping the guard drops the snapshotted values and
    /// releases the queue for the next snapshot.
    ///
    /// # Returns
    /// * `Err(Error::SnapshotHeld)` when a guard from a previous call is
    ///   still alive. One consumer at a time is the contract; this is a
    ///   programming error rather than a transient condition.
    pub fn snapshot(&self) -> Result<Snapshot<'_, T>> {
        if self
            .reading
            .compare_exchange(false, true, Acquire, Relaxed)
            .is_err()
        {
            return Err(Error::SnapshotHeld);
        }

        let backoff = Backoff::new();
        let frozen = loop {
            let current = Header::from_raw(self.header.load(Acquire));
            if current.producers() != 0 {
                // A writer is between reserve and publish; its slot store is
                // not visible yet.
                backoff.snooze();
                continue;
            }
            if self
                .header
                .compare_exchange_weak(current.raw(), current.swapped().raw(), AcqRel, Relaxed)
                .is_ok()
            {
                break current;
            }
            backoff.spin();
        };

        let len = frozen.index().min(self.capacity);
        trace!(len, buffer = frozen.active(), "froze epoch for reading");
        Ok(Snapshot {
            queue: self,
            buffer: frozen.active(),
            len,
            _not_auto_sync: PhantomData,
        })
    }

    /// Reserves a write index and joins the in-flight writer set in one CAS.
    ///
    /// Returns the header *before* the transition, which names the reserved
    /// index and the buffer it lives in. `None` means the active buffer is
    /// full.
    fn begin_write(&self) -> Option<Header> {
        let backoff = Backoff::new();
        loop {
            let current = Header::from_raw(self.header.load(Acquire));
            if current.index() >= self.capacity {
                return None;
            }
            if current.producers_saturated() {
                // Writer-count field is at its bound; wait for a decrement.
                backoff.snooze();
                continue;
            }
            if self
                .header
                .compare_exchange_weak(current.raw(), current.begin_write().raw(), AcqRel, Relaxed)
                .is_ok()
            {
                return Some(current);
            }
            backoff.spin();
        }
    }
}

impl<T> Drop for MpscSwapQueue<T> {
    fn drop(&mut self) {
        // Exclusive access: no producer or guard can be alive here. Pending
        // items sit in the active buffer's prefix; the idle buffer was either
        // never written or drained by its snapshot guard.
        let header = Header::from_raw(self.header.load(Relaxed));
        let pending = header.index().min(self.capacity);
        for i in 0..pending {
            // SAFETY: slots [0, pending) of the active buffer hold values
            // that were published and never snapshotted.
            unsafe { ptr::drop_in_place(self.buffers[header.active()].slot(i)) };
        }

        if let Some(pool) = self.pool.take() {
            for buffer in &mut self.buffers {
                pool.give_back(std::mem::replace(buffer, RawBuffer::empty()));
            }
        }
    }
}

/// Lowers the in-flight writer count on drop, panic or not.
struct EndWrite<'a> {
    header: &'a CachePadded<AtomicU64>,
}

impl Drop for EndWrite<'_> {
    fn drop(&mut self) {
        let backoff = Backoff::new();
        loop {
            let current = Header::from_raw(self.header.load(Relaxed));
            if self
                .header
                .compare_exchange_weak(current.raw(), current.end_write().raw(), AcqRel, Relaxed)
                .is_ok()
            {
                return;
            }
            backoff.spin();
        }
    }
}

/// Read guard over one frozen epoch of an [`MpscSwapQueue`].
///
/// Derefs to a slice of everything accepted into the epoch. Dropping the
/// guard drops the values and lets the consumer take the next snapshot; each
/// value therefore appears in exactly one snapshot.
///
/// The guard may move to another thread (`T: Send` suffices; access stays
/// exclusive), but sharing `&Snapshot` across threads hands out `&T` on each
/// of them, so that is only allowed for `T: Sync`:
///
/// ```compile_fail
/// use std::cell::Cell;
/// use flipring::sync::MpscSwapQueue;
///
/// fn shareable<T: Sync>(_: &T) {}
///
/// let queue: MpscSwapQueue<Cell<u64>> = MpscSwapQueue::new(4).unwrap();
/// queue.try_push(Cell::new(1));
/// let snap = queue.snapshot().unwrap();
/// shareable(&snap);
/// ```
pub struct Snapshot<'a, T> {
    queue: &'a MpscSwapQueue<T>,
    /// Which buffer this guard froze (the one that was active pre-swap).
    buffer: usize,
    len: usize,
    /// Opts out of auto-`Sync`; shared access is granted back for `T: Sync`
    /// only, below.
    _not_auto_sync: PhantomData<Cell<()>>,
}

// SAFETY: A shared guard exposes `&T` (via `Deref`) on every thread holding
// it, nothing else; `T: Sync` is exactly the permission for that. The same
// bound `std::sync::MutexGuard` requires.
unsafe impl<T: Sync> Sync for Snapshot<'_, T> {}

impl<T> fmt::Debug for Snapshot<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<T> Deref for Snapshot<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: slots [0, len) of the frozen buffer were fully published
        // before the swap committed (the swap only succeeds at zero in-flight
        // writers), and no producer touches this buffer while the guard
        // blocks the next swap.
        unsafe { slice::from_raw_parts(self.queue.buffers[self.buffer].base(), self.len) }
    }
}

impl<T> Drop for Snapshot<'_, T> {
    fn drop(&mut self) {
        for i in 0..self.len {
            // SAFETY: same initialization argument as `deref`; after this
            // loop the slots are uninitialized again, which the next epoch's
            // writers rely on.
            unsafe { ptr::drop_in_place(self.queue.buffers[self.buffer].slot(i)) };
        }
        self.queue.reading.store(false, Release);
    }
}
