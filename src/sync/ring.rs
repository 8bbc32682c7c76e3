//! Fixed-capacity concurrent ring buffer with overwrite-on-full semantics.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};

use crossbeam_utils::atomic::AtomicCell;
use crossbeam_utils::{Backoff, CachePadded};
use tracing::debug;

use crate::error::{Error, Result};
use crate::util::num::ceil_pow2;

/// Smallest accepted capacity. One slot cannot distinguish "wrapped" from
/// "never written", so construction refuses it.
pub const MIN_RING_CAPACITY: usize = 2;

/// Largest accepted capacity: the biggest power of two a `usize` can hold,
/// so rounding up never overflows.
pub const MAX_RING_CAPACITY: usize = 1 << (usize::BITS - 1);

/// A thread-safe circular buffer that overwrites the oldest unread entry once
/// capacity is reached. Any number of threads may write and read concurrently.
///
/// ### Concurrency Design
/// - **Writers**: claim the next write slot by a CAS loop on `write_cursor`,
///   then store into the claimed slot. The unread `count` is incremented
///   afterwards, saturating at capacity: a saturated increment means an unread
///   entry was just overwritten and its data is lost. That loss is the
///   documented overwrite-on-full policy, not an error.
/// - **Readers**: claim an unread entry by a CAS decrement on `count` (zero
///   means empty), then claim the next read slot by a CAS loop on
///   `read_cursor`. A reader that has been lapped by writers fast-forwards its
///   claim to the oldest surviving entry, exactly `capacity` behind the write
///   cursor.
///
/// ### Known limitation
/// Cursor arbitration is per-cursor, so under heavy contention with a small
/// capacity a reader can be lapped *between* claiming its slot and loading the
/// value, observing a newer value than the one logically at its position.
/// Slots are [`AtomicCell`]s, so such a read is stale but never torn. This is
/// accepted, documented behavior; callers needing a loss-free feed should use
/// [`MpscSwapQueue`](crate::sync::MpscSwapQueue) instead.
///
/// FIFO order is only meaningful between a single writer and a single reader;
/// concurrent writers land in whatever order their CASes win.
pub struct RingOverwriteBuffer<T> {
    slots: Box<[AtomicCell<T>]>,

    /// Bitmask wrapping monotonic cursors onto slot indices (`capacity - 1`).
    mask: usize,

    /// Monotonic claim counter for writers. Padded against false sharing.
    write_cursor: CachePadded<AtomicUsize>,

    /// Monotonic claim counter for readers.
    read_cursor: CachePadded<AtomicUsize>,

    /// Valid unread entries, `0..=capacity`. Saturates at capacity.
    count: CachePadded<AtomicUsize>,
}

impl<T> core::fmt::Debug for RingOverwriteBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingOverwriteBuffer")
            .field("capacity", &(self.mask + 1))
            .finish_non_exhaustive()
    }
}

impl<T: Copy + Default> RingOverwriteBuffer<T> {
    /// Creates a buffer holding at least `capacity` entries.
    ///
    /// The capacity is rounded up to the next power of two so cursor wrapping
    /// is a single mask. Slots are initialized to `T::default()`; they are
    /// never exposed through `read` before being written, but `copy_to` dumps
    /// them as-is.
    ///
    /// # Returns
    /// * `Err(Error::InvalidCapacity)` when `capacity` is below
    ///   [`MIN_RING_CAPACITY`] or above [`MAX_RING_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        if !(MIN_RING_CAPACITY..=MAX_RING_CAPACITY).contains(&capacity) {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                min: MIN_RING_CAPACITY,
                max: MAX_RING_CAPACITY,
            });
        }
        let capacity = ceil_pow2(capacity)?;
        debug!(capacity, "ring buffer created");

        let slots = (0..capacity).map(|_| AtomicCell::new(T::default())).collect();
        Ok(Self {
            slots,
            mask: capacity - 1,
            write_cursor: CachePadded::new(AtomicUsize::new(0)),
            read_cursor: CachePadded::new(AtomicUsize::new(0)),
            count: CachePadded::new(AtomicUsize::new(0)),
        })
    }
}

impl<T: Copy> RingOverwriteBuffer<T> {
    /// Number of slots, always a power of two and `>=` the requested capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Current number of valid unread entries.
    ///
    /// Best-effort under concurrency: writers and readers may move it between
    /// the load and any action the caller takes on it.
    #[inline]
    pub fn len(&self) -> usize {
        self.count.load(Relaxed)
    }

    /// True when no unread entry is available right now.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes `value`, overwriting the oldest unread entry when full.
    ///
    /// Never fails and never blocks beyond CAS retries.
    pub fn write(&self, value: T) {
        let claimed = self.claim_write_slot();
        self.slots[claimed & self.mask].store(value);

        // Saturating increment: at capacity the write just overwrote an
        // unread slot, so the number of valid entries is unchanged.
        let backoff = Backoff::new();
        loop {
            let n = self.count.load(Acquire);
            if n == self.capacity() {
                break;
            }
            if self
                .count
                .compare_exchange_weak(n, n + 1, AcqRel, Acquire)
                .is_ok()
            {
                break;
            }
            backoff.spin();
        }
    }

    /// Removes and returns the oldest unread entry.
    ///
    /// # Returns
    /// * `Err(Error::Empty)` when no entry was available at the check. The
    ///   check is non-blocking and best-effort; a concurrent writer may land
    ///   immediately after it.
    pub fn read(&self) -> Result<T> {
        self.try_read().ok_or(Error::Empty)
    }

    /// Non-failing variant of [`read`](Self::read): `None` when empty.
    pub fn try_read(&self) -> Option<T> {
        if !self.claim_unread() {
            return None;
        }
        let claimed = self.claim_read_slot();
        Some(self.slots[claimed & self.mask].load())
    }

    /// Copies the entire backing array into `dest` starting at `start`.
    ///
    /// This is a raw dump of all `capacity()` slots in physical order, valid
    /// and stale entries alike, not a logical drain. Cursors and count are
    /// untouched.
    ///
    /// # Returns
    /// * `Err(Error::DestinationTooSmall)` when `dest[start..]` cannot hold
    ///   `capacity()` values.
    pub fn copy_to(&self, dest: &mut [T], start: usize) -> Result<()> {
        let needed = self.capacity();
        let available = dest.len().saturating_sub(start);
        if available < needed {
            return Err(Error::DestinationTooSmall { needed, available });
        }
        for (i, slot) in self.slots.iter().enumerate() {
            dest[start + i] = slot.load();
        }
        Ok(())
    }

    /// Claims the next write cursor value. The slot it maps to is uniquely
    /// owned by this writer until another writer laps the ring.
    fn claim_write_slot(&self) -> usize {
        let backoff = Backoff::new();
        loop {
            let cursor = self.write_cursor.load(Relaxed);
            if self
                .write_cursor
                .compare_exchange_weak(cursor, cursor.wrapping_add(1), AcqRel, Relaxed)
                .is_ok()
            {
                return cursor;
            }
            backoff.spin();
        }
    }

    /// Takes one unit off `count`, failing when the buffer is empty.
    fn claim_unread(&self) -> bool {
        let backoff = Backoff::new();
        loop {
            let n = self.count.load(Acquire);
            if n == 0 {
                return false;
            }
            if self
                .count
                .compare_exchange_weak(n, n - 1, AcqRel, Acquire)
                .is_ok()
            {
                return true;
            }
            backoff.spin();
        }
    }

    /// Claims the next read cursor value, fast-forwarding past entries the
    /// writers have already overwritten.
    fn claim_read_slot(&self) -> usize {
        let backoff = Backoff::new();
        loop {
            let write = self.write_cursor.load(Acquire);
            let read = self.read_cursor.load(Acquire);

            // Lapped readers jump to the oldest surviving entry.
            let behind = write.wrapping_sub(read);
            let target = if behind > self.capacity() {
                write.wrapping_sub(self.capacity())
            } else {
                read
            };

            if self
                .read_cursor
                .compare_exchange_weak(read, target.wrapping_add(1), AcqRel, Relaxed)
                .is_ok()
            {
                return target;
            }
            backoff.spin();
        }
    }
}
