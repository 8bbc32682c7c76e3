//! Reusable backing storage for the double-buffered queue.
//!
//! A [`BufferPool`] hands out fixed-capacity slot arrays and takes them back
//! when a queue is dropped, so short-lived queues do not pay an allocation per
//! construction. The pool is optional: queues built without one allocate fresh
//! storage and release it on drop.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use parking_lot::Mutex;
use tracing::trace;

/// Default number of idle buffers a pool keeps before dropping returns.
const DEFAULT_MAX_IDLE: usize = 16;

/// A fixed-capacity array of write-once slots.
///
/// Slots start uninitialized. The owning queue tracks which prefix of the
/// array holds live values; the pool only ever sees buffers whose slots have
/// all been dropped or were never written.
pub(crate) struct RawBuffer<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: A RawBuffer is plain storage. Moving it to another thread moves the
// (possibly initialized) T values with it, which is exactly what `T: Send`
// permits. All aliasing discipline lives in the owning queue.
unsafe impl<T: Send> Send for RawBuffer<T> {}

impl<T> RawBuffer<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self { slots }
    }

    /// Zero-slot placeholder used when storage is handed back to a pool.
    pub(crate) fn empty() -> Self {
        Self::with_capacity(0)
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Raw pointer to slot `index`.
    ///
    /// # Safety
    /// `index` must be within capacity. Whether the slot may be read, written,
    /// or dropped through the pointer is the caller's responsibility; the
    /// buffer itself enforces nothing.
    #[inline]
    pub(crate) unsafe fn slot(&self, index: usize) -> *mut T {
        debug_assert!(index < self.slots.len(), "slot index out of bounds");
        self.slots.get_unchecked(index).get().cast()
    }

    /// Pointer to the first slot, for building a prefix slice view.
    #[inline]
    pub(crate) fn base(&self) -> *const T {
        self.slots.as_ptr().cast()
    }
}

/// A rent/return pool of [`RawBuffer`]s, shared between queues via `Arc`.
///
/// Buffers are bucketed by exact capacity: `rent` reuses an idle buffer of the
/// requested capacity when one exists and allocates otherwise. Returned
/// buffers beyond the idle limit are simply dropped.
pub struct BufferPool<T> {
    free: Mutex<Vec<RawBuffer<T>>>,
    max_idle: usize,
}

impl<T> BufferPool<T> {
    /// Creates a pool keeping at most [`DEFAULT_MAX_IDLE`] idle buffers.
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates a pool with an explicit idle-buffer limit.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Takes an idle buffer of `capacity` slots, allocating when none is held.
    pub(crate) fn rent(&self, capacity: usize) -> RawBuffer<T> {
        let mut free = self.free.lock();
        if let Some(pos) = free.iter().position(|b| b.capacity() == capacity) {
            trace!(capacity, "reusing pooled buffer");
            return free.swap_remove(pos);
        }
        drop(free);

        trace!(capacity, "allocating fresh buffer");
        RawBuffer::with_capacity(capacity)
    }

    /// Returns a buffer to the free list.
    ///
    /// The buffer must not contain initialized slots; the queue drops pending
    /// items before handing storage back.
    pub(crate) fn give_back(&self, buffer: RawBuffer<T>) {
        if buffer.capacity() == 0 {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(buffer);
        }
        // Past the idle limit the buffer just drops here.
    }
}

impl<T> Default for BufferPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
