//! Packed header word for the double-buffered MPSC queue.
//!
//! A single `u64` encodes the three pieces of state a queue transition has to
//! change together, so one CAS can move all of them atomically:
//!
//! ```text
//! bit 63      bits 32..=39        bits 0..=31
//! +--------+-------------------+------------------+
//! | active | in-flight writers | write index      |
//! +--------+-------------------+------------------+
//! ```
//!
//! - The write index names the next free slot in the active buffer. It never
//!   exceeds the configured capacity because callers only apply
//!   [`Header::begin_write`] after checking `index < capacity`.
//! - The writer count is incremented before a slot store and decremented after
//!   it. When a consumer observes zero here, every writer that reserved a slot
//!   under this header has finished its store.
//! - The top bit selects which of the two buffers is currently active.

const INDEX_BITS: u32 = 32;
const PRODUCER_BITS: u32 = 8;

const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const PRODUCER_SHIFT: u32 = INDEX_BITS;
const PRODUCER_MASK: u64 = ((1 << PRODUCER_BITS) - 1) << PRODUCER_SHIFT;
const ACTIVE_BIT: u64 = 1 << 63;

/// Largest capacity the 32-bit index field can address.
pub(crate) const MAX_CAPACITY: usize = u32::MAX as usize;

/// Largest number of writers that may be mid-store at once.
///
/// `begin_write` transitions are refused (spun on) at this value, so the
/// counter can never wrap into the neighbouring field.
pub(crate) const MAX_PRODUCERS: u32 = (1 << PRODUCER_BITS) - 1;

/// Decoded view of one header word.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Header(u64);

impl Header {
    /// Construction-time state: buffer 0 active, empty, no writers.
    pub(crate) const INITIAL: Header = Header(0);

    #[inline]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Header(raw)
    }

    #[inline]
    pub(crate) fn raw(self) -> u64 {
        self.0
    }

    /// Next free slot index in the active buffer.
    #[inline]
    pub(crate) fn index(self) -> usize {
        (self.0 & INDEX_MASK) as usize
    }

    /// Number of writers currently between reserve and publish.
    #[inline]
    pub(crate) fn producers(self) -> u32 {
        ((self.0 & PRODUCER_MASK) >> PRODUCER_SHIFT) as u32
    }

    /// Which of the two buffers is active (0 or 1).
    #[inline]
    pub(crate) fn active(self) -> usize {
        (self.0 >> 63) as usize
    }

    /// True when no more `begin_write` transitions fit in the counter field.
    #[inline]
    pub(crate) fn producers_saturated(self) -> bool {
        self.producers() == MAX_PRODUCERS
    }

    /// Header after a writer reserves the current index.
    ///
    /// Post-increment: the caller writes to `self.index()`, the successor
    /// header points at the next slot. The caller must have checked
    /// `index < capacity` and `!producers_saturated()` first.
    #[inline]
    pub(crate) fn begin_write(self) -> Header {
        debug_assert!(self.index() < MAX_CAPACITY, "write index would overflow");
        debug_assert!(!self.producers_saturated(), "producer count would overflow");
        Header(self.0 + 1 + (1 << PRODUCER_SHIFT))
    }

    /// Header after a writer finishes its slot store.
    #[inline]
    pub(crate) fn end_write(self) -> Header {
        debug_assert!(self.producers() > 0, "end_write without a matching begin_write");
        Header(self.0 - (1 << PRODUCER_SHIFT))
    }

    /// Header after the consumer swaps buffers.
    ///
    /// Only valid on a header with `producers() == 0`; the swapped header
    /// flips the active bit and resets the index for the new epoch.
    #[inline]
    pub(crate) fn swapped(self) -> Header {
        debug_assert!(self.producers() == 0, "swap with writers in flight");
        Header((self.0 & ACTIVE_BIT) ^ ACTIVE_BIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_header_is_empty() {
        let h = Header::INITIAL;
        assert_eq!(h.index(), 0);
        assert_eq!(h.producers(), 0);
        assert_eq!(h.active(), 0);
    }

    #[test]
    fn begin_write_advances_index_and_count() {
        let h = Header::INITIAL.begin_write();
        assert_eq!(h.index(), 1);
        assert_eq!(h.producers(), 1);
        assert_eq!(h.active(), 0);
    }

    #[test]
    fn end_write_only_touches_the_count() {
        let h = Header::INITIAL.begin_write().begin_write().end_write();
        assert_eq!(h.index(), 2);
        assert_eq!(h.producers(), 1);
    }

    #[test]
    fn fields_do_not_bleed_into_each_other() {
        let mut h = Header::INITIAL;
        for _ in 0..MAX_PRODUCERS {
            h = h.begin_write();
        }
        assert_eq!(h.index(), MAX_PRODUCERS as usize);
        assert_eq!(h.producers(), MAX_PRODUCERS);
        assert!(h.producers_saturated());
        assert_eq!(h.active(), 0);

        for _ in 0..MAX_PRODUCERS {
            h = h.end_write();
        }
        assert_eq!(h.producers(), 0);
        assert_eq!(h.index(), MAX_PRODUCERS as usize);
    }

    #[test]
    fn swap_flips_active_and_resets_index() {
        let h = Header::INITIAL.begin_write().end_write();
        assert_eq!(h.index(), 1);

        let swapped = h.swapped();
        assert_eq!(swapped.active(), 1);
        assert_eq!(swapped.index(), 0);
        assert_eq!(swapped.producers(), 0);

        let back = swapped.swapped();
        assert_eq!(back.active(), 0);
    }

    #[test]
    fn raw_round_trip() {
        let h = Header::INITIAL.begin_write().end_write().swapped();
        assert_eq!(Header::from_raw(h.raw()), h);
    }
}
