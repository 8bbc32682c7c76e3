//! Reusable in-process primitives: a lock-free double-buffered MPSC queue, a
//! concurrent overwrite ring, a rentable buffer pool, and a handful of
//! single-pass helpers (hashing, deterministic random, numeric and statistics
//! utilities, a fixed-size cache).
//!
//! The two concurrent structures live in [`sync`]:
//! - [`sync::MpscSwapQueue`]: many producers append while one consumer
//!   atomically swaps buffers and reads a consistent snapshot.
//! - [`sync::RingOverwriteBuffer`]: fixed-capacity ring that overwrites the
//!   oldest unread entry when full.

pub mod cache;
pub mod error;

pub mod sync {
    pub(crate) mod header;
    pub mod pool;
    pub mod ring;
    pub mod swap;

    pub use pool::BufferPool;
    pub use ring::{RingOverwriteBuffer, MAX_RING_CAPACITY, MIN_RING_CAPACITY};
    pub use swap::{MpscSwapQueue, Snapshot};
}

pub mod util {
    pub mod hash;
    pub mod num;
    pub mod rng;
    pub mod stats;
}

pub use cache::FixedCache;
pub use error::{Error, Result};
