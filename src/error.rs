use thiserror::Error;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the concurrent structures and utility helpers.
///
/// Every error is reported synchronously to the caller of the operation that
/// detected it; there is no background error channel. Overwrite-on-full in the
/// ring buffer is designed behavior and is *not* reported as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A capacity outside the range a structure can represent.
    #[error("invalid capacity {requested} (expected {min}..={max})")]
    InvalidCapacity {
        /// The capacity the caller asked for.
        requested: usize,
        /// Smallest accepted capacity.
        min: usize,
        /// Largest accepted capacity.
        max: usize,
    },

    /// A read was attempted while no item was available.
    #[error("buffer is empty")]
    Empty,

    /// A second snapshot was requested while one is still outstanding.
    ///
    /// This is a programming error, not a transient condition to retry: the
    /// previous guard must be dropped first.
    #[error("a snapshot is already outstanding")]
    SnapshotHeld,

    /// A bulk copy destination with too few slots.
    #[error("destination holds {available} slots, {needed} required")]
    DestinationTooSmall {
        /// Slots the copy needs, counted from the starting offset.
        needed: usize,
        /// Slots actually available in the destination.
        available: usize,
    },
}
