//! Fixed-size overwrite-on-collision cache.
//!
//! A flat table of `capacity` buckets addressed by key hash. Inserting into
//! an occupied bucket displaces whatever lived there, whether or not the keys
//! match; there is no probing, no chaining, and no eviction policy beyond
//! that. The win is a hard memory bound and O(1) everything.

use std::hash::{Hash, Hasher};

use crate::error::Result;
use crate::util::hash::Fnv1aHasher;
use crate::util::num::ceil_pow2;

/// Hash-addressed table with at-most-one entry per bucket.
///
/// Not synchronized: mutation goes through `&mut self`.
pub struct FixedCache<K, V> {
    buckets: Box<[Option<(K, V)>]>,
    mask: usize,
    len: usize,
}

impl<K: Hash + Eq, V> FixedCache<K, V> {
    /// Creates a cache with at least `capacity` buckets (rounded up to a
    /// power of two for mask addressing).
    ///
    /// # Returns
    /// * `Err(Error::InvalidCapacity)` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = ceil_pow2(capacity)?;
        let buckets = (0..capacity).map(|_| None).collect();
        Ok(Self {
            buckets,
            mask: capacity - 1,
            len: 0,
        })
    }

    /// Number of buckets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of occupied buckets.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` under `key`, returning the displaced entry if the
    /// bucket was occupied (possibly by an unrelated key; that collision
    /// loss is the designed trade-off).
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let bucket = self.bucket(&key);
        let displaced = self.buckets[bucket].replace((key, value));
        if displaced.is_none() {
            self.len += 1;
        }
        displaced
    }

    /// Looks up `key`, returning its value only when the bucket holds an
    /// entry for exactly this key.
    pub fn get(&self, key: &K) -> Option<&V> {
        match &self.buckets[self.bucket(key)] {
            Some((stored, value)) if stored == key => Some(value),
            _ => None,
        }
    }

    /// Removes the entry for `key` if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let bucket = self.bucket(key);
        let occupied_by_key = matches!(&self.buckets[bucket], Some((stored, _)) if stored == key);
        if !occupied_by_key {
            return None;
        }
        self.len -= 1;
        self.buckets[bucket].take().map(|(_, v)| v)
    }

    fn bucket(&self, key: &K) -> usize {
        let mut hasher = Fnv1aHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize) & self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut cache: FixedCache<String, u32> = FixedCache::new(16).unwrap();
        assert!(cache.insert("one".into(), 1).is_none());
        assert!(cache.insert("two".into(), 2).is_none());
        assert_eq!(cache.get(&"one".to_string()), Some(&1));
        assert_eq!(cache.get(&"missing".to_string()), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn same_key_overwrites_in_place() {
        let mut cache: FixedCache<&str, u32> = FixedCache::new(8).unwrap();
        cache.insert("k", 1);
        let displaced = cache.insert("k", 2);
        assert_eq!(displaced, Some(("k", 1)));
        assert_eq!(cache.get(&"k"), Some(&2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn colliding_keys_displace_each_other() {
        // Capacity 1: every key maps to bucket 0.
        let mut cache: FixedCache<u64, u64> = FixedCache::new(1).unwrap();
        cache.insert(1, 10);
        let displaced = cache.insert(2, 20);
        assert_eq!(displaced, Some((1, 10)));
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some(&20));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_checks_key_identity() {
        let mut cache: FixedCache<u64, &str> = FixedCache::new(1).unwrap();
        cache.insert(1, "a");
        // Bucket is occupied by key 1; removing key 2 must not disturb it.
        assert_eq!(cache.remove(&2), None);
        assert_eq!(cache.remove(&1), Some("a"));
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(FixedCache::<u64, u64>::new(0).is_err());
    }
}
