//! Small numeric helpers shared by the fixed-size structures.

use crate::error::{Error, Result};

/// True when `n` is a power of two (zero is not).
#[inline]
pub fn is_pow2(n: usize) -> bool {
    n != 0 && n & (n - 1) == 0
}

/// Rounds `n` up to the next power of two.
///
/// # Returns
/// * `Err(Error::InvalidCapacity)` when `n` is zero or the result would not
///   fit in `usize`.
pub fn ceil_pow2(n: usize) -> Result<usize> {
    let max = 1usize << (usize::BITS - 1);
    if n == 0 || n > max {
        return Err(Error::InvalidCapacity {
            requested: n,
            min: 1,
            max,
        });
    }
    // Cannot fail after the bound check above.
    Ok(n.next_power_of_two())
}

/// Deterministic primality test by trial division over `6k ± 1` candidates.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut k = 5u64;
    while k.saturating_mul(k) <= n {
        if n % k == 0 || n % (k + 2) == 0 {
            return false;
        }
        k += 6;
    }
    true
}

/// Smallest prime strictly greater than `n`.
pub fn next_prime(n: u64) -> u64 {
    let mut candidate = n.saturating_add(1).max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow2_checks() {
        assert!(is_pow2(1));
        assert!(is_pow2(4096));
        assert!(!is_pow2(0));
        assert!(!is_pow2(12));
    }

    #[test]
    fn ceil_pow2_rounds_up() {
        assert_eq!(ceil_pow2(1).unwrap(), 1);
        assert_eq!(ceil_pow2(5).unwrap(), 8);
        assert_eq!(ceil_pow2(64).unwrap(), 64);
        assert!(ceil_pow2(0).is_err());
        assert!(ceil_pow2(usize::MAX).is_err());
    }

    #[test]
    fn primality() {
        let primes = [2u64, 3, 5, 7, 11, 13, 104729];
        for p in primes {
            assert!(is_prime(p), "{p} should be prime");
        }
        for c in [0u64, 1, 4, 9, 100, 104730] {
            assert!(!is_prime(c), "{c} should not be prime");
        }
        assert_eq!(next_prime(0), 2);
        assert_eq!(next_prime(7), 11);
        assert_eq!(next_prime(100), 101);
    }
}
