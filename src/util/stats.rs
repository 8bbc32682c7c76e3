//! One-pass summary statistics.

use crate::error::{Error, Result};

/// Summary of a sample: count, extrema, mean, sample variance, and standard
/// deviation, computed in a single pass (Welford's update).
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample variance (`n - 1` denominator); zero for a single sample.
    pub variance: f64,
    pub std_dev: f64,
}

impl Summary {
    /// Summarizes `samples`.
    ///
    /// # Returns
    /// * `Err(Error::Empty)` for an empty input.
    pub fn from_slice(samples: &[f64]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::Empty);
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut mean = 0.0f64;
        let mut m2 = 0.0f64;

        for (i, &x) in samples.iter().enumerate() {
            min = min.min(x);
            max = max.max(x);
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        }

        let count = samples.len();
        let variance = if count > 1 { m2 / (count - 1) as f64 } else { 0.0 };

        Ok(Self {
            count,
            min,
            max,
            mean,
            variance,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(Summary::from_slice(&[]), Err(Error::Empty));
    }

    #[test]
    fn single_sample() {
        let s = Summary::from_slice(&[42.0]).unwrap();
        assert_eq!(s.count, 1);
        assert!(close(s.mean, 42.0));
        assert!(close(s.variance, 0.0));
    }

    #[test]
    fn known_sample() {
        // variance of {2, 4, 4, 4, 5, 5, 7, 9} with n-1 denominator = 32/7
        let s = Summary::from_slice(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(s.count, 8);
        assert!(close(s.mean, 5.0));
        assert!(close(s.variance, 32.0 / 7.0));
        assert!(close(s.min, 2.0));
        assert!(close(s.max, 9.0));
        assert!(close(s.std_dev, (32.0f64 / 7.0).sqrt()));
    }
}
