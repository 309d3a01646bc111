//! Histogram bucket construction and the histogram sample (spec §3, §4.2).

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::PromError;
use crate::label::build_l_value;

/// An ordered, strictly-ascending set of finite bucket upper bounds, plus
/// the implicit `+Inf` bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBuckets {
    upper_bounds: Vec<f64>,
}

impl HistogramBuckets {
    /// Uses the given finite doubles as-is. Requires strictly ascending
    /// order and at least one bound.
    pub fn explicit(bounds: Vec<f64>) -> Result<Self, PromError> {
        if bounds.is_empty() {
            return Err(PromError::InvalidInput(
                "histogram requires at least one bucket bound".to_string(),
            ));
        }
        for (i, b) in bounds.iter().enumerate() {
            if !b.is_finite() {
                return Err(PromError::InvalidInput(format!(
                    "bucket bound at index {i} is not finite: {b}"
                )));
            }
            if i > 0 && *b <= bounds[i - 1] {
                return Err(PromError::InvalidInput(format!(
                    "bucket bounds must be strictly ascending; index {i} ({b}) <= previous ({})",
                    bounds[i - 1]
                )));
            }
        }
        Ok(Self { upper_bounds: bounds })
    }

    /// `bounds[i] = start + i*width`. The original C source
    /// (`phb_linear`) rejects `count <= 1`; this implementation preserves
    /// that guard (`count >= 2`) to keep the library's existing test
    /// expectations intact.
    pub fn linear(start: f64, width: f64, count: usize) -> Result<Self, PromError> {
        if count < 2 {
            return Err(PromError::InvalidInput(
                "linear buckets require count >= 2".to_string(),
            ));
        }
        let mut bounds = Vec::with_capacity(count);
        let mut next = start;
        bounds.push(next);
        for _ in 1..count {
            next += width;
            bounds.push(next);
        }
        Self::explicit(bounds)
    }

    /// `bounds[i] = start * factor^i`. Requires `start > 0`, `factor >
    /// 1`, `count >= 1`.
    pub fn exponential(start: f64, factor: f64, count: usize) -> Result<Self, PromError> {
        if count < 1 {
            return Err(PromError::InvalidInput(
                "exponential buckets require count >= 1".to_string(),
            ));
        }
        if start <= 0.0 {
            return Err(PromError::InvalidInput(
                "exponential buckets require start > 0".to_string(),
            ));
        }
        if factor <= 1.0 {
            return Err(PromError::InvalidInput(
                "exponential buckets require factor > 1".to_string(),
            ));
        }
        let mut bounds = Vec::with_capacity(count);
        let mut next = start;
        bounds.push(next);
        for _ in 1..count {
            next *= factor;
            bounds.push(next);
        }
        Self::explicit(bounds)
    }

    /// The process-wide default buckets: Prometheus convention latency
    /// buckets in seconds. Materialized lazily on first use.
    pub fn default_buckets() -> &'static HistogramBuckets {
        static DEFAULT: OnceCell<HistogramBuckets> = OnceCell::new();
        DEFAULT.get_or_init(|| {
            HistogramBuckets::explicit(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ])
            .expect("default buckets are well-formed")
        })
    }

    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }
}

/// A composite of bucket counters, cumulative sum, and observation count
/// for one label tuple.
///
/// Buckets store *exact* per-bucket increments; cumulative counts are
/// computed at render time (spec §3's documented design decision).
#[derive(Debug)]
pub struct HistogramSample {
    buckets: HistogramBuckets,
    bucket_counts: Vec<AtomicU64>, // len = upper_bounds.len() + 1 (last slot is +Inf)
    sum_bits: AtomicU64,
    count: AtomicU64,
    bucket_l_values: Vec<String>, // parallel to bucket_counts
    sum_l_value: String,
    count_l_value: String,
}

impl HistogramSample {
    pub fn new(name: &str, buckets: HistogramBuckets, label_keys: &[String], label_values: &[String]) -> Self {
        let mut bucket_l_values = Vec::with_capacity(buckets.upper_bounds.len() + 1);
        for bound in &buckets.upper_bounds {
            let mut keys = label_keys.to_vec();
            let mut values = label_values.to_vec();
            keys.push("le".to_string());
            values.push(format_bound(*bound));
            bucket_l_values.push(build_l_value(name, Some("bucket"), &keys, &values));
        }
        {
            let mut keys = label_keys.to_vec();
            let mut values = label_values.to_vec();
            keys.push("le".to_string());
            values.push("+Inf".to_string());
            bucket_l_values.push(build_l_value(name, Some("bucket"), &keys, &values));
        }
        let sum_l_value = build_l_value(name, Some("sum"), label_keys, label_values);
        let count_l_value = build_l_value(name, Some("count"), label_keys, label_values);
        let bucket_count = bucket_l_values.len();

        Self {
            buckets,
            bucket_counts: (0..bucket_count).map(|_| AtomicU64::new(0)).collect(),
            sum_bits: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
            bucket_l_values,
            sum_l_value,
            count_l_value,
        }
    }

    /// Finds the lowest `upper_bounds[i] >= v` via binary search,
    /// atomically increments that bucket, adds `v` to the sum, and
    /// increments the observation count. Values not covered by any
    /// explicit bound fall into the implicit `+Inf` bucket.
    pub fn observe(&self, v: f64) {
        // Lowest index i with upper_bounds[i] >= v; falls through to the
        // trailing +Inf slot when no bound covers v.
        let idx = self.buckets.upper_bounds.partition_point(|&bound| bound < v);
        self.bucket_counts[idx].fetch_add(1, Ordering::SeqCst);
        let _ = self
            .sum_bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + v).to_bits())
            });
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum_bits.load(Ordering::SeqCst))
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn sum_l_value(&self) -> &str {
        &self.sum_l_value
    }

    pub fn count_l_value(&self) -> &str {
        &self.count_l_value
    }

    /// Cumulative bucket counts, rendered from the exact per-bucket
    /// increments at call time, paired with their L-value strings.
    pub fn cumulative_buckets(&self) -> Vec<(&str, u64)> {
        let mut running = 0u64;
        self.bucket_l_values
            .iter()
            .zip(self.bucket_counts.iter())
            .map(|(l_value, counter)| {
                running += counter.load(Ordering::SeqCst);
                (l_value.as_str(), running)
            })
            .collect()
    }
}

/// Renders a bucket's `le` label value. Rust's `Debug` impl for `f64`
/// always keeps a decimal point (`5.0`, not `5`), matching the
/// conventional Prometheus exposition of bucket bounds.
fn format_bound(bound: f64) -> String {
    format!("{bound:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_buckets_match_spec_example() {
        let b = HistogramBuckets::linear(0.0, 1.5, 3).unwrap();
        assert_eq!(b.upper_bounds(), &[0.0, 1.5, 3.0]);
    }

    #[test]
    fn linear_rejects_count_below_two() {
        assert!(HistogramBuckets::linear(0.0, 1.0, 1).is_err());
    }

    #[test]
    fn exponential_buckets_match_spec_example() {
        let b = HistogramBuckets::exponential(1.0, 2.0, 3).unwrap();
        assert_eq!(b.upper_bounds(), &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn exponential_rejects_bad_params() {
        assert!(HistogramBuckets::exponential(0.0, 2.0, 3).is_err());
        assert!(HistogramBuckets::exponential(1.0, 1.0, 3).is_err());
        assert!(HistogramBuckets::exponential(1.0, 2.0, 0).is_err());
    }

    #[test]
    fn explicit_requires_strictly_ascending() {
        assert!(HistogramBuckets::explicit(vec![1.0, 1.0]).is_err());
        assert!(HistogramBuckets::explicit(vec![2.0, 1.0]).is_err());
        assert!(HistogramBuckets::explicit(vec![]).is_err());
        assert!(HistogramBuckets::explicit(vec![f64::INFINITY]).is_err());
    }

    #[test]
    fn observe_places_values_in_the_right_buckets() {
        let buckets = HistogramBuckets::explicit(vec![5.0, 10.0]).unwrap();
        let sample = HistogramSample::new("test_histogram", buckets, &[], &[]);
        sample.observe(3.0);
        sample.observe(7.0);

        let cumulative = sample.cumulative_buckets();
        assert_eq!(cumulative[0].1, 1); // le=5.0
        assert_eq!(cumulative[1].1, 2); // le=10.0
        assert_eq!(sample.count(), 2);
        assert_eq!(sample.sum(), 10.0);
    }

    #[test]
    fn values_above_all_bounds_land_in_inf() {
        let buckets = HistogramBuckets::explicit(vec![1.0]).unwrap();
        let sample = HistogramSample::new("h", buckets, &[], &[]);
        sample.observe(100.0);
        let cumulative = sample.cumulative_buckets();
        assert_eq!(cumulative[0].1, 0);
        assert_eq!(cumulative[1].1, 1);
        assert!(cumulative[1].0.contains("+Inf"));
    }
}
