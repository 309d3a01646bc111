//! A single atomically-updatable sample bound to a label-value tuple
//! (spec §3 "Sample").

use std::sync::atomic::{AtomicU64, Ordering};

/// One numeric cell belonging to a metric family for a specific label
/// tuple, plus its pre-rendered L-value string.
///
/// The f64 value lives in an `AtomicU64` via bit-reinterpretation; `add`
/// uses a compare-and-swap loop so concurrent adders never lose a delta,
/// following the same pattern `metrics-util`'s gauge handle uses for its
/// `fetch_update`-based updates.
#[derive(Debug)]
pub struct Sample {
    l_value: String,
    bits: AtomicU64,
}

impl Sample {
    pub fn new(l_value: String, initial: f64) -> Self {
        Self {
            l_value,
            bits: AtomicU64::new(initial.to_bits()),
        }
    }

    pub fn l_value(&self) -> &str {
        &self.l_value
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::SeqCst);
    }

    /// Atomically adds `delta` to the current value, preserving the
    /// exact delta under contention.
    pub fn add(&self, delta: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                let current = f64::from_bits(bits);
                Some((current + delta).to_bits())
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn add_accumulates_exact_deltas_under_contention() {
        let sample = Arc::new(Sample::new("x".to_string(), 0.0));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let sample = Arc::clone(&sample);
                thread::spawn(move || {
                    for _ in 0..1_000 {
                        sample.add(1.0);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sample.get(), 10_000.0);
    }

    #[test]
    fn set_overwrites_regardless_of_prior_value() {
        let sample = Sample::new("x".to_string(), 5.0);
        sample.set(42.0);
        assert_eq!(sample.get(), 42.0);
    }
}
