//! Metric families: counters, gauges, and histograms, each a named,
//! typed collection of samples keyed by label-value tuple (spec §3, §4.1).

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::error::PromError;
use crate::histogram::{HistogramBuckets, HistogramSample};
use crate::label::{build_l_value, validate_metric_name};
use crate::metric_type::MetricType;
use crate::sample::Sample;

/// Behavior shared by every concrete family type so collectors and the
/// formatter can hold a heterogeneous, name-addressed set of them.
pub trait MetricFamily: Send + Sync {
    fn name(&self) -> &str;
    fn help(&self) -> &str;
    fn metric_type(&self) -> MetricType;

    /// Appends this family's rendered sample lines (but not the
    /// trailing blank line between families) to `out`, in
    /// label-tuple-insertion order.
    fn render_samples(&self, out: &mut String, prefix: &str, format_value: &dyn Fn(f64) -> String);
}

fn validate_label_values(label_keys: &[String], label_values: &[String]) -> Result<(), PromError> {
    if label_values.len() != label_keys.len() {
        return Err(PromError::InvalidInput(format!(
            "expected {} label values, got {}",
            label_keys.len(),
            label_values.len()
        )));
    }
    if label_values.iter().any(|v| v.is_empty()) {
        return Err(PromError::InvalidInput(
            "label values must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn to_owned_values(label_values: &[&str]) -> Vec<String> {
    label_values.iter().map(|s| s.to_string()).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Counter / Gauge share a Sample-based core
// ═══════════════════════════════════════════════════════════════════════

struct ScalarCore {
    name: String,
    help: String,
    metric_type: MetricType,
    label_keys: Vec<String>,
    samples: RwLock<IndexMap<Vec<String>, Arc<Sample>>>,
}

impl ScalarCore {
    fn new(name: impl Into<String>, help: impl Into<String>, label_keys: Vec<String>, metric_type: MetricType) -> Result<Self, PromError> {
        let name = name.into();
        validate_metric_name(&name)?;
        let core = Self {
            name,
            help: help.into(),
            metric_type,
            label_keys,
            samples: RwLock::new(IndexMap::new()),
        };
        if core.label_keys.is_empty() {
            // Eagerly create the single zero-label sample.
            let l_value = build_l_value(&core.name, None, &core.label_keys, &[]);
            core.samples
                .write()
                .unwrap()
                .insert(Vec::new(), Arc::new(Sample::new(l_value, 0.0)));
        }
        Ok(core)
    }

    fn sample_for(&self, label_values: &[&str]) -> Result<Arc<Sample>, PromError> {
        let values = to_owned_values(label_values);
        validate_label_values(&self.label_keys, &values)?;

        if let Some(sample) = self.samples.read().unwrap().get(&values) {
            return Ok(Arc::clone(sample));
        }
        let mut guard = self.samples.write().unwrap();
        if let Some(sample) = guard.get(&values) {
            return Ok(Arc::clone(sample));
        }
        let l_value = build_l_value(&self.name, None, &self.label_keys, &values);
        let sample = Arc::new(Sample::new(l_value, 0.0));
        guard.insert(values, Arc::clone(&sample));
        Ok(sample)
    }

    fn render_samples(&self, out: &mut String, prefix: &str, format_value: &dyn Fn(f64) -> String) {
        for sample in self.samples.read().unwrap().values() {
            out.push_str(prefix);
            out.push_str(sample.l_value());
            out.push(' ');
            out.push_str(&format_value(sample.get()));
            out.push('\n');
        }
    }
}

/// A named, labeled counter family. Monotonically non-decreasing per
/// label tuple.
pub struct Counter {
    core: ScalarCore,
}

impl Counter {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_keys: Vec<String>) -> Result<Self, PromError> {
        Ok(Self {
            core: ScalarCore::new(name, help, label_keys, MetricType::Counter)?,
        })
    }

    pub fn inc(&self, label_values: &[&str]) -> Result<(), PromError> {
        self.add(label_values, 1.0)
    }

    pub fn add(&self, label_values: &[&str], v: f64) -> Result<(), PromError> {
        if v < 0.0 {
            return Err(PromError::InvalidInput(
                "counter add delta must be >= 0".to_string(),
            ));
        }
        self.core.sample_for(label_values)?.add(v);
        Ok(())
    }

    /// Sets the value iff `v >= 0`. Intended for the process collector,
    /// whose "counters" are snapshots of an externally-monotone
    /// quantity sampled from procfs, not for general counter mutation
    /// (see DESIGN.md's note on the source's `prom_counter_reset`).
    pub fn reset(&self, label_values: &[&str], v: f64) -> Result<(), PromError> {
        if v < 0.0 {
            return Err(PromError::InvalidInput(
                "counter reset value must be >= 0".to_string(),
            ));
        }
        self.core.sample_for(label_values)?.set(v);
        Ok(())
    }

    pub fn get(&self, label_values: &[&str]) -> Result<f64, PromError> {
        Ok(self.core.sample_for(label_values)?.get())
    }
}

impl MetricFamily for Counter {
    fn name(&self) -> &str {
        &self.core.name
    }
    fn help(&self) -> &str {
        &self.core.help
    }
    fn metric_type(&self) -> MetricType {
        self.core.metric_type
    }
    fn render_samples(&self, out: &mut String, prefix: &str, format_value: &dyn Fn(f64) -> String) {
        self.core.render_samples(out, prefix, format_value)
    }
}

/// A named, labeled gauge family. Freely mutable per label tuple.
pub struct Gauge {
    core: ScalarCore,
}

impl Gauge {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label_keys: Vec<String>) -> Result<Self, PromError> {
        Ok(Self {
            core: ScalarCore::new(name, help, label_keys, MetricType::Gauge)?,
        })
    }

    pub fn set(&self, label_values: &[&str], v: f64) -> Result<(), PromError> {
        self.core.sample_for(label_values)?.set(v);
        Ok(())
    }

    pub fn inc(&self, label_values: &[&str]) -> Result<(), PromError> {
        self.add(label_values, 1.0)
    }

    pub fn dec(&self, label_values: &[&str]) -> Result<(), PromError> {
        self.sub(label_values, 1.0)
    }

    pub fn add(&self, label_values: &[&str], v: f64) -> Result<(), PromError> {
        self.core.sample_for(label_values)?.add(v);
        Ok(())
    }

    pub fn sub(&self, label_values: &[&str], v: f64) -> Result<(), PromError> {
        self.core.sample_for(label_values)?.add(-v);
        Ok(())
    }

    pub fn get(&self, label_values: &[&str]) -> Result<f64, PromError> {
        Ok(self.core.sample_for(label_values)?.get())
    }
}

impl MetricFamily for Gauge {
    fn name(&self) -> &str {
        &self.core.name
    }
    fn help(&self) -> &str {
        &self.core.help
    }
    fn metric_type(&self) -> MetricType {
        self.core.metric_type
    }
    fn render_samples(&self, out: &mut String, prefix: &str, format_value: &dyn Fn(f64) -> String) {
        self.core.render_samples(out, prefix, format_value)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Histogram
// ═══════════════════════════════════════════════════════════════════════

/// A named, labeled histogram family.
pub struct Histogram {
    name: String,
    help: String,
    label_keys: Vec<String>,
    buckets: HistogramBuckets,
    samples: RwLock<IndexMap<Vec<String>, Arc<HistogramSample>>>,
}

impl Histogram {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        label_keys: Vec<String>,
        buckets: HistogramBuckets,
    ) -> Result<Self, PromError> {
        let name = name.into();
        validate_metric_name(&name)?;
        let family = Self {
            name,
            help: help.into(),
            label_keys,
            buckets,
            samples: RwLock::new(IndexMap::new()),
        };
        if family.label_keys.is_empty() {
            let sample = Arc::new(HistogramSample::new(
                &family.name,
                family.buckets.clone(),
                &family.label_keys,
                &[],
            ));
            family.samples.write().unwrap().insert(Vec::new(), sample);
        }
        Ok(family)
    }

    fn sample_for(&self, label_values: &[&str]) -> Result<Arc<HistogramSample>, PromError> {
        let values = to_owned_values(label_values);
        validate_label_values(&self.label_keys, &values)?;

        if let Some(sample) = self.samples.read().unwrap().get(&values) {
            return Ok(Arc::clone(sample));
        }
        let mut guard = self.samples.write().unwrap();
        if let Some(sample) = guard.get(&values) {
            return Ok(Arc::clone(sample));
        }
        let sample = Arc::new(HistogramSample::new(&self.name, self.buckets.clone(), &self.label_keys, &values));
        guard.insert(values, Arc::clone(&sample));
        Ok(sample)
    }

    pub fn observe(&self, label_values: &[&str], v: f64) -> Result<(), PromError> {
        self.sample_for(label_values)?.observe(v);
        Ok(())
    }
}

impl MetricFamily for Histogram {
    fn name(&self) -> &str {
        &self.name
    }
    fn help(&self) -> &str {
        &self.help
    }
    fn metric_type(&self) -> MetricType {
        MetricType::Histogram
    }
    fn render_samples(&self, out: &mut String, prefix: &str, format_value: &dyn Fn(f64) -> String) {
        for sample in self.samples.read().unwrap().values() {
            for (l_value, count) in sample.cumulative_buckets() {
                out.push_str(prefix);
                out.push_str(l_value);
                out.push(' ');
                out.push_str(&format_value(count as f64));
                out.push('\n');
            }
            out.push_str(prefix);
            out.push_str(sample.sum_l_value());
            out.push(' ');
            out.push_str(&format_value(sample.sum()));
            out.push('\n');

            out.push_str(prefix);
            out.push_str(sample.count_l_value());
            out.push(' ');
            out.push_str(&format_value(sample.count() as f64));
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_malformed_name() {
        assert!(Counter::new("bad-name", "help", vec![]).is_err());
    }

    #[test]
    fn zero_label_family_has_an_eager_sample() {
        let c = Counter::new("requests_total", "help", vec![]).unwrap();
        assert_eq!(c.get(&[]).unwrap(), 0.0);
    }

    #[test]
    fn sample_for_rejects_wrong_arity_or_empty_values() {
        let c = Counter::new("requests_total", "help", vec!["method".to_string()]).unwrap();
        assert!(c.inc(&[]).is_err());
        assert!(c.inc(&["", ]).is_err());
        assert!(c.inc(&["GET", "extra"]).is_err());
    }

    #[test]
    fn counter_add_rejects_negative_delta() {
        let c = Counter::new("c", "help", vec![]).unwrap();
        assert!(matches!(c.add(&[], -1.0), Err(PromError::InvalidInput(_))));
    }

    #[test]
    fn gauge_supports_bidirectional_updates() {
        let g = Gauge::new("g", "help", vec!["label".to_string()]).unwrap();
        g.set(&["foo"], 2.0).unwrap();
        assert_eq!(g.get(&["foo"]).unwrap(), 2.0);
        g.inc(&["foo"]).unwrap();
        g.dec(&["foo"]).unwrap();
        assert_eq!(g.get(&["foo"]).unwrap(), 2.0);
    }

    #[test]
    fn histogram_family_creates_sample_on_first_observe() {
        let h = Histogram::new(
            "test_histogram",
            "help",
            vec![],
            HistogramBuckets::explicit(vec![5.0, 10.0]).unwrap(),
        )
        .unwrap();
        h.observe(&[], 3.0).unwrap();
        h.observe(&[], 7.0).unwrap();

        let mut out = String::new();
        h.render_samples(&mut out, "", &|v| v.to_string());
        assert!(out.contains(r#"test_histogram_bucket{le="5.0"} 1"#));
        assert!(out.contains(r#"test_histogram_bucket{le="10.0"} 2"#));
        assert!(out.contains(r#"test_histogram_bucket{le="+Inf"} 2"#));
        assert!(out.contains("test_histogram_sum 10"));
        assert!(out.contains("test_histogram_count 2"));
    }
}
