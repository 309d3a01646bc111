//! Collectors: named groups of metric families, optionally backed by a
//! custom collect function invoked at scrape time (spec §3, §4.3).

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::error::PromError;
use crate::family::MetricFamily;
use crate::label::validate_metric_name;

const RESERVED_NAMES: &[&str] = &["default", "process"];

/// A named group of metric families. A registry owns a set of these;
/// each metric lives in exactly one collector.
pub struct Collector {
    name: String,
    metrics: RwLock<IndexMap<String, Arc<dyn MetricFamily>>>,
    collect_fn: Option<Box<dyn Fn() -> IndexMap<String, Arc<dyn MetricFamily>> + Send + Sync>>,
}

impl Collector {
    /// Creates a user-defined collector. Rejects the names reserved for
    /// the registry's own built-in collectors (`default`, `process`).
    pub fn new(name: impl Into<String>) -> Result<Self, PromError> {
        let name = name.into();
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(PromError::InvalidName(format!(
                "collector name {name:?} is reserved"
            )));
        }
        Self::new_reserved(name)
    }

    /// Bypasses the reserved-name check. Used internally by `Registry`
    /// (for its `default` collector) and by the process collector (for
    /// its `process` collector).
    pub(crate) fn new_reserved(name: impl Into<String>) -> Result<Self, PromError> {
        let name = name.into();
        validate_metric_name(&name)?;
        Ok(Self {
            name,
            metrics: RwLock::new(IndexMap::new()),
            collect_fn: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a metric family under this collector. Fails if a
    /// family with the same name is already registered here.
    pub fn register(&self, metric: Arc<dyn MetricFamily>) -> Result<(), PromError> {
        let mut guard = self.metrics.write().unwrap();
        if guard.contains_key(metric.name()) {
            return Err(PromError::Duplicate(format!(
                "metric {:?} already registered in collector {:?}",
                metric.name(),
                self.name
            )));
        }
        guard.insert(metric.name().to_string(), metric);
        Ok(())
    }

    /// Installs a function invoked at every scrape to refresh this
    /// collector's sample values before rendering (e.g. the process
    /// collector re-reading procfs). Replaces any previous collect_fn.
    pub fn set_collect_fn<F>(&mut self, f: F)
    where
        F: Fn() -> IndexMap<String, Arc<dyn MetricFamily>> + Send + Sync + 'static,
    {
        self.collect_fn = Some(Box::new(f));
    }

    /// The families to render for one scrape: either the registered set
    /// as-is, or the freshly computed set from `collect_fn` when
    /// present.
    pub(crate) fn snapshot(&self) -> IndexMap<String, Arc<dyn MetricFamily>> {
        match &self.collect_fn {
            Some(f) => f(),
            None => self.metrics.read().unwrap().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Counter;

    #[test]
    fn rejects_reserved_names() {
        assert!(Collector::new("default").is_err());
        assert!(Collector::new("process").is_err());
        assert!(Collector::new("app").is_ok());
    }

    #[test]
    fn register_rejects_duplicate_metric_name() {
        let c = Collector::new("app").unwrap();
        let counter: Arc<dyn MetricFamily> = Arc::new(Counter::new("requests_total", "help", vec![]).unwrap());
        c.register(Arc::clone(&counter)).unwrap();
        assert!(c.register(counter).is_err());
    }

    #[test]
    fn snapshot_defaults_to_cloning_registered_metrics() {
        let c = Collector::new("app").unwrap();
        let counter: Arc<dyn MetricFamily> = Arc::new(Counter::new("requests_total", "help", vec![]).unwrap());
        c.register(counter).unwrap();
        assert_eq!(c.snapshot().len(), 1);
    }
}
