//! The registry: a named mapping of collectors, with scrape
//! orchestration, self-metrics, and the process-wide singleton (spec
//! §4.3, §5).

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use bitflags::bitflags;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::collector::Collector;
use crate::error::PromError;
use crate::family::{Gauge, MetricFamily};
use crate::format::format_value;
use crate::process::ProcessCollector;

bitflags! {
    /// Behavior switches for a registry, set once at `init` time.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u8 {
        const NONE = 0;
        /// Attach a process collector reading `/proc/self/{limits,stat}`.
        const PROCESS = 1 << 0;
        /// Attach the scrape-duration self-gauge, timing the whole scrape.
        const SCRAPETIME = 1 << 1;
        /// Implies `SCRAPETIME`; additionally times each collector
        /// individually under label `collector=<name>`.
        const SCRAPETIME_ALL = 1 << 2;
        /// Suppress `# HELP`/`# TYPE` lines at format time.
        const COMPACT = 1 << 3;
    }
}

const SELF_COLLECTOR_LABEL: &str = "libprom";

/// A named mapping of collectors. Owns scrape orchestration and,
/// optionally, a scrape-duration self-gauge.
pub struct Registry {
    name: String,
    collectors: RwLock<IndexMap<String, Arc<Collector>>>,
    features: Features,
    metric_prefix: String,
    scrape_duration: Option<Arc<Gauge>>,
}

impl Registry {
    /// Creates a registry containing exactly one empty collector named
    /// `default`. Reserved for the caller's own, independently-owned
    /// registries; `name == "default"` is rejected here because that
    /// name is reserved for the process-wide singleton built by
    /// [`init`].
    pub fn new(name: impl Into<String>) -> Result<Self, PromError> {
        let name = name.into();
        if name == "default" {
            return Err(PromError::InvalidName(
                "registry name \"default\" is reserved for the process-wide singleton".to_string(),
            ));
        }
        Self::build(name, Features::NONE, String::new())
    }

    fn build(name: String, features: Features, metric_prefix: String) -> Result<Self, PromError> {
        let collectors = RwLock::new(IndexMap::new());
        let scrape_duration = if features.intersects(Features::SCRAPETIME | Features::SCRAPETIME_ALL) {
            Some(Arc::new(Gauge::new(
                "prom_scrape_duration_seconds",
                "Time taken to render a scrape, in seconds.",
                vec!["collector".to_string()],
            )?))
        } else {
            None
        };

        let registry = Self {
            name,
            collectors,
            features,
            metric_prefix,
            scrape_duration,
        };
        registry
            .collectors
            .write()
            .unwrap()
            .insert("default".to_string(), Arc::new(Collector::new_reserved("default")?));

        if features.contains(Features::PROCESS) {
            let process = ProcessCollector::new(None, None)?;
            registry.register_collector(process.into_collector())?;
        }

        Ok(registry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_collector(&self, collector: Collector) -> Result<(), PromError> {
        let mut guard = self.collectors.write().unwrap();
        if guard.contains_key(collector.name()) {
            return Err(PromError::Duplicate(format!(
                "collector {:?} already registered in registry {:?}",
                collector.name(),
                self.name
            )));
        }
        guard.insert(collector.name().to_string(), Arc::new(collector));
        Ok(())
    }

    /// Adds `family` to this registry's `default` collector.
    pub fn register_metric(&self, family: Arc<dyn MetricFamily>) -> Result<(), PromError> {
        let guard = self.collectors.read().unwrap();
        let default = guard.get("default").expect("default collector always present");
        default.register(family)
    }

    /// Same as [`register_metric`](Self::register_metric), but aborts
    /// the process on failure. Intended for startup, where a
    /// misconfigured metric is not recoverable.
    pub fn must_register_metric(&self, family: Arc<dyn MetricFamily>) {
        if let Err(e) = self.register_metric(family) {
            panic!("must_register_metric failed: {e}");
        }
    }

    pub fn get(&self, name: &str) -> Result<Arc<Collector>, PromError> {
        self.collectors
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PromError::NotFound(format!("collector {name:?} not found")))
    }

    /// Renders a full scrape: iterates every collector in insertion
    /// order, every family in insertion order within a collector, every
    /// sample in insertion order within a family.
    pub fn bridge(&self) -> String {
        let collectors = self.collectors.read().unwrap();
        let compact = self.features.contains(Features::COMPACT);
        let mut out = String::new();

        let scrape_all_start = Instant::now();

        for collector in collectors.values() {
            let collector_start = Instant::now();
            let families = collector.snapshot();
            for family in families.values() {
                render_family(&mut out, family.as_ref(), &self.metric_prefix, compact);
            }
            if self.features.contains(Features::SCRAPETIME_ALL) {
                if let Some(gauge) = &self.scrape_duration {
                    let elapsed = collector_start.elapsed().as_secs_f64();
                    let _ = gauge.set(&[collector.name()], elapsed);
                }
            }
        }

        if let Some(gauge) = &self.scrape_duration {
            if self.features.contains(Features::SCRAPETIME_ALL) {
                // already set per collector above; nothing further to record.
            } else if self.features.contains(Features::SCRAPETIME) {
                let elapsed = scrape_all_start.elapsed().as_secs_f64();
                let _ = gauge.set(&[SELF_COLLECTOR_LABEL], elapsed);
            }
            render_family(&mut out, gauge.as_ref(), &self.metric_prefix, compact);
        }

        out
    }

    /// Releases all collectors (and, transitively, their families and
    /// samples).
    pub fn destroy(&self) {
        self.collectors.write().unwrap().clear();
    }
}

fn render_family(out: &mut String, family: &dyn MetricFamily, prefix: &str, compact: bool) {
    if !compact {
        out.push_str("# HELP ");
        out.push_str(prefix);
        out.push_str(family.name());
        out.push(' ');
        out.push_str(family.help());
        out.push('\n');

        out.push_str("# TYPE ");
        out.push_str(prefix);
        out.push_str(family.name());
        out.push(' ');
        out.push_str(family.metric_type().as_str());
        out.push('\n');
    }
    family.render_samples(out, prefix, &format_value);
    out.push('\n');
}

// ═══════════════════════════════════════════════════════════════════════
// Process-wide singleton
// ═══════════════════════════════════════════════════════════════════════

static DEFAULT_REGISTRY: OnceCell<Registry> = OnceCell::new();
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Idempotent-on-success initializer for the process-wide default
/// registry: the first call populates the singleton; any later call
/// fails, satisfying "exactly one init must succeed per process
/// lifetime" (spec §5).
pub fn init(features: Features, metric_prefix: impl Into<String>) -> Result<(), PromError> {
    if INITIALIZED.swap(true, AtomicOrdering::SeqCst) {
        return Err(PromError::Internal(
            "default registry already initialized".to_string(),
        ));
    }
    let registry = Registry::build("default".to_string(), features, metric_prefix.into())?;
    DEFAULT_REGISTRY
        .set(registry)
        .map_err(|_| PromError::Internal("default registry already initialized".to_string()))
}

/// Returns the process-wide default registry. Panics if [`init`] has
/// not been called; this mirrors the source's expectation that startup
/// always initializes the singleton before any metric is touched.
pub fn default_registry() -> &'static Registry {
    DEFAULT_REGISTRY
        .get()
        .expect("default registry not initialized; call registry::init() at startup")
}

/// Whether the process-wide default registry has been initialized.
pub fn is_initialized() -> bool {
    DEFAULT_REGISTRY.get().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::Counter;

    #[test]
    fn new_rejects_the_reserved_default_name() {
        assert!(Registry::new("default").is_err());
        assert!(Registry::new("app").is_ok());
    }

    #[test]
    fn register_collector_rejects_duplicate_name() {
        let registry = Registry::new("app").unwrap();
        assert!(registry.register_collector(Collector::new("extra").unwrap()).is_ok());
        assert!(registry.register_collector(Collector::new("extra").unwrap()).is_err());
    }

    #[test]
    fn bridge_renders_a_registered_counter() {
        let registry = Registry::new("app").unwrap();
        let counter = Arc::new(Counter::new("test_counter", "a counter", vec!["label".to_string()]).unwrap());
        registry.register_metric(counter.clone()).unwrap();
        counter.inc(&["foo"]).unwrap();

        let out = registry.bridge();
        assert!(out.contains("# HELP test_counter a counter\n"));
        assert!(out.contains("# TYPE test_counter counter\n"));
        assert!(out.contains(r#"test_counter{label="foo"} 1"#));
    }

    #[test]
    fn compact_suppresses_help_and_type_lines() {
        let registry = Registry::build("app2".to_string(), Features::COMPACT, String::new()).unwrap();
        let counter = Arc::new(Counter::new("test_counter", "a counter", vec![]).unwrap());
        registry.register_metric(counter.clone()).unwrap();
        counter.inc(&[]).unwrap();

        let out = registry.bridge();
        assert!(!out.contains("# HELP"));
        assert!(!out.contains("# TYPE"));
        assert!(out.contains("test_counter 1"));
    }

    #[test]
    fn scrapetime_renders_self_gauge_with_the_libprom_label() {
        let registry = Registry::build("app3".to_string(), Features::SCRAPETIME, String::new()).unwrap();
        let out = registry.bridge();
        assert!(out.contains(r#"prom_scrape_duration_seconds{collector="libprom"}"#));
    }

    #[test]
    fn destroy_clears_all_collectors() {
        let registry = Registry::new("app4").unwrap();
        registry.destroy();
        assert!(registry.get("default").is_err());
    }
}
