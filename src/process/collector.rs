//! The process collector: reads `/proc/self/{limits,stat}` on every
//! scrape and projects the result into the 17 `process_*` families
//! named in the source table (spec §4.6) — the `_total` sum variants
//! (`process_cpu_seconds_total`, `process_cpu_seconds_children_total`)
//! are each their own family alongside the user/system components.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::collector::Collector;
use crate::error::PromError;
use crate::family::{Counter, Gauge, MetricFamily};
use crate::process::limits;
use crate::process::stat::{self, StartTimeCache};

const DEFAULT_LIMITS_PATH: &str = "/proc/self/limits";
const DEFAULT_STAT_PATH: &str = "/proc/self/stat";
const DEFAULT_FD_DIR: &str = "/proc/self/fd";
const DEFAULT_UPTIME_PATH: &str = "/proc/uptime";

struct Families {
    max_fds: Arc<Gauge>,
    open_fds: Arc<Gauge>,
    minflt: Arc<Counter>,
    cminflt: Arc<Counter>,
    majflt: Arc<Counter>,
    cmajflt: Arc<Counter>,
    utime: Arc<Counter>,
    stime: Arc<Counter>,
    time: Arc<Counter>,
    cutime: Arc<Counter>,
    cstime: Arc<Counter>,
    ctime: Arc<Counter>,
    num_threads: Arc<Gauge>,
    start_time: Arc<Counter>,
    vsize: Arc<Gauge>,
    rss: Arc<Gauge>,
    blkio: Arc<Counter>,
}

impl Families {
    fn new() -> Result<Self, PromError> {
        Ok(Self {
            max_fds: Arc::new(Gauge::new(
                "process_max_fds",
                "Maximum number of open file descriptors (soft limit)",
                vec![],
            )?),
            open_fds: Arc::new(Gauge::new("process_open_fds", "Number of open file descriptors", vec![])?),
            minflt: Arc::new(Counter::new(
                "process_minor_pagefaults_total",
                "Number of minor faults of the process not caused a page load from disk",
                vec![],
            )?),
            cminflt: Arc::new(Counter::new(
                "process_minor_pagefaults_children_total",
                "Number of minor faults of the process's waited-for children not caused a page load from disk",
                vec![],
            )?),
            majflt: Arc::new(Counter::new(
                "process_major_pagefaults_total",
                "Number of major faults of the process caused a page load from disk",
                vec![],
            )?),
            cmajflt: Arc::new(Counter::new(
                "process_major_pagefaults_children_total",
                "Number of major faults of the process's waited-for children caused a page load from disk",
                vec![],
            )?),
            utime: Arc::new(Counter::new(
                "process_cpu_seconds_user_total",
                "Total CPU time the process spent in user mode in seconds",
                vec![],
            )?),
            stime: Arc::new(Counter::new(
                "process_cpu_seconds_system_total",
                "Total CPU time the process spent in kernel mode in seconds",
                vec![],
            )?),
            time: Arc::new(Counter::new(
                "process_cpu_seconds_total",
                "Total CPU time the process spent in user and kernel mode in seconds",
                vec![],
            )?),
            cutime: Arc::new(Counter::new(
                "process_cpu_seconds_user_children_total",
                "Total CPU time the process's waited-for children spent in user mode in seconds",
                vec![],
            )?),
            cstime: Arc::new(Counter::new(
                "process_cpu_seconds_system_children_total",
                "Total CPU time the process's waited-for children spent in kernel mode in seconds",
                vec![],
            )?),
            ctime: Arc::new(Counter::new(
                "process_cpu_seconds_children_total",
                "Total CPU time the process's waited-for children spent in user and kernel mode in seconds",
                vec![],
            )?),
            num_threads: Arc::new(Gauge::new("process_num_threads", "Number of threads in this process", vec![])?),
            start_time: Arc::new(Counter::new(
                "process_start_time_seconds",
                "The time the process has been started in seconds elapsed since Epoch",
                vec![],
            )?),
            vsize: Arc::new(Gauge::new("process_virtual_memory_bytes", "Virtual memory size in bytes", vec![])?),
            rss: Arc::new(Gauge::new(
                "process_resident_memory_bytes",
                "Resident set size of memory in bytes",
                vec![],
            )?),
            blkio: Arc::new(Counter::new(
                "process_delayacct_blkio_ticks",
                "Aggregated block I/O delays, measured in clock ticks (centiseconds)",
                vec![],
            )?),
        })
    }

    fn as_map(&self) -> IndexMap<String, Arc<dyn MetricFamily>> {
        let entries: Vec<Arc<dyn MetricFamily>> = vec![
            self.max_fds.clone(),
            self.open_fds.clone(),
            self.minflt.clone(),
            self.cminflt.clone(),
            self.majflt.clone(),
            self.cmajflt.clone(),
            self.utime.clone(),
            self.stime.clone(),
            self.time.clone(),
            self.cutime.clone(),
            self.cstime.clone(),
            self.ctime.clone(),
            self.num_threads.clone(),
            self.start_time.clone(),
            self.vsize.clone(),
            self.rss.clone(),
            self.blkio.clone(),
        ];
        entries.into_iter().map(|f| (f.name().to_string(), f)).collect()
    }
}

/// Reads procfs on demand and updates the 17 `process_*` families.
/// Paths default to `/proc/self/limits` and `/proc/self/stat`; both are
/// overridable for tests.
pub struct ProcessCollector {
    limits_path: Option<PathBuf>,
    stat_path: PathBuf,
    families: Families,
    start_time_cache: StartTimeCache,
}

impl ProcessCollector {
    /// The normal constructor: `limits_path`/`stat_path` default to
    /// `/proc/self/limits`/`/proc/self/stat` when omitted, and are
    /// otherwise used verbatim (test injection).
    pub fn new(limits_path: Option<PathBuf>, stat_path: Option<PathBuf>) -> Result<Self, PromError> {
        Ok(Self {
            limits_path: Some(limits_path.unwrap_or_else(|| PathBuf::from(DEFAULT_LIMITS_PATH))),
            stat_path: stat_path.unwrap_or_else(|| PathBuf::from(DEFAULT_STAT_PATH)),
            families: Families::new()?,
            start_time_cache: StartTimeCache::new(),
        })
    }

    /// Reads `process_max_fds` from `getrlimit(RLIMIT_NOFILE)` instead
    /// of a limits file, mirroring the source's `ppl_update(NULL)` path.
    pub fn new_with_rlimit_fallback(stat_path: Option<PathBuf>) -> Result<Self, PromError> {
        Ok(Self {
            limits_path: None,
            stat_path: stat_path.unwrap_or_else(|| PathBuf::from(DEFAULT_STAT_PATH)),
            families: Families::new()?,
            start_time_cache: StartTimeCache::new(),
        })
    }

    fn refresh(&self) {
        self.update_max_fds();
        self.update_open_fds();
        self.update_stat();
    }

    fn update_max_fds(&self) {
        let result = match &self.limits_path {
            Some(path) => limits::max_open_files_from_file(path),
            None => limits::max_open_files_from_rlimit(),
        };
        match result {
            Ok(v) => {
                let _ = self.families.max_fds.set(&[], v.as_gauge_value());
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read process_max_fds; keeping stale value");
            }
        }
    }

    fn update_open_fds(&self) {
        match std::fs::read_dir(DEFAULT_FD_DIR) {
            Ok(entries) => {
                let count = entries.count();
                let _ = self.families.open_fds.set(&[], count as f64);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to list {}; keeping stale process_open_fds", DEFAULT_FD_DIR);
            }
        }
    }

    fn update_stat(&self) {
        match stat::read_and_parse(&self.stat_path) {
            Ok(s) => {
                let _ = self.families.minflt.reset(&[], s.minflt);
                let _ = self.families.cminflt.reset(&[], s.cminflt);
                let _ = self.families.majflt.reset(&[], s.majflt);
                let _ = self.families.cmajflt.reset(&[], s.cmajflt);
                let _ = self.families.utime.reset(&[], s.utime_secs);
                let _ = self.families.stime.reset(&[], s.stime_secs);
                let _ = self.families.time.reset(&[], s.utime_secs + s.stime_secs);
                let _ = self.families.cutime.reset(&[], s.cutime_secs);
                let _ = self.families.cstime.reset(&[], s.cstime_secs);
                let _ = self.families.ctime.reset(&[], s.cutime_secs + s.cstime_secs);
                let _ = self.families.num_threads.set(&[], s.num_threads);
                let _ = self.families.vsize.set(&[], s.vsize_bytes);
                let _ = self.families.rss.set(&[], s.rss_bytes);
                let _ = self.families.blkio.reset(&[], s.blkio_ticks);

                let uptime = stat::system_uptime_secs(Path::new(DEFAULT_UPTIME_PATH)).unwrap_or(0.0);
                let start_time = self.start_time_cache.compute(s.starttime_ticks, uptime);
                let _ = self.families.start_time.reset(&[], start_time);
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read {}; process stat metrics stale this scrape", self.stat_path.display());
            }
        }
    }

    /// Wraps this process collector into a registry-ready [`Collector`]
    /// named `process`, with every family pre-registered and a
    /// `collect_fn` that re-reads procfs on each scrape.
    pub fn into_collector(self) -> Collector {
        let mut collector = Collector::new_reserved("process").expect("\"process\" is a valid reserved name");
        for family in self.families.as_map().values() {
            collector.register(Arc::clone(family)).expect("process family names are unique by construction");
        }
        let shared = Arc::new(self);
        collector.set_collect_fn(move || {
            shared.refresh();
            shared.families.as_map()
        });
        collector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_produces_all_seventeen_process_families() {
        let dir = tempfile::tempdir().unwrap();
        let limits_path = dir.path().join("limits");
        std::fs::write(
            &limits_path,
            "Limit  Soft Limit  Hard Limit  Units\nMax open files  1048576  1048576  files\n",
        )
        .unwrap();

        let process = ProcessCollector::new(Some(limits_path), Some(PathBuf::from("/proc/self/stat"))).unwrap();
        let names: Vec<String> = process.families.as_map().keys().cloned().collect();
        assert_eq!(names.len(), 17);
        assert!(names.contains(&"process_max_fds".to_string()));
        assert!(names.contains(&"process_delayacct_blkio_ticks".to_string()));
    }

    #[test]
    fn rlimit_fallback_reads_a_real_value() {
        let process = ProcessCollector::new_with_rlimit_fallback(None).unwrap();
        process.update_max_fds();
        assert!(process.families.max_fds.get(&[]).unwrap() != 0.0);
    }

    #[test]
    fn max_fds_scenario_s4() {
        let dir = tempfile::tempdir().unwrap();
        let limits_path = dir.path().join("limits");
        std::fs::write(
            &limits_path,
            "Limit  Soft Limit  Hard Limit  Units\nMax open files  1048576  1048576  files\n",
        )
        .unwrap();

        let process = ProcessCollector::new(Some(limits_path), Some(PathBuf::from("/proc/self/stat"))).unwrap();
        process.update_max_fds();
        assert_eq!(process.families.max_fds.get(&[]).unwrap(), 1_048_576.0);
    }
}
