//! The closed metric-type variant set (spec §3).

/// The kind of a metric family. Counters are monotonically
/// non-decreasing, gauges are freely mutable, histograms are append-only
/// observation sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    /// The `# TYPE` line token for this metric type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
        }
    }
}
