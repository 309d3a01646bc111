//! # promethea
//!
//! A client-side Prometheus metrics library: counters, gauges,
//! histograms, a collector registry, and a process collector.
//!
//! ## Quick Start
//!
//! ```ignore
//! use promethea::prelude::*;
//!
//! registry::init(Features::PROCESS | Features::SCRAPETIME, "").unwrap();
//!
//! let requests = Counter::new("http_requests_total", "Total HTTP requests", vec!["method".to_string()]).unwrap();
//! registry::default_registry().must_register_metric(std::sync::Arc::new(requests));
//! ```
//!
//! ### Standalone Server
//!
//! ```ignore
//! use promethea::http::StandaloneServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = StandaloneServer::builder()
//!         .port(9090)
//!         .build(promethea::registry::default_registry());
//!     server.run().await.unwrap();
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `standalone` | Standalone HTTP server exposing `/metrics` | ✓ |

pub mod collector;
pub mod config;
pub mod error;
pub mod family;
pub mod histogram;
pub mod label;
pub mod metric_type;
pub mod process;
pub mod registry;
pub mod sample;

mod format;

#[cfg(feature = "standalone")]
pub mod http;

pub mod prelude {
    pub use crate::collector::Collector;
    pub use crate::error::PromError;
    pub use crate::family::{Counter, Gauge, Histogram, MetricFamily};
    pub use crate::histogram::HistogramBuckets;
    pub use crate::metric_type::MetricType;
    pub use crate::registry::{self, Features, Registry};

    #[cfg(feature = "standalone")]
    pub use crate::http::{ServerConfig, StandaloneServer, StandaloneServerBuilder};
}
