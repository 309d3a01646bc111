//! Ambient configuration: log-level parsing and `tracing` setup (spec §6).

use std::env;

use tracing::Level;
use tracing_subscriber::EnvFilter;

const LOG_LEVEL_VAR: &str = "PROM_LOG_LEVEL";

/// Maps `PROM_LOG_LEVEL` to a `tracing::Level`. Accepts the named
/// levels or an integer `1..=5` (`DEBUG`..`FATAL`); anything else, or an
/// unset variable, falls back to `INFO`. There is no `FATAL` level in
/// `tracing`, so it is mapped to `ERROR`, the closest available
/// severity.
pub fn log_level_from_env() -> Level {
    match env::var(LOG_LEVEL_VAR) {
        Ok(raw) => parse_log_level(&raw),
        Err(_) => Level::INFO,
    }
}

fn parse_log_level(raw: &str) -> Level {
    match raw.trim().to_ascii_uppercase().as_str() {
        "DEBUG" | "1" => Level::DEBUG,
        "INFO" | "2" => Level::INFO,
        "WARN" | "3" => Level::WARN,
        "ERROR" | "4" => Level::ERROR,
        "FATAL" | "5" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs a `tracing_subscriber` global default subscriber honoring
/// `PROM_LOG_LEVEL`. Intended to be called once, near process startup.
/// A second call is a no-op (the underlying `set_global_default` only
/// ever succeeds once); logging is a pure side effect, never load-bearing
/// for correctness.
pub fn init_logging() {
    let level = log_level_from_env();
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
