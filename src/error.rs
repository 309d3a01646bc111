//! Error kinds surfaced by the metrics library (see spec §7).

use thiserror::Error;

/// Failure modes a caller can observe from registration, lookup, and
/// update paths.
///
/// Hot-path update failures (CAS contention) are retried internally and
/// never surface as an error; only the kinds below are ever returned.
#[derive(Debug, Error)]
pub enum PromError {
    /// The metric or registry name failed `^[a-zA-Z_:][a-zA-Z0-9_:]*$`,
    /// or a reserved name (`default`, `process`) was used outside its
    /// dedicated constructor.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// Bad label arity, a negative counter delta, non-ascending
    /// histogram bounds, or an empty label value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A name collision within a collector or registry.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A `get` lookup missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Allocation failure during registration or sample creation.
    #[error("out of memory")]
    OutOfMemory,

    /// A procfs read failed. Surfaced as a log line and a failed
    /// collector update, not a failed scrape.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock or system-call failure.
    #[error("internal error: {0}")]
    Internal(String),
}
