//! The process collector and procfs parsing (spec §4.6).

pub mod collector;
pub mod limits;
pub mod stat;

pub use collector::ProcessCollector;
