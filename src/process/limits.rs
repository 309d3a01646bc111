//! Parsing of `/proc/self/limits` (spec §4.6).

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::error::PromError;

/// One parsed row of `/proc/self/limits`: the soft and hard values, each
/// either a finite count or `unlimited`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitValue {
    Unlimited,
    Value(i64),
}

impl LimitValue {
    /// `unlimited` maps to `-1`, matching the source's `RLIM_INFINITY`
    /// sentinel convention.
    pub fn as_gauge_value(&self) -> f64 {
        match self {
            LimitValue::Unlimited => -1.0,
            LimitValue::Value(v) => *v as f64,
        }
    }
}

fn parse_value(token: &str) -> LimitValue {
    if token == "unlimited" {
        LimitValue::Unlimited
    } else {
        token.parse::<i64>().map(LimitValue::Value).unwrap_or(LimitValue::Unlimited)
    }
}

/// A generic recursive-descent pass over the whole limits file, keyed by
/// limit name (e.g. `"Max open files"`), returning the soft and hard
/// value for every row. Not needed by the scrape path (which only cares
/// about `Max open files`) but exposed for callers who want the full
/// resource-limit table.
pub fn parse_all(contents: &str) -> IndexMap<String, (LimitValue, LimitValue)> {
    let mut rows = IndexMap::new();
    let mut lines = contents.lines();
    let Some(header) = lines.next() else {
        return rows;
    };
    if !header.starts_with("Limit") {
        return rows;
    }
    for line in lines {
        let fields: Vec<&str> = line.split("  ").map(str::trim).filter(|f| !f.is_empty()).collect();
        if fields.len() < 3 {
            continue;
        }
        let name = fields[0].to_string();
        let soft = parse_value(fields[1]);
        let hard = parse_value(fields[2]);
        rows.insert(name, (soft, hard));
    }
    rows
}

/// Reads `path` and returns the `Max open files` soft limit.
/// `unlimited` maps to `-1`; a missing row is `NOT_FOUND`.
pub fn max_open_files_from_file(path: &Path) -> Result<LimitValue, PromError> {
    let contents = fs::read_to_string(path)?;
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("Max open files") {
            let token = rest.split_whitespace().next().ok_or_else(|| {
                PromError::InvalidInput(format!("malformed \"Max open files\" line in {}", path.display()))
            })?;
            return Ok(parse_value(token));
        }
    }
    Err(PromError::NotFound(format!(
        "no \"Max open files\" row in {}",
        path.display()
    )))
}

/// Reads the soft `RLIMIT_NOFILE` limit directly via `getrlimit`, used
/// when no limits-file path override is configured.
pub fn max_open_files_from_rlimit() -> Result<LimitValue, PromError> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, fully-initialized out-parameter.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) };
    if rc != 0 {
        return Err(PromError::Io(std::io::Error::last_os_error()));
    }
    if limit.rlim_cur == libc::RLIM_INFINITY {
        Ok(LimitValue::Unlimited)
    } else {
        Ok(LimitValue::Value(limit.rlim_cur as i64))
    }
}
