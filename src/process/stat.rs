//! Parsing of `/proc/self/stat` (spec §4.6).

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::OnceCell;

use crate::error::PromError;

/// The subset of the 52 `man proc` stat fields this collector projects
/// into metrics. Field numbers in comments match the manpage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessStat {
    pub minflt: f64,        // field 10
    pub cminflt: f64,       // field 11
    pub majflt: f64,        // field 12
    pub cmajflt: f64,       // field 13
    pub utime_secs: f64,    // field 14 / CLK_TCK
    pub stime_secs: f64,    // field 15 / CLK_TCK
    pub cutime_secs: f64,   // field 16 / CLK_TCK
    pub cstime_secs: f64,   // field 17 / CLK_TCK
    pub num_threads: f64,   // field 20
    pub starttime_ticks: u64, // field 22, raw ticks since boot
    pub vsize_bytes: f64,   // field 23
    pub rss_bytes: f64,     // field 24, already * page size
    pub blkio_ticks: f64,   // field 42
}

/// Parses a raw `/proc/self/stat` line, which is whitespace-separated
/// except for field 2 (`comm`), always parenthesized. Requires at least
/// 42 of the 52 documented fields to be present; returns `Err` (a
/// partial-update, not a scrape failure) otherwise.
pub fn parse_stat_line(line: &str) -> Result<ProcessStat, PromError> {
    // comm is the only field that may itself contain whitespace; skip
    // past its closing paren before splitting the remainder.
    let comm_end = line.rfind(')').ok_or_else(|| {
        PromError::InvalidInput("malformed /proc/self/stat line: no comm field".to_string())
    })?;
    let rest = &line[comm_end + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // `fields[0]` is stat field 3 (state); field index n (1-based, full
    // line) maps to `fields[n - 3]`.
    if fields.len() < 42 - 2 {
        return Err(PromError::InvalidInput(format!(
            "incomplete /proc/self/stat line: only {} fields after comm",
            fields.len()
        )));
    }

    let field = |n: usize| -> Result<&str, PromError> {
        fields
            .get(n - 3)
            .copied()
            .ok_or_else(|| PromError::InvalidInput(format!("missing stat field {n}")))
    };
    let parse_f64 = |n: usize| -> Result<f64, PromError> {
        field(n)?
            .parse::<f64>()
            .map_err(|e| PromError::InvalidInput(format!("stat field {n}: {e}")))
    };
    let parse_u64 = |n: usize| -> Result<u64, PromError> {
        field(n)?
            .parse::<u64>()
            .map_err(|e| PromError::InvalidInput(format!("stat field {n}: {e}")))
    };

    let clk_tck = clock_ticks_per_second();
    let page_size = page_size_bytes();

    Ok(ProcessStat {
        minflt: parse_f64(10)?,
        cminflt: parse_f64(11)?,
        majflt: parse_f64(12)?,
        cmajflt: parse_f64(13)?,
        utime_secs: parse_f64(14)? / clk_tck,
        stime_secs: parse_f64(15)? / clk_tck,
        cutime_secs: parse_f64(16)? / clk_tck,
        cstime_secs: parse_f64(17)? / clk_tck,
        num_threads: parse_f64(20)?,
        starttime_ticks: parse_u64(22)?,
        vsize_bytes: parse_f64(23)?,
        rss_bytes: parse_f64(24)? * page_size,
        blkio_ticks: parse_f64(42).unwrap_or(f64::NAN),
    })
}

pub fn read_and_parse(path: &Path) -> Result<ProcessStat, PromError> {
    let contents = fs::read_to_string(path)?;
    parse_stat_line(contents.trim_end_matches('\n'))
}

fn clock_ticks_per_second() -> f64 {
    static TICKS: OnceCell<f64> = OnceCell::new();
    *TICKS.get_or_init(|| {
        // SAFETY: `sysconf` with a well-known name has no preconditions.
        let v = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        if v > 0 {
            v as f64
        } else {
            100.0
        }
    })
}

fn page_size_bytes() -> f64 {
    static PAGE: OnceCell<f64> = OnceCell::new();
    *PAGE.get_or_init(|| {
        // SAFETY: `sysconf` with a well-known name has no preconditions.
        let v = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if v > 0 {
            v as f64
        } else {
            4096.0
        }
    })
}

/// Caches `process_start_time_seconds` keyed by the raw `starttime`
/// tick count, recomputing only when that value changes (spec §4.6
/// "Caching").
pub struct StartTimeCache {
    inner: Mutex<Option<(u64, f64)>>,
}

impl StartTimeCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// `wall_now - system_uptime + starttime_ticks / CLK_TCK`.
    pub fn compute(&self, starttime_ticks: u64, system_uptime_secs: f64) -> f64 {
        let mut guard = self.inner.lock().unwrap();
        if let Some((cached_ticks, cached_value)) = *guard {
            if cached_ticks == starttime_ticks {
                return cached_value;
            }
        }
        let wall_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let value = wall_now - system_uptime_secs + (starttime_ticks as f64 / clock_ticks_per_second());
        *guard = Some((starttime_ticks, value));
        value
    }
}

impl Default for StartTimeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads `/proc/uptime`'s first field (seconds since boot).
pub fn system_uptime_secs(path: &Path) -> Result<f64, PromError> {
    let contents = fs::read_to_string(path)?;
    contents
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| PromError::InvalidInput(format!("malformed uptime file {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_line() -> String {
        // Field 2 (comm) deliberately contains a space to exercise the
        // paren-aware split.
        let mut fields = vec!["0".to_string(); 52];
        fields[0] = "1234".to_string(); // pid
        fields[2] = "R".to_string(); // state
        fields[9] = "10".to_string(); // minflt
        fields[10] = "1".to_string(); // cminflt
        fields[11] = "2".to_string(); // majflt
        fields[12] = "3".to_string(); // cmajflt
        fields[13] = "500".to_string(); // utime
        fields[14] = "100".to_string(); // stime
        fields[15] = "7".to_string(); // cutime
        fields[16] = "8".to_string(); // cstime
        fields[19] = "4".to_string(); // num_threads
        fields[21] = "12345".to_string(); // starttime
        fields[22] = "999999".to_string(); // vsize
        fields[23] = "2048".to_string(); // rss
        fields[41] = "6".to_string(); // blkio ticks

        format!("1234 (my process) {}", fields[2..].join(" "))
    }

    #[test]
    fn parses_a_well_formed_line() {
        let stat = parse_stat_line(&sample_line()).unwrap();
        assert_eq!(stat.minflt, 10.0);
        assert_eq!(stat.cminflt, 1.0);
        assert_eq!(stat.majflt, 2.0);
        assert_eq!(stat.cmajflt, 3.0);
        assert_eq!(stat.num_threads, 4.0);
        assert_eq!(stat.starttime_ticks, 12345);
        assert_eq!(stat.vsize_bytes, 999999.0);
    }

    #[test]
    fn rejects_truncated_lines() {
        assert!(parse_stat_line("1234 (p) R 0 0").is_err());
    }

    #[test]
    fn start_time_cache_memoizes_by_ticks() {
        let cache = StartTimeCache::new();
        let a = cache.compute(1000, 50.0);
        let b = cache.compute(1000, 999.0); // different uptime, same ticks: cached
        assert_eq!(a, b);
        let c = cache.compute(2000, 50.0);
        assert_ne!(a, c);
    }
}
