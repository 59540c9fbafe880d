//! Worker count parsing for `--workers` and `KTEST_WORKERS`

use crate::types::DispatchMode;

/// Parse a worker count: a non-negative integer or `auto`.
///
/// `auto` sizes the pool from the CPU count, see [`DispatchMode::auto_workers`].
pub fn parse_workers(s: &str) -> Result<usize, String> {
    let input = s.trim();
    if input.eq_ignore_ascii_case("auto") {
        return Ok(DispatchMode::auto_workers());
    }
    input
        .parse::<usize>()
        .map_err(|e| format!("Invalid worker count '{}': {} (expected a number or 'auto')", s, e))
}
