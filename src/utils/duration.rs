//! Duration parsing and display in the `1m30s` style used by the CLI and reports

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse a duration such as `500ms`, `30s`, `5m`, `1h` or `1m30s`.
///
/// A bare integer is taken as seconds. Signs, empty input and unknown units
/// are rejected.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let input = s.trim();
    if input.is_empty() {
        return Err("Invalid duration: empty string".to_string());
    }
    if input.starts_with('+') || input.starts_with('-') {
        return Err(format!("Invalid duration: {}", s));
    }

    if input.chars().all(|c| c.is_ascii_digit()) {
        return input
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("Invalid duration: {}", s));
    }

    let mut total_nanos: u128 = 0;
    let mut rest = input;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(format!("Invalid duration: {}", s));
        }
        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number
            .parse()
            .map_err(|_| format!("Invalid duration: {}", s))?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let unit_nanos: f64 = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1_000.0,
            "ms" => 1_000_000.0,
            "s" => 1_000_000_000.0,
            "m" => 60.0 * 1_000_000_000.0,
            "h" => 3_600.0 * 1_000_000_000.0,
            "" => return Err(format!("Missing unit in duration: {}", s)),
            other => return Err(format!("Unknown unit '{}' in duration: {}", other, s)),
        };

        let component = (value * unit_nanos).round();
        if !component.is_finite() || component >= u128::MAX as f64 {
            return Err(format!("Duration too large: {}", s));
        }
        total_nanos = total_nanos
            .checked_add(component as u128)
            .ok_or_else(|| format!("Duration too large: {}", s))?;
        rest = tail;
    }

    let secs = u64::try_from(total_nanos / NANOS_PER_SEC)
        .map_err(|_| format!("Duration too large: {}", s))?;
    let nanos = (total_nanos % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, nanos))
}

/// Whole milliseconds of a run duration.
///
/// Zero passes through so run validation can report it. Anything between
/// zero and one millisecond is rejected rather than rounded down to zero.
pub fn duration_to_millis(d: Duration) -> Result<u64, String> {
    if !d.is_zero() && d < Duration::from_millis(1) {
        return Err(format!("Duration must be at least 1ms, got {}", format_duration(d)));
    }
    u64::try_from(d.as_millis()).map_err(|_| format!("Duration too large: {}", format_duration(d)))
}

/// Render a duration the way the reports print it: `0s`, `850µs`,
/// `12.5ms`, `1.25s`, `5m0s`, `1h2m3s`
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", trim_fraction(nanos as f64 / 1_000.0, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", trim_fraction(nanos as f64 / 1_000_000.0, 6));
    }

    let total_secs = d.as_secs();
    let hours = total_secs / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = (total_secs % 60) as f64 + f64::from(d.subsec_nanos()) / 1e9;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", trim_fraction(secs, 9)));
    out
}

fn trim_fraction(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*}", precision, value);
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}
