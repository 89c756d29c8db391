//! Target-throughput string parsing.

use std::time::Duration;

/// A parsed `target-throughput` value: a rate in some unit (defaulting to
/// `ops/s`), or a numeric rate with the unit left to the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub rate: f64,
    pub unit: &'static str,
}

/// Parses `"5 MB/s"`, `"100 docs/s"`, or a bare number (unit defaults to
/// `ops/s`). `target-interval` is accepted as the reciprocal of a rate with
/// implicit `ops/s` unit. Specifying both `target-throughput` and
/// `target-interval` in the same task is a fatal configuration error,
/// checked by the caller (see `ScheduleConfig::validate`).
pub fn parse_target_throughput(raw: &str) -> Result<Throughput, String> {
    let raw = raw.trim();
    if let Ok(rate) = raw.parse::<f64>() {
        return Ok(Throughput { rate, unit: "ops/s" });
    }
    let mut parts = raw.splitn(2, char::is_whitespace);
    let number = parts
    .next()
    .ok_or_else(|| format!("invalid target-throughput: [{raw}]"))?;
    let rest = parts.next().unwrap_or("").trim();
    let rate: f64 = number
    .parse()
    .map_err(|_| format!("invalid target-throughput number: [{number}]"))?;
    let unit = match rest {
        "MB/s" => "MB/s",
        "docs/s" => "docs/s",
        "ops/s" => "ops/s",
        other => return Err(format!("unsupported target-throughput unit: [{other}]")),
    };
    Ok(Throughput { rate, unit })
}

/// `target-interval` is the reciprocal of a rate expressed directly as the
/// per-request interval.
pub fn parse_target_interval(seconds: f64) -> Result<Duration, String> {
    if seconds <= 0.0 {
        return Err("target-interval must be positive".to_string());
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_as_ops_per_second() {
        let t = parse_target_throughput("10").unwrap();
        assert_eq!(t.rate, 10.0);
        assert_eq!(t.unit, "ops/s");
    }

    #[test]
    fn parses_unit_suffixed_values() {
        assert_eq!(parse_target_throughput("5 MB/s").unwrap(), Throughput { rate: 5.0, unit: "MB/s" });
        assert_eq!(
            parse_target_throughput("100 docs/s").unwrap(),
            Throughput { rate: 100.0, unit: "docs/s" }
        );
    }

    #[test]
    fn rejects_unknown_units() {
        assert!(parse_target_throughput("5 lightyears/s").is_err());
    }
}
