//! Value lookups behind `pkmeter get <widget.path>`
//!
//! conky calls this path every few seconds for every dynamic value on the
//! overlay, so it never fails: any miss or malformed input prints the
//! caller's default instead.

use crate::cache;
use crate::path;
use anyhow::{anyhow, bail, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, TimeZone};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Formatting flags of one query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Printed whenever the value cannot be produced
    pub default: String,
    /// Cast to an integer (after rounding)
    pub int: bool,
    /// Round to this many decimal places
    pub round: Option<u32>,
    /// strftime pattern applied to the value read as a Unix timestamp
    pub format: Option<String>,
}

/// Resolve `key` (`<widget>.<dotted.path>`) against the widget's cache.
pub fn get_value(cache_dir: &Path, key: &str, opts: &QueryOptions) -> String {
    match lookup(cache_dir, key, opts) {
        Ok(Some(value)) => value,
        Ok(None) => opts.default.clone(),
        Err(e) => {
            debug!("Query {} fell back to default: {:#}", key, e);
            opts.default.clone()
        }
    }
}

fn lookup(cache_dir: &Path, key: &str, opts: &QueryOptions) -> Result<Option<String>> {
    let (widget, path) = key
        .split_once(path::DELIMITER)
        .ok_or_else(|| anyhow!("key has no widget prefix"))?;
    let file = cache_dir.join(format!("{widget}.json"));
    let Some(data) = cache::load(&file)? else {
        return Ok(None);
    };
    match path::resolve(&data, path) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => format_value(value, opts).map(Some),
    }
}

/// Apply round, then int, then date formatting.
pub fn format_value(value: &Value, opts: &QueryOptions) -> Result<String> {
    let mut number = None;
    if let Some(places) = opts.round {
        let factor = 10f64.powi(places as i32);
        number = Some(finite((as_number(value)? * factor).round() / factor)?);
    }
    if opts.int {
        let whole = match number {
            Some(n) => n,
            None => as_number(value)?,
        };
        let whole = whole.trunc();
        if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
            bail!("{whole} does not fit an integer");
        }
        number = Some(whole);
    }

    if let Some(pattern) = &opts.format {
        let secs = match number {
            Some(n) => n,
            None => as_number(value)?,
        };
        return format_timestamp(secs as i64, pattern);
    }

    Ok(match (number, opts.int, opts.round) {
        (Some(n), true, _) => format!("{}", n as i64),
        (Some(n), false, Some(places)) => format!("{:.*}", places as usize, n),
        _ => display(value),
    })
}

fn as_number(value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| anyhow!("number out of range"))?,
        Value::String(s) => s.trim().parse::<f64>()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        other => bail!("cannot cast {} to a number", other),
    };
    finite(number)
}

/// `"nan"` and `"inf"` parse as floats but have no printable value.
fn finite(number: f64) -> Result<f64> {
    if number.is_finite() {
        Ok(number)
    } else {
        bail!("{number} is not a finite number")
    }
}

fn format_timestamp(secs: i64, pattern: &str) -> Result<String> {
    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        bail!("invalid date format {pattern:?}");
    }
    let local = Local
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| anyhow!("timestamp {secs} out of range"))?;
    Ok(local.format_with_items(items.into_iter()).to_string())
}

/// Strings print raw; everything else prints as JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        cache::store(
            &dir.path().join("system.json"),
            &json!({
                "cpu": {"percent": 42.567, "label": "busy"},
                "cores": [{"temp": 51.2}, {"temp": "49.8"}],
                "boot": 1700000000,
                "gone": null,
            }),
        )
        .unwrap();
        dir
    }

    fn opts() -> QueryOptions {
        QueryOptions { default: "-".to_string(), ..Default::default() }
    }

    #[test]
    fn test_plain_values() {
        let dir = cache_dir();
        assert_eq!(get_value(dir.path(), "system.cpu.label", &opts()), "busy");
        assert_eq!(get_value(dir.path(), "system.cpu.percent", &opts()), "42.567");
        assert_eq!(get_value(dir.path(), "system.cores.1.temp", &opts()), "49.8");
        assert_eq!(get_value(dir.path(), "system.cpu", &opts()), r#"{"percent":42.567,"label":"busy"}"#);
    }

    #[test]
    fn test_misses_print_default() {
        let dir = cache_dir();
        assert_eq!(get_value(dir.path(), "system.gone", &opts()), "-");
        assert_eq!(get_value(dir.path(), "system.cpu.nothing", &opts()), "-");
        assert_eq!(get_value(dir.path(), "nvidia.GPUName", &opts()), "-");
        assert_eq!(get_value(dir.path(), "system", &opts()), "-");
        assert_eq!(get_value(dir.path(), "system.cores.9.temp", &QueryOptions::default()), "");
    }

    #[test]
    fn test_corrupt_cache_prints_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{ half").unwrap();
        assert_eq!(get_value(dir.path(), "broken.x", &opts()), "-");
    }

    #[test]
    fn test_round_and_int() {
        let dir = cache_dir();
        let round = |places| QueryOptions { round: Some(places), ..opts() };
        assert_eq!(get_value(dir.path(), "system.cpu.percent", &round(1)), "42.6");
        assert_eq!(get_value(dir.path(), "system.cpu.percent", &round(0)), "43");
        assert_eq!(get_value(dir.path(), "system.cores.0.temp", &round(2)), "51.20");

        let int = QueryOptions { int: true, ..opts() };
        assert_eq!(get_value(dir.path(), "system.cpu.percent", &int), "42");
        assert_eq!(get_value(dir.path(), "system.cores.1.temp", &int), "49");

        // -ir0: round first, then cast
        let both = QueryOptions { int: true, round: Some(0), ..opts() };
        assert_eq!(get_value(dir.path(), "system.cpu.percent", &both), "43");

        assert_eq!(get_value(dir.path(), "system.cpu.label", &int), "-");
    }

    #[test]
    fn test_non_finite_casts_print_default() {
        let dir = tempfile::tempdir().unwrap();
        cache::store(
            &dir.path().join("gpu.json"),
            &json!({"fan": "nan", "power": " inf ", "temp": 42.5, "huge": 1e300}),
        )
        .unwrap();
        let int = QueryOptions { int: true, ..opts() };
        assert_eq!(get_value(dir.path(), "gpu.fan", &int), "-");
        assert_eq!(get_value(dir.path(), "gpu.power", &int), "-");
        assert_eq!(get_value(dir.path(), "gpu.huge", &int), "-");

        let wide = QueryOptions { round: Some(400), ..opts() };
        assert_eq!(get_value(dir.path(), "gpu.temp", &wide), "-");
        let year = QueryOptions { format: Some("%Y".to_string()), ..opts() };
        assert_eq!(get_value(dir.path(), "gpu.fan", &year), "-");

        // without a cast the raw string still prints
        assert_eq!(get_value(dir.path(), "gpu.fan", &opts()), "nan");
    }

    #[test]
    fn test_date_format() {
        let dir = cache_dir();
        let year = QueryOptions { format: Some("%Y".to_string()), ..opts() };
        assert_eq!(get_value(dir.path(), "system.boot", &year), "2023");

        let broken = QueryOptions { format: Some("%Q %".to_string()), ..opts() };
        assert_eq!(get_value(dir.path(), "system.boot", &broken), "-");
        assert_eq!(get_value(dir.path(), "system.cpu.label", &year), "-");
    }
}
