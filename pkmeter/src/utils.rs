//! Small formatting and conversion helpers shared by widgets

use serde_json::Value;

pub const BYTE: u64 = 1;
pub const KB: u64 = 1024;
pub const MB: u64 = 1_048_576;

const BYTES1024: [(u64, &str); 6] = [
    (1 << 50, "P"),
    (1 << 40, "T"),
    (1 << 30, "G"),
    (1 << 20, "M"),
    (1 << 10, "K"),
    (1, "B"),
];

/// Strip leading whitespace from every line and trim the result. Widget
/// templates are written indented in source; conky wants them flush left.
pub fn clean_spaces(value: &str) -> String {
    value
        .lines()
        .map(str::trim_start)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub fn celsius_to_fahrenheit(value: f64) -> i64 {
    (value * 9.0 / 5.0 + 32.0) as i64
}

/// `numerator / denominator` as a percentage rounded to `precision` places
/// and capped at `max`. A zero denominator yields `default`.
pub fn percent(numerator: f64, denominator: f64, precision: u32, max: f64, default: f64) -> f64 {
    if denominator == 0.0 {
        return default;
    }
    let scale = 10f64.powi(precision as i32);
    let result = ((numerator / denominator) * 100.0 * scale).round() / scale;
    result.min(max)
}

/// Render `value * unit` bytes with a binary suffix, e.g. `8.0G`.
pub fn value_to_str(value: f64, unit: u64, precision: usize) -> String {
    let bytes = value * unit as f64;
    for (size, suffix) in BYTES1024 {
        if bytes >= size as f64 {
            return format!("{:.*}{}", precision, bytes / size as f64, suffix);
        }
    }
    format!("{:.*}B", precision, bytes)
}

/// Turn numeric-looking strings into JSON numbers; everything else is
/// returned untouched.
pub fn cast_num(value: Value) -> Value {
    let Value::String(text) = &value else {
        return value;
    };
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::from(float),
        _ => value,
    }
}

/// Seconds as `m:ss`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_spaces() {
        let text = "\n    ${goto 10}Hello\n      ${goto 20}World\n  ";
        assert_eq!(clean_spaces(text), "${goto 10}Hello\n${goto 20}World");
    }

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32);
        assert_eq!(celsius_to_fahrenheit(100.0), 212);
        assert_eq!(celsius_to_fahrenheit(47.0), 116);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1.0, 3.0, 2, 999.9, 0.0), 33.33);
        assert_eq!(percent(5.0, 0.0, 2, 999.9, 0.0), 0.0);
        assert_eq!(percent(50.0, 1.0, 0, 999.9, 0.0), 999.9);
        assert_eq!(percent(90.0, 120.0, 0, 999.9, 0.0), 75.0);
    }

    #[test]
    fn test_value_to_str() {
        assert_eq!(value_to_str(8192.0, MB, 1), "8.0G");
        assert_eq!(value_to_str(512.0, BYTE, 0), "512B");
        assert_eq!(value_to_str(1536.0, KB, 1), "1.5M");
        assert_eq!(value_to_str(0.0, MB, 0), "0B");
    }

    #[test]
    fn test_cast_num() {
        assert_eq!(cast_num(json!("42")), json!(42));
        assert_eq!(cast_num(json!(" 3.5 ")), json!(3.5));
        assert_eq!(cast_num(json!("535.104.05")), json!("535.104.05"));
        assert_eq!(cast_num(json!("nan")), json!("nan"));
        assert_eq!(cast_num(json!(7)), json!(7));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3600), "60:00");
    }
}
