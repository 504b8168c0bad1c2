//! Per-widget cache documents and the staleness gate
//!
//! The file's own mtime is the only record of how old the data is; the
//! documents carry no timestamp field. Writes go through a temp file in the
//! same directory followed by a rename, so a concurrent reader sees either
//! the old or the new document in full.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Age reported for a missing or unreadable cache file.
pub const MISSING_AGE: u64 = 999_999;

/// An update is due once the cache is 90% of an interval old, so a
/// scheduler firing slightly early does not skip a refresh.
pub const HYSTERESIS: f64 = 0.9;

/// Whole seconds since `path` was last modified.
pub fn modtime_ago(path: &Path) -> u64 {
    modtime_ago_at(path, SystemTime::now())
}

pub fn modtime_ago_at(path: &Path, now: SystemTime) -> u64 {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => now
            .duration_since(mtime)
            .map(|age| age.as_secs())
            .unwrap_or(0),
        Err(_) => MISSING_AGE,
    }
}

/// Pure staleness rule.
pub fn is_due(age_secs: u64, interval_secs: u64) -> bool {
    age_secs as f64 >= interval_secs as f64 * HYSTERESIS
}

/// Whether the widget owning `path` should refresh now. No side effects.
pub fn should_update(path: &Path, interval_secs: u64) -> bool {
    let age = modtime_ago(path);
    let due = is_due(age, interval_secs);
    debug!("Cache {} is {}s old (interval {}s, due: {})", path.display(), age, interval_secs, due);
    due
}

/// Read a cache document. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read cache {}", path.display()))
        }
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in cache {}", path.display()))?;
    Ok(Some(value))
}

/// Replace a cache document atomically.
pub fn store(path: &Path, data: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(data).context("Failed to serialize cache data")?;
    content.push('\n');
    write_atomic(path, content.as_bytes())
}

/// Write `contents` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents).context("Failed to write temp file")?;
    tmp.as_file().sync_all().context("Failed to sync temp file")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn backdate(path: &Path, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn test_missing_file_is_ancient() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.json");
        assert_eq!(modtime_ago(&path), MISSING_AGE);
        assert!(should_update(&path, 86_400));
    }

    #[test]
    fn test_hysteresis_boundary() {
        assert!(!is_due(25, 30));
        assert!(!is_due(26, 30));
        assert!(is_due(27, 30));
        assert!(is_due(28, 30));
        assert!(is_due(0, 0));
    }

    #[test]
    fn test_should_update_follows_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.json");
        store(&path, &json!({"t": 1})).unwrap();
        assert!(!should_update(&path, 30), "fresh write must not be due");

        backdate(&path, 25);
        assert!(!should_update(&path, 30));
        backdate(&path, 28);
        assert!(should_update(&path, 30));
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("network.json");
        assert!(load(&path).unwrap().is_none());

        store(&path, &json!({"ip": "203.0.113.7"})).unwrap();
        assert_eq!(load(&path).unwrap(), Some(json!({"ip": "203.0.113.7"})));

        store(&path, &json!({"ip": "203.0.113.8"})).unwrap();
        assert_eq!(load(&path).unwrap(), Some(json!({"ip": "203.0.113.8"})));

        // only the target remains, no stray temp files
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_load_invalid_json_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{oops").unwrap();
        assert!(load(&path).is_err());
    }
}
