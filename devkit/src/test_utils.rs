/*!
Test harness for pkmeter

Each harness owns a temporary root and cache directory, removed on drop.
Tests write configuration and cache documents into them, then drive the
library (or the binary, via `--root` / `--cache`) against those paths.
*/

use anyhow::{Context, Result};
use pkmeter::{cache, Config, Paths};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub struct TestHarness {
    root: TempDir,
    cache: TempDir,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        // logs go to the test writer so failures show them
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("pkmeter=debug")
            .try_init()
            .ok();

        Ok(Self {
            root: tempfile::tempdir().context("Failed to create root dir")?,
            cache: tempfile::tempdir().context("Failed to create cache dir")?,
        })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.path()
    }

    pub fn paths(&self) -> Paths {
        Paths {
            root: self.root().to_path_buf(),
            cache: self.cache_dir().to_path_buf(),
            exe: PathBuf::from("pkmeter"),
        }
    }

    /// Write `config.json` into the root directory.
    pub fn write_config(&self, config: &Value) -> Result<()> {
        let text = serde_json::to_string_pretty(config)?;
        std::fs::write(self.root().join("config.json"), text).context("Failed to write config.json")
    }

    /// Write `config.toml` into the root directory.
    pub fn write_config_toml(&self, text: &str) -> Result<()> {
        std::fs::write(self.root().join("config.toml"), text).context("Failed to write config.toml")
    }

    /// Load the merged configuration as the binary would.
    pub fn load_config(&self) -> Result<Config> {
        Ok(Config::load(self.root())?)
    }

    pub fn cache_file(&self, widget: &str) -> PathBuf {
        self.paths().cache_file(widget)
    }

    pub fn write_cache(&self, widget: &str, data: &Value) -> Result<()> {
        cache::store(&self.cache_file(widget), data)
    }

    pub fn read_cache(&self, widget: &str) -> Result<Option<Value>> {
        cache::load(&self.cache_file(widget))
    }

    /// Pretend the widget's cache was written `secs` seconds ago.
    pub fn backdate(&self, widget: &str, secs: u64) -> Result<()> {
        let file = std::fs::File::options()
            .write(true)
            .open(self.cache_file(widget))
            .context("Failed to open cache file")?;
        file.set_modified(SystemTime::now() - Duration::from_secs(secs))?;
        Ok(())
    }

    pub fn cache_age(&self, widget: &str) -> u64 {
        cache::modtime_ago(&self.cache_file(widget))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_harness_cache_roundtrip_and_age() {
        let harness = TestHarness::new().unwrap();
        assert_eq!(harness.cache_age("clock"), cache::MISSING_AGE);

        harness.write_cache("clock", &json!({"t": 1})).unwrap();
        assert_eq!(harness.read_cache("clock").unwrap(), Some(json!({"t": 1})));
        assert!(harness.cache_age("clock") < 5);

        harness.backdate("clock", 120).unwrap();
        let age = harness.cache_age("clock");
        assert!((120..125).contains(&age));
    }

    #[test]
    fn test_harness_config_layers() {
        let harness = TestHarness::new().unwrap();
        harness.write_config(&json!({"debug": true})).unwrap();
        let config = harness.load_config().unwrap();
        assert!(config.debug());
        assert!(config.get("header_font").is_some());
    }
}
