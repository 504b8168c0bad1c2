//! Layered configuration loading
//!
//! Handles:
//! - Built-in defaults (compiled in, replaceable by `<root>/defaults.json`)
//! - User overrides (`config.json` or `config.toml` in the root directory)
//! - Host-specific overrides keyed `[hostname]`, applied as a final patch
//! - Root / cache directory resolution

use crate::error::ConfigError;
use crate::path;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Built-in defaults shipped with the binary.
pub const BUILTIN_DEFAULTS: &str = include_str!("../defaults.json");

const DEFAULT_WIDTH: i64 = 200;

/// Directories the tool reads from and writes to.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Holds defaults.json, config.{json,toml}, config.lua and img/
    pub root: PathBuf,
    /// Holds one `<widget>.json` document per widget
    pub cache: PathBuf,
    /// The pkmeter binary, referenced from generated conky commands
    pub exe: PathBuf,
}

impl Paths {
    /// Resolve directories, falling back to the OS config/cache locations.
    pub fn resolve(root: Option<PathBuf>, cache: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = match root {
            Some(root) => root,
            None => Self::default_root()?,
        };
        let cache = match cache {
            Some(cache) => cache,
            None => Self::default_cache()?,
        };
        let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("pkmeter"));
        Ok(Self { root, cache, exe })
    }

    /// Get OS-specific root directory
    pub fn default_root() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        path.push("pkmeter");
        Ok(path)
    }

    /// Get OS-specific cache directory
    pub fn default_cache() -> anyhow::Result<PathBuf> {
        let mut path = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        path.push("pkmeter");
        Ok(path)
    }

    /// Cache document for a widget, derived from its logical name.
    pub fn cache_file(&self, widget: &str) -> PathBuf {
        self.cache.join(format!("{widget}.json"))
    }

    /// Expand `{ROOT}`, `{CACHE}` and a leading `~` in a configured path.
    pub fn expand(&self, value: &str) -> PathBuf {
        let value = value
            .replace("{ROOT}", &self.root.to_string_lossy())
            .replace("{CACHE}", &self.cache.to_string_lossy());
        match value.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(&value)),
            None => PathBuf::from(value),
        }
    }
}

/// Merged, read-only configuration tree.
#[derive(Debug, Clone)]
pub struct Config {
    values: Value,
}

impl Config {
    /// Load defaults, user overrides and the host patch from `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let defaults_path = root.join("defaults.json");
        let defaults = if defaults_path.exists() {
            debug!("Using defaults from {}", defaults_path.display());
            parse_layer(&defaults_path)?
        } else {
            parse_json(Path::new("<builtin defaults>"), BUILTIN_DEFAULTS)?
        };

        let user = match user_config_path(root) {
            Some(path) => {
                info!("Loading user config {}", path.display());
                parse_layer(&path)?
            }
            None => {
                warn!("No config.json or config.toml in {}, using defaults only", root.display());
                Value::Object(Map::new())
            }
        };

        let hostname = gethostname::gethostname().to_string_lossy().to_string();
        Self::from_layers(defaults, user, &hostname)
    }

    /// Merge `defaults` <- `user`, then apply the `[hostname]` sub-map of the
    /// result as a third pass.
    pub fn from_layers(defaults: Value, user: Value, hostname: &str) -> Result<Self, ConfigError> {
        let mut merged = defaults;
        if !merged.is_object() {
            return Err(ConfigError::NotAMapping("defaults".to_string()));
        }
        if !user.is_object() {
            return Err(ConfigError::NotAMapping("user config".to_string()));
        }
        merge(&mut merged, &user);

        let key = host_key(hostname);
        match merged.get(&key).cloned() {
            Some(patch @ Value::Object(_)) => {
                debug!("Applying host overrides from {}", key);
                merge(&mut merged, &patch);
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(ConfigError::InvalidType {
                    key,
                    expected: "a mapping",
                })
            }
        }
        Ok(Self { values: merged })
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        path::resolve(&self.values, path)
    }

    /// Required string key; absence or wrong type is a config error.
    pub fn require_str(&self, path: &str) -> Result<&str, ConfigError> {
        match self.get(path) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(ConfigError::InvalidType {
                key: path.to_string(),
                expected: "a string",
            }),
            None => Err(ConfigError::MissingKey(path.to_string())),
        }
    }

    pub fn debug(&self) -> bool {
        self.get("debug").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn logfile(&self) -> Option<&str> {
        path::resolve_str(&self.values, "logfile").filter(|s| !s.is_empty())
    }

    /// Overlay width in pixels (`conky.maximum_width`).
    pub fn width(&self) -> i64 {
        path::resolve_i64(&self.values, "conky.maximum_width").unwrap_or(DEFAULT_WIDTH)
    }

    /// The `conky` settings block, in configured order.
    pub fn conky(&self) -> Option<&Map<String, Value>> {
        self.get("conky").and_then(Value::as_object)
    }

    /// Ordered list of widget names to stack.
    pub fn widget_names(&self) -> Result<Vec<String>, ConfigError> {
        let list = self
            .get("widgets")
            .ok_or_else(|| ConfigError::MissingKey("widgets".to_string()))?;
        let invalid = || ConfigError::InvalidType {
            key: "widgets".to_string(),
            expected: "a list of widget names",
        };
        list.as_array()
            .ok_or_else(invalid)?
            .iter()
            .map(|name| name.as_str().map(String::from).ok_or_else(invalid))
            .collect()
    }

    /// Settings sub-map for a widget name.
    pub fn widget_spec(&self, name: &str) -> Result<&Value, ConfigError> {
        match self.values.get(name) {
            Some(spec @ Value::Object(_)) => Ok(spec),
            _ => Err(ConfigError::MissingWidgetSpec(name.to_string())),
        }
    }
}

/// Recursively merge `patch` into `base`. Nested mappings merge key by key;
/// everything else, sequences included, is replaced wholesale.
pub fn merge(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, value) in patch_map {
                let nested = value.is_object() && base_map.get(key).is_some_and(Value::is_object);
                if !nested {
                    base_map.insert(key.clone(), value.clone());
                } else if let Some(existing) = base_map.get_mut(key) {
                    merge(existing, value);
                }
            }
        }
        (base, patch) => *base = patch.clone(),
    }
}

/// Bracketed key holding host-specific overrides.
pub fn host_key(hostname: &str) -> String {
    format!("[{hostname}]")
}

/// `config.json` takes precedence over `config.toml`.
fn user_config_path(root: &Path) -> Option<PathBuf> {
    ["config.json", "config.toml"]
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.exists())
}

/// Read one config layer, choosing the parser by extension.
pub fn parse_layer(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str::<Value>(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        _ => parse_json(path, &text),
    }
}

fn parse_json(path: &Path, text: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
