//! Widget contract and the built-in widget registry
//!
//! Each widget is a self-contained module implementing the [`Widget`] trait.
//! A configured widget is a named settings map carrying `widget: <type>`;
//! the registry maps that type to a constructor which validates the map into
//! the widget's typed settings. To add a widget: create a file in widgets/,
//! implement the trait, register it in [`WidgetRegistry::builtin`].

pub mod clock;
pub mod filesystems;
pub mod network;
pub mod nowplaying;
pub mod nvidia;
pub mod openmeteo;
pub mod processes;
pub mod system;

use crate::config::{Config, Paths};
use crate::draw::DrawPrimitive;
use crate::error::{ConfigError, WidgetError};
use crate::theme::{ConkyTheme, LuaTheme};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Height of the shaded header band most widgets draw.
pub const HEADER_HEIGHT: i64 = 40;

/// The widget capability set.
#[async_trait::async_trait]
pub trait Widget: Send + Sync {
    fn context(&self) -> &WidgetContext;

    /// Vertical space this widget occupies, in pixels.
    fn height(&self) -> i64;

    /// The widget's slice of `conky.text`.
    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError>;

    /// Drawing primitives positioned relative to the context origin.
    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError>;

    /// Whether this widget has an external data source to refresh.
    fn has_update(&self) -> bool {
        false
    }

    /// Fetch fresh data for the cache. `Ok(None)` means keep what is there.
    async fn update_cache(&self) -> anyhow::Result<Option<Value>> {
        Ok(None)
    }
}

fn shell_quote(path: &Path) -> String {
    let text = path.to_string_lossy();
    match shlex::try_quote(&text) {
        Ok(quoted) => quoted.into_owned(),
        // only a NUL byte is unquotable, and paths cannot hold one
        Err(_) => text.into_owned(),
    }
}

/// Per-instance facts every widget needs, assigned by whoever builds it.
#[derive(Debug, Clone)]
pub struct WidgetContext {
    /// Logical name, the config key and cache file stem
    pub name: String,
    /// Vertical offset where this widget's slice begins
    pub origin: i64,
    pub width: i64,
    pub update_interval: u64,
    pub update_timeout: Duration,
    pub paths: Paths,
}

impl WidgetContext {
    /// The pkmeter invocation embedded in generated conky commands.
    /// conky runs it through `sh -c`, so each path is shell-quoted.
    pub fn command(&self) -> String {
        format!(
            "{} --root {} --cache {}",
            shell_quote(&self.paths.exe),
            shell_quote(&self.paths.root),
            shell_quote(&self.paths.cache)
        )
    }

    /// conky variable body querying one cached value, for draw primitives.
    pub fn query(&self, interval: u64, flags: &str, path: &str) -> String {
        let flags = if flags.is_empty() { String::new() } else { format!("{flags} ") };
        format!("execi {} {} get {}{}.{}", interval, self.command(), flags, self.name, path)
    }

    /// `${execi ...}` printing one cached value.
    pub fn get(&self, interval: u64, path: &str) -> String {
        format!("${{{}}}", self.query(interval, "", path))
    }

    pub fn get_with(&self, interval: u64, flags: &str, path: &str) -> String {
        format!("${{{}}}", self.query(interval, flags, path))
    }

    /// `${texeci ...}` scheduling this widget's own cache refresh.
    pub fn update(&self) -> String {
        format!("${{texeci {} {} update {}}}", self.update_interval, self.command(), self.name)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.paths.cache_file(&self.name)
    }

    /// Directory for auxiliary cached files such as images.
    pub fn asset_dir(&self) -> PathBuf {
        self.paths.cache.join(&self.name)
    }

    /// Header band plus body background spanning `height`.
    pub fn frame(&self, height: i64, header: i64, theme: &LuaTheme) -> Vec<DrawPrimitive> {
        let top = self.origin;
        vec![
            DrawPrimitive::band(self.width, top, top + header, &theme.header_bg),
            DrawPrimitive::band(self.width, top + header, top + height, &theme.bg),
        ]
    }

    /// Dark strip behind a conky graph drawn at `goto 100`.
    pub fn graph_strip(&self, theme: &LuaTheme) -> DrawPrimitive {
        use crate::draw::{pt, Line};
        DrawPrimitive::Line(Line {
            from: pt(100, self.origin + 20),
            to: pt(self.width - 10, self.origin + 20),
            color: theme.graph_bg.clone(),
            thickness: 24,
        })
    }
}

/// Settings every widget accepts.
#[derive(Debug, Clone, Deserialize)]
pub struct CommonSettings {
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
    #[serde(default = "default_update_timeout")]
    pub update_timeout: u64,
    #[serde(default)]
    pub width: Option<i64>,
}

fn default_update_interval() -> u64 {
    60
}

fn default_update_timeout() -> u64 {
    30
}

/// Deserialize a widget's typed settings from its spec map. Unknown keys are
/// ignored; a missing required key or wrong type is a configuration error.
pub fn settings<T: DeserializeOwned>(name: &str, spec: &Value) -> Result<T, ConfigError> {
    T::deserialize(spec).map_err(|source| ConfigError::InvalidSettings {
        name: name.to_string(),
        source,
    })
}

/// Constructor registered for a widget type.
pub type WidgetFactory = fn(WidgetContext, &Value) -> Result<Box<dyn Widget>, ConfigError>;

pub struct WidgetRegistry {
    factories: HashMap<String, WidgetFactory>,
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl WidgetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Registry holding every widget type shipped with pkmeter.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("clock", clock::build);
        registry.register("system", system::build);
        registry.register("processes", processes::build);
        registry.register("filesystems", filesystems::build);
        registry.register("network", network::build);
        registry.register("nvidia", nvidia::build);
        registry.register("openmeteo", openmeteo::build);
        registry.register("nowplaying", nowplaying::build);
        registry
    }

    /// Register a widget type. Replaces any existing type with the same name.
    pub fn register(&mut self, kind: &str, factory: WidgetFactory) {
        self.factories.insert(kind.to_string(), factory);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Build the widget configured under `name`, starting at `origin`.
    pub fn build(
        &self,
        name: &str,
        config: &Config,
        origin: i64,
        paths: &Paths,
    ) -> Result<Box<dyn Widget>, ConfigError> {
        let spec = config.widget_spec(name)?;
        let kind = spec
            .get("widget")
            .and_then(Value::as_str)
            .ok_or_else(|| ConfigError::MissingKey(format!("{name}.widget")))?;
        let factory = self.factories.get(kind).ok_or_else(|| ConfigError::UnknownWidget {
            name: name.to_string(),
            kind: kind.to_string(),
        })?;

        let common: CommonSettings = settings(name, spec)?;
        let context = WidgetContext {
            name: name.to_string(),
            origin,
            width: common.width.unwrap_or_else(|| config.width()),
            update_interval: common.update_interval,
            update_timeout: Duration::from_secs(common.update_timeout),
            paths: paths.clone(),
        };
        debug!("Building widget {} ({}) at origin {}", name, kind, origin);
        factory(context, spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUILTIN_DEFAULTS;
    use serde_json::json;

    fn paths() -> Paths {
        Paths {
            root: PathBuf::from("/r"),
            cache: PathBuf::from("/c"),
            exe: PathBuf::from("/bin/pkmeter"),
        }
    }

    fn config(user: Value) -> Config {
        Config::from_layers(serde_json::from_str(BUILTIN_DEFAULTS).unwrap(), user, "h").unwrap()
    }

    #[test]
    fn test_builtin_registry_covers_defaults() {
        let registry = WidgetRegistry::builtin();
        let config = config(json!({}));
        for name in ["clock", "system", "processes", "filesystems", "network", "nvidia", "openmeteo", "nowplaying"] {
            let widget = registry.build(name, &config, 10, &paths()).unwrap();
            assert_eq!(widget.context().name, name);
            assert_eq!(widget.context().origin, 10);
            assert!(widget.height() > 0);
        }
        assert_eq!(registry.kinds().len(), 8);
    }

    #[test]
    fn test_unknown_widget_type() {
        let config = config(json!({"weird": {"widget": "nope"}}));
        let err = WidgetRegistry::builtin().build("weird", &config, 0, &paths()).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownWidget { ref kind, .. } if kind == "nope"));
    }

    #[test]
    fn test_missing_spec_and_type() {
        let config = config(json!({"typeless": {"count": 3}}));
        let registry = WidgetRegistry::builtin();
        assert!(matches!(
            registry.build("absent", &config, 0, &paths()).err().unwrap(),
            ConfigError::MissingWidgetSpec(_)
        ));
        assert!(matches!(
            registry.build("typeless", &config, 0, &paths()).err().unwrap(),
            ConfigError::MissingKey(_)
        ));
    }

    #[test]
    fn test_common_settings_and_width() {
        let config = config(json!({"conky": {"maximum_width": 260}, "clock": {"update_interval": 5}}));
        let widget = WidgetRegistry::builtin().build("clock", &config, 0, &paths()).unwrap();
        let ctx = widget.context();
        assert_eq!(ctx.width, 260);
        assert_eq!(ctx.update_interval, 5);
        assert_eq!(ctx.update_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_settings_type() {
        let config = config(json!({"processes": {"count": "many"}}));
        let err = WidgetRegistry::builtin().build("processes", &config, 0, &paths()).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidSettings { .. }));
    }

    #[test]
    fn test_context_commands() {
        let ctx = WidgetContext {
            name: "net".to_string(),
            origin: 0,
            width: 200,
            update_interval: 1800,
            update_timeout: Duration::from_secs(30),
            paths: paths(),
        };
        assert_eq!(ctx.get(60, "ip"), "${execi 60 /bin/pkmeter --root /r --cache /c get net.ip}");
        assert_eq!(
            ctx.get_with(60, "-ir0", "t"),
            "${execi 60 /bin/pkmeter --root /r --cache /c get -ir0 net.t}"
        );
        assert_eq!(ctx.update(), "${texeci 1800 /bin/pkmeter --root /r --cache /c update net}");
        assert_eq!(ctx.cache_path(), PathBuf::from("/c/net.json"));
    }

    #[test]
    fn test_context_commands_quote_paths() {
        let ctx = WidgetContext {
            name: "net".to_string(),
            origin: 0,
            width: 200,
            update_interval: 1800,
            update_timeout: Duration::from_secs(30),
            paths: Paths {
                root: PathBuf::from("/home/me/My Config/pkmeter"),
                cache: PathBuf::from("/tmp/it's cache"),
                exe: PathBuf::from("/bin/pkmeter"),
            },
        };
        let command = ctx.command();
        assert_eq!(
            shlex::split(&command).unwrap(),
            vec!["/bin/pkmeter", "--root", "/home/me/My Config/pkmeter", "--cache", "/tmp/it's cache"]
        );
        assert!(ctx.update().ends_with(" update net}"));
    }
}
