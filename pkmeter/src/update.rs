//! Cache refresh behind `pkmeter update <widget>`
//!
//! The staleness gate decides whether the widget's data source is queried at
//! all. A failed or timed-out fetch is logged and the previous cache stays in
//! place; only configuration problems surface as errors.

use crate::cache;
use crate::config::{Config, Paths};
use crate::error::ConfigError;
use crate::widgets::WidgetRegistry;
use tracing::{debug, info, warn};

/// What one update invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Fresh data was written to the cache
    Stored,
    /// The cache is younger than the update interval
    Fresh,
    /// The widget has no external data source
    NoSource,
    /// The widget reported nothing new; the cache was left alone
    Unchanged,
    /// The fetch failed or timed out; the previous cache was kept
    Failed,
}

/// Refresh the cache of the widget configured under `name`.
pub async fn run_update(
    name: &str,
    config: &Config,
    registry: &WidgetRegistry,
    paths: &Paths,
    force: bool,
) -> Result<UpdateOutcome, ConfigError> {
    let widget = registry.build(name, config, 0, paths)?;
    if !widget.has_update() {
        debug!("{} has nothing to update", name);
        return Ok(UpdateOutcome::NoSource);
    }

    let ctx = widget.context();
    let cache_path = ctx.cache_path();
    if !force && !cache::should_update(&cache_path, ctx.update_interval) {
        debug!("{} cache is fresh", name);
        return Ok(UpdateOutcome::Fresh);
    }

    let fetched = match tokio::time::timeout(ctx.update_timeout, widget.update_cache()).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} update timed out after {:?}, keeping previous cache", name, ctx.update_timeout);
            return Ok(UpdateOutcome::Failed);
        }
    };

    match fetched {
        Ok(Some(data)) => match cache::store(&cache_path, &data) {
            Ok(()) => {
                info!("Updated {} cache", name);
                Ok(UpdateOutcome::Stored)
            }
            Err(e) => {
                warn!("Cannot save {} cache: {:#}", name, e);
                Ok(UpdateOutcome::Failed)
            }
        },
        Ok(None) => Ok(UpdateOutcome::Unchanged),
        Err(e) => {
            warn!("{} update failed, keeping previous cache: {:#}", name, e);
            Ok(UpdateOutcome::Failed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::DrawPrimitive;
    use crate::error::WidgetError;
    use crate::theme::{ConkyTheme, LuaTheme};
    use crate::widgets::{Widget, WidgetContext};
    use serde_json::{json, Value};
    use std::time::{Duration, SystemTime};

    /// Widget whose update behaviour comes from its `mode` setting.
    struct Scripted {
        ctx: WidgetContext,
        mode: String,
    }

    fn build_scripted(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
        let mode = spec.get("mode").and_then(Value::as_str).unwrap_or("ok").to_string();
        Ok(Box::new(Scripted { ctx, mode }))
    }

    #[async_trait::async_trait]
    impl Widget for Scripted {
        fn context(&self) -> &WidgetContext {
            &self.ctx
        }

        fn height(&self) -> i64 {
            10
        }

        fn conkyrc(&self, _theme: &ConkyTheme) -> Result<String, WidgetError> {
            Ok(String::new())
        }

        fn draw_entries(&self, _theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
            Ok(Vec::new())
        }

        fn has_update(&self) -> bool {
            self.mode != "static"
        }

        async fn update_cache(&self) -> anyhow::Result<Option<Value>> {
            match self.mode.as_str() {
                "fail" => anyhow::bail!("source unreachable"),
                "none" => Ok(None),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Some(json!({"late": true})))
                }
                _ => Ok(Some(json!({"value": 7}))),
            }
        }
    }

    fn setup(mode: &str) -> (tempfile::TempDir, Config, WidgetRegistry, Paths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths {
            root: dir.path().join("root"),
            cache: dir.path().join("cache"),
            exe: "pkmeter".into(),
        };
        let config = Config::from_layers(
            json!({}),
            json!({"gauge": {"widget": "scripted", "mode": mode, "update_interval": 30, "update_timeout": 1}}),
            "h",
        )
        .unwrap();
        let mut registry = WidgetRegistry::new();
        registry.register("scripted", build_scripted);
        (dir, config, registry, paths)
    }

    fn backdate(path: &std::path::Path, secs: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs)).unwrap();
    }

    #[tokio::test]
    async fn test_stores_when_missing_then_gates() {
        let (_dir, config, registry, paths) = setup("ok");
        let outcome = run_update("gauge", &config, &registry, &paths, false).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Stored);
        let cache_file = paths.cache_file("gauge");
        assert_eq!(cache::load(&cache_file).unwrap(), Some(json!({"value": 7})));

        let again = run_update("gauge", &config, &registry, &paths, false).await.unwrap();
        assert_eq!(again, UpdateOutcome::Fresh);

        // 25s < 27s threshold, 28s is past it
        backdate(&cache_file, 25);
        assert_eq!(run_update("gauge", &config, &registry, &paths, false).await.unwrap(), UpdateOutcome::Fresh);
        backdate(&cache_file, 28);
        assert_eq!(run_update("gauge", &config, &registry, &paths, false).await.unwrap(), UpdateOutcome::Stored);
    }

    #[tokio::test]
    async fn test_force_bypasses_gate() {
        let (_dir, config, registry, paths) = setup("ok");
        run_update("gauge", &config, &registry, &paths, false).await.unwrap();
        let forced = run_update("gauge", &config, &registry, &paths, true).await.unwrap();
        assert_eq!(forced, UpdateOutcome::Stored);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_cache() {
        let (_dir, config, registry, paths) = setup("fail");
        let cache_file = paths.cache_file("gauge");
        cache::store(&cache_file, &json!({"value": 1})).unwrap();
        let outcome = run_update("gauge", &config, &registry, &paths, true).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Failed);
        assert_eq!(cache::load(&cache_file).unwrap(), Some(json!({"value": 1})));
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let (_dir, config, registry, paths) = setup("slow");
        let outcome = run_update("gauge", &config, &registry, &paths, true).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Failed);
        assert!(!paths.cache_file("gauge").exists());
    }

    #[tokio::test]
    async fn test_none_and_static() {
        let (_dir, config, registry, paths) = setup("none");
        assert_eq!(run_update("gauge", &config, &registry, &paths, true).await.unwrap(), UpdateOutcome::Unchanged);
        assert!(!paths.cache_file("gauge").exists());

        let (_dir, config, registry, paths) = setup("static");
        assert_eq!(run_update("gauge", &config, &registry, &paths, true).await.unwrap(), UpdateOutcome::NoSource);
    }

    #[tokio::test]
    async fn test_unknown_widget_is_config_error() {
        let (_dir, config, registry, paths) = setup("ok");
        assert!(matches!(
            run_update("absent", &config, &registry, &paths, false).await,
            Err(ConfigError::MissingWidgetSpec(_))
        ));
    }
}
