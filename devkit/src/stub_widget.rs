/*!
Stub widget for composition and update tests

Height, render failure and update behaviour all come from the widget's
settings map, so one registered type covers every scenario:

```json
{"widget": "stub", "height": 40, "fail_render": false,
 "data": {"value": 1}, "fail_update": false, "delay_ms": 0}
```
*/

use pkmeter::draw::DrawPrimitive;
use pkmeter::theme::{ConkyTheme, LuaTheme};
use pkmeter::widgets::settings;
use pkmeter::{ConfigError, Widget, WidgetContext, WidgetError, WidgetRegistry};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const STUB_KIND: &str = "stub";

#[derive(Debug, Clone, Deserialize)]
pub struct StubSettings {
    #[serde(default = "default_height")]
    pub height: i64,
    #[serde(default)]
    pub fail_render: bool,
    /// Returned from `update_cache`; absent means the widget has no source
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub fail_update: bool,
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_height() -> i64 {
    20
}

pub struct StubWidget {
    ctx: WidgetContext,
    settings: StubSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(StubWidget { ctx, settings }))
}

/// Built-in widgets plus the stub type.
pub fn stub_registry() -> WidgetRegistry {
    let mut registry = WidgetRegistry::builtin();
    registry.register(STUB_KIND, build);
    registry
}

#[async_trait::async_trait]
impl Widget for StubWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        self.settings.height
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        if self.settings.fail_render {
            return Err(WidgetError::render(&self.ctx.name, "stub told to fail"));
        }
        Ok(format!(
            "${{voffset {}}}${{goto 10}}{}{}",
            self.settings.height,
            theme.value,
            self.ctx.get(5, "value")
        ))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        if self.settings.fail_render {
            return Err(WidgetError::render(&self.ctx.name, "stub told to fail"));
        }
        let top = self.ctx.origin;
        Ok(vec![DrawPrimitive::band(
            self.ctx.width,
            top,
            top + self.settings.height,
            &theme.bg,
        )])
    }

    fn has_update(&self) -> bool {
        self.settings.data.is_some() || self.settings.fail_update
    }

    async fn update_cache(&self) -> anyhow::Result<Option<Value>> {
        if self.settings.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.delay_ms)).await;
        }
        if self.settings.fail_update {
            anyhow::bail!("stub source unavailable");
        }
        Ok(self.settings.data.clone())
    }
}
