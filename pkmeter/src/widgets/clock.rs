//! Date and time, drawn by conky itself

use super::{settings, Widget, WidgetContext};
use crate::draw::DrawPrimitive;
use crate::error::{ConfigError, WidgetError};
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::clean_spaces;
use serde::Deserialize;
use serde_json::Value;

const HEIGHT: i64 = 85;

#[derive(Debug, Clone, Deserialize)]
pub struct ClockSettings {
    #[serde(default = "default_bignum")]
    pub bignum: String,
    #[serde(default = "default_line1")]
    pub line1: String,
    #[serde(default = "default_line2")]
    pub line2: String,
    #[serde(default = "default_line3")]
    pub line3: String,
}

fn default_bignum() -> String {
    "%d".to_string()
}

fn default_line1() -> String {
    "%B %Y".to_string()
}

fn default_line2() -> String {
    "%A".to_string()
}

fn default_line3() -> String {
    "%H:%M:%S".to_string()
}

pub struct ClockWidget {
    ctx: WidgetContext,
    settings: ClockSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(ClockWidget { ctx, settings }))
}

impl Widget for ClockWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        let s = &self.settings;
        Ok(clean_spaces(&format!(
            r"
            ${{voffset 8}}${{font Ubuntu:bold:size=43}}{accent}${{alignr 105}}${{time {bignum}}}${{font}}
            ${{voffset -45}}${{goto 105}}{header}${{time {line1}}}
            ${{goto 105}}{value}${{time {line2}}}
            ${{goto 105}}{value}${{time {line3}}}
            ",
            accent = theme.accent1,
            header = theme.header,
            value = theme.value,
            bignum = s.bignum,
            line1 = s.line1,
            line2 = s.line2,
            line3 = s.line3,
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        let top = self.ctx.origin;
        Ok(vec![DrawPrimitive::band(self.ctx.width, top, top + HEIGHT, &theme.bg)])
    }
}
