//! Top processes table using conky's `top` / `top_mem` variables

use super::{settings, Widget, WidgetContext, HEADER_HEIGHT};
use crate::draw::DrawPrimitive;
use crate::error::{ConfigError, WidgetError};
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::clean_spaces;
use serde::Deserialize;
use serde_json::Value;

// Header and footer are 67px; each Ubuntu:size=8 row adds 13px
const BASE_HEIGHT: i64 = 67;
const ROW_HEIGHT: i64 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Top,
    TopMem,
    TopIo,
}

impl SortBy {
    fn variable(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::TopMem => "top_mem",
            Self::TopIo => "top_io",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessesSettings {
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_sortby")]
    pub sortby: SortBy,
}

fn default_count() -> u32 {
    5
}

fn default_sortby() -> SortBy {
    SortBy::Top
}

pub struct ProcessesWidget {
    ctx: WidgetContext,
    settings: ProcessesSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(ProcessesWidget { ctx, settings }))
}

impl Widget for ProcessesWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        BASE_HEIGHT + self.settings.count as i64 * ROW_HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        let top = self.settings.sortby.variable();
        let rows: Vec<String> = (1..=self.settings.count)
            .map(|i| {
                format!(
                    "${{goto 10}}{label}${{{top} name {i}}}${{goto 110}}{value}${{{top} mem_res {i}}}${{alignr 10}}${{{top} cpu {i}}}%",
                    label = theme.label,
                    value = theme.value,
                )
            })
            .collect();
        Ok(clean_spaces(&format!(
            r"
            ${{voffset 20}}${{goto 10}}{header}Processes${{font}}
            ${{goto 10}}{subheader}${{processes}} processes
            ${{voffset 17}}{rows}
            {reset}\
            ",
            header = theme.header,
            subheader = theme.subheader,
            rows = rows.join("\n"),
            reset = theme.reset,
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        Ok(self.ctx.frame(self.height(), HEADER_HEIGHT, theme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Paths;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn ctx() -> WidgetContext {
        WidgetContext {
            name: "processes".to_string(),
            origin: 0,
            width: 200,
            update_interval: 60,
            update_timeout: Duration::from_secs(30),
            paths: Paths { root: PathBuf::from("/r"), cache: PathBuf::from("/c"), exe: PathBuf::from("pkmeter") },
        }
    }

    #[test]
    fn test_height_grows_per_row() {
        assert_eq!(build(ctx(), &json!({"count": 5})).unwrap().height(), 132);
        assert_eq!(build(ctx(), &json!({"count": 0})).unwrap().height(), 67);
    }

    #[test]
    fn test_unknown_sort_rejected() {
        assert!(matches!(
            build(ctx(), &json!({"sortby": "top_gpu"})),
            Err(ConfigError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn test_rows_use_sort_variable() {
        let config = crate::config::Config::from_layers(
            serde_json::from_str(crate::config::BUILTIN_DEFAULTS).unwrap(),
            json!({}),
            "h",
        )
        .unwrap();
        let theme = crate::theme::Theme::derive(&config).unwrap();
        let widget = build(ctx(), &json!({"count": 2, "sortby": "top_mem"})).unwrap();
        let text = widget.conkyrc(&theme.conky).unwrap();
        assert!(text.contains("${top_mem name 2}"));
        assert!(!text.contains("${top_mem name 3}"));
        assert_eq!(text.lines().count(), 5);
    }
}
