//! Mounted filesystem usage with a disk IO graph

use super::{settings, Widget, WidgetContext, HEADER_HEIGHT};
use crate::draw::{pt, DrawPrimitive, RingGraph};
use crate::error::{ConfigError, WidgetError};
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::clean_spaces;
use serde::Deserialize;
use serde_json::Value;

// Header and footer are 57px; each filesystem row adds 36px
const BASE_HEIGHT: i64 = 57;
const ROW_HEIGHT: i64 = 36;
const ROW_SEPARATOR: &str = "${voffset 10}\n";

#[derive(Debug, Clone, Deserialize)]
pub struct Filesystem {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesystemsSettings {
    #[serde(default)]
    pub filesystems: Vec<Filesystem>,
    /// Device or mount shown in the IO graph; defaults to the first entry
    #[serde(default)]
    pub graph_fs: Option<String>,
}

pub struct FilesystemsWidget {
    ctx: WidgetContext,
    settings: FilesystemsSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(FilesystemsWidget { ctx, settings }))
}

impl FilesystemsWidget {
    fn graph_fs(&self) -> Result<&str, WidgetError> {
        if let Some(fs) = &self.settings.graph_fs {
            return Ok(fs);
        }
        self.settings
            .filesystems
            .first()
            .map(|fs| fs.path.as_str())
            .ok_or_else(|| WidgetError::render(&self.ctx.name, "no filesystems configured"))
    }
}

impl Widget for FilesystemsWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        BASE_HEIGHT + self.settings.filesystems.len() as i64 * ROW_HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        let graph_fs = self.graph_fs()?;
        let rows: Vec<String> = self
            .settings
            .filesystems
            .iter()
            .map(|fs| {
                format!(
                    "${{goto 10}}{value}{name}${{alignr 55}}${{fs_free {path}}} free\n\
                     ${{goto 10}}{value}${{fs_used_perc {path}}}%${{alignr 55}}${{fs_size {path}}} total",
                    value = theme.value,
                    name = fs.name,
                    path = fs.path,
                )
            })
            .collect();
        Ok(clean_spaces(&format!(
            r"
            ${{voffset 17}}${{goto 100}}{accent}${{diskiograph {graph_fs} 24,90}}
            ${{voffset -36}}${{goto 10}}{header}File Systems
            ${{goto 10}}{subheader}IO: ${{diskio {graph_fs}}}/s
            ${{voffset 17}}{rows}
            ",
            accent = theme.accent1,
            header = theme.header,
            subheader = theme.subheader,
            rows = rows.join(ROW_SEPARATOR),
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        self.graph_fs()?;
        let mut entries = self.ctx.frame(self.height(), HEADER_HEIGHT, theme);
        entries.push(self.ctx.graph_strip(theme));
        let mut y = self.ctx.origin + 65;
        for fs in &self.settings.filesystems {
            entries.push(DrawPrimitive::RingGraph(RingGraph {
                conky_value: format!("fs_used_perc {}", fs.path),
                center: pt(172, y),
                radius: 8,
                bar_color: theme.accent1.clone(),
                bar_thickness: 4,
                background_color: Some(theme.graph_bg.clone()),
                ..Default::default()
            }));
            y += ROW_HEIGHT;
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Paths, BUILTIN_DEFAULTS};
    use crate::theme::Theme;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;

    fn ctx() -> WidgetContext {
        WidgetContext {
            name: "filesystems".to_string(),
            origin: 40,
            width: 200,
            update_interval: 60,
            update_timeout: Duration::from_secs(30),
            paths: Paths { root: PathBuf::from("/r"), cache: PathBuf::from("/c"), exe: PathBuf::from("pkmeter") },
        }
    }

    fn theme() -> Theme {
        let config = Config::from_layers(serde_json::from_str(BUILTIN_DEFAULTS).unwrap(), json!({}), "h").unwrap();
        Theme::derive(&config).unwrap()
    }

    #[test]
    fn test_rings_per_filesystem() {
        let spec = json!({"filesystems": [{"name": "Root", "path": "/"}, {"name": "Home", "path": "/home"}]});
        let widget = build(ctx(), &spec).unwrap();
        assert_eq!(widget.height(), 57 + 72);
        let rings: Vec<_> = widget
            .draw_entries(&theme().lua)
            .unwrap()
            .into_iter()
            .filter_map(|e| match e {
                DrawPrimitive::RingGraph(ring) => Some(ring),
                _ => None,
            })
            .collect();
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0].center, pt(172, 105));
        assert_eq!(rings[1].center, pt(172, 141));
        assert_eq!(rings[1].conky_value, "fs_used_perc /home");

        let text = widget.conkyrc(&theme().conky).unwrap();
        assert!(text.contains("${diskiograph / 24,90}"));
        assert!(text.contains("total${voffset 10}\n${goto 10}"));
    }

    #[test]
    fn test_empty_list_fails_render_not_build() {
        let widget = build(ctx(), &json!({"filesystems": []})).unwrap();
        assert_eq!(widget.height(), 57);
        assert!(widget.conkyrc(&theme().conky).is_err());
        assert!(widget.draw_entries(&theme().lua).is_err());
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(build(ctx(), &json!({"filesystems": [{"name": "Root"}]})).is_err());
    }
}
