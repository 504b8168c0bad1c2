//! CPU, uptime and memory summary with one bar per logical CPU

use super::{settings, Widget, WidgetContext, HEADER_HEIGHT};
use crate::draw::{pt, BarGraph, DrawPrimitive, RingGraph};
use crate::error::{ConfigError, WidgetError};
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::clean_spaces;
use serde::Deserialize;
use serde_json::Value;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

const HEIGHT: i64 = 123;
const BAR_HEIGHT: i64 = 9;
/// Total width available to the two rows of CPU bars.
const BARS_WIDTH: f64 = 40.0;
const BARS_RIGHT: f64 = 190.0;

#[derive(Debug, Clone, Deserialize)]
pub struct SystemSettings {
    /// Overrides the detected logical CPU count
    #[serde(default)]
    pub cpu_count: Option<usize>,
}

pub struct SystemWidget {
    ctx: WidgetContext,
    cpu_count: usize,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings: SystemSettings = settings(&ctx.name, spec)?;
    let cpu_count = settings.cpu_count.unwrap_or_else(detect_cpu_count).max(1);
    Ok(Box::new(SystemWidget { ctx, cpu_count }))
}

fn detect_cpu_count() -> usize {
    let sys = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
    sys.cpus().len()
}

impl SystemWidget {
    /// Two rows of thin bar graphs, right-aligned against the ring.
    fn cpu_bars(&self, theme: &LuaTheme) -> Vec<DrawPrimitive> {
        let count = self.cpu_count;
        let half = count as f64 / 2.0;
        let bar_width = (BARS_WIDTH / half) as i64 - 1;
        let full_width = (bar_width + 1) as f64 * half;
        let left = BARS_RIGHT - full_width;
        (1..=count)
            .map(|cpu| {
                let (slot, y) = if (cpu - 1) as f64 >= half {
                    (cpu as f64 - half, self.ctx.origin + 65)
                } else {
                    (cpu as f64, self.ctx.origin + 53)
                };
                let x = (left + slot * (bar_width + 1) as f64) as i64;
                DrawPrimitive::BarGraph(BarGraph {
                    conky_value: format!("cpu cpu{cpu}"),
                    from: pt(x, y + BAR_HEIGHT),
                    to: pt(x, y),
                    bar_color: theme.accent1.clone(),
                    bar_thickness: bar_width,
                    background_color: Some(theme.graph_bg.clone()),
                    background_thickness: Some(bar_width),
                    ..Default::default()
                })
            })
            .collect()
    }
}

impl Widget for SystemWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        Ok(clean_spaces(&format!(
            r"
            ${{voffset 17}}${{goto 100}}{accent}${{cpugraph cpu0 24,90 -l}}${{color}}
            ${{voffset -36}}${{goto 10}}{header}System
            ${{goto 10}}{subheader}${{nodename}}
            ${{voffset 17}}${{goto 10}}{label}CPU Usage{value}${{alignr 55}}${{cpu cpu0}}%
            ${{goto 10}}{label}CPU Uptime{value}${{alignr 55}}${{uptime_short}}
            ${{goto 10}}{label}Mem Used{value}${{alignr 55}}${{mem}}
            ${{goto 10}}{label}Mem Free{value}${{alignr 55}}${{memeasyfree}}
            {reset}${{voffset 3}}\
            ",
            accent = theme.accent1,
            header = theme.header,
            subheader = theme.subheader,
            label = theme.label,
            value = theme.value,
            reset = theme.reset,
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        let mut entries = self.ctx.frame(HEIGHT, HEADER_HEIGHT, theme);
        entries.push(self.ctx.graph_strip(theme));
        entries.push(DrawPrimitive::RingGraph(RingGraph {
            conky_value: "memperc".to_string(),
            center: pt(173, self.ctx.origin + 91),
            radius: 8,
            bar_color: theme.accent1.clone(),
            bar_thickness: 4,
            background_color: Some(theme.graph_bg.clone()),
            ..Default::default()
        }));
        entries.extend(self.cpu_bars(theme));
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

    fn widget(cpus: usize) -> Box<dyn Widget> {
        let ctx = WidgetContext {
            name: "system".to_string(),
            origin: 85,
            width: 200,
            update_interval: 60,
            update_timeout: Duration::from_secs(30),
            paths: Paths { root: PathBuf::from("/r"), cache: PathBuf::from("/c"), exe: PathBuf::from("pkmeter") },
        };
        build(ctx, &json!({"widget": "system", "cpu_count": cpus})).unwrap()
    }

    fn theme() -> Theme {
        let config = Config::from_layers(serde_json::from_str(BUILTIN_DEFAULTS).unwrap(), json!({}), "h").unwrap();
        Theme::derive(&config).unwrap()
    }

    #[test]
    fn test_one_bar_per_cpu() {
        let entries = widget(8).draw_entries(&theme().lua).unwrap();
        let bars: Vec<_> = entries
            .iter()
            .filter_map(|e| match e {
                DrawPrimitive::BarGraph(bar) => Some(bar),
                _ => None,
            })
            .collect();
        assert_eq!(bars.len(), 8);
        // 4 per row, 9px wide
        assert_eq!(bars[0].bar_thickness, 9);
        assert_eq!(bars[0].to, pt(160, 85 + 53));
        assert_eq!(bars[4].to, pt(160, 85 + 65));
        assert_eq!(bars[7].conky_value, "cpu cpu8");
    }

    #[test]
    fn test_frame_spans_height() {
        let entries = widget(2).draw_entries(&theme().lua).unwrap();
        match &entries[1] {
            DrawPrimitive::Line(line) => {
                assert_eq!(line.from.y, 85 + HEADER_HEIGHT);
                assert_eq!(line.to.y, 85 + HEIGHT);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_template_mentions_memory() {
        let text = widget(4).conkyrc(&theme().conky).unwrap();
        assert!(text.contains("${memeasyfree}"));
        assert!(text.ends_with('\\'));
    }
}
