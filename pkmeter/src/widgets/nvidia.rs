//! NVIDIA GPU metrics queried from nvidia-settings

use super::{settings, Widget, WidgetContext, HEADER_HEIGHT};
use crate::draw::{pt, DrawPrimitive, RingGraph};
use crate::error::{ConfigError, WidgetError};
use crate::execution::CommandExecutor;
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::{self, celsius_to_fahrenheit, clean_spaces, value_to_str};
use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::info;

const HEIGHT: i64 = 110;
const NVIDIA_CMD: &str = "nvidia-settings";
const NVIDIA_ATTRS: [&str; 8] = [
    "NvidiaDriverVersion",
    "GPUCoreTemp",
    "GPUCurrentFanSpeedRPM",
    "GPUCurrentClockFreqs",
    "GPUUtilization",
    "TotalDedicatedGPUMemory",
    "UsedDedicatedGPUMemory",
    "RefreshRate",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NvidiaSettings {
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
}

pub struct NvidiaWidget {
    ctx: WidgetContext,
    settings: NvidiaSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(NvidiaWidget { ctx, settings }))
}

/// Parse `Attribute 'Name' (host:0[gpu:0]): value.` lines. Values of the
/// form `a=1, b=2` become nested maps.
pub fn parse_attributes(stdout: &str) -> Result<Map<String, Value>> {
    let attribute = Regex::new(r"Attribute '(\w+)'.+?:\s(.+?)\.?\n")?;
    let mut data = Map::new();
    for caps in attribute.captures_iter(stdout) {
        let key = caps[1].trim().to_string();
        let raw = caps[2].trim();
        let value = if raw.contains('=') {
            let nested: Map<String, Value> = raw
                .split(',')
                .filter_map(|item| item.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), utils::cast_num(Value::from(v.trim()))))
                .collect();
            Value::Object(nested)
        } else {
            utils::cast_num(Value::from(raw))
        };
        data.insert(key, value);
    }
    Ok(data)
}

pub fn parse_gpu_name(stdout: &str) -> Result<String> {
    let gpu = Regex::new(r"(?i)\[gpu:\d+\] \(NVIDIA (.+?)\)")?;
    Ok(gpu.captures(stdout).map(|caps| caps[1].to_string()).unwrap_or_default())
}

/// Derive the display values the layout queries.
pub fn normalize(mut data: Map<String, Value>, gpu_name: String, unit: TemperatureUnit) -> Value {
    let number = |data: &Map<String, Value>, key: &str| data.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    let mem_total = number(&data, "TotalDedicatedGPUMemory");
    let mem_used = number(&data, "UsedDedicatedGPUMemory");
    let temp = number(&data, "GPUCoreTemp");
    let freqs: Vec<String> = match data.get("GPUCurrentClockFreqs") {
        Some(Value::String(text)) => text.split(',').map(|f| f.trim().to_string()).collect(),
        _ => Vec::new(),
    };

    data.insert("GPUName".to_string(), Value::from(gpu_name));
    data.insert("TotalDedicatedGPUMemory".to_string(), Value::from(value_to_str(mem_total, utils::MB, 1)));
    data.insert("UsedDedicatedGPUMemory".to_string(), Value::from(value_to_str(mem_used, utils::MB, 1)));
    data.insert(
        "PercentUsedDedicatedGPUMemory".to_string(),
        Value::from(utils::percent(mem_used, mem_total, 0, 100.0, 0.0)),
    );
    if unit == TemperatureUnit::Fahrenheit {
        data.insert("GPUCoreTemp".to_string(), Value::from(celsius_to_fahrenheit(temp)));
    }
    if let [graphics, memory] = freqs.as_slice() {
        data.insert("GPUGraphicsFreq".to_string(), utils::cast_num(Value::from(graphics.as_str())));
        // DDR transfers twice per clock
        if let Ok(mem) = memory.parse::<i64>() {
            data.insert("MemoryTransferRate".to_string(), Value::from(mem * 2));
        }
    }
    Value::Object(data)
}

#[async_trait::async_trait]
impl Widget for NvidiaWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        let ctx = &self.ctx;
        Ok(clean_spaces(&format!(
            r"
            {update}\
            ${{voffset 17}}${{goto 10}}{header}NVIDIA${{font}}
            ${{goto 10}}{subheader}{name} - {driver}${{color}}
            ${{voffset 15}}${{goto 10}}{label}GPU Usage${{alignr 55}}{value}{usage}%
            ${{goto 10}}{label}GPU Freq${{alignr 55}}{value}{freq} MHz
            ${{goto 10}}{label}GPU Temp${{alignr 55}}{value}{temp}{unit}
            ${{goto 10}}{label}Mem Used${{alignr 55}}{value}{mem}% of {total}
            ${{goto 10}}{label}Mem Rate${{alignr 55}}{value}{rate} MHz
            ${{goto 10}}{label}Refresh Rate${{alignr 55}}{value}{refresh}
            ${{voffset 3}}{reset}\
            ",
            update = ctx.update(),
            header = theme.header,
            subheader = theme.subheader,
            label = theme.label,
            value = theme.value,
            reset = theme.reset,
            name = ctx.get(60, "GPUName"),
            driver = ctx.get(60, "NvidiaDriverVersion"),
            usage = ctx.get(5, "GPUUtilization.graphics"),
            freq = ctx.get(5, "GPUGraphicsFreq"),
            temp = ctx.get(5, "GPUCoreTemp"),
            unit = self.settings.temperature_unit.symbol(),
            mem = ctx.get(5, "GPUUtilization.memory"),
            total = ctx.get(60, "TotalDedicatedGPUMemory"),
            rate = ctx.get(5, "MemoryTransferRate"),
            refresh = ctx.get(5, "RefreshRate"),
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        let mut entries = self.ctx.frame(HEIGHT, HEADER_HEIGHT, theme);
        entries.push(DrawPrimitive::RingGraph(RingGraph {
            conky_value: self.ctx.query(5, "", "PercentUsedDedicatedGPUMemory"),
            center: pt(173, self.ctx.origin + 20),
            radius: 8,
            bar_color: theme.accent1.clone(),
            bar_thickness: 4,
            background_color: Some(theme.graph_bg.clone()),
            max_value: Some(100.0),
            ..Default::default()
        }));
        Ok(entries)
    }

    fn has_update(&self) -> bool {
        true
    }

    async fn update_cache(&self) -> Result<Option<Value>> {
        info!("Updating {} cache", self.ctx.name);
        let timeout = self.ctx.update_timeout;
        let queries: Vec<String> = NVIDIA_ATTRS.iter().map(|attr| format!("--query={attr}")).collect();
        let args: Vec<&str> = queries.iter().map(String::as_str).collect();
        let stdout = CommandExecutor::output(NVIDIA_CMD, &args, timeout).await?;
        let gpus = CommandExecutor::output(NVIDIA_CMD, &["--query=gpus"], timeout).await?;
        let data = parse_attributes(&stdout)?;
        Ok(Some(normalize(data, parse_gpu_name(&gpus)?, self.settings.temperature_unit)))
    }
}
