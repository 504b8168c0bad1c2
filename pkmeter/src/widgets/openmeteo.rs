//! Current weather and a four day forecast from Open-Meteo
//!
//! The forecast response is cached as returned, extended with readable
//! condition text and weekday names. Condition icons are copied from the
//! root icon directory into the widget's asset directory, where the draw
//! primitives reference them under fixed names.

use super::{settings, Widget, WidgetContext};
use crate::draw::{pt, DrawPrimitive, Image};
use crate::error::{ConfigError, WidgetError};
use crate::http::HttpClient;
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::clean_spaces;
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const HEIGHT: i64 = 125;
const HEADER: i64 = 50;
const FORECAST_DAYS: usize = 4;
const OPENMETEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Condition text and icon number per Open-Meteo weather code.
const ICONCODES: &[(&str, &str, &[i64])] = &[
    ("Clear", "32", &[0]),
    ("Mostly Sunny", "34", &[1]),
    ("Partly Sunny", "30", &[2]),
    ("Overcast", "26", &[3]),
    ("Fog", "20", &[45, 48]),
    ("Rain Shower", "39", &[80, 81, 82]),
    ("Light Rain", "11", &[51, 53, 61]),
    ("Rain", "12", &[55, 63]),
    ("Heavy Rain", "01", &[65]),
    ("Freezing Rain", "08", &[56, 57, 66, 67]),
    ("Local Thunderstorms", "37", &[95]),
    ("Thunderstorms", "00", &[96, 99]),
    ("Possible Snow", "13", &[71, 77]),
    ("Light Snow", "14", &[73]),
    ("Snow Shower", "41", &[85, 86]),
    ("Snow", "16", &[75]),
];

#[derive(Debug, Clone, Deserialize)]
pub struct OpenMeteoSettings {
    pub city_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: String,
    #[serde(default = "default_windspeed_unit")]
    pub windspeed_unit: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Directory holding `<icon>.png` condition images
    #[serde(default = "default_icon_dir")]
    pub icon_dir: String,
}

fn default_temperature_unit() -> String {
    "fahrenheit".to_string()
}

fn default_windspeed_unit() -> String {
    "mph".to_string()
}

fn default_timezone() -> String {
    "auto".to_string()
}

fn default_icon_dir() -> String {
    "{ROOT}/img/weather".to_string()
}

pub struct OpenMeteoWidget {
    ctx: WidgetContext,
    settings: OpenMeteoSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(OpenMeteoWidget { ctx, settings }))
}

/// Icon number and text for a weather code; `na` when unmapped.
pub fn icon_for(weathercode: i64) -> (&'static str, &'static str) {
    ICONCODES
        .iter()
        .find(|(_, _, codes)| codes.contains(&weathercode))
        .map(|(text, icon, _)| (*icon, *text))
        .unwrap_or(("na", "Not Available"))
}

/// Abbreviated weekday for an ISO date.
pub fn weekday(date: &str) -> Result<String> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").with_context(|| format!("Bad forecast date {date}"))?;
    Ok(date.format("%a").to_string())
}

/// Add `current_text`, `daily.text` and `daily.day`. Returns the icon
/// numbers for the current conditions followed by each forecast day.
pub fn normalize(data: &mut Value) -> Result<Vec<&'static str>> {
    let code = data
        .pointer("/current_weather/weathercode")
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow!("Response has no current_weather.weathercode"))?;
    let (icon, text) = icon_for(code);
    let mut icons = vec![icon];
    data["current_text"] = Value::from(text);

    let daily = data
        .get_mut("daily")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("Response has no daily forecast"))?;
    let codes: Vec<i64> = daily
        .get("weathercode")
        .and_then(Value::as_array)
        .map(|codes| codes.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    let dates: Vec<String> = daily
        .get("time")
        .and_then(Value::as_array)
        .map(|dates| dates.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();
    if codes.len() < FORECAST_DAYS || dates.len() < FORECAST_DAYS {
        return Err(anyhow!("Forecast has fewer than {} days", FORECAST_DAYS));
    }

    let mut texts = Vec::with_capacity(FORECAST_DAYS);
    let mut days = Vec::with_capacity(FORECAST_DAYS);
    for i in 0..FORECAST_DAYS {
        let (icon, text) = icon_for(codes[i]);
        icons.push(icon);
        texts.push(Value::from(text));
        days.push(Value::from(weekday(&dates[i])?));
    }
    daily.insert("text".to_string(), Value::Array(texts));
    daily.insert("day".to_string(), Value::Array(days));
    Ok(icons)
}

impl OpenMeteoWidget {
    fn url(&self) -> String {
        let s = &self.settings;
        format!(
            "{OPENMETEO_URL}?latitude={}&longitude={}&current_weather=1&temperature_unit={}\
             &windspeed_unit={}&timezone={}&daily=weathercode,apparent_temperature_max,sunrise,sunset",
            s.latitude, s.longitude, s.temperature_unit, s.windspeed_unit, s.timezone
        )
    }

    fn icon_path(&self, slot: &str) -> PathBuf {
        self.ctx.asset_dir().join(format!("{slot}.png"))
    }

    /// Icons are cosmetic; a missing image is logged and left out.
    fn copy_icons(&self, icons: &[&str]) {
        let source_dir = self.ctx.paths.expand(&self.settings.icon_dir);
        let slots = std::iter::once("current".to_string()).chain((0..FORECAST_DAYS).map(|i| format!("day{i}")));
        for (icon, slot) in icons.iter().zip(slots) {
            let source = source_dir.join(format!("{icon}.png"));
            if let Err(e) = copy_file(&source, &self.icon_path(&slot)) {
                warn!("Cannot copy weather icon {}: {:#}", source.display(), e);
            }
        }
    }

    fn temperature_symbol(&self) -> &'static str {
        if self.settings.temperature_unit == "fahrenheit" {
            "°F"
        } else {
            "°C"
        }
    }
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let bytes = std::fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?;
    crate::cache::write_atomic(dest, &bytes)
}

#[async_trait::async_trait]
impl Widget for OpenMeteoWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        let ctx = &self.ctx;
        let columns = [18, 66, 114, 163];
        let days: String = columns
            .iter()
            .enumerate()
            .map(|(i, x)| format!("${{goto {x}}}{}", ctx.get(60, &format!("daily.day.{i}"))))
            .collect::<Vec<_>>()
            .join("\\\n");
        let temps: String = columns
            .iter()
            .enumerate()
            .map(|(i, x)| {
                format!("${{goto {x}}}{}°", ctx.get_with(60, "-ir0", &format!("daily.apparent_temperature_max.{i}")))
            })
            .collect::<Vec<_>>()
            .join("\\\n");
        Ok(clean_spaces(&format!(
            r"
            {update}\
            ${{voffset 24}}${{goto 10}}${{font Ubuntu:bold:size=11}}{header_color}{city}\
            ${{alignr 10}}{temp}{unit}
            ${{voffset -2}}${{goto 10}}{subheader}{text}\
            ${{alignr 10}}{header_color}{wind} {wind_unit}
            ${{voffset 46}}${{font Ubuntu:bold:size=7}}{value_color}\
            {days}
            {temps}\
            ${{voffset 11}}{reset}\
            ",
            update = ctx.update(),
            header_color = theme.header_color,
            subheader = theme.subheader,
            value_color = theme.value_color,
            reset = theme.reset,
            city = self.settings.city_name,
            temp = ctx.get_with(60, "-ir0", "current_weather.temperature"),
            unit = self.temperature_symbol(),
            text = ctx.get(60, "current_text"),
            wind = ctx.get_with(60, "-ir0", "current_weather.windspeed"),
            wind_unit = self.settings.windspeed_unit,
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        let origin = self.ctx.origin;
        let mut entries = self.ctx.frame(HEIGHT, HEADER, theme);
        entries.push(DrawPrimitive::Image(Image {
            from: pt(90, origin + 3),
            filepath: self.icon_path("current").display().to_string(),
            width: Some(45),
            height: None,
        }));
        for (i, x) in [15, 63, 111, 160].into_iter().enumerate() {
            entries.push(DrawPrimitive::Image(Image {
                from: pt(x, origin + 59),
                filepath: self.icon_path(&format!("day{i}")).display().to_string(),
                width: Some(25),
                height: None,
            }));
        }
        Ok(entries)
    }

    fn has_update(&self) -> bool {
        true
    }

    async fn update_cache(&self) -> Result<Option<Value>> {
        info!("Updating {} cache", self.ctx.name);
        let client = HttpClient::new(self.ctx.update_timeout)?;
        let mut data = client.get_json(&self.url()).await?;
        let icons = normalize(&mut data)?;
        self.copy_icons(&icons);
        Ok(Some(data))
    }
}
