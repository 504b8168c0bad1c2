//! Presentation tokens derived once from the merged configuration
//!
//! `ConkyTheme` holds ready-to-paste conky variables for layout fragments;
//! `LuaTheme` holds the raw color / font strings handed to the draw encoder.
//! See https://conky.sourceforge.net/variables.html

use crate::config::Config;
use crate::error::ConfigError;

pub const RESET: &str = "${font}${color}";
pub const DEBUG_MARKER: &str = "${voffset 6}${goto 10}${color #442222}${hr 2}${voffset -6}";

/// Both token bundles, derived together.
#[derive(Debug, Clone)]
pub struct Theme {
    pub conky: ConkyTheme,
    pub lua: LuaTheme,
}

impl Theme {
    /// Fails on the first missing or non-string theme key.
    pub fn derive(config: &Config) -> Result<Self, ConfigError> {
        let lua = LuaTheme::derive(config)?;
        let conky = ConkyTheme::from_lua(&lua);
        Ok(Self { conky, lua })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConkyTheme {
    // Colors
    pub accent1: String,
    pub bg: String,
    pub graph_bg: String,
    pub header_bg: String,
    pub header_color: String,
    pub label_color: String,
    pub subheader_color: String,
    pub value_color: String,
    // Fonts
    pub header_font: String,
    pub label_font: String,
    pub subheader_font: String,
    pub value_font: String,
    // Combined
    pub header: String,
    pub label: String,
    pub subheader: String,
    pub value: String,
    pub reset: String,
    pub debug: String,
}

impl ConkyTheme {
    fn from_lua(lua: &LuaTheme) -> Self {
        let header_color = conky_color(&lua.header_color);
        let label_color = conky_color(&lua.label_color);
        let subheader_color = conky_color(&lua.subheader_color);
        let value_color = conky_color(&lua.value_color);
        let header_font = conky_font(&lua.header_font);
        let label_font = conky_font(&lua.label_font);
        let subheader_font = conky_font(&lua.subheader_font);
        let value_font = conky_font(&lua.value_font);
        Self {
            accent1: conky_color(&lua.accent1),
            bg: conky_color(&lua.bg),
            graph_bg: conky_color(&lua.graph_bg),
            header_bg: conky_color(&lua.header_bg),
            header: format!("{header_font}{header_color}"),
            label: format!("{label_font}{label_color}"),
            subheader: format!("{subheader_font}{subheader_color}"),
            value: format!("{value_font}{value_color}"),
            header_color,
            label_color,
            subheader_color,
            value_color,
            header_font,
            label_font,
            subheader_font,
            value_font,
            reset: RESET.to_string(),
            debug: DEBUG_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LuaTheme {
    pub accent1: String,
    pub bg: String,
    pub graph_bg: String,
    pub header_bg: String,
    pub header_color: String,
    pub label_color: String,
    pub subheader_color: String,
    pub value_color: String,
    pub header_font: String,
    pub label_font: String,
    pub subheader_font: String,
    pub value_font: String,
}

impl LuaTheme {
    fn derive(config: &Config) -> Result<Self, ConfigError> {
        let get = |key: &str| -> Result<String, ConfigError> {
            config
                .get(key)
                .and_then(|v| v.as_str())
                .map(String::from)
                .ok_or_else(|| ConfigError::MissingThemeKey(key.to_string()))
        };
        Ok(Self {
            accent1: get("accent1")?,
            bg: get("bg")?,
            graph_bg: get("graph_bg")?,
            header_bg: get("header_bg")?,
            header_color: get("header_color")?,
            label_color: get("label_color")?,
            subheader_color: get("subheader_color")?,
            value_color: get("value_color")?,
            header_font: get("header_font")?,
            label_font: get("label_font")?,
            subheader_font: get("subheader_font")?,
            value_font: get("value_font")?,
        })
    }
}

/// Conky has no alpha channel; keep `#rrggbb` only.
fn conky_color(value: &str) -> String {
    let rgb: String = value.chars().take(7).collect();
    format!("${{color {rgb}}}")
}

fn conky_font(value: &str) -> String {
    format!("${{font {value}}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BUILTIN_DEFAULTS;
    use serde_json::{json, Value};

    fn defaults() -> Value {
        serde_json::from_str(BUILTIN_DEFAULTS).unwrap()
    }

    #[test]
    fn test_composite_tokens() {
        let config = Config::from_layers(
            defaults(),
            json!({"header_font": "Ubuntu:bold:size=9", "header_color": "#112233aa"}),
            "h",
        )
        .unwrap();
        let theme = Theme::derive(&config).unwrap();
        assert_eq!(theme.conky.header_color, "${color #112233}");
        assert_eq!(theme.conky.header, "${font Ubuntu:bold:size=9}${color #112233}");
        assert_eq!(theme.conky.reset, "${font}${color}");
        // raw value keeps its alpha for the draw encoder
        assert_eq!(theme.lua.header_color, "#112233aa");
    }

    #[test]
    fn test_missing_key_fails_fast() {
        let mut values = defaults();
        values.as_object_mut().unwrap().remove("value_font");
        let config = Config::from_layers(values, json!({}), "h").unwrap();
        match Theme::derive(&config) {
            Err(ConfigError::MissingThemeKey(key)) => assert_eq!(key, "value_font"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_non_string_key_is_missing() {
        let config = Config::from_layers(defaults(), json!({"bg": 12}), "h").unwrap();
        assert!(matches!(Theme::derive(&config), Err(ConfigError::MissingThemeKey(_))));
    }
}
