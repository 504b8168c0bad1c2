//! Error types shared by the configuration, theme and widget layers

use std::path::PathBuf;

/// Errors that make the configuration unusable. Always fatal to the
/// invocation that hits them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config layer {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config layer {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("config layer {0} is not a mapping")]
    NotAMapping(String),
    #[error("missing required config key: {0}")]
    MissingKey(String),
    #[error("config key '{key}' must be {expected}")]
    InvalidType { key: String, expected: &'static str },
    #[error("missing theme key: {0}")]
    MissingThemeKey(String),
    #[error("no settings found for widget '{0}'")]
    MissingWidgetSpec(String),
    #[error("unknown widget type '{kind}' for widget '{name}'")]
    UnknownWidget { name: String, kind: String },
    #[error("invalid settings for widget '{name}': {source}")]
    InvalidSettings {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A widget that was built but cannot produce its layout slice.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("widget '{name}' cannot render: {reason}")]
    Render { name: String, reason: String },
}

impl WidgetError {
    pub fn render(name: &str, reason: impl Into<String>) -> Self {
        Self::Render {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
