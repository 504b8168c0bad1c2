//! Layout composition: stacks the configured widgets into the two artifacts
//!
//! - The conkyrc: a `conky.config` header built from the `conky` settings
//!   block followed by `conky.text`, the concatenated widget fragments
//! - The draw config: `elements = { ... }`, every widget's encoded primitives
//!
//! Widgets are placed top to bottom; each starts where the previous one's
//! height ends. The whole stack is recomputed on every invocation.

use crate::cache;
use crate::config::{Config, Paths};
use crate::draw::{self, DrawPrimitive};
use crate::error::ConfigError;
use crate::theme::Theme;
use crate::utils::clean_spaces;
use crate::widgets::WidgetRegistry;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where one widget landed in the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub name: String,
    pub origin: i64,
    pub height: i64,
    /// False when the widget failed to render and only its space is reserved
    pub rendered: bool,
}

/// Result of one composition pass.
#[derive(Debug, Clone)]
pub struct Layout {
    pub config_block: String,
    pub text: String,
    pub entries: Vec<DrawPrimitive>,
    pub placements: Vec<Placement>,
}

impl Layout {
    /// Complete conkyrc document.
    pub fn conkyrc(&self) -> String {
        format!("{}{}", self.config_block, self.text)
    }

    /// Complete draw configuration document.
    pub fn lua(&self) -> String {
        render_elements(&self.entries)
    }
}

/// Render the `conky.config = { ... }` block.
pub fn conky_config_block(config: &Config, paths: &Paths) -> String {
    let root = paths.root.to_string_lossy();
    let mut block = String::from("conky.config = {\n");
    if let Some(settings) = config.conky() {
        for (key, value) in settings {
            let rendered = match value {
                Value::String(text) => {
                    let text = text.replace("{ROOT}", &root);
                    let text = if key.contains("color") { text.trim_start_matches('#').to_string() } else { text };
                    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
                }
                Value::Bool(flag) => flag.to_string(),
                Value::Null => "nil".to_string(),
                other => other.to_string(),
            };
            block.push_str(&format!("  {key}={rendered},\n"));
        }
    }
    block.push_str("}\n\n");
    block
}

/// Render the encoded primitive list.
pub fn render_elements(entries: &[DrawPrimitive]) -> String {
    let items: Vec<String> = entries.iter().map(|entry| format!("  {}", draw::encode(entry))).collect();
    format!("elements = {{\n{}\n}}\n", items.join(",\n"))
}

/// Stack every configured widget. A widget that cannot be built is a
/// configuration error; one that builds but fails to render keeps its
/// height reserved with a blank spacer so the widgets below stay aligned.
pub fn compose(
    config: &Config,
    theme: &Theme,
    registry: &WidgetRegistry,
    paths: &Paths,
) -> Result<Layout, ConfigError> {
    let separator = if config.debug() {
        format!("{}{}", theme.conky.reset, theme.conky.debug)
    } else {
        theme.conky.reset.clone()
    };

    let mut origin = 0;
    let mut text = String::from("conky.text = [[\n");
    let mut entries = Vec::new();
    let mut placements = Vec::new();

    for name in config.widget_names()? {
        let widget = registry.build(&name, config, origin, paths)?;
        let height = widget.height();
        let rendered = widget
            .conkyrc(&theme.conky)
            .and_then(|fragment| Ok((fragment, widget.draw_entries(&theme.lua)?)));

        let ok = rendered.is_ok();
        let fragment = match rendered {
            Ok((fragment, widget_entries)) => {
                debug!("Placed {} at {} ({} px, {} primitives)", name, origin, height, widget_entries.len());
                entries.extend(widget_entries);
                clean_spaces(&fragment)
            }
            Err(e) => {
                warn!("Skipping {}: {}; reserving {} px", name, e, height);
                format!("${{voffset {height}}}")
            }
        };
        text.push_str(&format!("{fragment}\n{separator}\\\n\\\n"));
        placements.push(Placement {
            name,
            origin,
            height,
            rendered: ok,
        });
        origin += height;
    }
    text.push_str("]]\n");

    info!("Composed {} widgets, {} px tall", placements.len(), origin);
    Ok(Layout {
        config_block: conky_config_block(config, paths),
        text,
        entries,
        placements,
    })
}

/// Write both artifacts, each replaced atomically.
pub fn write_artifacts(layout: &Layout, conkyrc: &Path, lua: &Path) -> anyhow::Result<()> {
    info!("Saving {}", conkyrc.display());
    cache::write_atomic(conkyrc, layout.conkyrc().as_bytes())?;
    info!("Saving {}", lua.display());
    cache::write_atomic(lua, layout.lua().as_bytes())?;
    Ok(())
}
