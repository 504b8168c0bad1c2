//! Network devices with traffic graphs and the external IP address

use super::{settings, Widget, WidgetContext, HEADER_HEIGHT};
use crate::draw::DrawPrimitive;
use crate::error::{ConfigError, WidgetError};
use crate::http::HttpClient;
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::clean_spaces;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

const EXTERNALIP_URL: &str = "https://api.ipify.org/?format=json";
// Header and footer are 57px; each device row adds 49px
const BASE_HEIGHT: i64 = 57;
const ROW_HEIGHT: i64 = 49;
const ROW_SEPARATOR: &str = "${voffset 10}\n";

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSettings {
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub graph_device: Option<String>,
    #[serde(default = "default_upload_color")]
    pub upload_color: String,
    #[serde(default = "default_download_color")]
    pub download_color: String,
}

fn default_upload_color() -> String {
    "#d79921".to_string()
}

fn default_download_color() -> String {
    "#98971a".to_string()
}

pub struct NetworkWidget {
    ctx: WidgetContext,
    settings: NetworkSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(NetworkWidget { ctx, settings }))
}

impl NetworkWidget {
    fn graph_device(&self) -> Result<&str, WidgetError> {
        if let Some(device) = &self.settings.graph_device {
            return Ok(device);
        }
        self.settings
            .devices
            .first()
            .map(String::as_str)
            .ok_or_else(|| WidgetError::render(&self.ctx.name, "no network devices configured"))
    }
}

/// Keep only the address from an ipify response.
pub fn normalize_ip(response: &Value) -> Result<Value> {
    let ip = response
        .get("ip")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("ipify response has no ip field"))?;
    Ok(serde_json::json!({ "ip": ip }))
}

#[async_trait::async_trait]
impl Widget for NetworkWidget {
    fn context(&self) -> &WidgetContext {
        &self.ctx
    }

    fn height(&self) -> i64 {
        BASE_HEIGHT + self.settings.devices.len() as i64 * ROW_HEIGHT
    }

    fn conkyrc(&self, theme: &ConkyTheme) -> Result<String, WidgetError> {
        let device = self.graph_device()?;
        let rows: Vec<String> = self
            .settings
            .devices
            .iter()
            .map(|dev| {
                format!(
                    "${{goto 10}}{value}{dev}${{alignr 10}}${{addr {dev}}}\n\
                     ${{goto 10}}{label}Upload{value}${{alignr 10}}${{upspeed {dev}}}/s of ${{totalup {dev}}}\n\
                     ${{goto 10}}{label}Download{value}${{alignr 10}}${{downspeed {dev}}}/s of ${{totaldown {dev}}}",
                    value = theme.value,
                    label = theme.label,
                )
            })
            .collect();
        // Colors go through conky's own syntax, which has no alpha channel
        let up: String = self.settings.upload_color.chars().take(7).collect();
        let down: String = self.settings.download_color.chars().take(7).collect();
        Ok(clean_spaces(&format!(
            r"
            {update}\
            ${{voffset 22}}${{goto 100}}${{color {up}}}${{upspeedgraph {device} 12,90}}
            ${{voffset -2}}${{goto 100}}${{color {down}}}${{downspeedgraph {device} -11,90}}
            ${{voffset -30}}${{goto 10}}{header}Network
            ${{goto 10}}{subheader}{ip}
            ${{voffset 17}}{rows}
            ",
            update = self.ctx.update(),
            header = theme.header,
            subheader = theme.subheader,
            ip = self.ctx.get(60, "ip"),
            rows = rows.join(ROW_SEPARATOR),
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        self.graph_device()?;
        let mut entries = self.ctx.frame(self.height(), HEADER_HEIGHT, theme);
        entries.push(self.ctx.graph_strip(theme));
        Ok(entries)
    }

    fn has_update(&self) -> bool {
        true
    }

    async fn update_cache(&self) -> Result<Option<Value>> {
        info!("Updating {} cache", self.ctx.name);
        let client = HttpClient::new(self.ctx.update_timeout)?;
        let response = client.get_json(EXTERNALIP_URL).await?;
        normalize_ip(&response).map(Some)
    }
}
