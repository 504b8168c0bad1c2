//! Currently playing track from any MPRIS player, via playerctl
//!
//! When nothing is playing (or playerctl is unavailable) the cache is
//! replaced with an idle placeholder whose application line carries a
//! short quip. The quip is kept stable across idle refreshes.

use super::{settings, Widget, WidgetContext, HEADER_HEIGHT};
use crate::cache;
use crate::draw::{pt, BarGraph, DrawPrimitive, Image};
use crate::error::{ConfigError, WidgetError};
use crate::execution::CommandExecutor;
use crate::http::HttpClient;
use crate::theme::{ConkyTheme, LuaTheme};
use crate::utils::{clean_spaces, format_duration, percent};
use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{debug, info, warn};

const HEIGHT: i64 = 111;
const PLAYERCTL: &str = "playerctl";
const FIELD_SEP: char = '\t';
const METADATA_FORMAT: &str =
    "{{status}}\t{{playerName}}\t{{title}}\t{{artist}}\t{{mpris:length}}\t{{position}}\t{{mpris:artUrl}}";

const QUIPS: &[&str] = &[
    "All is calm",
    "Enjoying the peace and quiet",
    "I can hear my thoughts",
    "It's quiet in here",
    "No beats detected",
    "No jams right now",
    "No music, no problem",
    "Nothing playing right now",
    "Quiet as a mouse",
    "Silence is golden",
    "The band is on a break",
    "The dance floor is empty",
    "The DJ is taking a nap",
    "The jukebox is silent",
    "The music has left the building",
    "The orchestra is tuning up",
    "The playlist is taking five",
    "The sound of silence",
    "The speakers are resting",
    "The stage is empty",
];

#[derive(Debug, Clone, Deserialize)]
pub struct NowPlayingSettings {
    /// Art shown while idle
    #[serde(default = "default_idle_art")]
    pub idle_art: String,
}

fn default_idle_art() -> String {
    "{ROOT}/img/nowplaying.jpg".to_string()
}

pub struct NowPlayingWidget {
    ctx: WidgetContext,
    settings: NowPlayingSettings,
}

pub fn build(ctx: WidgetContext, spec: &Value) -> Result<Box<dyn Widget>, ConfigError> {
    let settings = settings(&ctx.name, spec)?;
    Ok(Box::new(NowPlayingWidget { ctx, settings }))
}

/// One player's state as reported by `playerctl metadata --format`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub status: String,
    pub application: String,
    pub title: String,
    pub artist: String,
    /// Microseconds
    pub length: u64,
    /// Microseconds
    pub position: u64,
    pub arturl: String,
}

impl Track {
    pub fn is_playing(&self) -> bool {
        self.status == "Playing" && !self.title.is_empty()
    }

    pub fn to_cache(&self) -> Value {
        let length = self.length / 1_000_000;
        let position = self.position / 1_000_000;
        json!({
            "application": self.application,
            "status": self.status,
            "title": self.title,
            "artist": if self.artist.is_empty() { "Unknown Artist" } else { self.artist.as_str() },
            "arturl": self.arturl,
            "length": format_duration(length),
            "position": format_duration(position),
            "percent": percent(position as f64, length as f64, 2, 100.0, 0.0),
        })
    }
}

/// Parse one line per player; malformed lines are skipped.
pub fn parse_players(stdout: &str) -> Vec<Track> {
    stdout
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split(FIELD_SEP).collect();
            let [status, application, title, artist, length, position, arturl] = fields.as_slice() else {
                return None;
            };
            Some(Track {
                status: status.trim().to_string(),
                application: application.trim().to_string(),
                title: title.trim().to_string(),
                artist: artist.trim().to_string(),
                length: length.trim().parse().unwrap_or(0),
                position: position.trim().parse().unwrap_or(0),
                arturl: arturl.trim().to_string(),
            })
        })
        .collect()
}

/// Placeholder shown when nothing plays. Reuses the previous quip when the
/// cached document already carries one.
pub fn idle_data(previous: Option<&Value>) -> Value {
    let previous_quip = previous
        .and_then(|data| data.get("application"))
        .and_then(Value::as_str)
        .filter(|quip| QUIPS.contains(quip));
    let quip = match previous_quip {
        Some(quip) => quip,
        None => QUIPS.choose(&mut rand::thread_rng()).copied().unwrap_or("Silence is golden"),
    };
    json!({
        "application": quip,
        "status": "",
        "title": "Current Track",
        "artist": "Artist",
        "arturl": "",
        "length": "0:00",
        "position": "0:00",
        "percent": 0,
    })
}

impl NowPlayingWidget {
    fn art_path(&self) -> PathBuf {
        self.ctx.asset_dir().join("nowplaying.jpg")
    }

    async fn fetch_playing(&self) -> Result<Option<Track>> {
        let stdout = CommandExecutor::output(
            PLAYERCTL,
            &["--all-players", "metadata", "--format", METADATA_FORMAT],
            self.ctx.update_timeout,
        )
        .await?;
        Ok(parse_players(&stdout).into_iter().find(Track::is_playing))
    }

    async fn store_art(&self, url: &str) -> Result<()> {
        let dest = self.art_path();
        if let Some(local) = url.strip_prefix("file://") {
            let bytes = std::fs::read(local).with_context(|| format!("Failed to read album art {local}"))?;
            return cache::write_atomic(&dest, &bytes);
        }
        HttpClient::new(self.ctx.update_timeout)?.download(url, &dest).await
    }

    fn store_idle_art(&self) -> Result<()> {
        let source = self.ctx.paths.expand(&self.settings.idle_art);
        let bytes = std::fs::read(&source).with_context(|| format!("Failed to read {}", source.display()))?;
        cache::write_atomic(&self.art_path(), &bytes)
    }
}

#[async_trait::async_trait]
impl Widget for NowPlayingWidget {
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
            ${{voffset 20}}${{goto 10}}{header}Now Playing
            ${{goto 10}}{subheader}{application}
            ${{voffset 22}}${{goto 10}}{value}{title}
            ${{goto 10}}{label}{artist}
            ${{goto 10}}{label}{position} of {length}
            ",
            update = ctx.update(),
            header = theme.header,
            subheader = theme.subheader,
            value = theme.value,
            label = theme.label,
            application = ctx.get(2, "application"),
            title = format!("${{{} | cut -c 1-23}}", ctx.query(2, "", "title")),
            artist = format!("${{{} | cut -c 1-23}}", ctx.query(2, "", "artist")),
            position = ctx.get(2, "position"),
            length = ctx.get(5, "length"),
        )))
    }

    fn draw_entries(&self, theme: &LuaTheme) -> Result<Vec<DrawPrimitive>, WidgetError> {
        let origin = self.ctx.origin;
        let mut entries = self.ctx.frame(HEIGHT, HEADER_HEIGHT, theme);
        entries.push(DrawPrimitive::BarGraph(BarGraph {
            conky_value: self.ctx.query(2, "", "percent"),
            from: pt(10, origin + 50),
            to: pt(130, origin + 50),
            bar_color: theme.accent1.clone(),
            bar_thickness: 2,
            background_color: Some(theme.graph_bg.clone()),
            critical_threshold: Some(105.0),
            ..Default::default()
        }));
        entries.push(DrawPrimitive::Image(Image {
            from: pt(140, origin + 48),
            filepath: self.art_path().display().to_string(),
            width: Some(50),
            height: None,
        }));
        Ok(entries)
    }

    fn has_update(&self) -> bool {
        true
    }

    async fn update_cache(&self) -> Result<Option<Value>> {
        debug!("Updating {} cache", self.ctx.name);
        match self.fetch_playing().await {
            Ok(Some(track)) => {
                if !track.arturl.is_empty() {
                    if let Err(e) = self.store_art(&track.arturl).await {
                        warn!("Cannot fetch album art: {:#}", e);
                    }
                }
                return Ok(Some(track.to_cache()));
            }
            Ok(None) => info!("No player is playing"),
            Err(e) => warn!("Error fetching player info: {:#}", e),
        }

        if let Err(e) = self.store_idle_art() {
            warn!("Cannot restore idle art: {:#}", e);
        }
        let previous = cache::load(&self.ctx.cache_path()).unwrap_or_default();
        Ok(Some(idle_data(previous.as_ref())))
    }
}
