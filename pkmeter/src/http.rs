//! HTTP fetches for widgets backed by web APIs
//!
//! Every request carries a User-Agent and a client-level timeout so an
//! unreachable endpoint cannot stall an update invocation.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("pkmeter/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        if !response.status().is_success() {
            return Err(anyhow!("Request to {} failed: {}", url, response.status()));
        }

        response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {url}"))
    }

    /// Download `url` into `dest`, replacing it atomically.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest.display());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Download of {url} failed"))?;

        if !response.status().is_success() {
            return Err(anyhow!("Download failed: {}", response.status()));
        }

        let bytes = response.bytes().await.context("Failed to read download body")?;
        crate::cache::write_atomic(dest, &bytes)
    }
}
