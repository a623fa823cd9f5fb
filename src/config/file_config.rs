use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub server_url: Option<String>,
    pub ws_url: Option<String>,
    pub token_file: Option<String>,
    pub request_timeout_sec: Option<u64>,

    // Realtime settings
    pub reconnect_base_delay_ms: Option<u64>,
    pub reconnect_max_attempts: Option<u32>,
    pub ping_interval_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
