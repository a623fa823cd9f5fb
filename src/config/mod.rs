mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::realtime::{ChannelConfig, ReconnectPolicy};

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub server_url: Option<String>,
    pub ws_url: Option<String>,
    pub token_file: Option<PathBuf>,
    pub request_timeout_sec: u64,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_attempts: u32,
    pub ping_interval_sec: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            ws_url: None,
            token_file: None,
            request_timeout_sec: 10,
            reconnect_base_delay_ms: 1000,
            reconnect_max_attempts: 5,
            ping_interval_sec: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_url: String,
    pub ws_url: String,
    pub token_file: Option<PathBuf>,
    pub request_timeout_sec: u64,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_attempts: u32,
    pub ping_interval_sec: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let server_url = file
            .server_url
            .or_else(|| cli.server_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("server_url must be specified on the CLI or in the config file")
            })?;

        let ws_url = match file.ws_url.or_else(|| cli.ws_url.clone()) {
            Some(url) => url,
            None => derive_ws_url(&server_url)?,
        };

        let token_file = file
            .token_file
            .map(PathBuf::from)
            .or_else(|| cli.token_file.clone());

        Ok(Self {
            server_url,
            ws_url,
            token_file,
            request_timeout_sec: file.request_timeout_sec.unwrap_or(cli.request_timeout_sec),
            reconnect_base_delay_ms: file
                .reconnect_base_delay_ms
                .unwrap_or(cli.reconnect_base_delay_ms),
            reconnect_max_attempts: file
                .reconnect_max_attempts
                .unwrap_or(cli.reconnect_max_attempts),
            ping_interval_sec: file.ping_interval_sec.unwrap_or(cli.ping_interval_sec),
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_attempts: self.reconnect_max_attempts,
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            ws_url: self.ws_url.clone(),
            policy: self.reconnect_policy(),
            ping_interval: Duration::from_secs(self.ping_interval_sec),
        }
    }
}

/// Derive the WebSocket endpoint from the server URL: the scheme maps
/// http -> ws and https -> wss, the path is the notification feed.
fn derive_ws_url(server_url: &str) -> Result<String> {
    let trimmed = server_url.trim_end_matches('/');
    if let Some(rest) = trimmed.strip_prefix("https://") {
        Ok(format!("wss://{}/ws/notifications/", rest))
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        Ok(format!("ws://{}/ws/notifications/", rest))
    } else {
        bail!("server_url must start with http:// or https://, got: {server_url}")
    }
}
