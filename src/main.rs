use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notify_client::config::{AppConfig, CliConfig, FileConfig};
use notify_client::{
    ApiClient, FileTokenProvider, Notification, NotificationStore, RealtimeChannel,
    StaticTokenProvider, TokenProvider,
};

#[derive(Parser, Debug)]
#[clap(about = "Watch the notification feed from a terminal")]
struct CliArgs {
    /// Base URL of the notification backend (e.g. http://localhost:8000).
    pub server_url: Option<String>,

    /// WebSocket endpoint override; derived from the server URL when omitted.
    #[clap(long)]
    pub ws_url: Option<String>,

    /// Bearer token value; overrides --token-file.
    #[clap(long)]
    pub token: Option<String>,

    /// Path to the persisted session file holding the bearer token.
    #[clap(long, default_value = ".session-token")]
    pub token_file: PathBuf,

    /// Path to a TOML config file. File values override CLI values.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Timeout in seconds for REST requests.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_sec: u64,

    /// Base reconnect delay in milliseconds; grows linearly per attempt.
    #[clap(long, default_value_t = 1000)]
    pub reconnect_base_delay_ms: u64,

    /// Consecutive failed connection attempts before giving up.
    #[clap(long, default_value_t = 5)]
    pub reconnect_max_attempts: u32,

    /// Keepalive ping interval in seconds.
    #[clap(long, default_value_t = 30)]
    pub ping_interval_sec: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "notify-watch {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };

    let cli_config = CliConfig {
        server_url: cli_args.server_url.clone(),
        ws_url: cli_args.ws_url.clone(),
        token_file: Some(cli_args.token_file.clone()),
        request_timeout_sec: cli_args.request_timeout_sec,
        reconnect_base_delay_ms: cli_args.reconnect_base_delay_ms,
        reconnect_max_attempts: cli_args.reconnect_max_attempts,
        ping_interval_sec: cli_args.ping_interval_sec,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    let tokens: Arc<dyn TokenProvider> = match cli_args.token {
        Some(token) => Arc::new(StaticTokenProvider::new(token)),
        None => {
            let path = config
                .token_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(".session-token"));
            Arc::new(FileTokenProvider::new(path))
        }
    };

    let api = ApiClient::new(
        config.server_url.clone(),
        config.request_timeout_sec,
        Arc::clone(&tokens),
    )?;
    let channel = RealtimeChannel::new(config.channel_config(), Arc::clone(&tokens));
    let store = Arc::new(NotificationStore::new(Arc::new(api), channel));

    let count = store
        .load()
        .await
        .with_context(|| format!("Failed to load notifications from {}", config.server_url))?;
    info!("loaded {} notifications ({} unread)", count, store.unread_count());

    if let Err(err) = store.load_preferences().await {
        warn!("could not load notification preferences: {err}");
    }

    for notification in store.notifications() {
        print_notification(&notification);
    }

    let store_for_pushes = Arc::clone(&store);
    store.start_with_observer(move |notification| {
        print_notification(notification);
        info!("{} unread", store_for_pushes.unread_count());
    });

    info!("watching {} (Ctrl-C to exit)", config.ws_url);
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for the shutdown signal")?;

    info!("shutting down");
    store.shutdown().await;
    Ok(())
}

fn print_notification(notification: &Notification) {
    let marker = if notification.read { ' ' } else { '*' };
    println!(
        "{} {}  [{}] {} - {}",
        marker,
        format_timestamp(notification.created_at),
        notification.category.as_str(),
        notification.title,
        notification.message,
    );
}

fn format_timestamp(unix_secs: i64) -> String {
    match Local.timestamp_opt(unix_secs, 0).single() {
        Some(timestamp) => timestamp.format("%Y-%m-%d %H:%M").to_string(),
        None => unix_secs.to_string(),
    }
}
