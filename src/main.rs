mod bot;
mod clock;
mod config;
mod lookup;
mod platform;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Bot;
use crate::config::Config;
use crate::lookup::HttpLookups;
use crate::platform::mattermost::{self, MattermostClient};
use crate::scheduler::Heartbeat;

const EVENT_QUEUE_SIZE: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,jujubot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Server: {}", config.mattermost.server_url);
    info!("  Team: {}", config.mattermost.team_name);
    info!("  Default location: {}", config.weather.default_location);

    // Connect to Mattermost
    let mut client = MattermostClient::new(&config.mattermost.server_url, &config.mattermost.auth_token);
    let version = client.ping().await?;
    info!("Server detected and is running version {}", version);

    let identity = client.login().await?;
    info!("Logged in as {} ({})", identity.username, identity.id);

    let team = client.find_team(&config.mattermost.team_name).await?;
    info!("Found team {} ({})", team.name, team.id);
    match client
        .ensure_channel(&team, &config.mattermost.channel_log_name)
        .await
    {
        Ok(channel) => info!("Debug channel ready: {} ({})", channel.name, channel.id),
        Err(e) => warn!("Could not set up the debug channel: {:#}", e),
    }

    let readiness_file = config.general.readiness_file.clone();
    scheduler::tasks::write_marker(&readiness_file)
        .await
        .with_context(|| format!("Failed to write {}", readiness_file.display()))?;
    info!("Readiness file written to {}", readiness_file.display());

    // Background jobs
    let heartbeat = Heartbeat::start(&config.general).await?;

    // Websocket listener feeds the dispatcher
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    let listener = tokio::spawn(mattermost::listen(
        config.mattermost.server_ws_url.clone(),
        config.mattermost.auth_token.clone(),
        Duration::from_secs(config.general.reconnect_delay_secs),
        events_tx,
    ));

    let transport = Arc::new(client);
    let lookups = Arc::new(HttpLookups::new(&config.weather.api_key));
    let bot = Bot::new(identity, transport, lookups, &config.weather.default_location)?;

    info!("Bot is starting...");
    let result = bot::run(bot, events_rx).await;

    // Shutdown
    listener.abort();
    if let Err(e) = heartbeat.stop().await {
        error!("{:#}", e);
    }
    if let Err(e) = tokio::fs::remove_file(&readiness_file).await {
        warn!("Failed to remove {}: {:#}", readiness_file.display(), e);
    }
    info!("Bye");

    result
}
