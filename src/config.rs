use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub mattermost: MattermostConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MattermostConfig {
    /// Bare host name; used to derive the URLs below when they are left empty.
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub server_ws_url: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default = "default_channel_log_name")]
    pub channel_log_name: String,
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_location")]
    pub default_location: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Marker file written once the bot is connected (readiness probe).
    #[serde(default = "default_readiness_file")]
    pub readiness_file: PathBuf,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_heartbeat_cron")]
    pub heartbeat_cron: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_location: default_location(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            readiness_file: default_readiness_file(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            heartbeat_cron: default_heartbeat_cron(),
        }
    }
}

fn default_channel_log_name() -> String {
    "debugging-for-jujubot".to_string()
}

fn default_location() -> String {
    "Montreal".to_string()
}

fn default_readiness_file() -> PathBuf {
    PathBuf::from("/tmp/ready")
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_heartbeat_cron() -> String {
    "0 0 * * * *".to_string()
}

impl Config {
    /// Load the TOML file at `path` (if it exists) and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            info!(
                "No configuration file at {}, using environment only",
                path.display()
            );
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.finalize()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup; non-empty values win over the file.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mm = &mut self.mattermost;
        if let Some(v) = get("HOSTNAME") {
            mm.hostname = v;
        }
        if let Some(v) = get("SERVER_URL") {
            mm.server_url = v;
        }
        if let Some(v) = get("SERVER_WS_URL") {
            mm.server_ws_url = v;
        }
        if let Some(v) = get("TEAM_NAME") {
            mm.team_name = v;
        }
        if let Some(v) = get("CHANNEL_LOG_NAME") {
            mm.channel_log_name = v;
        }
        if let Some(v) = get("BOT_AUTH_TOKEN") {
            mm.auth_token = v;
        }
        if let Some(v) = get("OPENWEATHER_API_KEY") {
            self.weather.api_key = v;
        }
    }

    /// Derive missing URLs from the host name and check required fields.
    fn finalize(&mut self) -> Result<()> {
        let mm = &mut self.mattermost;
        if mm.server_url.is_empty() && !mm.hostname.is_empty() {
            mm.server_url = format!("https://{}", mm.hostname);
        }
        if mm.server_ws_url.is_empty() && !mm.hostname.is_empty() {
            mm.server_ws_url = format!("wss://{}", mm.hostname);
        }
        mm.server_url = mm.server_url.trim_end_matches('/').to_string();
        mm.server_ws_url = mm.server_ws_url.trim_end_matches('/').to_string();

        if mm.server_url.is_empty() || mm.server_ws_url.is_empty() {
            anyhow::bail!("Missing server URL: set mattermost.hostname or mattermost.server_url");
        }
        if mm.auth_token.is_empty() {
            anyhow::bail!("Missing bot auth token (mattermost.auth_token or BOT_AUTH_TOKEN)");
        }
        if mm.team_name.is_empty() {
            anyhow::bail!("Missing team name (mattermost.team_name or TEAM_NAME)");
        }
        Ok(())
    }
}
