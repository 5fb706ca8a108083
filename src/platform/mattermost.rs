use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::platform::{InboundMessage, Transport, User};

#[derive(Debug, Clone, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
struct NewChannel<'a> {
    team_id: &'a str,
    name: &'a str,
    display_name: &'a str,
    purpose: &'a str,
    #[serde(rename = "type")]
    channel_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiPost {
    id: String,
    channel_id: String,
    user_id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    root_id: String,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    channel_id: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    root_id: &'a str,
}

#[derive(Debug, Serialize)]
struct NewReaction<'a> {
    user_id: &'a str,
    post_id: &'a str,
    emoji_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct WsEvent {
    #[serde(default)]
    event: String,
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

/// REST client for the Mattermost v4 API, authenticated as the bot user
pub struct MattermostClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    me: Option<User>,
}

impl MattermostClient {
    pub fn new(server_url: &str, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/api/v4", server_url.trim_end_matches('/')),
            token: token.to_string(),
            me: None,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Mattermost API error on {} ({}): {}", path, status, error_body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Mattermost API error on {} ({}): {}", path, status, error_body);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    /// Check that the server answers and return its version
    pub async fn ping(&self) -> Result<String> {
        let props: HashMap<String, serde_json::Value> = self
            .get_json("/config/client?format=old")
            .await
            .context("There was a problem pinging the Mattermost server")?;
        Ok(props
            .get("Version")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    pub async fn login(&mut self) -> Result<User> {
        let me: ApiUser = self
            .get_json("/users/me")
            .await
            .context("There was a problem getting the bot user")?;
        let user = User {
            id: me.id,
            username: me.username,
        };
        self.me = Some(user.clone());
        Ok(user)
    }

    pub async fn find_team(&self, team_name: &str) -> Result<Team> {
        self.get_json(&format!("/teams/name/{}", team_name))
            .await
            .with_context(|| format!("We do not appear to be a member of the team '{}'", team_name))
    }

    /// Find the named channel in the team, creating it when it does not exist yet
    pub async fn ensure_channel(&self, team: &Team, channel_name: &str) -> Result<Channel> {
        let path = format!("/teams/{}/channels/name/{}", team.id, channel_name);
        match self.get_json::<Channel>(&path).await {
            Ok(channel) => return Ok(channel),
            Err(e) => debug!("Channel lookup failed, creating it: {:#}", e),
        }

        let new_channel = NewChannel {
            team_id: &team.id,
            name: channel_name,
            display_name: "Debugging For Jujubot",
            purpose: "This is used as a test channel for logging bot debug messages",
            channel_type: "O",
        };
        let channel: Channel = self
            .post_json("/channels", &new_channel)
            .await
            .with_context(|| format!("Failed to create the channel {}", channel_name))?;
        info!("Created debugging channel {}", channel.name);
        Ok(channel)
    }
}

#[async_trait]
impl Transport for MattermostClient {
    async fn post(&self, channel_id: &str, text: &str, root_id: Option<&str>) -> Result<String> {
        let new_post = NewPost {
            channel_id,
            message: text,
            root_id: root_id.unwrap_or_default(),
        };
        let created: ApiPost = self
            .post_json("/posts", &new_post)
            .await
            .context("Failed to send message")?;
        Ok(created.id)
    }

    async fn react(&self, emoji_name: &str, post_id: &str) -> Result<()> {
        let me = self.me.as_ref().context("Not logged in")?;
        let reaction = NewReaction {
            user_id: &me.id,
            post_id,
            emoji_name,
        };
        let _: serde_json::Value = self
            .post_json("/reactions", &reaction)
            .await
            .context("Failed to add reaction")?;
        Ok(())
    }

    async fn resolve_user(&self, user_id: &str) -> Result<User> {
        let user: ApiUser = self
            .get_json(&format!("/users/{}", user_id))
            .await
            .with_context(|| format!("Failed to get user {}", user_id))?;
        Ok(User {
            id: user.id,
            username: user.username,
        })
    }
}

/// Keep a websocket session open, reconnecting after `reconnect_delay` whenever it drops.
/// Returns once the receiving side of `events` has gone away.
pub async fn listen(
    ws_url: String,
    token: String,
    reconnect_delay: Duration,
    events: mpsc::Sender<InboundMessage>,
) {
    loop {
        match run_socket_session(&ws_url, &token, &events).await {
            Ok(()) => info!("Websocket session ended"),
            Err(e) => error!("Failed to listen to the web socket: {:#}", e),
        }

        if events.is_closed() {
            info!("Dispatcher is gone, websocket listener stopping");
            return;
        }

        info!("Reconnecting to the web socket in {:?}", reconnect_delay);
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn run_socket_session(
    ws_url: &str,
    token: &str,
    events: &mpsc::Sender<InboundMessage>,
) -> Result<()> {
    let mut request = format!("{}/api/v4/websocket", ws_url)
        .into_client_request()
        .context("Invalid websocket URL")?;
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).context("Invalid auth token")?,
    );

    let (mut stream, _response) = connect_async(request)
        .await
        .context("Failed to connect to the web socket")?;
    info!("Connected to the web socket");

    while let Some(message) = stream.next().await {
        let message = message.context("Failed reading websocket message")?;
        let text = match message {
            WsMessage::Text(text) => text.to_string(),
            WsMessage::Binary(bytes) => {
                String::from_utf8(bytes.to_vec()).context("Invalid utf-8 websocket payload")?
            }
            WsMessage::Close(_) => return Ok(()),
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
        };

        match parse_event(&text) {
            Ok(Some(inbound)) => {
                if events.send(inbound).await.is_err() {
                    return Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping malformed websocket event: {:#}", e),
        }
    }

    Ok(())
}

/// Decode a websocket frame; only `posted` events carry a message
fn parse_event(text: &str) -> Result<Option<InboundMessage>> {
    let event: WsEvent = serde_json::from_str(text).context("Failed to parse websocket event")?;
    if event.event != "posted" {
        return Ok(None);
    }

    let raw_post = event
        .data
        .get("post")
        .and_then(|v| v.as_str())
        .context("Posted event without a post")?;
    let post: ApiPost = serde_json::from_str(raw_post).context("Failed to parse posted message")?;

    Ok(Some(InboundMessage {
        id: post.id,
        channel_id: post.channel_id,
        user_id: post.user_id,
        text: post.message,
        root_id: Some(post.root_id).filter(|r| !r.is_empty()),
    }))
}
