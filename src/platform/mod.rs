pub mod mattermost;

use anyhow::Result;
use async_trait::async_trait;

/// A message posted on the server, as seen by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Post ID
    pub id: String,
    pub channel_id: String,
    /// Author's user ID
    pub user_id: String,
    /// The message text
    pub text: String,
    /// Thread root of the post, if it was posted inside a thread
    pub root_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// Outbound side of a chat platform
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create a post in `channel_id`, threaded under `root_id` when given.
    /// Returns the new post's ID.
    async fn post(&self, channel_id: &str, text: &str, root_id: Option<&str>) -> Result<String>;

    /// Attach an emoji reaction to a post
    async fn react(&self, emoji_name: &str, post_id: &str) -> Result<()>;

    async fn resolve_user(&self, user_id: &str) -> Result<User>;
}
