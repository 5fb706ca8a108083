pub mod currency;
pub mod japanese;
pub mod opendota;
pub mod urban;
pub mod weather;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

pub use japanese::Script;
pub use opendota::PlayerRank;
pub use urban::Definition;

/// The data providers behind the utility commands.
/// Every network-backed lookup is independently fallible.
#[async_trait]
pub trait Lookups: Send + Sync {
    /// `amount` of `from` expressed in `to`
    async fn convert(&self, from: &str, to: &str, amount: f64) -> Result<f64>;

    /// Markdown table of the current conditions
    async fn current_weather(&self, location: &str) -> Result<String>;

    /// Markdown table of the next few days
    async fn forecast_weather(&self, location: &str) -> Result<String>;

    async fn define(&self, term: &str) -> Result<Definition>;

    fn transliterate(&self, word: &str, script: Script) -> String;

    /// Markdown word of the day; stable for a given day
    async fn word_of_the_day(&self, today: NaiveDate) -> Result<String>;

    async fn player(&self, account_id: u64) -> Result<PlayerRank>;
}

/// Lookups backed by public HTTP APIs
pub struct HttpLookups {
    client: reqwest::Client,
    weather_api_key: String,
}

impl HttpLookups {
    pub fn new(weather_api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            weather_api_key: weather_api_key.to_string(),
        }
    }
}

/// GET `url` and decode the JSON body, failing on non-2xx statuses
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    service: &str,
) -> Result<T> {
    debug!("Sending request to {}: {}", service, url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {}", service))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} API error ({}): {}", service, status, error_body);
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", service))
}

#[async_trait]
impl Lookups for HttpLookups {
    async fn convert(&self, from: &str, to: &str, amount: f64) -> Result<f64> {
        currency::convert(&self.client, from, to, amount).await
    }

    async fn current_weather(&self, location: &str) -> Result<String> {
        weather::current(&self.client, &self.weather_api_key, location).await
    }

    async fn forecast_weather(&self, location: &str) -> Result<String> {
        weather::forecast(&self.client, &self.weather_api_key, location).await
    }

    async fn define(&self, term: &str) -> Result<Definition> {
        urban::define(&self.client, term).await
    }

    fn transliterate(&self, word: &str, script: Script) -> String {
        japanese::transliterate(word, script)
    }

    async fn word_of_the_day(&self, today: NaiveDate) -> Result<String> {
        japanese::word_of_the_day(&self.client, today).await
    }

    async fn player(&self, account_id: u64) -> Result<PlayerRank> {
        opendota::player(&self.client, account_id).await
    }
}
