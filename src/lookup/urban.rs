use anyhow::{Context, Result};
use serde::Deserialize;

const BASE_URL: &str = "https://api.urbandictionary.com/v0/define";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Definition {
    pub definition: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub thumbs_up: i64,
    #[serde(default)]
    pub thumbs_down: i64,
}

#[derive(Debug, Deserialize)]
struct DefineResponse {
    #[serde(default)]
    list: Vec<Definition>,
}

pub async fn define(client: &reqwest::Client, term: &str) -> Result<Definition> {
    let url = reqwest::Url::parse_with_params(BASE_URL, &[("term", term)])?;
    let response: DefineResponse =
        super::get_json(client, url.as_str(), "urbandictionary").await?;
    top_definition(response)
}

fn top_definition(response: DefineResponse) -> Result<Definition> {
    response
        .list
        .into_iter()
        .next()
        .context("No results found")
}
