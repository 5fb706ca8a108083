use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;

const BASE_URL: &str = "https://api.frankfurter.app/latest";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

pub async fn convert(client: &reqwest::Client, from: &str, to: &str, amount: f64) -> Result<f64> {
    let from = from.to_uppercase();
    let to = to.to_uppercase();
    let amount = format!("{:.2}", amount);
    let url = reqwest::Url::parse_with_params(
        BASE_URL,
        &[("from", from.as_str()), ("to", to.as_str()), ("amount", amount.as_str())],
    )?;

    let response: RatesResponse = super::get_json(client, url.as_str(), "frankfurter").await?;
    converted_amount(&response, &to)
}

fn converted_amount(response: &RatesResponse, to: &str) -> Result<f64> {
    response
        .rates
        .get(to)
        .copied()
        .with_context(|| format!("No rate returned for {}", to))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converted_amount_picks_target_rate() {
        let response: RatesResponse = serde_json::from_str(
            r#"{"amount":10.0,"base":"CAD","date":"2024-04-19","rates":{"USD":7.2713}}"#,
        )
        .unwrap();
        assert_eq!(converted_amount(&response, "USD").unwrap(), 7.2713);
    }

    #[test]
    fn test_missing_rate_is_an_error() {
        let response: RatesResponse =
            serde_json::from_str(r#"{"amount":1.0,"base":"CAD","rates":{}}"#).unwrap();
        assert!(converted_amount(&response, "XYZ").is_err());
    }
}
