use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::Deserialize;

const BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const FORECAST_DAYS: u32 = 5;

#[derive(Debug, Deserialize)]
struct Conditions {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct CurrentMain {
    temp: f64,
    feels_like: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct Wind {
    /// metres per second
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    name: String,
    weather: Vec<Conditions>,
    main: CurrentMain,
    wind: Wind,
}

#[derive(Debug, Deserialize)]
struct DayTemp {
    day: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    dt: i64,
    temp: DayTemp,
    humidity: i64,
    weather: Vec<Conditions>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastDay>,
}

pub async fn current(client: &reqwest::Client, api_key: &str, location: &str) -> Result<String> {
    let url = reqwest::Url::parse_with_params(
        &format!("{}/weather", BASE_URL),
        &[("q", location), ("units", "metric"), ("lang", "en"), ("appid", api_key)],
    )?;
    let response: CurrentResponse =
        super::get_json(client, url.as_str(), "openweathermap").await?;
    format_current(&response)
}

pub async fn forecast(client: &reqwest::Client, api_key: &str, location: &str) -> Result<String> {
    let days = FORECAST_DAYS.to_string();
    let url = reqwest::Url::parse_with_params(
        &format!("{}/forecast/daily", BASE_URL),
        &[
            ("q", location),
            ("units", "metric"),
            ("lang", "en"),
            ("cnt", days.as_str()),
            ("appid", api_key),
        ],
    )?;
    let response: ForecastResponse =
        super::get_json(client, url.as_str(), "openweathermap").await?;
    if response.list.is_empty() {
        anyhow::bail!("No forecast returned for {}", location);
    }

    let mut message = format!(
        "### Weather in {} for the next few days\n\n\
         | Day | Description | High | Low | Humidity | Day |\n\
         |:---------------------------|:------------------------------------|:--------|:--------|:--------|:--------|",
        location
    );
    for day in &response.list {
        let date = DateTime::from_timestamp(day.dt, 0)
            .context("Forecast timestamp out of range")?
            .with_timezone(&Local)
            .date_naive();
        message.push_str(&forecast_line(date, day)?);
    }
    Ok(message)
}

fn format_current(response: &CurrentResponse) -> Result<String> {
    let conditions = response
        .weather
        .first()
        .context("No conditions in weather response")?;

    Ok(format!(
        "### Current weather in {}\n\n\
         | Description | Temperature | Feels Like | Humidity | Wind |\n\
         |:---------------------------|:------------------------------------|:--------|:--------|:--------|\n\
         | {} | {:.0} °C | {:.0} °C | {}% | {:.1} km/h |",
        response.name,
        description_with_icon(conditions),
        response.main.temp,
        response.main.feels_like,
        response.main.humidity,
        response.wind.speed * 3.6,
    ))
}

fn forecast_line(date: NaiveDate, day: &ForecastDay) -> Result<String> {
    let conditions = day
        .weather
        .first()
        .context("No conditions in forecast day")?;

    Ok(format!(
        "\n| {} | {} | {:.0} °C | {:.0} °C | {}% | {:.0} °C |",
        date.format("%A, %B. %-d"),
        description_with_icon(conditions),
        day.temp.max,
        day.temp.min,
        day.humidity,
        day.temp.day,
    ))
}

fn description_with_icon(conditions: &Conditions) -> String {
    format!(
        "{0} ![{0}](http://openweathermap.org/img/w/{1}.png \"{0}\")",
        conditions.description, conditions.icon
    )
}
