use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use wana_kana::ConvertJapanese;

const JISHO_URL: &str = "https://jisho.org/api/v1/search/words";
/// Pages of `#common` results the word of the day is drawn from
const COMMON_PAGES: u32 = 29;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Kana to latin letters
    Romaji,
    /// Romaji to hiragana
    Hiragana,
    /// Romaji to katakana
    Katakana,
}

pub fn transliterate(word: &str, script: Script) -> String {
    match script {
        Script::Romaji => word.to_romaji(),
        Script::Hiragana => word.to_hiragana(),
        Script::Katakana => word.to_katakana(),
    }
}

#[derive(Debug, Deserialize)]
struct JishoResponse {
    #[serde(default)]
    data: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    japanese: Vec<Reading>,
    #[serde(default)]
    senses: Vec<Sense>,
}

#[derive(Debug, Deserialize)]
struct Reading {
    word: Option<String>,
    reading: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Sense {
    #[serde(default)]
    english_definitions: Vec<String>,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    text: String,
    url: String,
}

/// Pick a common word from jisho.org. The choice only depends on `today`.
pub async fn word_of_the_day(client: &reqwest::Client, today: NaiveDate) -> Result<String> {
    let mut rng = StdRng::seed_from_u64(u64::from(today.ordinal()));
    let page = rng.gen_range(1..=COMMON_PAGES).to_string();
    let url = reqwest::Url::parse_with_params(
        JISHO_URL,
        &[("keyword", "#common"), ("page", page.as_str())],
    )?;

    let response: JishoResponse = super::get_json(client, url.as_str(), "jisho").await?;
    if response.data.is_empty() {
        anyhow::bail!("No words on jisho page {}", page);
    }
    let entry = &response.data[rng.gen_range(0..response.data.len())];
    format_word(today, entry)
}

fn format_word(today: NaiveDate, entry: &Entry) -> Result<String> {
    let reading = entry.japanese.first().context("Entry has no japanese form")?;
    let kana = reading.reading.clone().unwrap_or_default();
    // Kana-only words have no separate written form
    let word = reading.word.clone().unwrap_or_else(|| kana.clone());

    let mut message = format!(
        "\n#### Japanese word of the day for {}\n\n# **{}**\n*{}*\nMeanings:",
        today.format("%A, %B %-d, %Y"),
        word,
        kana
    );

    for sense in &entry.senses {
        message.push_str("\n- ");
        for definition in &sense.english_definitions {
            message.push_str(definition);
            message.push_str(", ");
        }
        for link in &sense.links {
            message.push_str(&format!("\n  - [{}]({})", link.text, link.url));
        }
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transliterate_directions() {
        assert_eq!(transliterate("すし", Script::Romaji), "sushi");
        assert_eq!(transliterate("sushi", Script::Hiragana), "すし");
        assert_eq!(transliterate("sushi", Script::Katakana), "スシ");
    }

    #[test]
    fn test_format_word() {
        let entry: Entry = serde_json::from_str(
            r#"{
                "japanese": [{"word": "猫", "reading": "ねこ"}],
                "senses": [
                    {"english_definitions": ["cat"], "links": []},
                    {"english_definitions": ["shamisen", "geisha"],
                     "links": [{"text": "Wikipedia", "url": "https://en.wikipedia.org/wiki/Cat"}]}
                ]
            }"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2006, 1, 2).unwrap();

        let message = format_word(today, &entry).unwrap();
        assert_eq!(
            message,
            "\n#### Japanese word of the day for Monday, January 2, 2006\n\n# **猫**\n*ねこ*\nMeanings:\
             \n- cat, \
             \n- shamisen, geisha, \n  - [Wikipedia](https://en.wikipedia.org/wiki/Cat)"
        );
    }

    #[test]
    fn test_kana_only_word_uses_reading() {
        let entry: Entry = serde_json::from_str(
            r#"{"japanese": [{"reading": "よろしく"}], "senses": []}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let message = format_word(today, &entry).unwrap();
        assert!(message.contains("# **よろしく**\n*よろしく*"));
    }
}
