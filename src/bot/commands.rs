use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::charge::{charge_level_message, charge_up};
use super::roll::{parse_sides, roll_dice};
use super::rules::{Captured, Gate, Rule, RuleTable};
use super::{Bot, Effect, Thread};
use crate::clock::is_holiday;
use crate::lookup::{Definition, PlayerRank, Script};
use crate::platform::InboundMessage;

/// Reply to anything addressed to the bot that no command understands
pub const FALLBACK: &str = "Kes tu. Veux????";

const DEFAULT_URBAN_TERM: &str = "huel";
const HOUSE_PLAYER_ID: u64 = 12088460;
const CARRY_PLAYER_ID: u64 = 53515020;
const CARRY_RANK: i64 = 9000;
const MAX_PLAYER_ID_DIGITS: usize = 10;
const AMAZING_RANK: i64 = 4500;

/// Commands understood after `@<bot> `
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Insult,
    Thanks,
    Question,
    Love,
    ChargeUp,
    ChargeLevel,
    Convert,
    Weather,
    Urban,
    Romaji,
    Hiragana,
    Katakana,
    WordOfTheDay,
    Mmr,
    Roll,
}

/// Named commands in priority order. The first four keep their loose anchoring,
/// so `^thanks|merci|ty|thx$` also fires on any command containing "ty".
pub fn command_table() -> Result<RuleTable<Command>> {
    Ok(RuleTable::new(vec![
        Rule::new(
            "insult",
            r"^stfu|fuck you|fuck off|ta yeule|tayeule|shut up|shut the fuck up$",
            Command::Insult,
        )?,
        Rule::new("thanks", r"^thanks|merci|ty|thx$", Command::Thanks)?,
        Rule::new("question", r"^est-ce qu.*$", Command::Question)?,
        Rule::new("love", r"^I love you$", Command::Love)?,
        Rule::new("charge-up", r"^charge up$", Command::ChargeUp)?.gated(Gate::Holiday),
        Rule::new("charge-level", r"^charge level$", Command::ChargeLevel)?
            .gated(Gate::Holiday),
        Rule::new(
            "convert",
            r"^convert( ([0-9]+)? ?([0-9A-Za-z_]{3}) (?:to )?([0-9A-Za-z_]{3}))?$",
            Command::Convert,
        )?,
        Rule::new("weather", r"^weather ?((now) (.*)|(.*))$", Command::Weather)?,
        Rule::new("urban", r"^urban(?: (.*))?$", Command::Urban)?,
        Rule::new("romaji", r"^romaji(?: (.*))?$", Command::Romaji)?,
        Rule::new("hiragana", r"^hiragana(?: (.*))?$", Command::Hiragana)?,
        Rule::new("katakana", r"^katakana(?: (.*))?$", Command::Katakana)?,
        Rule::new("wotd", r"^wotd japanese.*$", Command::WordOfTheDay)?,
        Rule::new("mmr", r"^mmr(?: ([0-9]+))?$", Command::Mmr)?,
        Rule::new("roll", r"^roll(?: ([0-9]+|:weed:))?[\t\n\f\r ]*$", Command::Roll)?,
    ]))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

impl Default for Conversion {
    fn default() -> Self {
        Self {
            amount: 1.0,
            from: "CAD".to_string(),
            to: "USD".to_string(),
        }
    }
}

/// `convert [<amount> <FROM> [to] <TO>]`; the error is the reply text
pub fn parse_conversion(captured: &Captured) -> Result<Conversion, String> {
    if captured.group(1).is_empty() {
        return Ok(Conversion::default());
    }

    let raw_amount = captured.group(2);
    let amount = raw_amount
        .parse::<f64>()
        .map_err(|_| format!("Couldn't convert {} to an integer.", raw_amount))?;
    Ok(Conversion {
        amount,
        from: captured.group(3).to_uppercase(),
        to: captured.group(4).to_uppercase(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherRequest {
    Current(String),
    Forecast(String),
}

impl WeatherRequest {
    pub fn location(&self) -> &str {
        match self {
            WeatherRequest::Current(location) | WeatherRequest::Forecast(location) => location,
        }
    }
}

/// `weather [now] [<location>]`
pub fn parse_weather(captured: &Captured, default_location: &str) -> WeatherRequest {
    let or_default = |location: &str| {
        let location = location.trim();
        if location.is_empty() {
            default_location.to_string()
        } else {
            location.to_string()
        }
    };

    if !captured.group(2).is_empty() {
        return WeatherRequest::Current(or_default(captured.group(3)));
    }

    let rest = captured.group(4).trim();
    if rest.eq_ignore_ascii_case("now") {
        WeatherRequest::Current(default_location.to_string())
    } else {
        WeatherRequest::Forecast(or_default(rest))
    }
}

/// `mmr [<id>]`; ids over 10 digits once leading zeros are dropped are not plausible
pub fn parse_player_id(captured: &Captured) -> Result<u64, String> {
    let raw = captured.group(1);
    if raw.is_empty() {
        return Ok(HOUSE_PLAYER_ID);
    }
    match raw.parse::<u64>() {
        Ok(id) if id.to_string().len() <= MAX_PLAYER_ID_DIGITS => Ok(id),
        _ => Err(format!("lel nice fake player id: {}.", raw)),
    }
}

pub fn mmr_message(account_id: u64, player: &PlayerRank) -> String {
    if account_id == HOUSE_PLAYER_ID {
        return format!("lel j'suis rendu {} ez gaem road to 4k", player.rank);
    }

    let rank = if account_id == CARRY_PLAYER_ID {
        CARRY_RANK
    } else {
        player.rank
    };

    if rank <= 0 {
        "unranked pleb or hidden mmr".to_string()
    } else if rank < AMAZING_RANK {
        format!("lel {} is only {} mmr scrub, git gud", player.name, rank)
    } else {
        format!("lel {} is {} mmr what an amazing player", player.name, rank)
    }
}

pub fn definition_message(def: &Definition) -> String {
    format!(
        "{}\n\n_{}_\n\n**by: {}**\n\n`{}`:+1: `{}`:-1:",
        def.definition, def.example, def.author, def.thumbs_up, def.thumbs_down
    )
}

impl Bot {
    /// Run the named-command table on the text following the bot mention
    pub(super) async fn run_command(&mut self, msg: &InboundMessage, command: &str) -> Vec<Effect> {
        let now = self.clock.now();
        let Some((action, captured)) = self.commands.first_match(command, is_holiday(&now)) else {
            debug!("Unrecognized command: {}", command);
            return vec![Effect::post(FALLBACK, Thread::Root)];
        };
        debug!("Command '{}' matched", captured.rule);

        match action {
            Command::Insult => {
                let text = self.pick(&["no u?", "no u", ":chuckles:", "rolf"]);
                vec![Effect::reply(text, Thread::Root)]
            }
            Command::Thanks => {
                let text = self.pick(&["de rien la", "np", "np ;)"]);
                vec![Effect::reply(text, Thread::Root)]
            }
            Command::Question => {
                let text = self.pick(&["maybe", "??", "yess", "no", "rolf oui", "omgggg no"]);
                vec![Effect::reply(text, Thread::Root)]
            }
            Command::Love => vec![Effect::reply("<3", Thread::Root)],
            Command::ChargeUp => {
                let text = charge_up(&mut self.ledger, &mut self.rng, &msg.user_id, 1);
                vec![Effect::reply(text, Thread::Message)]
            }
            Command::ChargeLevel => {
                let text = charge_level_message(self.ledger.get(&msg.user_id));
                vec![Effect::reply(text, Thread::Message)]
            }
            Command::Convert => self.convert(&captured).await,
            Command::Weather => self.weather(&captured).await,
            Command::Urban => self.urban(&captured).await,
            Command::Romaji => self.transliterate(&captured, Script::Romaji),
            Command::Hiragana => self.transliterate(&captured, Script::Hiragana),
            Command::Katakana => self.transliterate(&captured, Script::Katakana),
            Command::WordOfTheDay => self.word_of_the_day(now.date()).await,
            Command::Mmr => self.mmr(&captured).await,
            Command::Roll => self.roll(msg, &captured, &now),
        }
    }

    async fn convert(&self, captured: &Captured) -> Vec<Effect> {
        let text = match parse_conversion(captured) {
            Err(text) => text,
            Ok(Conversion { amount, from, to }) => {
                let shown = format!("{:.2}", amount);
                match self.lookups.convert(&from, &to, amount).await {
                    Ok(converted) => format!("{} {} = {:.5} {}", shown, from, converted, to),
                    Err(e) => {
                        warn!("Currency conversion failed: {:#}", e);
                        format!("Couldn't convert {} {} to {}.", shown, from, to)
                    }
                }
            }
        };
        vec![Effect::reply(text, Thread::Message)]
    }

    async fn weather(&self, captured: &Captured) -> Vec<Effect> {
        let request = parse_weather(captured, &self.default_location);
        let result = match &request {
            WeatherRequest::Current(location) => self.lookups.current_weather(location).await,
            WeatherRequest::Forecast(location) => self.lookups.forecast_weather(location).await,
        };

        match result {
            Ok(text) => vec![Effect::post(text, Thread::Message)],
            Err(e) => {
                warn!("Weather lookup failed: {:#}", e);
                vec![Effect::reply(
                    format!("Couldn't get weather for {}.", request.location()),
                    Thread::Message,
                )]
            }
        }
    }

    async fn urban(&self, captured: &Captured) -> Vec<Effect> {
        let term = match captured.group(1) {
            "" => DEFAULT_URBAN_TERM,
            term => term,
        };

        match self.lookups.define(term).await {
            Ok(def) => vec![Effect::post(definition_message(&def), Thread::Message)],
            Err(e) => {
                warn!("Urban dictionary lookup failed: {:#}", e);
                vec![Effect::reply(
                    format!("Couldn't get definition for {}.", term),
                    Thread::Message,
                )]
            }
        }
    }

    fn transliterate(&self, captured: &Captured, script: Script) -> Vec<Effect> {
        let word = captured.group(1);
        if word.is_empty() {
            return vec![Effect::reply(
                "Please provide a word to convert.",
                Thread::Message,
            )];
        }
        vec![Effect::post(
            self.lookups.transliterate(word, script),
            Thread::Message,
        )]
    }

    async fn word_of_the_day(&self, today: NaiveDate) -> Vec<Effect> {
        match self.lookups.word_of_the_day(today).await {
            Ok(text) => vec![Effect::post(text, Thread::Message)],
            Err(e) => {
                warn!("Word of the day lookup failed: {:#}", e);
                vec![Effect::reply("Couldn't get WotD Japanese.", Thread::Message)]
            }
        }
    }

    async fn mmr(&self, captured: &Captured) -> Vec<Effect> {
        let account_id = match parse_player_id(captured) {
            Ok(id) => id,
            Err(text) => return vec![Effect::reply(text, Thread::Message)],
        };

        let text = match self.lookups.player(account_id).await {
            Ok(player) => mmr_message(account_id, &player),
            Err(e) => {
                warn!("Rank lookup for {} failed: {:#}", account_id, e);
                format!("rofl {} existe meme pas zzz", account_id)
            }
        };
        vec![Effect::reply(text, Thread::Message)]
    }

    fn roll(&mut self, msg: &InboundMessage, captured: &Captured, now: &NaiveDateTime) -> Vec<Effect> {
        let token = captured.group(1);
        let text = match parse_sides(token) {
            Some(sides) => {
                let charge = self.ledger.get(&msg.user_id);
                roll_dice(&mut self.rng, sides, now, charge)
            }
            None => format!("Couldn't roll {}.", token),
        };
        vec![Effect::reply(text, Thread::Message)]
    }
}
