pub mod charge;
pub mod commands;
pub mod reactions;
pub mod roll;
pub mod rules;

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use regex::{Regex, RegexBuilder};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::lookup::Lookups;
use crate::platform::{InboundMessage, Transport, User};

use self::charge::ChargeLedger;
use self::commands::Command;
use self::reactions::ReactionFn;
use self::rules::RuleTable;

/// Which post a response is threaded under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thread {
    /// The thread the triggering message lives in (top level if none)
    Root,
    /// The triggering message itself
    Message,
}

/// One outbound action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Post { text: String, thread: Thread },
    /// A post prefixed with an @mention of the author
    Reply { text: String, thread: Thread },
    React { emoji: String },
}

impl Effect {
    pub fn post(text: impl Into<String>, thread: Thread) -> Self {
        Effect::Post {
            text: text.into(),
            thread,
        }
    }

    pub fn reply(text: impl Into<String>, thread: Thread) -> Self {
        Effect::Reply {
            text: text.into(),
            thread,
        }
    }

    pub fn react(emoji: impl Into<String>) -> Self {
        Effect::React {
            emoji: emoji.into(),
        }
    }
}

/// The dispatcher: owns the rule tables and all session state
pub struct Bot {
    identity: User,
    mention_prefix: Regex,
    reactions: RuleTable<ReactionFn>,
    commands: RuleTable<Command>,
    ledger: ChargeLedger,
    rng: Box<dyn RngCore + Send>,
    clock: Box<dyn Clock>,
    lookups: Arc<dyn Lookups>,
    transport: Arc<dyn Transport>,
    default_location: String,
}

impl Bot {
    pub fn new(
        identity: User,
        transport: Arc<dyn Transport>,
        lookups: Arc<dyn Lookups>,
        default_location: &str,
    ) -> Result<Self> {
        let mention_prefix = RegexBuilder::new(&format!(
            "^@{} (.*)$",
            regex::escape(&identity.username)
        ))
        .case_insensitive(true)
        .build()
        .context("Invalid bot mention pattern")?;

        Ok(Self {
            identity,
            mention_prefix,
            reactions: reactions::reaction_table()?,
            commands: commands::command_table()?,
            ledger: ChargeLedger::new(),
            rng: Box::new(StdRng::from_entropy()),
            clock: Box::new(SystemClock),
            lookups,
            transport,
            default_location: default_location.to_string(),
        })
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = rng;
        self
    }

    /// Handle one inbound message: decide the response and deliver it
    pub async fn dispatch(&mut self, msg: &InboundMessage) {
        let effects = self.respond(msg).await;
        self.deliver(msg, effects).await;
    }

    /// Decide the response to a message without sending anything
    pub async fn respond(&mut self, msg: &InboundMessage) -> Vec<Effect> {
        if msg.user_id == self.identity.id {
            return Vec::new();
        }

        info!("Processing message from user {}: {}", msg.user_id, msg.text);

        let command = self
            .mention_prefix
            .captures(&msg.text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        match command {
            Some(command) => self.run_command(msg, &command).await,
            None => self.react_passively(msg),
        }
    }

    fn react_passively(&mut self, msg: &InboundMessage) -> Vec<Effect> {
        let holiday = crate::clock::is_holiday(&self.clock.now());
        match self.reactions.first_match(&msg.text, holiday) {
            Some((action, captured)) => {
                debug!("Passive rule '{}' matched", captured.rule);
                action(self, msg, &captured)
            }
            None => Vec::new(),
        }
    }

    /// Uniformly pick one of `choices`
    fn pick(&mut self, choices: &[&str]) -> String {
        choices
            .choose(&mut self.rng)
            .map(|c| c.to_string())
            .unwrap_or_default()
    }

    fn thread_id<'a>(msg: &'a InboundMessage, thread: Thread) -> Option<&'a str> {
        match thread {
            Thread::Root => msg.root_id.as_deref(),
            Thread::Message => Some(&msg.id),
        }
    }

    async fn mention(&self, user_id: &str) -> String {
        match self.transport.resolve_user(user_id).await {
            Ok(user) => format!("@{}", user.username),
            Err(e) => {
                error!("Failed to get user: {:#}", e);
                "@unknown".to_string()
            }
        }
    }

    /// Send effects in order. Failures are logged and do not stop the rest.
    async fn deliver(&self, msg: &InboundMessage, effects: Vec<Effect>) {
        for effect in effects {
            let result = match &effect {
                Effect::Post { text, thread } => self
                    .transport
                    .post(&msg.channel_id, text, Self::thread_id(msg, *thread))
                    .await
                    .map(|_| ()),
                Effect::Reply { text, thread } => {
                    let mention = self.mention(&msg.user_id).await;
                    self.transport
                        .post(
                            &msg.channel_id,
                            &format!("{}: {}", mention, text),
                            Self::thread_id(msg, *thread),
                        )
                        .await
                        .map(|_| ())
                }
                Effect::React { emoji } => self.transport.react(emoji, &msg.id).await,
            };

            if let Err(e) = result {
                error!("Failed to deliver {:?}: {:#}", effect, e);
            }
        }
    }
}

/// Consume inbound messages one at a time until the stream ends or Ctrl-C
pub async fn run(mut bot: Bot, mut events: mpsc::Receiver<InboundMessage>) -> Result<()> {
    info!("Bot is now running and listening to messages.");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Shutdown requested");
                return Ok(());
            }
            maybe_msg = events.recv() => {
                let Some(msg) = maybe_msg else {
                    info!("Event stream closed");
                    return Ok(());
                };
                bot.dispatch(&msg).await;
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let transport = Arc::new(RecordingTransport::default());
        let mut bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );

        for text in ["salut", "@jujubot roll 1", "xd", "this"] {
            let mut msg = message(text);
            msg.user_id = BOT_ID.to_string();
            bot.dispatch(&msg).await;
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_directed_message_goes_to_commands() {
        let mut bot = bot();
        let effects = bot.respond(&message("@jujubot I love you")).await;
        assert_eq!(effects, vec![Effect::reply("<3", Thread::Root)]);

        // Mention is case-insensitive
        let effects = bot.respond(&message("@JujuBot i love you")).await;
        assert_eq!(texts(&effects), vec!["<3"]);
    }

    #[tokio::test]
    async fn test_unknown_command_gets_fallback_instead_of_passive_rules() {
        let mut bot = bot();
        // "salut" would trigger a passive greeting if it were not directed
        let effects = bot.respond(&message("@jujubot salut")).await;
        assert_eq!(effects, vec![Effect::post("Kes tu. Veux????", Thread::Root)]);
    }

    #[tokio::test]
    async fn test_mention_without_command_is_passive() {
        let mut bot = bot();
        // No space and body after the mention
        assert!(bot.respond(&message("@jujubot")).await.is_empty());
        // Mention in the middle of a sentence
        assert!(bot.respond(&message("ask @jujubot something")).await.is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_passive_message_is_silent() {
        let transport = Arc::new(RecordingTransport::default());
        let mut bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );
        bot.dispatch(&message("nothing to see here")).await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reply_is_prefixed_with_mention_and_threaded() {
        let transport = Arc::new(RecordingTransport::default());
        let mut bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );

        bot.dispatch(&message("@jujubot I love you")).await;
        bot.dispatch(&message("@jujubot mmr")).await;

        assert_eq!(
            transport.sent(),
            vec![
                Sent::Post {
                    channel: "chan".to_string(),
                    text: "@alice: <3".to_string(),
                    root: Some("root-1".to_string()),
                },
                Sent::Post {
                    channel: "chan".to_string(),
                    text: "@alice: lel j'suis rendu 3210 ez gaem road to 4k".to_string(),
                    root: Some("post-9".to_string()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_top_level_message_posts_top_level() {
        let transport = Arc::new(RecordingTransport::default());
        let mut bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );
        let mut msg = message("tgif");
        msg.root_id = None;
        bot.dispatch(&msg).await;

        assert_eq!(
            transport.sent(),
            vec![Sent::Post {
                channel: "chan".to_string(),
                text: "@alice: tgiff*".to_string(),
                root: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_unresolved_user_is_mentioned_as_unknown() {
        let transport = Arc::new(RecordingTransport {
            unknown_users: true,
            ..Default::default()
        });
        let mut bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );
        bot.dispatch(&message("reddit")).await;

        assert_eq!(
            transport.sent(),
            vec![Sent::Post {
                channel: "chan".to_string(),
                text: "@unknown: \\>reddit".to_string(),
                root: Some("root-1".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_post_does_not_stop_reaction() {
        let transport = Arc::new(RecordingTransport {
            fail_posts: true,
            ..Default::default()
        });
        let mut bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );
        bot.dispatch(&message("this")).await;

        assert_eq!(
            transport.sent(),
            vec![Sent::React {
                emoji: "point_up_2".to_string(),
                post: "post-9".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_ledger_persists_across_messages() {
        let mut bot = bot_with(
            Arc::new(RecordingTransport::default()),
            Arc::new(StubLookups::default()),
            plain_day(),
            99,
        );
        let mut expected = 0;
        for _ in 0..10 {
            let before = bot.ledger.get(USER_ID);
            bot.respond(&message("aaaaahh")).await;
            let delta = bot.ledger.get(USER_ID) - before;
            assert!((-1..=3).contains(&delta));
            expected += delta;
        }
        assert_eq!(bot.ledger.get(USER_ID), expected);
    }

    #[tokio::test]
    async fn test_run_dispatches_every_queued_message_then_stops() {
        let transport = Arc::new(RecordingTransport::default());
        let bot = bot_with(
            transport.clone(),
            Arc::new(StubLookups::default()),
            plain_day(),
            1,
        );

        let (tx, rx) = mpsc::channel(8);
        for text in ["tgif", "nothing", "@jujubot I love you", "this"] {
            tx.send(message(text)).await.unwrap();
        }
        drop(tx);

        run(bot, rx).await.unwrap();

        assert_eq!(
            transport.sent(),
            vec![
                Sent::Post {
                    channel: "chan".to_string(),
                    text: "@alice: tgiff*".to_string(),
                    root: Some("root-1".to_string()),
                },
                Sent::Post {
                    channel: "chan".to_string(),
                    text: "@alice: <3".to_string(),
                    root: Some("root-1".to_string()),
                },
                Sent::Post {
                    channel: "chan".to_string(),
                    text: "this".to_string(),
                    root: Some("root-1".to_string()),
                },
                Sent::React {
                    emoji: "point_up_2".to_string(),
                    post: "post-9".to_string(),
                },
            ]
        );
    }
}
