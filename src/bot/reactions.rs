use anyhow::Result;
use rand::Rng;

use super::charge::{charge_up, charging_multiplier};
use super::rules::{Captured, Rule, RuleTable};
use super::{Bot, Effect, Thread};
use crate::platform::InboundMessage;

pub type ReactionFn = fn(&mut Bot, &InboundMessage, &Captured) -> Vec<Effect>;

const CHARGING_UP: &str = ":charging_up:";

/// Reactions to messages that are not addressed to the bot, in priority order.
///
/// Alternations are left unparenthesised, so the greeting fires on `salut` at the start
/// of a word or `allo` at the end of one. Word boundaries and whitespace are ASCII-only:
/// an accented letter next to a trigger counts as a boundary.
pub fn reaction_table() -> Result<RuleTable<ReactionFn>> {
    Ok(RuleTable::new(vec![
        rule("greeting", r"(?-u:\b)salut|allo(?-u:\b)", greeting)?,
        rule("xd", r"(xd+)", xd)?,
        rule("weeb", r"(?-u:\b)anime|animuh|weeb|weaboo(?-u:\b)", weeb)?,
        rule("vidya", r"(?-u:\b)vidya|bonshommes(?-u:\b)", vidya)?,
        rule("winter-cycling", r"(?-u:\b)velo.*hiver(?-u:\b)", winter_cycling)?,
        rule(
            "farewell",
            r"(?-u:\b):disappear:|peace|alp|bye|:wave:|see ya|au revoir|ciao|chow|a tantot(?-u:\b)",
            farewell,
        )?,
        rule("morning", r"(?-u:\b)bon matin|morning|mornin(?-u:\b)", morning)?,
        rule("mirin", r"(?-u:\b)mirin(?-u:\b)", mirin)?,
        rule("wink", r";-?\)([\t\n\f\r ]|$)|:wink:", wink)?,
        rule("tongue", r":-?P([\t\n\f\r ]|$)|:stuck_out_tongue:", tongue)?,
        rule("fuck", r":fuck:", fuck)?,
        rule("caret", r"([\t\n\f\r ]|^)\^([\t\n\f\r ]|$)", caret)?,
        rule("this", r"^this$", this)?,
        rule("reddit", r"(?-u:\b)reddit(?-u:\b)", reddit)?,
        rule("tumblr", r"(?-u:\b)tumblr(?-u:\b)", tumblr)?,
        rule("tgif", r"(?-u:\b)tgif(?-u:\b)", tgif)?,
        rule("charging", r"(a{5,}h{2,}!*)|:charging_up:", charging)?,
    ]))
}

fn rule(name: &'static str, pattern: &str, action: ReactionFn) -> Result<Rule<ReactionFn>> {
    Rule::new(name, pattern, action)
}

fn greeting(bot: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    let text = bot.pick(&["aaaaaaayyeee", "sup", "yo"]);
    vec![Effect::reply(text, Thread::Root)]
}

fn xd(_: &mut Bot, _: &InboundMessage, captured: &Captured) -> Vec<Effect> {
    vec![Effect::post(
        format!("haha {}", captured.group(1)),
        Thread::Root,
    )]
}

fn weeb(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::post("### Disgusting weebs rolf :huel:", Thread::Root)]
}

fn vidya(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::post("rolf vous avez quel age?", Thread::Root)]
}

fn winter_cycling(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::post(
        "wow cest fukin dangereux faut vraiment etre retarded pour cycler en hiver \
         (dans une tempete de verglas) :huel:",
        Thread::Root,
    )]
}

fn farewell(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::post(
        "hey salut la, a prochaine, on se revoit, stait bin lfun",
        Thread::Root,
    )]
}

fn morning(bot: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    let text = bot.pick(&["zzzz kill me now", "omgggggg"]);
    vec![Effect::post(text, Thread::Root)]
}

fn mirin(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::reply("fucking mirin", Thread::Root)]
}

fn wink(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::react("wink")]
}

fn tongue(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::react("stuck_out_tongue")]
}

fn fuck(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::react("fuck")]
}

fn caret(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![
        Effect::post("^", Thread::Root),
        Effect::react("point_up_2"),
    ]
}

fn this(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![
        Effect::post("this", Thread::Root),
        Effect::react("point_up_2"),
    ]
}

fn reddit(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::reply("\\>reddit", Thread::Root)]
}

fn tumblr(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::reply("\\>tumblr", Thread::Root)]
}

fn tgif(_: &mut Bot, _: &InboundMessage, _: &Captured) -> Vec<Effect> {
    vec![Effect::reply("tgiff*", Thread::Root)]
}

fn charging(bot: &mut Bot, msg: &InboundMessage, captured: &Captured) -> Vec<Effect> {
    let length = charging_length(captured.whole(), &mut bot.rng);
    let message = charge_up(
        &mut bot.ledger,
        &mut bot.rng,
        &msg.user_id,
        charging_multiplier(length),
    );
    vec![Effect::reply(message, Thread::Root)]
}

/// The emoji marker charges like a scream of random length; anything else, including
/// a differently-cased marker, counts its own bytes
fn charging_length<R: Rng + ?Sized>(matched: &str, rng: &mut R) -> usize {
    if matched == CHARGING_UP {
        rng.gen_range(1..=50)
    } else {
        matched.len()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::bot::testing::*;

    async fn reply_to(text: &str) -> Vec<Effect> {
        bot().respond(&message(text)).await
    }

    fn rule_for(text: &str) -> Option<&'static str> {
        let bot = bot();
        bot.reactions
            .first_match(text, false)
            .map(|(_, captured)| captured.rule)
    }

    #[test]
    fn test_table_order() {
        let table = reaction_table().unwrap();
        assert_eq!(
            table.names(),
            vec![
                "greeting",
                "xd",
                "weeb",
                "vidya",
                "winter-cycling",
                "farewell",
                "morning",
                "mirin",
                "wink",
                "tongue",
                "fuck",
                "caret",
                "this",
                "reddit",
                "tumblr",
                "tgif",
                "charging",
            ]
        );
    }

    #[tokio::test]
    async fn test_greeting_picks_from_choices() {
        for text in ["salut tout le monde", "ALLO", "salutations", "ballo"] {
            let effects = reply_to(text).await;
            assert_eq!(effects.len(), 1, "{}", text);
            match &effects[0] {
                Effect::Reply { text, thread } => {
                    assert!(["aaaaaaayyeee", "sup", "yo"].contains(&text.as_str()));
                    assert_eq!(*thread, Thread::Root);
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_xd_echoes_capture() {
        assert_eq!(texts(&reply_to("lol XDDDD").await), vec!["haha XDDDD"]);
        assert_eq!(texts(&reply_to("xd").await), vec!["haha xd"]);
    }

    #[tokio::test]
    async fn test_fixed_posts() {
        assert_eq!(
            texts(&reply_to("this anime is good").await),
            vec!["### Disgusting weebs rolf :huel:"]
        );
        assert_eq!(
            texts(&reply_to("des bonshommes").await),
            vec!["rolf vous avez quel age?"]
        );
        assert_eq!(rule_for("mon velo en hiver"), Some("winter-cycling"));
        // hiver has to come after velo
        assert_eq!(rule_for("hiver velo"), None);
        assert_eq!(texts(&reply_to("do you even mirin").await), vec!["fucking mirin"]);
    }

    #[tokio::test]
    async fn test_farewell_fires_once_without_reaction() {
        let effects = reply_to("hey alp, see ya!").await;
        assert_eq!(
            effects,
            vec![Effect::post(
                "hey salut la, a prochaine, on se revoit, stait bin lfun",
                Thread::Root
            )]
        );
    }

    #[tokio::test]
    async fn test_morning() {
        let effects = texts(&reply_to("bon matin").await);
        assert!(effects == vec!["zzzz kill me now"] || effects == vec!["omgggggg"]);
    }

    #[tokio::test]
    async fn test_emoji_reactions() {
        assert_eq!(reply_to("ok ;)").await, vec![Effect::react("wink")]);
        assert_eq!(reply_to(";-) sure").await, vec![Effect::react("wink")]);
        assert_eq!(reply_to(":wink:").await, vec![Effect::react("wink")]);
        assert_eq!(reply_to(":P").await, vec![Effect::react("stuck_out_tongue")]);
        assert_eq!(reply_to("nah :-p").await, vec![Effect::react("stuck_out_tongue")]);
        assert_eq!(reply_to(":fuck:").await, vec![Effect::react("fuck")]);
        // Glyph glued to a word is not a wink
        assert!(reply_to(";)x").await.is_empty());
    }

    #[tokio::test]
    async fn test_caret_and_this_post_and_react() {
        let expected = |text: &str| {
            vec![
                Effect::post(text, Thread::Root),
                Effect::react("point_up_2"),
            ]
        };
        assert_eq!(reply_to("^").await, expected("^"));
        assert_eq!(reply_to("so much ^ ").await, expected("^"));
        assert_eq!(reply_to("This").await, expected("this"));
        // Only the exact message
        assert!(reply_to("this one").await.is_empty());
        assert!(reply_to("2^3").await.is_empty());
    }

    #[tokio::test]
    async fn test_site_replies() {
        assert_eq!(reply_to("on reddit").await, vec![Effect::reply("\\>reddit", Thread::Root)]);
        assert_eq!(reply_to("tumblr").await, vec![Effect::reply("\\>tumblr", Thread::Root)]);
        assert_eq!(reply_to("TGIF!").await, vec![Effect::reply("tgiff*", Thread::Root)]);
    }

    #[tokio::test]
    async fn test_earlier_rule_wins() {
        // greeting before xd before reddit
        assert_eq!(rule_for("salut xd reddit"), Some("greeting"));
        assert_eq!(rule_for("xd reddit"), Some("xd"));
        // winks come before the caret
        assert_eq!(rule_for(";) ^"), Some("wink"));
        // "reddit" before "tgif"
        assert_eq!(rule_for("tgif reddit"), Some("reddit"));
    }

    #[tokio::test]
    async fn test_charging_updates_ledger() {
        let mut bot = bot();
        let effects = bot.respond(&message("AAAAAAHHHH!!")).await;
        assert_eq!(effects.len(), 1);

        let charge = bot.ledger.get(USER_ID);
        assert!((-1..=3).contains(&charge));
        let expected = crate::bot::charge::charge_up_message(charge);
        assert_eq!(effects, vec![Effect::reply(expected, Thread::Root)]);
    }

    #[tokio::test]
    async fn test_long_charge_scales_multiplier() {
        // 38 characters: multiplier 3
        let long = format!("{}{}", "a".repeat(30), "hhhhhhhh");
        for seed in 0..30 {
            let mut bot = bot_with(
                std::sync::Arc::new(RecordingTransport::default()),
                std::sync::Arc::new(StubLookups::default()),
                plain_day(),
                seed,
            );
            bot.respond(&message(&long)).await;
            let charge = bot.ledger.get(USER_ID);
            assert!([-3, 0, 3, 6, 9].contains(&charge), "charge {}", charge);
        }
    }

    #[tokio::test]
    async fn test_charging_up_emoji() {
        for seed in 0..30 {
            let mut bot = bot_with(
                std::sync::Arc::new(RecordingTransport::default()),
                std::sync::Arc::new(StubLookups::default()),
                plain_day(),
                seed,
            );
            let effects = bot.respond(&message(":charging_up:")).await;
            assert_eq!(effects.len(), 1);
            let charge = bot.ledger.get(USER_ID);
            // random length 1..=50 gives multiplier 1..=3
            assert!((-3..=9).contains(&charge), "charge {}", charge);
        }
    }

    #[tokio::test]
    async fn test_short_charge_does_not_fire() {
        assert!(reply_to("aaaah").await.is_empty());
        assert!(reply_to("aaaaah").await.is_empty());
    }

    #[test]
    fn test_accented_letters_are_word_boundaries() {
        assert_eq!(rule_for("alloé"), Some("greeting"));
        assert_eq!(rule_for("ésalut"), Some("greeting"));
        assert_eq!(rule_for("éreddit"), Some("reddit"));
        assert_eq!(rule_for("tumblré"), Some("tumblr"));
        // ASCII letters still glue words together
        assert_eq!(rule_for("xreddit"), None);
    }

    #[test]
    fn test_non_ascii_space_does_not_end_a_wink() {
        // U+00A0 after the wink is not a separator
        assert_eq!(rule_for(";)\u{a0}"), None);
        assert_eq!(rule_for(";)\tok"), Some("wink"));
    }

    #[test]
    fn test_charging_length() {
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(charging_length("aaaaahh", &mut rng), 7);
        // Only the exact marker gets a random length
        assert_eq!(charging_length(":CHARGING_UP:", &mut rng), 13);
        for _ in 0..20 {
            assert!((1..=50).contains(&charging_length(CHARGING_UP, &mut rng)));
        }
    }
}
