use chrono::NaiveDateTime;
use rand::Rng;

use crate::clock::{is_four_twenty, is_holiday};

pub const WEED: u64 = 420;

/// Number of sides asked for by the `roll` argument.
///
/// The command pattern only captures digits or `:weed:`, so the `dice` alias is
/// unreachable from chat.
pub fn parse_sides(token: &str) -> Option<u64> {
    if token.is_empty() || token.eq_ignore_ascii_case(":weed:") {
        Some(WEED)
    } else if token.eq_ignore_ascii_case("dice") {
        Some(6)
    } else {
        token.parse().ok()
    }
}

/// Roll a `sides`-sided die. 420 only rolls at 4:20, and on April 20th the
/// user's charge is added as a bonus.
pub fn roll_dice<R: Rng + ?Sized>(
    rng: &mut R,
    sides: u64,
    now: &NaiveDateTime,
    charge: i64,
) -> String {
    if sides == 0 {
        return "0".to_string();
    }
    let roll = rng.gen_range(1..=sides);

    if sides == WEED {
        if !is_four_twenty(now) {
            return "Spa leur smh".to_string();
        }

        let roll = roll as i64;
        if is_holiday(now) && charge != 0 {
            let total = roll + charge;
            return format!(
                "{} + {} charge bonus = {} {}",
                roll,
                charge,
                total,
                weed_suffix(total)
            );
        }
        return format!("{} {}", roll, weed_suffix(roll));
    }

    if sides == 1 {
        return ":99:".to_string();
    }

    roll.to_string()
}

fn weed_suffix(total: i64) -> &'static str {
    match total {
        420 => "BIG WINNER WOW :musk: :weed:",
        69 => "_Nice._ :smugpepe:",
        _ => ":chuckles:",
    }
}
